pub mod aggregation;
pub mod fetch_worker;
pub mod pending_pairs;
pub mod queue_runner;
pub mod reference_sync;
pub mod scheduler;
