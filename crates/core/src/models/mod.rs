pub mod currency;
pub mod job;
pub mod position;
pub mod rate;
pub mod settings;
pub mod summary;
pub mod sync;
