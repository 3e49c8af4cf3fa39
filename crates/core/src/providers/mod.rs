pub mod normalize;
pub mod response;
pub mod traits;

// API provider implementations
pub mod twelve_data;
