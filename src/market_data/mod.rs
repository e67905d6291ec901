pub mod bar;
pub mod bar_source;
pub mod cache;
pub mod synthetic;

// Re-export the Bar struct for convenient access (e.g. `use crate::market_data::Bar`).
pub use bar::Bar;
pub use bar_source::{BarSource, FetchError};
pub use cache::BarCache;
