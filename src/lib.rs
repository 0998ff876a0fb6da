pub mod api;
pub mod config;
pub mod error;
pub mod market;
pub mod page;
pub mod state;
pub mod visits;

// Re-export common modules
pub use api::router;
pub use config::Config;
pub use error::AppError;
pub use market::cache::PriceCache;
pub use state::AppState;
