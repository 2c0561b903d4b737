pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::AppConfig;

pub use adapters::HttpBackend;
pub use core::{
    cart::{compute_totals, Cart, CartEngine},
    catalog::{CatalogCache, LoadOutcome, RestaurantFilter},
    navigator::{Navigator, View},
    order::{LifecyclePhase, OrderLifecycle},
    session::{Session, SessionSettings},
};
pub use utils::error::{OrderSubmissionError, Result, ShopError};
