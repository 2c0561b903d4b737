use crate::domain::model::{ItemId, Money, OrderId, RestaurantId, UserId};
use thiserror::Error;

/// 訂單送出失敗的細分類型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderSubmissionError {
    #[error("user {user_id} is not known to the order backend")]
    UnknownUser { user_id: UserId },

    #[error("order backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("order backend rejected the order (HTTP {status}): {message}")]
    BackendRejected { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("cart is locked to restaurant {locked}, cannot add items from restaurant {requested}")]
    CrossRestaurantConflict {
        locked: RestaurantId,
        requested: RestaurantId,
        item_id: ItemId,
    },

    #[error("Item {item_id} is not on the current menu")]
    UnknownMenuItem { item_id: ItemId },

    #[error("Failed to fetch {resource}: {reason}")]
    CatalogFetchFailed { resource: String, reason: String },

    #[error("Order submission failed: {0}")]
    OrderSubmission(#[from] OrderSubmissionError),

    #[error("Rating submission failed for order {order_id}: {reason}")]
    RatingSubmissionFailed { order_id: OrderId, reason: String },

    #[error("Cannot submit an empty cart")]
    EmptyCart,

    #[error("Quoted item total {quoted} does not match computed item total {computed}")]
    TotalMismatch { quoted: Money, computed: Money },

    #[error("An order submission is already in flight")]
    SubmissionInProgress,

    #[error("No active order")]
    NoActiveOrder,

    #[error("Rating must be between 1 and 5, got {rating}")]
    InvalidRating { rating: u8 },

    #[error("Order must be rated before satisfaction can be recorded")]
    RatingRequired,

    #[error("Order {order_id} is closed")]
    OrderClosed { order_id: OrderId },

    #[error("Invalid view transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("A restaurant must be selected")]
    RestaurantRequired,

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Cart,
    Catalog,
    Order,
    Rating,
    Navigation,
    Config,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShopError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ShopError::CrossRestaurantConflict { .. } | ShopError::UnknownMenuItem { .. } => {
                ErrorCategory::Cart
            }
            ShopError::CatalogFetchFailed { .. } => ErrorCategory::Catalog,
            ShopError::OrderSubmission(_)
            | ShopError::EmptyCart
            | ShopError::TotalMismatch { .. }
            | ShopError::SubmissionInProgress
            | ShopError::NoActiveOrder
            | ShopError::OrderClosed { .. } => ErrorCategory::Order,
            ShopError::RatingSubmissionFailed { .. }
            | ShopError::InvalidRating { .. }
            | ShopError::RatingRequired => ErrorCategory::Rating,
            ShopError::InvalidTransition { .. } | ShopError::RestaurantRequired => {
                ErrorCategory::Navigation
            }
            ShopError::ConfigError { .. }
            | ShopError::InvalidConfigValueError { .. }
            | ShopError::ConfigValidationError { .. }
            | ShopError::UrlError(_) => ErrorCategory::Config,
            ShopError::HttpError(_) | ShopError::IoError(_) | ShopError::SerializationError(_) => {
                ErrorCategory::Io
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 評分轉送是盡力而為，本地狀態為準
            ShopError::RatingSubmissionFailed { .. } => ErrorSeverity::Low,
            ShopError::CrossRestaurantConflict { .. }
            | ShopError::CatalogFetchFailed { .. }
            | ShopError::OrderSubmission(_)
            | ShopError::SubmissionInProgress
            | ShopError::HttpError(_) => ErrorSeverity::Medium,
            ShopError::EmptyCart
            | ShopError::UnknownMenuItem { .. }
            | ShopError::TotalMismatch { .. }
            | ShopError::NoActiveOrder
            | ShopError::InvalidRating { .. }
            | ShopError::RatingRequired
            | ShopError::OrderClosed { .. }
            | ShopError::InvalidTransition { .. }
            | ShopError::RestaurantRequired
            | ShopError::SerializationError(_) => ErrorSeverity::High,
            ShopError::ConfigError { .. }
            | ShopError::InvalidConfigValueError { .. }
            | ShopError::ConfigValidationError { .. }
            | ShopError::UrlError(_)
            | ShopError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// 是否可由使用者重試同一動作
    pub fn is_retryable(&self) -> bool {
        match self {
            ShopError::CatalogFetchFailed { .. } | ShopError::HttpError(_) => true,
            ShopError::OrderSubmission(OrderSubmissionError::BackendUnavailable { .. }) => true,
            ShopError::OrderSubmission(OrderSubmissionError::BackendRejected { status, .. }) => {
                *status >= 500
            }
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ShopError::CrossRestaurantConflict { .. } => {
                "You can order from only one restaurant at a time".to_string()
            }
            ShopError::CatalogFetchFailed { resource, .. } => {
                format!("Could not load {}. Showing the last known data.", resource)
            }
            ShopError::OrderSubmission(OrderSubmissionError::UnknownUser { user_id }) => format!(
                "User ID {} doesn't exist in database. Please use an existing user ID (1, 2, 3) or create this user first.",
                user_id
            ),
            ShopError::OrderSubmission(OrderSubmissionError::BackendUnavailable { .. }) => {
                "Backend not running!".to_string()
            }
            ShopError::OrderSubmission(OrderSubmissionError::BackendRejected { .. }) => {
                "Order failed. Check backend.".to_string()
            }
            ShopError::EmptyCart => "Your cart is empty".to_string(),
            ShopError::OrderClosed { .. } => "This order has already been reviewed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ShopError::CrossRestaurantConflict { .. } => {
                "Clear the cart or finish the current order before switching restaurants"
            }
            ShopError::CatalogFetchFailed { .. } | ShopError::HttpError(_) => {
                "Check that the backend is reachable and retry the load"
            }
            ShopError::OrderSubmission(OrderSubmissionError::UnknownUser { .. }) => {
                "Switch to an existing user id from the profile screen"
            }
            ShopError::OrderSubmission(_) => "Your cart was kept; retry the checkout",
            ShopError::RatingSubmissionFailed { .. } => "No action needed; the rating is kept locally",
            ShopError::EmptyCart => "Add at least one item before checking out",
            ShopError::UnknownMenuItem { .. } => "Reload the restaurant menu and pick an item from it",
            ShopError::TotalMismatch { .. } => "Refresh the checkout screen and try again",
            ShopError::SubmissionInProgress => "Wait for the pending checkout to finish",
            ShopError::NoActiveOrder | ShopError::OrderClosed { .. } => {
                "Return to the home screen to start a new order"
            }
            ShopError::InvalidRating { .. } => "Pick a rating from 1 to 5 stars",
            ShopError::RatingRequired => "Rate the order first",
            ShopError::InvalidTransition { .. } | ShopError::RestaurantRequired => {
                "Select a restaurant from the home screen"
            }
            ShopError::ConfigError { .. }
            | ShopError::InvalidConfigValueError { .. }
            | ShopError::ConfigValidationError { .. }
            | ShopError::UrlError(_) => "Fix the configuration file or command-line flags",
            ShopError::IoError(_) | ShopError::SerializationError(_) => {
                "Check file permissions and the backend response format"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
