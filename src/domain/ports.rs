use crate::domain::model::{Fees, Locality, MenuItem, OrderDraft, OrderId, Restaurant, RestaurantId, UserId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// GET /restaurants, GET /menu/{id}
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>>;
    async fn fetch_menu(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>>;
}

/// POST /order
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderId>;
}

/// POST /rating
#[async_trait]
pub trait ReviewService: Send + Sync {
    async fn submit_rating(&self, order_id: OrderId, rating: u8) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn default_user_id(&self) -> UserId;
    fn default_locality(&self) -> Locality;
    fn fees(&self) -> Fees;
}
