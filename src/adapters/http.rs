use crate::domain::model::{
    deserialize_flag, ItemId, MenuItem, Money, OrderDraft, OrderId, Restaurant, RestaurantId,
};
use crate::domain::ports::{CatalogService, ConfigProvider, OrderService, ReviewService};
use crate::utils::error::{OrderSubmissionError, Result, ShopError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// 外鍵錯誤代表後端不認得這個 user_id
const FOREIGN_KEY_MARKER: &str = "foreign key constraint";

#[derive(Debug, Deserialize)]
struct MenuRow {
    item_id: ItemId,
    #[serde(default)]
    restaurant_id: Option<RestaurantId>,
    item_name: String,
    price: Money,
    #[serde(default, deserialize_with = "deserialize_flag")]
    is_veg: bool,
}

#[derive(Debug, Deserialize)]
struct OrderCreated {
    order_id: OrderId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct RatingPayload {
    order_id: OrderId,
    rating: u8,
}

/// HTTP 實作：餐廳目錄、訂單與評分三個協作服務共用一個 client
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // join() drops the last path segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, resource: &str) -> Result<T> {
        let fetch_failed = |reason: String| ShopError::CatalogFetchFailed {
            resource: resource.to_string(),
            reason,
        };

        let url = self.endpoint(path)?;
        tracing::debug!("Making API request to: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(fetch_failed(format!("HTTP {}", response.status())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| fetch_failed(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl CatalogService for HttpBackend {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>> {
        self.get_json("restaurants", "restaurants").await
    }

    async fn fetch_menu(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>> {
        let rows: Vec<MenuRow> = self
            .get_json(
                &format!("menu/{}", restaurant_id),
                &format!("menu for restaurant {}", restaurant_id),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| MenuItem {
                item_id: row.item_id,
                restaurant_id: row.restaurant_id.unwrap_or(restaurant_id),
                name: row.item_name,
                price: row.price,
                is_veg: row.is_veg,
            })
            .collect())
    }
}

#[async_trait]
impl OrderService for HttpBackend {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderId> {
        let url = self.endpoint("order")?;
        let response = self
            .client
            .post(url)
            .json(draft)
            .send()
            .await
            .map_err(|e| OrderSubmissionError::BackendUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| OrderSubmissionError::BackendUnavailable {
            reason: e.to_string(),
        })?;

        if status.is_success() {
            let created: OrderCreated =
                serde_json::from_str(&body).map_err(|e| OrderSubmissionError::BackendRejected {
                    status: status.as_u16(),
                    message: format!("unexpected success payload: {}", e),
                })?;
            tracing::debug!("Order success: {}", body);
            return Ok(created.order_id);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        tracing::debug!("Order failed (HTTP {}): {}", status, message);

        if message.to_lowercase().contains(FOREIGN_KEY_MARKER) {
            return Err(OrderSubmissionError::UnknownUser {
                user_id: draft.user_id,
            }
            .into());
        }

        Err(OrderSubmissionError::BackendRejected {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl ReviewService for HttpBackend {
    async fn submit_rating(&self, order_id: OrderId, rating: u8) -> Result<()> {
        let rating_failed = |reason: String| ShopError::RatingSubmissionFailed { order_id, reason };

        let url = self.endpoint("rating")?;
        let payload = RatingPayload { order_id, rating };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| rating_failed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(rating_failed(format!("HTTP {}: {}", status, body)));
        }

        tracing::debug!("Rating response: {}", body);
        Ok(())
    }
}
