use crate::core::cart::{Cart, CartEngine};
use crate::domain::model::{Money, Order, OrderDraft, OrderLine, OrderStatus, Satisfaction, UserId};
use crate::domain::ports::{OrderService, ReviewService};
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::validate_range;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecyclePhase {
    Empty,
    Submitting,
    Placed,
    Rated,
    Closed,
}

#[derive(Debug, Default)]
struct LifecycleState {
    active: Option<Order>,
    submitting: bool,
    /// 歷史訂單，舊的在前
    history: Vec<Order>,
}

/// 訂單生命週期：送出 -> 評分 -> 滿意度（結束）
pub struct OrderLifecycle {
    orders: Arc<dyn OrderService>,
    reviews: Arc<dyn ReviewService>,
    state: Mutex<LifecycleState>,
}

/// Clears the in-flight flag when a submission ends, including when the caller drops the
/// submit future before the backend answers.
struct InFlight<'a> {
    state: &'a Mutex<LifecycleState>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .submitting = false;
            tracing::warn!("⚠️ Order submission abandoned before the backend answered");
        }
    }
}

/// Ratings are whole stars from 1 to 5.
pub fn validate_rating(rating: u8) -> Result<()> {
    validate_range("rating", rating, 1, 5).map_err(|_| ShopError::InvalidRating { rating })
}

/// Packages the cart into the order payload. The total is always recomputed from the
/// cart lines and covers items only; fees are never part of `total_amount`.
pub fn prepare_draft(cart: &Cart, user_id: UserId) -> Result<OrderDraft> {
    let restaurant_id = match cart.locked_restaurant() {
        Some(id) if !cart.is_empty() => id,
        _ => return Err(ShopError::EmptyCart),
    };

    let items = cart
        .lines()
        .iter()
        .map(|line| OrderLine {
            item_id: line.item_id,
            quantity: line.quantity,
            unit_price: line.price,
        })
        .collect();

    Ok(OrderDraft {
        user_id,
        restaurant_id,
        total_amount: cart.item_total(),
        items,
    })
}

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderService>, reviews: Arc<dyn ReviewService>) -> Self {
        Self {
            orders,
            reviews,
            state: Mutex::new(LifecycleState::default()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> LifecyclePhase {
        let state = self.guard();
        if state.submitting {
            return LifecyclePhase::Submitting;
        }
        match state.active.as_ref().map(Order::status) {
            None => LifecyclePhase::Empty,
            Some(OrderStatus::Placed) => LifecyclePhase::Placed,
            Some(OrderStatus::Rated) => LifecyclePhase::Rated,
            Some(OrderStatus::Closed) => LifecyclePhase::Closed,
        }
    }

    pub fn active_order(&self) -> Option<Order> {
        self.guard().active.clone()
    }

    pub fn past_orders(&self) -> Vec<Order> {
        self.guard().history.clone()
    }

    pub async fn submit(
        &self,
        cart: &CartEngine,
        user_id: UserId,
        restaurant_name: Option<String>,
    ) -> Result<Order> {
        let draft = prepare_draft(&cart.snapshot(), user_id)?;
        self.place(cart, draft, restaurant_name).await
    }

    /// Like [`submit`](Self::submit) but rejects the checkout when the total the caller
    /// displayed differs from the item total computed here.
    pub async fn submit_quoted(
        &self,
        cart: &CartEngine,
        user_id: UserId,
        quoted_item_total: Money,
        restaurant_name: Option<String>,
    ) -> Result<Order> {
        let draft = prepare_draft(&cart.snapshot(), user_id)?;
        if draft.total_amount != quoted_item_total {
            tracing::warn!(
                "⚠️ Quoted total {} differs from computed total {}",
                quoted_item_total,
                draft.total_amount
            );
            return Err(ShopError::TotalMismatch {
                quoted: quoted_item_total,
                computed: draft.total_amount,
            });
        }
        self.place(cart, draft, restaurant_name).await
    }

    async fn place(
        &self,
        cart: &CartEngine,
        draft: OrderDraft,
        restaurant_name: Option<String>,
    ) -> Result<Order> {
        {
            let mut state = self.guard();
            if state.submitting {
                return Err(ShopError::SubmissionInProgress);
            }
            state.submitting = true;
        }
        let mut in_flight = InFlight {
            state: &self.state,
            armed: true,
        };

        tracing::info!(
            "📦 Submitting order: user {} restaurant {} ({} lines, total {})",
            draft.user_id,
            draft.restaurant_id,
            draft.items.len(),
            draft.total_amount
        );
        let outcome = self.orders.submit_order(&draft).await;

        let mut state = self.guard();
        state.submitting = false;
        in_flight.disarm();

        let order_id = match outcome {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("❌ Order failed: {}", e);
                return Err(e);
            }
        };

        let order = Order {
            order_id,
            restaurant_id: draft.restaurant_id,
            restaurant_name,
            user_id: draft.user_id,
            total_amount: draft.total_amount,
            items: draft.items,
            rating: 0,
            satisfaction: None,
            placed_at: Utc::now(),
        };

        if let Some(previous) = state.active.replace(order.clone()) {
            state.history.push(previous);
        }
        drop(state);

        cart.clear();
        tracing::info!("✅ Order {} placed ({})", order.display_id(), order.total_amount);
        Ok(order)
    }

    /// Records the rating locally, then forwards it to the review service.
    /// A forwarding failure is logged and does not undo the local rating.
    pub async fn rate(&self, rating: u8) -> Result<Order> {
        validate_rating(rating)?;

        let order = {
            let mut state = self.guard();
            let order = state.active.as_mut().ok_or(ShopError::NoActiveOrder)?;
            if order.status() == OrderStatus::Closed {
                return Err(ShopError::OrderClosed {
                    order_id: order.order_id,
                });
            }
            order.rating = rating;
            order.clone()
        };

        tracing::debug!("⭐ Sending rating: order {} rating {}", order.order_id, rating);
        if let Err(e) = self.reviews.submit_rating(order.order_id, rating).await {
            tracing::warn!("⚠️ Failed to submit rating (kept locally): {}", e);
        }

        Ok(order)
    }

    pub fn set_satisfaction(&self, value: Satisfaction) -> Result<Order> {
        let mut state = self.guard();
        let order = state.active.as_mut().ok_or(ShopError::NoActiveOrder)?;
        match order.status() {
            OrderStatus::Closed => Err(ShopError::OrderClosed {
                order_id: order.order_id,
            }),
            OrderStatus::Placed => Err(ShopError::RatingRequired),
            OrderStatus::Rated => {
                order.satisfaction = Some(value);
                tracing::debug!("👍 Order {} closed as {}", order.order_id, value);
                Ok(order.clone())
            }
        }
    }

    /// Leaves the active-order slot empty; the order moves to the past-orders ledger.
    pub fn archive(&self) -> Option<Order> {
        let mut state = self.guard();
        let order = state.active.take()?;
        state.history.push(order.clone());
        Some(order)
    }
}
