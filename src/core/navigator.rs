use crate::domain::model::{OrderId, RestaurantId};
use crate::utils::error::{Result, ShopError};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum View {
    Home,
    Detail,
    Cart,
    Tracking,
    Profile,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Home => "home",
            View::Detail => "detail",
            View::Cart => "cart",
            View::Tracking => "tracking",
            View::Profile => "profile",
        };
        f.write_str(name)
    }
}

/// 目前畫面以及畫面所需的最小上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    view: View,
    selected_restaurant: Option<RestaurantId>,
    tracked_order: Option<OrderId>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            view: View::Home,
            selected_restaurant: None,
            tracked_order: None,
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.view
    }

    pub fn selected_restaurant(&self) -> Option<RestaurantId> {
        self.selected_restaurant
    }

    pub fn tracked_order(&self) -> Option<OrderId> {
        self.tracked_order
    }

    /// User-initiated navigation. `Tracking` is not a free target, and `Detail` needs a
    /// restaurant to have been selected before.
    pub fn navigate(&mut self, target: View) -> Result<View> {
        match target {
            View::Tracking => {
                return Err(ShopError::InvalidTransition {
                    from: self.view.to_string(),
                    to: target.to_string(),
                })
            }
            View::Detail if self.selected_restaurant.is_none() => {
                return Err(ShopError::RestaurantRequired)
            }
            _ => {}
        }
        Ok(self.enter(target))
    }

    pub fn go_home(&mut self) -> View {
        self.enter(View::Home)
    }

    pub fn open_restaurant(&mut self, restaurant_id: RestaurantId) -> View {
        self.selected_restaurant = Some(restaurant_id);
        self.enter(View::Detail)
    }

    /// Only reachable after a successful order submission.
    pub(crate) fn show_tracking(&mut self, order_id: OrderId) -> View {
        self.tracked_order = Some(order_id);
        self.enter(View::Tracking)
    }

    fn enter(&mut self, view: View) -> View {
        if self.view != view {
            tracing::debug!("🧭 {} -> {}", self.view, view);
        }
        self.view = view;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_home() {
        let navigator = Navigator::new();
        assert_eq!(navigator.current(), View::Home);
        assert_eq!(navigator.selected_restaurant(), None);
    }

    #[test]
    fn test_tracking_is_not_a_free_target() {
        let mut navigator = Navigator::new();
        assert!(matches!(
            navigator.navigate(View::Tracking),
            Err(ShopError::InvalidTransition { .. })
        ));
        assert_eq!(navigator.current(), View::Home);

        navigator.show_tracking(OrderId(12));
        assert_eq!(navigator.current(), View::Tracking);
        assert_eq!(navigator.tracked_order(), Some(OrderId(12)));
    }

    #[test]
    fn test_detail_requires_selection() {
        let mut navigator = Navigator::new();
        assert!(matches!(
            navigator.navigate(View::Detail),
            Err(ShopError::RestaurantRequired)
        ));

        navigator.open_restaurant(RestaurantId(4));
        navigator.navigate(View::Cart).unwrap();
        assert_eq!(navigator.navigate(View::Detail).unwrap(), View::Detail);
        assert_eq!(navigator.selected_restaurant(), Some(RestaurantId(4)));
    }

    #[test]
    fn test_views_are_reenterable() {
        let mut navigator = Navigator::new();
        for view in [View::Home, View::Cart, View::Profile, View::Cart, View::Home] {
            assert_eq!(navigator.navigate(view).unwrap(), view);
        }
    }
}
