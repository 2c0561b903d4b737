use crate::domain::model::{CartLine, Fees, ItemId, MenuItem, Money, RestaurantId, Totals};
use crate::utils::error::{Result, ShopError};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 購物車：所有品項必須屬於同一家餐廳
///
/// `locked_restaurant` is `None` exactly when `lines` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    locked_restaurant: Option<RestaurantId>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn locked_restaurant(&self) -> Option<RestaurantId> {
        self.locked_restaurant
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number shown on the cart badge.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn quantity_of(&self, item_id: ItemId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.item_id == item_id)
            .map(|line| line.quantity)
            .unwrap_or(0)
    }

    pub fn item_total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Applies a signed quantity change for `item` and returns the resulting cart.
    ///
    /// A first add always starts the line at quantity 1 whatever the size of `delta`.
    /// Items from a restaurant other than the locked one are rejected with
    /// [`ShopError::CrossRestaurantConflict`] and `self` is left untouched.
    pub fn with_delta(&self, item: &MenuItem, delta: i64) -> Result<Cart> {
        if let Some(locked) = self.locked_restaurant {
            if item.restaurant_id != locked {
                return Err(ShopError::CrossRestaurantConflict {
                    locked,
                    requested: item.restaurant_id,
                    item_id: item.item_id,
                });
            }
        }

        let mut next = self.clone();

        match next.lines.iter().position(|line| line.item_id == item.item_id) {
            Some(index) => {
                let quantity = i64::from(next.lines[index].quantity).saturating_add(delta);
                if quantity <= 0 {
                    next.lines.remove(index);
                    if next.lines.is_empty() {
                        next.locked_restaurant = None;
                    }
                } else {
                    next.lines[index].quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                }
            }
            None if delta > 0 => {
                if next.lines.is_empty() {
                    next.locked_restaurant = Some(item.restaurant_id);
                }
                next.lines.push(CartLine::from_item(item));
            }
            None => {}
        }

        Ok(next)
    }
}

pub fn compute_totals(cart: &Cart, delivery_fee: Money, platform_fee: Money) -> Totals {
    let item_total = cart.item_total();
    Totals {
        item_total,
        delivery_fee,
        platform_fee,
        grand_total: item_total + delivery_fee + platform_fee,
    }
}

/// Session-owned cart. Every mutation reads and replaces the latest cart under one lock,
/// so concurrent quantity changes never apply against a stale snapshot.
#[derive(Debug, Default)]
pub struct CartEngine {
    cart: Mutex<Cart>,
}

impl CartEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Cart {
        self.guard().clone()
    }

    pub fn add_or_increment(&self, item: &MenuItem, delta: i64) -> Result<Cart> {
        let mut cart = self.guard();
        match cart.with_delta(item, delta) {
            Ok(next) => {
                tracing::debug!(
                    "🛒 item {} delta {:+} -> qty {} ({} lines, locked to {:?})",
                    item.item_id,
                    delta,
                    next.quantity_of(item.item_id),
                    next.lines().len(),
                    next.locked_restaurant()
                );
                *cart = next.clone();
                Ok(next)
            }
            Err(e) => {
                tracing::debug!("🛒 rejected item {}: {}", item.item_id, e);
                Err(e)
            }
        }
    }

    pub fn clear(&self) -> Cart {
        let mut cart = self.guard();
        *cart = Cart::new();
        tracing::debug!("🛒 cart cleared");
        cart.clone()
    }

    pub fn totals(&self, fees: Fees) -> Totals {
        compute_totals(&self.guard(), fees.delivery, fees.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(item_id: i64, restaurant_id: i64, price: i64) -> MenuItem {
        MenuItem {
            item_id: ItemId(item_id),
            restaurant_id: RestaurantId(restaurant_id),
            name: format!("Item {}", item_id),
            price: Money::from_major(price),
            is_veg: false,
        }
    }

    fn assert_lock_invariant(cart: &Cart) {
        match cart.locked_restaurant() {
            None => assert!(cart.is_empty()),
            Some(locked) => {
                assert!(!cart.is_empty());
                assert!(cart.lines().iter().all(|line| line.restaurant_id == locked));
            }
        }
    }

    #[test]
    fn test_first_add_locks_and_decrement_releases() {
        let biryani = item(7, 3, 120);

        let cart = Cart::new().with_delta(&biryani, 1).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(ItemId(7)), 1);
        assert_eq!(cart.locked_restaurant(), Some(RestaurantId(3)));

        let cart = cart.with_delta(&biryani, 2).unwrap();
        assert_eq!(cart.quantity_of(ItemId(7)), 3);

        let cart = cart.with_delta(&biryani, -5).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.locked_restaurant(), None);
    }

    #[test]
    fn test_first_add_ignores_delta_magnitude() {
        let cart = Cart::new().with_delta(&item(1, 1, 50), 4).unwrap();
        assert_eq!(cart.quantity_of(ItemId(1)), 1);
    }

    #[test]
    fn test_extreme_deltas_clamp_instead_of_overflowing() {
        let dosa = item(1, 1, 50);
        let cart = Cart::new().with_delta(&dosa, 1).unwrap();

        let huge = cart.with_delta(&dosa, i64::MAX).unwrap();
        assert_eq!(huge.quantity_of(ItemId(1)), u32::MAX);
        assert_lock_invariant(&huge);

        let gone = huge.with_delta(&dosa, i64::MIN).unwrap();
        assert!(gone.is_empty());
        assert_eq!(gone.locked_restaurant(), None);

        let gone = cart.with_delta(&dosa, i64::MIN).unwrap();
        assert!(gone.is_empty());
    }

    #[test]
    fn test_non_positive_delta_on_missing_line_is_noop() {
        let empty = Cart::new();
        assert_eq!(empty.with_delta(&item(1, 1, 50), -1).unwrap(), empty);
        assert_eq!(empty.with_delta(&item(1, 1, 50), 0).unwrap(), empty);

        let cart = empty.with_delta(&item(1, 1, 50), 1).unwrap();
        assert_eq!(cart.with_delta(&item(2, 1, 60), -3).unwrap(), cart);
    }

    #[test]
    fn test_zero_delta_never_changes_contents() {
        let cart = Cart::new()
            .with_delta(&item(1, 1, 50), 1)
            .unwrap()
            .with_delta(&item(2, 1, 80), 1)
            .unwrap();

        assert_eq!(cart.with_delta(&item(1, 1, 50), 0).unwrap(), cart);
        assert_eq!(cart.with_delta(&item(3, 1, 10), 0).unwrap(), cart);
    }

    #[test]
    fn test_add_then_remove_restores_prior_cart() {
        let base = Cart::new().with_delta(&item(1, 1, 50), 1).unwrap();
        let round_trip = base
            .with_delta(&item(2, 1, 80), 1)
            .unwrap()
            .with_delta(&item(2, 1, 80), -1)
            .unwrap();
        assert_eq!(round_trip, base);

        let empty = Cart::new();
        let round_trip = empty
            .with_delta(&item(2, 1, 80), 1)
            .unwrap()
            .with_delta(&item(2, 1, 80), -1)
            .unwrap();
        assert_eq!(round_trip, empty);
        assert_eq!(round_trip.locked_restaurant(), None);
    }

    #[test]
    fn test_cross_restaurant_add_is_rejected() {
        let cart = Cart::new().with_delta(&item(1, 1, 50), 1).unwrap();
        let before = cart.clone();

        let err = cart.with_delta(&item(9, 2, 70), 1).unwrap_err();
        match err {
            ShopError::CrossRestaurantConflict {
                locked,
                requested,
                item_id,
            } => {
                assert_eq!(locked, RestaurantId(1));
                assert_eq!(requested, RestaurantId(2));
                assert_eq!(item_id, ItemId(9));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(cart, before);
    }

    #[test]
    fn test_lock_invariant_holds_across_mixed_sequence() {
        let a1 = item(1, 1, 50);
        let a2 = item(2, 1, 30);
        let b1 = item(3, 2, 90);
        let steps: [(&MenuItem, i64); 9] = [
            (&a1, 1),
            (&b1, 1),
            (&a2, 2),
            (&a1, -1),
            (&b1, 1),
            (&a2, -1),
            (&a2, -1),
            (&b1, 1),
            (&b1, -2),
        ];

        let mut cart = Cart::new();
        for (menu_item, delta) in steps {
            if let Ok(next) = cart.with_delta(menu_item, delta) {
                cart = next;
            }
            assert_lock_invariant(&cart);
        }
        // a1/a2 gone, then b1 added once more and removed again
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_breakdown() {
        let cart = Cart::new()
            .with_delta(&item(1, 1, 100), 1)
            .unwrap()
            .with_delta(&item(1, 1, 100), 1)
            .unwrap()
            .with_delta(&item(2, 1, 50), 1)
            .unwrap();

        let totals = compute_totals(&cart, Money::from_major(40), Money::from_major(25));
        assert_eq!(totals.item_total, Money::from_major(250));
        assert_eq!(totals.grand_total, Money::from_major(315));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_totals_of_empty_cart() {
        let totals = compute_totals(&Cart::new(), Money::from_major(40), Money::from_major(25));
        assert_eq!(totals.item_total, Money::ZERO);
        assert_eq!(totals.grand_total, Money::from_major(65));
    }

    #[test]
    fn test_engine_conflict_leaves_state_untouched() {
        let engine = CartEngine::new();
        engine.add_or_increment(&item(1, 1, 50), 1).unwrap();
        assert!(engine.add_or_increment(&item(2, 2, 50), 1).is_err());

        let cart = engine.snapshot();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.locked_restaurant(), Some(RestaurantId(1)));

        assert!(engine.clear().is_empty());
        assert_eq!(engine.snapshot().locked_restaurant(), None);
    }

    #[test]
    fn test_engine_serializes_concurrent_increments() {
        let engine = Arc::new(CartEngine::new());
        let burger = item(5, 2, 150);
        engine.add_or_increment(&burger, 1).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let burger = burger.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        engine.add_or_increment(&burger, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.snapshot().quantity_of(ItemId(5)), 201);
        assert_eq!(
            engine.totals(Fees::default()).item_total,
            Money::from_major(150 * 201)
        );
    }
}
