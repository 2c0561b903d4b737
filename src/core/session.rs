use crate::adapters::HttpBackend;
use crate::core::cart::{Cart, CartEngine};
use crate::core::catalog::{CatalogCache, LoadOutcome};
use crate::core::navigator::{Navigator, View};
use crate::core::order::{LifecyclePhase, OrderLifecycle};
use crate::domain::model::{
    Fees, ItemId, Locality, MenuItem, Money, Order, RestaurantId, Satisfaction, Totals, UserId,
};
use crate::domain::ports::{CatalogService, ConfigProvider, OrderService, ReviewService};
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::validate_at_least;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub user_id: UserId,
    pub locality: Locality,
    pub fees: Fees,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            user_id: UserId(1),
            locality: Locality::default(),
            fees: Fees::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            user_id: config.default_user_id(),
            locality: config.default_locality(),
            fees: config.fees(),
        }
    }
}

/// 一個使用者會話的完整狀態：購物車、訂單、目錄快取與目前畫面
///
/// Sessions share nothing with each other; every piece of mutable state lives here.
pub struct Session {
    user_id: Mutex<UserId>,
    fees: Fees,
    cart: CartEngine,
    orders: OrderLifecycle,
    catalog: CatalogCache,
    navigator: Mutex<Navigator>,
}

impl Session {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        orders: Arc<dyn OrderService>,
        reviews: Arc<dyn ReviewService>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            user_id: Mutex::new(settings.user_id),
            fees: settings.fees,
            cart: CartEngine::new(),
            orders: OrderLifecycle::new(orders, reviews),
            catalog: CatalogCache::new(catalog, settings.locality),
            navigator: Mutex::new(Navigator::new()),
        }
    }

    /// Uses one backend for all three collaborators.
    pub fn with_backend<B>(backend: Arc<B>, settings: SessionSettings) -> Self
    where
        B: CatalogService + OrderService + ReviewService + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend, settings)
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let backend = Arc::new(HttpBackend::from_config(config)?);
        tracing::debug!("Session backend: {}", backend.base_url());
        Ok(Self::with_backend(backend, SessionSettings::from_config(config)))
    }

    fn navigator(&self) -> MutexGuard<'_, Navigator> {
        self.navigator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_id(&self) -> UserId {
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Affects subsequent submissions only.
    pub fn set_user_id(&self, user_id: UserId) -> Result<()> {
        validate_at_least("user_id", user_id.0, 1)?;
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = user_id;
        tracing::info!("👤 Ordering as user {}", user_id);
        Ok(())
    }

    pub fn fees(&self) -> Fees {
        self.fees
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn cart(&self) -> Cart {
        self.cart.snapshot()
    }

    pub fn totals(&self) -> Totals {
        self.cart.totals(self.fees)
    }

    pub fn view(&self) -> View {
        self.navigator().current()
    }

    pub fn navigator_state(&self) -> Navigator {
        self.navigator().clone()
    }

    pub fn order_phase(&self) -> LifecyclePhase {
        self.orders.phase()
    }

    pub fn active_order(&self) -> Option<Order> {
        self.orders.active_order()
    }

    pub fn past_orders(&self) -> Vec<Order> {
        self.orders.past_orders()
    }

    pub async fn refresh_restaurants(&self) -> Result<LoadOutcome> {
        self.catalog.load_restaurants(self.catalog.locality()).await
    }

    pub async fn change_locality(&self, locality: Locality) -> Result<LoadOutcome> {
        if !locality.is_known() {
            tracing::warn!("⚠️ Locality '{}' is not in the known list", locality);
        }
        self.catalog.load_restaurants(locality).await
    }

    /// Opens the restaurant's detail screen and loads its menu.
    pub async fn select_restaurant(&self, restaurant_id: RestaurantId) -> Result<LoadOutcome> {
        self.navigator().open_restaurant(restaurant_id);
        self.catalog.load_menu(Some(restaurant_id)).await
    }

    pub fn navigate(&self, target: View) -> Result<View> {
        self.navigator().navigate(target)
    }

    pub fn update_cart(&self, item: &MenuItem, delta: i64) -> Result<Cart> {
        self.cart.add_or_increment(item, delta)
    }

    /// Looks the item up on the currently loaded menu.
    pub fn update_cart_by_id(&self, item_id: ItemId, delta: i64) -> Result<Cart> {
        let item = self
            .catalog
            .menu_item(item_id)
            .ok_or(ShopError::UnknownMenuItem { item_id })?;
        self.update_cart(&item, delta)
    }

    pub fn clear_cart(&self) -> Cart {
        self.cart.clear()
    }

    fn cart_restaurant_name(&self) -> Option<String> {
        self.cart
            .snapshot()
            .locked_restaurant()
            .and_then(|id| self.catalog.restaurant(id))
            .map(|restaurant| restaurant.name)
    }

    pub async fn checkout(&self) -> Result<Order> {
        let name = self.cart_restaurant_name();
        let order = self.orders.submit(&self.cart, self.user_id(), name).await?;
        self.navigator().show_tracking(order.order_id);
        Ok(order)
    }

    /// Checkout that also verifies the item total shown to the user.
    pub async fn checkout_quoted(&self, quoted_item_total: Money) -> Result<Order> {
        let name = self.cart_restaurant_name();
        let order = self
            .orders
            .submit_quoted(&self.cart, self.user_id(), quoted_item_total, name)
            .await?;
        self.navigator().show_tracking(order.order_id);
        Ok(order)
    }

    pub async fn rate_order(&self, rating: u8) -> Result<Order> {
        self.orders.rate(rating).await
    }

    pub fn set_satisfaction(&self, value: Satisfaction) -> Result<Order> {
        self.orders.set_satisfaction(value)
    }

    /// Back to the catalog; the active order (if any) moves to the past-orders ledger.
    pub fn return_home(&self) -> View {
        if let Some(order) = self.orders.archive() {
            tracing::debug!("📚 Archived order {}", order.display_id());
        }
        self.navigator().go_home()
    }
}
