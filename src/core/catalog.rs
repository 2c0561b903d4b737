use crate::domain::model::{ItemId, Locality, MenuItem, Restaurant, RestaurantId};
use crate::domain::ports::CatalogService;
use crate::utils::error::{Result, ShopError};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 餐廳列表的篩選條件，只讀投影，不會修改快取
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RestaurantFilter {
    pub veg_only: bool,
    pub min_rating: f32,
}

impl RestaurantFilter {
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        (!self.veg_only || restaurant.is_veg) && restaurant.effective_rating() >= self.min_rating
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was stored; carries the number of entries.
    Applied(usize),
    /// A newer load started while this one was in flight; the response was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct CatalogState {
    locality: Locality,
    restaurants: Vec<Restaurant>,
    restaurants_generation: u64,
    selected: Option<RestaurantId>,
    menu: Vec<MenuItem>,
    menu_generation: u64,
}

pub struct CatalogCache {
    service: Arc<dyn CatalogService>,
    state: RwLock<CatalogState>,
}

fn fetch_failed(resource: String, error: ShopError) -> ShopError {
    match error {
        ShopError::CatalogFetchFailed { .. } => error,
        other => ShopError::CatalogFetchFailed {
            resource,
            reason: other.to_string(),
        },
    }
}

impl CatalogCache {
    pub fn new(service: Arc<dyn CatalogService>, locality: Locality) -> Self {
        Self {
            service,
            state: RwLock::new(CatalogState {
                locality,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refreshes the restaurant list. On failure the previous list stays in place.
    pub async fn load_restaurants(&self, locality: Locality) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.write();
            state.locality = locality;
            state.restaurants_generation += 1;
            state.restaurants_generation
        };

        tracing::debug!("📡 Loading restaurants (generation {})", generation);
        let restaurants = match self.service.fetch_restaurants().await {
            Ok(restaurants) => restaurants,
            Err(e) => {
                let err = fetch_failed("restaurants".to_string(), e);
                tracing::warn!("⚠️ {}", err);
                return Err(err);
            }
        };

        let mut state = self.write();
        if state.restaurants_generation != generation {
            tracing::debug!("📡 Dropping stale restaurant list (generation {})", generation);
            return Ok(LoadOutcome::Superseded);
        }
        let count = restaurants.len();
        state.restaurants = restaurants;
        tracing::info!("📂 Loaded {} restaurants for {}", count, state.locality);
        Ok(LoadOutcome::Applied(count))
    }

    /// Replaces the cached menu with the one for `restaurant`. `None` empties the menu.
    pub async fn load_menu(&self, restaurant: Option<RestaurantId>) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.write();
            state.menu_generation += 1;
            if state.selected != restaurant {
                state.menu.clear();
            }
            state.selected = restaurant;
            state.menu_generation
        };

        let Some(restaurant_id) = restaurant else {
            return Ok(LoadOutcome::Applied(0));
        };

        tracing::debug!("📡 Loading menu for restaurant {}", restaurant_id);
        let items = match self.service.fetch_menu(restaurant_id).await {
            Ok(items) => items,
            Err(e) => {
                let err = fetch_failed(format!("menu for restaurant {}", restaurant_id), e);
                tracing::warn!("⚠️ {}", err);
                return Err(err);
            }
        };

        let mut state = self.write();
        if state.menu_generation != generation {
            tracing::debug!(
                "📡 Dropping stale menu for restaurant {} (generation {})",
                restaurant_id,
                generation
            );
            return Ok(LoadOutcome::Superseded);
        }

        let received = items.len();
        let menu: Vec<MenuItem> = items
            .into_iter()
            .filter(|item| item.restaurant_id == restaurant_id)
            .collect();
        if menu.len() != received {
            tracing::warn!(
                "⚠️ Ignored {} menu rows not belonging to restaurant {}",
                received - menu.len(),
                restaurant_id
            );
        }

        let count = menu.len();
        state.menu = menu;
        tracing::info!("📂 Loaded {} menu items for restaurant {}", count, restaurant_id);
        Ok(LoadOutcome::Applied(count))
    }

    pub fn locality(&self) -> Locality {
        self.read().locality.clone()
    }

    pub fn restaurants(&self) -> Vec<Restaurant> {
        self.read().restaurants.clone()
    }

    pub fn filtered(&self, filter: &RestaurantFilter) -> Vec<Restaurant> {
        self.read()
            .restaurants
            .iter()
            .filter(|restaurant| filter.matches(restaurant))
            .cloned()
            .collect()
    }

    pub fn restaurant(&self, restaurant_id: RestaurantId) -> Option<Restaurant> {
        self.read()
            .restaurants
            .iter()
            .find(|restaurant| restaurant.restaurant_id == restaurant_id)
            .cloned()
    }

    pub fn selected_restaurant(&self) -> Option<RestaurantId> {
        self.read().selected
    }

    pub fn menu(&self) -> Vec<MenuItem> {
        self.read().menu.clone()
    }

    pub fn menu_item(&self, item_id: ItemId) -> Option<MenuItem> {
        self.read()
            .menu
            .iter()
            .find(|item| item.item_id == item_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Money;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::{Mutex, Notify};

    #[derive(Default)]
    struct FakeCatalog {
        restaurants: Mutex<Option<Vec<Restaurant>>>,
        menus: HashMap<RestaurantId, Vec<MenuItem>>,
        // menu requests for this restaurant wait until the gate opens
        gated: Option<(RestaurantId, Arc<Notify>)>,
        // the next restaurant request takes this gate and waits on it
        restaurants_gate: Mutex<Option<Arc<Notify>>>,
    }

    #[async_trait]
    impl CatalogService for FakeCatalog {
        async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>> {
            let snapshot = self.restaurants.lock().await.clone();
            let gate = self.restaurants_gate.lock().await.take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            snapshot.ok_or_else(|| ShopError::CatalogFetchFailed {
                resource: "restaurants".to_string(),
                reason: "HTTP 500".to_string(),
            })
        }

        async fn fetch_menu(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>> {
            if let Some((gated_id, gate)) = &self.gated {
                if *gated_id == restaurant_id {
                    gate.notified().await;
                }
            }
            Ok(self.menus.get(&restaurant_id).cloned().unwrap_or_default())
        }
    }

    fn restaurant(id: i64, rating: Option<f32>, is_veg: bool) -> Restaurant {
        Restaurant {
            restaurant_id: RestaurantId(id),
            name: format!("Restaurant {}", id),
            cuisine: "North Indian".to_string(),
            rating,
            price_for_two: None,
            delivery_time: None,
            price_range: None,
            is_veg,
        }
    }

    fn menu_item(item_id: i64, restaurant_id: i64) -> MenuItem {
        MenuItem {
            item_id: ItemId(item_id),
            restaurant_id: RestaurantId(restaurant_id),
            name: format!("Dish {}", item_id),
            price: Money::from_major(100),
            is_veg: false,
        }
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_list() {
        let fake = Arc::new(FakeCatalog::default());
        *fake.restaurants.lock().await = Some(vec![restaurant(1, None, false)]);
        let cache = CatalogCache::new(fake.clone(), Locality::default());

        assert_eq!(
            cache.load_restaurants(Locality::new("Saket")).await.unwrap(),
            LoadOutcome::Applied(1)
        );

        *fake.restaurants.lock().await = None;
        let err = cache.load_restaurants(Locality::new("Dwarka")).await.unwrap_err();
        assert!(matches!(err, ShopError::CatalogFetchFailed { .. }));
        assert_eq!(cache.restaurants().len(), 1);
        assert_eq!(cache.locality(), Locality::new("Dwarka"));
    }

    #[tokio::test]
    async fn test_stale_restaurant_list_is_dropped() {
        let gate = Arc::new(Notify::new());
        let fake = Arc::new(FakeCatalog::default());
        *fake.restaurants.lock().await = Some(vec![restaurant(1, None, false)]);
        *fake.restaurants_gate.lock().await = Some(gate.clone());
        let cache = CatalogCache::new(fake.clone(), Locality::default());

        let (slow, fast) = tokio::join!(cache.load_restaurants(Locality::new("Saket")), async {
            *fake.restaurants.lock().await =
                Some(vec![restaurant(2, None, true), restaurant(3, None, false)]);
            let outcome = cache.load_restaurants(Locality::new("Dwarka")).await;
            gate.notify_one();
            outcome
        });

        assert_eq!(slow.unwrap(), LoadOutcome::Superseded);
        assert_eq!(fast.unwrap(), LoadOutcome::Applied(2));
        let ids: Vec<_> = cache.restaurants().iter().map(|r| r.restaurant_id).collect();
        assert_eq!(ids, vec![RestaurantId(2), RestaurantId(3)]);
        assert_eq!(cache.locality(), Locality::new("Dwarka"));
    }

    #[tokio::test]
    async fn test_filters_are_read_side_projections() {
        let fake = Arc::new(FakeCatalog::default());
        *fake.restaurants.lock().await = Some(vec![
            restaurant(1, Some(4.5), true),
            restaurant(2, Some(3.2), true),
            restaurant(3, None, false),
        ]);
        let cache = CatalogCache::new(fake, Locality::default());
        cache.load_restaurants(Locality::default()).await.unwrap();

        let veg = cache.filtered(&RestaurantFilter {
            veg_only: true,
            min_rating: 0.0,
        });
        assert_eq!(veg.len(), 2);

        // an absent rating reads as 4.0
        let rated = cache.filtered(&RestaurantFilter {
            veg_only: false,
            min_rating: 4.0,
        });
        let ids: Vec<_> = rated.iter().map(|r| r.restaurant_id).collect();
        assert_eq!(ids, vec![RestaurantId(1), RestaurantId(3)]);

        assert_eq!(cache.restaurants().len(), 3);
    }

    #[tokio::test]
    async fn test_menu_replaced_on_new_selection() {
        let mut menus = HashMap::new();
        menus.insert(RestaurantId(1), vec![menu_item(10, 1), menu_item(11, 1)]);
        menus.insert(RestaurantId(2), vec![menu_item(20, 2)]);
        let cache = CatalogCache::new(
            Arc::new(FakeCatalog {
                menus,
                ..Default::default()
            }),
            Locality::default(),
        );

        cache.load_menu(Some(RestaurantId(1))).await.unwrap();
        assert_eq!(cache.menu().len(), 2);

        cache.load_menu(Some(RestaurantId(2))).await.unwrap();
        assert_eq!(cache.menu(), vec![menu_item(20, 2)]);
        assert!(cache.menu_item(ItemId(10)).is_none());

        assert_eq!(cache.load_menu(None).await.unwrap(), LoadOutcome::Applied(0));
        assert!(cache.menu().is_empty());
        assert_eq!(cache.selected_restaurant(), None);
    }

    #[tokio::test]
    async fn test_stale_menu_response_is_dropped() {
        let gate = Arc::new(Notify::new());
        let mut menus = HashMap::new();
        menus.insert(RestaurantId(1), vec![menu_item(10, 1)]);
        menus.insert(RestaurantId(2), vec![menu_item(20, 2)]);
        let cache = CatalogCache::new(
            Arc::new(FakeCatalog {
                menus,
                gated: Some((RestaurantId(1), gate.clone())),
                ..Default::default()
            }),
            Locality::default(),
        );

        let (slow, fast) = tokio::join!(cache.load_menu(Some(RestaurantId(1))), async {
            let outcome = cache.load_menu(Some(RestaurantId(2))).await;
            gate.notify_one();
            outcome
        });

        assert_eq!(slow.unwrap(), LoadOutcome::Superseded);
        assert_eq!(fast.unwrap(), LoadOutcome::Applied(1));
        assert_eq!(cache.selected_restaurant(), Some(RestaurantId(2)));
        assert_eq!(cache.menu(), vec![menu_item(20, 2)]);
    }

    #[tokio::test]
    async fn test_foreign_menu_rows_are_ignored() {
        let mut menus = HashMap::new();
        menus.insert(RestaurantId(1), vec![menu_item(10, 1), menu_item(99, 4)]);
        let cache = CatalogCache::new(
            Arc::new(FakeCatalog {
                menus,
                ..Default::default()
            }),
            Locality::default(),
        );

        assert_eq!(
            cache.load_menu(Some(RestaurantId(1))).await.unwrap(),
            LoadOutcome::Applied(1)
        );
    }
}
