use crate::config::toml_config::AppConfig;
use crate::domain::model::{ItemId, OrderId, RestaurantId, Satisfaction};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Parser)]
#[command(name = "food-order")]
#[command(about = "Browse restaurants, build a single-restaurant cart and place orders")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Backend base URL (overrides the config file)")]
    pub base_url: Option<String>,

    #[arg(long, help = "User id to order as (overrides the config file)")]
    pub user_id: Option<i64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List restaurants
    Restaurants {
        #[arg(long)]
        veg_only: bool,
        #[arg(long, default_value = "0")]
        min_rating: f32,
        #[arg(long)]
        locality: Option<String>,
    },
    /// Show one restaurant's menu
    Menu { restaurant_id: RestaurantId },
    /// Build a cart and place an order
    Order {
        restaurant_id: RestaurantId,
        #[arg(required = true, help = "item-id or item-id:quantity")]
        items: Vec<ItemSpec>,
        #[arg(long, help = "Rate the order right after placing it (1-5)")]
        rating: Option<u8>,
        #[arg(long, requires = "rating", help = "Good or Bad")]
        satisfaction: Option<Satisfaction>,
    },
    /// Forward a rating for an existing order
    Rate { order_id: OrderId, rating: u8 },
}

/// `7` or `7:3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSpec {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (id, quantity) = match s.split_once(':') {
            Some((id, quantity)) => (id, quantity),
            None => (s, "1"),
        };
        let item_id = id
            .parse::<ItemId>()
            .map_err(|e| format!("invalid item id '{}': {}", id, e))?;
        let quantity = quantity
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid quantity '{}': {}", quantity, e))?;
        if quantity == 0 {
            return Err("quantity must be at least 1".to_string());
        }
        Ok(ItemSpec { item_id, quantity })
    }
}

impl CliConfig {
    /// Loads the config file (if any) and applies the command-line overrides.
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.backend.base_url = base_url.clone();
        }
        if let Some(user_id) = self.user_id {
            config.session.user_id = Some(user_id);
        }
        if let Command::Restaurants {
            locality: Some(locality),
            ..
        } = &self.command
        {
            config.session.locality = Some(locality.clone());
        }

        Ok(config)
    }
}
