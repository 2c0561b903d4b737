use clap::Parser;
use food_order::config::{Command, ItemSpec};
use food_order::core::order::validate_rating;
use food_order::domain::model::{OrderId, RestaurantId, Satisfaction};
use food_order::domain::ports::ReviewService;
use food_order::utils::error::ErrorSeverity;
use food_order::utils::logger::{self, LogFormat};
use food_order::utils::validation::Validate;
use food_order::{CliConfig, HttpBackend, RestaurantFilter, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_logger(LogFormat::from_flag(cli.json_logs), cli.verbose);

    tracing::info!("Starting food-order CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match cli.resolve() {
        Ok(config) => match config.validate() {
            Ok(()) => run(&cli.command, &config).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(command: &Command, config: &food_order::AppConfig) -> food_order::Result<()> {
    match command {
        Command::Restaurants {
            veg_only,
            min_rating,
            ..
        } => list_restaurants(config, *veg_only, *min_rating).await,
        Command::Menu { restaurant_id } => show_menu(config, *restaurant_id).await,
        Command::Order {
            restaurant_id,
            items,
            rating,
            satisfaction,
        } => place_order(config, *restaurant_id, items, *rating, *satisfaction).await,
        Command::Rate { order_id, rating } => rate(config, *order_id, *rating).await,
    }
}

async fn list_restaurants(
    config: &food_order::AppConfig,
    veg_only: bool,
    min_rating: f32,
) -> food_order::Result<()> {
    let session = Session::from_config(config)?;
    session.refresh_restaurants().await?;

    let filter = RestaurantFilter {
        veg_only,
        min_rating,
    };
    let restaurants = session.catalog().filtered(&filter);
    println!("Restaurants in {}", session.catalog().locality());
    for r in &restaurants {
        println!(
            "  [{}] {} - {} • {:.1}★ • {} for two • {} • {} Price{}",
            r.restaurant_id,
            r.name,
            r.cuisine,
            r.effective_rating(),
            r.price_for_two_or_default(),
            r.delivery_time_or_default(),
            r.price_range_or_default(),
            if r.is_veg { " • Pure Veg" } else { "" }
        );
    }
    if restaurants.is_empty() {
        println!("  (no restaurants match)");
    }
    Ok(())
}

async fn show_menu(config: &food_order::AppConfig, restaurant_id: RestaurantId) -> food_order::Result<()> {
    let session = Session::from_config(config)?;
    session.select_restaurant(restaurant_id).await?;

    for item in session.catalog().menu() {
        println!(
            "  [{}] {} {} - {}",
            item.item_id,
            if item.is_veg { "🟢" } else { "🔴" },
            item.name,
            item.price
        );
    }
    Ok(())
}

async fn place_order(
    config: &food_order::AppConfig,
    restaurant_id: RestaurantId,
    items: &[ItemSpec],
    rating: Option<u8>,
    satisfaction: Option<Satisfaction>,
) -> food_order::Result<()> {
    let session = Session::from_config(config)?;

    // 餐廳名稱僅用於顯示，載入失敗不影響下單
    if let Err(e) = session.refresh_restaurants().await {
        tracing::warn!("⚠️ {}", e);
    }
    session.select_restaurant(restaurant_id).await?;

    for item in items {
        session.update_cart_by_id(item.item_id, 1)?;
        if item.quantity > 1 {
            session.update_cart_by_id(item.item_id, i64::from(item.quantity) - 1)?;
        }
    }

    for line in session.cart().lines() {
        println!("  {} x {}  {}", line.name, line.quantity, line.line_total());
    }
    let totals = session.totals();
    println!("  Item Total    {}", totals.item_total);
    println!("  Delivery Fee  {}", totals.delivery_fee);
    println!("  Platform Fee  {}", totals.platform_fee);
    println!("  Grand Total   {}", totals.grand_total);

    let order = session.checkout_quoted(totals.item_total).await?;
    println!("✅ Order Placed! {} ({})", order.display_id(), order.total_amount);
    println!("   Ordering as: {}", order.user_id);

    if let Some(rating) = rating {
        session.rate_order(rating).await?;
        println!("⭐ Rated {}/5", rating);
    }
    if let Some(satisfaction) = satisfaction {
        session.set_satisfaction(satisfaction)?;
        println!("👍 Overall satisfaction: {}", satisfaction);
    }
    session.return_home();
    Ok(())
}

async fn rate(config: &food_order::AppConfig, order_id: OrderId, rating: u8) -> food_order::Result<()> {
    validate_rating(rating)?;
    let backend = HttpBackend::from_config(config)?;
    backend.submit_rating(order_id, rating).await?;
    println!("⭐ Rating {} submitted for ORD-{}", rating, order_id);
    Ok(())
}
