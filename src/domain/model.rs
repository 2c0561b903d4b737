use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

id_type!(RestaurantId);
id_type!(ItemId);
id_type!(
    /// 由訂單後端指派
    OrderId
);
id_type!(
    /// 外部提供的使用者身分，引擎不做驗證
    UserId
);

/// 金額，以最小貨幣單位（paise）保存
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Saturates at `i64::MAX` paise.
    pub const fn from_major(major: i64) -> Self {
        Money(major.saturating_mul(100))
    }

    pub const fn checked_from_major(major: i64) -> Option<Self> {
        match major.checked_mul(100) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Rounds to the nearest minor unit. Negative, non-finite and out-of-range values
    /// are rejected.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let minor = (value * 100.0).round();
        if minor >= i64::MAX as f64 {
            return None;
        }
        Some(Money(minor as i64))
    }

    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<f64>().ok().and_then(Self::from_decimal)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn times(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "₹{}", self.0 / 100)
        } else {
            write!(f, "₹{}.{:02}", self.0 / 100, (self.0 % 100).abs())
        }
    }
}

// 整數金額輸出為 JSON 整數，與後端欄位一致
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_major())
        }
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative amount as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        if v < 0 {
            return Err(E::custom(format!("negative amount: {}", v)));
        }
        Money::checked_from_major(v)
            .ok_or_else(|| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(Money::checked_from_major)
            .ok_or_else(|| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_decimal(v).ok_or_else(|| E::custom(format!("invalid amount: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse(v).ok_or_else(|| E::custom(format!("invalid amount: {:?}", v)))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

/// Accepts `true`/`false`, `0`/`1` or `null` (read as `false`).
pub(crate) fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

pub const KNOWN_LOCALITIES: [&str; 14] = [
    "Connaught Place",
    "South Extension",
    "Dwarka",
    "Rohini",
    "Hauz Khas",
    "Indirapuram",
    "Vasant Kunj",
    "Lajpat Nagar",
    "Malviya Nagar",
    "Greater Kailash",
    "Pitampura",
    "Chandni Chowk",
    "Saket",
    "Noida Sector 18",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locality(pub String);

impl Locality {
    pub fn new(name: impl Into<String>) -> Self {
        Locality(name.into())
    }

    pub fn is_known(&self) -> bool {
        KNOWN_LOCALITIES.contains(&self.0.as_str())
    }
}

impl Default for Locality {
    fn default() -> Self {
        Locality(KNOWN_LOCALITIES[0].to_string())
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DEFAULT_RESTAURANT_RATING: f32 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub restaurant_id: RestaurantId,
    pub name: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default, rename = "priceForTwo")]
    pub price_for_two: Option<Money>,
    #[serde(default, rename = "deliveryTime")]
    pub delivery_time: Option<String>,
    #[serde(default, rename = "priceRange")]
    pub price_range: Option<String>,
    #[serde(default, rename = "isVeg", deserialize_with = "deserialize_flag")]
    pub is_veg: bool,
}

impl Restaurant {
    pub fn effective_rating(&self) -> f32 {
        self.rating.unwrap_or(DEFAULT_RESTAURANT_RATING)
    }

    pub fn price_for_two_or_default(&self) -> Money {
        self.price_for_two.unwrap_or(Money::from_major(500))
    }

    pub fn delivery_time_or_default(&self) -> &str {
        self.delivery_time.as_deref().unwrap_or("30 min")
    }

    pub fn price_range_or_default(&self) -> &str {
        self.price_range.as_deref().unwrap_or("Medium")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub item_id: ItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Money,
    pub is_veg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Money,
    pub is_veg: bool,
    pub quantity: u32,
}

impl CartLine {
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            item_id: item.item_id,
            restaurant_id: item.restaurant_id,
            name: item.name.clone(),
            price: item.price,
            is_veg: item.is_veg,
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    pub delivery: Money,
    pub platform: Money,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            delivery: Money::from_major(40),
            platform: Money::from_major(25),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub item_total: Money,
    pub delivery_fee: Money,
    pub platform_fee: Money,
    pub grand_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(rename = "item_price")]
    pub unit_price: Money,
}

/// POST /order 的請求內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub total_amount: Money,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Satisfaction {
    Good,
    Bad,
}

impl fmt::Display for Satisfaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Satisfaction::Good => f.write_str("Good"),
            Satisfaction::Bad => f.write_str("Bad"),
        }
    }
}

impl FromStr for Satisfaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Good" | "good" => Ok(Satisfaction::Good),
            "Bad" | "bad" => Ok(Satisfaction::Bad),
            other => Err(format!("unknown satisfaction value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Placed,
    Rated,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: Option<String>,
    pub user_id: UserId,
    /// Item-only total; delivery and platform fees are not persisted.
    pub total_amount: Money,
    pub items: Vec<OrderLine>,
    /// 0 表示尚未評分
    pub rating: u8,
    pub satisfaction: Option<Satisfaction>,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    pub fn display_id(&self) -> String {
        format!("ORD-{}", self.order_id)
    }

    pub fn status(&self) -> OrderStatus {
        if self.satisfaction.is_some() {
            OrderStatus::Closed
        } else if self.rating > 0 {
            OrderStatus::Rated
        } else {
            OrderStatus::Placed
        }
    }
}
