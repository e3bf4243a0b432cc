//! Taco Bell type definitions
//!
//! Per-request query types and the narrowed records returned to tool callers.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use validator::Validate;

use crate::error::ValidationError;

/// A store search around a point
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema, Validate)]
pub struct LocationQuery {
    /// Latitude in degrees
    #[validate(range(min = -90.0, max = 90.0, message = "must be between -90 and 90"))]
    pub latitude: f64,

    /// Longitude in degrees
    #[validate(range(min = -180.0, max = 180.0, message = "must be between -180 and 180"))]
    pub longitude: f64,

    /// Only return stores within this many miles
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "must be a positive number of miles"))]
    pub radius: Option<f64>,

    /// Maximum number of stores to return
    #[serde(default)]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub count: Option<usize>,
}

impl LocationQuery {
    /// Create a query around a point, with no narrowing
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius: None,
            count: None,
        }
    }
}

/// A menu lookup for one store
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct MenuQuery {
    #[validate(length(min = 1, message = "must not be empty"))]
    store_id: String,
}

impl MenuQuery {
    /// Create a menu query; the id is opaque and passed through as given
    pub fn new(store_id: impl Into<String>) -> Result<Self, ValidationError> {
        let query = Self {
            store_id: store_id.into(),
        };
        query.validate()?;
        Ok(query)
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }
}

/// A nearby store, narrowed from the upstream record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Store identifier, e.g. "042266"
    #[serde(deserialize_with = "deserialize_store_id")]
    pub store_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<StoreHours>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Service capabilities (drive-thru, delivery, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeSet<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_available: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_available: Option<bool>,
}

impl StoreRecord {
    /// A record carrying only its identifier
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            name: None,
            phone: None,
            address: None,
            coordinates: None,
            hours: None,
            distance: None,
            status: None,
            capabilities: None,
            delivery_available: None,
            pickup_available: None,
        }
    }

    /// Distance in miles, when the upstream gave one we can read
    pub fn distance_miles(&self) -> Option<f64> {
        self.distance.as_ref().and_then(Distance::miles)
    }
}

/// Store address, either a single line or broken into parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Line(String),
    Structured(StructuredAddress),
    /// Any other shape, kept as sent
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Opening hours, either today's schedule or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreHours {
    Text(String),
    Today(DayHours),
    /// Any other shape, kept as sent
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DayHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<String>,
}

/// Distance from the query point, numeric or preformatted ("1.2 mi")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Distance {
    Miles(Number),
    Formatted(String),
    /// Any other shape, kept as sent; a `value` number is read as miles
    Raw(Value),
}

impl Distance {
    /// Read the distance as miles
    pub fn miles(&self) -> Option<f64> {
        match self {
            Distance::Miles(n) => n.as_f64(),
            Distance::Formatted(text) => {
                let number: String = text
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                    .filter(|c| *c != ',')
                    .collect();
                number.parse().ok()
            }
            Distance::Raw(value) => value.get("value").and_then(Value::as_f64),
        }
    }
}

/// A store menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuResult {
    #[serde(alias = "menuProductCategories")]
    pub categories: Vec<MenuCategory>,
}

impl MenuResult {
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub name: String,

    #[serde(default, alias = "products", deserialize_with = "null_as_empty")]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,

    #[serde(
        default,
        deserialize_with = "deserialize_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Store ids are strings, but some feeds send them as bare numbers
fn deserialize_store_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(n) => n.to_string(),
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Prices arrive either bare or wrapped as `{"value": 1.99, "formattedValue": "$1.99"}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Amount(Number),
    Detailed { value: Option<Number> },
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawPrice>::deserialize(deserializer)?;
    Ok(raw.and_then(|price| match price {
        RawPrice::Amount(n) => Some(n),
        RawPrice::Detailed { value } => value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn invalid_name(query: &LocationQuery) -> Option<String> {
        match query.validate().map_err(ValidationError::from) {
            Err(ValidationError::InvalidParameter { name, .. }) => Some(name),
            _ => None,
        }
    }

    #[test]
    fn test_location_query_ranges() {
        assert_ok!(LocationQuery::new(37.7749, -122.4194).validate());
        assert_ok!(LocationQuery::new(90.0, -180.0).validate());
        assert_ok!(LocationQuery::new(-90.0, 180.0).validate());

        assert_eq!(invalid_name(&LocationQuery::new(91.0, 0.0)), Some("latitude".to_string()));
        assert_eq!(invalid_name(&LocationQuery::new(-90.5, 0.0)), Some("latitude".to_string()));
        assert_eq!(invalid_name(&LocationQuery::new(0.0, 180.5)), Some("longitude".to_string()));
        assert_err!(LocationQuery::new(f64::INFINITY, 0.0).validate());
    }

    #[test]
    fn test_location_query_narrowing_options() {
        let mut query = LocationQuery::new(0.0, 0.0);
        query.radius = Some(0.0);
        assert_eq!(invalid_name(&query), Some("radius".to_string()));

        query.radius = Some(5.0);
        query.count = Some(0);
        assert_eq!(invalid_name(&query), Some("count".to_string()));

        query.count = Some(3);
        assert_ok!(query.validate());
    }

    #[test]
    fn test_location_query_deserializes_optional_fields() {
        let query: LocationQuery =
            serde_json::from_value(json!({"latitude": 1.5, "longitude": -2.5})).unwrap();
        assert_eq!(query, LocationQuery::new(1.5, -2.5));
    }

    #[test]
    fn test_menu_query_keeps_id_untouched() {
        assert_eq!(MenuQuery::new(" 042266 ").unwrap().store_id(), " 042266 ");
        assert_eq!(MenuQuery::new("   ").unwrap().store_id(), "   ");

        assert_eq!(
            MenuQuery::new("").unwrap_err(),
            ValidationError::invalid("store_id", "must not be empty")
        );
    }

    #[test]
    fn test_distance_miles() {
        assert_eq!(Distance::Miles(Number::from_f64(1.2).unwrap()).miles(), Some(1.2));
        assert_eq!(Distance::Formatted("0.8 mi".to_string()).miles(), Some(0.8));
        assert_eq!(Distance::Formatted("1,204.5 mi".to_string()).miles(), Some(1204.5));
        assert_eq!(Distance::Formatted("nearby".to_string()).miles(), None);
        assert_eq!(Distance::Raw(json!({"value": 1.2, "unit": "mi"})).miles(), Some(1.2));
        assert_eq!(Distance::Raw(json!({"unit": "mi"})).miles(), None);
    }

    #[test]
    fn test_store_record_flat_shape_roundtrips() {
        let raw = json!({"store_id": "042266", "address": "123 Main St", "distance": 1.2});
        let record: StoreRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.address, Some(Address::Line("123 Main St".to_string())));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_store_record_keeps_unrecognised_shapes() {
        let raw = json!({
            "store_id": "1",
            "address": {"line1": "123 Main St", "town": "SF"},
            "hours": {"mon": "9-5"},
            "distance": {"value": 1.2}
        });
        let record: StoreRecord = serde_json::from_value(raw.clone()).unwrap();

        assert!(matches!(record.address, Some(Address::Raw(_))));
        assert!(matches!(record.hours, Some(StoreHours::Raw(_))));
        assert_eq!(record.distance_miles(), Some(1.2));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_store_record_known_sub_shapes() {
        let raw = json!({
            "store_id": "1",
            "address": {"street": "1 Taco Way", "city": "Irvine"},
            "hours": {"day": "Monday", "opening": "07:00", "closing": "23:00"}
        });
        let record: StoreRecord = serde_json::from_value(raw).unwrap();

        assert!(matches!(record.address, Some(Address::Structured(_))));
        assert!(matches!(record.hours, Some(StoreHours::Today(_))));
    }

    #[test]
    fn test_store_record_numeric_id() {
        let record: StoreRecord = serde_json::from_value(json!({"store_id": 42266})).unwrap();
        assert_eq!(record.store_id, "42266");
    }

    #[test]
    fn test_menu_null_items_are_empty() {
        let menu: MenuResult = serde_json::from_value(json!({
            "categories": [{"name": "Drinks", "items": null}, {"name": "Sides"}]
        }))
        .unwrap();
        assert!(menu.categories.iter().all(|c| c.items.is_empty()));
        assert_eq!(menu.item_count(), 0);
    }

    #[test]
    fn test_menu_native_keys_and_prices() {
        let raw = json!({
            "menuProductCategories": [{
                "name": "Tacos",
                "products": [
                    {"name": "Crunchy Taco", "price": {"value": 1.99, "formattedValue": "$1.99"}},
                    {"name": "Soft Taco", "price": 2},
                    {"name": "Secret Taco", "price": {"formattedValue": "N/A"}}
                ]
            }]
        });
        let menu: MenuResult = serde_json::from_value(raw).unwrap();
        let items = &menu.categories[0].items;

        assert_eq!(menu.item_count(), 3);
        assert_eq!(items[0].price.as_ref().and_then(Number::as_f64), Some(1.99));
        assert_eq!(items[1].price, Some(Number::from(2)));
        assert_eq!(items[2].price, None);
    }
}
