//! Store lookup narrowing
//!
//! Turns the loosely-typed stores payload into [`StoreRecord`]s. The upstream
//! answers with `{"nearByStores": [...]}` in its own field names; already-flat
//! arrays of records are accepted as well and passed through.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::tacobell::types::{
    Address, Coordinates, DayHours, Distance, LocationQuery, StoreHours, StoreRecord,
    StructuredAddress,
};

/// Envelope key holding the store list
const NEARBY_STORES: &str = "nearByStores";

/// Pickup status value meaning the store takes pickup orders
const PICKUP_ACTIVATED: &str = "Activated";

/// Narrow a stores payload into records
pub fn parse_stores(payload: Value) -> Result<Vec<StoreRecord>, ParseError> {
    let stores = match payload {
        Value::Array(stores) => stores,
        Value::Object(mut envelope) => match envelope.remove(NEARBY_STORES) {
            Some(Value::Array(stores)) => stores,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(ParseError::shape(format!(
                    "'{}' should be an array, got {}",
                    NEARBY_STORES,
                    type_name(&other)
                )))
            }
        },
        other => {
            return Err(ParseError::shape(format!(
                "expected a store list, got {}",
                type_name(&other)
            )))
        }
    };

    stores
        .into_iter()
        .enumerate()
        .map(|(index, store)| match store {
            Value::Object(map) => parse_store(map),
            other => Err(ParseError::shape(format!(
                "store #{} should be an object, got {}",
                index,
                type_name(&other)
            ))),
        })
        .collect()
}

/// Apply the query's radius and count to a store list
pub fn narrow(stores: Vec<StoreRecord>, query: &LocationQuery) -> Vec<StoreRecord> {
    let within_radius = stores.into_iter().filter(|store| match (query.radius, store.distance_miles()) {
        (Some(radius), Some(miles)) => miles <= radius,
        _ => true,
    });

    match query.count {
        Some(count) => within_radius.take(count).collect(),
        None => within_radius.collect(),
    }
}

fn parse_store(mut map: Map<String, Value>) -> Result<StoreRecord, ParseError> {
    if map.contains_key("store_id") {
        let capabilities = map.remove("capabilities").and_then(capability_set);
        let mut record: StoreRecord = serde_json::from_value(Value::Object(map))
            .map_err(|e| ParseError::shape(format!("malformed store record: {}", e)))?;
        record.capabilities = capabilities;
        return Ok(record);
    }

    let store_id = match map.get("storeNumber") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(ParseError::shape(
                "store record has neither 'store_id' nor 'storeNumber'",
            ))
        }
    };

    let mut record = StoreRecord::new(store_id);
    record.name = string_at(&map, &["name"]);
    record.phone = string_at(&map, &["phoneNumber"]);
    record.status = string_at(&map, &["storeStatus"]);
    record.distance = string_at(&map, &["formattedDistance"]).map(Distance::Formatted);
    record.address = native_address(&map);
    record.coordinates = native_coordinates(&map);
    record.hours = native_hours(&map);
    record.capabilities = map.remove("capabilities").and_then(capability_set);
    record.delivery_available = Some(map.get("delivery").and_then(Value::as_bool).unwrap_or(false));
    record.pickup_available = Some(
        map.get("pickupStoreStatusForLocation").and_then(Value::as_str) == Some(PICKUP_ACTIVATED),
    );

    Ok(record)
}

fn native_address(map: &Map<String, Value>) -> Option<Address> {
    map.get("address")?.as_object()?;

    Some(Address::Structured(StructuredAddress {
        street: string_at(map, &["address", "line1"]),
        city: string_at(map, &["address", "town"]),
        state: string_at(map, &["address", "region", "isocode"]),
        zip: string_at(map, &["address", "postalCode"]),
    }))
}

fn native_coordinates(map: &Map<String, Value>) -> Option<Coordinates> {
    let point = map.get("geoPoint")?;
    Some(Coordinates {
        latitude: point.get("latitude")?.as_f64()?,
        longitude: point.get("longitude")?.as_f64()?,
    })
}

fn native_hours(map: &Map<String, Value>) -> Option<StoreHours> {
    map.get("todayBusinessHours")?.as_object()?;

    Some(StoreHours::Today(DayHours {
        day: string_at(map, &["todayBusinessHours", "weekDay"]),
        opening: string_at(map, &["todayBusinessHours", "openingTime", "formattedHour"]),
        closing: string_at(map, &["todayBusinessHours", "closingTime", "formattedHour"]),
    }))
}

/// Capabilities come as a list of names or a `name -> enabled` object
fn capability_set(value: Value) -> Option<BTreeSet<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
        ),
        Value::Object(flags) => Some(
            flags
                .into_iter()
                .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                .map(|(name, _)| name)
                .collect(),
        ),
        _ => None,
    }
}

fn string_at(map: &Map<String, Value>, path: &[&str]) -> Option<String> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(*first)?;
    for key in rest {
        current = current.get(*key)?;
    }
    current.as_str().map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn native_store() -> Value {
        json!({
            "storeNumber": "042266",
            "name": "Taco Bell Mission St",
            "phoneNumber": "(415) 555-0199",
            "formattedDistance": "1.2 mi",
            "storeStatus": "openNow",
            "address": {
                "line1": "123 Main St",
                "town": "San Francisco",
                "region": {"isocode": "US-CA"},
                "postalCode": "94103"
            },
            "geoPoint": {"latitude": 37.7749, "longitude": -122.4194},
            "todayBusinessHours": {
                "weekDay": "Friday",
                "openingTime": {"formattedHour": "7:00 AM"},
                "closingTime": {"formattedHour": "2:00 AM"}
            },
            "capabilities": {"driveThru": true, "breakfast": false, "delivery": true},
            "delivery": true,
            "pickupStoreStatusForLocation": "Activated",
            "internalCode": "ignored"
        })
    }

    #[test]
    fn test_native_store_is_reshaped() {
        let stores = parse_stores(json!({"nearByStores": [native_store()]})).unwrap();
        assert_eq!(stores.len(), 1);

        let store = &stores[0];
        assert_eq!(store.store_id, "042266");
        assert_eq!(store.name.as_deref(), Some("Taco Bell Mission St"));
        assert_eq!(store.distance_miles(), Some(1.2));
        assert_eq!(store.delivery_available, Some(true));
        assert_eq!(store.pickup_available, Some(true));
        assert_eq!(
            store.address,
            Some(Address::Structured(StructuredAddress {
                street: Some("123 Main St".to_string()),
                city: Some("San Francisco".to_string()),
                state: Some("US-CA".to_string()),
                zip: Some("94103".to_string()),
            }))
        );
        assert_eq!(
            store.hours,
            Some(StoreHours::Today(DayHours {
                day: Some("Friday".to_string()),
                opening: Some("7:00 AM".to_string()),
                closing: Some("2:00 AM".to_string()),
            }))
        );

        let capabilities: Vec<&str> = store
            .capabilities
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        assert_eq!(capabilities, vec!["delivery", "driveThru"]);

        let rendered = serde_json::to_value(store).unwrap();
        assert!(rendered.get("internalCode").is_none());
    }

    #[test]
    fn test_flat_array_passes_through() {
        let payload = json!([{"store_id": "042266", "address": "123 Main St", "distance": 1.2}]);
        let stores = parse_stores(payload.clone()).unwrap();
        assert_eq!(serde_json::to_value(&stores).unwrap(), payload);
    }

    #[test]
    fn test_flat_records_keep_unrecognised_fields() {
        let payload = json!([
            {"store_id": "1", "address": {"line1": "123 Main St", "town": "SF"}, "hours": {"mon": "9-5"}},
            {"store_id": "2", "distance": {"value": 1.2}}
        ]);
        let stores = parse_stores(payload.clone()).unwrap();

        assert_eq!(serde_json::to_value(&stores).unwrap(), payload);
        assert_eq!(stores[1].distance_miles(), Some(1.2));
    }

    #[test]
    fn test_flat_numeric_store_id() {
        let stores = parse_stores(json!([{"store_id": 42266}])).unwrap();
        assert_eq!(stores[0].store_id, "42266");
    }

    #[test]
    fn test_missing_envelope_means_no_stores() {
        assert!(parse_stores(json!({})).unwrap().is_empty());
        assert!(parse_stores(json!({"nearByStores": null})).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_shapes_are_parse_errors() {
        assert!(parse_stores(json!("stores")).is_err());
        assert!(parse_stores(json!({"nearByStores": {"a": 1}})).is_err());
        assert!(parse_stores(json!([42])).is_err());
        assert!(parse_stores(json!([{"name": "no id"}])).is_err());
    }

    #[test]
    fn test_capability_list() {
        let stores = parse_stores(json!([
            {"store_id": "1", "capabilities": ["lateNight", "driveThru", "lateNight"]}
        ]))
        .unwrap();
        let capabilities = stores[0].capabilities.clone().unwrap();
        assert_eq!(capabilities.len(), 2);
        assert!(capabilities.contains("driveThru"));
    }

    #[test]
    fn test_narrow_by_radius_and_count() {
        let stores = parse_stores(json!([
            {"store_id": "1", "distance": 0.5},
            {"store_id": "2", "distance": "3.4 mi"},
            {"store_id": "3"},
            {"store_id": "4", "distance": 1.1}
        ]))
        .unwrap();

        let mut query = LocationQuery::new(0.0, 0.0);
        query.radius = Some(2.0);
        let ids: Vec<String> = narrow(stores.clone(), &query)
            .into_iter()
            .map(|s| s.store_id)
            .collect();
        assert_eq!(ids, vec!["1", "3", "4"]);

        query.count = Some(2);
        let ids: Vec<String> = narrow(stores, &query)
            .into_iter()
            .map(|s| s.store_id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
