//! Menu narrowing

use serde_json::Value;

use crate::error::ParseError;
use crate::tacobell::types::MenuResult;

/// Narrow a menu payload into a [`MenuResult`]
pub fn parse_menu(payload: Value) -> Result<MenuResult, ParseError> {
    if !payload.is_object() {
        return Err(ParseError::shape("menu response should be an object"));
    }

    let menu: MenuResult = serde_json::from_value(payload)
        .map_err(|e| ParseError::shape(format!("malformed menu: {}", e)))?;

    tracing::debug!(
        categories = menu.categories.len(),
        items = menu.item_count(),
        "Parsed menu"
    );

    Ok(menu)
}
