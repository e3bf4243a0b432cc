//! MCP Tool definitions and handlers
//!
//! Defines the available tools and their implementations.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::error::{McpError, Result, TacoBellMcpError, ValidationError};
use crate::mcp::types::{CallToolResult, Tool};
use crate::tacobell::client::TacoBellClient;
use crate::tacobell::types::{LocationQuery, MenuQuery, MenuResult, StoreRecord};

pub const SEARCH_LOCATIONS: &str = "search_locations";
pub const GET_RESTAURANT_MENU: &str = "get_restaurant_menu";

/// Arguments of `search_locations`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SearchLocationsArgs {
    #[serde(flatten)]
    #[validate(nested)]
    pub query: LocationQuery,

    /// 5-digit US zipcode (not supported yet; use coordinates)
    #[serde(default)]
    pub zipcode: Option<String>,
}

/// Arguments of `get_restaurant_menu`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetRestaurantMenuArgs {
    /// The store ID from location search
    #[validate(length(min = 1, message = "must not be empty"))]
    pub store_id: String,
}

/// Tool handler
#[derive(Clone)]
pub struct ToolHandler {
    client: Arc<TacoBellClient>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(client: Arc<TacoBellClient>) -> Self {
        Self { client }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                SEARCH_LOCATIONS,
                "Search for Taco Bell locations near a latitude/longitude",
                schema_for::<SearchLocationsArgs>(),
            ),
            tool_def(
                GET_RESTAURANT_MENU,
                "Get the full menu for a specific Taco Bell location",
                schema_for::<GetRestaurantMenuArgs>(),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        match name {
            SEARCH_LOCATIONS => render(
                "Failed to search locations",
                self.search_locations(args).await,
            ),
            GET_RESTAURANT_MENU => render(
                "Failed to fetch menu",
                self.get_restaurant_menu(args).await,
            ),
            _ => CallToolResult::error(
                McpError::UnknownTool {
                    name: name.to_string(),
                }
                .to_string(),
            ),
        }
    }

    // ==================== Tool Handlers ====================

    /// `search_locations`: stores near a point
    pub async fn search_locations(&self, args: Value) -> Result<Vec<StoreRecord>> {
        let has_latitude = field_present(&args, "latitude");
        let has_longitude = field_present(&args, "longitude");

        if !has_latitude && !has_longitude && field_present(&args, "zipcode") {
            return Err(ValidationError::Unsupported {
                message: "zipcode search is not supported; provide latitude and longitude"
                    .to_string(),
            }
            .into());
        }
        if !has_latitude {
            return Err(ValidationError::missing("latitude").into());
        }
        if !has_longitude {
            return Err(ValidationError::missing("longitude").into());
        }

        let args: SearchLocationsArgs = parse_args(args)?;
        args.validate()?;
        let query = args.query;

        tracing::debug!(
            latitude = query.latitude,
            longitude = query.longitude,
            "Searching locations"
        );
        self.client.search_locations(&query).await
    }

    /// `get_restaurant_menu`: the menu of one store
    pub async fn get_restaurant_menu(&self, args: Value) -> Result<MenuResult> {
        if !field_present(&args, "store_id") {
            return Err(ValidationError::missing("store_id").into());
        }

        let args: GetRestaurantMenuArgs = parse_args(args)?;
        args.validate()?;
        let query = MenuQuery::new(args.store_id)?;

        tracing::debug!(store_id = query.store_id(), "Fetching menu");
        self.client.get_menu(&query).await
    }
}

/// Render a tool outcome as pretty JSON text, or as an error result
fn render<T: Serialize>(context: &str, outcome: Result<T>) -> CallToolResult {
    let value = match outcome {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "{}", context);
            return CallToolResult::error(format!("{}: {}", context, e));
        }
    };

    match serde_json::to_string_pretty(&value) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error(format!("{}: {}", context, e)),
    }
}

fn field_present(args: &Value, field: &str) -> bool {
    args.get(field).map_or(false, |v| !v.is_null())
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| {
        TacoBellMcpError::Validation(ValidationError::invalid("arguments", e.to_string()))
    })
}

// ==================== Tool Definitions ====================

fn tool_def(name: &str, description: &str, schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: schema,
    }
}

fn schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
}
