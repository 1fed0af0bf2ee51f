//! Dashboard summary: locations, catalog items, team members and recent
//! orders, flattened for display with money normalised from minor units.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use concierge_types::{Result, tool::ApiRequest};

use crate::ports::{ToolConnector, ToolSession};
use crate::shaper::{money_currency, money_to_decimal, unwrap_tool_json};
use crate::tools::{ToolCatalog, ToolLease};

const SUMMARY_NOTE: &str = "Money values are normalized from cents to dollars (amount/100).";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryLocation {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub variation_id: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub wage_per_hour: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<String>,
    pub total: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub primary_location: PrimaryLocation,
    pub locations: Vec<Value>,
    pub catalog_items: Vec<CatalogItem>,
    pub team_members: Vec<TeamMember>,
    pub orders: Vec<OrderSummary>,
    pub note: String,
}

/// Fetch and flatten the dashboard over one scoped provider connection.
pub async fn build_summary(
    connector: &dyn ToolConnector,
    api_tool_suffix: &str,
) -> Result<DashboardSummary> {
    let lease = ToolLease::acquire(connector).await?;
    let outcome = fetch_summary(lease.session(), api_tool_suffix).await;
    lease.release().await;
    outcome
}

async fn fetch_summary(session: &dyn ToolSession, api_tool_suffix: &str) -> Result<DashboardSummary> {
    let catalog = ToolCatalog::new(session.list_tools().await?);
    let api = ApiTool {
        session,
        name: catalog.require_suffix(api_tool_suffix)?.name.clone(),
    };

    let locations = list_field(&api.call("locations", "list", json!({})).await?, "locations");
    let primary_location = locations
        .first()
        .map(|loc| PrimaryLocation {
            id: str_field(loc, "id"),
            name: str_field(loc, "name"),
            status: str_field(loc, "status"),
        })
        .unwrap_or_default();

    let catalog_objects = list_field(
        &api.call("catalog", "list", json!({"types": "ITEM", "limit": 200})).await?,
        "objects",
    );
    let catalog_items = catalog_objects.iter().filter_map(flatten_catalog_object).collect();

    let members = match api.call("team", "searchMembers", json!({"limit": 200})).await {
        Ok(payload) => list_field(&payload, "team_members"),
        Err(e) if e.is_tool_call() => {
            log::warn!("team listing failed, showing no members: {}", e);
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    let team_members = members.iter().map(flatten_team_member).collect();

    let mut orders = Vec::new();
    if let Some(location_id) = &primary_location.id {
        let request = json!({
            "location_ids": [location_id],
            "limit": 20,
            "sort": {"sort_field": "CREATED_AT", "sort_order": "DESC"},
        });
        match api.call("orders", "search", request).await {
            Ok(payload) => {
                orders = list_field(&payload, "orders").iter().map(flatten_order).collect();
            }
            Err(e) if e.is_tool_call() => log::warn!("order search failed, showing none: {}", e),
            Err(e) => return Err(e),
        }
    }

    Ok(DashboardSummary {
        primary_location,
        locations,
        catalog_items,
        team_members,
        orders,
        note: SUMMARY_NOTE.to_string(),
    })
}

struct ApiTool<'a> {
    session: &'a dyn ToolSession,
    name: String,
}

impl ApiTool<'_> {
    async fn call(&self, service: &str, method: &str, request: Value) -> Result<Value> {
        let args = serde_json::to_value(ApiRequest::new(service, method, request))?;
        let raw = self.session.call_tool(&self.name, args).await?;
        Ok(unwrap_tool_json(&raw))
    }
}

fn list_field(payload: &Value, key: &str) -> Vec<Value> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

/// Items only; the price is the first variation's.
pub fn flatten_catalog_object(obj: &Value) -> Option<CatalogItem> {
    if obj.get("type").and_then(Value::as_str) != Some("ITEM") {
        return None;
    }
    let item = obj.get("item_data");
    let first_var = item
        .and_then(|i| i.get("variations"))
        .and_then(Value::as_array)
        .and_then(|v| v.first());
    let price_money = first_var
        .and_then(|v| v.get("item_variation_data"))
        .and_then(|d| d.get("price_money"));

    Some(CatalogItem {
        id: str_field(obj, "id"),
        name: item.and_then(|i| str_field(i, "name")),
        variation_id: first_var.and_then(|v| str_field(v, "id")),
        price: money_to_decimal(price_money),
        currency: money_currency(price_money),
    })
}

/// Wage is the first job assignment carrying an hourly rate.
pub fn flatten_team_member(member: &Value) -> TeamMember {
    let hourly = member
        .get("wage_setting")
        .and_then(|w| w.get("job_assignments"))
        .and_then(Value::as_array)
        .and_then(|jobs| {
            jobs.iter()
                .filter_map(|j| j.get("hourly_rate"))
                .find(|rate| rate.as_object().is_some_and(|o| !o.is_empty()))
        });

    let given = str_field(member, "given_name").unwrap_or_default();
    let family = str_field(member, "family_name").unwrap_or_default();

    TeamMember {
        id: str_field(member, "id"),
        name: format!("{} {}", given, family).trim().to_string(),
        status: str_field(member, "status"),
        email: str_field(member, "email_address"),
        phone: str_field(member, "phone_number"),
        wage_per_hour: money_to_decimal(hourly),
        currency: money_currency(hourly),
    }
}

pub fn flatten_order(order: &Value) -> OrderSummary {
    let total = order.get("total_money");
    OrderSummary {
        id: str_field(order, "id"),
        state: str_field(order, "state"),
        created_at: str_field(order, "created_at"),
        total: money_to_decimal(total),
        currency: money_currency(total),
    }
}
