//! Dashboard aggregation: per-module cost tiles and the grand total.
//!
//! A pure function of the current client and the registry's tree. It is
//! pulled (re-run) whenever either changes; there is no subscription
//! machinery here.

use crate::model::{Client, ModuleDef, NOTES_ID};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One dashboard tile for a non-header module.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub module_id: String,
    pub name: String,
    pub cost: f64,
    pub has_data: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub client_name: Option<String>,
    pub tiles: Vec<Tile>,
    /// Sum over all non-header, non-notes modules.
    pub total: f64,
}

/// Build the dashboard for the given client over the given tree. A `None`
/// client yields zeroed tiles, so the dashboard renders before any client
/// is selected.
pub fn render(client: Option<&Client>, tree: &[ModuleDef]) -> DashboardView {
    let mut view = DashboardView {
        client_name: client.map(|c| c.name.clone()),
        ..DashboardView::default()
    };
    for module in tree.iter().filter(|m| !m.is_header()) {
        let entry = client.and_then(|c| c.module_data.get(&module.id));
        let cost = entry.map_or(0.0, |e| module_cost(&e.data));
        if module.id != NOTES_ID {
            view.total += cost;
        }
        view.tiles.push(Tile {
            module_id: module.id.clone(),
            name: module.name.clone(),
            cost,
            has_data: entry.is_some(),
            last_modified: entry.map(|e| e.last_modified),
        });
    }
    view
}

/// Extract a module's cost from its opaque payload. Two shapes are in the
/// wild: a cached `totalCost` number, and an `items` array summed as
/// `qty * rate` over entries with the billable flag set. The cached value
/// wins when both are present.
pub fn module_cost(data: &Value) -> f64 {
    if let Some(total) = data.get("totalCost").and_then(Value::as_f64) {
        return total;
    }
    let Some(items) = data.get("items").and_then(Value::as_array) else {
        return 0.0;
    };
    items
        .iter()
        .filter(|item| item.get("billable").and_then(Value::as_bool) == Some(true))
        .map(|item| {
            let qty = item.get("qty").and_then(Value::as_f64).unwrap_or(0.0);
            let rate = item.get("rate").and_then(Value::as_f64).unwrap_or(0.0);
            qty * rate
        })
        .sum()
}
