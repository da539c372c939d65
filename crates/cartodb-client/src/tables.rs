//! Table, column, record and visualization endpoints

use cartodb_auth::encode;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::CartoClient;
use crate::error::Result;
use crate::request::RequestSpec;
use crate::response::{ResponseBody, ResponseEnvelope};

/// Paging for `get_records`. Unset fields are left to the server default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordsPage {
    pub rows_per_page: Option<u64>,
    pub page: Option<u64>,
}

impl RecordsPage {
    pub fn new(rows_per_page: u64, page: u64) -> Self {
        Self {
            rows_per_page: Some(rows_per_page),
            page: Some(page),
        }
    }
}

fn table_path(table: &str) -> String {
    format!("tables/{}", encode(table))
}

fn column_path(table: &str, column: &str) -> String {
    format!("tables/{}/columns/{}", encode(table), encode(column))
}

/// Visualization ids arrive as strings or numbers depending on the server
/// version.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_table_visualization(viz: &Value) -> bool {
    viz.get("type").and_then(Value::as_str) == Some("table")
}

fn visualization_list(envelope: &ResponseEnvelope) -> Vec<Value> {
    envelope
        .get("visualizations")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

impl CartoClient {
    pub async fn create_table(&self, table: &str) -> Result<ResponseEnvelope> {
        self.execute(RequestSpec::post("tables").param("name", table))
            .await
    }

    pub async fn get_table(&self, table: &str) -> Result<ResponseEnvelope> {
        self.execute(RequestSpec::get(table_path(table))).await
    }

    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: &str,
    ) -> Result<ResponseEnvelope> {
        let path = format!("{}/columns", table_path(table));
        self.execute(
            RequestSpec::post(path)
                .param("name", column)
                .param("type", column_type),
        )
        .await
    }

    pub async fn drop_column(&self, table: &str, column: &str) -> Result<ResponseEnvelope> {
        self.execute(RequestSpec::delete(column_path(table, column)))
            .await
    }

    /// Rename and/or retype `column`.
    pub async fn change_column(
        &self,
        table: &str,
        column: &str,
        new_name: &str,
        new_type: &str,
    ) -> Result<ResponseEnvelope> {
        self.execute(
            RequestSpec::put(column_path(table, column))
                .param("name", new_name)
                .param("type", new_type),
        )
        .await
    }

    pub async fn get_row(&self, table: &str, row_id: u64) -> Result<ResponseEnvelope> {
        let path = format!("{}/records/{row_id}", table_path(table));
        self.execute(RequestSpec::get(path)).await
    }

    pub async fn get_records(&self, table: &str, page: RecordsPage) -> Result<ResponseEnvelope> {
        let mut spec = RequestSpec::get(format!("{}/records", table_path(table)));
        if let Some(rows) = page.rows_per_page {
            spec = spec.param("rows_per_page", rows.to_string());
        }
        if let Some(page) = page.page {
            spec = spec.param("page", page.to_string());
        }
        self.execute(spec).await
    }

    pub async fn get_visualizations(&self) -> Result<ResponseEnvelope> {
        self.execute(RequestSpec::get("viz")).await
    }

    /// Visualization listing with `visualizations` replaced by the table
    /// details of every `type == "table"` entry, plus `total_entries`.
    ///
    /// Bodies without a `visualizations` array are returned unchanged. A
    /// failing table lookup fails the whole call.
    pub async fn get_table_visualizations(&self) -> Result<ResponseEnvelope> {
        let mut envelope = self.get_visualizations().await?;
        let Some(mut body) = envelope
            .body
            .as_json()
            .and_then(Value::as_object)
            .filter(|b| b.get("visualizations").is_some_and(Value::is_array))
            .cloned()
        else {
            return Ok(envelope);
        };

        let mut tables = Vec::new();
        for viz in visualization_list(&envelope) {
            if !is_table_visualization(&viz) {
                continue;
            }
            let Some(name) = viz.get("name").and_then(Value::as_str) else {
                continue;
            };
            match self.get_table(name).await?.body.to_json() {
                Some(Value::Null) | None => {}
                Some(Value::Object(map)) if map.is_empty() => {}
                Some(table) => tables.push(table),
            }
        }

        body.remove("visualizations");
        body.insert("total_entries".into(), Value::from(tables.len()));
        body.insert("tables".into(), Value::Array(tables));
        envelope.body = ResponseBody::Json(Value::Object(body));
        Ok(envelope)
    }

    /// Delete the first table visualization whose name matches `table`
    /// case-insensitively. `None` when nothing matched.
    pub async fn drop_table_visualization(&self, table: &str) -> Result<Option<ResponseEnvelope>> {
        let wanted = table.to_lowercase();
        let listing = self.get_visualizations().await?;

        let target = visualization_list(&listing).into_iter().find_map(|viz| {
            let name = viz.get("name").and_then(Value::as_str)?;
            if is_table_visualization(&viz) && name.to_lowercase() == wanted {
                viz.get("id").and_then(id_string)
            } else {
                None
            }
        });

        let Some(id) = target else {
            debug!(table, "no table visualization to drop");
            return Ok(None);
        };
        let response = self
            .execute(RequestSpec::delete(format!("viz/{}", encode(&id))))
            .await?;
        info!(table, viz_id = %id, "dropped table visualization");
        Ok(Some(response))
    }
}
