//! SQL API and row operations
//!
//! Row writes are expressed as SQL through `run_sql`. Values are passed
//! through as SQL literals: callers quote strings themselves
//! (`("name", "'Madrid'")`), which keeps expressions such as
//! `ST_SetSRID(ST_Point(-3.7, 40.4), 4326)` usable as values.

use tracing::debug;

use crate::client::CartoClient;
use crate::error::Result;
use crate::request::RequestSpec;
use crate::response::ResponseEnvelope;

/// `INSERT` followed by a `SELECT` of the inserted row.
pub fn insert_row_sql(table: &str, data: &[(&str, &str)]) -> String {
    let (keys, values) = split_columns(data);
    format!(
        "INSERT INTO {table} ({keys}) VALUES({values});{}",
        select_current_row(table)
    )
}

/// `UPDATE` of one row by `cartodb_id` followed by a `SELECT` of that row.
pub fn update_row_sql(table: &str, row_id: u64, data: &[(&str, &str)]) -> String {
    let assignments = data
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {table} SET {assignments} WHERE cartodb_id = {row_id};\
         SELECT {table}.cartodb_id as id, {table}.* FROM {table} WHERE cartodb_id = {row_id};"
    )
}

pub fn delete_row_sql(table: &str, row_id: u64) -> String {
    format!("DELETE FROM {table} WHERE cartodb_id = {row_id};")
}

fn split_columns(data: &[(&str, &str)]) -> (String, String) {
    let keys = data.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(",");
    let values = data.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(",");
    (keys, values)
}

fn select_current_row(table: &str) -> String {
    format!(
        "SELECT {table}.cartodb_id as id, {table}.* FROM {table} \
         WHERE cartodb_id = currval('public.{table}_cartodb_id_seq');"
    )
}

impl CartoClient {
    /// Run `sql` through the SQL API (`POST sql` with `q=<sql>`).
    ///
    /// A non-2xx answer is `RequestFailed` with the body exactly as the
    /// server sent it.
    pub async fn run_sql(&self, sql: &str) -> Result<ResponseEnvelope> {
        debug!(len = sql.len(), "running SQL");
        self.execute(RequestSpec::post("sql").param("q", sql)).await
    }

    /// Insert one row; `data` maps column names to SQL literals.
    pub async fn insert_row(&self, table: &str, data: &[(&str, &str)]) -> Result<ResponseEnvelope> {
        self.run_sql(&insert_row_sql(table, data)).await
    }

    pub async fn update_row(
        &self,
        table: &str,
        row_id: u64,
        data: &[(&str, &str)],
    ) -> Result<ResponseEnvelope> {
        self.run_sql(&update_row_sql(table, row_id, data)).await
    }

    pub async fn delete_row(&self, table: &str, row_id: u64) -> Result<ResponseEnvelope> {
        self.run_sql(&delete_row_sql(table, row_id)).await
    }
}
