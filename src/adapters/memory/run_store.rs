//! In-memory run store for testing and local composition.
//!
//! Holds run metadata and execution records in process memory and assembles
//! result tables the same shape the database-backed collaborator would
//! produce. Seeding helpers keep test setup short.
//!
//! # Panics
//!
//! Methods may panic if internal locks are poisoned. This adapter is meant
//! for tests and local wiring, not production storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::analysis::{DataTable, Row};
use crate::ports::{RunResultStore, RunStoreError, TestRunRecord, RESULT_COLUMNS};

/// In-memory [`RunResultStore`].
#[derive(Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<i64, TestRunRecord>>,
    results: RwLock<HashMap<i64, Vec<Row>>>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a run record.
    pub fn seed_run(&self, record: TestRunRecord) {
        self.runs
            .write()
            .expect("InMemoryRunStore: runs lock poisoned")
            .insert(record.id, record);
    }

    /// Adds one execution record with the canonical columns.
    pub fn seed_result(&self, run_id: i64, run_index: i64, latency_ms: Value, tokens_used: Value) {
        let mut results = self
            .results
            .write()
            .expect("InMemoryRunStore: results lock poisoned");
        let rows = results.entry(run_id).or_default();
        let mut row = Row::new();
        row.insert("result_id".into(), json!(rows.len() as i64 + 1));
        row.insert("test_run_id".into(), json!(run_id));
        row.insert("run_index".into(), json!(run_index));
        row.insert("latency_ms".into(), latency_ms);
        row.insert("tokens_used".into(), tokens_used);
        row.insert("created_at".into(), json!(Utc::now().to_rfc3339()));
        rows.push(row);
    }

    /// Adds a pre-built execution record (for unit-grouped datasets).
    pub fn seed_row(&self, run_id: i64, row: Row) {
        self.results
            .write()
            .expect("InMemoryRunStore: results lock poisoned")
            .entry(run_id)
            .or_default()
            .push(row);
    }

    /// Number of seeded records for a run.
    pub fn result_count(&self, run_id: i64) -> usize {
        self.results
            .read()
            .expect("InMemoryRunStore: results lock poisoned")
            .get(&run_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RunResultStore for InMemoryRunStore {
    async fn get_run(&self, run_id: i64) -> Result<Option<TestRunRecord>, RunStoreError> {
        Ok(self
            .runs
            .read()
            .expect("InMemoryRunStore: runs lock poisoned")
            .get(&run_id)
            .cloned())
    }

    async fn load_results(&self, run_id: i64) -> Result<DataTable, RunStoreError> {
        let rows = self
            .results
            .read()
            .expect("InMemoryRunStore: results lock poisoned")
            .get(&run_id)
            .cloned()
            .unwrap_or_default();

        // Canonical columns first, then whatever extras the rows carry, in
        // first-seen order.
        let mut columns: Vec<String> = RESULT_COLUMNS.iter().map(|c| c.to_string()).collect();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.clone());
                }
            }
        }

        Ok(DataTable::from_rows(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RunStatus;

    #[tokio::test]
    async fn missing_run_yields_none() {
        let store = InMemoryRunStore::new();
        assert!(store.get_run(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_run_yields_empty_table_with_columns() {
        let store = InMemoryRunStore::new();
        let table = store.load_results(1).await.unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), RESULT_COLUMNS.len());
        assert!(table.has_column("latency_ms"));
    }

    #[tokio::test]
    async fn seeded_results_round_trip() {
        let store = InMemoryRunStore::new();
        store.seed_run(TestRunRecord::new(5, "run", RunStatus::Completed));
        store.seed_result(5, 1, json!(120), json!(60));
        store.seed_result(5, 2, json!(100), json!(50));

        assert_eq!(store.result_count(5), 2);
        let table = store.load_results(5).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "latency_ms"), Some(&json!(120)));
        assert_eq!(table.cell(1, "run_index"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn extra_row_keys_extend_columns() {
        let store = InMemoryRunStore::new();
        let mut row = Row::new();
        row.insert("latency_ms".into(), json!(100));
        row.insert("tokens_used".into(), json!(50));
        row.insert("unit_id".into(), json!(1));
        store.seed_row(9, row);

        let table = store.load_results(9).await.unwrap();
        assert!(table.has_column("unit_id"));
        assert_eq!(table.columns.last().map(String::as_str), Some("unit_id"));
    }
}
