// In-memory collaborators for application tests
use crate::application::gateways::{ColumnOptionsProvider, GridConfigRepository, GridDocument, QueryExecutor};
use crate::domain::row::Row;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub(crate) fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            Row::new()
                .with("week", format!("W{i}").as_str())
                .with("units", i as f64)
        })
        .collect()
}

/// Answers queries by the first registered fragment the query text contains.
#[derive(Default)]
pub(crate) struct FakeExecutor {
    responses: Mutex<Vec<(String, Result<Vec<Row>, String>)>>,
    held: Mutex<Vec<(String, Arc<Notify>)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, fragment: &str, rows: Vec<Row>) {
        self.responses
            .lock()
            .unwrap()
            .push((fragment.to_string(), Ok(rows)));
    }

    pub(crate) fn fail(&self, fragment: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((fragment.to_string(), Err(message.to_string())));
    }

    /// Queries containing `fragment` wait until the returned handle is notified.
    pub(crate) fn hold(&self, fragment: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.held
            .lock()
            .unwrap()
            .push((fragment.to_string(), notify.clone()));
        notify
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute_sql_query(&self, query: &str) -> anyhow::Result<Vec<Row>> {
        self.calls.lock().unwrap().push(query.to_string());

        let gate = self
            .held
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, notify)| notify.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());
        match response {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeRepository {
    documents: Mutex<HashMap<String, GridDocument>>,
    saves: Mutex<Vec<String>>,
    fail_saves: AtomicBool,
}

impl FakeRepository {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_document(page_name: &str, document: GridDocument) -> Arc<Self> {
        let repository = Self::default();
        repository
            .documents
            .lock()
            .unwrap()
            .insert(page_name.to_string(), document);
        Arc::new(repository)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn document(&self, page_name: &str) -> Option<GridDocument> {
        self.documents.lock().unwrap().get(page_name).cloned()
    }

    pub(crate) fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

#[async_trait]
impl GridConfigRepository for FakeRepository {
    async fn load_grid_config(&self, page_name: &str) -> anyhow::Result<Option<GridDocument>> {
        Ok(self.document(page_name))
    }

    async fn save_grid_config(&self, page_name: &str, document: &GridDocument) -> anyhow::Result<()> {
        self.saves.lock().unwrap().push(page_name.to_string());
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("service unavailable");
        }
        self.documents
            .lock()
            .unwrap()
            .insert(page_name.to_string(), document.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeOptions {
    values: Mutex<HashMap<String, Result<Vec<String>, String>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOptions {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set(&self, column: &str, values: Result<Vec<&str>, &str>) {
        let values = values
            .map(|v| v.into_iter().map(str::to_string).collect())
            .map_err(str::to_string);
        self.values.lock().unwrap().insert(column.to_string(), values);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ColumnOptionsProvider for FakeOptions {
    async fn get_distinct_values(&self, column: &str) -> anyhow::Result<Vec<String>> {
        self.calls.lock().unwrap().push(column.to_string());
        match self.values.lock().unwrap().get(column).cloned() {
            Some(Ok(values)) => Ok(values),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}
