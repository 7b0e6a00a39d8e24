// Collaborator traits for persistence, query execution and filter options
use crate::domain::row::Row;
use crate::domain::widget::Widget;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The full widget list of one page, saved and loaded as a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDocument {
    pub widgets: Vec<Widget>,
    pub last_modified: DateTime<Utc>,
}

impl GridDocument {
    pub fn new(widgets: Vec<Widget>) -> Self {
        Self {
            widgets,
            last_modified: Utc::now(),
        }
    }
}

#[async_trait]
pub trait GridConfigRepository: Send + Sync {
    /// Load the document stored under an exact (case-sensitive) page name
    async fn load_grid_config(&self, page_name: &str) -> anyhow::Result<Option<GridDocument>>;

    /// Replace the document stored under a page name
    async fn save_grid_config(&self, page_name: &str, document: &GridDocument) -> anyhow::Result<()>;
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_sql_query(&self, query: &str) -> anyhow::Result<Vec<Row>>;
}

#[async_trait]
pub trait ColumnOptionsProvider: Send + Sync {
    /// Distinct non-empty values of a column, used as filter options
    async fn get_distinct_values(&self, column: &str) -> anyhow::Result<Vec<String>>;
}
