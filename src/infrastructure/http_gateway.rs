// HTTP adapters for the forecast backend
use crate::application::gateways::{ColumnOptionsProvider, GridConfigRepository, GridDocument, QueryExecutor};
use crate::domain::row::Row;
use crate::infrastructure::widget_mapper::{document_from_json, document_to_json};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AnalyticsPage {
    id: Option<i64>,
    #[serde(default)]
    page_config: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CreatePage<'a> {
    page_name: &'a str,
    attributes: Map<String, Value>,
    page_config: Value,
}

#[derive(Debug, Serialize)]
struct UpdatePage {
    page_config: Value,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn page_by_name_url(&self, page_name: &str) -> String {
        format!(
            "{}/core/analytics-pages/name/{}",
            self.base_url,
            urlencoding::encode(page_name)
        )
    }

    fn query_url(&self, query: &str) -> String {
        format!(
            "{}/core/forecast-table-sql?sql_query={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn find_page(&self, page_name: &str) -> Result<Option<AnalyticsPage>> {
        let response = self
            .client
            .get(self.page_by_name_url(page_name))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send page lookup")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let page = Self::check(response)
            .await?
            .json::<AnalyticsPage>()
            .await
            .context("Failed to parse page lookup response")?;
        Ok(Some(page))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Request failed with status {}: {}", status, error_detail(&body));
    }
}

/// The backend reports failures as `{"detail": "..."}`; anything else is passed through.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl GridConfigRepository for HttpBackend {
    async fn load_grid_config(&self, page_name: &str) -> Result<Option<GridDocument>> {
        let Some(page) = self.find_page(page_name).await? else {
            tracing::info!("No stored layout for page {}", page_name);
            return Ok(None);
        };
        match page.page_config {
            None | Some(Value::Null) => Ok(None),
            Some(config) => {
                let document = document_from_json(config).context("Failed to parse stored page config")?;
                Ok(Some(document))
            }
        }
    }

    /// Upsert by page name: update the page if it exists, create it otherwise.
    async fn save_grid_config(&self, page_name: &str, document: &GridDocument) -> Result<()> {
        let page_config = document_to_json(document)?;
        let existing = self.find_page(page_name).await?.and_then(|p| p.id);

        let request = match existing {
            Some(id) => {
                tracing::debug!("Updating page {} ({})", page_name, id);
                self.client
                    .put(format!("{}/core/analytics-pages/{}", self.base_url, id))
                    .json(&UpdatePage { page_config })
            }
            None => {
                tracing::debug!("Creating page {}", page_name);
                self.client
                    .post(format!("{}/core/analytics-pages", self.base_url))
                    .json(&CreatePage {
                        page_name,
                        attributes: Map::new(),
                        page_config,
                    })
            }
        };

        let response = request.send().await.context("Failed to send page config")?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for HttpBackend {
    async fn execute_sql_query(&self, query: &str) -> Result<Vec<Row>> {
        let response = self
            .client
            .get(self.query_url(query))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send query")?;

        let data = Self::check(response)
            .await?
            .json::<QueryResponse>()
            .await
            .context("Failed to parse query response")?;

        Ok(data.data.into_iter().map(Row::from).collect())
    }
}

/// Filter options as distinct values of a column, queried through the executor.
#[derive(Clone)]
pub struct SqlColumnOptions {
    executor: Arc<dyn QueryExecutor>,
    table: String,
    limit: u32,
}

impl SqlColumnOptions {
    pub fn new(executor: Arc<dyn QueryExecutor>, table: String, limit: u32) -> Self {
        Self { executor, table, limit }
    }

    fn distinct_query(&self, column: &str) -> String {
        format!(
            "SELECT DISTINCT {column} FROM {} WHERE {column} IS NOT NULL ORDER BY {column} LIMIT {}",
            self.table, self.limit
        )
    }
}

#[async_trait]
impl ColumnOptionsProvider for SqlColumnOptions {
    async fn get_distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let rows = self
            .executor
            .execute_sql_query(&self.distinct_query(column))
            .await
            .with_context(|| format!("Failed to load options for {column}"))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get(column).or_else(|| row.value_at(0)))
            .map(|value| value.to_text())
            .filter(|value| !value.is_empty())
            .collect())
    }
}
