// Query scheduler - Gates, templates, paginates and executes widget queries
use crate::application::gateways::QueryExecutor;
use crate::domain::chart::{reduce, ChartData};
use crate::domain::error::DashboardError;
use crate::domain::filters::FilterSet;
use crate::domain::runtime::{Completion, RuntimeStates, Ticket, WidgetRuntimeState};
use crate::domain::template::{paginate, substitute};
use crate::domain::widget::{Widget, WidgetId, WidgetKind};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Page identity and its filter values, handed to every execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub page_name: &'a str,
    pub filters: &'a FilterSet,
}

impl<'a> QueryContext<'a> {
    pub fn new(page_name: &'a str, filters: &'a FilterSet) -> Self {
        Self { page_name, filters }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was sent: no query, filters incomplete, or a page already in flight.
    Skipped,
    Applied,
    /// A newer request for the widget superseded this one.
    Stale,
    Failed(DashboardError),
}

#[derive(Clone)]
pub struct QueryScheduler {
    executor: Arc<dyn QueryExecutor>,
    states: Arc<Mutex<RuntimeStates>>,
}

impl QueryScheduler {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            states: Arc::new(Mutex::new(RuntimeStates::new())),
        }
    }

    pub async fn state(&self, widget_id: &str) -> Option<WidgetRuntimeState> {
        self.states.lock().await.get(widget_id).cloned()
    }

    /// Chart render data reduced from the widget's cached rows.
    pub async fn chart_data(&self, widget: &Widget) -> Option<ChartData> {
        let WidgetKind::Chart(kind) = widget.kind else {
            return None;
        };
        let states = self.states.lock().await;
        let state = states.get(&widget.id)?;
        Some(reduce(&state.rows, kind))
    }

    pub async fn reset(&self, widget_id: &str) {
        self.states.lock().await.reset(widget_id);
    }

    pub async fn remove(&self, widget_id: &str) {
        self.states.lock().await.remove(widget_id);
    }

    /// Templated query text, or `None` when the widget must not run yet.
    fn prepare(widget: &Widget, ctx: &QueryContext<'_>) -> Option<Result<String, DashboardError>> {
        let template = widget.executable_query()?;
        if !ctx.filters.is_ready() {
            tracing::debug!(
                "Widget {} on {} waiting for filters: {}",
                widget.id,
                ctx.page_name,
                ctx.filters.missing().join(", ")
            );
            return None;
        }
        Some(substitute(template, ctx.filters).validate())
    }

    /// Runs a widget from its first page. Supersedes any request in flight.
    pub async fn refresh_widget(&self, widget: &Widget, ctx: &QueryContext<'_>) -> RunOutcome {
        let query = match Self::prepare(widget, ctx) {
            None => return RunOutcome::Skipped,
            Some(Ok(query)) => query,
            Some(Err(e)) => return self.reject(widget, e).await,
        };

        let pagination = widget.pagination();
        let query = match pagination {
            Some(p) if p.enabled => paginate(&query, 0, p.page_size()),
            _ => query,
        };
        let ticket = self.states.lock().await.begin(&widget.id, 0, pagination);
        self.execute(ticket, query).await
    }

    /// Fetches the next table page. Ignored while a page is in flight or once
    /// the table is exhausted.
    pub async fn load_more(&self, widget: &Widget, ctx: &QueryContext<'_>) -> RunOutcome {
        let Some(pagination) = widget.pagination() else {
            return RunOutcome::Skipped;
        };
        let query = match Self::prepare(widget, ctx) {
            None => return RunOutcome::Skipped,
            Some(Ok(query)) => query,
            Some(Err(e)) => return self.reject(widget, e).await,
        };

        let Some(ticket) = self.states.lock().await.begin_next_page(&widget.id, pagination) else {
            tracing::debug!("Widget {} has no page to load", widget.id);
            return RunOutcome::Skipped;
        };
        let query = paginate(&query, ticket.page, pagination.page_size());
        self.execute(ticket, query).await
    }

    /// Runs every widget concurrently; one failure does not affect the others.
    pub async fn refresh_all(&self, widgets: &[Widget], ctx: &QueryContext<'_>) -> Vec<(WidgetId, RunOutcome)> {
        let runs = widgets.iter().map(|widget| async move {
            let outcome = self.refresh_widget(widget, ctx).await;
            (widget.id.clone(), outcome)
        });
        join_all(runs).await
    }

    async fn reject(&self, widget: &Widget, error: DashboardError) -> RunOutcome {
        tracing::warn!("Widget {} not executed: {}", widget.id, error);
        self.states.lock().await.record_error(&widget.id, error.clone());
        RunOutcome::Failed(error)
    }

    async fn execute(&self, ticket: Ticket, query: String) -> RunOutcome {
        tracing::debug!("Executing query for widget {}: {}", ticket.widget_id, query);

        let result = self
            .executor
            .execute_sql_query(&query)
            .await
            .map_err(|e| DashboardError::QueryExecution(format!("{e:#}")));
        if let Err(e) = &result {
            tracing::warn!("Query for widget {} failed: {}", ticket.widget_id, e);
        }

        let error = result.as_ref().err().cloned();
        match self.states.lock().await.complete(&ticket, result) {
            Completion::Stale => RunOutcome::Stale,
            Completion::Applied => match error {
                Some(e) => RunOutcome::Failed(e),
                None => RunOutcome::Applied,
            },
        }
    }
}
