// Transient per-widget query state, keyed by widget id and never persisted
use super::error::DashboardError;
use super::row::Row;
use super::widget::{Pagination, WidgetId};
use std::collections::HashMap;

/// Paging cursor of a table widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePaging {
    /// Page the next "load more" request will fetch.
    pub next_page: u32,
    pub has_more: bool,
}

impl Default for TablePaging {
    fn default() -> Self {
        Self {
            next_page: 0,
            has_more: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetRuntimeState {
    pub loading: bool,
    pub error: Option<DashboardError>,
    pub rows: Vec<Row>,
    /// Column names of the latest non-empty result, in order.
    pub columns: Vec<String>,
    pub paging: Option<TablePaging>,
    generation: u64,
}

/// Identifies one issued request. Only the latest ticket per widget may write results.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub widget_id: WidgetId,
    pub page: u32,
    pub pagination: Option<Pagination>,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request for the same widget was issued; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeStates {
    states: HashMap<WidgetId, WidgetRuntimeState>,
}

impl RuntimeStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, widget_id: &str) -> Option<&WidgetRuntimeState> {
        self.states.get(widget_id)
    }

    pub fn is_loading(&self, widget_id: &str) -> bool {
        self.get(widget_id).is_some_and(|s| s.loading)
    }

    fn entry(&mut self, widget_id: &str) -> &mut WidgetRuntimeState {
        self.states.entry(widget_id.to_string()).or_default()
    }

    /// Starts a request, superseding whatever is in flight for the widget.
    pub fn begin(&mut self, widget_id: &str, page: u32, pagination: Option<Pagination>) -> Ticket {
        let state = self.entry(widget_id);
        state.generation += 1;
        state.loading = true;
        state.error = None;
        if pagination.is_some() && state.paging.is_none() {
            state.paging = Some(TablePaging::default());
        }
        Ticket {
            widget_id: widget_id.to_string(),
            page,
            pagination,
            generation: state.generation,
        }
    }

    /// Starts a next-page request, unless one is already in flight or the
    /// table is exhausted.
    pub fn begin_next_page(&mut self, widget_id: &str, pagination: Pagination) -> Option<Ticket> {
        let state = self.states.get(widget_id)?;
        let paging = state.paging?;
        if state.loading || !paging.has_more || !pagination.enabled {
            return None;
        }
        Some(self.begin(widget_id, paging.next_page, Some(pagination)))
    }

    pub fn complete(&mut self, ticket: &Ticket, result: Result<Vec<Row>, DashboardError>) -> Completion {
        let Some(state) = self.states.get_mut(&ticket.widget_id) else {
            return Completion::Stale;
        };
        if state.generation != ticket.generation {
            tracing::debug!(
                "Discarding stale result for widget {} (page {})",
                ticket.widget_id,
                ticket.page
            );
            return Completion::Stale;
        }
        state.loading = false;

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                state.error = Some(e);
                return Completion::Applied;
            }
        };

        state.error = None;
        if let Some(first) = rows.first() {
            state.columns = first.columns().map(str::to_string).collect();
        } else if ticket.page == 0 {
            state.columns.clear();
        }

        match ticket.pagination {
            None => {
                state.rows = rows;
                state.paging = None;
            }
            Some(pagination) => {
                let returned = rows.len();
                if ticket.page == 0 {
                    state.rows = rows;
                } else {
                    state.rows.extend(rows);
                }
                state.paging = Some(TablePaging {
                    next_page: ticket.page + 1,
                    has_more: pagination.enabled && returned == pagination.page_size() as usize,
                });
            }
        }
        Completion::Applied
    }

    /// Records an error that prevented a request from being issued. Any
    /// in-flight request for the widget is superseded.
    pub fn record_error(&mut self, widget_id: &str, error: DashboardError) {
        let state = self.entry(widget_id);
        state.generation += 1;
        state.loading = false;
        state.error = Some(error);
    }

    /// Drops cached data, superseding any in-flight request.
    pub fn reset(&mut self, widget_id: &str) {
        if let Some(state) = self.states.get_mut(widget_id) {
            let generation = state.generation + 1;
            *state = WidgetRuntimeState {
                generation,
                ..Default::default()
            };
        }
    }

    pub fn remove(&mut self, widget_id: &str) {
        self.states.remove(widget_id);
    }
}
