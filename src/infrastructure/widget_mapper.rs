// Mapper between domain widgets and the stored page document
use crate::application::gateways::GridDocument;
use crate::domain::error::DashboardError;
use crate::domain::geometry::Bounds;
use crate::domain::widget::{Alignment, ChartKind, Pagination, Widget, WidgetKind, DEFAULT_PAGE_SIZE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat, camelCase widget record as kept in a page's `page_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWidget {
    pub id: String,
    pub start_row: i64,
    pub start_col: i64,
    pub end_row: i64,
    pub end_col: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub widget_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pagination: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGrid {
    #[serde(default)]
    pub widgets: Vec<StoredWidget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

pub fn widget_to_stored(widget: &Widget) -> StoredWidget {
    let (chart_type, page_size, enable_pagination) = match widget.kind {
        WidgetKind::Chart(kind) => (Some(kind.to_string()), None, None),
        WidgetKind::Table(pagination) => (None, Some(pagination.page_size()), Some(pagination.enabled)),
        WidgetKind::Card | WidgetKind::Heading => (None, None, None),
    };

    StoredWidget {
        id: widget.id.clone(),
        start_row: i64::from(widget.bounds.start_row),
        start_col: i64::from(widget.bounds.start_col),
        end_row: i64::from(widget.bounds.end_row),
        end_col: i64::from(widget.bounds.end_col),
        title: widget.title.clone(),
        description: widget.description.clone(),
        widget_type: widget.kind.name().to_string(),
        chart_type,
        sql_query: widget.query.clone(),
        alignment: widget.alignment,
        page_size,
        enable_pagination,
    }
}

fn cell_index(value: i64, field: &str) -> Result<u32, DashboardError> {
    u32::try_from(value).map_err(|_| DashboardError::InvalidWidget(format!("{field} out of range: {value}")))
}

pub fn stored_to_widget(stored: StoredWidget) -> Result<Widget, DashboardError> {
    let kind = match stored.widget_type.as_str() {
        "chart" => WidgetKind::Chart(match stored.chart_type.as_deref() {
            Some(chart_type) => chart_type.parse()?,
            None => ChartKind::Bar,
        }),
        "card" => WidgetKind::Card,
        "heading" => WidgetKind::Heading,
        "table" => WidgetKind::Table(Pagination::new(
            stored.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            stored.enable_pagination.unwrap_or(true),
        )?),
        other => {
            return Err(DashboardError::InvalidWidget(format!("unknown widget type: {other}")));
        }
    };

    Ok(Widget {
        bounds: Bounds::new(
            cell_index(stored.start_row, "startRow")?,
            cell_index(stored.start_col, "startCol")?,
            cell_index(stored.end_row, "endRow")?,
            cell_index(stored.end_col, "endCol")?,
        ),
        id: stored.id,
        kind,
        title: stored.title,
        description: stored.description,
        query: stored.sql_query,
        alignment: stored.alignment,
    })
}

pub fn document_to_json(document: &GridDocument) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(StoredGrid {
        widgets: document.widgets.iter().map(widget_to_stored).collect(),
        last_modified: Some(document.last_modified),
    })
}

/// Parses a stored page config. Widgets that cannot be mapped are dropped.
pub fn document_from_json(value: serde_json::Value) -> serde_json::Result<GridDocument> {
    let grid: StoredGrid = serde_json::from_value(value)?;
    let widgets = grid
        .widgets
        .into_iter()
        .filter_map(|stored| {
            let id = stored.id.clone();
            stored_to_widget(stored)
                .map_err(|e| tracing::warn!("Skipping stored widget {}: {}", id, e))
                .ok()
        })
        .collect();

    Ok(GridDocument {
        widgets,
        last_modified: grid.last_modified.unwrap_or_else(Utc::now),
    })
}
