// Widget domain model
use super::error::DashboardError;
use super::geometry::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type WidgetId = String;

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Boxplot,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::Boxplot => "boxplot",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ChartKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(Self::Bar),
            "pie" => Ok(Self::Pie),
            "line" => Ok(Self::Line),
            "boxplot" => Ok(Self::Boxplot),
            _ => Err(DashboardError::InvalidWidget(format!("unknown chart type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Incremental loading settings for table widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: u32,
    pub enabled: bool,
}

impl Pagination {
    pub fn new(page_size: u32, enabled: bool) -> Result<Self, DashboardError> {
        if page_size == 0 {
            return Err(DashboardError::InvalidWidget(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { page_size, enabled })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Chart(ChartKind),
    Card,
    Heading,
    Table(Pagination),
}

impl WidgetKind {
    /// Headings are static text; every other kind is backed by a query.
    pub fn accepts_query(&self) -> bool {
        !matches!(self, Self::Heading)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chart(_) => "chart",
            Self::Card => "card",
            Self::Heading => "heading",
            Self::Table(_) => "table",
        }
    }
}

impl Default for WidgetKind {
    fn default() -> Self {
        Self::Chart(ChartKind::Bar)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: WidgetId,
    pub bounds: Bounds,
    pub kind: WidgetKind,
    pub title: String,
    pub description: String,
    pub query: Option<String>,
    pub alignment: Alignment,
}

impl Widget {
    /// Creates a widget with a fresh id from a confirmed selection.
    pub fn new(bounds: Bounds, draft: WidgetDraft) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bounds,
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            query: draft.query,
            alignment: draft.alignment,
        }
    }

    /// The query to run, if this widget kind runs one and it is non-blank.
    pub fn executable_query(&self) -> Option<&str> {
        if !self.kind.accepts_query() {
            return None;
        }
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn pagination(&self) -> Option<Pagination> {
        match self.kind {
            WidgetKind::Table(pagination) => Some(pagination),
            _ => None,
        }
    }

    pub fn apply(&mut self, patch: WidgetPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(alignment) = patch.alignment {
            self.alignment = alignment;
        }
    }
}

/// Content entered in the widget form for a new selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetDraft {
    pub title: String,
    pub description: String,
    pub kind: WidgetKind,
    pub query: Option<String>,
    pub alignment: Alignment,
}

/// Non-geometric fields to merge into an existing widget. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<WidgetKind>,
    pub query: Option<Option<String>>,
    pub alignment: Option<Alignment>,
}
