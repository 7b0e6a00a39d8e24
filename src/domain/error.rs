// Error taxonomy shared by the grid engine and the query pipeline
use super::geometry::Bounds;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    /// The bounds would intersect another widget. Never committed.
    #[error("Bounds {bounds} overlap widget {conflicting_id}")]
    Overlap { bounds: Bounds, conflicting_id: String },
    #[error("Bounds {bounds} fall outside the {rows}x{cols} grid")]
    OutOfBounds { bounds: Bounds, rows: u32, cols: u32 },
    /// Placeholders survived substitution; the query is not sent.
    #[error("Unresolved placeholders: {}", unresolved.join(", "))]
    Templating { unresolved: Vec<String> },
    #[error("Query execution failed: {0}")]
    QueryExecution(String),
    #[error("Widget not found: {0}")]
    NotFound(String),
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Invalid widget: {0}")]
    InvalidWidget(String),
    #[error("Invalid interaction state: {0}")]
    InvalidState(String),
}
