// Domain layer - Grid engine, filters and query templating; no I/O
pub mod chart;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod row;
pub mod runtime;
pub mod selection;
pub mod store;
pub mod template;
pub mod widget;
