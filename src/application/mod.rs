// Application layer - Use cases and collaborator traits
pub mod dashboard_service;
pub mod gateways;
pub mod query_scheduler;

#[cfg(test)]
pub(crate) mod test_support;
