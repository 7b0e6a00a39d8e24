// Retail forecast dashboard core: grid layout engine and parameterized query pipeline
pub mod application;
pub mod domain;
pub mod infrastructure;
