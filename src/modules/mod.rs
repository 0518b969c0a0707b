pub mod api;
pub mod coordinator;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod requests;
pub mod routing;
pub mod serialize;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;
