pub mod config;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
