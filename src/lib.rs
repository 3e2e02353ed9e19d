pub mod config;
pub mod constants;
pub mod ingest;
pub mod logging;
pub mod middleware;
pub mod recommend;
pub mod reconcile;
pub mod response;
pub mod routes;
pub mod source;
pub mod state;
pub mod store;
pub mod workers;
