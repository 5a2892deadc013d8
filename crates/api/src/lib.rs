pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod seed;
