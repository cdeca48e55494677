pub mod api;
pub mod config;
pub mod custody;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod services;
