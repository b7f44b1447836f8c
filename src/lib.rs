pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod scheduler;
pub mod services;
pub mod shutdown;
pub mod worker;
