pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod resource;
pub mod state;
pub mod user;
pub mod validation;
