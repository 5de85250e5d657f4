//! # Invoicing API Library
//!
//! Multi-tenant invoicing service with a frontend (`web`) and an admin
//! (`backpack`) surface: handlers, validated requests, repositories,
//! scheduled commands and server configuration.

pub mod auth;
pub mod commands;
pub mod config;
pub mod cron;
pub mod cursor;
pub mod db;
pub mod error;
pub mod handlers;
pub mod locale;
pub mod models;
pub mod permissions;
pub mod repositories;
pub mod requests;
pub mod scheduler;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod validation;
pub use migration;
