//! The `taskman` library crate.
//!
//! This crate contains the domain models, authentication mechanisms, routing
//! configuration, email notifications, avatar processing, and error handling
//! for the task-manager application. The main binary (`main.rs`) uses it to
//! construct and run the HTTP server.

pub mod auth;
pub mod avatar;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod routes;
