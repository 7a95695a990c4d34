//! # Tasklane API Server Library
//!
//! HTTP surface of the Tasklane task manager. Handlers stay thin: they
//! authenticate, extract, call into `tasklane_shared::services` and map the
//! result onto a response.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON-rejecting request extractors
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
