//! # Microblog Rust Backend
//!
//! REST backend for a small social-posting service: users register and log in,
//! publish short text posts, comment on them, like and save other people's
//! posts, and superusers promote or demote managers.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Domain records, identifiers and content rules
//! - [`db`]: Repository traits, in-memory and PostgreSQL backends
//! - [`auth`]: Password hashing, token issuance and permission predicates
//! - [`services`]: Per-resource request handling, independent of HTTP
//! - [`http`]: Axum-based HTTP server, routing and JSON serialization
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod auth;
pub mod db;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
