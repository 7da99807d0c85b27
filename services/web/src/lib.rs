//! services/web/src/lib.rs
//!
//! The Edumynt web service: the page and API routes, the per-client session
//! layer and the adapters for the course store and the hosted auth backend.

pub mod adapters;
pub mod config;
pub mod error;
pub mod session;
pub mod web;
