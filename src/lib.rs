//! Test Run Dashboard server library.
//!
//! Ingests per-test results from parallel Cypress and Playwright workers
//! and merges them into one aggregate per build and spec file.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
