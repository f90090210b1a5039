//! Virtual try-on overlay
//!
//! This library discovers on-page images, attaches a try-on control to each exactly
//! once, and drives try-on jobs against a remote image-synthesis queue until the
//! output image replaces the original.

pub mod app_state;
pub mod config;
pub mod discovery;
pub mod models;
pub mod routes;
pub mod services;
