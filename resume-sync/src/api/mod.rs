//! Inbound HTTP surface.
//!
//! - **[`handlers`]**: the webhook receiver at `POST /resume-sync`
//! - **[`models`]**: webhook events in, per-event result records out

pub mod handlers;
pub mod models;
