//! HTTP handlers.
//!
//! - [`resume_sync`]: the HubSpot webhook receiver

pub mod resume_sync;
