//! Request and response models for the webhook receiver.
//!
//! - [`events`]: HubSpot webhook notifications as they arrive
//! - [`results`]: one record per processed event, returned in the response body

pub mod events;
pub mod results;
