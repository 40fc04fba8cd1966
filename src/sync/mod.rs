mod api;
mod client;
mod endpoint;
mod error;
pub mod scripted;

pub use api::{HttpTrackingApi, TrackingApi};
pub use client::SyncClient;
pub use endpoint::{ApiFlavor, Endpoint, DEFAULT_HOST};
pub use error::{classify_response, SyncError};
