//! The external project tracker: HTTP client, query documents and the raw
//! wire shapes they return.

pub mod client;
pub mod queries;
pub mod wire;

pub use client::TrackerClient;
