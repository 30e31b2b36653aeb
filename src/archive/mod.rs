/// SDO archive access
///
/// This module handles:
/// - Listing the daily browse directories (listing.rs, client.rs)
/// - Backfilling a time range into the cache (client.rs)
/// - Resolving and fetching the latest still and movie (latest.rs)
/// - Downloading into the cache without partial files (fetch.rs)
/// - The HTTP seam, swappable in tests (transport.rs)

pub mod client;
pub mod fetch;
pub mod latest;
pub mod listing;
pub mod transport;

pub use client::Archive;
pub use transport::{HttpTransport, Transport};
