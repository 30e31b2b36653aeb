/// State management module
///
/// This module handles all local state, including:
/// - Shared data structures (data.rs)
/// - The cache directory: scanning and eviction (cache.rs)
/// - The persisted last-check marker (marker.rs)
/// - Slideshow rotation, cross-fade and exit handling (rotation.rs)
/// - Kiosk settings (settings.rs)

pub mod cache;
pub mod data;
pub mod marker;
pub mod rotation;
pub mod settings;
