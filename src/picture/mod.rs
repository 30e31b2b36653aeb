/// Image processing module
///
/// This module handles:
/// - Removing the burned-in timestamp from downloaded stills (watermark.rs)
/// - Cropping to the solar disc (crop.rs)
/// - Decoding cached stills into display frames (loader.rs)

pub mod crop;
pub mod loader;
pub mod watermark;
