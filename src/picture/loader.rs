/// Display frame loading
///
/// Decodes a cached still into display-ready RGBA pixels: optional crop
/// to the solar disc, then a resize to the square display surface.
/// Decoding is CPU-bound, so it runs on the blocking pool.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

use super::crop;
use crate::error::Result;

/// Colour of the built-in "no data" frame
const PLACEHOLDER_COLOUR: Rgba<u8> = Rgba([8, 8, 12, 255]);

/// How a still is turned into a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Side of the square display surface
    pub size: u32,
    /// Crop to the disc before scaling
    pub cropping: bool,
    /// Padding kept around the disc when cropping
    pub crop_extra_edge: u32,
}

/// A decoded, display-sized image
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Frame {
    fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgba: image.into_raw(),
        }
    }
}

/// Load a cached still as a display frame
pub async fn load_frame(path: PathBuf, options: FrameOptions) -> Result<Frame> {
    tokio::task::spawn_blocking(move || load_frame_blocking(&path, options)).await?
}

/// Blocking implementation of frame loading
pub fn load_frame_blocking(path: &Path, options: FrameOptions) -> Result<Frame> {
    let image = image::open(path)?;
    Ok(prepare(image, options))
}

fn prepare(image: DynamicImage, options: FrameOptions) -> Frame {
    let image = if options.cropping {
        crop::crop_to_disc(image, options.crop_extra_edge)
    } else {
        image
    };

    let scaled = image.resize_exact(options.size, options.size, FilterType::Triangle);
    Frame::from_image(scaled.into_rgba8())
}

/// The frame shown while the cache is empty
///
/// Uses `image` when it is set and decodes, otherwise a plain dark frame.
pub fn placeholder_frame(image: Option<&Path>, options: FrameOptions) -> Frame {
    if let Some(path) = image {
        match image::open(path) {
            Ok(decoded) => {
                return prepare(
                    decoded,
                    FrameOptions {
                        cropping: false,
                        ..options
                    },
                )
            }
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "unusable placeholder image"),
        }
    }

    Frame::from_image(RgbaImage::from_pixel(options.size, options.size, PLACEHOLDER_COLOUR))
}
