/// Timestamp watermark removal
///
/// Every browse still carries its capture time in white text along the
/// bottom edge. The text pixels are found by colour (near white, bottom
/// strip only) and filled in from the surrounding pixels, working from
/// the edge of the text inward so each filled pixel can serve as a source
/// for the next layer.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};

/// Height of the strip that holds the timestamp text
pub const STRIP_ROWS: u32 = 20;

/// Neighbourhood radius used when filling a pixel
pub const FILL_RADIUS: u32 = 5;

/// Lower bound (per channel) of what counts as text white
const WHITE_FLOOR: u8 = 230;

fn is_text_white(pixel: &Rgb<u8>) -> bool {
    pixel.0.iter().all(|&c| c >= WHITE_FLOOR)
}

/// Mask of near-white pixels in the bottom `rows` rows, row-major
pub fn text_mask(image: &RgbImage, rows: u32) -> Vec<bool> {
    let (width, height) = image.dimensions();
    let first_row = height.saturating_sub(rows);

    let mut mask = vec![false; (width * height) as usize];
    for y in first_row..height {
        for x in 0..width {
            if is_text_white(image.get_pixel(x, y)) {
                mask[(y * width + x) as usize] = true;
            }
        }
    }
    mask
}

/// Fill the masked pixels from their unmasked surroundings
///
/// Each pass fills the masked pixels that touch a known pixel, using the
/// inverse-square-distance weighted mean of the known pixels within
/// `radius`. Passes repeat until the mask is empty or nothing can be
/// filled (an entirely masked image).
pub fn inpaint(image: &mut RgbImage, mask: &mut [bool], radius: u32) {
    let (width, height) = image.dimensions();
    let index = |x: u32, y: u32| (y * width + x) as usize;
    let r = radius as i64;

    loop {
        let front: Vec<(u32, u32)> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .filter(|&(x, y)| mask[index(x, y)])
            .filter(|&(x, y)| {
                neighbours(x, y, width, height).any(|(nx, ny)| !mask[index(nx, ny)])
            })
            .collect();

        if front.is_empty() {
            break;
        }

        let fills: Vec<((u32, u32), Rgb<u8>)> = front
            .iter()
            .filter_map(|&(x, y)| {
                let mut sum = [0.0f64; 3];
                let mut total = 0.0f64;

                for dy in -r..=r {
                    for dx in -r..=r {
                        let (sx, sy) = (x as i64 + dx, y as i64 + dy);
                        if sx < 0 || sy < 0 || sx >= width as i64 || sy >= height as i64 {
                            continue;
                        }
                        let d2 = (dx * dx + dy * dy) as f64;
                        if d2 == 0.0 || d2 > (r * r) as f64 {
                            continue;
                        }
                        let (sx, sy) = (sx as u32, sy as u32);
                        if mask[index(sx, sy)] {
                            continue;
                        }
                        let weight = 1.0 / d2;
                        let pixel = image.get_pixel(sx, sy);
                        for c in 0..3 {
                            sum[c] += pixel.0[c] as f64 * weight;
                        }
                        total += weight;
                    }
                }

                (total > 0.0).then(|| {
                    let mean = |c: usize| (sum[c] / total).round().clamp(0.0, 255.0) as u8;
                    ((x, y), Rgb([mean(0), mean(1), mean(2)]))
                })
            })
            .collect();

        for &((x, y), pixel) in &fills {
            image.put_pixel(x, y, pixel);
            mask[index(x, y)] = false;
        }
    }
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
        (nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64).then_some((nx as u32, ny as u32))
    })
}

/// Return a copy of `image` with the bottom-strip text inpainted
pub fn remove_timestamp(image: &RgbImage, rows: u32, radius: u32) -> RgbImage {
    let mut output = image.clone();
    let mut mask = text_mask(image, rows);
    inpaint(&mut output, &mut mask, radius);
    output
}

/// Decode a JPEG, remove its timestamp and encode it again
pub fn scrub_jpeg(bytes: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?.into_rgb8();
    let clean = remove_timestamp(&image, STRIP_ROWS, FILL_RADIUS);

    let mut out = Cursor::new(Vec::new());
    clean.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

/// Remove the timestamp from a cached still, in place
pub fn scrub_file(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let clean = scrub_jpeg(&bytes)?;
    std::fs::write(path, clean).map_err(|e| Error::io(path, e))
}

/// Batch mode: scrub every cached still in `dir`, returning how many were cleaned
///
/// Files that fail are logged and left as they are.
pub fn scrub_directory(dir: &Path) -> usize {
    let mut cleaned = 0;
    for path in crate::state::cache::scan(dir) {
        match scrub_file(&path) {
            Ok(()) => {
                tracing::debug!(file = %path.display(), "watermark removed");
                cleaned += 1;
            }
            Err(err) => tracing::warn!(file = %path.display(), error = %err, "watermark removal failed"),
        }
    }
    cleaned
}
