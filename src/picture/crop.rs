use image::DynamicImage;

/// Luminance above which a pixel counts as part of the solar disc or corona
pub const DISC_FLOOR: u8 = 24;

/// Square crop window `(x, y, side)` around the bright part of the image
///
/// The bounding box of pixels brighter than `floor` is padded by `padding`
/// pixels, grown to a square around its centre and clamped to the image.
/// Returns `None` when nothing is bright enough or the crop would keep the
/// whole image anyway.
pub fn disc_bounds(image: &DynamicImage, floor: u8, padding: u32) -> Option<(u32, u32, u32)> {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for (x, y, pixel) in luma.enumerate_pixels() {
        if pixel.0[0] > floor {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x == u32::MAX {
        return None;
    }

    let min_x = min_x.saturating_sub(padding);
    let min_y = min_y.saturating_sub(padding);
    let max_x = (max_x + padding).min(width - 1);
    let max_y = (max_y + padding).min(height - 1);

    let side = (max_x - min_x + 1).max(max_y - min_y + 1).min(width.min(height));
    let centre_x = (min_x + max_x + 1) / 2;
    let centre_y = (min_y + max_y + 1) / 2;
    let x = centre_x.saturating_sub(side / 2).min(width - side);
    let y = centre_y.saturating_sub(side / 2).min(height - side);

    if side == width && side == height {
        return None;
    }
    Some((x, y, side))
}

/// Crop to the solar disc, or return the image unchanged if there is nothing to crop
pub fn crop_to_disc(image: DynamicImage, padding: u32) -> DynamicImage {
    match disc_bounds(&image, DISC_FLOOR, padding) {
        Some((x, y, side)) => {
            tracing::trace!(x, y, side, "cropping to disc");
            image.crop_imm(x, y, side, side)
        }
        None => image,
    }
}
