//! Image compositing for generated cards
//!
//! Source photos are fitted into the photo region of the template and the
//! number region is marked with a box where the number label goes.

use image::{imageops, imageops::FilterType, DynamicImage, Pixel, Rgba, RgbaImage};
use regex::Regex;
use std::sync::OnceLock;

use crate::state::geometry::Rectangle;

/// Approximate glyph advance of the label font, in pixels
const LABEL_CHAR_WIDTH: f64 = 12.0;
/// Approximate line height of the label font, in pixels
const LABEL_HEIGHT: f64 = 30.0;
/// Semi-transparent black
const LABEL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 150]);

/// Scale `source` down (or up) to fit inside `width`×`height`, keeping its aspect ratio
pub fn fit_within(source: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (orig_width, orig_height) = (source.width().max(1), source.height().max(1));
    let scale = (width as f64 / orig_width as f64).min(height as f64 / orig_height as f64);

    let new_width = ((orig_width as f64 * scale) as u32).max(1);
    let new_height = ((orig_height as f64 * scale) as u32).max(1);

    source.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Draw `photo` centred inside `region` on a copy of the template
pub fn place_photo(template: &DynamicImage, photo: &DynamicImage, region: &Rectangle) -> RgbaImage {
    let mut result = template.to_rgba8();

    let region_width = region.width as u32;
    let region_height = region.height as u32;
    let offset_x = region_width.saturating_sub(photo.width()) / 2;
    let offset_y = region_height.saturating_sub(photo.height()) / 2;

    let x = region.x.max(0.0) as i64 + offset_x as i64;
    let y = region.y.max(0.0) as i64 + offset_y as i64;

    imageops::overlay(&mut result, &photo.to_rgba8(), x, y);
    result
}

/// Label printed in the number region
pub fn number_label(number: &str) -> String {
    format!("N° {}", number)
}

/// Box covering where the label text sits, centred on the region
pub fn label_box(region: &Rectangle, label: &str) -> Rectangle {
    let width = label.chars().count() as f64 * LABEL_CHAR_WIDTH;
    let center = region.center();
    Rectangle::new(
        (center.x - width / 2.0).max(0.0),
        (center.y - LABEL_HEIGHT / 2.0).max(0.0),
        width,
        LABEL_HEIGHT,
    )
}

/// Fill the label box of `region`, clipped to the image
pub fn mark_number(image: &mut RgbaImage, region: &Rectangle, number: &str) {
    let area = label_box(region, &number_label(number));

    let x0 = area.x as u32;
    let y0 = area.y as u32;
    let x1 = x0.saturating_add(area.width as u32).min(image.width());
    let y1 = y0.saturating_add(area.height as u32).min(image.height());

    for y in y0..y1 {
        for x in x0..x1 {
            image.get_pixel_mut(x, y).blend(&LABEL_COLOR);
        }
    }
}

/// First run of digits in a file stem, or the 1-based position of the file
pub fn extract_number(file_stem: &str, fallback: usize) -> String {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit pattern"));

    digits
        .find(file_stem)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
