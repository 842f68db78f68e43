//! Pie chart rasteriser for the session tally.

use image::{Rgb, RgbImage};
use std::f64::consts::PI;

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 480;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PIE_CENTER: (f64, f64) = (240.0, 240.0);
const PIE_RADIUS: f64 = 200.0;
const LEGEND_X: u32 = 490;
const LEGEND_Y: u32 = 40;
const SWATCH: u32 = 20;
const SWATCH_GAP: u32 = 12;

/// Matplotlib's "Paired" qualitative palette.
pub const PALETTE: [[u8; 3]; 12] = [
    [166, 206, 227],
    [31, 120, 180],
    [178, 223, 138],
    [51, 160, 44],
    [251, 154, 153],
    [227, 26, 28],
    [253, 191, 111],
    [255, 127, 0],
    [202, 178, 214],
    [106, 61, 154],
    [255, 255, 153],
    [177, 89, 40],
];

pub fn slice_color(index: usize) -> Rgb<u8> {
    Rgb(PALETTE[index % PALETTE.len()])
}

/// Draw a pie with one slice per count, clockwise from twelve o'clock, plus a
/// column of legend swatches in slice order.
pub fn render_pie(counts: &[u64]) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return img;
    }

    // Cumulative upper bound of each slice as a fraction of the full turn.
    let mut bounds = Vec::with_capacity(counts.len());
    let mut acc = 0u64;
    for c in counts {
        acc += c;
        bounds.push(acc as f64 / total as f64);
    }

    let (cx, cy) = PIE_CENTER;
    let x0 = (cx - PIE_RADIUS).floor().max(0.0) as u32;
    let x1 = ((cx + PIE_RADIUS).ceil() as u32).min(CHART_WIDTH - 1);
    let y0 = (cy - PIE_RADIUS).floor().max(0.0) as u32;
    let y1 = ((cy + PIE_RADIUS).ceil() as u32).min(CHART_HEIGHT - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy > PIE_RADIUS * PIE_RADIUS {
                continue;
            }
            // 0 at twelve o'clock, growing clockwise (image y points down).
            let mut angle = dx.atan2(-dy);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            let turn = angle / (2.0 * PI);
            let slice = bounds
                .iter()
                .position(|b| turn < *b)
                .unwrap_or(bounds.len() - 1);
            img.put_pixel(x, y, slice_color(slice));
        }
    }

    for (i, _) in counts.iter().enumerate() {
        let top = LEGEND_Y + i as u32 * (SWATCH + SWATCH_GAP);
        if top + SWATCH >= CHART_HEIGHT {
            break;
        }
        for y in top..top + SWATCH {
            for x in LEGEND_X..LEGEND_X + SWATCH {
                img.put_pixel(x, y, slice_color(i));
            }
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slice_fills_circle() {
        let img = render_pie(&[5]);
        assert_eq!(*img.get_pixel(240, 240), slice_color(0));
        assert_eq!(*img.get_pixel(240, 100), slice_color(0));
        assert_eq!(*img.get_pixel(5, 5), BACKGROUND);
    }

    #[test]
    fn halves_split_left_and_right() {
        let img = render_pie(&[1, 1]);
        // First slice runs clockwise from the top, so it covers the right half.
        assert_eq!(*img.get_pixel(340, 240), slice_color(0));
        assert_eq!(*img.get_pixel(140, 240), slice_color(1));
    }

    #[test]
    fn legend_has_swatch_per_slice() {
        let img = render_pie(&[3, 2, 1]);
        for i in 0..3u32 {
            let y = LEGEND_Y + i * (SWATCH + SWATCH_GAP) + 1;
            assert_eq!(*img.get_pixel(LEGEND_X + 1, y), slice_color(i as usize));
        }
    }

    #[test]
    fn empty_counts_give_blank_canvas() {
        let img = render_pie(&[]);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }
}
