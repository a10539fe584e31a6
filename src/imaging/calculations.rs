//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// A single responsive size to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsiveSize {
    pub width: u32,
    pub height: u32,
}

/// Calculate which widths to generate and their heights.
///
/// Requested widths larger than the source are dropped (no upscaling). If
/// nothing remains, the source width is used. The result is deduplicated
/// and ascending; heights keep the source aspect ratio.
///
/// ```
/// # use halide::imaging::calculate_responsive_sizes;
/// let sizes = calculate_responsive_sizes((2000, 1000), &[2400, 1080, 600]);
/// assert_eq!(sizes.iter().map(|s| s.width).collect::<Vec<_>>(), vec![600, 1080]);
/// assert_eq!(sizes[1].height, 540);
/// ```
pub fn calculate_responsive_sizes(original: (u32, u32), widths: &[u32]) -> Vec<ResponsiveSize> {
    let (orig_w, _) = original;

    let mut kept: Vec<u32> = widths
        .iter()
        .copied()
        .filter(|&w| w > 0 && w <= orig_w)
        .collect();
    if kept.is_empty() {
        kept.push(orig_w);
    }
    kept.sort_unstable();
    kept.dedup();

    kept.into_iter()
        .map(|width| ResponsiveSize {
            width,
            height: scaled_height(original, width),
        })
        .collect()
}

/// Height for `width` at the source aspect ratio, never below one pixel.
pub fn scaled_height(original: (u32, u32), width: u32) -> u32 {
    let (orig_w, orig_h) = original;
    if orig_w == 0 {
        return orig_h;
    }
    ((orig_h as f64 * width as f64 / orig_w as f64).round() as u32).max(1)
}

/// Orientation reported on `<picture data-orientation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self::Landscape,
            std::cmp::Ordering::Less => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Square,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Square => "square",
        }
    }
}
