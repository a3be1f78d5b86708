//! Crop and zoom geometry for the review panels.

use crate::constants::layout::*;

/// Sizes of the panels components are rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Runner panel width
    pub primary_width: u32,
    /// Runner panel height
    pub primary_height: u32,
    /// Height of the shoe column
    pub shoe_container_height: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            primary_width: DEFAULT_PRIMARY_SIZE.0,
            primary_height: DEFAULT_PRIMARY_SIZE.1,
            shoe_container_height: DEFAULT_SHOE_CONTAINER_HEIGHT,
        }
    }
}

impl Layout {
    /// Create a layout from widget sizes. Zero sizes (widgets not laid out
    /// yet) fall back to the defaults.
    pub fn new(primary_width: u32, primary_height: u32, shoe_container_height: u32) -> Self {
        let default = Self::default();
        let or_default = |value: u32, fallback: u32| if value > 0 { value } else { fallback };
        Self {
            primary_width: or_default(primary_width, default.primary_width),
            primary_height: or_default(primary_height, default.primary_height),
            shoe_container_height: or_default(
                shoe_container_height,
                default.shoe_container_height,
            ),
        }
    }
}

/// Thumbnail size: fixed width, aspect ratio kept.
pub fn thumbnail_size(width: u32, height: u32) -> (u32, u32) {
    let scaled = u64::from(THUMBNAIL_WIDTH) * u64::from(height) / u64::from(width.max(1));
    (THUMBNAIL_WIDTH, (scaled as u32).max(1))
}

/// Zoom for the runner crop: fill the panel, within the zoom limits.
pub fn primary_scale(crop_width: u32, crop_height: u32, layout: Layout) -> f32 {
    let scale_x = layout.primary_width as f32 * PRIMARY_FILL / crop_width.max(1) as f32;
    let scale_y = layout.primary_height as f32 * PRIMARY_FILL / crop_height.max(1) as f32;
    scale_x
        .min(scale_y)
        .clamp(PRIMARY_MIN_SCALE, PRIMARY_MAX_SCALE)
}

/// Output size of the runner crop.
pub fn primary_size(crop_width: u32, crop_height: u32, layout: Layout) -> (u32, u32) {
    let scale = primary_scale(crop_width, crop_height, layout);
    (
        ((crop_width as f32 * scale) as u32).max(PRIMARY_MIN_SIDE),
        ((crop_height as f32 * scale) as u32).max(PRIMARY_MIN_SIDE),
    )
}

/// Space available to each shoe crop in the shoe column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShoeSpace {
    pub width: f32,
    pub height: f32,
}

/// Split the shoe column between `shoe_count` crops, after reserving room
/// for labels, margins, spacing and padding.
pub fn shoe_space(shoe_count: usize, container_height: u32) -> ShoeSpace {
    let width = (SHOE_CONTAINER_WIDTH - SHOE_SIDE_PADDING) as f32;
    if shoe_count == 0 {
        return ShoeSpace {
            width,
            height: SHOE_MIN_AVAILABLE_HEIGHT,
        };
    }

    let count = shoe_count as f32;
    let reserved = count * (SHOE_LABEL_HEIGHT + SHOE_WIDGET_MARGINS) as f32
        + SHOE_SPACING as f32 * (count - 1.0)
        + SHOE_COLUMN_PADDING as f32;
    let height = ((container_height as f32 - reserved) / count).max(SHOE_MIN_AVAILABLE_HEIGHT);

    ShoeSpace { width, height }
}

/// Output size of a shoe crop.
pub fn shoe_size(crop_width: u32, crop_height: u32, space: ShoeSpace) -> (u32, u32) {
    let scale = (space.height / crop_height.max(1) as f32)
        .min(space.width / crop_width.max(1) as f32)
        .clamp(SHOE_MIN_SCALE, SHOE_MAX_SCALE);
    (
        ((crop_width as f32 * scale) as u32).max(SHOE_MIN_WIDTH),
        ((crop_height as f32 * scale) as u32).max(SHOE_MIN_HEIGHT),
    )
}
