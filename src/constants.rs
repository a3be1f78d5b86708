//! Global constants for the runview core

/// Default number of decoded images kept resident in the image cache
pub const DEFAULT_IMAGE_CACHE_CAPACITY: usize = 100;

/// Extra entries evicted past the capacity so eviction does not run on every insert
pub const CACHE_EVICTION_BUFFER: usize = 10;

/// How long the decode worker sleeps when its queue is empty
pub const WORKER_IDLE_SLEEP_MS: u64 = 10;

/// Priority used for foreground requests (lower is serviced first)
pub const PRIORITY_FOREGROUND: u32 = 0;

/// Priority used for read-ahead requests
pub const PRIORITY_PRELOAD: u32 = 5;

/// Default priority for `AsyncImageCache::preload` when the caller has no preference
pub const PRIORITY_PRELOAD_DEFAULT: u32 = 10;

/// Maximum number of undo snapshots kept
pub const MAX_UNDO_SNAPSHOTS: usize = 50;

/// Records before and after the selection whose images are read ahead
pub const DEFAULT_PRELOAD_RADIUS: usize = 5;

/// Maximum number of paths handed to the image cache per preload call
pub const MAX_PRELOAD_PATHS: usize = 10;

/// Maximum number of rendered component sets kept by the display orchestrator
pub const DEFAULT_COMPONENT_CACHE_CAPACITY: usize = 30;

/// Sort position for bib numbers that are empty, "?" or not an integer
pub const UNKNOWN_BIB_POSITION: i64 = 999_999;

/// Category value detectors emit when the run category could not be read
pub const NOT_IDENTIFIABLE: &str = "Not Identifiable";

/// Display/index form of [`NOT_IDENTIFIABLE`]
pub const UNKNOWN_CATEGORY: &str = "?";

/// Index gender for records that carry none
pub const UNKNOWN_GENDER: &str = "Desconhecido";

/// Default bib (chest plate) detection confidence threshold
pub const DEFAULT_BIB_THRESHOLD: f64 = 0.5;

/// Default shoe detection confidence threshold
pub const DEFAULT_SHOE_THRESHOLD: f64 = 0.5;

/// Display geometry
pub mod layout {
    /// Width of the overview thumbnail in pixels
    pub const THUMBNAIL_WIDTH: u32 = 150;

    /// Default size of the runner (primary crop) panel
    pub const DEFAULT_PRIMARY_SIZE: (u32, u32) = (400, 600);

    /// Default height of the shoe column
    pub const DEFAULT_SHOE_CONTAINER_HEIGHT: u32 = 400;

    /// Fixed width of the shoe column
    pub const SHOE_CONTAINER_WIDTH: u32 = 270;

    /// Fraction of the primary panel a crop may fill
    pub const PRIMARY_FILL: f32 = 0.95;

    /// Primary crop zoom limits
    pub const PRIMARY_MIN_SCALE: f32 = 0.1;
    pub const PRIMARY_MAX_SCALE: f32 = 3.0;
    pub const PRIMARY_MIN_SIDE: u32 = 50;

    /// Shoe crop zoom limits
    pub const SHOE_MIN_SCALE: f32 = 0.2;
    pub const SHOE_MAX_SCALE: f32 = 4.0;
    pub const SHOE_MIN_WIDTH: u32 = 60;
    pub const SHOE_MIN_HEIGHT: u32 = 40;

    /// Vertical space reserved around each shoe crop
    pub const SHOE_LABEL_HEIGHT: u32 = 20;
    pub const SHOE_WIDGET_MARGINS: u32 = 10;
    pub const SHOE_SPACING: u32 = 5;
    pub const SHOE_COLUMN_PADDING: u32 = 30;
    pub const SHOE_SIDE_PADDING: u32 = 20;
    pub const SHOE_MIN_AVAILABLE_HEIGHT: f32 = 60.0;
}
