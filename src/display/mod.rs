//! Turns a record and its photo into ready-to-show image components.
//!
//! [`DisplayOrchestrator`] sits between the review UI and the
//! [`AsyncImageCache`]. Rendering a record either returns the finished
//! [`Components`] (thumbnail, runner crop, one crop per shoe) or reports
//! that the photo is still loading. Completed loads are handed back to the
//! UI thread through [`DisplayOrchestrator::poll_ready`], so the cache's
//! worker never touches UI or record state.

mod annotate;
mod geometry;

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use image::DynamicImage;
use image::imageops::FilterType;

pub use annotate::{Annotate, BoxAnnotator};
pub use geometry::{
    Layout, ShoeSpace, primary_scale, primary_size, shoe_size, shoe_space, thumbnail_size,
};

use crate::cache::AsyncImageCache;
use crate::constants::{
    DEFAULT_COMPONENT_CACHE_CAPACITY, MAX_PRELOAD_PATHS, PRIORITY_FOREGROUND, PRIORITY_PRELOAD,
};
use crate::model::Record;
use crate::store::RecordStore;

/// One shoe crop, zoomed for the shoe column.
#[derive(Debug, Clone)]
pub struct ShoeCrop {
    /// Index of the shoe in the record, for shoe-level edits
    pub index: usize,
    /// Resolved brand label
    pub brand: String,
    pub image: DynamicImage,
}

/// Everything the review panels show for one record.
#[derive(Debug, Clone)]
pub struct Components {
    /// Annotated photo at thumbnail width
    pub thumbnail: DynamicImage,
    /// Annotated runner crop (whole photo without a person box)
    pub primary_crop: DynamicImage,
    /// Crops of the shoes with a usable box, in record order
    pub shoe_crops: Vec<ShoeCrop>,
}

/// Result of [`DisplayOrchestrator::render`].
#[derive(Debug, Clone)]
pub enum Render {
    Ready(Arc<Components>),
    /// The photo is being decoded; watch [`DisplayOrchestrator::poll_ready`]
    Loading,
    /// The photo could not be loaded
    Failed,
}

/// Loads that finished since the last [`DisplayOrchestrator::poll_ready`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyUpdate {
    /// Paths whose image is now available
    pub loaded: Vec<PathBuf>,
    /// Paths whose image could not be decoded
    pub failed: Vec<PathBuf>,
    /// Whether the path last passed to `render` is among them
    pub current_finished: bool,
}

struct Completion {
    path: PathBuf,
    failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ComponentKey {
    path: PathBuf,
    fingerprint: u64,
    layout: Layout,
}

impl ComponentKey {
    fn new(path: &Path, record: &Record, layout: Layout) -> Self {
        Self {
            path: path.to_path_buf(),
            fingerprint: record_fingerprint(record),
            layout,
        }
    }
}

/// Hash of the record fields that change what gets drawn.
fn record_fingerprint(record: &Record) -> u64 {
    let drawn = serde_json::to_vec(&(&record.person_bbox, &record.bib_detection, &record.shoes))
        .unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    drawn.hash(&mut hasher);
    hasher.finish()
}

/// Composes cache lookups, annotation and cropping for the review UI.
pub struct DisplayOrchestrator<A: Annotate = BoxAnnotator> {
    cache: AsyncImageCache,
    annotator: A,
    components: HashMap<ComponentKey, Arc<Components>>,
    component_capacity: usize,
    /// Paths whose last load failed; cleared by `invalidate`
    failed: HashSet<PathBuf>,
    /// Token for ignoring completions of paths no longer on screen
    current: Option<PathBuf>,
    ready_tx: Sender<Completion>,
    ready_rx: Receiver<Completion>,
}

impl DisplayOrchestrator<BoxAnnotator> {
    /// Create an orchestrator drawing plain detection boxes.
    pub fn new(cache: AsyncImageCache) -> Self {
        Self::with_annotator(cache, BoxAnnotator::default())
    }
}

impl<A: Annotate> DisplayOrchestrator<A> {
    /// Create an orchestrator with a custom annotator.
    pub fn with_annotator(cache: AsyncImageCache, annotator: A) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel();
        Self {
            cache,
            annotator,
            components: HashMap::new(),
            component_capacity: DEFAULT_COMPONENT_CACHE_CAPACITY,
            failed: HashSet::new(),
            current: None,
            ready_tx,
            ready_rx,
        }
    }

    /// Set how many rendered component sets are kept.
    pub fn with_component_capacity(mut self, capacity: usize) -> Self {
        self.component_capacity = capacity;
        self
    }

    /// The underlying image cache.
    pub fn cache(&self) -> &AsyncImageCache {
        &self.cache
    }

    /// Path of the record last passed to [`render`](Self::render).
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Number of component sets held.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Render `record`, whose photo lives at `base_path/image_path`.
    ///
    /// The record becomes the current one: only its completion sets
    /// [`ReadyUpdate::current_finished`]. A cache miss returns
    /// [`Render::Loading`]; call `render` again once `poll_ready` reports the
    /// path.
    pub fn render(&mut self, record: &Record, base_path: &Path, layout: Layout) -> Render {
        if record.image_path.is_empty() {
            log::debug!("Record has no image path, nothing to render");
            self.current = None;
            return Render::Failed;
        }

        let path = base_path.join(&record.image_path);
        self.current = Some(path.clone());

        let key = ComponentKey::new(&path, record, layout);
        if let Some(components) = self.components.get(&key) {
            log::trace!("Component cache hit: {:?}", path);
            return Render::Ready(components.clone());
        }

        if self.failed.contains(&path) {
            return Render::Failed;
        }

        let image = match self.cache.get_cached(&path) {
            Some(image) => image,
            None => {
                let tx = self.ready_tx.clone();
                let requested = self.cache.request(&path, PRIORITY_FOREGROUND, move |p, result| {
                    let _ = tx.send(Completion {
                        path: p.to_path_buf(),
                        failed: result.is_err(),
                    });
                });
                match requested {
                    Some(image) => image,
                    None => return Render::Loading,
                }
            }
        };

        let Some(components) = self.compose(&image, record, layout) else {
            log::warn!("Image {:?} is empty", path);
            return Render::Failed;
        };
        let components = Arc::new(components);

        if self.components.len() < self.component_capacity {
            self.components.insert(key, components.clone());
        }
        Render::Ready(components)
    }

    /// Collect loads that completed since the last call. Must be called from
    /// the thread that owns the orchestrator.
    pub fn poll_ready(&mut self) -> ReadyUpdate {
        let mut update = ReadyUpdate::default();

        for completion in self.ready_rx.try_iter() {
            if self.current.as_ref() == Some(&completion.path) {
                update.current_finished = true;
            }
            if completion.failed {
                self.failed.insert(completion.path.clone());
                update.failed.push(completion.path);
            } else {
                self.failed.remove(&completion.path);
                update.loaded.push(completion.path);
            }
        }

        if !update.loaded.is_empty() || !update.failed.is_empty() {
            log::trace!(
                "{} loads finished, {} failed (current: {})",
                update.loaded.len(),
                update.failed.len(),
                update.current_finished
            );
        }
        update
    }

    /// Read ahead the photos of `nearby` records (at most
    /// [`MAX_PRELOAD_PATHS`]). Returns how many loads were queued.
    pub fn preload<'a>(
        &self,
        nearby: impl IntoIterator<Item = &'a Record>,
        base_path: &Path,
    ) -> usize {
        let paths: Vec<PathBuf> = nearby
            .into_iter()
            .take(MAX_PRELOAD_PATHS)
            .filter(|record| !record.image_path.is_empty())
            .map(|record| base_path.join(&record.image_path))
            .collect();

        if paths.is_empty() {
            return 0;
        }
        self.cache.preload(&paths, PRIORITY_PRELOAD)
    }

    /// Read ahead the photos of records within `radius` of `position`.
    pub fn preload_around(
        &self,
        store: &RecordStore,
        position: usize,
        radius: usize,
        base_path: &Path,
    ) -> usize {
        let nearby = store
            .nearby_positions(position, radius)
            .into_iter()
            .filter_map(|p| store.get(p));
        self.preload(nearby, base_path)
    }

    /// Drop rendered components and remembered failures, e.g. after the
    /// panels were resized or the photos changed on disk.
    pub fn invalidate(&mut self) {
        self.components.clear();
        self.failed.clear();
    }

    fn compose(&self, image: &DynamicImage, record: &Record, layout: Layout) -> Option<Components> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return None;
        }

        let annotated = self.annotator.annotate(image, record);

        let (thumb_w, thumb_h) = thumbnail_size(width, height);
        let thumbnail = annotated.resize_exact(thumb_w, thumb_h, FilterType::Lanczos3);

        let (x, y, w, h) = record
            .person_bbox
            .and_then(|bbox| bbox.to_pixels(width, height))
            .unwrap_or((0, 0, width, height));
        let (primary_w, primary_h) = primary_size(w, h, layout);
        let primary_crop = annotated
            .crop_imm(x, y, w, h)
            .resize_exact(primary_w, primary_h, FilterType::Lanczos3);

        let space = shoe_space(record.shoes.len(), layout.shoe_container_height);
        let shoe_crops = record
            .shoes
            .iter()
            .enumerate()
            .filter_map(|(index, shoe)| {
                let Some((x, y, w, h)) = shoe.bbox.to_pixels(width, height) else {
                    log::trace!("Skipping shoe {} with an empty box", index);
                    return None;
                };
                let (shoe_w, shoe_h) = shoe_size(w, h, space);
                Some(ShoeCrop {
                    index,
                    brand: shoe.read_brand().to_string(),
                    image: image
                        .crop_imm(x, y, w, h)
                        .resize_exact(shoe_w, shoe_h, FilterType::Lanczos3),
                })
            })
            .collect();

        Some(Components {
            thumbnail,
            primary_crop,
            shoe_crops,
        })
    }
}

impl<A: Annotate> std::fmt::Debug for DisplayOrchestrator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayOrchestrator")
            .field("cache", &self.cache)
            .field("components", &self.components.len())
            .field("current", &self.current)
            .finish()
    }
}
