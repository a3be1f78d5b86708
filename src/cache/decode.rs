//! Image decoding for the cache worker.

use std::io;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageDecoder, ImageReader};
use thiserror::Error;

/// Errors reported to cache listeners when an image cannot be produced.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read image file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to start decode worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("decode worker is not running")]
    WorkerStopped,
}

/// A decode failure, shared among every listener of the same path.
pub type DecodeFailure = Arc<DecodeError>;

/// Turns a path into pixels. Runs on the cache's worker thread.
pub trait Decode: Send + Sync + 'static {
    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError>;
}

/// Decodes image files from disk, applying their EXIF orientation so that
/// bounding boxes line up with what the camera showed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl Decode for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;

        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        log::trace!(
            "Decoded {:?}: {}x{} ({:?})",
            path,
            image.width(),
            image.height(),
            orientation
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.png");
        RgbImage::from_pixel(8, 5, Rgb([10, 20, 30])).save(&path).unwrap();

        let image = FileDecoder.decode(&path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 5));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileDecoder.decode(&dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

        assert!(FileDecoder.decode(&path).is_err());
    }
}
