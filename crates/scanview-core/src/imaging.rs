//! Image manipulation
//!
//! Crop, rotate, resize and re-encode operations behind the
//! `ImageManipulator` trait. Each call takes an image URI and returns the URI
//! of a newly written image; the input is never modified.
//!
//! The page filters (black & white, grayscale, high contrast, magic) are
//! passthroughs: they record the choice on the page but do not alter
//! pixels. Helpers for crop and rotate fall back to the original URI when the
//! manipulation fails.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::PageFilter;

/// URI scheme prefix for local files
const FILE_SCHEME: &str = "file://";

/// Quality used when saving crops and rotations
pub const EDIT_QUALITY: f32 = 0.9;

/// Errors from image manipulation
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to access image '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Crop region {width}x{height} at ({x}, {y}) is outside the {image_width}x{image_height} image")]
    InvalidCrop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Unsupported rotation: {0} degrees (must be a multiple of 90)")]
    UnsupportedRotation(i32),
}

/// A single manipulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageAction {
    /// Resize; a missing dimension keeps the aspect ratio, both given is exact
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Crop to a rectangle in pixels
    Crop {
        origin_x: u32,
        origin_y: u32,
        width: u32,
        height: u32,
    },
    /// Rotate clockwise by a multiple of 90 degrees
    Rotate { degrees: i32 },
}

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Jpeg,
    Png,
}

impl SaveFormat {
    fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Png => "png",
        }
    }
}

/// Output options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveOptions {
    /// Compression quality from 0.0 (smallest) to 1.0 (best)
    pub compress: f32,
    pub format: SaveFormat,
}

impl SaveOptions {
    pub fn jpeg(compress: f32) -> Self {
        Self {
            compress,
            format: SaveFormat::Jpeg,
        }
    }
}

/// Something that can apply manipulation steps to an image
pub trait ImageManipulator: Send + Sync {
    /// Apply `actions` in order and save the result, returning its URI
    fn manipulate(
        &self,
        uri: &str,
        actions: &[ImageAction],
        options: SaveOptions,
    ) -> Result<String, ImageError>;
}

/// Manipulator backed by the `image` crate, writing into one directory
#[derive(Debug, Clone)]
pub struct LocalImageManipulator {
    output_dir: PathBuf,
}

impl LocalImageManipulator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write outputs into the configured `filtered/` directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.filtered_dir())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ImageManipulator for LocalImageManipulator {
    fn manipulate(
        &self,
        uri: &str,
        actions: &[ImageAction],
        options: SaveOptions,
    ) -> Result<String, ImageError> {
        let input = uri_to_path(uri);
        let mut img = image::open(&input).map_err(|e| match e {
            image::ImageError::IoError(source) => ImageError::Io {
                path: input.clone(),
                source,
            },
            other => ImageError::Codec(other),
        })?;

        for action in actions {
            img = apply_action(img, action)?;
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ImageError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let output = self.output_dir.join(format!(
            "{}.{}",
            uuid::Uuid::new_v4(),
            options.format.extension()
        ));

        let bytes = encode(&img, options)?;
        std::fs::write(&output, bytes).map_err(|source| ImageError::Io {
            path: output.clone(),
            source,
        })?;

        debug!(
            "Manipulated {:?} -> {:?} ({}x{})",
            input,
            output,
            img.width(),
            img.height()
        );
        Ok(path_to_uri(&output))
    }
}

fn apply_action(img: DynamicImage, action: &ImageAction) -> Result<DynamicImage, ImageError> {
    match *action {
        ImageAction::Resize { width, height } => Ok(match (width, height) {
            (Some(w), Some(h)) => img.resize_exact(w, h, FilterType::Triangle),
            (Some(w), None) => {
                let h = scaled(img.height(), w, img.width());
                img.resize_exact(w, h, FilterType::Triangle)
            }
            (None, Some(h)) => {
                let w = scaled(img.width(), h, img.height());
                img.resize_exact(w, h, FilterType::Triangle)
            }
            (None, None) => img,
        }),
        ImageAction::Crop {
            origin_x,
            origin_y,
            width,
            height,
        } => {
            let fits = width > 0
                && height > 0
                && origin_x.saturating_add(width) <= img.width()
                && origin_y.saturating_add(height) <= img.height();
            if !fits {
                return Err(ImageError::InvalidCrop {
                    x: origin_x,
                    y: origin_y,
                    width,
                    height,
                    image_width: img.width(),
                    image_height: img.height(),
                });
            }
            Ok(img.crop_imm(origin_x, origin_y, width, height))
        }
        ImageAction::Rotate { degrees } => match degrees.rem_euclid(360) {
            0 => Ok(img),
            90 => Ok(img.rotate90()),
            180 => Ok(img.rotate180()),
            270 => Ok(img.rotate270()),
            _ => Err(ImageError::UnsupportedRotation(degrees)),
        },
    }
}

/// Scale `side` by `target / reference`, never below one pixel
fn scaled(side: u32, target: u32, reference: u32) -> u32 {
    if reference == 0 {
        return target.max(1);
    }
    ((side as u64 * target as u64) / reference as u64).max(1) as u32
}

fn encode(img: &DynamicImage, options: SaveOptions) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    match options.format {
        SaveFormat::Jpeg => {
            let quality = (options.compress.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        SaveFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
    }
    Ok(buf)
}

/// Convert a URI (`file://...` or a bare path) to a filesystem path
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri))
}

/// Convert a filesystem path to a `file://` URI
pub fn path_to_uri(path: &Path) -> String {
    format!("{}{}", FILE_SCHEME, path.display())
}

/// Record a filter choice; the image itself is returned unchanged
pub fn apply_filter(uri: &str, filter: PageFilter) -> String {
    if filter != PageFilter::Original {
        debug!("Filter {} is recorded but not rendered", filter);
    }
    uri.to_string()
}

/// Crop an image, returning the original URI if cropping fails
pub fn crop_or_original<M: ImageManipulator + ?Sized>(
    manipulator: &M,
    uri: &str,
    origin_x: u32,
    origin_y: u32,
    width: u32,
    height: u32,
) -> String {
    let action = ImageAction::Crop {
        origin_x,
        origin_y,
        width,
        height,
    };
    manipulator
        .manipulate(uri, &[action], SaveOptions::jpeg(EDIT_QUALITY))
        .unwrap_or_else(|e| {
            warn!("Error cropping image {}: {}", uri, e);
            uri.to_string()
        })
}

/// Rotate an image, returning the original URI if rotating fails
///
/// Full turns are a no-op and return the input URI.
pub fn rotate_or_original<M: ImageManipulator + ?Sized>(
    manipulator: &M,
    uri: &str,
    degrees: i32,
) -> String {
    if degrees.rem_euclid(360) == 0 {
        return uri.to_string();
    }
    manipulator
        .manipulate(
            uri,
            &[ImageAction::Rotate { degrees }],
            SaveOptions::jpeg(EDIT_QUALITY),
        )
        .unwrap_or_else(|e| {
            warn!("Error rotating image {}: {}", uri, e);
            uri.to_string()
        })
}

/// Resize an image to exactly 1080x1920 at quality 0.8, returning the
/// original on failure. The aspect ratio is not preserved.
pub fn resize_or_original<M: ImageManipulator + ?Sized>(manipulator: &M, uri: &str) -> String {
    let action = ImageAction::Resize {
        width: Some(1080),
        height: Some(1920),
    };
    manipulator
        .manipulate(uri, &[action], SaveOptions::jpeg(0.8))
        .unwrap_or_else(|e| {
            warn!("Error resizing image {}: {}", uri, e);
            uri.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_test_image(dir: &Path, width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 128]));
        let path = dir.join("input.png");
        img.save(&path).unwrap();
        path_to_uri(&path)
    }

    fn dimensions(uri: &str) -> (u32, u32) {
        let img = image::open(uri_to_path(uri)).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_uri_conversion() {
        assert_eq!(uri_to_path("file:///tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
        assert_eq!(uri_to_path("/tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
        assert_eq!(path_to_uri(Path::new("/tmp/a.jpg")), "file:///tmp/a.jpg");
    }

    #[test]
    fn test_resize_keeps_aspect_with_one_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let uri = write_test_image(temp_dir.path(), 400, 200);
        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));

        let out = manipulator
            .manipulate(
                &uri,
                &[ImageAction::Resize {
                    width: Some(100),
                    height: None,
                }],
                SaveOptions::jpeg(0.3),
            )
            .unwrap();

        assert!(out.ends_with(".jpg"));
        assert_eq!(dimensions(&out), (100, 50));
        // Input untouched
        assert_eq!(dimensions(&uri), (400, 200));
    }

    #[test]
    fn test_crop_and_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let uri = write_test_image(temp_dir.path(), 40, 30);
        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));

        let out = manipulator
            .manipulate(
                &uri,
                &[
                    ImageAction::Crop {
                        origin_x: 5,
                        origin_y: 5,
                        width: 20,
                        height: 10,
                    },
                    ImageAction::Rotate { degrees: 90 },
                ],
                SaveOptions {
                    compress: 1.0,
                    format: SaveFormat::Png,
                },
            )
            .unwrap();

        assert!(out.ends_with(".png"));
        assert_eq!(dimensions(&out), (10, 20));
    }

    #[test]
    fn test_invalid_crop_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let uri = write_test_image(temp_dir.path(), 40, 30);
        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));

        let err = manipulator
            .manipulate(
                &uri,
                &[ImageAction::Crop {
                    origin_x: 30,
                    origin_y: 0,
                    width: 20,
                    height: 10,
                }],
                SaveOptions::jpeg(0.9),
            )
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidCrop { .. }));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let manipulator = LocalImageManipulator::new(temp_dir.path());
        let err = manipulator
            .manipulate("file:///does/not/exist.jpg", &[], SaveOptions::jpeg(0.9))
            .unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }

    #[test]
    fn test_helpers_fall_back_to_original() {
        let temp_dir = TempDir::new().unwrap();
        let manipulator = LocalImageManipulator::new(temp_dir.path());
        let missing = "file:///does/not/exist.jpg";

        assert_eq!(crop_or_original(&manipulator, missing, 0, 0, 10, 10), missing);
        assert_eq!(rotate_or_original(&manipulator, missing, 90), missing);
        assert_eq!(resize_or_original(&manipulator, missing), missing);
    }

    #[test]
    fn test_rotate_full_turn_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let uri = write_test_image(temp_dir.path(), 10, 10);
        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));

        assert_eq!(rotate_or_original(&manipulator, &uri, 360), uri);
        assert_eq!(rotate_or_original(&manipulator, &uri, 0), uri);
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_rotate_rejects_odd_angles() {
        let temp_dir = TempDir::new().unwrap();
        let uri = write_test_image(temp_dir.path(), 10, 10);
        let manipulator = LocalImageManipulator::new(temp_dir.path().join("out"));

        let err = manipulator
            .manipulate(&uri, &[ImageAction::Rotate { degrees: 45 }], SaveOptions::jpeg(0.9))
            .unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedRotation(45)));
        // Fallback helper keeps the input
        assert_eq!(rotate_or_original(&manipulator, &uri, 45), uri);
    }

    #[test]
    fn test_filters_are_passthrough() {
        for filter in PageFilter::ALL {
            assert_eq!(apply_filter("file:///a.jpg", filter), "file:///a.jpg");
        }
    }
}
