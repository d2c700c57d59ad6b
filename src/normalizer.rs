//! Turning raw grayscale images into normalized face vectors.
//!
//! The core only needs a [`FaceNormalizer`]. [`MaskedFaceNormalizer`] is the
//! stock implementation: it asks a [`FaceLocator`] where the face is, crops
//! and masks that region, resizes it to a fixed size and rescales the
//! intensities. Real face detection plugs in as a custom locator.

use image::imageops::{self, FilterType};
use image::Luma;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{GrayImage, Vector};

/// Capability that maps a grayscale image to a fixed-size face vector.
///
/// Returns `None` when no face could be found; callers skip such images.
pub trait FaceNormalizer {
    fn normalize(&self, image: &GrayImage) -> Option<Vector>;

    /// `(height, width)` of every vector this normalizer produces.
    fn face_shape(&self) -> (usize, usize);
}

/// Axis-aligned pixel rectangle containing a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection with a `width x height` image, or `None` if nothing is left.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<FaceRegion> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            None
        } else {
            Some(FaceRegion::new(self.x, self.y, w, h))
        }
    }
}

/// Finds the face in an image.
pub trait FaceLocator {
    fn locate(&self, image: &GrayImage) -> Option<FaceRegion>;
}

impl<F> FaceLocator for F
where
    F: Fn(&GrayImage) -> Option<FaceRegion>,
{
    fn locate(&self, image: &GrayImage) -> Option<FaceRegion> {
        self(image)
    }
}

/// Treats the whole frame as the face. Suitable for pre-cropped datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeFrameLocator;

impl FaceLocator for WholeFrameLocator {
    fn locate(&self, image: &GrayImage) -> Option<FaceRegion> {
        if image.width() == 0 || image.height() == 0 {
            None
        } else {
            Some(FaceRegion::new(0, 0, image.width(), image.height()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub width: u32,
    pub height: u32,
    /// Blank out pixels outside the ellipse inscribed in the face region.
    pub elliptical_mask: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            elliptical_mask: true,
        }
    }
}

/// Crop, mask, resize, rescale to roughly [-1, 1] and mean-center.
#[derive(Debug, Clone)]
pub struct MaskedFaceNormalizer<L = WholeFrameLocator> {
    config: NormalizerConfig,
    locator: L,
}

impl MaskedFaceNormalizer<WholeFrameLocator> {
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        Self::with_locator(config, WholeFrameLocator)
    }
}

impl<L: FaceLocator> MaskedFaceNormalizer<L> {
    pub fn with_locator(config: NormalizerConfig, locator: L) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "face size must be non-zero, got {}x{}",
                config.width, config.height
            )));
        }
        Ok(Self { config, locator })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }
}

impl<L: FaceLocator> FaceNormalizer for MaskedFaceNormalizer<L> {
    fn normalize(&self, image: &GrayImage) -> Option<Vector> {
        let region = self
            .locator
            .locate(image)?
            .clamp_to(image.width(), image.height())?;

        let mut face =
            imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
        if self.config.elliptical_mask {
            apply_elliptical_mask(&mut face);
        }

        let resized = imageops::resize(
            &face,
            self.config.width,
            self.config.height,
            FilterType::Triangle,
        );

        let mut vector: Vector = resized
            .pixels()
            .map(|p| (f64::from(p.0[0]) - 127.0) / 127.0)
            .collect();
        let mean = vector.mean()?;
        vector -= mean;
        Some(vector)
    }

    fn face_shape(&self) -> (usize, usize) {
        (self.config.height as usize, self.config.width as usize)
    }
}

fn apply_elliptical_mask(face: &mut GrayImage) {
    let (w, h) = (face.width() as f64, face.height() as f64);
    let (cx, cy) = ((w - 1.0) / 2.0, (h - 1.0) / 2.0);
    let (rx, ry) = (w / 2.0, h / 2.0);

    for (x, y, pixel) in face.enumerate_pixels_mut() {
        let dx = (x as f64 - cx) / rx;
        let dy = (y as f64 - cy) / ry;
        if dx * dx + dy * dy > 1.0 {
            *pixel = Luma([0]);
        }
    }
}
