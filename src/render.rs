//! Converting normalized faces back to viewable images.

use image::{GenericImage, Luma};

use crate::error::{Error, Result};
use crate::transform::AlteredFace;
use crate::{GrayImage, Matrix};

/// Maps a `(height, width)` face with values around [-1, 1] to 8-bit gray.
/// Values outside that range are clamped.
pub fn to_gray_image(face: &Matrix) -> Result<GrayImage> {
    let (height, width) = face.dim();
    if height == 0 || width == 0 {
        return Err(Error::dimension("cannot render an empty face"));
    }
    let (w, h) = (to_u32(width)?, to_u32(height)?);

    Ok(GrayImage::from_fn(w, h, |x, y| {
        let v = face[[y as usize, x as usize]];
        Luma([(v * 127.0 + 127.0).round().clamp(0.0, 255.0) as u8])
    }))
}

/// Original face on top, altered face below.
pub fn comparison_image(original: &Matrix, altered: &Matrix) -> Result<GrayImage> {
    if original.dim() != altered.dim() {
        return Err(Error::dimension(format!(
            "original is {:?} but altered is {:?}",
            original.dim(),
            altered.dim()
        )));
    }

    let top = to_gray_image(original)?;
    let bottom = to_gray_image(altered)?;

    let mut canvas = GrayImage::new(top.width(), top.height() * 2);
    canvas.copy_from(&top, 0, 0)?;
    canvas.copy_from(&bottom, 0, top.height())?;
    Ok(canvas)
}

impl AlteredFace {
    pub fn comparison_image(&self) -> Result<GrayImage> {
        comparison_image(&self.original, &self.altered)
    }
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::dimension(format!("face dimension {} is too large", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_to_gray_image_scaling() {
        let face = array![[-1.0, 0.0, 1.0], [-5.0, 0.5, 5.0]];
        let image = to_gray_image(&face).unwrap();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(1, 0).0[0], 127);
        assert_eq!(image.get_pixel(2, 0).0[0], 254);
        assert_eq!(image.get_pixel(0, 1).0[0], 0);
        assert_eq!(image.get_pixel(1, 1).0[0], 191);
        assert_eq!(image.get_pixel(2, 1).0[0], 255);
    }

    #[test]
    fn test_empty_face_rejected() {
        assert!(to_gray_image(&Matrix::zeros((0, 3))).is_err());
    }

    #[test]
    fn test_comparison_image_stacks_faces() {
        let original = Matrix::from_elem((2, 3), -1.0);
        let altered = Matrix::from_elem((2, 3), 1.0);

        let canvas = comparison_image(&original, &altered).unwrap();

        assert_eq!(canvas.dimensions(), (3, 4));
        assert_eq!(canvas.get_pixel(2, 1).0[0], 0);
        assert_eq!(canvas.get_pixel(2, 2).0[0], 254);

        let face = AlteredFace { original, altered };
        assert_eq!(face.comparison_image().unwrap(), canvas);
    }

    #[test]
    fn test_comparison_shape_mismatch() {
        let result = comparison_image(&Matrix::zeros((2, 3)), &Matrix::zeros((3, 2)));
        assert!(matches!(result, Err(Error::Dimension(_))));
    }
}
