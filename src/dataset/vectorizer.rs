use image::{
    imageops::{self, FilterType},
    GrayImage, ImageError, Luma,
};
use std::{
    error, fmt,
    path::{Path, PathBuf},
};

/// Turns an image file into a network input vector.
pub trait Vectorizer {
    /// Length of every vector this vectorizer produces.
    fn vector_len(&self) -> usize;

    fn vectorize(&self, path: &Path) -> Result<Vec<f64>, VectorizeError>;
}

const WHITE: Luma<u8> = Luma([u8::MAX]);

/// Vectorizes pictures of dark symbols on a light background.
///
/// The symbol's bounding box (pixels darker than mid grey) is centered on a white square
/// with a margin, the square is downscaled to `side x side`, and each pixel becomes
/// its darkness `1 - brightness`, with faint values up to `ink_threshold` dropped to zero.
/// Any format the `image` crate decodes is accepted, colors are reduced to luminance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageVectorizer {
    side: u32,
    ink_threshold: f64,
}

impl ImageVectorizer {
    /// White border added around the symbol's bounding box, in source pixels.
    pub const MARGIN: u32 = 20;
    const DARK: u8 = 128;

    pub fn new(side: u32, ink_threshold: f64) -> Self {
        Self {
            side: side.max(1),
            ink_threshold,
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Bounding box `(x, y, width, height)` of the dark pixels, `None` for a blank image.
    fn bounds(image: &GrayImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[0] < Self::DARK {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    }
                });
            }
        }
        bounds.map(|(min_x, min_y, max_x, max_y)| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Crops the symbol and pastes it centered on a white square canvas.
    /// Returns a copy of `image` if it has no dark pixels.
    pub fn center(image: &GrayImage) -> GrayImage {
        let (x, y, width, height) = match Self::bounds(image) {
            Some(b) => b,
            None => return image.clone(),
        };

        let size = width.max(height) + Self::MARGIN;
        let sign = imageops::crop_imm(image, x, y, width, height).to_image();
        let mut canvas = GrayImage::from_pixel(size, size, WHITE);
        imageops::replace(
            &mut canvas,
            &sign,
            ((size - width) / 2).into(),
            ((size - height) / 2).into(),
        );
        canvas
    }

    /// Full pipeline on a decoded image.
    ///
    /// # Examples
    /// ```
    /// # use image::{GrayImage, Luma};
    /// # use toponet::dataset::ImageVectorizer;
    /// let vectorizer = ImageVectorizer::new(4, 0.1);
    /// let blank = GrayImage::from_pixel(8, 8, Luma([255]));
    /// assert_eq!(vectorizer.vectorize_image(&blank), vec![0.0; 16]);
    /// ```
    pub fn vectorize_image(&self, image: &GrayImage) -> Vec<f64> {
        let scaled = imageops::resize(
            &Self::center(image),
            self.side,
            self.side,
            FilterType::Triangle,
        );
        scaled
            .pixels()
            .map(|p| {
                let ink = 1.0 - p[0] as f64 / 255.0;
                if ink > self.ink_threshold {
                    ink
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Default for ImageVectorizer {
    fn default() -> Self {
        Self::new(20, 0.1)
    }
}

impl Vectorizer for ImageVectorizer {
    fn vector_len(&self) -> usize {
        (self.side * self.side) as usize
    }

    fn vectorize(&self, path: &Path) -> Result<Vec<f64>, VectorizeError> {
        let image = image::open(path)
            .map_err(|e| VectorizeError::Decode(path.to_owned(), e))?
            .to_luma8();
        if image.width() == 0 || image.height() == 0 {
            return Err(VectorizeError::BadFormat(format!(
                "{} has no pixels",
                path.display()
            )));
        }
        Ok(self.vectorize_image(&image))
    }
}

#[derive(Debug)]
pub enum VectorizeError {
    Decode(PathBuf, ImageError),
    BadFormat(String),
}

impl fmt::Display for VectorizeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            VectorizeError::Decode(path, e) => {
                write!(f, "Can't read image {}: {}!", path.display(), e)
            }
            VectorizeError::BadFormat(reason) => write!(f, "Not a usable image: {}!", reason),
        }
    }
}

impl error::Error for VectorizeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            VectorizeError::Decode(_, e) => Some(e),
            VectorizeError::BadFormat(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("toponet-{}-{}", std::process::id(), name))
    }

    #[test]
    fn symbol_is_centered_with_margin() {
        let mut image = GrayImage::from_pixel(10, 10, WHITE);
        // 2x4 dark block in the top-left corner
        for y in 0..4 {
            for x in 0..2 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        let centered = ImageVectorizer::center(&image);

        assert_eq!(centered.dimensions(), (4 + 20, 4 + 20));
        assert_eq!(centered.get_pixel(11, 10)[0], 0);
        assert_eq!(centered.get_pixel(12, 13)[0], 0);
        assert_eq!(centered.get_pixel(10, 10)[0], 255);
        assert_eq!(centered.get_pixel(13, 10)[0], 255);
    }

    #[test]
    fn blank_image_is_not_cropped() {
        let image = GrayImage::from_pixel(3, 3, Luma([200]));
        assert_eq!(ImageVectorizer::center(&image), image);
    }

    #[test]
    fn faint_pixels_are_dropped() {
        let image = GrayImage::from_pixel(40, 40, Luma([0]));

        // Each quadrant of the 60x60 canvas is mostly covered by the symbol
        let vector = ImageVectorizer::new(2, 0.1).vectorize_image(&image);
        assert_eq!(vector.len(), 4);
        for &v in vector.iter() {
            assert!(v > 0.3 && v < 0.9, "unexpected ink {}", v);
            assert!((v - vector[0]).abs() < 2.0 / 255.0);
        }

        let vector = ImageVectorizer::new(2, 0.95).vectorize_image(&image);
        assert_eq!(vector, vec![0.0; 4]);
    }

    #[test]
    fn reads_png_files() {
        let path = temp_path("symbol.png");
        let mut image = GrayImage::from_pixel(30, 30, WHITE);
        for y in 5..25 {
            for x in 13..17 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        image.save(&path).unwrap();

        let vectorizer = ImageVectorizer::new(5, 0.1);
        let vector = vectorizer.vectorize(&path).unwrap();
        assert_eq!(vector.len(), vectorizer.vector_len());
        assert_eq!(vector, vectorizer.vectorize_image(&image));
        assert!(vector.iter().any(|&v| v > 0.0));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn broken_files_are_errors() {
        let signature_only = temp_path("broken.png");
        fs::write(&signature_only, b"\x89PNG\r\n\x1a\n").unwrap();
        let huge_header = temp_path("huge.pgm");
        fs::write(&huge_header, b"P5 4294967296 4294967296 255\n\0").unwrap();

        let vectorizer = ImageVectorizer::default();
        for path in [&signature_only, &huge_header, &temp_path("missing.png")].iter() {
            match vectorizer.vectorize(path) {
                Err(VectorizeError::Decode(p, _)) => assert_eq!(&p, *path),
                other => panic!("expected a decode error, got {:?}", other),
            }
        }

        let _ = fs::remove_file(&signature_only);
        let _ = fs::remove_file(&huge_header);
    }
}
