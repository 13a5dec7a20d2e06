//! CPU-side RGBA pixel buffer, the source and destination of texture uploads and downloads.

use crate::error::ImageError;
use crate::texture::ScaleMode;
use crate::util::{denormalize_rgba_color, normalize_rgba_color};
use crate::Color;
use ::image::imageops::FilterType;
use ::image::{DynamicImage, ImageReader, RgbaImage};
use std::path::Path;
use tracing::{debug, warn};

/// Row-major image with four `f32` components per pixel, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

const COMPONENTS: usize = 4;

impl Image {
    /// Creates a `width` x `height` image filled with `color`.
    pub fn create(width: usize, height: usize, color: Color) -> Self {
        let mut data = Vec::with_capacity(width * height * COMPONENTS);
        for _ in 0..width * height {
            data.extend_from_slice(&color.0);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Builds an image from tightly packed 8-bit RGBA rows.
    pub fn from_rgba8(width: usize, height: usize, bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() != width * height * COMPONENTS {
            return Err(ImageError::BufferSizeMismatch {
                width,
                height,
                actual: bytes.len(),
            });
        }

        let mut data = Vec::with_capacity(bytes.len());
        for pixel in bytes.chunks_exact(COMPONENTS) {
            data.extend_from_slice(&normalize_rgba_color(&[
                pixel[0], pixel[1], pixel[2], pixel[3],
            ]));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len());
        for pixel in self.data.chunks_exact(COMPONENTS) {
            bytes.extend_from_slice(&denormalize_rgba_color(&[
                pixel[0], pixel[1], pixel[2], pixel[3],
            ]));
        }
        bytes
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn n_pixels(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.n_pixels() == 0
    }

    /// Raw components, row-major, `[r, g, b, a]` per pixel.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn offset(&self, x: usize, y: usize) -> Result<usize, ImageError> {
        if x >= self.width || y >= self.height {
            warn!(
                "Pixel ({}, {}) is out of bounds for an image of size {}x{}",
                x, y, self.width, self.height
            );
            return Err(ImageError::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((y * self.width + x) * COMPONENTS)
    }

    fn linear_offset(&self, index: usize) -> Result<usize, ImageError> {
        let len = self.n_pixels();
        if index >= len {
            warn!(
                "Pixel index {} is out of bounds for an image with {} pixels",
                index, len
            );
            return Err(ImageError::PixelIndexOutOfBounds { index, len });
        }
        Ok(index * COMPONENTS)
    }

    fn read(&self, offset: usize) -> Color {
        Color([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    fn write(&mut self, offset: usize, color: Color) {
        self.data[offset..offset + COMPONENTS].copy_from_slice(&color.0);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Result<Color, ImageError> {
        let offset = self.offset(x, y)?;
        Ok(self.read(offset))
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) -> Result<(), ImageError> {
        let offset = self.offset(x, y)?;
        self.write(offset, color);
        Ok(())
    }

    /// Pixel by row-major linear index, `y * width + x`.
    pub fn pixel_at(&self, index: usize) -> Result<Color, ImageError> {
        let offset = self.linear_offset(index)?;
        Ok(self.read(offset))
    }

    pub fn set_pixel_at(&mut self, index: usize, color: Color) -> Result<(), ImageError> {
        let offset = self.linear_offset(index)?;
        self.write(offset, color);
        Ok(())
    }

    /// Replaces the content with the decoded file at `path`.
    ///
    /// On failure the image is reset to 0x0.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        match decode(path) {
            Ok(decoded) => {
                *self = Self::from_dynamic(decoded);
                debug!(
                    "Loaded {}x{} image from {}",
                    self.width,
                    self.height,
                    path.display()
                );
                Ok(())
            }
            Err(source) => {
                warn!("Unable to open file {}: {}", path.display(), source);
                *self = Self::default();
                Err(ImageError::Load {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Convenience for `Image::default()` followed by [`Image::load`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let mut image = Self::default();
        image.load(path)?;
        Ok(image)
    }

    /// Encodes the image to `path`; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        if self.is_empty() {
            warn!(
                "Attempting to write an image of size 0x0 to {}, no file will be generated",
                path.display()
            );
            return Err(ImageError::EmptyImage);
        }

        self.to_rgba_image()
            .save(path)
            .map_err(|source| ImageError::Save {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Copies the `width` x `height` region whose top-left corner is at `(offset_x, offset_y)`.
    /// Pixels of the region that fall outside this image are transparent.
    pub fn as_cropped(&self, offset_x: i64, offset_y: i64, width: usize, height: usize) -> Image {
        let mut out = Image::create(width, height, Color::TRANSPARENT);
        for y in 0..height {
            for x in 0..width {
                let source_x = x as i64 + offset_x;
                let source_y = y as i64 + offset_y;
                if source_x < 0
                    || source_y < 0
                    || source_x >= self.width as i64
                    || source_y >= self.height as i64
                {
                    continue;
                }
                let from = ((source_y as usize) * self.width + source_x as usize) * COMPONENTS;
                let to = (y * width + x) * COMPONENTS;
                out.data[to..to + COMPONENTS].copy_from_slice(&self.data[from..from + COMPONENTS]);
            }
        }
        out
    }

    pub fn as_flipped(&self, horizontally: bool, vertically: bool) -> Image {
        let mut out = self.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                let target_x = if horizontally { self.width - x - 1 } else { x };
                let target_y = if vertically { self.height - y - 1 } else { y };
                let from = (y * self.width + x) * COMPONENTS;
                let to = (target_y * self.width + target_x) * COMPONENTS;
                out.data[to..to + COMPONENTS].copy_from_slice(&self.data[from..from + COMPONENTS]);
            }
        }
        out
    }

    /// Resamples to `width` x `height`. Zero dimensions are raised to 1.
    pub fn as_scaled(&self, width: usize, height: usize, mode: ScaleMode) -> Image {
        if width == self.width && height == self.height {
            return self.clone();
        }

        let width = width.max(1);
        let height = height.max(1);
        if self.is_empty() {
            return Image::create(width, height, Color::TRANSPARENT);
        }

        let filter = match mode {
            ScaleMode::Nearest => FilterType::Nearest,
            ScaleMode::Linear => FilterType::Triangle,
        };
        let scaled = ::image::imageops::resize(
            &self.to_rgba_image(),
            width as u32,
            height as u32,
            filter,
        );
        Self::from_dynamic(DynamicImage::ImageRgba8(scaled))
    }

    fn to_rgba_image(&self) -> RgbaImage {
        let bytes = self.to_rgba8();
        RgbaImage::from_raw(self.width as u32, self.height as u32, bytes)
            .unwrap_or_else(|| RgbaImage::new(self.width as u32, self.height as u32))
    }

    fn from_dynamic(image: DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = Vec::with_capacity(rgba.as_raw().len());
        for pixel in rgba.pixels() {
            data.extend_from_slice(&normalize_rgba_color(&pixel.0));
        }
        Self {
            width: width as usize,
            height: height as usize,
            data,
        }
    }
}

fn decode(path: &Path) -> Result<DynamicImage, ::image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}
