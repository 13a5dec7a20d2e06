use crate::util::{denormalize_rgba_color, normalize_rgba_color};

/// Represents a color in RGBA format.
///
/// Each channel is a 32-bit float in the range [0.0, 1.0]. This is the layout vertex colors
/// are uploaded in, so a `Color` can be written to the GPU without conversion.
///
/// # Examples
///
/// ```
/// use vecshape::Color;
///
/// // Opaque red
/// let red = Color::rgb(1.0, 0.0, 0.0);
///
/// // Semi-transparent blue
/// let semi_blue = Color::rgba(0.0, 0.0, 1.0, 0.5);
///
/// // Colors built from 8-bit channels are normalized
/// let from_bytes = Color::from_rgba8([255, 0, 0, 255]);
/// assert_eq!(from_bytes, red);
///
/// assert_eq!(semi_blue.to_array(), [0.0, 0.0, 1.0, 0.5]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color(pub [f32; 4]);

impl Color {
    /// A transparent color.
    ///
    /// All color channels are set to zero, making the color fully transparent.
    pub const TRANSPARENT: Self = Self([0.0, 0.0, 0.0, 0.0]);
    /// A black color.
    ///
    /// Red, green, and blue channels are set to zero, and alpha is fully opaque.
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    /// A white color.
    ///
    /// Every channel is set to one. Used as the neutral color multiplier.
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);

    /// Creates a new color with the specified RGB values and full opacity.
    ///
    /// ```
    /// use vecshape::Color;
    ///
    /// let green = Color::rgb(0.0, 1.0, 0.0);
    /// assert_eq!(green, Color([0.0, 1.0, 0.0, 1.0]));
    /// ```
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b, 1.0])
    }

    /// Creates a new color with the specified RGBA values.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    /// Builds a color from 8-bit channels, mapping 0-255 onto 0.0-1.0.
    pub fn from_rgba8(color: [u8; 4]) -> Self {
        Self(normalize_rgba_color(&color))
    }

    /// Converts the color to 8-bit channels. Channels are clamped to [0.0, 1.0] first.
    ///
    /// ```
    /// use vecshape::Color;
    ///
    /// assert_eq!(Color::rgba(1.0, 0.0, 2.0, -1.0).to_rgba8(), [255, 0, 255, 0]);
    /// ```
    pub fn to_rgba8(&self) -> [u8; 4] {
        denormalize_rgba_color(&self.0)
    }

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn g(&self) -> f32 {
        self.0[1]
    }

    pub fn b(&self) -> f32 {
        self.0[2]
    }

    pub fn a(&self) -> f32 {
        self.0[3]
    }

    /// Returns the color as an array of 4 `f32` values.
    pub fn to_array(&self) -> [f32; 4] {
        self.0
    }

    /// Component-wise product, used to apply a shape-wide color multiplier.
    pub fn multiply(&self, other: Color) -> Self {
        Self([
            self.0[0] * other.0[0],
            self.0[1] * other.0[1],
            self.0[2] * other.0[2],
            self.0[3] * other.0[3],
        ])
    }
}

impl From<[f32; 4]> for Color {
    fn from(value: [f32; 4]) -> Self {
        Self(value)
    }
}

impl From<Color> for [f32; 4] {
    fn from(value: Color) -> Self {
        value.0
    }
}
