use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Rejected image parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageParamError {
    #[error("Sorry, the picked style is invalid")]
    Style,
    #[error("Sorry, the picked size is invalid")]
    Size,
}

/// Rendering style accepted by the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStyle {
    Vivid,
    Natural,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vivid => "vivid",
            Self::Natural => "natural",
        }
    }
}

impl FromStr for ImageStyle {
    type Err = ImageParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vivid" => Ok(Self::Vivid),
            "natural" => Ok(Self::Natural),
            _ => Err(ImageParamError::Style),
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output dimensions accepted by the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl ImageSize {
    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Landscape => (1792, 1024),
            Self::Portrait => (1024, 1792),
        }
    }
}

impl FromStr for ImageSize {
    type Err = ImageParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1024x1024" => Ok(Self::Square),
            "1792x1024" => Ok(Self::Landscape),
            "1024x1792" => Ok(Self::Portrait),
            _ => Err(ImageParamError::Size),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{w}x{h}")
    }
}

/// A fully validated image generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: ImageStyle,
    pub size: ImageSize,
}
