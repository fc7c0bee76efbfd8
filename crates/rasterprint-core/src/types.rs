// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the raster print pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RasterPrintError, Result};

/// Points per inch in document page geometry.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Bytes per pixel for [`PixelFormat::Bgra32`].
pub const BGRA32_BYTES_PER_PIXEL: usize = 4;

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rasterization resolution in dots per inch, always within
/// [`Dpi::MIN`]..=[`Dpi::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Dpi(u32);

impl Dpi {
    pub const MIN: u32 = 72;
    pub const MAX: u32 = 1200;
    pub const DEFAULT: Dpi = Dpi(300);

    /// Validate a raw DPI value.
    pub fn new(value: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RasterPrintError::InvalidDpi(value))
        }
    }

    /// Validate an optional DPI, falling back to [`Dpi::DEFAULT`].
    pub fn resolve(value: Option<u32>) -> Result<Self> {
        value.map_or(Ok(Self::DEFAULT), Self::new)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Pixel extent of a length given in points: `round(points * dpi / 72)`.
    pub fn points_to_pixels(self, points: f32) -> i64 {
        (f64::from(points) * f64::from(self.0) / POINTS_PER_INCH).round() as i64
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Dpi {
    type Error = RasterPrintError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Dpi> for u32 {
    fn from(dpi: Dpi) -> Self {
        dpi.0
    }
}

impl std::fmt::Display for Dpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} dpi", self.0)
    }
}

/// Pixel layouts exchanged between the renderer, the rasterizer and the
/// device bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Blue, green, red, alpha; one byte each; rows top-down.
    Bgra32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra32 => BGRA32_BYTES_PER_PIXEL,
        }
    }
}

/// Page geometry in points as reported by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pts: f32,
    pub height_pts: f32,
}

impl PageSize {
    pub const US_LETTER: PageSize = PageSize {
        width_pts: 612.0,
        height_pts: 792.0,
    };

    pub const A4: PageSize = PageSize {
        width_pts: 595.0,
        height_pts: 842.0,
    };
}

/// Destination rectangle in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Lifecycle states of a device print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// No document frame open. Initial and terminal.
    Closed,
    /// Document frame open, between pages.
    DocOpen,
    /// Page frame open.
    PageOpen,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::DocOpen => "doc-open",
            Self::PageOpen => "page-open",
        };
        f.write_str(name)
    }
}

/// Classification of errors for caller-side retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Busy device or spooler hiccup; the caller may retry the whole run.
    Transient,
    /// User must take action (pick a printer, fix a path).
    UserAction,
    /// Retrying will not help (bad input, unsupported platform).
    Permanent,
}
