//! Halftone screening.
//!
//! Each channel is screened on its own rotated grid. A cell's sample decides
//! the radius of a disk drawn at half intensity:
//! `r = cell * sqrt(2 * fraction / π)`, which puts the same total ink in the
//! disk as the sample would spread over the whole cell. At high fractions
//! neighbouring disks overlap and the saturating sum approaches full
//! coverage without exceeding it.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::canvas::RasterCanvas;
use crate::color::{Channel, ChannelMode, Color, MAX_INTENSITY};
use crate::error::{RasterError, Result};

/// Smallest usable halftone cell.
pub const MIN_CELL_SIZE: u32 = 2;

/// Intensity of a single dot: half of full scale.
const HALF_INTENSITY: u8 = 128;

/// Radius of the dot representing `fraction` of full intensity in a `cell_size` cell.
pub fn dot_radius(cell_size: u32, fraction: f64) -> f64 {
    let fraction = fraction.clamp(0.0, 1.0);
    f64::from(cell_size) * (2.0 * fraction / PI).sqrt()
}

/// Screen angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenAngles {
    pub grey: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Default for ScreenAngles {
    fn default() -> Self {
        // Distinct per-channel angles keep the recombined screens free of moiré.
        Self {
            grey: 15.0,
            red: -15.0,
            green: 7.5,
            blue: 30.0,
        }
    }
}

/// Shared cancellation flag for long-running screening.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Which ink a screen samples and deposits.
#[derive(Debug, Clone, Copy)]
enum Ink {
    Grey,
    Channel(Channel),
}

impl Ink {
    fn sample(&self, color: Color) -> u8 {
        match self {
            Ink::Grey => color.luma(),
            Ink::Channel(channel) => color.channel(*channel),
        }
    }

    fn dot_color(&self) -> Color {
        match self {
            Ink::Grey => Color::grey(HALF_INTENSITY),
            Ink::Channel(Channel::Red) => Color::new(HALF_INTENSITY, 0, 0),
            Ink::Channel(Channel::Green) => Color::new(0, HALF_INTENSITY, 0),
            Ink::Channel(Channel::Blue) => Color::new(0, 0, HALF_INTENSITY),
        }
    }
}

/// Produces screened copies of canvases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalftoneEngine {
    cell_size: u32,
    angles: ScreenAngles,
}

impl HalftoneEngine {
    pub fn new(cell_size: u32) -> Result<Self> {
        if cell_size < MIN_CELL_SIZE {
            return Err(RasterError::InvalidHalftoneSize(cell_size));
        }
        Ok(Self {
            cell_size,
            angles: ScreenAngles::default(),
        })
    }

    pub fn with_angles(mut self, angles: ScreenAngles) -> Self {
        self.angles = angles;
        self
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn angles(&self) -> ScreenAngles {
        self.angles
    }

    /// Screens `source`: one grey screen, or three channel screens recombined additively.
    pub fn apply(&self, source: &RasterCanvas) -> Result<RasterCanvas> {
        self.apply_cancellable(source, &CancelFlag::new())
    }

    /// Like [`HalftoneEngine::apply`], returning [`RasterError::Cancelled`]
    /// as soon as `cancel` is observed between grid rows.
    pub fn apply_cancellable(
        &self,
        source: &RasterCanvas,
        cancel: &CancelFlag,
    ) -> Result<RasterCanvas> {
        let started = Instant::now();
        log::info!(
            "Halftone {}x{} {:?} canvas, cell size {}",
            source.width(),
            source.height(),
            source.mode(),
            self.cell_size
        );

        let result = match source.mode() {
            ChannelMode::Grey => self.screen(source, self.angles.grey, Ink::Grey, cancel)?,
            ChannelMode::Rgb => {
                let angles = self.angles;
                let mut red = self.screen(source, angles.red, Ink::Channel(Channel::Red), cancel)?;
                let green =
                    self.screen(source, angles.green, Ink::Channel(Channel::Green), cancel)?;
                let blue = self.screen(source, angles.blue, Ink::Channel(Channel::Blue), cancel)?;
                red.add_image(0, 0, &green);
                red.add_image(0, 0, &blue);
                red
            }
        };

        log::info!("Halftone finished in {:?}", started.elapsed());
        Ok(result)
    }

    /// One screen: rotate, stamp a dot per cell, rotate back, crop.
    fn screen(
        &self,
        source: &RasterCanvas,
        degrees: f64,
        ink: Ink,
        cancel: &CancelFlag,
    ) -> Result<RasterCanvas> {
        let radians = degrees.to_radians();
        let rotated = source.rotate(radians);
        let mut dots = RasterCanvas::blank(rotated.width(), rotated.height(), rotated.mode());
        dots.anchor = rotated.anchor();

        // The grid is phased on the anchor so that a cell origin always sits on
        // the original (0,0) pixel.
        let cell = self.cell_size as usize;
        let start_x = rotated.anchor().x % self.cell_size;
        let start_y = rotated.anchor().y % self.cell_size;
        let color = ink.dot_color();
        let max = f64::from(MAX_INTENSITY);

        for y in (start_y..rotated.height()).step_by(cell) {
            if cancel.is_cancelled() {
                log::debug!("Halftone screen at {degrees} degrees cancelled");
                return Err(RasterError::Cancelled);
            }
            for x in (start_x..rotated.width()).step_by(cell) {
                let value = ink.sample(rotated.color_at(x, y));
                let radius = dot_radius(self.cell_size, f64::from(value) / max);
                dots.draw_circle(i64::from(x), i64::from(y), radius, color);
            }
        }

        dots.rotate(-radians).reset(source.width(), source.height())
    }
}
