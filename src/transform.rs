// ============================================================================
// TRANSFORM STATE — the live, non-committed edit parameters
// ============================================================================
//
// All setters validate at the boundary: an out-of-domain value is rejected
// with `EngineError::InvalidInput` and the prior state is retained.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::filters::{FilterKind, FilterStep, INTENSITY_RANGE};

/// Domain for the multiplicative adjustment factors
/// (brightness / contrast / saturation / clarity).
pub const FACTOR_RANGE: (f32, f32) = (0.0, 4.0);
/// Domain for the warm-tone amount, mapped to `sepia(temperature / 200)`.
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 400.0);
/// Domain for the hue-rotation tint in degrees.
pub const TINT_RANGE: (f32, f32) = (-360.0, 360.0);

/// Quarter-turn rotation, always normalized mod 360.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Parse an angle in degrees; must be a multiple of 90. Negative angles
    /// and angles beyond a full turn are normalized.
    pub fn from_degrees(degrees: i32) -> Result<Rotation, EngineError> {
        if degrees % 90 != 0 {
            return Err(EngineError::InvalidInput(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    /// One 90° step clockwise.
    pub fn rotated_cw(self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// True when the rotated frame swaps width and height.
    pub fn is_vertical(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// The full set of live edit parameters. A default state renders a frame
/// pixel-equal to the source bitmap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Hue rotation in degrees.
    pub tint_degrees: f32,
    /// Warm-tone amount; rendered as `sepia(temperature / 200)`.
    pub temperature: f32,
    /// Second contrast pass, the "clarity" slider.
    pub clarity: f32,
    pub rotation: Rotation,
    pub flipped: bool,
    pub filter: Option<FilterKind>,
    pub filter_intensity: f32,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            tint_degrees: 0.0,
            temperature: 0.0,
            clarity: 1.0,
            rotation: Rotation::Deg0,
            flipped: false,
            filter: None,
            filter_intensity: 1.0,
        }
    }
}

fn check_range(name: &str, value: f32, (lo, hi): (f32, f32)) -> Result<(), EngineError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(EngineError::InvalidInput(format!(
            "{name} must be within [{lo}, {hi}], got {value}"
        )));
    }
    Ok(())
}

impl TransformState {
    pub fn set_brightness(&mut self, value: f32) -> Result<(), EngineError> {
        check_range("brightness", value, FACTOR_RANGE)?;
        self.brightness = value;
        Ok(())
    }

    pub fn set_contrast(&mut self, value: f32) -> Result<(), EngineError> {
        check_range("contrast", value, FACTOR_RANGE)?;
        self.contrast = value;
        Ok(())
    }

    pub fn set_saturation(&mut self, value: f32) -> Result<(), EngineError> {
        check_range("saturation", value, FACTOR_RANGE)?;
        self.saturation = value;
        Ok(())
    }

    pub fn set_tint(&mut self, degrees: f32) -> Result<(), EngineError> {
        check_range("tint", degrees, TINT_RANGE)?;
        self.tint_degrees = degrees;
        Ok(())
    }

    pub fn set_temperature(&mut self, value: f32) -> Result<(), EngineError> {
        check_range("temperature", value, TEMPERATURE_RANGE)?;
        self.temperature = value;
        Ok(())
    }

    pub fn set_clarity(&mut self, value: f32) -> Result<(), EngineError> {
        check_range("clarity", value, FACTOR_RANGE)?;
        self.clarity = value;
        Ok(())
    }

    pub fn set_filter(&mut self, kind: FilterKind, intensity: f32) -> Result<(), EngineError> {
        check_range("filter intensity", intensity, INTENSITY_RANGE)?;
        self.filter = Some(kind);
        self.filter_intensity = intensity;
        Ok(())
    }

    /// Back to "no filter"; intensity resets with it.
    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.filter_intensity = 1.0;
    }

    /// True when rendering would reproduce the source bitmap exactly.
    pub fn is_neutral(&self) -> bool {
        *self == TransformState::default()
    }

    /// The base adjustment pipeline, mirroring the live-preview expression
    /// `brightness(b) contrast(c) saturate(s) hue-rotate(tint)
    /// sepia(temperature/200) contrast(clarity)`.
    pub fn base_steps(&self) -> Vec<FilterStep> {
        vec![
            FilterStep::Brightness(self.brightness),
            FilterStep::Contrast(self.contrast),
            FilterStep::Saturate(self.saturation),
            FilterStep::HueRotate(self.tint_degrees),
            FilterStep::Sepia(self.temperature / 200.0),
            FilterStep::Contrast(self.clarity),
        ]
    }

    /// The full color pipeline: the active preset (scaled by intensity) runs
    /// first, then the base adjustments still apply. Neutral steps are
    /// dropped so an identity pipeline is empty.
    pub fn composed_steps(&self) -> Vec<FilterStep> {
        let mut steps = match self.filter {
            Some(kind) => kind.scaled_steps(self.filter_intensity),
            None => Vec::new(),
        };
        steps.extend(self.base_steps());
        steps.retain(|s| !s.is_neutral());
        steps
    }
}
