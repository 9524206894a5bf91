// ============================================================================
// NAMED FILTER PRESETS — tagged color-pipeline descriptors
// ============================================================================
//
// A preset is an ordered list of `FilterStep`s, validated at construction
// instead of string-matched at render time. Intensity in [0, 2] interpolates
// every step between its neutral amount and the preset amount, so intensity 1
// reproduces the preset exactly and intensity 0 is a no-op.

use serde::{Deserialize, Serialize};

/// Lower/upper bound for the per-preset intensity slider.
pub const INTENSITY_RANGE: (f32, f32) = (0.0, 2.0);

/// One step of a color pipeline, with CSS filter-function semantics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FilterStep {
    /// Multiplies all channels. Neutral at 1.
    Brightness(f32),
    /// Scales channels around mid-gray. Neutral at 1.
    Contrast(f32),
    /// Scales distance from Rec.709 luma. Neutral at 1.
    Saturate(f32),
    /// Blends toward the sepia matrix. Neutral at 0.
    Sepia(f32),
    /// Blends toward luma gray. Neutral at 0.
    Grayscale(f32),
    /// Rotates hue by the given angle in degrees. Neutral at 0.
    HueRotate(f32),
    /// Gaussian blur with the given sigma in pixels. Neutral at 0.
    Blur(f32),
}

impl FilterStep {
    /// The amount at which this step leaves pixels unchanged.
    pub fn neutral_amount(&self) -> f32 {
        match self {
            FilterStep::Brightness(_) | FilterStep::Contrast(_) | FilterStep::Saturate(_) => 1.0,
            FilterStep::Sepia(_)
            | FilterStep::Grayscale(_)
            | FilterStep::HueRotate(_)
            | FilterStep::Blur(_) => 0.0,
        }
    }

    pub fn amount(&self) -> f32 {
        match *self {
            FilterStep::Brightness(a)
            | FilterStep::Contrast(a)
            | FilterStep::Saturate(a)
            | FilterStep::Sepia(a)
            | FilterStep::Grayscale(a)
            | FilterStep::HueRotate(a)
            | FilterStep::Blur(a) => a,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.amount() == self.neutral_amount()
    }

    /// Interpolate the step between its neutral amount and its declared
    /// amount. `intensity` 0 = neutral, 1 = as declared, 2 = doubled effect.
    pub fn scaled(&self, intensity: f32) -> FilterStep {
        let neutral = self.neutral_amount();
        let amount = neutral + (self.amount() - neutral) * intensity;
        self.with_amount(amount)
    }

    fn with_amount(&self, amount: f32) -> FilterStep {
        match self {
            FilterStep::Brightness(_) => FilterStep::Brightness(amount),
            FilterStep::Contrast(_) => FilterStep::Contrast(amount),
            FilterStep::Saturate(_) => FilterStep::Saturate(amount),
            FilterStep::Sepia(_) => FilterStep::Sepia(amount),
            FilterStep::Grayscale(_) => FilterStep::Grayscale(amount),
            FilterStep::HueRotate(_) => FilterStep::HueRotate(amount),
            FilterStep::Blur(_) => FilterStep::Blur(amount),
        }
    }
}

/// The built-in filter looks. "No filter" is represented by the absence of a
/// preset (`Option<FilterKind>`), so intensity never applies to identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Warm,
    Cool,
    Vintage,
    BlackWhite,
    BrightPop,
    CineSoft,
    GoldenHour,
    DeepBlue,
    Noir,
    DreamGlow,
    RetroFade,
}

impl FilterKind {
    pub const ALL: &'static [FilterKind] = &[
        FilterKind::Warm,
        FilterKind::Cool,
        FilterKind::Vintage,
        FilterKind::BlackWhite,
        FilterKind::BrightPop,
        FilterKind::CineSoft,
        FilterKind::GoldenHour,
        FilterKind::DeepBlue,
        FilterKind::Noir,
        FilterKind::DreamGlow,
        FilterKind::RetroFade,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Warm => "Warm",
            FilterKind::Cool => "Cool",
            FilterKind::Vintage => "Vintage",
            FilterKind::BlackWhite => "B&W",
            FilterKind::BrightPop => "Bright Pop",
            FilterKind::CineSoft => "CineSoft",
            FilterKind::GoldenHour => "Golden Hour",
            FilterKind::DeepBlue => "Deep Blue",
            FilterKind::Noir => "Noir",
            FilterKind::DreamGlow => "Dream Glow",
            FilterKind::RetroFade => "Retro Fade",
        }
    }

    /// Case-insensitive lookup; accepts the display name with spaces, `&`
    /// or hyphens stripped ("bright-pop", "bw", "goldenhour", ...).
    pub fn from_name(name: &str) -> Option<FilterKind> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "warm" => Some(FilterKind::Warm),
            "cool" => Some(FilterKind::Cool),
            "vintage" => Some(FilterKind::Vintage),
            "bw" | "blackwhite" | "blackandwhite" => Some(FilterKind::BlackWhite),
            "brightpop" => Some(FilterKind::BrightPop),
            "cinesoft" => Some(FilterKind::CineSoft),
            "goldenhour" => Some(FilterKind::GoldenHour),
            "deepblue" => Some(FilterKind::DeepBlue),
            "noir" => Some(FilterKind::Noir),
            "dreamglow" => Some(FilterKind::DreamGlow),
            "retrofade" => Some(FilterKind::RetroFade),
            _ => None,
        }
    }

    /// The preset's pipeline at intensity 1.
    pub fn steps(&self) -> &'static [FilterStep] {
        use FilterStep::*;
        match self {
            FilterKind::Warm => &[Brightness(1.05), Contrast(1.1), Sepia(0.2), Saturate(1.2)],
            FilterKind::Cool => &[Contrast(1.1), Brightness(1.05), HueRotate(200.0), Saturate(1.1)],
            FilterKind::Vintage => &[Contrast(1.05), Brightness(1.1), Sepia(0.4), Saturate(0.9)],
            FilterKind::BlackWhite => &[Grayscale(1.0), Contrast(1.2)],
            FilterKind::BrightPop => &[Contrast(1.3), Brightness(1.2), Saturate(1.4)],
            FilterKind::CineSoft => &[
                Contrast(1.1),
                Brightness(1.05),
                Saturate(1.1),
                HueRotate(10.0),
            ],
            FilterKind::GoldenHour => &[
                Sepia(0.25),
                Contrast(1.15),
                Brightness(1.1),
                Saturate(1.25),
            ],
            FilterKind::DeepBlue => &[
                Contrast(1.15),
                Brightness(0.95),
                HueRotate(210.0),
                Saturate(1.3),
            ],
            FilterKind::Noir => &[Grayscale(1.0), Contrast(1.5), Brightness(0.9)],
            FilterKind::DreamGlow => &[
                Contrast(1.05),
                Brightness(1.15),
                Saturate(1.1),
                Blur(1.0),
            ],
            FilterKind::RetroFade => &[Sepia(0.3), Contrast(1.1), Brightness(1.05), Saturate(0.85)],
        }
    }

    /// The preset's pipeline with every step scaled by `intensity`.
    pub fn scaled_steps(&self, intensity: f32) -> Vec<FilterStep> {
        self.steps().iter().map(|s| s.scaled(intensity)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_one_reproduces_preset() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.scaled_steps(1.0), kind.steps().to_vec(), "{}", kind.name());
        }
    }

    #[test]
    fn intensity_zero_is_neutral() {
        for kind in FilterKind::ALL {
            for step in kind.scaled_steps(0.0) {
                assert!(step.is_neutral(), "{} step {:?}", kind.name(), step);
            }
        }
    }

    #[test]
    fn intensity_two_doubles_distance_from_neutral() {
        let step = FilterStep::Saturate(1.4);
        match step.scaled(2.0) {
            FilterStep::Saturate(a) => assert!((a - 1.8).abs() < 1e-6),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn every_name_round_trips() {
        for kind in FilterKind::ALL {
            assert_eq!(FilterKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(FilterKind::from_name("bright-pop"), Some(FilterKind::BrightPop));
        assert_eq!(FilterKind::from_name("nope"), None);
    }
}
