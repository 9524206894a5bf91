// ============================================================================
// TRANSFORM RENDERER — (bitmap, transform) → rendered frame
// ============================================================================
//
// This is the only place pixel compositing happens, so the displayed frame
// always matches the committed transform state. Rendering is a pure function:
// the source bitmap is never mutated.
//
// Geometry runs first (mirror, then quarter-turn rotation — the same
// composition as drawing a mirrored image into a rotated surface), then the
// color pipeline. All linear color steps are folded into a single 3x3 matrix
// + offset and applied in one parallel pass; blur steps flush the matrix and
// run as a separate whole-frame pass.

use image::{imageops, RgbaImage};
use rayon::prelude::*;

use crate::filters::FilterStep;
use crate::transform::{Rotation, TransformState};

/// Render the bitmap under the given transform. The output dimensions swap
/// width/height when the rotation is 90° or 270°.
pub fn render(bitmap: &RgbaImage, transform: &TransformState) -> RgbaImage {
    let mut frame = apply_geometry(bitmap, transform.rotation, transform.flipped);
    apply_steps(&mut frame, &transform.composed_steps());
    frame
}

fn apply_geometry(bitmap: &RgbaImage, rotation: Rotation, flipped: bool) -> RgbaImage {
    let mirrored;
    let source = if flipped {
        mirrored = imageops::flip_horizontal(bitmap);
        &mirrored
    } else {
        bitmap
    };
    match rotation {
        Rotation::Deg0 => source.clone(),
        Rotation::Deg90 => imageops::rotate90(source),
        Rotation::Deg180 => imageops::rotate180(source),
        Rotation::Deg270 => imageops::rotate270(source),
    }
}

/// Apply a color pipeline in order, batching consecutive linear steps into
/// one matrix pass.
fn apply_steps(frame: &mut RgbaImage, steps: &[FilterStep]) {
    let mut matrix = ColorMatrix::identity();
    for step in steps {
        match *step {
            FilterStep::Blur(sigma) => {
                matrix = flush_matrix(frame, matrix);
                if sigma > 0.0 {
                    *frame = imageops::blur(frame, sigma);
                }
            }
            FilterStep::Brightness(b) => matrix.compose(ColorMatrix::brightness(b)),
            FilterStep::Contrast(c) => matrix.compose(ColorMatrix::contrast(c)),
            FilterStep::Saturate(s) => matrix.compose(ColorMatrix::saturate(s)),
            FilterStep::Grayscale(g) => matrix.compose(ColorMatrix::saturate(1.0 - g)),
            FilterStep::Sepia(a) => matrix.compose(ColorMatrix::sepia(a)),
            FilterStep::HueRotate(deg) => matrix.compose(ColorMatrix::hue_rotate(deg)),
        }
    }
    flush_matrix(frame, matrix);
}

fn flush_matrix(frame: &mut RgbaImage, matrix: ColorMatrix) -> ColorMatrix {
    if !matrix.is_identity() {
        matrix.apply(frame);
    }
    ColorMatrix::identity()
}

/// A 3x3 RGB matrix plus per-channel offset in 0..255 space. Alpha is
/// untouched. All CSS color filter functions are affine, so any run of them
/// collapses into one of these.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ColorMatrix {
    m: [[f32; 3]; 3],
    offset: [f32; 3],
}

// Rec.709 luma weights, as used by the CSS saturate()/grayscale() matrices.
const LUMA_R: f32 = 0.213;
const LUMA_G: f32 = 0.715;
const LUMA_B: f32 = 0.072;

impl ColorMatrix {
    fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0; 3],
        }
    }

    fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    fn brightness(b: f32) -> Self {
        Self {
            m: [[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]],
            offset: [0.0; 3],
        }
    }

    /// out = (in - 127.5) * c + 127.5
    fn contrast(c: f32) -> Self {
        let off = 127.5 * (1.0 - c);
        Self {
            m: [[c, 0.0, 0.0], [0.0, c, 0.0], [0.0, 0.0, c]],
            offset: [off, off, off],
        }
    }

    fn saturate(s: f32) -> Self {
        if s == 1.0 {
            return Self::identity();
        }
        Self {
            m: [
                [LUMA_R + (1.0 - LUMA_R) * s, LUMA_G * (1.0 - s), LUMA_B * (1.0 - s)],
                [LUMA_R * (1.0 - s), LUMA_G + (1.0 - LUMA_G) * s, LUMA_B * (1.0 - s)],
                [LUMA_R * (1.0 - s), LUMA_G * (1.0 - s), LUMA_B + (1.0 - LUMA_B) * s],
            ],
            offset: [0.0; 3],
        }
    }

    /// Blend between identity and the full sepia matrix.
    fn sepia(a: f32) -> Self {
        if a == 0.0 {
            return Self::identity();
        }
        let sepia = [
            [0.393, 0.769, 0.189],
            [0.349, 0.686, 0.168],
            [0.272, 0.534, 0.131],
        ];
        let mut m = [[0.0f32; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                let id = if r == c { 1.0 } else { 0.0 };
                m[r][c] = id * (1.0 - a) + sepia[r][c] * a;
            }
        }
        Self { m, offset: [0.0; 3] }
    }

    /// The SVG/CSS hue-rotation matrix.
    fn hue_rotate(degrees: f32) -> Self {
        if degrees == 0.0 {
            return Self::identity();
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            m: [
                [
                    LUMA_R + cos * (1.0 - LUMA_R) - sin * LUMA_R,
                    LUMA_G - cos * LUMA_G - sin * LUMA_G,
                    LUMA_B - cos * LUMA_B + sin * (1.0 - LUMA_B),
                ],
                [
                    LUMA_R - cos * LUMA_R + sin * 0.143,
                    LUMA_G + cos * (1.0 - LUMA_G) + sin * 0.140,
                    LUMA_B - cos * LUMA_B - sin * 0.283,
                ],
                [
                    LUMA_R - cos * LUMA_R - sin * (1.0 - LUMA_R),
                    LUMA_G - cos * LUMA_G + sin * LUMA_G,
                    LUMA_B + cos * (1.0 - LUMA_B) + sin * LUMA_B,
                ],
            ],
            offset: [0.0; 3],
        }
    }

    /// Compose `next` to run after `self` (pipeline order, left to right).
    fn compose(&mut self, next: ColorMatrix) {
        let mut m = [[0.0f32; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                m[r][c] = next.m[r][0] * self.m[0][c]
                    + next.m[r][1] * self.m[1][c]
                    + next.m[r][2] * self.m[2][c];
            }
        }
        let mut offset = [0.0f32; 3];
        for r in 0..3 {
            offset[r] = next.m[r][0] * self.offset[0]
                + next.m[r][1] * self.offset[1]
                + next.m[r][2] * self.offset[2]
                + next.offset[r];
        }
        self.m = m;
        self.offset = offset;
    }

    /// One parallel per-row pass over the frame.
    fn apply(&self, frame: &mut RgbaImage) {
        let stride = frame.width() as usize * 4;
        if stride == 0 {
            return;
        }
        let m = self.m;
        let offset = self.offset;
        let buf: &mut [u8] = frame;
        buf.par_chunks_mut(stride).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                let r = px[0] as f32;
                let g = px[1] as f32;
                let b = px[2] as f32;
                let nr = m[0][0] * r + m[0][1] * g + m[0][2] * b + offset[0];
                let ng = m[1][0] * r + m[1][1] * g + m[1][2] * b + offset[1];
                let nb = m[2][0] * r + m[2][1] * g + m[2][2] * b + offset[2];
                px[0] = nr.round().clamp(0.0, 255.0) as u8;
                px[1] = ng.round().clamp(0.0, 255.0) as u8;
                px[2] = nb.round().clamp(0.0, 255.0) as u8;
            }
        });
    }
}
