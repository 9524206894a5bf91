// ============================================================================
// CLI — headless batch edits via command-line arguments
// ============================================================================
//
// Usage examples:
//   photoflow -i photo.jpg --brightness 1.2 --contrast 1.1 -o out.png
//   photoflow -i photo.png --rotate 90 --flip --filter noir -o out.jpg -q 85
//   photoflow -i photo.png --crop 40,30,800,600 -o cropped.png
//   photoflow -i photo.png --remote removebg --endpoint http://127.0.0.1:5000 -o cut.png
//   photoflow -i photo.png --remote skymood:sunset --endpoint https://photo-api.example -o sky.png
//
// All local processing runs synchronously; a remote operation spins up a
// tokio runtime for the single round-trip.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::error;

use crate::error::EngineError;
use crate::filters::FilterKind;
use crate::io::{self, ExportFormat, DEFAULT_EXPORT_QUALITY};
use crate::remote::{RemoteClient, RemoteOperation};
use crate::session::{CropRegion, EditSession};
use crate::transform::Rotation;

/// photoflow headless image processor.
///
/// Apply the engine's edit pipeline to an image file without a UI.
#[derive(Parser, Debug)]
#[command(
    name = "photoflow",
    about = "Headless photo-editing pipeline",
    long_about = "Load an image, apply adjustments, rotation/flip, a named filter,\n\
                  a crop and/or one remote enhancement, then export the result.\n\n\
                  Example:\n  \
                  photoflow -i photo.jpg --brightness 1.2 --filter warm -o out.png\n  \
                  photoflow -i photo.png --remote removebg --endpoint http://127.0.0.1:5000 -o cut.png"
)]
pub struct CliArgs {
    /// Input image file (any format the engine decodes).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output file path.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Output format: png or jpeg. Inferred from the output extension when
    /// omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = DEFAULT_EXPORT_QUALITY, value_name = "1-100")]
    pub quality: u8,

    /// Rotate by the given angle (degrees, multiple of 90; may be negative).
    #[arg(long, value_name = "DEGREES")]
    pub rotate: Option<i32>,

    /// Mirror horizontally.
    #[arg(long)]
    pub flip: bool,

    #[arg(long, value_name = "FACTOR")]
    pub brightness: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub contrast: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub saturation: Option<f32>,

    /// Hue rotation in degrees.
    #[arg(long, value_name = "DEGREES")]
    pub tint: Option<f32>,

    /// Warm-tone amount (0-400).
    #[arg(long, value_name = "AMOUNT")]
    pub temperature: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub clarity: Option<f32>,

    /// Named filter preset (warm, cool, vintage, bw, bright-pop, cinesoft,
    /// golden-hour, deep-blue, noir, dream-glow, retro-fade).
    #[arg(long, value_name = "NAME")]
    pub filter: Option<String>,

    /// Filter intensity (0-2, default 1); requires --filter.
    #[arg(long, value_name = "0-2")]
    pub intensity: Option<f32>,

    /// Crop region as X,Y,WIDTH,HEIGHT in output-frame pixels, applied after
    /// the other edits.
    #[arg(long, value_name = "X,Y,W,H")]
    pub crop: Option<String>,

    /// One remote enhancement operation (auto-enhance, removebg, colorboost,
    /// facesmooth, autoretouch, hdr, relight, cartoonify, depthfocus,
    /// portraitboost, detailenhance, skymood[:MOOD], skyreplace[:MODE]).
    #[arg(long, value_name = "OPERATION")]
    pub remote: Option<String>,

    /// Base URL of the remote enhancement service; required with --remote.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Load edit parameters from a JSON sidecar before applying the other
    /// flags (later flags override its values).
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Write the final edit parameters as a JSON sidecar.
    #[arg(long, value_name = "FILE")]
    pub params_out: Option<PathBuf>,

    /// Print per-stage timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the full pipeline and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    match process(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn process(args: &CliArgs) -> Result<(), EngineError> {
    let started = Instant::now();
    let mut session = EditSession::default();
    session.load(io::load_bitmap(&args.input)?)?;
    if args.verbose {
        println!("loaded {} in {:?}", args.input.display(), started.elapsed());
    }

    if let Some(path) = &args.params {
        session.apply_transform(io::load_params(path)?)?;
        session.settle()?;
    }

    apply_adjustments(&mut session, args)?;

    if let Some(degrees) = args.rotate {
        let target = Rotation::from_degrees(degrees)?;
        while session.transform().rotation != target {
            session.rotate_cw()?;
        }
    }
    if args.flip {
        session.flip()?;
    }

    if let Some((kind, intensity)) = resolve_filter(args)? {
        session.apply_filter(kind, intensity)?;
    }

    if let Some(spec) = &args.crop {
        let region = parse_crop(spec)?;
        session.enter_crop()?;
        session.apply_crop(region)?;
    }

    if let Some(spec) = &args.remote {
        let op = RemoteOperation::parse(spec).ok_or_else(|| {
            EngineError::InvalidInput(format!("unknown remote operation \"{spec}\""))
        })?;
        let endpoint = args.endpoint.as_deref().ok_or_else(|| {
            EngineError::InvalidInput("--remote requires --endpoint".into())
        })?;
        run_remote(&mut session, &op, endpoint)?;
        if args.verbose {
            println!("remote {op:?} applied");
        }
    }

    let format = match &args.format {
        Some(name) => ExportFormat::from_name(name).ok_or_else(|| {
            EngineError::InvalidInput(format!("unknown output format \"{name}\""))
        })?,
        None => ExportFormat::from_path(&args.output),
    };
    let frame = session.frame().ok_or(EngineError::NoImage)?;
    io::export_frame(frame, &args.output, format, args.quality)?;
    if let Some(path) = &args.params_out {
        io::save_params(session.transform(), path)?;
    }
    if args.verbose {
        println!("done in {:?}", started.elapsed());
    }
    Ok(())
}

fn apply_adjustments(session: &mut EditSession, args: &CliArgs) -> Result<(), EngineError> {
    let mut changed = false;
    if let Some(v) = args.brightness {
        session.set_brightness(v)?;
        changed = true;
    }
    if let Some(v) = args.contrast {
        session.set_contrast(v)?;
        changed = true;
    }
    if let Some(v) = args.saturation {
        session.set_saturation(v)?;
        changed = true;
    }
    if let Some(v) = args.tint {
        session.set_tint(v)?;
        changed = true;
    }
    if let Some(v) = args.temperature {
        session.set_temperature(v)?;
        changed = true;
    }
    if let Some(v) = args.clarity {
        session.set_clarity(v)?;
        changed = true;
    }
    if changed {
        // Batch input has no pointer release; settle explicitly.
        session.settle()?;
    }
    Ok(())
}

/// One blocking remote round-trip on a private runtime.
fn run_remote(
    session: &mut EditSession,
    op: &RemoteOperation,
    endpoint: &str,
) -> Result<(), EngineError> {
    let ticket = session.begin_remote()?;
    let client = RemoteClient::new(endpoint);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(client.enhance(op, ticket.frame_png().to_vec())) {
        Ok(encoded) => {
            session.apply_remote_result(ticket, &encoded)?;
            Ok(())
        }
        Err(e) => {
            session.fail_remote(ticket);
            Err(e)
        }
    }
}

/// A stray --intensity with no --filter is a mistyped invocation, not a
/// silent no-op.
fn resolve_filter(args: &CliArgs) -> Result<Option<(FilterKind, f32)>, EngineError> {
    match &args.filter {
        Some(name) => {
            let kind = FilterKind::from_name(name).ok_or_else(|| {
                EngineError::InvalidInput(format!("unknown filter preset \"{name}\""))
            })?;
            Ok(Some((kind, args.intensity.unwrap_or(1.0))))
        }
        None if args.intensity.is_some() => Err(EngineError::InvalidInput(
            "--intensity requires --filter".into(),
        )),
        None => Ok(None),
    }
}

fn parse_crop(spec: &str) -> Result<CropRegion, EngineError> {
    let parts: Vec<u32> = spec
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| {
            EngineError::InvalidInput(format!(
                "crop must be X,Y,WIDTH,HEIGHT of non-negative integers, got \"{spec}\""
            ))
        })?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(CropRegion::new(*x, *y, *w, *h)),
        _ => Err(EngineError::InvalidInput(format!(
            "crop must have exactly four components, got \"{spec}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_spec_parses() {
        assert_eq!(parse_crop("10, 20,300,400").unwrap(), CropRegion::new(10, 20, 300, 400));
        assert!(parse_crop("10,20,300").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
        assert!(parse_crop("-1,0,10,10").is_err());
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = CliArgs::parse_from(["photoflow", "-i", "in.png", "-o", "out.jpg"]);
        assert_eq!(args.quality, DEFAULT_EXPORT_QUALITY);
        assert!(args.intensity.is_none());
        assert!(args.rotate.is_none());
        assert!(!args.flip);
    }

    #[test]
    fn intensity_without_filter_is_rejected() {
        let args = CliArgs::parse_from([
            "photoflow", "-i", "in.png", "-o", "out.png", "--intensity", "1.5",
        ]);
        assert!(matches!(
            resolve_filter(&args),
            Err(EngineError::InvalidInput(_))
        ));

        let args = CliArgs::parse_from([
            "photoflow", "-i", "in.png", "-o", "out.png", "--filter", "warm",
        ]);
        let (kind, intensity) = resolve_filter(&args).unwrap().expect("filter resolved");
        assert_eq!(kind, FilterKind::Warm);
        assert!((intensity - 1.0).abs() < f32::EPSILON);
    }
}
