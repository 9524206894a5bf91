// ============================================================================
// REMOTE ENHANCEMENT CLIENT — operations the engine cannot perform locally
// ============================================================================
//
// Contract: `POST <base>/<operation>` with a multipart body carrying the
// current full-resolution frame as a lossless PNG part named `image`, plus
// any operation-specific string fields. A 2xx response body is the enhanced
// encoded image; anything else is a recoverable failure.
//
// Exactly-one-in-flight is the session's job (see `EditSession::begin_remote`
// and `RemoteTicket`); this client is stateless and may be shared.

use std::time::Instant;

use log::{info, warn};
use reqwest::multipart::{Form, Part};

use crate::error::EngineError;

/// The enhancement operations offered by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOperation {
    AutoEnhance,
    RemoveBackground,
    ColorBoost,
    FaceSmooth,
    AutoRetouch,
    Hdr,
    Relight,
    Cartoonify,
    DepthFocus,
    PortraitBoost,
    DetailEnhance,
    /// Sky re-grading with a mood selector ("sunset", "dawn", ...).
    SkyMood { mood: String },
    /// Sky replacement with a mode selector ("galaxy", "storm", ...).
    SkyReplace { mode: String },
}

impl RemoteOperation {
    /// The service route for this operation.
    pub fn path(&self) -> &'static str {
        match self {
            RemoteOperation::AutoEnhance => "/auto_enhance",
            RemoteOperation::RemoveBackground => "/remove_background",
            RemoteOperation::ColorBoost => "/ai_colorboost",
            RemoteOperation::FaceSmooth => "/ai_facesmooth",
            RemoteOperation::AutoRetouch => "/ai_autoretouch",
            RemoteOperation::Hdr => "/ai_hdr",
            RemoteOperation::Relight => "/ai_relight",
            RemoteOperation::Cartoonify => "/ai_cartoonify",
            RemoteOperation::DepthFocus => "/ai_depthfocus",
            RemoteOperation::PortraitBoost => "/ai_portraitboost",
            RemoteOperation::DetailEnhance => "/ai_detailenhance",
            RemoteOperation::SkyMood { .. } => "/ai_skymood",
            RemoteOperation::SkyReplace { .. } => "/ai_skyreplace",
        }
    }

    /// Filename attached to the uploaded frame part.
    pub fn upload_name(&self) -> &'static str {
        match self {
            RemoteOperation::AutoEnhance => "ai_enhance.png",
            RemoteOperation::RemoveBackground => "removebg.png",
            RemoteOperation::ColorBoost => "color_boost.png",
            RemoteOperation::FaceSmooth => "face_smooth.png",
            RemoteOperation::AutoRetouch => "ai_autoretouch.png",
            RemoteOperation::Hdr => "ai_hdr.png",
            RemoteOperation::Relight => "ai_relight.png",
            RemoteOperation::Cartoonify => "ai_cartoonify.png",
            RemoteOperation::DepthFocus => "ai_depthfocus.png",
            RemoteOperation::PortraitBoost => "portrait_boost.png",
            RemoteOperation::DetailEnhance => "detail_enhance.png",
            RemoteOperation::SkyMood { .. } => "skymood.png",
            RemoteOperation::SkyReplace { .. } => "skyreplace.png",
        }
    }

    /// Extra multipart string fields for parameterized operations.
    pub fn extra_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            RemoteOperation::SkyMood { mood } => vec![("mood", mood.clone())],
            RemoteOperation::SkyReplace { mode } => vec![("mode", mode.clone())],
            _ => Vec::new(),
        }
    }

    /// Parse a CLI spelling. Parameterized operations take a `:` argument,
    /// e.g. `skymood:sunset`; the parameter defaults match the service's.
    pub fn parse(spec: &str) -> Option<RemoteOperation> {
        let (name, arg) = match spec.split_once(':') {
            Some((n, a)) => (n, Some(a)),
            None => (spec, None),
        };
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let op = match key.as_str() {
            "autoenhance" | "enhance" => RemoteOperation::AutoEnhance,
            "removebackground" | "removebg" => RemoteOperation::RemoveBackground,
            "colorboost" => RemoteOperation::ColorBoost,
            "facesmooth" => RemoteOperation::FaceSmooth,
            "autoretouch" => RemoteOperation::AutoRetouch,
            "hdr" => RemoteOperation::Hdr,
            "relight" => RemoteOperation::Relight,
            "cartoonify" => RemoteOperation::Cartoonify,
            "depthfocus" => RemoteOperation::DepthFocus,
            "portraitboost" => RemoteOperation::PortraitBoost,
            "detailenhance" => RemoteOperation::DetailEnhance,
            "skymood" => RemoteOperation::SkyMood {
                mood: arg.unwrap_or("sunset").to_string(),
            },
            "skyreplace" => RemoteOperation::SkyReplace {
                mode: arg.unwrap_or("galaxy").to_string(),
            },
            _ => return None,
        };
        Some(op)
    }
}

/// Thin async client over the enhancement service.
#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the encoded frame for enhancement and return the service's
    /// encoded result image. Non-2xx statuses surface as
    /// `EngineError::RemoteStatus`; the caller's state is untouched either
    /// way.
    pub async fn enhance(
        &self,
        op: &RemoteOperation,
        frame_png: Vec<u8>,
    ) -> Result<Vec<u8>, EngineError> {
        let url = format!("{}{}", self.base_url, op.path());
        let upload_bytes = frame_png.len();

        let part = Part::bytes(frame_png)
            .file_name(op.upload_name())
            .mime_str("image/png")?;
        let mut form = Form::new().part("image", part);
        for (name, value) in op.extra_fields() {
            form = form.text(name, value);
        }

        info!("remote enhance {:?}: uploading {} bytes to {}", op, upload_bytes, url);
        let started = Instant::now();
        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("remote enhance {:?} failed with HTTP {}", op, status.as_u16());
            return Err(EngineError::RemoteStatus(status.as_u16()));
        }

        let body = response.bytes().await?.to_vec();
        info!(
            "remote enhance {:?}: received {} bytes in {:?}",
            op,
            body.len(),
            started.elapsed()
        );
        Ok(body)
    }
}
