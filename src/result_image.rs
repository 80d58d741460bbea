use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use image::RgbaImage;
use reqwest::Url;

/// Where a generated image reference points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Inline { mime: String, bytes: Vec<u8> },
    Remote(Url),
}

/// Interprets the `image` field of a complete event: a base64 `data:` URI,
/// an absolute URL, or a path resolved against the generation endpoint.
pub fn resolve(endpoint: &str, reference: &str) -> Result<ImageSource> {
    let reference = reference.trim();
    if reference.is_empty() {
        bail!("empty image reference");
    }

    if let Some(rest) = reference.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("data URI without payload"))?;
        let Some(mime) = meta.strip_suffix(";base64") else {
            bail!("only base64 data URIs are supported");
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .context("invalid base64 image payload")?;
        return Ok(ImageSource::Inline {
            mime: mime.to_string(),
            bytes,
        });
    }

    if let Ok(url) = Url::parse(reference) {
        return Ok(ImageSource::Remote(url));
    }

    let base = Url::parse(endpoint)
        .with_context(|| format!("invalid generation endpoint {endpoint}"))?;
    let url = base
        .join(reference)
        .with_context(|| format!("cannot resolve image path {reference}"))?;
    Ok(ImageSource::Remote(url))
}

/// Fetches (if remote) and decodes the image.
pub fn load(source: &ImageSource) -> Result<RgbaImage> {
    let bytes = match source {
        ImageSource::Inline { bytes, .. } => bytes.clone(),
        ImageSource::Remote(url) => {
            log::info!("fetching generated image {url}");
            let response = reqwest::blocking::get(url.clone())
                .and_then(|response| response.error_for_status())
                .with_context(|| format!("failed to fetch {url}"))?;
            response.bytes()?.to_vec()
        }
    };
    let decoded = image::load_from_memory(&bytes).context("failed to decode generated image")?;
    Ok(decoded.to_rgba8())
}

/// An image being resolved and decoded on a helper thread.
pub struct PendingImage {
    reference: String,
    rx: Receiver<Result<RgbaImage>>,
}

impl PendingImage {
    pub fn spawn(endpoint: &str, reference: &str) -> Self {
        let (tx, rx) = bounded(1);
        let endpoint = endpoint.to_string();
        let owned = reference.to_string();
        thread::spawn(move || {
            let result = resolve(&endpoint, &owned).and_then(|source| load(&source));
            let _ = tx.send(result);
        });
        Self {
            reference: reference.to_string(),
            rx,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn try_finish(&mut self) -> Option<Result<RgbaImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(anyhow!("image loader exited early"))),
        }
    }
}
