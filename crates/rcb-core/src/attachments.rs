//! Attachment fetching + image normalization.
//!
//! Everything here treats the remote payload as hostile: declared metadata is
//! checked before any network call, downloads are capped and timed out, and
//! decoding runs on a blocking worker with decoder limits. Failures skip the
//! attachment; nothing is propagated to the caller.

use std::{io::Cursor, str::FromStr, sync::Arc, time::Duration};

use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader, Limits};
use tokio::{sync::Semaphore, time::timeout};

use crate::{
    config::Config, errors::Error, messaging::types::Attachment, ports::AttachmentFetcher,
    Result,
};

/// MIME types accepted for printing.
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Largest source image side the decoder will accept.
const MAX_SOURCE_DIMENSION: u32 = 8_192;

/// Upper bound on decoder allocations.
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

// ============== Fit Rule ==============

/// How an image larger than the printer's max dimension is shrunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitMode {
    /// Scale uniformly so both sides fit, preserving aspect ratio.
    Proportional,
    /// Clamp each oversized axis independently (`M×M` when both exceed).
    Legacy,
}

impl FromStr for FitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "proportional" => Ok(Self::Proportional),
            "legacy" => Ok(Self::Legacy),
            other => Err(Error::Config(format!(
                "IMAGE_FIT must be `proportional` or `legacy`, got {other:?}"
            ))),
        }
    }
}

/// Target size for a `w×h` image under max dimension `max`, or `None` if it
/// already fits.
pub fn fit_dimensions(w: u32, h: u32, max: u32, mode: FitMode) -> Option<(u32, u32)> {
    if w <= max && h <= max {
        return None;
    }

    match mode {
        FitMode::Legacy => Some((w.min(max), h.min(max))),
        FitMode::Proportional => {
            let scale = (max as f64 / w as f64).min(max as f64 / h as f64);
            let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
            Some((scaled(w), scaled(h)))
        }
    }
}

/// A decoded image guaranteed to fit inside the printer's max dimension.
#[derive(Clone, Debug)]
pub struct NormalizedImage {
    image: DynamicImage,
}

impl NormalizedImage {
    /// Shrink `image` (if needed) so neither side exceeds `max`.
    pub fn fit(image: DynamicImage, max: u32, mode: FitMode) -> Self {
        let image = match fit_dimensions(image.width(), image.height(), max, mode) {
            Some((w, h)) => image.resize_exact(w, h, FilterType::Triangle),
            None => image,
        };
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

// ============== Decoding ==============

/// Decode `bytes` as JPEG/PNG and fit the result to `max`.
///
/// The container format is sniffed from the payload, not taken from the
/// declared content type. The whole image is decoded, so truncated or corrupt
/// data surfaces here as an error.
pub fn decode_and_fit(bytes: &[u8], max: u32, mode: FitMode) -> Result<NormalizedImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decode(format!("format sniffing failed: {e}")))?;

    match reader.format() {
        Some(ImageFormat::Jpeg | ImageFormat::Png) => {}
        Some(other) => {
            return Err(Error::Decode(format!("unexpected image format {other:?}")));
        }
        None => return Err(Error::Decode("unrecognized image format".to_string())),
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let image = reader
        .decode()
        .map_err(|e| Error::Decode(e.to_string()))?;

    Ok(NormalizedImage::fit(image, max, mode))
}

// ============== Normalizer ==============

#[derive(Clone, Copy, Debug)]
pub struct NormalizerLimits {
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
    pub max_dimension: u32,
    pub fetch_timeout: Duration,
    pub decode_timeout: Duration,
    pub fit: FitMode,
}

impl NormalizerLimits {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_attachments: cfg.max_attachments,
            max_attachment_bytes: cfg.max_attachment_bytes,
            max_dimension: cfg.printer_max_dimension,
            fetch_timeout: cfg.fetch_timeout,
            decode_timeout: cfg.decode_timeout,
            fit: cfg.image_fit,
        }
    }
}

impl Default for NormalizerLimits {
    fn default() -> Self {
        Self {
            max_attachments: 2,
            max_attachment_bytes: 1_000_000,
            max_dimension: 512,
            fetch_timeout: Duration::from_secs(5),
            decode_timeout: Duration::from_secs(5),
            fit: FitMode::Proportional,
        }
    }
}

pub struct AttachmentNormalizer {
    fetcher: Arc<dyn AttachmentFetcher>,
    limits: NormalizerLimits,
    /// Shared across all messages; bounds outbound connections.
    permits: Arc<Semaphore>,
}

impl AttachmentNormalizer {
    pub fn new(
        fetcher: Arc<dyn AttachmentFetcher>,
        limits: NormalizerLimits,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            limits,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Declared-metadata check; runs before any network traffic.
    pub fn accepts(&self, attachment: &Attachment) -> bool {
        is_allowed_content_type(&attachment.content_type)
            && attachment.size < self.limits.max_attachment_bytes
    }

    /// Fetch and normalize the first `max_attachments` acceptable images.
    ///
    /// Output order follows input order; skipped attachments leave no entry.
    pub async fn fetch_and_normalize(&self, attachments: &[Attachment]) -> Vec<NormalizedImage> {
        let jobs = attachments
            .iter()
            .take(self.limits.max_attachments)
            .enumerate()
            .filter(|(idx, a)| {
                let ok = self.accepts(a);
                if !ok {
                    tracing::debug!(
                        index = idx,
                        content_type = %a.content_type,
                        size = a.size,
                        "attachment rejected by type/size policy"
                    );
                }
                ok
            })
            .map(|(idx, a)| self.normalize_one(idx, a));

        futures::future::join_all(jobs)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn normalize_one(&self, idx: usize, attachment: &Attachment) -> Option<NormalizedImage> {
        let bytes = {
            let _permit = self.permits.acquire().await.ok()?;
            let fetch = self
                .fetcher
                .fetch(&attachment.source, self.limits.max_attachment_bytes);
            match timeout(self.limits.fetch_timeout, fetch).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    tracing::warn!(index = idx, "attachment fetch failed: {e}");
                    return None;
                }
                Err(_) => {
                    tracing::warn!(index = idx, "attachment fetch timed out");
                    return None;
                }
            }
        };

        let NormalizerLimits {
            max_dimension, fit, ..
        } = self.limits;
        let decode =
            tokio::task::spawn_blocking(move || decode_and_fit(&bytes, max_dimension, fit));

        match timeout(self.limits.decode_timeout, decode).await {
            Ok(Ok(Ok(image))) => {
                tracing::debug!(
                    index = idx,
                    width = image.width(),
                    height = image.height(),
                    "attachment normalized"
                );
                Some(image)
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(index = idx, "attachment skipped: {e}");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(index = idx, "attachment decode task failed: {e}");
                None
            }
            Err(_) => {
                tracing::warn!(index = idx, "attachment decode timed out");
                None
            }
        }
    }
}

/// Allow-list check on a declared MIME type; parameters and case are ignored.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}
