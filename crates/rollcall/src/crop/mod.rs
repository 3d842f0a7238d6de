//! Square profile-picture cropping.
//!
//! The member picks an image, pans a square window over it and zooms in. On
//! save the window is cut out of the source, scaled to a fixed square and
//! re-encoded as JPEG inside a `data:` URI. The circular mask a UI draws over
//! the window is preview only; the stored picture is the full square.
//!
//! Files are screened before any decoding: non-images and HEIC/HEIF photos get
//! distinct errors so the cropper never opens on something it cannot show.

pub mod data_uri;

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::{Error, Result};
use crate::form::RawImage;

/// MIME type of every cropped picture.
pub const OUTPUT_MIME: &str = "image/jpeg";

/// Fixed parameters of the crop pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    /// Edge length in pixels of the output square.
    pub target_size: u32,
    /// Smallest accepted zoom.
    pub zoom_min: f32,
    /// Largest accepted zoom.
    pub zoom_max: f32,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            target_size: 400,
            zoom_min: 1.0,
            zoom_max: 3.0,
            jpeg_quality: 85,
        }
    }
}

impl CropSettings {
    /// Clamp a zoom factor to the configured bounds.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            self.zoom_min
        } else {
            zoom.clamp(self.zoom_min, self.zoom_max)
        }
    }
}

/// Where the member placed the crop window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropView {
    /// Horizontal displacement of the window centre from the image centre, in
    /// source pixels.
    pub offset_x: f32,
    /// Vertical displacement of the window centre from the image centre, in
    /// source pixels.
    pub offset_y: f32,
    /// Zoom factor; 1.0 shows the largest square that fits.
    pub zoom: f32,
}

impl Default for CropView {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }
}

/// A square region of the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropArea {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Edge length.
    pub size: u32,
}

impl CropArea {
    /// Resolve a view over a `width` x `height` image into a pixel area.
    ///
    /// The window side is the shorter image edge divided by `zoom`; the
    /// window is then moved by the offset and kept inside the image.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_view(width: u32, height: u32, view: CropView) -> Self {
        let base = width.min(height);
        let zoom = if view.zoom.is_finite() && view.zoom >= 1.0 {
            view.zoom
        } else {
            1.0
        };
        let size = ((base as f32 / zoom).round() as u32).clamp(1, base.max(1));

        let place = |extent: u32, offset: f32| -> u32 {
            let max = extent.saturating_sub(size) as f32;
            let start = (extent as f32 - size as f32) / 2.0 + offset;
            let start = if start.is_finite() { start } else { 0.0 };
            start.clamp(0.0, max).round() as u32
        };

        Self {
            x: place(width, view.offset_x),
            y: place(height, view.offset_y),
            size,
        }
    }

    /// Shrink and shift the area so it lies inside a `width` x `height` image.
    #[must_use]
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let size = self.size.clamp(1, width.min(height).max(1));
        Self {
            x: self.x.min(width.saturating_sub(size)),
            y: self.y.min(height.saturating_sub(size)),
            size,
        }
    }
}

/// Reject files the cropper cannot open.
///
/// # Errors
///
/// Returns [`Error::NotAnImage`] when the declared type is not an image, and
/// [`Error::UnsupportedImageFormat`] for HEIC/HEIF photos.
pub fn screen(raw: &RawImage) -> Result<()> {
    let mime = raw.mime_type.to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return Err(Error::NotAnImage);
    }

    let name = raw.file_name.to_ascii_lowercase();
    let is_heif = matches!(mime.as_str(), "image/heic" | "image/heif")
        || name.ends_with(".heic")
        || name.ends_with(".heif");
    if is_heif {
        return Err(Error::unsupported_format("HEIC"));
    }

    Ok(())
}

/// Guess a MIME type from a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "application/octet-stream",
    }
}

/// Turn a saved `data:` picture back into something the cropper can open.
///
/// # Errors
///
/// Returns [`Error::ImagePreparation`] if the payload cannot be decoded.
pub fn raw_from_data_uri(uri: &str) -> Result<RawImage> {
    let (mime_type, bytes) = data_uri::decode(uri).map_err(|e| {
        debug!(error = %e, "saved picture is not a usable data URI");
        Error::ImagePreparation
    })?;
    Ok(RawImage {
        file_name: "profile.jpg".to_string(),
        mime_type,
        bytes,
    })
}

/// Cuts, scales and encodes profile pictures.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropPipeline {
    settings: CropSettings,
}

impl CropPipeline {
    /// Create a pipeline with the given settings.
    #[must_use]
    pub fn new(settings: CropSettings) -> Self {
        Self { settings }
    }

    /// The pipeline's settings.
    #[must_use]
    pub fn settings(&self) -> &CropSettings {
        &self.settings
    }

    /// Crop `raw` at the given view and return a JPEG `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns a media error if the file is screened out or cannot be decoded
    /// or encoded.
    pub fn crop(&self, raw: &RawImage, view: CropView) -> Result<String> {
        screen(raw)?;
        let source = image::load_from_memory(&raw.bytes)?;
        let (width, height) = source.dimensions();
        let view = CropView {
            zoom: self.settings.clamp_zoom(view.zoom),
            ..view
        };
        let area = CropArea::from_view(width, height, view);
        self.encode_area(&source, area)
    }

    /// Crop an explicit pixel area of `raw` and return a JPEG `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns a media error if the file is screened out or cannot be decoded
    /// or encoded.
    pub fn crop_area(&self, raw: &RawImage, area: CropArea) -> Result<String> {
        screen(raw)?;
        let source = image::load_from_memory(&raw.bytes)?;
        let (width, height) = source.dimensions();
        self.encode_area(&source, area.clamp_to(width, height))
    }

    /// [`crop`](Self::crop) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// As [`crop`](Self::crop), plus an internal error if the worker panics.
    pub async fn crop_in_background(&self, raw: RawImage, view: CropView) -> Result<String> {
        let pipeline = *self;
        tokio::task::spawn_blocking(move || pipeline.crop(&raw, view))
            .await
            .map_err(|e| Error::internal(format!("crop worker failed: {e}")))?
    }

    fn encode_area(&self, source: &DynamicImage, area: CropArea) -> Result<String> {
        let target = self.settings.target_size;
        debug!(
            x = area.x,
            y = area.y,
            size = area.size,
            target,
            "cropping picture"
        );

        let square = source
            .crop_imm(area.x, area.y, area.size, area.size)
            .resize_exact(target, target, FilterType::Lanczos3);
        let rgb = DynamicImage::ImageRgb8(square.to_rgb8());

        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, self.settings.jpeg_quality);
        rgb.write_with_encoder(encoder)?;

        Ok(data_uri::encode(OUTPUT_MIME, &bytes))
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> RawImage {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    RawImage {
        file_name: "portrait.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes,
    }
}
