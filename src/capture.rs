//! Intake for bitmaps produced by the signature capture canvas.
//!
//! The capture surface owns every bitmap it hands out; annotations only keep
//! weak references, so deleting an annotation never frees the image.

use crate::error::Error;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use log::{debug, warn};
use std::sync::Arc;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// An encoded PNG signature with its pixel dimensions.
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureImage {
    key: u64,
    png: Vec<u8>,
    width_px: u32,
    height_px: u32,
}

impl SignatureImage {
    /// Unique per capture; names the image resource on export.
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    /// Resource name used for the embedded image XObject.
    pub fn resource_name(&self) -> String {
        format!("Sig{}", self.key)
    }
}

/// Pen settings of the capture canvas, kept as metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PenSettings {
    pub color: String,
    pub size: f64,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            color: "#000000".to_owned(),
            size: 2.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct SignatureCapture {
    images: Vec<Arc<SignatureImage>>,
    current: Option<Arc<SignatureImage>>,
    pen: PenSettings,
    next_key: u64,
}

impl SignatureCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept PNG bytes from the canvas; empty or non-PNG data is refused.
    pub fn accept_png(&mut self, png: Vec<u8>) -> Result<Arc<SignatureImage>, Error> {
        if png.is_empty() {
            warn!("refusing empty signature capture");
            return Err(Error::EmptyCapture);
        }
        if !matches!(imagesize::image_type(&png)?, imagesize::ImageType::Png) {
            return Err(Error::Other("signature capture must be PNG encoded".to_owned()));
        }
        let dimensions = imagesize::blob_size(&png)?;
        if dimensions.width == 0 || dimensions.height == 0 {
            warn!("refusing zero-sized signature capture");
            return Err(Error::EmptyCapture);
        }

        self.next_key += 1;
        let image = Arc::new(SignatureImage {
            key: self.next_key,
            png,
            width_px: dimensions.width as u32,
            height_px: dimensions.height as u32,
        });
        debug!(
            "captured signature {} ({}x{} px)",
            image.key, image.width_px, image.height_px
        );
        self.images.push(Arc::clone(&image));
        self.current = Some(Arc::clone(&image));
        Ok(image)
    }

    /// Accept a `data:image/png;base64,...` URL as exported by canvas elements.
    pub fn accept_data_url(&mut self, data_url: &str) -> Result<Arc<SignatureImage>, Error> {
        let payload = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| Error::Other("expected a PNG data URL".to_owned()))?;
        if payload.is_empty() {
            return Err(Error::EmptyCapture);
        }
        let png = B64.decode(payload.as_bytes())?;
        self.accept_png(png)
    }

    /// Bitmap used for the next placement.
    pub fn current(&self) -> Option<&Arc<SignatureImage>> {
        self.current.as_ref()
    }

    /// Forget the current selection; placed signatures keep their images.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drop every bitmap; the session does this whenever its document changes.
    pub fn release_all(&mut self) {
        self.current = None;
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn pen(&self) -> &PenSettings {
        &self.pen
    }

    pub fn set_pen_color(&mut self, color: impl Into<String>) {
        self.pen.color = color.into();
    }

    pub fn set_pen_size(&mut self, size: f64) {
        self.pen.size = size.max(0.0);
    }
}
