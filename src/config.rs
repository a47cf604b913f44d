//! Editor defaults, loadable from JSON.

use crate::annotation::TextStyle;
use crate::error::Error;
use crate::geometry::{Point, Size};
use crate::store::{DEFAULT_SIGNATURE_SIZE, DUPLICATE_OFFSET};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_EXPORT_FILE_NAME: &str = "signed_document.pdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Size given to a newly placed signature, display units.
    pub signature_size: Size,
    pub min_signature_width: f64,
    pub duplicate_offset: Point,
    pub text_style: TextStyle,
    pub export_file_name: String,
    /// Display size assumed when the page element was never measured.
    pub fallback_display_size: Size,
    pub render_width_ratio: f64,
    pub max_render_width: f64,
    /// Render width used before the container has been measured.
    pub unmeasured_render_width: f64,
    /// Native size for pages without a MediaBox (US Letter).
    pub default_page_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            signature_size: DEFAULT_SIGNATURE_SIZE,
            min_signature_width: 50.0,
            duplicate_offset: DUPLICATE_OFFSET,
            text_style: TextStyle::default(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_owned(),
            fallback_display_size: Size::new(600.0, 800.0),
            render_width_ratio: 0.9,
            max_render_width: 800.0,
            unmeasured_render_width: 600.0,
            default_page_size: Size::new(612.0, 792.0),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Pixel width to render the page at for a container of `container_width`.
    pub fn render_width(&self, container_width: Option<f64>) -> f64 {
        let target = match container_width {
            Some(width) if width > 0.0 => width * self.render_width_ratio,
            _ => self.unmeasured_render_width,
        };
        target.min(self.max_render_width)
    }
}
