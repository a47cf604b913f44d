//! Annotation records placed on document pages.
//!
//! Positions and sizes are in display space at scale = 1, top-left anchored.
//! Page indices are 1-based like the page numbers shown to the user.

use crate::capture::SignatureImage;
use crate::geometry::{DisplayRect, Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Stable identity of an annotation within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source; never rewinds, not even on undo.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub(crate) fn next(&mut self) -> AnnotationId {
        self.last += 1;
        AnnotationId(self.last)
    }
}

/// Quarter-turn rotation of a signature, clockwise as seen on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Snap an arbitrary angle to the nearest quarter turn.
    pub fn from_degrees(degrees: f64) -> Self {
        let quarter = (degrees / 90.0).round().rem_euclid(4.0) as u8;
        match quarter {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Components in the 0–1 range PDF colour operators expect.
    pub fn to_normalized(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: String,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_family: "Helvetica".to_owned(),
            color: Rgb::BLACK,
        }
    }
}

/// Weak reference to a bitmap owned by the capture surface.
#[derive(Debug, Clone)]
pub struct ImageRef(Weak<SignatureImage>);

impl ImageRef {
    pub fn new(image: &Arc<SignatureImage>) -> Self {
        Self(Arc::downgrade(image))
    }

    pub fn upgrade(&self) -> Option<Arc<SignatureImage>> {
        self.0.upgrade()
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureAnnotation {
    pub id: AnnotationId,
    pub image: ImageRef,
    pub position: Point,
    pub size: Size,
    pub page: u32,
    pub rotation: Rotation,
    /// Pen colour the stroke was drawn with; already baked into the bitmap.
    pub stroke_color: Option<String>,
}

impl SignatureAnnotation {
    pub fn bounds(&self) -> DisplayRect {
        DisplayRect::new(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAnnotation {
    pub id: AnnotationId,
    pub content: String,
    pub position: Point,
    pub page: u32,
    pub style: TextStyle,
}

impl TextAnnotation {
    pub const KIND: &'static str = "text";

    /// Rough on-screen extent; glyph metrics belong to the renderer.
    pub fn estimated_size(&self) -> Size {
        let chars = self.content.chars().count().max(1) as f64;
        Size::new(chars * self.style.font_size * 0.6, self.style.font_size * 1.2)
    }

    pub fn bounds(&self) -> DisplayRect {
        DisplayRect::new(self.position, self.estimated_size())
    }
}

/// Every annotation of a document at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    pub signatures: Vec<SignatureAnnotation>,
    pub texts: Vec<TextAnnotation>,
}

impl AnnotationSet {
    pub fn len(&self) -> usize {
        self.signatures.len() + self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty() && self.texts.is_empty()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.signatures.iter().any(|s| s.id == id) || self.texts.iter().any(|t| t.id == id)
    }
}
