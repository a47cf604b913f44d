//! Authoritative collection of the annotations placed on a document.
//!
//! Mutations never record history on their own; the caller commits once a
//! discrete user action is finished so a drag does not flood the log.

use crate::annotation::{
    AnnotationId, AnnotationSet, IdGenerator, ImageRef, Rotation, SignatureAnnotation,
    TextAnnotation, TextStyle,
};
use crate::capture::SignatureImage;
use crate::error::Error;
use crate::geometry::{clamp_position, DisplayRect, Point, Size};
use log::debug;
use std::sync::Arc;

/// Offset applied to a duplicated annotation so the copy is visible.
pub const DUPLICATE_OFFSET: Point = Point { x: 20.0, y: 20.0 };

/// Nominal signature size when none is given.
pub const DEFAULT_SIGNATURE_SIZE: Size = Size {
    width: 150.0,
    height: 50.0,
};

#[derive(Debug)]
pub struct AnnotationStore {
    set: AnnotationSet,
    ids: IdGenerator,
    default_size: Size,
    duplicate_offset: Point,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURE_SIZE, DUPLICATE_OFFSET)
    }
}

impl AnnotationStore {
    pub fn new(default_size: Size, duplicate_offset: Point) -> Self {
        Self {
            set: AnnotationSet::default(),
            ids: IdGenerator::default(),
            default_size,
            duplicate_offset,
        }
    }

    pub fn signatures(&self) -> &[SignatureAnnotation] {
        &self.set.signatures
    }

    pub fn texts(&self) -> &[TextAnnotation] {
        &self.set.texts
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.set.contains(id)
    }

    pub fn signature(&self, id: AnnotationId) -> Option<&SignatureAnnotation> {
        self.set.signatures.iter().find(|s| s.id == id)
    }

    pub fn text(&self, id: AnnotationId) -> Option<&TextAnnotation> {
        self.set.texts.iter().find(|t| t.id == id)
    }

    /// Signatures first, then text marks, in insertion order.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = (AnnotationId, DisplayRect)> + '_ {
        let signatures = self
            .set
            .signatures
            .iter()
            .filter(move |s| s.page == page)
            .map(|s| (s.id, s.bounds()));
        let texts = self
            .set
            .texts
            .iter()
            .filter(move |t| t.page == page)
            .map(|t| (t.id, t.bounds()));
        signatures.chain(texts)
    }

    pub fn bounds(&self, id: AnnotationId) -> Option<DisplayRect> {
        self.signature(id)
            .map(SignatureAnnotation::bounds)
            .or_else(|| self.text(id).map(TextAnnotation::bounds))
    }

    /// Topmost annotation under `point`; later additions are drawn on top.
    pub fn hit_test(&self, page: u32, point: Point) -> Option<AnnotationId> {
        let hits: Vec<_> = self
            .on_page(page)
            .filter(|(_, rect)| rect.contains(point))
            .collect();
        hits.last().map(|(id, _)| *id)
    }

    pub fn add_signature(
        &mut self,
        image: &Arc<SignatureImage>,
        position: Point,
        page: u32,
        size: Option<Size>,
    ) -> AnnotationId {
        let id = self.ids.next();
        self.set.signatures.push(SignatureAnnotation {
            id,
            image: ImageRef::new(image),
            position,
            size: size.unwrap_or(self.default_size),
            page,
            rotation: Rotation::Deg0,
            stroke_color: None,
        });
        debug!("added signature {id} on page {page} at ({}, {})", position.x, position.y);
        id
    }

    pub fn add_text(
        &mut self,
        content: impl Into<String>,
        position: Point,
        page: u32,
        style: TextStyle,
    ) -> AnnotationId {
        let id = self.ids.next();
        self.set.texts.push(TextAnnotation {
            id,
            content: content.into(),
            position,
            page,
            style,
        });
        debug!("added text {id} on page {page} at ({}, {})", position.x, position.y);
        id
    }

    /// Move an annotation, keeping its whole box inside `page_bounds`.
    pub fn update_position(
        &mut self,
        id: AnnotationId,
        position: Point,
        page_bounds: Size,
    ) -> Result<Point, Error> {
        if let Some(signature) = self.set.signatures.iter_mut().find(|s| s.id == id) {
            signature.position = clamp_position(position, signature.size, page_bounds);
            return Ok(signature.position);
        }
        if let Some(text) = self.set.texts.iter_mut().find(|t| t.id == id) {
            text.position = clamp_position(position, text.estimated_size(), page_bounds);
            return Ok(text.position);
        }
        Err(Error::UnknownAnnotation(id))
    }

    /// Only signatures carry an explicit size.
    pub fn update_size(&mut self, id: AnnotationId, size: Size) -> Result<(), Error> {
        let signature = self
            .set
            .signatures
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(Error::UnknownAnnotation(id))?;
        signature.size = size;
        Ok(())
    }

    pub fn set_stroke_color(
        &mut self,
        id: AnnotationId,
        color: Option<String>,
    ) -> Result<(), Error> {
        let signature = self
            .set
            .signatures
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(Error::UnknownAnnotation(id))?;
        signature.stroke_color = color;
        Ok(())
    }

    pub fn rotate(&mut self, id: AnnotationId) -> Result<Rotation, Error> {
        let signature = self
            .set
            .signatures
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(Error::UnknownAnnotation(id))?;
        signature.rotation = signature.rotation.clockwise();
        Ok(signature.rotation)
    }

    pub fn remove(&mut self, id: AnnotationId) -> Result<(), Error> {
        let before = self.set.len();
        self.set.signatures.retain(|s| s.id != id);
        self.set.texts.retain(|t| t.id != id);
        if self.set.len() == before {
            return Err(Error::UnknownAnnotation(id));
        }
        debug!("removed annotation {id}");
        Ok(())
    }

    /// Copy an annotation under a fresh id, shifted by the duplicate offset.
    pub fn duplicate(&mut self, id: AnnotationId) -> Result<AnnotationId, Error> {
        let offset = self.duplicate_offset;
        if let Some(source) = self.signature(id).cloned() {
            let new_id = self.ids.next();
            self.set.signatures.push(SignatureAnnotation {
                id: new_id,
                position: source.position.offset(offset),
                ..source
            });
            debug!("duplicated signature {id} as {new_id}");
            return Ok(new_id);
        }
        if let Some(source) = self.text(id).cloned() {
            let new_id = self.ids.next();
            self.set.texts.push(TextAnnotation {
                id: new_id,
                position: source.position.offset(offset),
                ..source
            });
            debug!("duplicated text {id} as {new_id}");
            return Ok(new_id);
        }
        Err(Error::UnknownAnnotation(id))
    }

    pub fn snapshot(&self) -> AnnotationSet {
        self.set.clone()
    }

    /// Replace the contents; the id generator keeps counting forward.
    pub fn restore(&mut self, set: AnnotationSet) {
        self.set = set;
    }

    pub fn clear(&mut self) {
        self.set = AnnotationSet::default();
    }
}
