//! Stamps annotations onto a copy of the source PDF.
//!
//! A job is a self-contained snapshot: annotation records are cloned and
//! bitmap references upgraded when the job is built, so later edits never
//! reach a running export.

use crate::annotation::{AnnotationId, AnnotationSet, Rotation, TextAnnotation};
use crate::capture::SignatureImage;
use crate::config::DEFAULT_EXPORT_FILE_NAME;
use crate::error::Error;
use crate::geometry::{NativeMapping, Point, Size};
use crate::{Font, PDFSigningDocument};
use log::{error, info, warn};
use std::sync::Arc;

pub const PDF_MIME: &str = "application/pdf";

/// A signature as it will be drawn; `image` is `None` when the capture
/// surface had already released the bitmap.
#[derive(Debug, Clone)]
pub struct SignatureStamp {
    pub id: AnnotationId,
    pub image: Option<Arc<SignatureImage>>,
    pub position: Point,
    pub size: Size,
    pub page: u32,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAnnotation {
    pub id: AnnotationId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub applied: Vec<AnnotationId>,
    pub skipped: Vec<SkippedAnnotation>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
    pub report: ExportReport,
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    source: Arc<Vec<u8>>,
    display: Size,
    default_page_size: Size,
    signatures: Vec<SignatureStamp>,
    texts: Vec<TextAnnotation>,
    file_name: String,
}

impl ExportJob {
    /// Snapshot `annotations` for export against `source`.
    ///
    /// `display` is the on-screen page size at scale = 1 that annotation
    /// coordinates were recorded in.
    pub fn new(source: Arc<Vec<u8>>, display: Size, annotations: &AnnotationSet) -> Self {
        let signatures = annotations
            .signatures
            .iter()
            .map(|s| SignatureStamp {
                id: s.id,
                image: s.image.upgrade(),
                position: s.position,
                size: s.size,
                page: s.page,
                rotation: s.rotation,
            })
            .collect();
        Self {
            source,
            display,
            default_page_size: Size::new(612.0, 792.0),
            signatures,
            texts: annotations.texts.clone(),
            file_name: DEFAULT_EXPORT_FILE_NAME.to_owned(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Native size assumed for pages without a MediaBox.
    pub fn with_default_page_size(mut self, size: Size) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn len(&self) -> usize {
        self.signatures.len() + self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn signatures(&self) -> &[SignatureStamp] {
        &self.signatures
    }

    pub fn run(self) -> Result<ExportOutput, Error> {
        if self.display.is_empty() {
            return Err(Error::Other("display size must be positive".to_owned()));
        }
        let mut document = PDFSigningDocument::load_mem(&self.source).map_err(|err| {
            error!("export failed to load source document: {err}");
            err
        })?;
        let mut report = ExportReport::default();

        for stamp in &self.signatures {
            match self.stamp_signature(&mut document, stamp) {
                Ok(()) => report.applied.push(stamp.id),
                Err(err) => {
                    warn!("skipping signature {} on page {}: {err}", stamp.id, stamp.page);
                    report.skipped.push(SkippedAnnotation {
                        id: stamp.id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        for text in &self.texts {
            match self.stamp_text(&mut document, text) {
                Ok(()) => report.applied.push(text.id),
                Err(err) => {
                    warn!(
                        "skipping {} {} on page {}: {err}",
                        TextAnnotation::KIND,
                        text.id,
                        text.page
                    );
                    report.skipped.push(SkippedAnnotation {
                        id: text.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let bytes = document.save_to_vec().map_err(|err| {
            error!("export failed to serialize document: {err}");
            err
        })?;
        info!(
            "exported {} ({} applied, {} skipped, {} bytes)",
            self.file_name,
            report.applied.len(),
            report.skipped.len(),
            bytes.len()
        );
        Ok(ExportOutput {
            bytes,
            file_name: self.file_name,
            mime_type: PDF_MIME,
            report,
        })
    }

    /// Run on tokio's blocking pool.
    pub async fn run_async(self) -> Result<ExportOutput, Error> {
        tokio::task::spawn_blocking(move || self.run()).await?
    }

    fn mapping(
        &self,
        document: &PDFSigningDocument,
        page: u32,
    ) -> Result<(lopdf::ObjectId, NativeMapping), Error> {
        let page_id = document.page_id(page)?;
        let native = document.page_size(page_id, self.default_page_size);
        Ok((page_id, NativeMapping::new(self.display, native)))
    }

    fn stamp_signature(
        &self,
        document: &mut PDFSigningDocument,
        stamp: &SignatureStamp,
    ) -> Result<(), Error> {
        let image = stamp.image.as_ref().ok_or(Error::ImageReleased)?;
        let (page_id, mapping) = self.mapping(document, stamp.page)?;
        let rect = mapping.map_box(stamp.position, stamp.size);
        document.add_signature_to_page(image, page_id, rect, stamp.rotation)?;
        Ok(())
    }

    fn stamp_text(
        &self,
        document: &mut PDFSigningDocument,
        text: &TextAnnotation,
    ) -> Result<(), Error> {
        let (page_id, mapping) = self.mapping(document, text.page)?;
        document.add_text_to_page(
            &text.content,
            mapping.map_baseline(text.position),
            Font::from_family(&text.style.font_family),
            mapping.map_font_size(text.style.font_size),
            text.style.color,
            page_id,
        )
    }
}
