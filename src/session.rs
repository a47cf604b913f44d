//! The editing session: one open document plus everything placed on it.

use crate::annotation::{AnnotationId, Rgb};
use crate::capture::{SignatureCapture, SignatureImage};
use crate::config::EditorConfig;
use crate::error::Error;
use crate::export::{ExportJob, ExportOutput, PDF_MIME};
use crate::geometry::{clamp_position, Point, ScreenRect, Size};
use crate::history::HistoryLog;
use crate::interaction::{
    Effect, Interaction, InteractionEvent, InteractionState, Viewport, Workspace,
};
use crate::pdf_object;
use crate::store::AnnotationStore;
use log::{info, warn};
use std::sync::Arc;

/// A file handed over by the host, e.g. from a drop or a file picker.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Both the declared type and the sniffed content must say PDF.
    pub fn validate(&self) -> Result<(), Error> {
        let sniffed = infer::get(&self.bytes).map(|kind| kind.mime_type());
        if self.mime != PDF_MIME || sniffed != Some(PDF_MIME) {
            warn!(
                "rejecting {} (declared {}, detected {})",
                self.name,
                self.mime,
                sniffed.unwrap_or("unknown")
            );
            return Err(Error::UnsupportedFile(self.mime.clone()));
        }
        Ok(())
    }
}

/// Page structure read from a PDF without rendering it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_count: u32,
    pub page_sizes: Vec<Size>,
}

impl DocumentInfo {
    pub fn probe(bytes: &[u8], default_page_size: Size) -> Result<Self, Error> {
        let document = lopdf::Document::load_mem(bytes)?;
        let page_sizes: Vec<Size> = document
            .get_pages()
            .values()
            .map(|&page_id| pdf_object::media_box(&document, page_id).unwrap_or(default_page_size))
            .collect();
        if page_sizes.is_empty() {
            return Err(Error::Other("document has no pages".to_owned()));
        }
        Ok(Self {
            page_count: page_sizes.len() as u32,
            page_sizes,
        })
    }

    pub async fn probe_async(bytes: Arc<Vec<u8>>, default_page_size: Size) -> Result<Self, Error> {
        tokio::task::spawn_blocking(move || Self::probe(&bytes, default_page_size)).await?
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Primary,
    /// The renderer failed; the page is shown without the annotation overlay.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
    pub page_count: u32,
    pub page_sizes: Vec<Size>,
    pub current_page: u32,
    pub scale: f64,
    /// Last measured on-screen rectangle of the page element.
    pub page_rect: Option<ScreenRect>,
    pub render_mode: RenderMode,
}

impl DocumentSession {
    fn new(name: String, bytes: Arc<Vec<u8>>, info: DocumentInfo) -> Self {
        Self {
            name,
            bytes,
            page_count: info.page_count,
            page_sizes: info.page_sizes,
            current_page: 1,
            scale: 1.0,
            page_rect: None,
            render_mode: RenderMode::Primary,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    config: EditorConfig,
    document: Option<DocumentSession>,
    store: AnnotationStore,
    history: HistoryLog,
    interaction: Interaction,
    capture: SignatureCapture,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Session {
    pub fn new(config: EditorConfig) -> Self {
        let store = AnnotationStore::new(config.signature_size, config.duplicate_offset);
        Self {
            config,
            document: None,
            store,
            history: HistoryLog::new(),
            interaction: Interaction::new(),
            capture: SignatureCapture::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&DocumentSession> {
        self.document.as_ref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn capture(&self) -> &SignatureCapture {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut SignatureCapture {
        &mut self.capture
    }

    /// Validate and load a dropped file, replacing any open document.
    ///
    /// A rejected file leaves the session untouched.
    pub fn open_document(&mut self, file: DroppedFile) -> Result<&DocumentSession, Error> {
        file.validate()?;
        let info = DocumentInfo::probe(&file.bytes, self.config.default_page_size)?;
        Ok(self.install_document(file.name, Arc::new(file.bytes), info))
    }

    /// Same as [`Session::open_document`], parsing on the blocking pool.
    pub async fn open_document_async(
        &mut self,
        file: DroppedFile,
    ) -> Result<&DocumentSession, Error> {
        file.validate()?;
        let bytes = Arc::new(file.bytes);
        let info =
            DocumentInfo::probe_async(Arc::clone(&bytes), self.config.default_page_size).await?;
        Ok(self.install_document(file.name, bytes, info))
    }

    pub fn install_document(
        &mut self,
        name: String,
        bytes: Arc<Vec<u8>>,
        info: DocumentInfo,
    ) -> &DocumentSession {
        self.reset_editing_state();
        info!("opened {name} ({} pages)", info.page_count);
        self.document.insert(DocumentSession::new(name, bytes, info))
    }

    /// Close the document and drop everything placed on it.
    pub fn remove_document(&mut self) {
        if let Some(document) = self.document.take() {
            info!("removed {}", document.name);
        }
        self.reset_editing_state();
    }

    fn reset_editing_state(&mut self) {
        self.store.clear();
        self.history.reset();
        self.interaction.reset();
        // nothing in the cleared store refers to these bitmaps any more
        self.capture.release_all();
    }

    fn document_mut(&mut self) -> Result<&mut DocumentSession, Error> {
        self.document.as_mut().ok_or(Error::NoDocument)
    }

    /// The renderer reported the page count it found. Does not leave fallback mode.
    pub fn on_render_success(&mut self, page_count: u32) -> Result<(), Error> {
        let document = self.document_mut()?;
        if page_count > 0 {
            document.page_count = page_count;
            document.current_page = document.current_page.min(page_count);
        }
        Ok(())
    }

    /// Switch to fallback display; placement and gestures stay off for this document.
    pub fn on_render_failure(&mut self, reason: &str) -> Result<(), Error> {
        let document = self.document_mut()?;
        warn!("rendering {} failed, using fallback view: {reason}", document.name);
        document.render_mode = RenderMode::Fallback;
        self.interaction.reset();
        Ok(())
    }

    pub fn current_page(&self) -> Option<u32> {
        self.document.as_ref().map(|d| d.current_page)
    }

    pub fn go_to_page(&mut self, page: u32) -> Result<u32, Error> {
        let document = self.document_mut()?;
        document.current_page = page.clamp(1, document.page_count.max(1));
        let page = document.current_page;
        self.interaction.reset();
        Ok(page)
    }

    pub fn next_page(&mut self) -> Result<u32, Error> {
        let current = self.document_mut()?.current_page;
        self.go_to_page(current.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Result<u32, Error> {
        let current = self.document_mut()?.current_page;
        self.go_to_page(current.saturating_sub(1))
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), Error> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(Error::Other(format!("invalid zoom scale {scale}")));
        }
        self.document_mut()?.scale = scale;
        Ok(())
    }

    pub fn set_page_rect(&mut self, rect: ScreenRect) -> Result<(), Error> {
        self.document_mut()?.page_rect = Some(rect);
        Ok(())
    }

    /// Page size at scale = 1, falling back to the configured size when the
    /// page element has not been measured.
    pub fn display_size(&self) -> Size {
        self.document
            .as_ref()
            .and_then(|d| d.page_rect.and_then(|rect| rect.display_bounds(d.scale)))
            .filter(|size| !size.is_empty())
            .unwrap_or(self.config.fallback_display_size)
    }

    pub fn render_width(&self, container_width: Option<f64>) -> f64 {
        self.config.render_width(container_width)
    }

    pub fn capture_signature(&mut self, png: Vec<u8>) -> Result<Arc<SignatureImage>, Error> {
        self.capture.accept_png(png)
    }

    pub fn capture_data_url(&mut self, data_url: &str) -> Result<Arc<SignatureImage>, Error> {
        self.capture.accept_data_url(data_url)
    }

    /// Place the current capture centred on the current page and commit.
    pub fn place_capture_centered(&mut self) -> Result<AnnotationId, Error> {
        let page = self.current_page().ok_or(Error::NoDocument)?;
        let image = self.capture.current().cloned().ok_or(Error::EmptyCapture)?;
        let bounds = self.display_size();
        let size = self.config.signature_size;
        let centred = Point::new(
            (bounds.width - size.width) / 2.0,
            (bounds.height - size.height) / 2.0,
        );
        let position = clamp_position(centred, size, bounds);

        let id = self.store.add_signature(&image, position, page, Some(size));
        self.store
            .set_stroke_color(id, Some(self.capture.pen().color.clone()))?;
        self.history.commit(&self.store);
        Ok(id)
    }

    /// Default style for new text marks.
    pub fn set_text_color(&mut self, color: Rgb) {
        self.config.text_style.color = color;
    }

    pub fn set_font_size(&mut self, font_size: f64) {
        if font_size > 0.0 {
            self.config.text_style.font_size = font_size;
        }
    }

    /// Feed one pointer, touch or keyboard-level event into the state machine.
    pub fn handle(&mut self, event: InteractionEvent) -> Result<Effect, Error> {
        let Some(document) = self.document.as_ref() else {
            return Ok(Effect::Ignored);
        };
        let fallback = self.config.fallback_display_size;
        let page_rect = document.page_rect.unwrap_or_else(|| {
            ScreenRect::new(
                0.0,
                0.0,
                fallback.width * document.scale,
                fallback.height * document.scale,
            )
        });
        let workspace = Workspace {
            store: &mut self.store,
            history: &mut self.history,
            viewport: Viewport {
                page_rect,
                scale: document.scale,
                page: document.current_page,
            },
            capture: self.capture.current(),
            stroke_color: Some(self.capture.pen().color.clone()),
            text_style: &self.config.text_style,
            min_width: self.config.min_signature_width,
            gestures_enabled: document.render_mode == RenderMode::Primary,
        };
        self.interaction.handle(workspace, event)
    }

    /// Step back one committed action. An unfinished gesture or placement
    /// is abandoned first.
    pub fn undo(&mut self) -> bool {
        if *self.interaction.state() != InteractionState::Idle {
            self.interaction.reset();
        }
        self.history.undo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Snapshot the current annotations for export.
    pub fn export_job(&self) -> Result<ExportJob, Error> {
        let document = self.document.as_ref().ok_or(Error::NoDocument)?;
        Ok(ExportJob::new(Arc::clone(&document.bytes), self.display_size(), &self.store.snapshot())
            .with_file_name(self.config.export_file_name.clone())
            .with_default_page_size(self.config.default_page_size))
    }

    pub fn export(&self) -> Result<ExportOutput, Error> {
        self.export_job()?.run()
    }

    pub async fn export_async(&self) -> Result<ExportOutput, Error> {
        let job = self.export_job()?;
        job.run_async().await
    }
}
