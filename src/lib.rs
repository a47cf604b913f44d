pub mod annotation;
pub mod capture;
pub mod config;
mod error;
pub mod export;
pub mod geometry;
pub mod history;
mod image_xobject;
pub mod interaction;
mod pdf_object;
pub mod session;
pub mod store;

use annotation::{Rgb, Rotation};
use capture::SignatureImage;
use geometry::{image_matrix, NativeRect, Point, Size};
use image_xobject::ImageXObject;
use lopdf::{
    content::Content, content::Operation, dictionary, Dictionary, Document, Object, ObjectId,
    Stream,
};
use std::{
    collections::{HashMap, HashSet},
    io::Read,
};

pub use error::Error;
pub use lopdf;

/// Standard 14 fonts available for text annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    Courier,
    TimesRoman,
}

impl Font {
    /// Pick the closest standard font for a CSS-like family name.
    pub fn from_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("courier") || family.contains("mono") {
            Font::Courier
        } else if family.contains("times")
            || (family.contains("serif") && !family.contains("sans"))
        {
            Font::TimesRoman
        } else {
            Font::Helvetica
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::Courier => "Courier",
            Font::TimesRoman => "Times-Roman",
        }
    }

    /// Page resource name; prefixed so it cannot clash with fonts the page already uses.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "SgnHelv",
            Font::Courier => "SgnCour",
            Font::TimesRoman => "SgnTimes",
        }
    }
}

/// A loaded PDF that signatures and text get stamped onto.
#[derive(Debug, Clone)]
pub struct PDFSigningDocument {
    raw_document: Document,
    /// Link between the image name saved and the objectId of the image.
    /// This is used to reduce the amount of copies of the images in the pdf file.
    image_signature_object_id: HashMap<String, ObjectId>,
    /// XObject name each embedded image got on each page.
    page_xobject_names: HashMap<(ObjectId, ObjectId), String>,
    /// Pages whose original content was already wrapped in `q`/`Q`.
    isolated_pages: HashSet<ObjectId>,
    registered_fonts: HashSet<(ObjectId, Font)>,
}

impl PDFSigningDocument {
    pub fn new(raw_document: Document) -> Self {
        PDFSigningDocument {
            raw_document,
            image_signature_object_id: HashMap::new(),
            page_xobject_names: HashMap::new(),
            isolated_pages: HashSet::new(),
            registered_fonts: HashSet::new(),
        }
    }

    pub fn load_mem(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self::new(Document::load_mem(bytes)?))
    }

    pub fn finished(self) -> Document {
        self.raw_document
    }

    pub fn get_document_ref(&self) -> &Document {
        &self.raw_document
    }

    pub fn page_count(&self) -> u32 {
        self.raw_document.get_pages().len() as u32
    }

    /// Object id of a 1-based page number.
    pub fn page_id(&self, page: u32) -> Result<ObjectId, Error> {
        let pages = self.raw_document.get_pages();
        pages.get(&page).copied().ok_or(Error::PageOutOfRange {
            page,
            page_count: pages.len() as u32,
        })
    }

    /// MediaBox size of a page, or `default` when it has none.
    pub fn page_size(&self, page_id: ObjectId, default: Size) -> Size {
        pdf_object::media_box(&self.raw_document, page_id).unwrap_or(default)
    }

    /// Draw a signature bitmap into `rect`, rotated about its centre.
    ///
    /// The same image placed several times is embedded only once.
    pub fn add_signature_to_page(
        &mut self,
        image: &SignatureImage,
        page_id: ObjectId,
        rect: NativeRect,
        rotation: Rotation,
    ) -> Result<ObjectId, Error> {
        let image_name = image.resource_name();
        let image_object_id_opt = self.image_signature_object_id.get(&image_name).cloned();

        Ok(if let Some(image_object_id) = image_object_id_opt {
            // Image was already added so we can reuse it.
            self.add_image_to_page_only(image_object_id, &image_name, page_id, rect, rotation)?
        } else {
            let image_object_id =
                self.add_image(image.png(), &image_name, page_id, rect, rotation)?;
            self.image_signature_object_id
                .insert(image_name, image_object_id);
            image_object_id
        })
    }

    /// Write `text` with its baseline starting at `position` (native units).
    pub fn add_text_to_page(
        &mut self,
        text: &str,
        position: Point,
        font: Font,
        font_size: f64,
        color: Rgb,
        page_id: ObjectId,
    ) -> Result<(), Error> {
        self.ensure_font(page_id, font)?;
        let mut page_content = self.isolated_page_content(page_id)?;
        let (r, g, b) = color.to_normalized();

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), font_size.into()]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", vec![position.x.into(), position.y.into()]),
            Operation::new("Tj", vec![Object::string_literal(win_ansi_bytes(text))]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        page_content.operations.extend(operations);

        self.set_page_content(page_id, &page_content)
    }

    pub fn save_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.raw_document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn ensure_font(&mut self, page_id: ObjectId, font: Font) -> Result<(), Error> {
        if !self.registered_fonts.insert((page_id, font)) {
            return Ok(());
        }
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        };
        let font_id = self.raw_document.add_object(font_dict);
        pdf_object::set_page_resource(
            &mut self.raw_document,
            page_id,
            "Font",
            font.resource_name(),
            Object::Reference(font_id),
        )
    }

    /// Decoded page content, with the original operators wrapped in `q`/`Q`
    /// the first time the page is touched so leftover state cannot leak
    /// into appended drawing.
    fn isolated_page_content(&mut self, page_id: ObjectId) -> Result<Content, Error> {
        if !self.has_contents(page_id)? {
            self.isolated_pages.insert(page_id);
            return Ok(Content { operations: vec![] });
        }
        let mut content = self.raw_document.get_and_decode_page_content(page_id)?;
        if self.isolated_pages.insert(page_id) && !content.operations.is_empty() {
            content.operations.insert(0, Operation::new("q", vec![]));
            content.operations.push(Operation::new("Q", vec![]));
        }
        Ok(content)
    }

    fn has_contents(&self, page_id: ObjectId) -> Result<bool, Error> {
        Ok(self
            .raw_document
            .get_object(page_id)?
            .as_dict()?
            .has(b"Contents"))
    }

    /// Replace the page content; a page without `Contents` gets a new stream.
    fn set_page_content(&mut self, page_id: ObjectId, content: &Content) -> Result<(), Error> {
        let encoded = content.encode()?;
        if self.has_contents(page_id)? {
            self.raw_document.change_page_content(page_id, encoded)?;
        } else {
            let stream_id = self
                .raw_document
                .add_object(Stream::new(Dictionary::new(), encoded));
            self.raw_document
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Contents", Object::Reference(stream_id));
        }
        Ok(())
    }

    fn add_image<R: Read>(
        &mut self,
        image_reader: R,
        image_name: &str,
        page_id: ObjectId,
        rect: NativeRect,
        rotation: Rotation,
    ) -> Result<ObjectId, Error> {
        let image_decoder = png::Decoder::new(image_reader);
        let (mut image_xobject, mask_xobject) = ImageXObject::try_from(image_decoder)?;
        if let Some(mask_xobject) = mask_xobject {
            let mask_xobject_id = self.raw_document.add_object(mask_xobject);
            image_xobject.s_mask = Some(mask_xobject_id);
        }
        let image_xobject_id = self.raw_document.add_object(image_xobject);
        self.add_image_to_page_only(image_xobject_id, image_name, page_id, rect, rotation)
    }

    fn add_image_to_page_only(
        &mut self,
        image_xobject_id: ObjectId,
        image_name: &str,
        page_id: ObjectId,
        rect: NativeRect,
        rotation: Rotation,
    ) -> Result<ObjectId, Error> {
        let xobject_name = match self.page_xobject_names.get(&(page_id, image_xobject_id)) {
            Some(name) => name.clone(),
            None => {
                // The page may already carry marks from an earlier signing pass,
                // so never reuse a name it knows.
                let name = pdf_object::unused_resource_name(
                    &self.raw_document,
                    page_id,
                    "XObject",
                    image_name,
                );
                pdf_object::set_page_resource(
                    &mut self.raw_document,
                    page_id,
                    "XObject",
                    &name,
                    Object::Reference(image_xobject_id),
                )?;
                self.page_xobject_names
                    .insert((page_id, image_xobject_id), name.clone());
                name
            }
        };
        self.add_image_to_page_stream(&xobject_name, page_id, rect, rotation)?;

        Ok(image_xobject_id)
    }

    // The image must already be added to the object list!
    fn add_image_to_page_stream(
        &mut self,
        xobject_name: &str,
        page_id: ObjectId,
        rect: NativeRect,
        rotation: Rotation,
    ) -> Result<(), Error> {
        let mut content = self.isolated_page_content(page_id)?;
        let matrix = image_matrix(rect, rotation.degrees());
        // `q` = Save graphics state
        content.operations.push(Operation::new("q", vec![]));
        // `cm` = Concatenate matrix to current transformation matrix
        content.operations.push(Operation::new(
            "cm",
            matrix.iter().map(|v| Object::from(*v)).collect(),
        ));
        // `Do` = Invoke named XObject
        content.operations.push(Operation::new(
            "Do",
            vec![Object::Name(xobject_name.as_bytes().to_vec())],
        ));
        // `Q` = Restore graphics state
        content.operations.push(Operation::new("Q", vec![]));

        self.set_page_content(page_id, &content)
    }
}

/// Latin-1 subset of WinAnsiEncoding; anything outside it becomes `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect()
}
