//! Fixed-layout document encoder
//!
//! Each page gets exactly one full-page image XObject drawn from the
//! origin to the page's top-right corner.

use super::PageEncoder;
use crate::geometry::PageGeometry;
use crate::normalize::RenderedPage;
use crate::types::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

const IMAGE_NAME: &str = "Im0";

/// Builds a PDF with one page per image
pub struct PdfWriter {
    doc: Document,
    pages_tree_id: ObjectId,
    page_refs: Vec<Object>,
    width_pt: f32,
    height_pt: f32,
}

impl PdfWriter {
    pub fn new(geometry: &PageGeometry) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_tree_id = doc.new_object_id();
        Self {
            doc,
            pages_tree_id,
            page_refs: Vec::new(),
            width_pt: geometry.page_width_pt(),
            height_pt: geometry.page_height_pt(),
        }
    }

    /// Close the page tree and return the document
    pub fn finish(mut self) -> Document {
        let count = self.page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_tree_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_tree_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }

    fn add_image(&mut self, page: &RenderedPage) -> Result<ObjectId> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(page.pixels().as_raw())?;
        let data = encoder.finish()?;

        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(page.width_px()))),
            ("Height", Object::Integer(i64::from(page.height_px()))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"FlateDecode".to_vec())),
        ]);

        Ok(self.doc.add_object(Stream::new(dict, data)))
    }
}

impl PageEncoder for PdfWriter {
    fn add_page(&mut self, page: &RenderedPage) -> Result<()> {
        let image_id = self.add_image(page)?;

        // Scale the unit square image to the full page
        let content = format!(
            "q {} 0 0 {} 0 0 cm /{} Do Q\n",
            self.width_pt, self.height_pt, IMAGE_NAME
        );
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_NAME, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let page_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_tree_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.width_pt),
                    Object::Real(self.height_pt),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        self.page_refs.push(Object::Reference(page_id));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.page_refs.len()
    }
}
