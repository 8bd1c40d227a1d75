//! Reflowable document encoder (WordprocessingML package)
//!
//! One section with mirrored margins; each page is a paragraph holding a
//! single inline picture sized to the printable area. Every paragraph
//! after the first starts on a new page.

use super::PageEncoder;
use crate::constants::{in_to_emu, in_to_twips};
use crate::geometry::PageGeometry;
use crate::normalize::RenderedPage;
use crate::types::*;
use std::io::Write;
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:mirrorMargins/></w:settings>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>"#;

const SETTINGS_REL_ID: &str = "rIdSettings";

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
}

/// Streams page pictures into a DOCX package
pub struct DocxWriter {
    zip: ZipWriter<NamedTempFile>,
    body: String,
    rels: String,
    extent_cx: i64,
    extent_cy: i64,
    section: String,
    pages: usize,
}

impl DocxWriter {
    pub fn new(geometry: &PageGeometry) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("kdp-docx-")
            .suffix(".docx")
            .tempfile()?;

        let margins = &geometry.margins;
        let section = format!(
            r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="0" w:footer="0" w:gutter="{}"/></w:sectPr>"#,
            in_to_twips(geometry.page_width_in),
            in_to_twips(geometry.page_height_in),
            in_to_twips(margins.top_in),
            in_to_twips(margins.right_in),
            in_to_twips(margins.bottom_in),
            in_to_twips(margins.left_in),
            in_to_twips(margins.gutter_in),
        );

        Ok(Self {
            zip: ZipWriter::new(file),
            body: String::new(),
            rels: String::new(),
            extent_cx: in_to_emu(geometry.printable_width_in()),
            extent_cy: in_to_emu(geometry.printable_height_in()),
            section,
            pages: 0,
        })
    }

    /// Write the package parts and return the finished file
    pub fn finish(mut self) -> Result<NamedTempFile> {
        self.zip.start_file("[Content_Types].xml", deflated())?;
        self.zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        self.zip.start_file("_rels/.rels", deflated())?;
        self.zip.write_all(PACKAGE_RELS_XML.as_bytes())?;

        self.zip.start_file("word/settings.xml", deflated())?;
        self.zip.write_all(SETTINGS_XML.as_bytes())?;

        let rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="{SETTINGS_REL_ID}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/>{}</Relationships>"#,
            self.rels
        );
        self.zip.start_file("word/_rels/document.xml.rels", deflated())?;
        self.zip.write_all(rels.as_bytes())?;

        self.zip.start_file("word/document.xml", deflated())?;
        self.zip.write_all(DOCUMENT_OPEN.as_bytes())?;
        self.zip.write_all(self.body.as_bytes())?;
        self.zip.write_all(self.section.as_bytes())?;
        self.zip.write_all(b"</w:body></w:document>")?;

        let mut file = self.zip.finish()?;
        file.flush()?;
        log::debug!("DOCX package finished with {} pictures", self.pages);
        Ok(file)
    }

    fn push_picture_paragraph(&mut self, number: usize, rel_id: &str) {
        let page_break = if number > 1 { "<w:pageBreakBefore/>" } else { "" };
        let (cx, cy) = (self.extent_cx, self.extent_cy);
        self.body.push_str(&format!(
            r#"<w:p><w:pPr>{page_break}<w:spacing w:before="0" w:after="0"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{number}" name="Picture {number}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="{number}" name="image{number}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ));
    }
}

impl PageEncoder for DocxWriter {
    fn add_page(&mut self, page: &RenderedPage) -> Result<()> {
        let number = self.pages + 1;
        let rel_id = format!("rIdImage{number}");
        let png = page.png_bytes()?;

        // PNG data is already compressed
        self.zip
            .start_file(format!("word/media/image{number}.png"), stored())?;
        self.zip.write_all(&png)?;

        self.rels.push_str(&format!(
            r#"<Relationship Id="{rel_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image{number}.png"/>"#
        ));
        self.push_picture_paragraph(number, &rel_id);
        self.pages = number;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}
