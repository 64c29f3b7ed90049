//! A minimal drawing surface over `lopdf`.
//!
//! Pages are drawn one at a time: operations accumulate on the current page until
//! [`Canvas::show_page`] closes it. Font selection belongs to the page it was made on,
//! so every new page has to select its font again before any text is drawn.

use super::fonts::TrueTypeFont;
use anyhow::{anyhow, Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

pub struct Canvas {
    font: TrueTypeFont,
    page_size: (f32, f32),
    finished: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    font_selected: bool,
    title: Option<String>,
}

impl Canvas {
    /// Create a canvas whose pages are `page_size` (width, height) points, with `font`
    /// registered under its logical name.
    pub fn new(font: TrueTypeFont, page_size: (f32, f32)) -> Canvas {
        Canvas {
            font,
            page_size,
            finished: Vec::default(),
            current: Vec::default(),
            font_selected: false,
            title: None,
        }
    }

    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.title = Some(title.into());
    }

    /// Select the registered font at `size` for the rest of the current page.
    pub fn set_font(&mut self, size: f32) {
        self.current.push(Operation::new(
            "Tf",
            vec![Object::Name(self.font.name.clone().into_bytes()), size.into()],
        ));
        self.font_selected = true;
    }

    /// Draw `text` with its baseline starting at (`x`, `y`).
    ///
    /// Text is not wrapped or clipped; whatever runs past the page edge is simply
    /// outside the visible area.
    pub fn draw_string(&mut self, x: f32, y: f32, text: &str) -> Result<()> {
        if !self.font_selected {
            return Err(anyhow!("No font selected on page {}", self.finished.len() + 1));
        }
        let encoded = self.font.encode(text);
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::String(encoded, StringFormat::Hexadecimal)]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    /// Close the current page and start a new one.
    pub fn show_page(&mut self) {
        let operations = std::mem::take(&mut self.current);
        self.finished.push(operations);
        // the next page starts without a font
        self.font_selected = false;
    }

    /// Number of pages in the document so far, counting the open page.
    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    /// Assemble the document and write it to `target`.
    pub fn save<W: Write>(mut self, target: &mut W) -> Result<()> {
        let last = std::mem::take(&mut self.current);
        self.finished.push(last);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = self.font.embed(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                self.font.name.as_str() => font_id,
            },
        });

        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            self.page_size.0.into(),
            self.page_size.1.into(),
        ];

        let mut kids: Vec<Object> = Vec::with_capacity(self.finished.len());
        for (i, operations) in self.finished.into_iter().enumerate() {
            let content = Content { operations };
            let encoded = content
                .encode()
                .with_context(|| format!("Failed to encode content of page {}", i + 1))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(concat!("code2pdf ", env!("CARGO_PKG_VERSION"))),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::String(utf16_text_string(title), StringFormat::Hexadecimal));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        log::debug!(
            "embedding {} distinct glyphs from font {}",
            self.font.used_glyph_count(),
            self.font.name
        );
        doc.compress();
        doc.save_to(target).with_context(|| "Failed to write PDF")?;
        Ok(())
    }
}

/// Encode a PDF text string as UTF-16BE with a byte order mark.
fn utf16_text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}
