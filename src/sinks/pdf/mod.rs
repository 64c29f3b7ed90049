use crate::inputs::Inputs;
use anyhow::{Context, Result};
use indicatif::ProgressBar;

mod canvas;
mod config;
mod fonts;
mod pagination;

use canvas::Canvas;
pub use config::{RenderStats, PDF};
use fonts::TrueTypeFont;
use pagination::{Page, Pagination};

impl PDF {
    /// Render `lines` into the PDF at `inputs.output`.
    ///
    /// `total_pages` in the returned stats is counted before truncation, `actual_pages`
    /// after, so the two differ whenever the input was too long to render whole.
    pub fn render(
        &self,
        inputs: &Inputs,
        lines: Vec<String>,
        progress: &ProgressBar,
    ) -> Result<RenderStats> {
        let pagination = Pagination::from(self);
        let total_pages = pagination.page_count(lines.len());
        let lines = pagination.truncate(lines);
        let actual_pages = pagination.page_count(lines.len());

        let font = TrueTypeFont::load(&self.font_name, &inputs.font)?;
        let mut canvas = Canvas::new(font, (self.page_width_pt, self.page_height_pt));
        canvas.set_title(inputs.name.as_str());

        progress.set_length(actual_pages as u64);
        canvas.set_font(self.font_size_pt);
        for (i, page) in pagination.pages(&lines).enumerate() {
            if i != 0 {
                canvas.show_page();
                canvas.set_font(self.font_size_pt);
            }
            self.render_page(&mut canvas, &page)
                .with_context(|| format!("Failed to render page {}", i + 1))?;
            progress.inc(1);
        }

        let file = std::fs::File::create(&inputs.output).with_context(|| {
            format!("Failed to create output file {}", inputs.output.display())
        })?;
        let mut file = std::io::BufWriter::new(file);
        canvas
            .save(&mut file)
            .with_context(|| format!("Failed to save PDF to {}", inputs.output.display()))?;
        let file = file
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", inputs.output.display()))?;
        let file_size = file
            .metadata()
            .with_context(|| format!("Failed to read metadata of {}", inputs.output.display()))?
            .len();

        Ok(RenderStats {
            total_pages,
            actual_pages,
            file_size,
        })
    }

    fn render_page(&self, canvas: &mut Canvas, page: &Page) -> Result<()> {
        log::trace!("drawing {} lines from offset {}", page.lines.len(), page.offset);
        for (j, line) in page.lines.iter().enumerate() {
            let y = self.origin_y_pt - self.line_height_pt * j as f32;
            canvas.draw_string(self.origin_x_pt, y, line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::fonts::tests::{load_test_font, test_font};
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{Document, Object};
    use std::path::{Path, PathBuf};

    fn inputs_in(dir: &Path, font: PathBuf) -> Inputs {
        Inputs {
            source_dir: dir.to_path_buf(),
            name: "demo".to_string(),
            output: dir.join("demo.pdf"),
            font,
        }
    }

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("let x{i} = \"代码 {i}\";")).collect()
    }

    /// Decoded content operations of every page, in page order.
    fn page_operations(doc: &Document) -> Vec<Vec<Operation>> {
        doc.get_pages()
            .values()
            .map(|&id| {
                doc.get_and_decode_page_content(id)
                    .expect("can decode page content")
                    .operations
            })
            .collect()
    }

    fn operands_of<'a>(operations: &'a [Operation], operator: &str) -> Vec<&'a [Object]> {
        operations
            .iter()
            .filter(|op| op.operator == operator)
            .map(|op| op.operands.as_slice())
            .collect()
    }

    fn position(operands: &[Object]) -> (f32, f32) {
        (
            operands[0].as_float().expect("x is a number"),
            operands[1].as_float().expect("y is a number"),
        )
    }

    fn shown_bytes(operands: &[Object]) -> Vec<u8> {
        match &operands[0] {
            Object::String(bytes, _) => bytes.clone(),
            other => panic!("expected a string operand, got {other:?}"),
        }
    }

    #[test]
    fn can_render_pages() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), test_font());

        let stats = PDF::default()
            .render(&inputs, numbered(120), &ProgressBar::hidden())
            .expect("can render PDF");
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.actual_pages, 3);
        assert_eq!(
            stats.file_size,
            std::fs::metadata(&inputs.output).expect("output exists").len()
        );

        let doc = Document::load(&inputs.output).expect("can load rendered PDF");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn every_page_selects_the_font_and_steps_down_by_line_height() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), test_font());
        PDF::default()
            .render(&inputs, numbered(120), &ProgressBar::hidden())
            .expect("can render PDF");

        let doc = Document::load(&inputs.output).expect("can load rendered PDF");
        let pages = page_operations(&doc);
        assert_eq!(pages.len(), 3);

        for operations in &pages {
            let fonts = operands_of(operations, "Tf");
            assert_eq!(fonts.len(), 1);
            assert_eq!(fonts[0][0], Object::Name(b"SimSun".to_vec()));
            assert_eq!(fonts[0][1].as_float().expect("size is a number"), 10.0);
            // the font is chosen before anything is drawn on the page
            assert_eq!(operations[0].operator, "Tf");
        }

        let first = operands_of(&pages[0], "Td");
        assert_eq!(first.len(), 50);
        assert_eq!(position(first[0]), (10.0, 800.0));
        assert_eq!(position(first[1]), (10.0, 785.0));
        assert_eq!(position(first[49]), (10.0, 65.0));

        let last = operands_of(&pages[2], "Td");
        assert_eq!(last.len(), 20);
        assert_eq!(position(last[0]), (10.0, 800.0));
        assert_eq!(position(last[19]), (10.0, 515.0));
    }

    #[test]
    fn truncates_long_inputs() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), test_font());

        let stats = PDF::default()
            .render(&inputs, numbered(4000), &ProgressBar::hidden())
            .expect("can render PDF");
        assert_eq!(stats.total_pages, 80);
        assert_eq!(stats.actual_pages, 60);

        let doc = Document::load(&inputs.output).expect("can load rendered PDF");
        assert_eq!(doc.get_pages().len(), 60);
    }

    #[test]
    fn truncated_tail_starts_on_page_thirty_one() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), test_font());
        let lines = numbered(4000);
        PDF::default()
            .render(&inputs, lines.clone(), &ProgressBar::hidden())
            .expect("can render PDF");

        let doc = Document::load(&inputs.output).expect("can load rendered PDF");
        let pages = page_operations(&doc);
        let mut font = load_test_font();

        // the last head line, then the first of the final 1500 lines
        let head = operands_of(&pages[29], "Tj");
        assert_eq!(shown_bytes(head[49]), font.encode(&lines[1499]));
        let tail = operands_of(&pages[30], "Tj");
        assert_eq!(shown_bytes(tail[0]), font.encode(&lines[2500]));
        let end = operands_of(&pages[59], "Tj");
        assert_eq!(shown_bytes(end[49]), font.encode(&lines[3999]));
    }

    #[test]
    fn empty_input_still_writes_a_document() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), test_font());

        let stats = PDF::default()
            .render(&inputs, Vec::new(), &ProgressBar::hidden())
            .expect("can render PDF");
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.actual_pages, 0);

        let doc = Document::load(&inputs.output).expect("can load rendered PDF");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn missing_font_fails_before_writing() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let inputs = inputs_in(dir.path(), dir.path().join("fonts/SimSun.ttf"));

        let result = PDF::default().render(&inputs, numbered(10), &ProgressBar::hidden());
        assert!(result.is_err());
        assert!(!inputs.output.exists());
    }
}
