use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// PDF output configuration.
///
/// Coordinates are in PDF points with the origin at the bottom-left of the page, so
/// `origin_y_pt` is the baseline of the first line and each following line sits
/// `line_height_pt` below the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDF {
    /// Logical name the font is registered under in every page's resources
    #[serde(default = "default_font_name")]
    pub font_name: String,
    /// Font file, relative to the program home
    #[serde(default = "default_font_file")]
    pub font_file: PathBuf,
    #[serde(default = "default_font_size")]
    pub font_size_pt: f32,
    #[serde(default = "default_line_height")]
    pub line_height_pt: f32,
    /// Horizontal position of every line
    #[serde(default = "default_origin_x")]
    pub origin_x_pt: f32,
    /// Baseline of the first line on each page
    #[serde(default = "default_origin_y")]
    pub origin_y_pt: f32,
    #[serde(default = "default_page_width")]
    pub page_width_pt: f32,
    #[serde(default = "default_page_height")]
    pub page_height_pt: f32,
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
    /// Inputs that would need more pages than this are truncated
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Pages kept from each of the head and the tail when truncating
    #[serde(default = "default_retained_pages")]
    pub retained_pages: usize,
}

fn default_font_name() -> String {
    "SimSun".to_string()
}
fn default_font_file() -> PathBuf {
    PathBuf::from("fonts").join("SimSun.ttf")
}
fn default_font_size() -> f32 {
    10.0
}
fn default_line_height() -> f32 {
    15.0
}
fn default_origin_x() -> f32 {
    10.0
}
fn default_origin_y() -> f32 {
    800.0
}
// A4
fn default_page_width() -> f32 {
    595.2756
}
fn default_page_height() -> f32 {
    841.8898
}
fn default_lines_per_page() -> usize {
    50
}
fn default_max_pages() -> usize {
    60
}
fn default_retained_pages() -> usize {
    30
}

impl Default for PDF {
    fn default() -> Self {
        PDF {
            font_name: default_font_name(),
            font_file: default_font_file(),
            font_size_pt: default_font_size(),
            line_height_pt: default_line_height(),
            origin_x_pt: default_origin_x(),
            origin_y_pt: default_origin_y(),
            page_width_pt: default_page_width(),
            page_height_pt: default_page_height(),
            lines_per_page: default_lines_per_page(),
            max_pages: default_max_pages(),
            retained_pages: default_retained_pages(),
        }
    }
}

impl PDF {
    pub fn validate(&self) -> Result<()> {
        if self.lines_per_page == 0 {
            return Err(anyhow!("pdf.lines_per_page must be greater than zero"));
        }
        // the head and tail of a truncated document must not overlap
        let overlapping = self
            .retained_pages
            .checked_mul(2)
            .map_or(true, |both| both > self.max_pages);
        if overlapping {
            return Err(anyhow!(
                "pdf.retained_pages ({}) must be at most half of pdf.max_pages ({})",
                self.retained_pages,
                self.max_pages
            ));
        }
        if self.retained_pages.checked_mul(self.lines_per_page).is_none() {
            return Err(anyhow!(
                "pdf.retained_pages ({}) is too large for {} lines per page",
                self.retained_pages,
                self.lines_per_page
            ));
        }
        if self.font_name.is_empty() || !self.font_name.chars().all(|c| c.is_ascii_graphic()) {
            return Err(anyhow!(
                "pdf.font_name `{}` must be a non-empty printable ASCII name",
                self.font_name
            ));
        }
        Ok(())
    }
}

/// Statistics from rendering a PDF, used for user feedback.
pub struct RenderStats {
    /// Pages the collected lines would need before truncation
    pub total_pages: usize,
    /// Pages actually drawn into the PDF
    pub actual_pages: usize,
    /// Size of the saved file in bytes
    pub file_size: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_serialize_pdf() {
        let pdf = PDF::default();
        toml::to_string(&pdf).expect("can serialize PDF to TOML");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let pdf: PDF = toml::from_str("font_size_pt = 12.0").expect("can parse partial PDF");
        assert_eq!(pdf.font_size_pt, 12.0);
        assert_eq!(pdf.lines_per_page, 50);
        assert_eq!(pdf.font_name, "SimSun");
        assert_eq!(pdf.font_file, PathBuf::from("fonts/SimSun.ttf"));
    }

    #[test]
    fn default_pdf_is_valid() {
        PDF::default().validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_overlapping_truncation() {
        let pdf = PDF {
            max_pages: 10,
            retained_pages: 6,
            ..PDF::default()
        };
        assert!(pdf.validate().is_err());
    }

    #[test]
    fn rejects_huge_retained_pages() {
        let pdf = PDF {
            max_pages: usize::MAX,
            retained_pages: usize::MAX,
            ..PDF::default()
        };
        assert!(pdf.validate().is_err());

        let pdf = PDF {
            max_pages: usize::MAX,
            retained_pages: usize::MAX / 2,
            ..PDF::default()
        };
        let err = pdf.validate().expect_err("head would overflow");
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn rejects_zero_lines_per_page() {
        let pdf = PDF {
            lines_per_page: 0,
            ..PDF::default()
        };
        assert!(pdf.validate().is_err());
    }
}
