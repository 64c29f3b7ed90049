use crate::environment::DependencyContext;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Validated paths for a single conversion.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub source_dir: PathBuf,
    /// Name of the source directory, used for the default output and messages
    pub name: String,
    pub output: PathBuf,
    pub font: PathBuf,
}

/// `{name}_{YYYYMMDD}.pdf`
pub fn default_output_name(name: &str, date: NaiveDate) -> String {
    format!("{name}_{}.pdf", date.format("%Y%m%d"))
}

fn directory_name(dir: &Path) -> Result<String> {
    if let Some(name) = dir.file_name() {
        return Ok(name.to_string_lossy().to_string());
    }

    // paths like `.` or `..` have no final component until they're resolved
    let canonical = std::fs::canonicalize(dir)
        .map_err(|e| anyhow!("Failed to canonicalize {}: {e:#}", dir.display()))?;
    match canonical.file_name() {
        Some(name) => Ok(name.to_string_lossy().to_string()),
        None => Err(anyhow!(
            "Source directory {} doesn't have a name, pass an output path with --output",
            canonical.display()
        )),
    }
}

/// Find the font at `relative` under `home`, falling back to the library directories
/// of the dependency environment.
pub fn locate_font(home: &Path, relative: &Path, context: &DependencyContext) -> Result<PathBuf> {
    let expected = home.join(relative);
    if expected.is_file() {
        return Ok(expected);
    }

    context
        .library_dirs()
        .iter()
        .map(|dir| dir.join(relative))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| anyhow!("Font file not found: {}", expected.display()))
}

impl Inputs {
    /// Validate the source directory, derive the output path and locate the font.
    ///
    /// Checks run in that order, so an invalid source directory is reported even when
    /// the font is also missing.
    pub fn resolve(
        source_dir: &Path,
        output: Option<&Path>,
        home: &Path,
        font: &Path,
        context: &DependencyContext,
        today: NaiveDate,
    ) -> Result<Inputs> {
        if !source_dir.is_dir() {
            return Err(anyhow!(
                "Invalid source directory: {}",
                source_dir.display()
            ));
        }

        let name = directory_name(source_dir)?;
        let output = match output {
            Some(output) => output.to_path_buf(),
            None => PathBuf::from(default_output_name(&name, today)),
        };

        let font = locate_font(home, font, context)?;
        log::info!("using font {}", font.display());

        Ok(Inputs {
            source_dir: source_dir.to_path_buf(),
            name,
            output,
            font,
        })
    }
}
