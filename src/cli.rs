use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// Directory of source code to render
    #[clap(short, long, value_name = "DIR", required_unless_present = "setup")]
    pub input: Option<PathBuf>,

    /// Where to save the PDF (defaults to `{dir}_{YYYYMMDD}.pdf` in the current directory)
    #[clap(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Only prepare the dependency environment, then exit
    #[clap(long)]
    pub setup: bool,

    /// Directory holding the dependency manifest, environment and fonts
    /// (defaults to the directory of the executable)
    #[clap(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Configuration file to load instead of `code2pdf.toml` in the home directory
    #[clap(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
