use anyhow::{anyhow, Context, Result};
use cli::Cli;
use config::Configuration;
use indicatif::{ProgressBar, ProgressStyle};
use inputs::Inputs;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod config;
mod environment;
mod inputs;
mod sinks {
    mod pdf;
    pub use pdf::{RenderStats, PDF};
}
mod source;

fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// The directory holding the manifest, environment and fonts.
fn program_home(cli: &Cli) -> Result<PathBuf> {
    if let Some(home) = &cli.home {
        return Ok(home.clone());
    }
    let exe = std::env::current_exe().with_context(|| "Failed to locate the executable")?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Executable {} has no parent directory", exe.display()))
}

fn arrow() -> console::StyledObject<&'static str> {
    console::style("->").green()
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let home = program_home(&cli)?;
    log::debug!("program home: {}", home.display());
    let Configuration {
        environment,
        source,
        pdf,
    } = Configuration::load(&home, cli.config.as_deref())?;

    // dependencies are prepared before any argument is validated
    let context = environment::prepare(&home, &environment)
        .with_context(|| "Failed to prepare dependency environment")?;
    if cli.setup {
        println!(
            "{} Dependency environment ready at {}",
            arrow(),
            context.environment().display()
        );
        return Ok(());
    }

    let source_dir = cli
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("No source directory given, pass one with --input"))?;
    let inputs = Inputs::resolve(
        source_dir,
        cli.output.as_deref(),
        &home,
        &pdf.font_file,
        &context,
        chrono::Local::now().date_naive(),
    )?;

    let collected = source
        .collect(&inputs.source_dir)
        .with_context(|| format!("Failed to collect source files from {}", inputs.source_dir.display()))?;
    let line_count = collected.lines.len();
    let total_pages = line_count.div_ceil(pdf.lines_per_page);
    println!(
        "{} Found {line_count} lines of code across {total_pages} pages.",
        arrow()
    );

    let progress = ProgressBar::new(total_pages as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("can parse progress style")
            .progress_chars("#>-"),
    );
    progress.set_message("Rendering PDF...");

    let stats = pdf
        .render(&inputs, collected.lines, &progress)
        .with_context(|| "Failed to render PDF")?;
    progress.finish_and_clear();

    report(&inputs, &stats);
    Ok(())
}

fn report(inputs: &Inputs, stats: &sinks::RenderStats) {
    println!("{} Rendered {} pages.", arrow(), stats.actual_pages);
    if stats.actual_pages != stats.total_pages {
        log::info!(
            "truncated from {} to {} pages",
            stats.total_pages,
            stats.actual_pages
        );
    }

    let size = byte_unit::Byte::from_u64(stats.file_size)
        .get_appropriate_unit(byte_unit::UnitType::Binary);
    println!("  Output: {} ({size:.1})", inputs.output.display());
    println!(
        "{} PDF [{}] generated successfully!",
        arrow(),
        inputs.name
    );
}
