//! Dependency environment preparation.
//!
//! Before converting anything, the tool makes sure an isolated environment exists next
//! to the program and that every package listed in the dependency manifest is installed
//! into it. Each step is idempotent: the environment is only created when its directory
//! is missing, and a package is only installed when the package manager reports it as
//! absent.
//!
//! Nothing process-wide is modified. Preparation yields a [`DependencyContext`] naming
//! the environment's library directories, which later stages receive explicitly and
//! which is released when it goes out of scope.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Package manager configuration.
///
/// Commands are argument vectors in which `{env}` expands to the environment directory
/// and `{package}` to the package being inspected or installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Dependency manifest, one package per line, relative to the program home
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Environment directory, relative to the program home
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Library directories inside the environment made available to later stages
    #[serde(default = "default_library_dirs")]
    pub library_dirs: Vec<PathBuf>,
    #[serde(default = "default_create")]
    pub create: Vec<String>,
    /// Exits successfully when `{package}` is installed
    #[serde(default = "default_inspect")]
    pub inspect: Vec<String>,
    #[serde(default = "default_install")]
    pub install: Vec<String>,
}

fn default_manifest() -> PathBuf {
    PathBuf::from("requirements.txt")
}
fn default_directory() -> PathBuf {
    PathBuf::from("venv")
}
fn default_library_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("lib")]
}
fn default_create() -> Vec<String> {
    ["python3", "-m", "venv", "{env}"].map(String::from).to_vec()
}
fn default_inspect() -> Vec<String> {
    ["{env}/bin/pip", "show", "{package}"].map(String::from).to_vec()
}
fn default_install() -> Vec<String> {
    ["{env}/bin/pip", "install", "{package}"].map(String::from).to_vec()
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            manifest: default_manifest(),
            directory: default_directory(),
            library_dirs: default_library_dirs(),
            create: default_create(),
            inspect: default_inspect(),
            install: default_install(),
        }
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, command) in [
            ("create", &self.create),
            ("inspect", &self.inspect),
            ("install", &self.install),
        ] {
            if command.is_empty() {
                return Err(anyhow!("environment.{name} command must not be empty"));
            }
        }
        Ok(())
    }
}

/// Library locations of a prepared environment, scoped to a single run.
#[derive(Debug)]
pub struct DependencyContext {
    environment: PathBuf,
    library_dirs: Vec<PathBuf>,
}

impl DependencyContext {
    #[cfg(test)]
    pub(crate) fn empty() -> DependencyContext {
        DependencyContext::with_library_dirs(Vec::new())
    }

    #[cfg(test)]
    pub(crate) fn with_library_dirs(library_dirs: Vec<PathBuf>) -> DependencyContext {
        DependencyContext {
            environment: PathBuf::new(),
            library_dirs,
        }
    }

    pub fn environment(&self) -> &Path {
        &self.environment
    }

    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.library_dirs
    }
}

impl Drop for DependencyContext {
    fn drop(&mut self) {
        log::debug!(
            "releasing dependency context for {}",
            self.environment.display()
        );
    }
}

fn expand(template: &[String], env: &Path, package: Option<&str>) -> Command {
    let env = env.display().to_string();
    let mut args = template.iter().map(|arg| {
        let arg = arg.replace("{env}", &env);
        match package {
            Some(package) => arg.replace("{package}", package),
            None => arg,
        }
    });
    // templates are validated to be non-empty
    let program = args.next().unwrap_or_default();
    let mut command = Command::new(program);
    command.args(args);
    command
}

/// Read the package names listed in the manifest, skipping blanks and `#` comments.
pub fn read_manifest(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(anyhow!(
            "Dependency manifest not found at {}, unable to check or install dependencies",
            path.display()
        ));
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dependency manifest {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect())
}

fn is_installed(config: &EnvironmentConfig, env: &Path, package: &str) -> Result<bool> {
    let status = expand(&config.inspect, env, Some(package))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run package inspection for {package}"))?;
    log::trace!("inspecting {package}: {status}");
    Ok(status.success())
}

fn install(config: &EnvironmentConfig, env: &Path, package: &str) -> Result<()> {
    let status = expand(&config.install, env, Some(package))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run package installation for {package}"))?;
    if !status.success() {
        return Err(anyhow!("Failed to install dependency {package} ({status})"));
    }
    Ok(())
}

/// Make sure the environment under `home` exists and holds every manifest package.
pub fn prepare(home: &Path, config: &EnvironmentConfig) -> Result<DependencyContext> {
    let manifest = home.join(&config.manifest);
    let packages = read_manifest(&manifest)?;

    let env = home.join(&config.directory);
    if !env.exists() {
        log::info!("creating dependency environment at {}", env.display());
        let status = expand(&config.create, &env, None)
            .status()
            .with_context(|| format!("Failed to create environment at {}", env.display()))?;
        if !status.success() {
            return Err(anyhow!(
                "Failed to create environment at {} ({status})",
                env.display()
            ));
        }
    }

    for package in packages.iter() {
        if is_installed(config, &env, package)? {
            log::debug!("dependency {package} already installed");
            continue;
        }
        println!(
            "{} Installing dependency: {package}",
            console::style("->").green()
        );
        install(config, &env, package)?;
    }

    let library_dirs = config.library_dirs.iter().map(|dir| env.join(dir)).collect();
    Ok(DependencyContext {
        environment: env,
        library_dirs,
    })
}
