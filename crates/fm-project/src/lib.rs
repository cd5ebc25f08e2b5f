//! fm-project: mission project file format and validation.
//!
//! Projects are YAML or JSON; the extension picks the format. Every load and
//! save goes through [`validate_project`].

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_project};

use std::path::Path;

/// Only project version understood by this release.
pub const LATEST_VERSION: u32 = 1;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// `.json` is JSON, anything else YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    pub fn parse(&self, content: &str) -> ProjectResult<Project> {
        let project = match self {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        validate_project(&project)?;
        Ok(project)
    }

    pub fn render(&self, project: &Project) -> ProjectResult<String> {
        validate_project(project)?;
        Ok(match self {
            FileFormat::Yaml => serde_yaml::to_string(project)?,
            FileFormat::Json => serde_json::to_string_pretty(project)?,
        })
    }
}

fn read(path: &Path, format: FileFormat) -> ProjectResult<Project> {
    format.parse(&std::fs::read_to_string(path)?)
}

fn write(path: &Path, project: &Project, format: FileFormat) -> ProjectResult<()> {
    // Render first so an invalid project leaves the file untouched.
    let content = format.render(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    read(path, FileFormat::Yaml)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    write(path, project, FileFormat::Yaml)
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    read(path, FileFormat::Json)
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    write(path, project, FileFormat::Json)
}

pub fn load_project(path: &Path) -> ProjectResult<Project> {
    read(path, FileFormat::from_path(path))
}

pub fn save_project(path: &Path, project: &Project) -> ProjectResult<()> {
    write(path, project, FileFormat::from_path(path))
}
