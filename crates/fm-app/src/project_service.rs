//! Project loading, saving and validation.

use fm_project::Project;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Load and validate a project; `.json` files as JSON, anything else as YAML.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(fm_project::load_project(path)?)
}

pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    Ok(fm_project::save_project(path, project)?)
}

/// Schema validation followed by a trial compile, which catches the
/// constraints only the runtime models check (e.g. SoC limits).
pub fn validate_project(project: &Project) -> AppResult<()> {
    fm_project::validate_project(project)?;
    let runtime = crate::runtime_compile::compile_project(project)?;
    runtime.mission().validate()?;
    Ok(())
}
