//! Named software templates loaded from `<conf>/templates/*.toml`.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::toml_loader;
use crate::catalog::{Catalog, SoftwareId};
use crate::error::ConfigError;

/// An ordered list of software to provision together.
///
/// The order is a presentation hint; execution order always comes from the
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Display name (defaults to the file stem).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Requested ids.
    pub software: Vec<SoftwareId>,
    /// File the template was read from.
    pub path: PathBuf,
}

impl Template {
    /// Lowercase, dash-separated form of the name used for lookups.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }

    /// Check every referenced id against the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSoftware`] for the first id the catalog
    /// does not know.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), ConfigError> {
        match self.software.iter().find(|id| !catalog.contains(id)) {
            Some(id) => Err(ConfigError::UnknownSoftware {
                template: self.name.clone(),
                id: id.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    software: Vec<SoftwareId>,
}

/// Load one template file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_from_path(path: &Path) -> Result<Template, ConfigError> {
    let file: TemplateFile = toml_loader::load_config(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template")
        .to_string();
    Ok(Template {
        name: file.name.unwrap_or(stem),
        description: file.description,
        software: file.software,
        path: path.to_path_buf(),
    })
}

/// Load every `*.toml` template in `dir`, sorted by name.
///
/// A missing directory yields no templates.
///
/// # Errors
///
/// Returns an error if the directory or a template file cannot be read or
/// parsed.
pub fn load_all(dir: &Path) -> Result<Vec<Template>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let io_err = |source| ConfigError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut templates = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            templates.push(load_from_path(&path)?);
        }
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

/// Find a template by file stem, name (case-insensitive) or slug.
///
/// # Errors
///
/// Returns [`ConfigError::TemplateNotFound`] when nothing matches, or any
/// load error.
pub fn load_named(dir: &Path, name: &str) -> Result<Template, ConfigError> {
    let explicit = dir.join(format!("{name}.toml"));
    if explicit.exists() {
        return load_from_path(&explicit);
    }

    let wanted = name.to_lowercase();
    load_all(dir)?
        .into_iter()
        .find(|t| t.slug() == wanted || t.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConfigError::TemplateNotFound {
            name: name.to_string(),
            dir: dir.display().to_string(),
        })
}
