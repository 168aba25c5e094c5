//! Storage names for uploaded files.
//!
//! A storage name is `<token>_<sanitized original name>`, where the token is
//! 12 random lowercase alphanumerics (36^12, about 2^62 values). Files live
//! under `<files_dir>/<project key>/<storage name>`, where the key is the
//! project's internal UUID, never the caller-chosen identifier.

use std::path::PathBuf;

use rand::Rng;
use rand::distributions::Alphanumeric;

const TOKEN_LEN: usize = 12;

/// A freshly generated storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedName {
    pub path: PathBuf,
    /// Identifier recorded as the asset name
    pub name: String,
}

/// Generates project-scoped, collision-resistant file names
#[derive(Debug, Clone)]
pub struct FileNamer {
    files_dir: PathBuf,
}

impl FileNamer {
    pub fn new(files_dir: PathBuf) -> Self {
        Self { files_dir }
    }

    /// Directory holding a project's files
    pub fn project_dir(&self, project_key: &str) -> PathBuf {
        self.files_dir.join(sanitize_component(project_key))
    }

    /// Location of a stored file by its storage name
    pub fn file_path(&self, project_key: &str, name: &str) -> PathBuf {
        self.project_dir(project_key).join(sanitize_component(name))
    }

    /// Generate a storage name that does not exist yet, creating the project
    /// directory if needed.
    pub fn generate(&self, original_name: &str, project_key: &str) -> std::io::Result<GeneratedName> {
        let dir = self.project_dir(project_key);
        std::fs::create_dir_all(&dir)?;

        let clean = sanitize_component(original_name);
        loop {
            let name = format!("{}_{}", random_token(), clean);
            let path = dir.join(&name);
            if !path.exists() {
                return Ok(GeneratedName { path, name });
            }
        }
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Reduce a name to a single safe path component.
///
/// Whitespace runs collapse to one `_`, anything outside `[A-Za-z0-9._-]`
/// becomes `_`, and leading dots are dropped so the result can never be
/// `.`/`..` or hidden.
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;

    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        match c {
            c if c.is_ascii_alphanumeric() => out.push(c),
            '.' | '-' | '_' => out.push(c),
            _ => out.push('_'),
        }
    }

    let out = out.trim_start_matches('.');
    if out.is_empty() {
        "file".to_string()
    } else {
        out.to_string()
    }
}
