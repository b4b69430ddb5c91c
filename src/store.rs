//! Prompt discovery.
//!
//! Scans the project and personal prompt directories for Markdown files and
//! builds the per-session catalog. Project prompts override personal prompts
//! with the same name; names reserved by built-in commands are dropped.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands::ReservedNames;

/// Extension a prompt file must carry (case-sensitive).
pub const PROMPT_EXTENSION: &str = ".md";

/// Where a prompt was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    /// `<project-root>/.codex/prompts`
    Project,
    /// `<config-home>/prompts`
    Personal,
}

impl PromptSource {
    /// Get the display label for this source.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Personal => "personal",
        }
    }
}

/// A named prompt template read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEntry {
    pub name: String,
    pub source: PromptSource,
    /// File contents at discovery time.
    pub template: String,
    pub path: PathBuf,
}

impl PromptEntry {
    /// Short description for listings: the first non-blank line, cut after
    /// its first sentence, without a Markdown heading marker or a leading
    /// "You are a" role phrase.
    pub fn description(&self) -> String {
        describe(&self.template)
    }
}

fn describe(template: &str) -> String {
    let line = template
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let line = line.trim_start_matches('#').trim_start();

    // A '.' inside a word ("v1.2") doesn't end the sentence.
    let sentence = line
        .char_indices()
        .find(|&(i, ch)| {
            ch == '.'
                && line[i + 1..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .map_or(line, |(i, _)| &line[..=i]);

    sentence
        .trim_start_matches("You are a ")
        .trim_start_matches("You are an ")
        .trim_start_matches("You are ")
        .trim()
        .to_string()
}

/// Outcome of listing one prompt directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirScan {
    /// Directory was listed (it may still have had no prompts).
    Listed,
    /// Directory doesn't exist.
    Missing,
    /// Directory exists but couldn't be opened.
    Unreadable,
}

/// Error returned when no prompt directory could be read.
#[derive(Debug)]
pub enum CatalogError {
    /// No directory was listed and at least one exists but couldn't be opened.
    IoUnavailable {
        project: PathBuf,
        personal: Option<PathBuf>,
    },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoUnavailable { project, personal } => {
                write!(f, "Prompt directories unavailable: {}", project.display())?;
                if let Some(personal) = personal {
                    write!(f, ", {}", personal.display())?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable, name-keyed collection of prompts for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, PromptEntry>,
}

impl Catalog {
    /// A catalog with no prompts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a prompt by exact name.
    pub fn get(&self, name: &str) -> Option<&PromptEntry> {
        self.entries.get(name)
    }

    /// Check whether a prompt with exactly this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Prompts whose name contains `query`, ignoring case, sorted by name.
    /// An empty query matches everything.
    pub fn matching<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a PromptEntry> + 'a {
        let needle = query.trim().to_lowercase();
        self.iter()
            .filter(move |e| e.name.to_lowercase().contains(&needle))
    }

    /// Iterate over prompts sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &PromptEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Return the project prompts directory for a given project root: `<root>/.codex/prompts`.
pub fn project_prompts_dir(root: &Path) -> PathBuf {
    root.join(".codex").join("prompts")
}

/// Return the personal prompts directory: `<config-home>/prompts`.
///
/// The config home is `$CODEX_HOME` when set, otherwise `~/.codex`.
/// Returns `None` if neither can be resolved.
pub fn default_personal_prompts_dir() -> Option<PathBuf> {
    config_home(std::env::var_os("CODEX_HOME").map(PathBuf::from)).map(|home| home.join("prompts"))
}

fn config_home(env_home: Option<PathBuf>) -> Option<PathBuf> {
    match env_home {
        Some(home) if !home.as_os_str().is_empty() => Some(home),
        _ => dirs::home_dir().map(|home| home.join(".codex")),
    }
}

/// Derive the prompt name from a file name, `None` if it isn't a prompt file.
fn prompt_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(PROMPT_EXTENSION)
        .filter(|name| !name.is_empty())
}

/// Discover prompt files in a single directory, sorted by name.
///
/// Subdirectories, non-`.md` files and files that can't be read as UTF-8
/// are skipped. A missing directory yields no entries.
pub fn discover_prompts_in(dir: &Path, source: PromptSource) -> (Vec<PromptEntry>, DirScan) {
    let mut out = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = ?dir, source = source.label(), "prompt_dir_missing");
            return (out, DirScan::Missing);
        }
        Err(e) => {
            warn!(dir = ?dir, source = source.label(), error = %e, "prompt_dir_unreadable");
            return (out, DirScan::Unreadable);
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = ?dir, error = %e, "prompt_dir_entry_failed");
                continue;
            }
        };
        let path = entry.path();

        // Follows symlinks, so a link to a prompt file counts.
        let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            debug!(path = ?path, "prompt_file_name_not_utf8");
            continue;
        };
        if !file_name.ends_with(PROMPT_EXTENSION) {
            continue;
        }
        let Some(name) = prompt_name(file_name) else {
            debug!(path = ?path, "prompt_file_empty_name_skipped");
            continue;
        };

        let template = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = ?path, error = %e, "prompt_file_read_failed");
                continue;
            }
        };

        out.push(PromptEntry {
            name: name.to_string(),
            source,
            template,
            path,
        });
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    (out, DirScan::Listed)
}

/// Build the session catalog from the project and personal directories.
///
/// Project prompts take precedence over personal prompts on name collisions,
/// and names in `reserved` are excluded. Fails only when neither directory
/// could be listed and at least one of them exists but can't be opened.
pub fn build_catalog(
    project_dir: &Path,
    personal_dir: Option<&Path>,
    reserved: &ReservedNames,
) -> Result<Catalog, CatalogError> {
    let (personal, personal_scan) = match personal_dir {
        Some(dir) => discover_prompts_in(dir, PromptSource::Personal),
        None => (Vec::new(), DirScan::Missing),
    };
    let (project, project_scan) = discover_prompts_in(project_dir, PromptSource::Project);

    let any_listed = matches!(project_scan, DirScan::Listed) || matches!(personal_scan, DirScan::Listed);
    let any_unreadable =
        matches!(project_scan, DirScan::Unreadable) || matches!(personal_scan, DirScan::Unreadable);
    if !any_listed && any_unreadable {
        return Err(CatalogError::IoUnavailable {
            project: project_dir.to_path_buf(),
            personal: personal_dir.map(Path::to_path_buf),
        });
    }

    let mut entries: BTreeMap<String, PromptEntry> = BTreeMap::new();
    for entry in personal.into_iter().chain(project) {
        if let Some(shadowed) = entries.insert(entry.name.clone(), entry) {
            debug!(name = %shadowed.name, path = ?shadowed.path, "prompt_shadowed");
        }
    }

    entries.retain(|name, entry| {
        let keep = !reserved.contains(name);
        if !keep {
            debug!(name = %name, path = ?entry.path, "prompt_reserved_name_skipped");
        }
        keep
    });

    info!(count = entries.len(), "catalog_built");
    Ok(Catalog { entries })
}
