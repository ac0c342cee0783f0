//! Story title resolution.
//!
//! The transform only needs a title string per file; where it comes from is
//! up to the [`TitleResolver`]. [`StoriesTitleResolver`] derives it from the
//! `stories` entries of the plugin config, the way Storybook's automatic
//! titles work: the path of the file relative to the matching entry's
//! directory, minus the story extension, behind the entry's title prefix.

use crate::config::StoriesSpecifier;
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};

/// Files glob used for directory specifiers without an explicit pattern.
pub const DEFAULT_FILES_PATTERN: &str = "**/*.@(mdx|stories.@(mdx|js|jsx|mjs|ts|tsx))";

/// Computes the human-readable title of a story file.
pub trait TitleResolver {
    fn title(&self, story_file: &str, config_dir: &Path) -> String;
}

impl<F> TitleResolver for F
where
    F: Fn(&str, &Path) -> String,
{
    fn title(&self, story_file: &str, config_dir: &Path) -> String {
        self(story_file, config_dir)
    }
}

/// A stories entry split into its directory, files glob and title prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub directory: String,
    pub files: String,
    pub title_prefix: String,
}

impl NormalizedEntry {
    /// Splits a specifier.
    ///
    /// `"../src/**/*.stories.tsx"` becomes directory `../src` and files
    /// `**/*.stories.tsx`; a glob-free string is treated as a directory.
    pub fn from_specifier(specifier: &StoriesSpecifier) -> Self {
        match specifier {
            StoriesSpecifier::Glob(glob) => {
                let segments: Vec<&str> = glob.split('/').collect();
                match segments.iter().position(|segment| has_glob_syntax(segment)) {
                    Some(first_glob) => Self {
                        directory: segments[..first_glob].join("/"),
                        files: segments[first_glob..].join("/"),
                        title_prefix: String::new(),
                    },
                    None => Self {
                        directory: glob.trim_end_matches('/').to_string(),
                        files: DEFAULT_FILES_PATTERN.to_string(),
                        title_prefix: String::new(),
                    },
                }
            }
            StoriesSpecifier::Entry(entry) => Self {
                directory: entry.directory.trim_end_matches('/').to_string(),
                files: entry
                    .files
                    .as_deref()
                    .map(|files| files.trim_start_matches("./").to_string())
                    .unwrap_or_else(|| DEFAULT_FILES_PATTERN.to_string()),
                title_prefix: entry.title_prefix.clone().unwrap_or_default(),
            },
        }
    }

    /// Path of `file` relative to this entry when the entry's glob matches.
    fn relative_match(&self, file: &Path, config_dir: &Path) -> Option<String> {
        let directory = absolute(&config_dir.join(&self.directory));
        let relative = file.strip_prefix(&directory).ok()?;
        let relative = to_slash(relative);
        matches_glob(&self.files, &relative).then_some(relative)
    }
}

/// Resolves titles from the `stories` entries of a plugin config.
#[derive(Debug, Clone, Default)]
pub struct StoriesTitleResolver {
    entries: Vec<NormalizedEntry>,
}

impl StoriesTitleResolver {
    pub fn new(specifiers: &[StoriesSpecifier]) -> Self {
        Self {
            entries: specifiers.iter().map(NormalizedEntry::from_specifier).collect(),
        }
    }

    pub fn entries(&self) -> &[NormalizedEntry] {
        &self.entries
    }
}

impl TitleResolver for StoriesTitleResolver {
    /// Title from the first matching entry; without one, the file name
    /// stripped of its story extension.
    fn title(&self, story_file: &str, config_dir: &Path) -> String {
        let path = story_file.split('?').next().unwrap_or(story_file);
        let file = absolute(Path::new(path));
        let config_dir = absolute(config_dir);

        self.entries
            .iter()
            .find_map(|entry| {
                entry
                    .relative_match(&file, &config_dir)
                    .map(|relative| auto_title(&relative, &entry.title_prefix))
            })
            .unwrap_or_else(|| {
                let name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                auto_title(&name, "")
            })
    }
}

/// Builds a title from a `/`-separated relative path and a prefix.
///
/// The file name is cut at its first dot, a trailing `index` segment is
/// dropped, and so is a file name repeating its directory (`Modal/Modal`).
pub fn auto_title(relative: &str, prefix: &str) -> String {
    let mut parts: Vec<&str> = relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    if let Some(&last) = parts.last()
        && let Some(dot) = last.find('.').filter(|&dot| dot > 0)
    {
        let end = parts.len() - 1;
        parts[end] = &last[..dot];
    }
    if parts.len() > 1 && parts.last().is_some_and(|last| last.eq_ignore_ascii_case("index")) {
        parts.pop();
    }
    if parts.len() > 1 && parts[parts.len() - 1] == parts[parts.len() - 2] {
        parts.pop();
    }

    prefix
        .split('/')
        .filter(|part| !part.is_empty())
        .chain(parts)
        .collect::<Vec<_>>()
        .join("/")
}

/// Matches `path` against a glob that may use `{a,b}` or `@(a|b)` groups.
pub fn matches_glob(pattern: &str, path: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    expand_alternatives(pattern)
        .iter()
        .filter_map(|expanded| Pattern::new(expanded).ok())
        .any(|pattern| pattern.matches_with(path, options))
}

/// Expands the first `{...}` or `@(...)` group of `pattern` and recurses.
pub fn expand_alternatives(pattern: &str) -> Vec<String> {
    let Some((open, close, alternatives)) = first_group(pattern) else {
        return vec![pattern.to_string()];
    };
    alternatives
        .iter()
        .flat_map(|alternative| {
            expand_alternatives(&format!(
                "{}{}{}",
                &pattern[..open],
                alternative,
                &pattern[close + 1..]
            ))
        })
        .collect()
}

/// Locates the first alternative group: its opening byte, closing byte and
/// top-level alternatives.
fn first_group(pattern: &str) -> Option<(usize, usize, Vec<&str>)> {
    let bytes = pattern.as_bytes();
    let (open, inner, separator) = bytes.iter().enumerate().find_map(|(i, &b)| match b {
        b'{' => Some((i, i + 1, b',')),
        b'@' if bytes.get(i + 1) == Some(&b'(') => Some((i, i + 2, b'|')),
        _ => None,
    })?;

    let mut depth = 0usize;
    let mut alternatives = Vec::new();
    let mut from = inner;
    for (i, &b) in bytes.iter().enumerate().skip(inner) {
        match b {
            b'{' | b'(' => depth += 1,
            b'}' | b')' if depth == 0 => {
                alternatives.push(&pattern[from..i]);
                return Some((open, i, alternatives));
            }
            b'}' | b')' => depth -= 1,
            _ if b == separator && depth == 0 => {
                alternatives.push(&pattern[from..i]);
                from = i + 1;
            }
            _ => {}
        }
    }
    None
}

fn has_glob_syntax(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{', '(', '!'])
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute form of `path` with `.` and `..` removed lexically.
fn absolute(path: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
