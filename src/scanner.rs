//! Story file discovery.
//!
//! Recursively walks directories to collect story files, skipping entries
//! whose names start with `.` or `_` unless default excludes are disabled.
//! User-supplied glob patterns prune matching files and whole directories.

use crate::transform::is_story_file;
use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of files the transform can parse.
pub const STORY_EXTENSIONS: [&str; 7] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs"];

/// Collects story files under `paths`, sorted by file name within each
/// directory.
///
/// A path naming a file is taken as is when it is a story file; exclusions
/// only apply to entries found while walking.
pub fn collect_story_files(
    paths: &[PathBuf],
    excludes: &[String],
    default_excludes: bool,
) -> Result<Vec<PathBuf>> {
    let patterns = compile_excludes(excludes)?;
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_story_path(path) {
                files.push(path.clone());
            }
            continue;
        }

        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded(e, &patterns, default_excludes))
        {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && is_story_path(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

/// True for a parseable file following the story naming convention.
pub fn is_story_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| STORY_EXTENSIONS.contains(&ext))
        && is_story_file(&path.to_string_lossy())
}

fn compile_excludes(excludes: &[String]) -> Result<Vec<Pattern>> {
    excludes
        .iter()
        .map(|raw| {
            Pattern::new(raw).with_context(|| format!("Invalid exclude pattern '{}'", raw))
        })
        .collect()
}

fn is_excluded(entry: &walkdir::DirEntry, patterns: &[Pattern], default_excludes: bool) -> bool {
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };
    if default_excludes && (name.starts_with('.') || name.starts_with('_')) {
        return true;
    }
    let path = entry.path();
    let path = path.strip_prefix(".").unwrap_or(path);
    patterns
        .iter()
        .any(|pattern| pattern.matches(name) || pattern.matches_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export default {};\n").unwrap();
    }

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for relative in [
            "src/Button.stories.tsx",
            "src/Button.tsx",
            "src/forms/Input.story.ts",
            "src/_drafts/Draft.stories.ts",
            "src/Docs.stories.mdx",
            ".storybook/Preview.stories.ts",
            "node_modules/lib/Lib.stories.js",
            "src/legacy.generated.stories.ts",
        ] {
            touch(dir.path(), relative);
        }
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|file| {
                file.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn collects_story_files_with_default_excludes() {
        let dir = project();
        let files = collect_story_files(&[dir.path().to_path_buf()], &[], true).unwrap();
        assert_eq!(
            names(dir.path(), &files),
            vec![
                "node_modules/lib/Lib.stories.js",
                "src/Button.stories.tsx",
                "src/forms/Input.story.ts",
                "src/legacy.generated.stories.ts",
            ]
        );
    }

    #[test]
    fn exclude_patterns_prune_directories_and_files() {
        let dir = project();
        let excludes = vec!["node_modules".to_string(), "*.generated.*".to_string()];
        let files = collect_story_files(&[dir.path().to_path_buf()], &excludes, true).unwrap();
        assert_eq!(
            names(dir.path(), &files),
            vec!["src/Button.stories.tsx", "src/forms/Input.story.ts"]
        );
    }

    #[test]
    fn hidden_and_underscore_entries_can_be_included() {
        let dir = project();
        let files = collect_story_files(&[dir.path().join("src")], &[], false).unwrap();
        assert!(
            names(dir.path(), &files).contains(&"src/_drafts/Draft.stories.ts".to_string())
        );
        let files = collect_story_files(&[dir.path().to_path_buf()], &[], false).unwrap();
        assert!(
            names(dir.path(), &files).contains(&".storybook/Preview.stories.ts".to_string())
        );
    }

    #[test]
    fn accepts_explicit_files() {
        let dir = project();
        let story = dir.path().join("src/Button.stories.tsx");
        let component = dir.path().join("src/Button.tsx");
        let files = collect_story_files(&[story.clone(), component], &[], true).unwrap();
        assert_eq!(files, vec![story]);
    }

    #[test]
    fn rejects_invalid_exclude_pattern() {
        let err = collect_story_files(&[PathBuf::from(".")], &["abc[def".to_string()], true)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid exclude pattern"));
    }

    #[test]
    fn collects_story_files_from_fixture() {
        let fixture_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/stories");
        let files = collect_story_files(&[fixture_dir.clone()], &[], true).unwrap();
        assert_eq!(
            names(&fixture_dir, &files),
            vec!["Button.stories.tsx", "Header.stories.ts"]
        );
    }
}
