//! Writing transformed story files to disk.
//!
//! Each output mirrors its source path relative to the scan root under an
//! output directory. The source map lands next to the code as `<file>.map`
//! and is linked from a trailing `sourceMappingURL` comment.

use crate::transform::TransformedStory;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Paths written for one story file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    pub code_path: PathBuf,
    pub map_path: PathBuf,
}

/// Output location of `file` found under `root`.
///
/// Falls back to the bare file name when `file` is not below `root` or is
/// the root itself.
pub fn output_path(file: &Path, root: &Path, out_dir: &Path) -> PathBuf {
    let relative = file
        .strip_prefix(root)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| file.file_name().map(PathBuf::from))
        .unwrap_or_else(|| file.to_path_buf());
    out_dir.join(relative)
}

/// `code_path` with `.map` appended to its file name.
pub fn map_path(code_path: &Path) -> PathBuf {
    let mut name = OsString::from(code_path.as_os_str());
    name.push(".map");
    PathBuf::from(name)
}

/// Appends the comment linking generated code to its map file.
pub fn with_source_map_comment(code: &str, map_name: &str) -> String {
    format!("{}\n//# sourceMappingURL={}\n", code, map_name)
}

/// Writes the code and source map of `story` to `code_path`.
pub fn write_story(story: &TransformedStory, code_path: &Path) -> Result<EmittedFile> {
    if let Some(parent) = code_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let map_path = map_path(code_path);
    let file_name = |path: &Path| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut map = story.map.clone();
    map.file = Some(file_name(code_path));
    std::fs::write(&map_path, map.to_json()?)
        .with_context(|| format!("Failed to write {}", map_path.display()))?;

    let code = with_source_map_comment(&story.code, &file_name(&map_path));
    std::fs::write(code_path, code)
        .with_context(|| format!("Failed to write {}", code_path.display()))?;

    Ok(EmittedFile {
        code_path: code_path.to_path_buf(),
        map_path,
    })
}
