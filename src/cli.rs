//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Each subcommand corresponds to a distinct operation: transforming a single
//! story file, building every story file under a tree, listing scan targets,
//! or previewing resolved titles.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use story_transform::StoriesSpecifier;
use story_transform::config::StoriesEntry;
use story_transform::title::NormalizedEntry;

/// Rewrite Storybook story files into runnable test modules.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand that resolves titles or tags.
///
/// Flags override the corresponding fields of the plugin config file.
#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Plugin config file (JSON with `configDir`, `tags` and `stories`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storybook configuration directory that stories entries are relative to.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Tags a story needs to be collected. Replaces the configured list.
    #[arg(long = "include-tag")]
    pub include_tags: Vec<String>,

    /// Tags that exclude a story. Replaces the configured list.
    #[arg(long = "exclude-tag")]
    pub exclude_tags: Vec<String>,

    /// Tags that mark a story as skipped. Replaces the configured list.
    #[arg(long = "skip-tag")]
    pub skip_tags: Vec<String>,

    /// Stories entries in `[prefix=]specifier` format, e.g. `../src/**/*.stories.tsx`
    /// or `Design System=../src/components`. Replaces the configured entries.
    #[arg(long, value_parser = parse_stories)]
    pub stories: Vec<StoriesSpecifier>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transform one story file and print the result.
    Transform {
        /// Story file to transform.
        file: PathBuf,

        /// Module id to transform under. Defaults to the file path.
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Emit JSON (code, map, meta binding, stories and warnings) instead of code.
        #[arg(long)]
        json: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Transform every story file under the given paths.
    Build {
        /// Paths to scan. Defaults to current directory.
        #[arg(short, long)]
        paths: Option<Vec<PathBuf>>,

        /// Glob patterns for directories/files to exclude (e.g., "node_modules", "*.generated.*").
        /// By default, entries starting with `.` or `_` are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable default exclusion of `.` and `_` prefixed entries.
        #[arg(long)]
        no_default_excludes: bool,

        #[command(flatten)]
        config: ConfigArgs,

        /// Directory that transformed files and their source maps are written to.
        #[arg(short, long, default_value = "story-tests")]
        out_dir: PathBuf,

        /// Actually write files (default is dry-run).
        #[arg(long)]
        write: bool,

        /// Interactively confirm each file before writing it.
        #[arg(short, long)]
        interactive: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// List story files that would be transformed without processing them.
    Scan {
        /// Paths to scan. Defaults to current directory.
        #[arg(short, long)]
        paths: Option<Vec<PathBuf>>,

        /// Glob patterns for directories/files to exclude (e.g., "node_modules", "*.generated.*").
        /// By default, entries starting with `.` or `_` are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable default exclusion of `.` and `_` prefixed entries.
        #[arg(long)]
        no_default_excludes: bool,
    },

    /// Print the title each story file resolves to.
    Title {
        /// Story files to resolve.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn parse_stories(s: &str) -> Result<StoriesSpecifier, String> {
    let Some((prefix, specifier)) = s.split_once('=') else {
        return Ok(StoriesSpecifier::Glob(s.to_string()));
    };
    if specifier.is_empty() {
        return Err(format!(
            "Invalid stories entry '{}', expected '[prefix=]specifier'",
            s
        ));
    }
    let entry = NormalizedEntry::from_specifier(&StoriesSpecifier::Glob(specifier.to_string()));
    Ok(StoriesSpecifier::Entry(StoriesEntry {
        directory: entry.directory,
        files: Some(entry.files),
        title_prefix: Some(prefix.to_string()),
    }))
}
