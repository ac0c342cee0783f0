//! story-transform: Rewrite Storybook story files into runnable test modules.
//!
//! Each story file gets its meta title injected, inline meta exports
//! normalized, and one test registration per exported story, along with a
//! source map back to the original file.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands, ConfigArgs};
use colored::Colorize;
use dialoguer::Confirm;
use serde::Serialize;
use std::path::{Path, PathBuf};
use story_transform::{
    Diagnostics, PluginConfig, SourceMap, StoriesTitleResolver, TitleResolver,
    TransformOptions, TransformOutput, emit, scanner, transform,
};

/// Machine-readable result of `transform --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransformReport<'a> {
    code: &'a str,
    map: Option<&'a SourceMap>,
    title: Option<&'a str>,
    meta_binding: Option<&'a str>,
    scenarios: &'a [String],
    warnings: &'a [String],
    skipped_exports: &'a [String],
}

/// Counts from a build run.
#[derive(Debug, Default)]
struct BuildSummary {
    files_scanned: usize,
    transformed: usize,
    written: usize,
    failed: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Transform {
            file,
            id,
            config,
            json,
            verbose,
        } => cmd_transform(&file, id, &config, json, verbose),
        Commands::Build {
            paths,
            exclude,
            no_default_excludes,
            config,
            out_dir,
            write,
            interactive,
            verbose,
        } => cmd_build(
            paths,
            &exclude,
            !no_default_excludes,
            &config,
            &out_dir,
            write,
            interactive,
            verbose,
        ),
        Commands::Scan {
            paths,
            exclude,
            no_default_excludes,
        } => cmd_scan(paths, &exclude, !no_default_excludes),
        Commands::Title { files, config } => cmd_title(&files, &config),
    }
}

/// Merges the plugin config file with command-line overrides.
fn load_settings(args: &ConfigArgs) -> Result<(TransformOptions, StoriesTitleResolver)> {
    let mut config = match &args.config {
        Some(path) => PluginConfig::load(path)?,
        None => PluginConfig::default(),
    };
    if args.config_dir.is_some() {
        config.config_dir = args.config_dir.clone();
    }
    if !args.stories.is_empty() {
        config.stories = args.stories.clone();
    }

    let mut options = config.transform_options();
    if !args.include_tags.is_empty() {
        options.tags.include = args.include_tags.clone();
    }
    if !args.exclude_tags.is_empty() {
        options.tags.exclude = args.exclude_tags.clone();
    }
    if !args.skip_tags.is_empty() {
        options.tags.skip = args.skip_tags.clone();
    }

    Ok((options, StoriesTitleResolver::new(&config.stories)))
}

fn cmd_transform(
    file: &Path,
    id: Option<String>,
    config: &ConfigArgs,
    json_output: bool,
    verbose: bool,
) -> Result<()> {
    let (options, titles) = load_settings(config)?;
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let id = id.unwrap_or_else(|| file.to_string_lossy().into_owned());

    let output = transform(&id, &code, &options, &titles)
        .with_context(|| format!("Failed to transform {}", id))?;

    match &output {
        TransformOutput::Passthrough(_) => {
            if verbose {
                eprintln!(
                    "{} {} is not a story file, passing through",
                    "info:".blue().bold(),
                    id
                );
            }
        }
        TransformOutput::Transformed(story) => {
            print_diagnostics(&id, &story.diagnostics, verbose);
            if verbose {
                eprintln!(
                    "{} title '{}', meta bound to `{}`, {} story export(s)",
                    "info:".blue().bold(),
                    story.title,
                    story.meta_binding,
                    story.scenarios.len()
                );
            }
        }
    }

    if json_output {
        let story = output.transformed();
        let report = TransformReport {
            code: output.code(),
            map: output.map(),
            title: story.map(|story| story.title.as_str()),
            meta_binding: story.map(|story| story.meta_binding.as_str()),
            scenarios: story
                .map(|story| story.scenarios.as_slice())
                .unwrap_or_default(),
            warnings: story
                .map(|story| story.diagnostics.warnings.as_slice())
                .unwrap_or_default(),
            skipped_exports: story
                .map(|story| story.diagnostics.skipped_exports.as_slice())
                .unwrap_or_default(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output.code());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_build(
    paths: Option<Vec<PathBuf>>,
    excludes: &[String],
    default_excludes: bool,
    config: &ConfigArgs,
    out_dir: &Path,
    write: bool,
    interactive: bool,
    verbose: bool,
) -> Result<()> {
    let scan_paths = paths.unwrap_or_else(|| vec![PathBuf::from(".")]);
    let (options, titles) = load_settings(config)?;
    let mut summary = BuildSummary::default();

    for root in &scan_paths {
        let files =
            scanner::collect_story_files(std::slice::from_ref(root), excludes, default_excludes)?;
        if verbose {
            eprintln!(
                "{} Found {} story files under {}",
                "info:".blue().bold(),
                files.len(),
                root.display()
            );
        }
        summary.files_scanned += files.len();

        for file in files {
            let target = emit::output_path(&file, root, out_dir);
            match build_file(&file, &target, &options, &titles, write, interactive, verbose) {
                Ok(written) => {
                    summary.transformed += 1;
                    if written {
                        summary.written += 1;
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    eprintln!("{} {:#}", "error:".red().bold(), err);
                }
            }
        }
    }

    if verbose {
        println!(
            "\n{} Files: {}, transformed: {}, written: {}, failed: {}",
            "Diagnostics:".bold(),
            summary.files_scanned,
            summary.transformed,
            summary.written,
            summary.failed
        );
    }

    if summary.files_scanned == 0 {
        println!("{} No story files found", "info:".blue().bold());
    } else if !write {
        println!("\n{} Use --write to write files", "hint:".cyan().bold());
    } else if summary.failed == 0 {
        println!(
            "{} Wrote {} file(s) to {}",
            "ok:".green().bold(),
            summary.written,
            out_dir.display()
        );
    }

    if summary.failed > 0 {
        anyhow::bail!("{} story file(s) failed to transform", summary.failed);
    }
    Ok(())
}

/// Transforms one file and writes it when asked to; returns whether it was written.
fn build_file(
    file: &Path,
    target: &Path,
    options: &TransformOptions,
    titles: &StoriesTitleResolver,
    write: bool,
    interactive: bool,
    verbose: bool,
) -> Result<bool> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let id = file.to_string_lossy();

    let output = transform(&id, &code, options, titles)
        .with_context(|| format!("Failed to transform {}", file.display()))?;
    let TransformOutput::Transformed(story) = output else {
        return Ok(false);
    };
    print_diagnostics(&id, &story.diagnostics, verbose);

    println!(
        "{} {} {} {}",
        if write { "Writing:" } else { "Would write:" }.yellow().bold(),
        file.display(),
        "->".dimmed(),
        target.display()
    );
    if verbose {
        for scenario in &story.scenarios {
            println!("  {} {}", "+".green(), scenario);
        }
    }

    if !write {
        return Ok(false);
    }
    if interactive
        && !Confirm::new()
            .with_prompt(format!("Write {}?", target.display()))
            .default(true)
            .interact()?
    {
        return Ok(false);
    }

    emit::write_story(&story, target)?;
    Ok(true)
}

fn cmd_scan(paths: Option<Vec<PathBuf>>, excludes: &[String], default_excludes: bool) -> Result<()> {
    let scan_paths = paths.unwrap_or_else(|| vec![PathBuf::from(".")]);
    let files = scanner::collect_story_files(&scan_paths, excludes, default_excludes)?;

    println!("Would transform {} files:", files.len());
    for file in files {
        println!("  {}", file.display());
    }

    Ok(())
}

fn cmd_title(files: &[PathBuf], config: &ConfigArgs) -> Result<()> {
    let (options, titles) = load_settings(config)?;
    for file in files {
        let title = titles.title(&file.to_string_lossy(), &options.config_dir);
        println!("{} {}", file.display().to_string().dimmed(), title);
    }
    Ok(())
}

fn print_diagnostics(id: &str, diagnostics: &Diagnostics, verbose: bool) {
    for warning in &diagnostics.warnings {
        eprintln!("{} {}", "warn:".yellow().bold(), warning);
    }
    if verbose && !diagnostics.skipped_exports.is_empty() {
        eprintln!(
            "{} {}: re-exported names without a top-level declaration: {}",
            "info:".blue().bold(),
            id,
            diagnostics.skipped_exports.join(", ")
        );
    }
}
