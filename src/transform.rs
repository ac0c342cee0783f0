//! The story file transform.
//!
//! Runs the whole pipeline for one file: eligibility check, parse, meta
//! rewrite, story registration, import injection and emission of code plus
//! source map. Each call owns all of its state, so files can be transformed
//! concurrently without coordination.

use crate::config::TransformOptions;
use crate::error::TransformError;
use crate::index::DeclarationIndex;
use crate::meta::{self, MetaShape};
use crate::overlay::{Chunk, EditOverlay};
use crate::scenario;
use crate::sourcemap::{self, SourceMap};
use crate::syntax::SourceUnit;
use crate::title::TitleResolver;
use serde::Serialize;

/// Markers that identify a story file by name.
pub const STORY_FILE_MARKERS: [&str; 2] = [".story.", ".stories."];

/// Imports appended to every transformed story file.
pub const TEST_IMPORTS: [&str; 3] = [
    "import { test as __test } from 'vitest';",
    "import { composeStories as __composeStories } from 'storybook/internal/preview-api';",
    "import { testStory as __testStory } from '@storybook/experimental-addon-vitest/internal/test-utils';",
];

/// True when `id` follows the story file naming convention.
pub fn is_story_file(id: &str) -> bool {
    STORY_FILE_MARKERS.iter().any(|marker| id.contains(marker))
}

/// Non-fatal findings collected while transforming a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    /// Export clause names that did not resolve to a top-level declaration.
    pub skipped_exports: Vec<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.skipped_exports.is_empty()
    }
}

/// A rewritten story file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedStory {
    pub code: String,
    pub map: SourceMap,
    pub title: String,
    /// Binding the meta object is reachable under.
    pub meta_binding: String,
    pub meta_shape: MetaShape,
    /// Registered story export names, in source order.
    pub scenarios: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Result of [`transform`].
#[derive(Debug, Clone)]
pub enum TransformOutput<'a> {
    /// Not a story file; the input is returned as is.
    Passthrough(&'a str),
    Transformed(TransformedStory),
}

impl TransformOutput<'_> {
    pub fn code(&self) -> &str {
        match self {
            TransformOutput::Passthrough(code) => code,
            TransformOutput::Transformed(story) => &story.code,
        }
    }

    pub fn map(&self) -> Option<&SourceMap> {
        match self {
            TransformOutput::Passthrough(_) => None,
            TransformOutput::Transformed(story) => Some(&story.map),
        }
    }

    pub fn transformed(&self) -> Option<&TransformedStory> {
        match self {
            TransformOutput::Passthrough(_) => None,
            TransformOutput::Transformed(story) => Some(story),
        }
    }
}

/// Transforms the story file `id` with contents `code`.
///
/// Files that are not story files are passed through without being parsed.
/// Story files without a default export fail with
/// [`TransformError::MissingMetadataExport`]; every other anomaly is
/// recovered from and reported in [`TransformedStory::diagnostics`].
pub fn transform<'a>(
    id: &'a str,
    code: &'a str,
    options: &TransformOptions,
    titles: &dyn TitleResolver,
) -> Result<TransformOutput<'a>, TransformError> {
    if !is_story_file(id) {
        return Ok(TransformOutput::Passthrough(code));
    }

    let unit = SourceUnit::parse(id, code)?;
    let mut diagnostics = Diagnostics::default();
    if unit.has_errors() {
        diagnostics.warn(format!(
            "{} has syntax errors; only recognizable exports are rewritten",
            id
        ));
    }

    let tags_json = options.tags.to_json()?;
    let title = titles.title(id, &options.config_dir);

    let index = DeclarationIndex::build(&unit);
    let mut overlay = EditOverlay::new(code);
    let meta = meta::rewrite_meta(&unit, &index, &mut overlay, &title, &mut diagnostics)?;
    let scenarios =
        scenario::rewrite_scenarios(&unit, &index, &mut overlay, &tags_json, &mut diagnostics);
    overlay.append(format!("\n{}", TEST_IMPORTS.join("\n")));

    let chunks = overlay.materialize();
    let output: String = chunks.iter().map(Chunk::text).collect();
    let map = sourcemap::generate(&chunks, code, id);

    Ok(TransformOutput::Transformed(TransformedStory {
        code: output,
        map,
        title,
        meta_binding: meta.binding,
        meta_shape: meta.shape,
        scenarios,
        diagnostics,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcemap::decode_mappings;
    use std::path::{Path, PathBuf};

    fn fixed_title(_: &str, _: &Path) -> String {
        "Example/Button".to_string()
    }

    fn run(id: &str, code: &str) -> TransformedStory {
        match transform(id, code, &TransformOptions::default(), &fixed_title).unwrap() {
            TransformOutput::Transformed(story) => story,
            TransformOutput::Passthrough(_) => panic!("{} was passed through", id),
        }
    }

    #[test]
    fn recognizes_story_file_names() {
        assert!(is_story_file("src/Button.stories.tsx"));
        assert!(is_story_file("src/Button.story.ts"));
        assert!(!is_story_file("src/Button.tsx"));
        assert!(!is_story_file("src/Button.Stories.tsx"));
        assert!(!is_story_file("src/stories/Button.tsx"));
    }

    #[test]
    fn passes_through_ordinary_modules() {
        let code = "export default {}; this is not even valid {";
        let output = transform("src/Button.tsx", code, &TransformOptions::default(), &fixed_title).unwrap();
        assert!(matches!(output, TransformOutput::Passthrough(text) if std::ptr::eq(text, code)));
        assert_eq!(output.code(), code);
        assert!(output.map().is_none());
    }

    #[test]
    fn transforms_aliased_meta_story_file() {
        let code = "\
import { Button } from './Button';

const meta = { component: Button };
export default meta;

export const Primary = {
  args: { primary: true },
};
";
        let story = run("src/Button.stories.tsx", code);
        insta::assert_snapshot!(story.code, @r#"
        import { Button } from './Button';

        const meta = { title: 'Example/Button', component: Button };
        export default meta;

        __test('Primary', __testStory('Primary', import.meta.url, __composeStories, {"include":["test"],"exclude":[],"skip":[]}));
        export const Primary = {
          args: { primary: true },
        };

        import { test as __test } from 'vitest';
        import { composeStories as __composeStories } from 'storybook/internal/preview-api';
        import { testStory as __testStory } from '@storybook/experimental-addon-vitest/internal/test-utils';
        "#);
        assert_eq!(story.meta_binding, "meta");
        assert_eq!(story.scenarios, vec!["Primary"]);
        assert!(story.diagnostics.is_empty());
    }

    #[test]
    fn transforms_inline_meta_with_reexports() {
        let code = "export default { component: X };\nconst Primary = {};\nexport { Primary };";
        let story = run("Button.stories.ts", code);
        let registration = scenario::registration_statement(
            "Primary",
            r#"{"include":["test"],"exclude":[],"skip":[]}"#,
        );
        assert_eq!(
            story.code,
            format!(
                "const __STORYBOOK_META__ = {{ title: 'Example/Button', component: X }};\n\
                 export default __STORYBOOK_META__;\n\
                 {}\nconst Primary = {{}};\nexport {{ Primary }};\n{}",
                registration,
                TEST_IMPORTS.join("\n")
            )
        );
        assert_eq!(story.meta_binding, meta::META_BINDING);
        assert_eq!(story.meta_shape, MetaShape::Inline);
    }

    #[test]
    fn missing_meta_aborts_without_output() {
        let err = transform(
            "src/Button.stories.ts",
            "export const A = {};",
            &TransformOptions::default(),
            &fixed_title,
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::MissingMetadataExport { .. }));
    }

    #[test]
    fn title_injection_is_idempotent() {
        let code = "const meta = { title: 'Mine', component: X };\nexport default meta;\nexport const A = {};";
        let story = run("Button.stories.ts", code);
        assert_eq!(story.code.matches("title:").count(), 1);
        assert!(story.code.contains("title: 'Mine'"));
    }

    #[test]
    fn uses_configured_tags() {
        let options = TransformOptions {
            tags: crate::config::TagFilter {
                include: vec!["smoke".to_string()],
                exclude: vec!["wip".to_string()],
                skip: vec![],
            },
            config_dir: PathBuf::from(".storybook"),
        };
        let code = "export default {};\nexport const A = {};";
        let output = transform("A.stories.ts", code, &options, &fixed_title).unwrap();
        assert!(output.code().contains(
            r#"__test('A', __testStory('A', import.meta.url, __composeStories, {"include":["smoke"],"exclude":["wip"],"skip":[]}));"#
        ));
    }

    #[test]
    fn title_resolver_receives_id_and_config_dir() {
        let options = TransformOptions {
            config_dir: PathBuf::from("/repo/.storybook"),
            ..TransformOptions::default()
        };
        let resolver = |id: &str, dir: &Path| format!("{}|{}", id, dir.display());
        let output = transform(
            "/repo/src/A.stories.ts",
            "export default {};",
            &options,
            &resolver,
        )
        .unwrap();
        let story = output.transformed().unwrap();
        assert_eq!(story.title, "/repo/src/A.stories.ts|/repo/.storybook");
    }

    #[test]
    fn source_map_points_untouched_tokens_home() {
        let code = "const meta = {};\nexport default meta;\nexport const Primary = {};\n";
        let story = run("Button.stories.ts", code);
        assert_eq!(story.map.version, 3);
        assert_eq!(story.map.sources, vec!["Button.stories.ts"]);

        let decoded = decode_mappings(&story.map.mappings);
        assert_eq!(decoded[0][0], (0, 0, 0));
        assert!(decoded[1].iter().all(|&(_, line, _)| line == 1));
        // Generated line 2 is the registration, which has no origin.
        assert!(decoded[2].is_empty());
        assert_eq!(decoded[3][0], (0, 2, 0));
        // `Primary` keeps column 13 of its original line.
        assert!(decoded[3].contains(&(13, 2, 13)));
    }

    #[test]
    fn transforms_fixture_with_satisfies_meta_and_aliases() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/stories/Button.stories.tsx");
        let code = std::fs::read_to_string(&fixture).unwrap();
        let story = run("Button.stories.tsx", &code);

        assert_eq!(story.scenarios, vec!["Primary", "Secondary", "Large", "Huge"]);
        assert!(story.code.contains("const meta = { title: 'Example/Button',\n  component: Button,"));
        assert!(story.code.contains(
            "__test('Huge', __testStory('Huge', import.meta.url, __composeStories, {\"include\":[\"test\"],\"exclude\":[],\"skip\":[]}));\nconst Large: Story = {"
        ));
        assert!(story.code.contains("\nexport { Large, Large as Huge };\n"));
        assert!(story.diagnostics.is_empty());
    }

    #[test]
    fn transforms_fixture_with_inline_meta() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/stories/Header.stories.ts");
        let code = std::fs::read_to_string(&fixture).unwrap();
        let story = run("Header.stories.ts", &code);

        assert!(story.code.starts_with(
            "import { Header } from './Header';\n\n\
             const __STORYBOOK_META__ = { title: 'Example/Button',\n  component: Header,\n"
        ));
        assert!(story.code.contains("};\nexport default __STORYBOOK_META__;\n"));
        assert_eq!(story.scenarios, vec!["LoggedIn", "LoggedOut"]);
        assert!(story.code.ends_with(TEST_IMPORTS[2]));
    }

    #[test]
    fn recovers_from_syntax_errors() {
        let code = "const meta = {};\nexport default meta;\nexport const Primary = {\n  args: {,\n};\n";
        let story = run("Button.stories.ts", code);
        assert!(!story.diagnostics.warnings.is_empty());
        assert!(story.code.contains("title: 'Example/Button'"));
    }
}
