//! Rewriting of the story file's meta (default export).
//!
//! Two shapes are rewritten:
//!
//! - `const meta = { ... }; export default meta;` gets a `title` property
//!   injected into the `meta` literal.
//! - `export default { ... };` gets the title and is split into
//!   `const __STORYBOOK_META__ = { ... };\nexport default __STORYBOOK_META__;`.
//!
//! Literals that already carry a `title` are left alone, so running the
//! rewrite twice never duplicates the property. Any other shape is passed
//! through untouched.

use crate::error::TransformError;
use crate::index::DeclarationIndex;
use crate::overlay::EditOverlay;
use crate::syntax::{self, SourceUnit, Statement};
use crate::transform::Diagnostics;
use serde::Serialize;
use tree_sitter::Node;

/// Binding the inline meta object is moved into.
pub const META_BINDING: &str = "__STORYBOOK_META__";

/// The module's default export, classified by shape.
#[derive(Debug, Clone, Copy)]
pub enum MetadataExport<'a, 't> {
    /// `export default meta` or `export { meta as default }`.
    Aliased { name: &'a str },
    /// `export default { ... }`, possibly wrapped in `satisfies`/`as`.
    Inline {
        statement: Node<'t>,
        value: Node<'t>,
        object: Node<'t>,
    },
    /// Anything else, e.g. `export default createMeta()`.
    Unrecognized,
}

/// Which rewrite was applied to the meta export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetaShape {
    Aliased,
    Inline,
    Unrecognized,
}

/// Outcome of the meta rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRewrite {
    /// Name the meta object is bound to after the rewrite.
    pub binding: String,
    pub shape: MetaShape,
    /// False when the literal already had a title or could not be found.
    pub title_injected: bool,
}

/// Finds the module's default export.
///
/// Fails with [`TransformError::MissingMetadataExport`] if there is none. When
/// several are present the first one wins and a warning is recorded.
pub fn find_metadata_export<'a, 't>(
    unit: &'t SourceUnit<'a>,
    diagnostics: &mut Diagnostics,
) -> Result<MetadataExport<'a, 't>, TransformError> {
    let mut found = Vec::new();
    for node in unit.statements() {
        match Statement::classify(node) {
            Statement::DefaultExport { statement, value } => {
                found.push(classify_value(unit, statement, value));
            }
            Statement::ExportClause { clause, .. } => {
                found.extend(
                    syntax::export_specifiers(unit, clause)
                        .into_iter()
                        .filter(|spec| spec.exported == "default")
                        .map(|spec| MetadataExport::Aliased { name: spec.local }),
                );
            }
            _ => {}
        }
    }

    if found.len() > 1 {
        diagnostics.warn(format!(
            "{} has {} default exports; only the first is treated as meta",
            unit.id(),
            found.len()
        ));
    }

    found
        .into_iter()
        .next()
        .ok_or_else(|| TransformError::MissingMetadataExport {
            id: unit.id().to_string(),
        })
}

fn classify_value<'a, 't>(
    unit: &'t SourceUnit<'a>,
    statement: Node<'t>,
    value: Node<'t>,
) -> MetadataExport<'a, 't> {
    if syntax::is_identifier(value) {
        return MetadataExport::Aliased {
            name: unit.text_of(value),
        };
    }
    match syntax::object_literal(value) {
        Some(object) => MetadataExport::Inline {
            statement,
            value,
            object,
        },
        None => MetadataExport::Unrecognized,
    }
}

/// Injects `title` into the meta object and normalizes inline meta exports.
///
/// `title` must already be resolved; it is embedded as a single-quoted string.
pub fn rewrite_meta(
    unit: &SourceUnit<'_>,
    index: &DeclarationIndex<'_, '_>,
    overlay: &mut EditOverlay<'_>,
    title: &str,
    diagnostics: &mut Diagnostics,
) -> Result<MetaRewrite, TransformError> {
    let rewrite = match find_metadata_export(unit, diagnostics)? {
        MetadataExport::Aliased { name } => {
            let object = index
                .get(name)
                .and_then(|declarator| declarator.child_by_field_name("value"))
                .and_then(syntax::object_literal);
            let title_injected = match object {
                Some(object) => inject_title(unit, overlay, object, title),
                None => {
                    diagnostics.warn(format!(
                        "default export `{}` in {} does not refer to a top-level object literal; title not injected",
                        name,
                        unit.id()
                    ));
                    false
                }
            };
            MetaRewrite {
                binding: name.to_string(),
                shape: MetaShape::Aliased,
                title_injected,
            }
        }
        MetadataExport::Inline {
            statement,
            value,
            object,
        } => {
            let title_injected = inject_title(unit, overlay, object, title);
            // Only the `export default` head and the tail after the value are
            // replaced; the literal itself stays mapped to the original.
            overlay.overwrite(
                statement.start_byte(),
                value.start_byte(),
                format!("const {} = ", META_BINDING),
            );
            overlay.overwrite(
                value.end_byte(),
                statement.end_byte(),
                format!(";\nexport default {};", META_BINDING),
            );
            MetaRewrite {
                binding: META_BINDING.to_string(),
                shape: MetaShape::Inline,
                title_injected,
            }
        }
        MetadataExport::Unrecognized => MetaRewrite {
            binding: META_BINDING.to_string(),
            shape: MetaShape::Unrecognized,
            title_injected: false,
        },
    };
    Ok(rewrite)
}

fn inject_title(unit: &SourceUnit<'_>, overlay: &mut EditOverlay<'_>, object: Node<'_>, title: &str) -> bool {
    if syntax::has_title_field(unit, object) {
        return false;
    }
    overlay.insert(object.start_byte() + 1, title_property(title));
    true
}

/// The property inserted right after the opening brace of the meta literal.
pub fn title_property(title: &str) -> String {
    format!(" title: {},", syntax::single_quoted(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> Result<(String, MetaRewrite, Diagnostics), TransformError> {
        let unit = SourceUnit::parse("src/Button.stories.tsx", source)?;
        let index = DeclarationIndex::build(&unit);
        let mut overlay = EditOverlay::new(source);
        let mut diagnostics = Diagnostics::default();
        let result = rewrite_meta(&unit, &index, &mut overlay, "Example/Button", &mut diagnostics)?;
        Ok((overlay.render(), result, diagnostics))
    }

    #[test]
    fn injects_title_into_aliased_meta() {
        let source = "const meta = { component: Button };\nexport default meta;\n";
        let (output, result, _) = rewrite(source).unwrap();
        assert_eq!(
            output,
            "const meta = { title: 'Example/Button', component: Button };\nexport default meta;\n"
        );
        assert_eq!(result.binding, "meta");
        assert_eq!(result.shape, MetaShape::Aliased);
        assert!(result.title_injected);
    }

    #[test]
    fn aliased_meta_with_title_is_untouched() {
        let source = "const meta = {\n  title: 'Custom',\n  component: Button,\n};\nexport default meta;";
        let (output, result, _) = rewrite(source).unwrap();
        assert_eq!(output, source);
        assert!(!result.title_injected);
    }

    #[test]
    fn typed_and_satisfies_meta_get_title() {
        let source = "const meta: Meta<typeof Button> = {\n  component: Button,\n};\nexport default meta;";
        let (output, _, _) = rewrite(source).unwrap();
        assert!(output.starts_with("const meta: Meta<typeof Button> = { title: 'Example/Button',\n  component"));

        let source = "const meta = { component: Button } satisfies Meta<typeof Button>;\nexport default meta;";
        let (output, _, _) = rewrite(source).unwrap();
        assert!(output.starts_with("const meta = { title: 'Example/Button', component: Button } satisfies"));
    }

    #[test]
    fn normalizes_inline_meta() {
        let source = "import { X } from './X';\nexport default { component: X };\n";
        let (output, result, _) = rewrite(source).unwrap();
        assert_eq!(
            output,
            "import { X } from './X';\n\
             const __STORYBOOK_META__ = { title: 'Example/Button', component: X };\n\
             export default __STORYBOOK_META__;\n"
        );
        assert!(!output.contains("export default {"));
        assert_eq!(result.binding, META_BINDING);
        assert_eq!(result.shape, MetaShape::Inline);
    }

    #[test]
    fn normalizes_inline_meta_without_semicolon() {
        let source = "export default { title: 'Kept' }";
        let (output, result, _) = rewrite(source).unwrap();
        assert_eq!(
            output,
            "const __STORYBOOK_META__ = { title: 'Kept' };\nexport default __STORYBOOK_META__;"
        );
        assert!(!result.title_injected);
    }

    #[test]
    fn supports_export_as_default_clause() {
        let source = "const meta = { component: X };\nexport { meta as default };";
        let (output, result, _) = rewrite(source).unwrap();
        assert!(output.contains("{ title: 'Example/Button', component: X }"));
        assert_eq!(result.binding, "meta");
    }

    #[test]
    fn unrecognized_shape_passes_through() {
        let source = "export default createMeta({ component: X });";
        let (output, result, diagnostics) = rewrite(source).unwrap();
        assert_eq!(output, source);
        assert_eq!(result.shape, MetaShape::Unrecognized);
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn unresolved_alias_is_a_warning() {
        let source = "import meta from './meta';\nexport default meta;";
        let (output, result, diagnostics) = rewrite(source).unwrap();
        assert_eq!(output, source);
        assert!(!result.title_injected);
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].contains("`meta`"));
    }

    #[test]
    fn first_of_several_default_exports_wins() {
        let source = "const a = {};\nconst b = {};\nexport default a;\nexport { b as default };";
        let (output, result, diagnostics) = rewrite(source).unwrap();
        assert_eq!(result.binding, "a");
        assert!(output.starts_with("const a = { title: 'Example/Button',};\nconst b = {};"));
        assert_eq!(diagnostics.warnings.len(), 1);
    }

    #[test]
    fn missing_default_export_fails() {
        let err = rewrite("export const A = {};").unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingMetadataExport { ref id } if id == "src/Button.stories.tsx"
        ));
        assert!(err.to_string().contains("default export"));
    }

    #[test]
    fn escapes_quotes_in_title() {
        assert_eq!(title_property("It's"), r" title: 'It\'s',");
    }
}
