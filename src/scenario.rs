//! Test registration for story exports.
//!
//! Every named story export gets a registration statement placed on its own
//! line right before the statement that declares it:
//!
//! ```text
//! __test('Primary', __testStory('Primary', import.meta.url, __composeStories, {...}));
//! export const Primary: Story = {
//! ```
//!
//! Stories are found in two shapes: `export const Primary = ...` and
//! `const Primary = ...; export { Primary };`. In the second shape the
//! registration goes before the `const`, not before the export clause.

use crate::index::DeclarationIndex;
use crate::overlay::EditOverlay;
use crate::syntax::{self, SourceUnit, Statement};
use crate::transform::Diagnostics;
use tree_sitter::Node;

/// Builds the statement that registers one story with the test runner.
///
/// Downstream tooling pattern-matches this exact shape.
pub fn registration_statement(name: &str, tags_json: &str) -> String {
    let name = syntax::single_quoted(name);
    format!(
        "__test({}, __testStory({}, import.meta.url, __composeStories, {}));",
        name, name, tags_json
    )
}

/// Schedules a registration statement for every story export of the module.
///
/// Returns the registered export names in source encounter order. Export
/// clause entries that do not resolve to a top-level declaration are skipped
/// and listed in `diagnostics.skipped_exports`.
pub fn rewrite_scenarios(
    unit: &SourceUnit<'_>,
    index: &DeclarationIndex<'_, '_>,
    overlay: &mut EditOverlay<'_>,
    tags_json: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut registered: Vec<String> = Vec::new();

    syntax::walk(unit.root(), |node| {
        if !syntax::is_top_level(node) {
            return;
        }
        match Statement::classify(node) {
            Statement::ExportClause { clause, .. } => {
                for spec in syntax::export_specifiers(unit, clause) {
                    if spec.exported == "default" {
                        continue;
                    }
                    match index.get(spec.local) {
                        Some(declarator) => register(
                            unit,
                            overlay,
                            &mut registered,
                            spec.exported,
                            declarator,
                            tags_json,
                        ),
                        None => diagnostics.skipped_exports.push(spec.exported.to_string()),
                    }
                }
            }
            Statement::ExportedVariables { declaration, .. } => {
                for declarator in syntax::declarators(declaration) {
                    if let Some(name) = syntax::binding_name(unit, declarator) {
                        register(unit, overlay, &mut registered, name, declarator, tags_json);
                    }
                }
            }
            _ => {}
        }
    });

    registered
}

/// Prefixes the first line of the declarator's statement with a
/// registration. The line itself is reproduced verbatim after it.
fn register(
    unit: &SourceUnit<'_>,
    overlay: &mut EditOverlay<'_>,
    registered: &mut Vec<String>,
    name: &str,
    declarator: Node<'_>,
    tags_json: &str,
) {
    if registered.iter().any(|existing| existing == name) {
        return;
    }
    let Some(statement) = syntax::enclosing_statement(declarator) else {
        return;
    };

    let text = unit.text();
    let start = statement.start_byte();
    let end = text[start..]
        .find('\n')
        .map_or(text.len(), |offset| start + offset);
    let declaration_line = &text[start..end];

    overlay.overwrite(
        start,
        end,
        format!(
            "{}\n{}",
            registration_statement(name, tags_json),
            declaration_line
        ),
    );
    registered.push(name.to_string());
}
