//! Story module parsing and syntactic shape recognition.
//!
//! Wraps a tree-sitter TypeScript/TSX tree together with the text it was
//! parsed from. Only the shapes the rewriters care about are recognized:
//! default exports, export clauses, variable statements and object literals.
//!
//! tree-sitter parses `export const Primary: Story = { ... };` as:
//! ```text
//! export_statement
//!   lexical_declaration            (field: declaration)
//!     variable_declarator
//!       identifier                 (field: name)
//!       type_annotation            (field: type)
//!       object                     (field: value)
//! ```

use crate::error::TransformError;
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

/// A parsed story module. Immutable once constructed.
pub struct SourceUnit<'a> {
    id: &'a str,
    text: &'a str,
    tree: Tree,
}

impl<'a> SourceUnit<'a> {
    /// Parses `text` with the grammar matching the extension of `id`.
    pub fn parse(id: &'a str, text: &'a str) -> Result<Self, TransformError> {
        let mut parser = Parser::new();
        parser.set_language(&Dialect::for_id(id).language())?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| TransformError::Parse(id.to_string()))?;
        Ok(Self { id, text, tree })
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// True when tree-sitter had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.root().has_error()
    }

    /// Source text covered by `node`.
    pub fn text_of(&self, node: Node<'_>) -> &'a str {
        &self.text[node.byte_range()]
    }

    /// Top-level statements in source order, comments excluded.
    pub fn statements(&self) -> Vec<Node<'_>> {
        named_children(self.root())
            .into_iter()
            .filter(|node| node.kind() != "comment")
            .collect()
    }
}

/// Grammar flavour a story file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

impl Dialect {
    /// `.ts`-family files use plain TypeScript, everything else TSX.
    ///
    /// Bundler ids may carry a `?query` suffix, which is ignored.
    pub fn for_id(id: &str) -> Self {
        let path = id.split('?').next().unwrap_or(id);
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("ts" | "mts" | "cts") => Dialect::TypeScript,
            _ => Dialect::Tsx,
        }
    }

    pub fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Shape of a top-level statement, as far as the rewriters are concerned.
#[derive(Debug, Clone, Copy)]
pub enum Statement<'t> {
    /// `export default <value>`, where `value` is an expression or a
    /// default-exported declaration.
    DefaultExport { statement: Node<'t>, value: Node<'t> },
    /// `export { a, b as c }` without a `from` clause.
    ExportClause { statement: Node<'t>, clause: Node<'t> },
    /// `export const a = ...`, `export let`, `export var`.
    ExportedVariables {
        statement: Node<'t>,
        declaration: Node<'t>,
    },
    /// `const a = ...` without an export modifier.
    Variables { declaration: Node<'t> },
    Other,
}

impl<'t> Statement<'t> {
    pub fn classify(node: Node<'t>) -> Self {
        match node.kind() {
            "export_statement" => classify_export(node),
            "lexical_declaration" | "variable_declaration" => Statement::Variables { declaration: node },
            _ => Statement::Other,
        }
    }
}

fn classify_export(statement: Node<'_>) -> Statement<'_> {
    let is_default = children(statement)
        .iter()
        .any(|child| child.kind() == "default");
    if is_default {
        return match statement
            .child_by_field_name("value")
            .or_else(|| statement.child_by_field_name("declaration"))
        {
            Some(value) => Statement::DefaultExport { statement, value },
            None => Statement::Other,
        };
    }

    if let Some(declaration) = statement.child_by_field_name("declaration") {
        return if is_variable_declaration(declaration) {
            Statement::ExportedVariables {
                statement,
                declaration,
            }
        } else {
            Statement::Other
        };
    }

    let type_only = children(statement)
        .iter()
        .any(|child| child.kind() == "type");
    let reexport = statement.child_by_field_name("source").is_some();
    match named_children(statement)
        .into_iter()
        .find(|child| child.kind() == "export_clause")
    {
        Some(clause) if !type_only && !reexport => Statement::ExportClause { statement, clause },
        _ => Statement::Other,
    }
}

/// One `name` / `name as alias` element of an export clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSpecifier<'a> {
    /// Name of the local binding.
    pub local: &'a str,
    /// Name the binding is exported under.
    pub exported: &'a str,
}

/// Lists the specifiers of an `export_clause`, skipping `type` specifiers.
pub fn export_specifiers<'a>(unit: &SourceUnit<'a>, clause: Node<'_>) -> Vec<ExportSpecifier<'a>> {
    named_children(clause)
        .into_iter()
        .filter(|node| node.kind() == "export_specifier")
        .filter(|node| !children(*node).iter().any(|child| child.kind() == "type"))
        .filter_map(|node| {
            let local = unit.text_of(node.child_by_field_name("name")?);
            let exported = node
                .child_by_field_name("alias")
                .map(|alias| unit.text_of(alias))
                .unwrap_or(local);
            Some(ExportSpecifier { local, exported })
        })
        .collect()
}

pub fn is_variable_declaration(node: Node<'_>) -> bool {
    matches!(node.kind(), "lexical_declaration" | "variable_declaration")
}

/// The `variable_declarator` children of a variable statement.
pub fn declarators(declaration: Node<'_>) -> Vec<Node<'_>> {
    named_children(declaration)
        .into_iter()
        .filter(|node| node.kind() == "variable_declarator")
        .collect()
}

/// Name of a declarator when it binds a plain identifier.
pub fn binding_name<'a>(unit: &SourceUnit<'a>, declarator: Node<'_>) -> Option<&'a str> {
    declarator
        .child_by_field_name("name")
        .filter(|name| name.kind() == "identifier")
        .map(|name| unit.text_of(name))
}

/// Statement a declarator belongs to: the `export_statement` for exported
/// declarations, otherwise the variable statement itself.
pub fn enclosing_statement(declarator: Node<'_>) -> Option<Node<'_>> {
    let declaration = declarator.parent()?;
    match declaration.parent() {
        Some(parent) if parent.kind() == "export_statement" => Some(parent),
        _ => Some(declaration),
    }
}

/// True when `statement` sits directly under the module root.
pub fn is_top_level(statement: Node<'_>) -> bool {
    statement
        .parent()
        .is_some_and(|parent| parent.kind() == "program")
}

pub fn is_identifier(node: Node<'_>) -> bool {
    node.kind() == "identifier"
}

/// Looks through `satisfies`, `as`, `!` and parentheses for an object literal.
pub fn object_literal(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "object" => Some(node),
        "satisfies_expression" | "as_expression" | "non_null_expression" | "parenthesized_expression" => {
            named_children(node).into_iter().next().and_then(object_literal)
        }
        _ => None,
    }
}

/// True when the object literal has a `title: ...` property assignment.
pub fn has_title_field(unit: &SourceUnit<'_>, object: Node<'_>) -> bool {
    named_children(object).into_iter().any(|prop| {
        prop.kind() == "pair"
            && prop
                .child_by_field_name("key")
                .is_some_and(|key| key.kind() == "property_identifier" && unit.text_of(key) == "title")
    })
}

/// Renders `value` as a single-quoted JavaScript string literal.
pub fn single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Depth-first pre-order walk invoking `visit` on `root` and every
/// descendant. Nodes that do not interest the visitor are still descended.
pub fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}
