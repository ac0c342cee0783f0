//! Index of top-level variable declarations.
//!
//! Built once per module so that `export { Primary }` and `export default meta`
//! can be traced back to the `const` that declares the value.

use crate::syntax::{self, SourceUnit};
use std::collections::HashMap;
use tree_sitter::Node;

/// Maps a declared name to its `variable_declarator` node.
pub struct DeclarationIndex<'a, 't> {
    declarations: HashMap<&'a str, Node<'t>>,
}

impl<'a, 't> DeclarationIndex<'a, 't> {
    /// Walks the whole tree and records every declarator of a top-level
    /// variable statement, exported or not. The first declaration of a name
    /// wins.
    pub fn build(unit: &'t SourceUnit<'a>) -> Self {
        let mut declarations = HashMap::new();
        syntax::walk(unit.root(), |node| {
            if node.kind() != "variable_declarator" {
                return;
            }
            let top_level = syntax::enclosing_statement(node).is_some_and(syntax::is_top_level);
            if top_level && let Some(name) = syntax::binding_name(unit, node) {
                declarations.entry(name).or_insert(node);
            }
        });
        Self { declarations }
    }

    pub fn get(&self, name: &str) -> Option<Node<'t>> {
        self.declarations.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
