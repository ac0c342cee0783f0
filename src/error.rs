//! Error types for the story transform.

use thiserror::Error;

/// Failures that abort the transform of a single story file.
///
/// Anything recoverable is reported through [`crate::transform::Diagnostics`]
/// instead; a returned error always means no output was produced.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The story file has no `export default` to attach the title to.
    #[error(
        "could not detect the meta (default export) object in {id}\n\n\
         Please make sure the story file has a default export with the meta object. \
         If you are using a different export format that is not supported, \
         please file an issue with details about your use case."
    )]
    MissingMetadataExport { id: String },

    /// The bundled grammar could not be loaded into the parser.
    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    /// The tag filter could not be rendered as JSON.
    #[error("failed to serialize tag filter: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The parser gave up without producing a tree.
    #[error("failed to parse {0}")]
    Parse(String),
}
