//! story-transform library for turning Storybook story files into test modules.
//!
//! This library provides programmatic access to the story file transform used
//! by the test plugin. The core workflow involves three phases:
//!
//! 1. **Parsing**: Parse the story file and index its top-level declarations
//! 2. **Rewriting**: Inject the meta title, normalize inline meta exports and
//!    register one test per exported story
//! 3. **Emission**: Render the edited text together with a source map
//!
//! # Example
//!
//! ```no_run
//! use story_transform::{StoriesTitleResolver, TransformOptions, transform};
//!
//! let code = std::fs::read_to_string("src/Button.stories.tsx").unwrap();
//! let titles = StoriesTitleResolver::new(&[]);
//! let output = transform(
//!     "src/Button.stories.tsx",
//!     &code,
//!     &TransformOptions::default(),
//!     &titles,
//! )
//! .unwrap();
//!
//! println!("{}", output.code());
//! ```

pub mod config;
pub mod emit;
pub mod error;
pub mod index;
pub mod meta;
pub mod overlay;
pub mod scanner;
pub mod scenario;
pub mod sourcemap;
pub mod syntax;
pub mod title;
pub mod transform;

// Re-export commonly used types at crate root
pub use config::{PluginConfig, StoriesSpecifier, TagFilter, TransformOptions};
pub use error::TransformError;
pub use sourcemap::SourceMap;
pub use title::{StoriesTitleResolver, TitleResolver};
pub use transform::{Diagnostics, TransformOutput, TransformedStory, transform};
