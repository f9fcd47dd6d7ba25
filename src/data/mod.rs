//! External collaborators consulted during compilation.
//!
//! | Collaborator | Used by                     | Local implementation |
//! |--------------|-----------------------------|----------------------|
//! | [`Registry`] | `import_minecraft_registry` | [`FileRegistry`]     |
//! | [`DocsProvider`] | `$docsUrl` correlation  | [`MarkdownDocs`]     |
//!
//! [`Registry`]: registry::Registry
//! [`FileRegistry`]: registry::FileRegistry
//! [`DocsProvider`]: docs::DocsProvider
//! [`MarkdownDocs`]: docs::MarkdownDocs

pub mod docs;
pub mod registry;
