//! Recoverable build diagnostics.
//!
//! Diagnostics never abort compilation. They are collected during a batch and
//! reported once it finishes.

use crate::log;
use rustc_hash::FxHashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A reference token points at a source file that does not exist.
    MissingReference,
    /// A directive-shaped key that is not part of the vocabulary.
    UnknownDirective,
    /// Documentation describes fields on a schema that is not an object.
    SchemaShapeMismatch,
    /// Documented and declared properties disagree.
    FieldMismatch,
}

impl DiagnosticKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingReference => "missing-reference",
            Self::UnknownDirective => "unknown-directive",
            Self::SchemaShapeMismatch => "schema-shape-mismatch",
            Self::FieldMismatch => "field-mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Identifier of the document the diagnostic belongs to.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind.label(), self.path, self.message)
    }
}

/// Ordered, de-duplicated diagnostic list.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: FxHashSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Returns `false` if an identical one already exists.
    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        let diagnostic = Diagnostic {
            kind,
            path: path.into(),
            message: message.into(),
        };
        if !self.seen.insert(diagnostic.clone()) {
            return false;
        }
        self.items.push(diagnostic);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    /// Take all diagnostics, leaving the list empty.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        self.seen.clear();
        std::mem::take(&mut self.items)
    }

    /// Log every diagnostic, then clear the list.
    pub fn report(&mut self) {
        for diagnostic in self.drain() {
            log!("diag"; "{diagnostic}");
        }
    }
}
