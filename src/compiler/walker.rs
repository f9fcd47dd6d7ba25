//! Directive discovery.
//!
//! The walker visits every object and array of a document in pre-order and
//! records a [`DeferredCall`] for each directive it meets. Nothing is mutated
//! during the walk; the dispatcher executes the calls afterwards in discovery
//! order.
//!
//! ```text
//! root {…}                      Frame(Schema)
//! └── allOf […]                 Frame(Container, array)
//!     └── [1] {$IMPORT: …}      Frame(Schema)   ← DeferredCall(Import)
//! ```
//!
//! Each call carries a snapshot of the [`ContextStack`] at the point of
//! discovery: the location of its layer plus the title/description of every
//! enclosing schema.

use super::directive::{IMPORT_KEY, KNOWN_DIRECTIVES, TEMPLATED_KEYS, looks_like_directive};
use super::tokens::has_tokens;
use serde_json::Value;

/// Keywords whose object value maps names to schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependentSchemas",
];

// ============================================================================
// Locations
// ============================================================================

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Follow a location from the document root.
pub fn resolve<'a>(root: &'a Value, location: &[Segment]) -> Option<&'a Value> {
    location.iter().try_fold(root, |node, segment| match segment {
        Segment::Key(key) => node.as_object()?.get(key),
        Segment::Index(i) => node.as_array()?.get(*i),
    })
}

/// Mutable variant of [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut Value, location: &[Segment]) -> Option<&'a mut Value> {
    location.iter().try_fold(root, |node, segment| match segment {
        Segment::Key(key) => node.as_object_mut()?.get_mut(key),
        Segment::Index(i) => node.as_array_mut()?.get_mut(*i),
    })
}

/// A replaced array slot: `array[index]` became `inserted` new elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub array: Vec<Segment>,
    pub index: usize,
    pub inserted: usize,
}

// ============================================================================
// Context stack
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A schema object; carries annotations for nearest-context lookups.
    Schema,
    /// An array, or an object mapping names to schemas.
    Container,
}

/// Annotation looked up through [`ContextStack::nearest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Title,
    Description,
    MarkdownDescription,
}

impl Annotation {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::MarkdownDescription => "markdownDescription",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Annotations {
    title: Option<String>,
    description: Option<String>,
    markdown_description: Option<String>,
}

impl Annotations {
    fn capture(node: &Value) -> Self {
        let get = |key: &str| node.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            title: get("title"),
            description: get("description"),
            markdown_description: get("markdownDescription"),
        }
    }

    fn get(&self, annotation: Annotation) -> Option<&str> {
        match annotation {
            Annotation::Title => self.title.as_deref(),
            Annotation::Description => self.description.as_deref(),
            Annotation::MarkdownDescription => self.markdown_description.as_deref(),
        }
        .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    /// Step from the parent frame; `None` for the root.
    segment: Option<Segment>,
    is_array: bool,
    annotations: Annotations,
}

impl Frame {
    fn root(node: &Value) -> Self {
        Self::new(None, node, FrameKind::Schema)
    }

    fn new(segment: Option<Segment>, node: &Value, kind: FrameKind) -> Self {
        let annotations = match kind {
            FrameKind::Schema => Annotations::capture(node),
            FrameKind::Container => Annotations::default(),
        };
        Self {
            kind,
            segment,
            is_array: node.is_array(),
            annotations,
        }
    }
}

/// Frames from the document root down to the current node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new(root: &Value) -> Self {
        Self {
            frames: vec![Frame::root(root)],
        }
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Location of the current node from the document root.
    pub fn location(&self) -> Vec<Segment> {
        self.frames
            .iter()
            .filter_map(|frame| frame.segment.clone())
            .collect()
    }

    /// Nearest non-empty annotation of an enclosing schema.
    ///
    /// Ancestors are searched innermost first; the current frame's own value
    /// is the fallback when no ancestor has one.
    pub fn nearest(&self, annotation: Annotation) -> Option<&str> {
        self.nearest_ancestor(annotation)
            .or_else(|| self.current()?.annotations.get(annotation))
    }

    /// Like [`ContextStack::nearest`], without the own-value fallback.
    pub fn nearest_ancestor(&self, annotation: Annotation) -> Option<&str> {
        let (_, ancestors) = self.frames.split_last()?;
        ancestors
            .iter()
            .rev()
            .filter(|frame| frame.kind == FrameKind::Schema)
            .find_map(|frame| frame.annotations.get(annotation))
    }

    /// The array slot holding the current node, if its parent is an array.
    pub fn array_slot(&self) -> Option<(Vec<Segment>, usize)> {
        let (current, ancestors) = self.frames.split_last()?;
        let parent = ancestors.last()?;
        match (&current.segment, parent.is_array) {
            (Some(Segment::Index(i)), true) => {
                let mut array = self.location();
                array.pop();
                Some((array, *i))
            }
            _ => None,
        }
    }

    /// Re-index this snapshot after an earlier call spliced an array.
    ///
    /// Elements after the replaced slot moved by `inserted - 1`.
    pub fn shift_after(&mut self, splice: &Splice) {
        let depth = splice.array.len() + 1;
        if self.frames.len() <= depth {
            return;
        }
        let prefix_matches = self.frames[1..depth]
            .iter()
            .zip(&splice.array)
            .all(|(frame, seg)| frame.segment.as_ref() == Some(seg));
        if !prefix_matches {
            return;
        }
        if let Some(Segment::Index(j)) = &mut self.frames[depth].segment
            && *j > splice.index
        {
            *j = *j - 1 + splice.inserted;
        }
    }
}

// ============================================================================
// Deferred calls
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `$IMPORT` on the layer at the call's location.
    Import,
    /// Templated string field `key` on the layer at the call's location.
    Template { key: String },
}

/// A directive found during the walk, executed after the walk completes.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    pub directive: Directive,
    /// Snapshot of the stack; its top frame is the layer holding the directive.
    pub context: ContextStack,
    pub args: Value,
}

/// Result of walking one document.
#[derive(Debug, Default)]
pub struct Discovery {
    pub calls: Vec<DeferredCall>,
    /// Directive-shaped keys that are not part of the vocabulary.
    pub unknown: Vec<String>,
}

/// Walk a document and collect its deferred calls in pre-order.
pub fn discover(root: &Value) -> Discovery {
    let mut walker = Walker {
        stack: ContextStack::new(root),
        found: Discovery::default(),
    };
    walker.visit(root);
    walker.found
}

struct Walker {
    stack: ContextStack,
    found: Discovery,
}

impl Walker {
    fn visit(&mut self, node: &Value) {
        match node {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if item.is_object() || item.is_array() {
                        let kind = if item.is_array() {
                            FrameKind::Container
                        } else {
                            FrameKind::Schema
                        };
                        self.descend(Segment::Index(i), item, kind);
                    }
                }
            }
            Value::Object(map) => {
                let in_schema = self
                    .stack
                    .current()
                    .is_some_and(|frame| frame.kind == FrameKind::Schema);

                for (key, value) in map {
                    if key == IMPORT_KEY {
                        self.record(Directive::Import, value.clone());
                        // The directive owns the rest of this layer.
                        return;
                    }
                    if looks_like_directive(key) {
                        if !KNOWN_DIRECTIVES.contains(&key.as_str()) {
                            self.found.unknown.push(key.clone());
                        }
                        continue;
                    }
                    if TEMPLATED_KEYS.contains(&key.as_str()) && is_templated(value) {
                        self.record(Directive::Template { key: key.clone() }, Value::Null);
                    }
                    if value.is_object() || value.is_array() {
                        let kind = match value {
                            Value::Array(_) => FrameKind::Container,
                            _ if in_schema && SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) => {
                                FrameKind::Container
                            }
                            _ => FrameKind::Schema,
                        };
                        self.descend(Segment::Key(key.clone()), value, kind);
                    }
                }
            }
            _ => {}
        }
    }

    fn descend(&mut self, segment: Segment, node: &Value, kind: FrameKind) {
        self.stack.push(Frame::new(Some(segment), node, kind));
        self.visit(node);
        self.stack.pop();
    }

    fn record(&mut self, directive: Directive, args: Value) {
        self.found.calls.push(DeferredCall {
            directive,
            context: self.stack.clone(),
            args,
        });
    }
}

/// String, or array containing a string, with `$` tokens.
fn is_templated(value: &Value) -> bool {
    match value {
        Value::String(s) => has_tokens(s),
        Value::Array(items) => items
            .iter()
            .any(|item| item.as_str().is_some_and(has_tokens)),
        _ => false,
    }
}
