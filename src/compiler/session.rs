//! Build session: compile cache, directive execution and output.
//!
//! # Compile Flow
//!
//! ```text
//! compile(path)
//!   ├── cache hit? ──────────────────────────────► return cached
//!   ├── load_template()
//!   ├── discover()          read-only walk → Vec<DeferredCall>
//!   ├── execute calls       in discovery order, re-indexing after splices
//!   │     └── compile(variant) … (recursive, memoized)
//!   ├── correlate docs      when the root has `$docsUrl`
//!   ├── strip directives    `$NO_REF_CHECK` stays until write
//!   ├── cache.finish()
//!   └── write output        unless `$DONT_EXPORT`
//!         └── resolve ref(…) tokens relative to this output file
//! ```
//!
//! All state lives in [`BuildSession`]; one session is created per process
//! and owned by the build loop.

use super::{
    cache::{CompileCache, CompiledSchema, DependencyGraph},
    diagnostic::{DiagnosticKind, Diagnostics},
    directive::{
        ConditionalArgs, DOCS_URL_KEY, DONT_EXPORT_KEY, FilesArgs, IMPORT_KEY, ImportDirective,
        IncludeArgs, NO_REF_CHECK_KEY, RegistryArgs, looks_like_directive,
    },
    docs::{correlate, ignored_fields},
    error::{BuildError, BuildResult},
    loader::load_template,
    paths::{PathMapper, clean_path, is_template},
    references::{RefResolver, parse_ref, ref_token_for},
    template::{context_table, expand_field},
    tokens::Replacements,
    walker::{ContextStack, DeferredCall, Directive, Segment, Splice, discover, resolve_mut},
};
use crate::{
    data::{docs::DocsProvider, registry::Registry},
    log,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

/// The file a deferred call belongs to.
struct FileContext<'a> {
    source: &'a Path,
    id: &'a str,
    file_name: &'a str,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Documents compiled (including imported ones).
    pub compiled: usize,
    /// Output files written.
    pub written: usize,
    pub failures: Vec<(PathBuf, BuildError)>,
}

impl BatchReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BuildSession {
    mapper: PathMapper,
    registry: Option<Box<dyn Registry>>,
    docs: Option<Box<dyn DocsProvider>>,
    cache: CompileCache,
    graph: DependencyGraph,
    diagnostics: Diagnostics,
    pretty: bool,
    written: usize,
}

impl BuildSession {
    pub fn new(mapper: PathMapper) -> Self {
        Self {
            mapper,
            registry: None,
            docs: None,
            cache: CompileCache::new(),
            graph: DependencyGraph::new(),
            diagnostics: Diagnostics::new(),
            pretty: true,
            written: 0,
        }
    }

    pub fn with_registry(mut self, registry: Box<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_docs(mut self, docs: Box<dyn DocsProvider>) -> Self {
        self.docs = Some(docs);
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn set_registry(&mut self, registry: Option<Box<dyn Registry>>) {
        self.registry = registry;
    }

    pub const fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Compile a batch of source files as one generation.
    ///
    /// A failing file is logged and recorded; the rest of the batch still runs.
    pub fn compile_batch(&mut self, paths: &[PathBuf]) -> BatchReport {
        self.cache.clear();
        self.written = 0;

        let mut failures = Vec::new();
        for path in paths {
            if let Err(e) = self.compile(path) {
                log!("error"; "{}: {}", self.mapper.schema_id(path), describe(&e));
                failures.push((path.clone(), e));
            }
        }

        BatchReport {
            compiled: self.cache.compiled(),
            written: self.written,
            failures,
        }
    }

    /// `changed` plus every known file importing one of them.
    pub fn with_dependents(&self, changed: &[PathBuf]) -> Vec<PathBuf> {
        let mut paths = changed.to_vec();
        paths.extend(
            self.graph
                .affected(changed)
                .into_iter()
                .filter(|path| path.is_file()),
        );
        paths
    }

    /// Forget a deleted source file.
    pub fn forget_source(&mut self, source: &Path) {
        self.graph.remove(source);
    }

    // ========================================================================
    // Compile
    // ========================================================================

    /// Compile one template, reusing the result within a generation.
    pub fn compile(&mut self, path: &Path) -> BuildResult<Arc<CompiledSchema>> {
        let id = self.mapper.schema_id(path);
        if let Some(done) = self.cache.begin(path, &id)? {
            return Ok(done);
        }
        self.compile_uncached(path, id).inspect_err(|_| self.cache.abandon(path))
    }

    fn compile_uncached(&mut self, path: &Path, id: String) -> BuildResult<Arc<CompiledSchema>> {
        log!("compile"; "{id}");
        let mut document = load_template(path)?;
        self.graph.forget(path);

        let file_name = stem(path);
        let file = FileContext {
            source: path,
            id: &id,
            file_name: &file_name,
        };

        let discovery = discover(&document);
        for key in &discovery.unknown {
            self.diagnostics.push(
                DiagnosticKind::UnknownDirective,
                &id,
                format!("unknown directive `{key}` was stripped"),
            );
        }

        let mut pending: VecDeque<DeferredCall> = discovery.calls.into();
        while let Some(call) = pending.pop_front() {
            if let Some(splice) = self.execute(&mut document, call, &file)? {
                for later in &mut pending {
                    later.context.shift_after(&splice);
                }
            }
        }

        self.correlate_docs(&mut document, &id);

        let export = !document.get(DONT_EXPORT_KEY).is_some_and(is_truthy);
        strip_directives(&mut document);

        let schema = self.cache.finish(CompiledSchema {
            id,
            source: path.to_path_buf(),
            document,
            export,
        });
        if schema.export {
            self.write(&schema)?;
        }
        Ok(schema)
    }

    /// Compile `imported` on behalf of `importer`, recording the edge.
    fn compile_dependency(
        &mut self,
        importer: &Path,
        imported: &Path,
    ) -> BuildResult<Arc<CompiledSchema>> {
        self.graph.record(importer, imported);
        self.compile(imported)
    }

    fn correlate_docs(&mut self, document: &mut Value, id: &str) {
        let Some(docs) = self.docs.as_deref() else {
            return;
        };
        let Some(url) = document.get(DOCS_URL_KEY).and_then(Value::as_str) else {
            return;
        };
        match docs.page(url) {
            Ok(page) => {
                let ignored = ignored_fields(document);
                correlate(document, &page, id, &ignored, &mut self.diagnostics);
            }
            Err(reason) => {
                self.diagnostics.push(
                    DiagnosticKind::FieldMismatch,
                    id,
                    format!("documentation unavailable: {reason}"),
                );
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn write(&mut self, schema: &CompiledSchema) -> BuildResult<()> {
        let mut document = schema.document.clone();
        RefResolver::new(&self.mapper, &schema.source, &schema.id, &mut self.diagnostics)
            .resolve(&mut document);

        let out = self.mapper.output_for(&schema.source);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let text = to_json_text(&document, self.pretty).map_err(|e| BuildError::Parse {
            path: out.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&out, text).map_err(|e| BuildError::io(&out, e))?;
        self.written += 1;
        Ok(())
    }

    // ========================================================================
    // Directive execution
    // ========================================================================

    fn execute(
        &mut self,
        document: &mut Value,
        call: DeferredCall,
        file: &FileContext,
    ) -> BuildResult<Option<Splice>> {
        let location = call.context.location();
        match call.directive {
            Directive::Template { key } => {
                let table = context_table(&call.context, &key, file.file_name, file.id);
                if let Some(value) = resolve_mut(document, &location)
                    .and_then(Value::as_object_mut)
                    .and_then(|layer| layer.get_mut(&key))
                {
                    expand_field(value, &table);
                }
                Ok(None)
            }
            Directive::Import => self.execute_import(document, &call, &location, file),
        }
    }

    fn execute_import(
        &mut self,
        document: &mut Value,
        call: &DeferredCall,
        location: &[Segment],
        file: &FileContext,
    ) -> BuildResult<Option<Splice>> {
        let directives = ImportDirective::parse_all(&call.args, file.id)?;

        let mut branches = Vec::new();
        let mut conditional = false;
        for directive in &directives {
            match directive {
                ImportDirective::Conditional(args) => {
                    conditional = true;
                    branches.extend(self.conditional_branches(args, false, file)?);
                }
                ImportDirective::ConditionalContents(args) => {
                    conditional = true;
                    branches.extend(self.conditional_branches(args, true, file)?);
                }
                ImportDirective::Registry(args) => {
                    let items = self.registry_items(args, file)?;
                    append_to_output_key(document, location, &args.output_key, items, file)?;
                }
                ImportDirective::FilesIntoArray(args) => {
                    let items = self.file_items(args, file)?;
                    append_to_output_key(document, location, &args.output_key, items, file)?;
                }
                ImportDirective::Include(args) => self.include(args, file)?,
            }
        }

        layer_mut(document, location, file)?.shift_remove(IMPORT_KEY);

        if conditional {
            splice_branches(document, &call.context, branches, file)
        } else {
            Ok(None)
        }
    }

    /// One `{ if, then }` branch per variant file.
    fn conditional_branches(
        &mut self,
        args: &ConditionalArgs,
        inline: bool,
        file: &FileContext,
    ) -> BuildResult<Vec<Value>> {
        let dir = self.import_dir(&args.path, file)?;
        let variants = list_variants(&dir, &args.exclude)?;
        log!("import"; "{} ({} variants) into {}", self.rel_src(&dir), variants.len(), file.id);

        let mut branches = Vec::with_capacity(variants.len());
        for variant in &variants {
            let name = stem(variant);
            let mut table = Replacements::new().with("schemaName", name.as_str());
            table.extend_from_map(&args.replace);

            let condition = table
                .apply_json(&args.condition)
                .map_err(|e| invalid(file, format!("condition for `{name}`: {e}")))?;

            let compiled = self.compile_dependency(file.source, variant)?;
            let mut then = if inline {
                table.extend_from_map(&args.variables);
                table
                    .apply_json(&compiled.document)
                    .map_err(|e| invalid(file, format!("variables for `{name}`: {e}")))?
            } else {
                let token = self.ref_token(variant, file)?;
                Value::Object(Map::from_iter([("$ref".to_owned(), Value::String(token))]))
            };

            if let Value::Object(then) = &mut then {
                for (key, value) in &args.then_additions {
                    then.insert(key.clone(), value.clone());
                }
            }

            let mut branch = Map::new();
            branch.insert("if".to_owned(), condition);
            branch.insert("then".to_owned(), then);
            branches.push(Value::Object(branch));
        }
        Ok(branches)
    }

    /// One structure clone per registry item.
    fn registry_items(&self, args: &RegistryArgs, file: &FileContext) -> BuildResult<Vec<Value>> {
        let items = self
            .registry
            .as_deref()
            .and_then(|registry| registry.lookup(&args.registry_key))
            .ok_or_else(|| BuildError::RegistryKeyMissing {
                file: file.id.to_owned(),
                key: args.registry_key.clone(),
            })?;
        log!("import"; "registry `{}` ({} items) into {}", args.registry_key, items.len(), file.id);

        items
            .iter()
            .filter(|item| !args.exclude.contains(*item))
            .map(|item| {
                Replacements::new()
                    .with("item", item.as_str())
                    .with("registryKey", args.registry_key.as_str())
                    .apply_json(&args.schema_structure)
                    .map_err(|e| invalid(file, format!("structure for `{item}`: {e}")))
            })
            .collect()
    }

    /// One structure clone per file of a directory.
    fn file_items(&mut self, args: &FilesArgs, file: &FileContext) -> BuildResult<Vec<Value>> {
        let dir = self.import_dir(&args.path, file)?;
        let variants = list_variants(&dir, &args.exclude)?;
        log!("import"; "{} ({} files) into {}", self.rel_src(&dir), variants.len(), file.id);

        let mut items = Vec::with_capacity(variants.len());
        for variant in &variants {
            self.compile_dependency(file.source, variant)?;
            let name = stem(variant);
            let token = self.ref_token(variant, file)?;
            // `$$fileRef` is the older spelling of `$fileRef`.
            let table = Replacements::new()
                .with("$fileRef", token.as_str())
                .with("$fileName", name.as_str())
                .with("fileRef", token.as_str())
                .with("fileName", name.as_str());
            items.push(
                table
                    .apply_json(&args.schema_structure)
                    .map_err(|e| invalid(file, format!("structure for `{name}`: {e}")))?,
            );
        }
        Ok(items)
    }

    /// Compile a file or every file of a directory, inserting nothing.
    fn include(&mut self, args: &IncludeArgs, file: &FileContext) -> BuildResult<()> {
        let rel = import_rel(&args.path);
        if let Some(single) = self.mapper.find_source(Path::new(&rel)) {
            log!("import"; "include {} into {}", self.rel_src(&single), file.id);
            self.compile_dependency(file.source, &single)?;
            return Ok(());
        }

        let dir = self.import_dir(&args.path, file)?;
        let variants = list_variants(&dir, &args.exclude)?;
        log!("import"; "include {} ({} files) into {}", self.rel_src(&dir), variants.len(), file.id);
        for variant in &variants {
            self.compile_dependency(file.source, variant)?;
        }
        Ok(())
    }

    /// Resolve an import `path` argument to a directory below the source root.
    fn import_dir(&self, raw: &str, file: &FileContext) -> BuildResult<PathBuf> {
        let rel = import_rel(raw);
        let dir = self
            .mapper
            .source_dir(&rel)
            .ok_or_else(|| BuildError::OutsideSourceRoot {
                file: file.id.to_owned(),
                path: raw.to_owned(),
            })?;
        if !dir.is_dir() {
            return Err(BuildError::NotADirectory {
                file: file.id.to_owned(),
                path: dir,
            });
        }
        Ok(dir)
    }

    fn ref_token(&self, source: &Path, file: &FileContext) -> BuildResult<String> {
        ref_token_for(&self.mapper, source).ok_or_else(|| BuildError::OutsideSourceRoot {
            file: file.id.to_owned(),
            path: clean_path(source),
        })
    }

    fn rel_src(&self, path: &Path) -> String {
        self.mapper
            .relative_source(path)
            .map_or_else(|| clean_path(path), clean_path)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Import path argument as a path relative to the source root.
///
/// `ref(actions:meta)` → `actions/meta`
fn import_rel(raw: &str) -> String {
    match parse_ref(raw) {
        Some(("", path)) => path.to_owned(),
        Some((namespace, path)) => format!("{namespace}/{path}"),
        None => raw.to_owned(),
    }
}

/// Template files directly inside `dir`, in file name order.
fn list_variants(dir: &Path, exclude: &[String]) -> BuildResult<Vec<PathBuf>> {
    let mut variants = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BuildError::io(dir, e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_template(path) && !exclude.contains(&stem(path)) {
            variants.push(path.to_path_buf());
        }
    }
    Ok(variants)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn invalid(file: &FileContext, reason: String) -> BuildError {
    BuildError::InvalidArgument {
        file: file.id.to_owned(),
        reason,
    }
}

fn layer_mut<'a>(
    document: &'a mut Value,
    location: &[Segment],
    file: &FileContext,
) -> BuildResult<&'a mut Map<String, Value>> {
    resolve_mut(document, location)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| BuildError::SpliceTarget {
            file: file.id.to_owned(),
            reason: "the import layer is no longer an object".to_owned(),
        })
}

fn append_to_output_key(
    document: &mut Value,
    location: &[Segment],
    key: &str,
    items: Vec<Value>,
    file: &FileContext,
) -> BuildResult<()> {
    match layer_mut(document, location, file)?.get_mut(key) {
        Some(Value::Array(array)) => {
            array.extend(items);
            Ok(())
        }
        _ => Err(BuildError::OutputKeyMissing {
            file: file.id.to_owned(),
            key: key.to_owned(),
        }),
    }
}

/// Replace the import layer's slot in its parent array with `branches`.
///
/// A layer that is not an array element gets the branches appended to its
/// own `allOf` instead.
fn splice_branches(
    document: &mut Value,
    context: &ContextStack,
    branches: Vec<Value>,
    file: &FileContext,
) -> BuildResult<Option<Splice>> {
    let Some((array_location, index)) = context.array_slot() else {
        let layer = layer_mut(document, &context.location(), file)?;
        return match layer
            .entry("allOf")
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(all_of) => {
                all_of.extend(branches);
                Ok(None)
            }
            _ => Err(BuildError::SpliceTarget {
                file: file.id.to_owned(),
                reason: "`allOf` on the import layer is not an array".to_owned(),
            }),
        };
    };

    let array = resolve_mut(document, &array_location)
        .and_then(Value::as_array_mut)
        .filter(|array| index < array.len())
        .ok_or_else(|| BuildError::SpliceTarget {
            file: file.id.to_owned(),
            reason: "the enclosing array no longer holds the import".to_owned(),
        })?;

    let inserted = branches.len();
    array.splice(index..=index, branches);
    Ok(Some(Splice {
        array: array_location,
        index,
        inserted,
    }))
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Remove directive keys everywhere except `$NO_REF_CHECK`, which is
/// consumed when the document is written.
pub fn strip_directives(node: &mut Value) {
    match node {
        Value::Array(items) => items.iter_mut().for_each(strip_directives),
        Value::Object(map) => {
            map.retain(|key, _| key == NO_REF_CHECK_KEY || !looks_like_directive(key));
            map.values_mut().for_each(strip_directives);
        }
        _ => {}
    }
}

/// Serialize a document, tab-indented when `pretty`.
pub fn to_json_text(document: &Value, pretty: bool) -> serde_json::Result<String> {
    if !pretty {
        return serde_json::to_string(document);
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render an error with its source chain.
pub fn describe(err: &BuildError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    text
}
