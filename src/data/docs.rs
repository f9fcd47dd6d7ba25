//! Documentation collaborator.
//!
//! A documentation page is a markdown file shaped like:
//!
//! ```markdown
//! # Damage
//!
//! Deals damage to the entity.
//!
//! ### Fields
//!
//! Field | Type | Default | Description
//! ------|------|---------|------------
//! `amount` | [Float](../data_types/float.md) | | The amount of damage.
//! `source` | [Damage Source](../data_types/damage_source.md) | optional | Where it came from.
//!
//! ### Values
//!
//! Value | Description
//! ------|------------
//! `fire` | Burns.
//! ```
//!
//! [`MarkdownDocs`] maps a `$docsUrl` onto a local directory of such pages.

use regex::Regex;
use std::{fs, path::PathBuf, sync::LazyLock};

/// `[name](target)`
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\n\[\]]+?)\]\(([^\n )]+?)\)").unwrap());

static FIELD_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?\s*Field\s*\|\s*Type\s*\|\s*Default\s*\|\s*Description\s*\|?\s*$").unwrap()
});

static VALUE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?\s*Value\s*\|\s*Description\s*\|?\s*$").unwrap());

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$").unwrap());

/// One documented field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocField {
    pub name: String,
    pub type_name: String,
    pub optional: bool,
    pub description: String,
    pub deprecated: bool,
}

/// A parsed documentation page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocPage {
    pub title: String,
    pub description: String,
    pub fields: Vec<DocField>,
    /// Entries of the `Value | Description` table.
    pub values: Vec<String>,
}

impl DocPage {
    pub fn field(&self, name: &str) -> Option<&DocField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Source of documentation pages, addressed by URL or path.
pub trait DocsProvider {
    fn page(&self, url: &str) -> Result<DocPage, String>;
}

/// Pages read from a local directory of markdown files.
#[derive(Debug, Clone)]
pub struct MarkdownDocs {
    root: PathBuf,
    base_url: Option<String>,
}

impl MarkdownDocs {
    pub fn new(root: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            base_url,
        }
    }

    /// Local markdown file for a docs URL.
    ///
    /// `https://docs.example/en/latest/types/actions/damage/` with base
    /// `https://docs.example/en/latest/` → `<root>/types/actions/damage.md`
    pub fn page_path(&self, url: &str) -> Result<PathBuf, String> {
        let rel = match self.base_url.as_deref().and_then(|base| url.strip_prefix(base)) {
            Some(rel) => rel,
            None if url.contains("://") => {
                return Err(format!("`{url}` is not below the configured docs base url"));
            }
            None => url,
        };
        let rel = rel.trim_start_matches('/').trim_end_matches('/');
        let rel = rel.split(['#', '?']).next().unwrap_or_default();
        if rel.is_empty() || rel.split('/').any(|part| part == "..") {
            return Err(format!("`{url}` does not name a documentation page"));
        }

        let path = self.root.join(rel);
        Ok(if path.extension().is_some_and(|ext| ext == "md") {
            path
        } else {
            path.with_extension("md")
        })
    }
}

impl DocsProvider for MarkdownDocs {
    fn page(&self, url: &str) -> Result<DocPage, String> {
        let path = self.page_path(url)?;
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Ok(parse_page(&content))
    }
}

/// Parse a markdown documentation page.
pub fn parse_page(content: &str) -> DocPage {
    let content = content.replace('\r', "");
    let lines: Vec<&str> = content.lines().collect();
    let mut page = DocPage::default();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if let Some(title) = line.strip_prefix("# ") {
            if page.title.is_empty() {
                page.title = title.trim().to_owned();
                let (description, next) = paragraph_after(&lines, i + 1);
                page.description = description;
                i = next;
                continue;
            }
        } else if FIELD_HEADER.is_match(line) {
            let (rows, next) = table_rows(&lines, i + 1);
            page.fields.extend(rows.iter().filter_map(|cells| parse_field(cells)));
            i = next;
            continue;
        } else if VALUE_HEADER.is_match(line) {
            let (rows, next) = table_rows(&lines, i + 1);
            page.values.extend(rows.iter().filter_map(|cells| parse_value(cells)));
            i = next;
            continue;
        }
        i += 1;
    }

    page
}

/// Text between a title and the next heading.
fn paragraph_after(lines: &[&str], start: usize) -> (String, usize) {
    let end = lines[start..]
        .iter()
        .position(|line| line.trim_start().starts_with('#'))
        .map_or(lines.len(), |offset| start + offset);
    let text = lines[start..end]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n");
    (text.trim().to_owned(), end)
}

/// Rows of a table whose header was at `start - 1`.
fn table_rows(lines: &[&str], start: usize) -> (Vec<Vec<String>>, usize) {
    let mut i = start;
    if lines.get(i).is_some_and(|line| SEPARATOR.is_match(line.trim())) {
        i += 1;
    }
    let mut rows = Vec::new();
    while let Some(line) = lines.get(i) {
        let line = line.trim();
        if line.is_empty() || !line.contains('|') {
            break;
        }
        rows.push(split_row(line));
        i += 1;
    }
    (rows, i)
}

/// Split a table row into trimmed cells, ignoring pipes inside links.
fn split_row(line: &str) -> Vec<String> {
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                cells.push(cell.trim().to_owned());
                cell.clear();
                continue;
            }
            _ => {}
        }
        cell.push(c);
    }
    cells.push(cell.trim().to_owned());
    cells
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '`').trim()
}

fn parse_field(cells: &[String]) -> Option<DocField> {
    let [name, ty, default, description, ..] = cells else {
        return None;
    };
    let name = name.replace('`', "");
    if name.is_empty() {
        return None;
    }

    let mut field = DocField {
        name,
        description: description.trim().to_owned(),
        ..DocField::default()
    };

    field.type_name = match LINK.captures(ty) {
        Some(caps) => strip_quotes(&caps[1]).to_owned(),
        None => ty
            .trim()
            .trim_matches(|c| c == '"' || c == '[' || c == ']')
            .to_owned(),
    };

    // A documented default makes the field optional as well.
    let lower = default.to_ascii_lowercase();
    field.deprecated = lower.contains("deprecated");
    field.optional = !field.deprecated && !strip_quotes(default).is_empty();

    Some(field)
}

fn parse_value(cells: &[String]) -> Option<String> {
    let value = strip_quotes(cells.first()?);
    (!value.is_empty()).then(|| value.to_owned())
}
