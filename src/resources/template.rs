//! Template materializer.
//!
//! A template named `template.<scope>` holds `{{TOKEN}}` placeholders. Each
//! token maps to `params[scope][property]`, where `property` is the token
//! name with its leading segments stripped, converted to camelCase
//! (`{{GIT_USER_NAME}}` in scope `git` reads `git.userName`).
//!
//! A [`PlaceholderTable`] built from the whole template set lets callers
//! check every binding against the parameter document before anything is
//! written.
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use super::error::RenderError;
use crate::config::ParameterDocument;

/// File name prefix that marks a template.
pub const TEMPLATE_PREFIX: &str = "template.";

/// Leading token segments dropped by default when deriving a property.
pub const DEFAULT_PREFIX_SEGMENTS: usize = 1;

/// A loaded template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Path of the template file.
    pub path: PathBuf,
    /// Scope key from the file name.
    pub scope: String,
    body: String,
}

impl Template {
    /// Read a template from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotATemplate`] if the file name lacks the
    /// template prefix and [`RenderError::TemplateRead`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let scope = scope_of(path)?;
        let body = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            scope,
            body,
        })
    }

    /// Distinct placeholder tokens, braces included.
    #[must_use]
    pub fn tokens(&self) -> BTreeSet<&str> {
        token_spans(&self.body)
            .into_iter()
            .filter_map(|(start, end)| self.body.get(start..end))
            .collect()
    }
}

/// Scope key of a template path (`template.gitconfig` -> `gitconfig`).
///
/// # Errors
///
/// Returns [`RenderError::NotATemplate`] when the name does not start with
/// [`TEMPLATE_PREFIX`] or has nothing after it.
pub fn scope_of(path: &Path) -> Result<String, RenderError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix(TEMPLATE_PREFIX))
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RenderError::NotATemplate {
            path: path.to_path_buf(),
        })
}

/// Where the rendered output for `scope` lives in the repository.
#[must_use]
pub fn output_path(root: &Path, scope: &str) -> PathBuf {
    root.join(format!(".{scope}"))
}

/// Template files in `dir`, sorted. A missing directory yields none.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be read.
pub fn collect_templates(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && scope_of(&path).is_ok() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Byte ranges of `{{...}}` tokens in `body`, left to right.
///
/// A token is `{{`, one or more characters other than `}`, then `}}`.
fn token_spans(body: &str) -> Vec<(usize, usize)> {
    let bytes = body.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while let Some(offset) = body.get(i..).and_then(|rest| rest.find("{{")) {
        let start = i + offset;
        let inner = start + 2;
        let mut j = inner;
        while bytes.get(j).is_some_and(|&b| b != b'}') {
            j += 1;
        }
        if j > inner && body.get(j..).is_some_and(|rest| rest.starts_with("}}")) {
            spans.push((start, j + 2));
            i = j + 2;
        } else {
            i = start + 1;
        }
    }
    spans
}

/// Property name for a token: drop `prefix_segments` underscore-separated
/// segments, then camelCase the rest.
///
/// Returns `None` when nothing is left after stripping.
///
/// ```
/// use dotstrap::resources::template::lookup_key;
///
/// assert_eq!(lookup_key("{{FOO_BAR_BAZ}}", 1).as_deref(), Some("barBaz"));
/// assert_eq!(lookup_key("{{GIT}}", 1), None);
/// ```
#[must_use]
pub fn lookup_key(token: &str, prefix_segments: usize) -> Option<String> {
    let name = token
        .strip_prefix("{{")
        .and_then(|t| t.strip_suffix("}}"))
        .unwrap_or(token)
        .trim();
    let mut segments = name
        .split('_')
        .skip(prefix_segments)
        .filter(|s| !s.is_empty());

    let mut key = segments.next()?.to_lowercase();
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(&chars.as_str().to_lowercase());
        }
    }
    Some(key)
}

/// Replace tokens in a single left-to-right pass, so substituted values are
/// never scanned again.
fn substitute(body: &str, values: &BTreeMap<&str, &str>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for (start, end) in token_spans(body) {
        let (Some(before), Some(token)) = (body.get(last..start), body.get(start..end)) else {
            continue;
        };
        out.push_str(before);
        out.push_str(values.get(token).copied().unwrap_or(token));
        last = end;
    }
    out.push_str(body.get(last..).unwrap_or_default());
    out
}

/// One placeholder in one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Template the token appears in.
    pub template: PathBuf,
    /// Token text, braces included.
    pub token: String,
    /// Scope the token reads from.
    pub scope: String,
    /// Property the token reads, `None` if the name has no segments left.
    pub property: Option<String>,
}

/// Every token of a template set with the parameter it reads.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    scopes: Vec<(PathBuf, String)>,
    bindings: Vec<Binding>,
}

/// Problems found by [`PlaceholderTable::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCheck {
    /// Scopes with templates but no entry in the parameter document.
    pub missing_scopes: Vec<String>,
    /// Bindings whose value is absent or empty.
    pub unresolved: Vec<Binding>,
}

impl TableCheck {
    /// Whether every scope and binding resolved.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_scopes.is_empty() && self.unresolved.is_empty()
    }
}

impl PlaceholderTable {
    /// Build the table for `templates`.
    #[must_use]
    pub fn build(templates: &[Template], prefix_segments: usize) -> Self {
        let mut table = Self::default();
        for template in templates {
            table
                .scopes
                .push((template.path.clone(), template.scope.clone()));
            for token in template.tokens() {
                table.bindings.push(Binding {
                    template: template.path.clone(),
                    token: token.to_string(),
                    scope: template.scope.clone(),
                    property: lookup_key(token, prefix_segments),
                });
            }
        }
        table
    }

    /// All bindings, grouped by template.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Check every binding against `params`.
    #[must_use]
    pub fn check(&self, params: &ParameterDocument) -> TableCheck {
        let missing_scopes = self
            .scopes
            .iter()
            .map(|(_, scope)| scope)
            .filter(|scope| !params.has_scope(scope))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let unresolved = self
            .bindings
            .iter()
            .filter(|b| resolve(params, &b.scope, b.property.as_deref()).is_none())
            .cloned()
            .collect();
        TableCheck {
            missing_scopes,
            unresolved,
        }
    }
}

fn resolve<'p>(
    params: &'p ParameterDocument,
    scope: &str,
    property: Option<&str>,
) -> Option<&'p str> {
    params
        .lookup(scope, property?)
        .filter(|value| !value.is_empty())
}

/// Result of rendering one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    /// Where the output was written.
    pub output: PathBuf,
    /// Whether the parameter document lacked the template's scope.
    pub missing_scope: bool,
    /// Tokens left in the output, braces included, sorted.
    pub unresolved: Vec<String>,
}

/// Renders templates against a parameter document.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    prefix_segments: usize,
    strict: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_SEGMENTS, false)
    }
}

impl Renderer {
    /// Create a renderer.
    ///
    /// In strict mode a missing scope or an unresolved token is an error and
    /// nothing is written.
    #[must_use]
    pub const fn new(prefix_segments: usize, strict: bool) -> Self {
        Self {
            prefix_segments,
            strict,
        }
    }

    /// Whether this renderer is strict.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Leading segments stripped from token names.
    #[must_use]
    pub const fn prefix_segments(&self) -> usize {
        self.prefix_segments
    }

    /// Render `template` into `output`, replacing it unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template cannot be read or the output
    /// cannot be written, and in strict mode if the scope is missing or a
    /// token is unresolved.
    pub fn render_template(
        &self,
        template: &Path,
        output: &Path,
        params: &ParameterDocument,
    ) -> Result<Written, RenderError> {
        self.render(&Template::load(template)?, output, params)
    }

    /// Render an already loaded template.
    ///
    /// # Errors
    ///
    /// See [`Renderer::render_template`].
    pub fn render(
        &self,
        template: &Template,
        output: &Path,
        params: &ParameterDocument,
    ) -> Result<Written, RenderError> {
        let missing_scope = !params.has_scope(&template.scope);
        if missing_scope && self.strict {
            return Err(RenderError::MissingScope {
                scope: template.scope.clone(),
            });
        }

        let mut values = BTreeMap::new();
        let mut unresolved = Vec::new();
        for token in template.tokens() {
            let property = lookup_key(token, self.prefix_segments);
            match resolve(params, &template.scope, property.as_deref()) {
                Some(value) => {
                    values.insert(token, value);
                }
                None => unresolved.push(token.to_string()),
            }
        }

        if self.strict && !unresolved.is_empty() {
            return Err(RenderError::Unresolved {
                scope: template.scope.clone(),
                tokens: unresolved,
            });
        }

        std::fs::write(output, substitute(&template.body, &values)).map_err(|source| {
            RenderError::Write {
                path: output.to_path_buf(),
                source,
            }
        })?;

        Ok(Written {
            output: output.to_path_buf(),
            missing_scope,
            unresolved,
        })
    }
}
