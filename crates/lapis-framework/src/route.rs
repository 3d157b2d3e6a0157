//! Routes and pattern matching.
//!
//! A route pattern is a regular expression in which placeholders of the form
//! `<name:expr>` become capturing groups. The compiled expression is anchored
//! at both ends:
//!
//! ```text
//! /users/<id:\d+>/posts/<slug:[a-z-]+>
//!   ─► ^/users/(\d+)/posts/([a-z-]+)$      names = [id, slug]
//! ```
//!
//! Text outside placeholders is kept as written, so `/assets/.*` matches any
//! path below `/assets/`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::BoxedHandler;
use crate::hook::{BoxedHook, Hook};
use lapis_core::foundation::Request;
use lapis_core::scheduler::Tiers;

/// Captured `(name, value)` pairs in placeholder order.
pub type Captures = Vec<(String, String)>;

// =============================================================================
// Pattern
// =============================================================================

/// A compiled host or uri pattern.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
    names: Vec<String>,
}

impl Pattern {
    /// Compiles `source`, collecting placeholder names in order.
    pub fn compile(source: &str) -> RegistrationResult<Self> {
        let (expression, names) = rewrite(source);
        let regex = Regex::new(&expression).map_err(|e| RegistrationError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            regex: Some(regex),
            names,
        })
    }

    /// A pattern that matches nothing, standing in for one that failed to
    /// compile until the registration error is reported.
    pub(crate) fn never(source: &str) -> Self {
        Self {
            source: source.to_string(),
            regex: None,
            names: Vec::new(),
        }
    }

    /// The pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The anchored expression; `None` for a pattern that never matches.
    pub fn as_regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Placeholder names in order of appearance.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(subject))
    }

    /// Matches `subject`, returning the named captures.
    ///
    /// Returns `None` when the subject does not match. When the expression
    /// has more groups than placeholders (an `expr` with its own groups), the
    /// match still succeeds but no captures are reported.
    pub fn captures(&self, subject: &str) -> Option<Captures> {
        let caps = self.regex.as_ref()?.captures(subject)?;
        let groups = caps.len() - 1;
        if groups != self.names.len() {
            debug!(
                pattern = %self.source,
                groups,
                names = self.names.len(),
                "Capture count differs from placeholder count, parameters skipped"
            );
            return Some(Vec::new());
        }

        Some(
            self.names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("names", &self.names)
            .finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Rewrites placeholders into groups and anchors the result.
fn rewrite(source: &str) -> (String, Vec<String>) {
    let mut expression = String::with_capacity(source.len() + 2);
    let mut names = Vec::new();
    expression.push('^');

    let mut rest = source;
    while let Some(start) = rest.find('<') {
        expression.push_str(&rest[..start]);
        let tail = &rest[start..];
        match placeholder(tail) {
            Some((name, expr, consumed)) => {
                names.push(name.to_string());
                expression.push('(');
                expression.push_str(expr);
                expression.push(')');
                rest = &tail[consumed..];
            }
            None => {
                expression.push('<');
                rest = &tail[1..];
            }
        }
    }
    expression.push_str(rest);
    expression.push('$');

    (expression, names)
}

/// Parses `<name:expr>` at the start of `input`.
///
/// Returns the name, the expression and the number of bytes consumed. Angle
/// brackets nest inside `expr`, so `(?<x>..)` style groups survive.
fn placeholder(input: &str) -> Option<(&str, &str, usize)> {
    let body = input.strip_prefix('<')?;
    let colon = body.find(':')?;
    let name = &body[..colon];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let expr_start = colon + 1;
    let mut depth = 0usize;
    for (offset, c) in body[expr_start..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' if depth == 0 => {
                let expr = &body[expr_start..expr_start + offset];
                if expr.is_empty() {
                    return None;
                }
                // Leading '<' plus the closing '>'.
                return Some((name, expr, 1 + expr_start + offset + 1));
            }
            '>' => depth -= 1,
            _ => {}
        }
    }
    None
}

// =============================================================================
// Route
// =============================================================================

/// A registered method, host/uri pattern, handler and hooks.
#[derive(Clone)]
pub struct Route {
    method: String,
    uri: Pattern,
    host: Option<Pattern>,
    name: String,
    handler: BoxedHandler,
    hooks: Tiers<BoxedHook>,
    tags: BTreeSet<String>,
}

impl Route {
    /// Creates a route named after its method and uri.
    ///
    /// An empty `method` matches any method.
    pub fn new(method: &str, uri: &str, handler: BoxedHandler) -> RegistrationResult<Self> {
        Ok(Self::with_pattern(method, Pattern::compile(uri)?, handler))
    }

    pub(crate) fn with_pattern(method: &str, uri: Pattern, handler: BoxedHandler) -> Self {
        let method = method.to_ascii_uppercase();
        let name = default_name(&method, uri.source());
        Self {
            method,
            uri,
            host: None,
            name,
            handler,
            hooks: Tiers::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Sets the name (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restricts the route to hosts matching `pattern` (builder pattern).
    pub fn with_host(mut self, pattern: &str) -> RegistrationResult<Self> {
        self.set_host(Pattern::compile(pattern)?);
        Ok(self)
    }

    /// Adds a hook to the tier it asks for (builder pattern).
    pub fn with_hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.add_hook(Arc::new(hook));
        self
    }

    /// Adds a tag (builder pattern).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_host(&mut self, host: Pattern) {
        self.host = if host.source().is_empty() {
            None
        } else {
            Some(host)
        };
    }

    pub(crate) fn add_hook(&mut self, hook: BoxedHook) {
        self.hooks.insert(hook);
    }

    pub(crate) fn add_tag(&mut self, tag: String) {
        self.tags.insert(tag);
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &Pattern {
        &self.uri
    }

    pub fn host(&self) -> Option<&Pattern> {
        self.host.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Hooks grouped by priority tier.
    pub fn hooks(&self) -> &Tiers<BoxedHook> {
        &self.hooks
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Matches method, host and uri against `request`.
    ///
    /// Returns the uri captures on success; host captures come first when
    /// the route has a host pattern.
    pub fn matches(&self, request: &Request) -> Option<Captures> {
        if !self.method.is_empty() && self.method != request.method() {
            return None;
        }

        let mut captures = match &self.host {
            Some(host) => host.captures(request.host())?,
            None => Vec::new(),
        };
        captures.extend(self.uri.captures(request.uri())?);
        Some(captures)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("uri", &self.uri.source())
            .field("host", &self.host.as_ref().map(Pattern::source))
            .field("hooks", &self.hooks.len())
            .field("tags", &self.tags)
            .finish()
    }
}

/// The name a route gets when none is given: the uppercase method, `_`, then
/// the uri pattern with every `/` replaced by `_`.
pub fn default_name(method: &str, uri: &str) -> String {
    format!("{}_{}", method.to_ascii_uppercase(), uri.replace('/', "_"))
}
