//! Path templates.
//!
//! A template such as `/users/{id}/posts/{post}` is routed by [`matchit`]. A
//! placeholder matches one or more characters inside a single path segment,
//! and a segment holds at most one placeholder.
//!
//! Two templates that differ only in placeholder names describe the same
//! pattern. That identity is the template's shape, with every placeholder name
//! erased: `/users/{id}` and `/users/{name}` both have the shape `/users/{}`.

use crate::error::TemplateError;
use crate::request::PathParams;
use std::fmt;

pub struct PathPattern {
    template: String,
    shape: String,
    router: Result<matchit::Router<()>, TemplateError>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// Templates that can't be routed are not rejected; they compile into a
    /// pattern that never matches and keep the reason in [`PathPattern::error`].
    pub fn compile(template: &str) -> Self {
        let Some(shape) = erase_names(template) else {
            return Self::never(template, TemplateError::syntax(template));
        };

        let mut router = matchit::Router::new();
        match router.insert(template, ()) {
            Ok(()) => Self { template: template.to_owned(), shape, router: Ok(router) },
            Err(e) => Self::never(template, TemplateError::insert(template, e)),
        }
    }

    fn never(template: &str, error: TemplateError) -> Self {
        Self { template: template.to_owned(), shape: template.to_owned(), router: Err(error) }
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The template with placeholder names erased; a malformed template is its own shape.
    #[inline]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    #[inline]
    pub fn is_malformed(&self) -> bool {
        self.router.is_err()
    }

    pub fn error(&self) -> Option<&TemplateError> {
        self.router.as_ref().err()
    }

    /// Matches the whole `path` and returns the placeholder values by name.
    pub fn captures<'r, 'p>(&'r self, path: &'p str) -> Option<PathParams<'r, 'p>> {
        let matched = self.router.as_ref().ok()?.at(path).ok()?;
        if matched.params.iter().any(|(_, value)| value.is_empty()) {
            return None;
        }
        Some(PathParams::from(matched.params))
    }

    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPattern")
            .field("template", &self.template)
            .field("shape", &self.shape)
            .field("error", &self.error())
            .finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Returns the shape of `template`, or `None` for unbalanced braces, empty or
/// nested placeholders and catch-all placeholders.
fn erase_names(template: &str) -> Option<String> {
    let mut shape = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if rest[pos..].starts_with('}') {
            return None;
        }

        shape.push_str(&rest[..pos]);
        let after_open = &rest[pos + 1..];
        let close = after_open.find('}')?;
        let name = &after_open[..close];
        if name.is_empty() || name.starts_with('*') || name.contains(['{', '/']) {
            return None;
        }

        shape.push_str("{}");
        rest = &after_open[close + 1..];
    }

    shape.push_str(rest);
    Some(shape)
}
