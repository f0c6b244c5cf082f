//! Interpolation - `$name`, `${name}`, `$<name>`, `$[javascript:expr]`
//!
//! Step and binding templates are tokenized once and cached (DashMap + Arc,
//! at most `TEMPLATE_CACHE_CAPACITY` entries), then resolved token by token:
//! - named placeholders go through `resolve_bound_value`, and the value is
//!   itself interpolated before substitution (nested placeholders) unless
//!   it is the placeholder of a failed evaluation;
//! - `$[javascript:expr]` runs the script inline; when it fails the
//!   placeholder text is kept as is.
//!
//! Text without `$` is returned unchanged.

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use tracing::trace;

use super::resolve::Dynamic;
use crate::context::WebContext;
use crate::error::Result;

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text (range in the original string)
    Literal(Range<usize>),
    /// `$name`, `${name}` or `$<name>`
    Name(String),
    /// `$[javascript:expr]`, with the range of the whole placeholder
    Script { expression: String, raw: Range<usize> },
}

/// Templates kept by `TEMPLATE_CACHE`; later ones are tokenized uncached
pub const TEMPLATE_CACHE_CAPACITY: usize = 1024;

/// Tokenizer with caching
pub struct TemplateCache {
    cache: DashMap<String, Arc<Vec<Token>>>,
    capacity: usize,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::with_capacity(TEMPLATE_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: DashMap::new(),
            capacity,
        }
    }

    /// Parse template into tokens (cached while below capacity)
    pub fn tokenize(&self, template: &str) -> Arc<Vec<Token>> {
        if let Some(cached) = self.cache.get(template) {
            return Arc::clone(&cached);
        }

        let tokens = Arc::new(tokenize(template));
        if self.cache.len() < self.capacity {
            self.cache.insert(template.to_string(), Arc::clone(&tokens));
        }
        tokens
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Global template cache
pub static TEMPLATE_CACHE: Lazy<TemplateCache> = Lazy::new(TemplateCache::new);

/// Split a template into literal and placeholder tokens.
///
/// Unterminated or empty placeholders stay literal text.
pub fn tokenize(template: &str) -> Vec<Token> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' || i + 1 >= bytes.len() {
            i += 1;
            continue;
        }

        let parsed = match bytes[i + 1] {
            b'{' => delimited(template, i, b'}').map(|(name, end)| (Token::Name(name), end)),
            b'<' => delimited(template, i, b'>').map(|(name, end)| (Token::Name(name), end)),
            b'[' => inline_script(template, i),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let (name, end) = bare_name(template, i + 1);
                Some((Token::Name(name), end))
            }
            _ => None,
        };

        match parsed {
            Some((token, end)) => {
                if i > literal_start {
                    tokens.push(Token::Literal(literal_start..i));
                }
                tokens.push(token);
                literal_start = end;
                i = end;
            }
            None => i += 1,
        }
    }

    if literal_start < template.len() {
        tokens.push(Token::Literal(literal_start..template.len()));
    }
    tokens
}

/// `${name}` / `$<name>`: returns the trimmed name and the index after the closer
fn delimited(template: &str, dollar: usize, close: u8) -> Option<(String, usize)> {
    let start = dollar + 2;
    let offset = template.as_bytes()[start..].iter().position(|b| *b == close)?;
    let name = template[start..start + offset].trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), start + offset + 1))
}

/// `$name`: ASCII alphanumerics, `_` and `.`, without a trailing `.`
fn bare_name(template: &str, start: usize) -> (String, usize) {
    let bytes = template.as_bytes();
    let mut end = start;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'.')
    {
        end += 1;
    }
    while end > start + 1 && bytes[end - 1] == b'.' {
        end -= 1;
    }
    (template[start..end].to_string(), end)
}

/// `$[javascript:expr]` with nested brackets allowed inside `expr`
fn inline_script(template: &str, dollar: usize) -> Option<(Token, usize)> {
    let bytes = template.as_bytes();
    let start = dollar + 2;
    let mut depth = 1usize;
    let mut end = start;
    while end < bytes.len() {
        match bytes[end] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        end += 1;
    }
    if depth != 0 {
        return None;
    }

    let body = &template[start..end];
    let (kind, expression) = body.split_once(':')?;
    if kind.trim() != "javascript" || expression.trim().is_empty() {
        return None;
    }
    Some((
        Token::Script {
            expression: expression.trim().to_string(),
            raw: dollar..end + 1,
        },
        end + 1,
    ))
}

impl WebContext {
    /// Expand every placeholder in `text`.
    ///
    /// Resolution errors propagate; a name that re-enters its own expansion
    /// fails with `CircularReference`.
    pub fn interpolate<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            if !text.contains('$') {
                return Ok(text.to_string());
            }
            self.render(text, TEMPLATE_CACHE.tokenize(text)).await
        }
        .boxed()
    }

    fn render<'a>(
        &'a self,
        text: &'a str,
        tokens: Arc<Vec<Token>>,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let mut result = String::with_capacity(text.len() + 32);

            for token in tokens.iter() {
                match token {
                    Token::Literal(range) => result.push_str(&text[range.clone()]),
                    Token::Name(name) => {
                        let value = self.expand_bound(name).await?;
                        result.push_str(&value);
                    }
                    Token::Script { expression, raw } => {
                        match self.evaluate_script(expression).await {
                            Ok(value) => result.push_str(&value),
                            Err(_) => result.push_str(&text[raw.clone()]),
                        }
                    }
                }
            }

            trace!(template = text, resolved = %result, "interpolated");
            Ok(result)
        }
        .boxed()
    }

    /// Resolve `name` and expand placeholders inside its value, with `name`
    /// marked as in progress for the whole expansion.
    ///
    /// Resolved values are page or script output, so they bypass the cache.
    fn expand_bound<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            let _guard = self.enter_expansion(name)?;
            let value: Dynamic = self.lookup_bound_value(name).await?;
            match value {
                Ok(value) if value.contains('$') => {
                    let tokens = Arc::new(tokenize(&value));
                    self.render(&value, tokens).await
                }
                Ok(value) => Ok(value),
                Err(placeholder) => Ok(placeholder.to_string()),
            }
        }
        .boxed()
    }
}
