//! Path pattern compilation and matching.
//!
//! A [`PathPattern`] is compiled once at registration time from a string
//! pattern made of literal segments, named parameters (`:name`) and
//! wildcards (`*`). Compilation is deterministic: the same pattern and
//! options always produce the same matcher and the same parameter-name list.
//!
//! Two fast paths bypass the compiled matcher entirely:
//!
//! - `*` matches any path with no named parameters;
//! - `/` as a prefix pattern matches any path and captures the full
//!   remaining path as positional parameter `"0"`.

use percent_encoding::percent_decode_str;
use regex::Regex;
use viaduct_core::{DispatchError, DispatchResult, Params};

/// Options controlling how a pattern is compiled.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Match path segments case-sensitively.
    pub case_sensitive: bool,
    /// Require trailing slashes to match exactly.
    pub strict: bool,
    /// Match the whole path (`true`) or a prefix ending at a segment
    /// boundary (`false`).
    pub end: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strict: false,
            end: true,
        }
    }
}

/// The immutable result of a successful match.
///
/// Produced fresh for every match call; never retained on the pattern or
/// layer, so concurrent requests cannot observe each other's matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The sub-path consumed by the match.
    pub path: String,
    /// Decoded named parameters in capture order.
    pub params: Params,
}

#[derive(Debug)]
enum PatternKind {
    /// `*`: matches everything, consumes nothing.
    MatchAll,
    /// `/` as a prefix: matches everything, consumes the full path.
    MatchRoot,
    Compiled { regex: Regex, end: bool },
}

/// A compiled path pattern.
///
/// # Example
///
/// ```
/// use viaduct_router::{MatchOptions, PathPattern};
///
/// let pattern = PathPattern::compile("/users/:id", MatchOptions::default());
/// let m = pattern.matches("/users/42").unwrap().unwrap();
/// assert_eq!(m.path, "/users/42");
/// assert_eq!(m.params.get("id"), Some("42"));
/// ```
#[derive(Debug)]
pub struct PathPattern {
    source: String,
    kind: PatternKind,
    keys: Vec<String>,
}

impl PathPattern {
    /// Compiles a pattern string with the given options.
    #[must_use]
    pub fn compile(path: &str, options: MatchOptions) -> Self {
        if path == "*" {
            return Self {
                source: path.to_string(),
                kind: PatternKind::MatchAll,
                keys: Vec::new(),
            };
        }
        if (path == "/" || path.is_empty()) && !options.end {
            return Self {
                source: path.to_string(),
                kind: PatternKind::MatchRoot,
                keys: vec!["0".to_string()],
            };
        }

        let mut body = String::new();
        let mut keys = Vec::new();
        let mut wildcards = 0usize;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = segment.strip_prefix(':') {
                keys.push(name.to_string());
                body.push_str("/([^/]+)");
            } else if segment == "*" {
                keys.push(wildcards.to_string());
                wildcards += 1;
                body.push_str("/?(.*)");
            } else {
                body.push('/');
                body.push_str(&regex::escape(segment));
            }
        }
        if options.strict && (body.is_empty() || path.ends_with('/')) {
            body.push('/');
        }

        let mut source = String::new();
        if !options.case_sensitive {
            source.push_str("(?i)");
        }
        source.push('^');
        source.push_str(&body);
        if options.end {
            if !options.strict {
                source.push_str("/?");
            }
            source.push('$');
        }

        // Built from escaped literals and fixed fragments; cannot fail.
        let regex = Regex::new(&source).expect("generated pattern is valid");
        Self {
            source: path.to_string(),
            kind: PatternKind::Compiled {
                regex,
                end: options.end,
            },
            keys,
        }
    }

    /// The pattern string this matcher was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The named parameters this pattern extracts, in capture order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Attempts to match a path.
    ///
    /// Returns `Ok(None)` on a structural mismatch. A malformed
    /// percent-encoding in a captured value is an error identifying the
    /// offending raw capture, not a silent mismatch.
    pub fn matches(&self, path: &str) -> DispatchResult<Option<PathMatch>> {
        match &self.kind {
            PatternKind::MatchAll => Ok(Some(PathMatch {
                path: String::new(),
                params: Params::new(),
            })),
            PatternKind::MatchRoot => {
                let mut params = Params::new();
                params.push("0", decode_param(path)?);
                Ok(Some(PathMatch {
                    path: path.to_string(),
                    params,
                }))
            }
            PatternKind::Compiled { regex, end } => {
                let Some(caps) = regex.captures(path) else {
                    return Ok(None);
                };
                // Anchored at ^, so the overall match starts at zero.
                let overall = caps.get(0).map_or("", |m| m.as_str());
                if !end {
                    // A prefix match must stop at a segment boundary.
                    match path.as_bytes().get(overall.len()) {
                        None | Some(b'/') | Some(b'.') => {}
                        Some(_) => return Ok(None),
                    }
                }
                let mut params = Params::new();
                for (i, key) in self.keys.iter().enumerate() {
                    if let Some(value) = caps.get(i + 1) {
                        params.push(key.clone(), decode_param(value.as_str())?);
                    }
                }
                Ok(Some(PathMatch {
                    path: overall.to_string(),
                    params,
                }))
            }
        }
    }
}

/// Decodes a captured path value as a URI component.
fn decode_param(raw: &str) -> DispatchResult<String> {
    if !raw.contains('%') {
        return Ok(raw.to_string());
    }
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return Err(DispatchError::decode(raw));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| DispatchError::decode(raw))
}
