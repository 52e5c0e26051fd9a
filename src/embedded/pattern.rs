//! Route path patterns for the embedded router.
//!
//! # Design Decisions
//! - Segment matching, no regex
//! - Literal segments are case-sensitive
//! - Empty segments are ignored, so trailing slashes do not matter
//! - A trailing `*` captures the remainder under the `*` key

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled path pattern such as `/api/orders/:id` or `/api/static/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Segment::Wildcard,
                _ => match s.strip_prefix(':') {
                    Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                    _ => Segment::Literal(s.to_string()),
                },
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a path, returning the captured params on success.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = BTreeMap::new();

        for segment in &self.segments {
            match segment {
                Segment::Wildcard => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    params.insert("*".to_string(), rest.join("/"));
                    return Some(params);
                }
                Segment::Literal(expected) => {
                    if parts.next()? != expected.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.next()?.to_string());
                }
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }
}
