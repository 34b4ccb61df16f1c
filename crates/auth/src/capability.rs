//! Capability tokens and the aggregated capability set.
//!
//! A capability token is a permission atom of the form
//! `"<resource>.<action>[.<scope>]"`, e.g. `"employee.read.own"`. Tokens are
//! case-sensitive and immutable; a principal's capabilities form a set
//! (deduplicated, order irrelevant).
//!
//! # Grammar
//!
//! ```text
//! token    := resource "." action [ "." scope ]
//! resource := segment
//! action   := segment
//! segment  := [a-z0-9_-]+
//! scope    := "all" | "supervised" | "own"
//! ```
//!
//! Parsing failures are configuration errors, never silently ignored.
//!
//! The client performs no scope evaluation against actual resource
//! ownership; `own`/`supervised` are resolved by the backend oracle. The
//! scope-widened [`CapabilitySet::satisfies`] check exists only for the
//! local fast-reject and navigation paths, where it may deny early but can
//! never grant more than the oracle would.

use core::str::FromStr;
use std::collections::HashSet;

use serde::{Deserialize, Serialize, de};
use thiserror::Error;

use peopleops_core::ConfigurationError;

// ─────────────────────────────────────────────────────────────────────────────
// Scope
// ─────────────────────────────────────────────────────────────────────────────

/// Relationship qualifier narrowing a token to specific resource instances.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Applies to every instance of the resource.
    All,
    /// Applies to instances belonging to principals the holder supervises.
    Supervised,
    /// Applies only to the holder's own instances.
    Own,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Supervised => "supervised",
            Scope::Own => "own",
        }
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Scope::All),
            "supervised" => Ok(Scope::Supervised),
            "own" => Ok(Scope::Own),
            other => Err(CapabilityParseError::InvalidScope(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CapabilityToken
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityParseError {
    #[error("empty capability token")]
    Empty,

    #[error("token '{0}' must have the form resource.action[.scope]")]
    MissingAction(String),

    #[error("token '{0}' has too many segments")]
    TooManySegments(String),

    #[error("segment '{0}' contains characters outside [a-z0-9_-]")]
    InvalidSegment(String),

    #[error("unknown scope '{0}' (expected all, supervised or own)")]
    InvalidScope(String),
}

impl From<CapabilityParseError> for ConfigurationError {
    fn from(value: CapabilityParseError) -> Self {
        ConfigurationError::invalid_capability(value.to_string())
    }
}

/// A single permission atom.
///
/// Construct with [`CapabilityToken::new`] / [`with_scope`](Self::with_scope)
/// in static configuration and via [`FromStr`] for wire strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityToken {
    resource: String,
    action: String,
    scope: Option<Scope>,
}

impl CapabilityToken {
    /// Unscoped token (`resource.action`).
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            scope: None,
        }
    }

    /// Scoped token (`resource.action.scope`).
    pub fn with_scope(resource: impl Into<String>, action: impl Into<String>, scope: Scope) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            scope: Some(scope),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    /// The same `resource.action` with a different scope qualifier.
    fn rescoped(&self, scope: Option<Scope>) -> Self {
        Self {
            resource: self.resource.clone(),
            action: self.action.clone(),
            scope,
        }
    }

    /// Whether holding `self` satisfies a requirement for `required`,
    /// ignoring actual resource ownership.
    ///
    /// - a requirement without scope is met by any scope variant;
    /// - a scoped requirement is met by the exact scope, by `all`, or by an
    ///   unqualified grant of the same `resource.action`.
    pub fn grants(&self, required: &CapabilityToken) -> bool {
        if self.resource != required.resource || self.action != required.action {
            return false;
        }
        match (self.scope, required.scope) {
            (_, None) => true,
            (None, Some(_)) => true,
            (Some(Scope::All), Some(_)) => true,
            (Some(held), Some(needed)) => held == needed,
        }
    }
}

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl FromStr for CapabilityToken {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CapabilityParseError::Empty);
        }

        let segments: Vec<&str> = s.split('.').collect();
        let (resource, action, scope) = match segments.as_slice() {
            [_] => return Err(CapabilityParseError::MissingAction(s.to_string())),
            [resource, action] => (*resource, *action, None),
            [resource, action, scope] => (*resource, *action, Some(Scope::from_str(scope)?)),
            _ => return Err(CapabilityParseError::TooManySegments(s.to_string())),
        };

        for segment in [resource, action] {
            if !valid_segment(segment) {
                return Err(CapabilityParseError::InvalidSegment(segment.to_string()));
            }
        }

        Ok(Self {
            resource: resource.to_string(),
            action: action.to_string(),
            scope,
        })
    }
}

impl core::fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{}.{}.{}", self.resource, self.action, scope),
            None => write!(f, "{}.{}", self.resource, self.action),
        }
    }
}

impl Serialize for CapabilityToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CapabilityToken {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CapabilitySet
// ─────────────────────────────────────────────────────────────────────────────

/// A principal's aggregated capability tokens.
///
/// Set semantics: deduplicated, order irrelevant. Always the union across
/// all held roles; the identity endpoint returns the aggregate and this type
/// never re-derives per-role sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    tokens: HashSet<CapabilityToken>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of wire strings into a set, deduplicating.
    pub fn parse(raw: &[String]) -> Result<Self, CapabilityParseError> {
        let mut tokens = HashSet::with_capacity(raw.len());
        for s in raw {
            tokens.insert(s.parse()?);
        }
        Ok(Self { tokens })
    }

    /// Exact membership check.
    pub fn contains(&self, token: &CapabilityToken) -> bool {
        self.tokens.contains(token)
    }

    /// Scope-widened membership: does any held token grant `required`?
    ///
    /// Constant-time: probes the exact token, the unqualified variant and
    /// the widening scope variants instead of scanning the set.
    pub fn satisfies(&self, required: &CapabilityToken) -> bool {
        if self.tokens.contains(required) {
            return true;
        }
        // An unqualified grant covers every scoped requirement and vice
        // versa an `all` grant covers every qualified one.
        if self.tokens.contains(&required.rescoped(None)) {
            return true;
        }
        if self.tokens.contains(&required.rescoped(Some(Scope::All))) {
            return true;
        }
        if required.scope().is_none() {
            return self.tokens.contains(&required.rescoped(Some(Scope::Supervised)))
                || self.tokens.contains(&required.rescoped(Some(Scope::Own)));
        }
        false
    }

    pub fn satisfies_any(&self, required: &[CapabilityToken]) -> bool {
        required.iter().any(|t| self.satisfies(t))
    }

    pub fn satisfies_all(&self, required: &[CapabilityToken]) -> bool {
        required.iter().all(|t| self.satisfies(t))
    }

    pub fn insert(&mut self, token: CapabilityToken) -> bool {
        self.tokens.insert(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityToken> {
        self.tokens.iter()
    }
}

impl FromIterator<CapabilityToken> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityToken>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}
