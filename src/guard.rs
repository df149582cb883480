//! Substring guards mined from `find(...)` conditions and their evaluation.

use crate::config::Dialect;
use crate::error::Result;
use crate::lexer::{unescape, LITERAL_PATTERN};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Presence/absence constraints on a target text.
///
/// Comparison is case-insensitive. An empty guard is always satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    /// Substrings that must all occur
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub must_have: BTreeSet<String>,

    /// Substrings none of which may occur
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub must_not_have: BTreeSet<String>,
}

impl Guard {
    /// Creates a guard from presence and absence lists.
    #[must_use]
    pub fn new<I, J, S, T>(must_have: I, must_not_have: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            must_have: must_have.into_iter().map(Into::into).collect(),
            must_not_have: must_not_have.into_iter().map(Into::into).collect(),
        }
    }

    /// A guard satisfied only when none of `present` occurs.
    #[must_use]
    pub fn negating<'a, I>(present: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self {
            must_have: BTreeSet::new(),
            must_not_have: present.into_iter().cloned().collect(),
        }
    }

    /// Returns true if this guard never rejects anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must_have.is_empty() && self.must_not_have.is_empty()
    }

    /// ANDs another guard into this one.
    pub fn extend(&mut self, other: &Self) {
        self.must_have.extend(other.must_have.iter().cloned());
        self.must_not_have.extend(other.must_not_have.iter().cloned());
    }

    /// Evaluates the guard against `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let hay = text.to_lowercase();
        self.must_have
            .iter()
            .all(|s| hay.contains(&s.to_lowercase()))
            && !self
                .must_not_have
                .iter()
                .any(|s| hay.contains(&s.to_lowercase()))
    }
}

/// A candidate phrase and the guard active where the source emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardedLiteral {
    /// Emitted text, unescaped
    pub text: String,

    /// Conditions under which the source can emit it
    #[serde(flatten)]
    pub guard: Guard,

    /// Placeholder value spliced in when expanded from a template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl GuardedLiteral {
    /// Creates a literal from direct emission.
    #[must_use]
    pub fn new(text: impl Into<String>, guard: Guard) -> Self {
        Self {
            text: text.into(),
            guard,
            placeholder: None,
        }
    }

    /// Creates a literal expanded from `prefix + value + suffix`.
    #[must_use]
    pub fn expanded(prefix: &str, value: &str, suffix: &str, guard: Guard) -> Self {
        Self {
            text: format!("{prefix}{value}{suffix}"),
            guard,
            placeholder: Some(value.to_string()),
        }
    }

    /// Returns true if the literal may appear alongside `text`.
    #[must_use]
    pub fn is_eligible(&self, text: &str) -> bool {
        self.guard.matches(text)
    }
}

/// Turns condition source into guards.
///
/// Only `<haystack>.find("X") != npos` and `... == npos` are understood.
/// Anything else in the condition contributes no constraint.
#[derive(Debug, Clone)]
pub(crate) struct PredicateParser {
    atom: Regex,
}

impl PredicateParser {
    pub(crate) fn new(dialect: &Dialect) -> Result<Self> {
        let pattern = format!(
            r"\b{}\s*(?:\.|->)\s*find\s*\(\s*{LITERAL_PATTERN}\s*\)\s*(==|!=)\s*(?:std\s*::\s*string\s*::\s*)?npos\b",
            regex::escape(&dialect.haystack)
        );
        Ok(Self {
            atom: Regex::new(&pattern)?,
        })
    }

    pub(crate) fn parse(&self, condition: &str) -> Guard {
        let mut guard = Guard::default();
        for caps in self.atom.captures_iter(condition) {
            let needle = unescape(&caps[1]);
            if &caps[2] == "!=" {
                guard.must_have.insert(needle);
            } else {
                guard.must_not_have.insert(needle);
            }
        }
        if guard.is_empty() && !condition.trim().is_empty() {
            tracing::trace!(condition = condition.trim(), "condition carries no substring guard");
        }
        guard
    }
}
