//! Camera-angle replacement filtered by guards and body focus.

use crate::error::Result;
use crate::guard::GuardedLiteral;
use crate::lexicon::{CameraCatalog, FocusKeywords, FocusReach, Lexicon, pick};
use crate::substitute::{Rewrite, Tally};
use rand::Rng;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::{debug, trace};

/// Tally key for camera replacements.
pub const CAMERA_KEY: &str = "camera";

/// Coarse body focus inferred from keyword mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyFocus {
    /// Only upper-body keywords present
    Upper,
    /// Both or neither present
    Full,
    /// Only lower-body keywords present
    Lower,
}

impl BodyFocus {
    /// Combines keyword presence into a focus class.
    #[must_use]
    pub const fn from_presence(upper: bool, lower: bool) -> Self {
        match (upper, lower) {
            (true, false) => Self::Upper,
            (false, true) => Self::Lower,
            _ => Self::Full,
        }
    }

    /// Whether a placeholder value with `reach` may be used under this focus.
    #[must_use]
    pub const fn permits(self, reach: FocusReach) -> bool {
        !matches!(
            (self, reach),
            (Self::Upper, FocusReach::LowerOnly) | (Self::Lower, FocusReach::UpperOnly)
        )
    }
}

/// Replaces the first camera phrase in a text with another eligible one.
#[derive(Debug, Clone)]
pub struct CameraSubstituter {
    catalog: CameraCatalog,
    phrases: Option<Regex>,
    parametric: Vec<Regex>,
    upper: Option<Regex>,
    lower: Option<Regex>,
}

impl CameraSubstituter {
    /// Compiles phrase and keyword detectors for a lexicon.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if a
    /// generated pattern does not compile.
    pub fn new(lexicon: &Lexicon) -> Result<Self> {
        let catalog = lexicon.camera.clone();

        let mut literals: Vec<&str> = unique_ignore_case(catalog.phrases());
        literals.sort_by(|a, b| b.len().cmp(&a.len()));
        let parametric_sources: Vec<String> =
            catalog.parametric.iter().map(|p| p.pattern()).collect();

        let alternatives: Vec<String> = literals
            .into_iter()
            .map(regex::escape)
            .chain(parametric_sources.iter().cloned())
            .collect();
        let phrases = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?)
        };

        let parametric = parametric_sources
            .iter()
            .map(|source| Regex::new(&format!("(?i)^(?:{source})")))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let FocusKeywords { upper, lower } = &lexicon.focus_keywords;
        Ok(Self {
            catalog,
            phrases,
            parametric,
            upper: keyword_pattern(upper)?,
            lower: keyword_pattern(lower)?,
        })
    }

    /// Classifies the body focus of `text`.
    #[must_use]
    pub fn classify(&self, text: &str) -> BodyFocus {
        let present = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(text));
        BodyFocus::from_presence(present(&self.upper), present(&self.lower))
    }

    /// Byte span of the earliest camera phrase, preferring the longest at that start.
    #[must_use]
    pub fn find_phrase(&self, text: &str) -> Option<Range<usize>> {
        let found = self.phrases.as_ref()?.find(text)?;
        let start = found.start();
        let rest = &text[start..];
        let end = self
            .parametric
            .iter()
            .filter_map(|re| re.find(rest))
            .map(|m| start + m.end())
            .fold(found.end(), usize::max);
        Some(start..end)
    }

    fn is_allowed(&self, literal: &GuardedLiteral, text: &str, focus: BodyFocus) -> bool {
        literal.is_eligible(text)
            && literal
                .placeholder
                .as_deref()
                .is_none_or(|value| focus.permits(self.catalog.reach(value)))
    }

    /// Candidate replacements for the phrase `current` within `text`.
    fn pool<'s>(&'s self, text: &str, current: &str) -> Vec<&'s str> {
        let focus = self.classify(text);
        let eligible: Vec<&str> = self
            .catalog
            .literals
            .iter()
            .filter(|literal| self.is_allowed(literal, text, focus))
            .map(|literal| literal.text.as_str())
            .collect();

        let candidates = if eligible.is_empty() {
            debug!(?focus, "no camera phrase eligible, falling back to all phrases");
            unique_ignore_case(self.catalog.phrases())
        } else {
            unique_ignore_case(eligible)
        };

        let current = current.to_lowercase();
        candidates
            .into_iter()
            .filter(|phrase| phrase.to_lowercase() != current)
            .collect()
    }

    /// Replaces the first camera phrase in `text`.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        let Some(span) = self.find_phrase(text) else {
            return Rewrite::unchanged(text);
        };
        let current = &text[span.clone()];
        let pool = self.pool(text, current);

        let Some(replacement) = pick(&pool, rng) else {
            trace!(current, "no alternative camera phrase");
            return Rewrite::unchanged(text);
        };

        let mut out = String::with_capacity(text.len() + replacement.len());
        out.push_str(&text[..span.start]);
        out.push_str(replacement);
        out.push_str(&text[span.end..]);

        let mut tally = Tally::default();
        tally.record(CAMERA_KEY);
        Rewrite {
            text: out,
            tally,
            changed: true,
        }
    }
}

/// Non-empty phrases, first occurrence of each case-insensitive spelling.
fn unique_ignore_case<'a>(phrases: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    phrases
        .into_iter()
        .filter(|p| !p.is_empty() && seen.insert(p.to_lowercase()))
        .collect()
}

fn keyword_pattern(words: &[String]) -> Result<Option<Regex>> {
    let words: Vec<String> = words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| regex::escape(w.trim()))
        .collect();
    if words.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))?))
}
