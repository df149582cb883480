//! Context-sensitive word substitution for the vocabulary categories.

use crate::error::Result;
use crate::lexicon::{Lexicon, Vocabulary};
use rand::Rng;
use regex::{Match, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Characters of text after a match examined by the context rules.
const TRAILING_WINDOW: usize = 48;

/// Characters of text before a match examined by the context rules.
const LEADING_WINDOW: usize = 25;

/// Replacement counts keyed by the lowercased original token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tally(BTreeMap<String, usize>);

impl Tally {
    /// Counts one replacement of `key`.
    pub fn record(&mut self, key: impl Into<String>) {
        self.add(key, 1);
    }

    /// Counts `n` replacements of `key`.
    pub fn add(&mut self, key: impl Into<String>, n: usize) {
        *self.0.entry(key.into()).or_default() += n;
    }

    /// Count for `key`, zero if never recorded.
    #[must_use]
    pub fn get(&self, key: &str) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds every count of `other` into this tally.
    pub fn merge(&mut self, other: &Self) {
        for (key, n) in &other.0 {
            self.add(key.clone(), *n);
        }
    }

    /// Entries ordered by count, highest first, ties by key.
    #[must_use]
    pub fn most_common(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, n)| (k.as_str(), *n))
    }
}

impl FromIterator<String> for Tally {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut tally, key| {
            tally.record(key);
            tally
        })
    }
}

/// Result of one substitution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Rewritten text
    pub text: String,
    /// Replacements performed
    pub tally: Tally,
    /// Whether any replacement was made
    pub changed: bool,
}

impl Rewrite {
    /// A rewrite that leaves `text` as it was.
    #[must_use]
    pub fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tally: Tally::default(),
            changed: false,
        }
    }
}

/// Applies the casing of `original` to `replacement`.
///
/// All-uppercase stays uppercase, a capitalized word stays capitalized,
/// anything else becomes lowercase.
#[must_use]
pub fn preserve_case(original: &str, replacement: &str) -> String {
    let has_upper = |s: &str| s.chars().any(char::is_uppercase);
    let has_lower = |s: &str| s.chars().any(char::is_lowercase);

    if has_upper(original) && !has_lower(original) {
        return replacement.to_uppercase();
    }

    let mut chars = original.chars();
    let first_upper = chars.next().is_some_and(char::is_uppercase);
    let rest = chars.as_str();
    if first_upper && has_lower(rest) && !has_upper(rest) {
        let mut out = String::with_capacity(replacement.len());
        let mut rchars = replacement.chars();
        if let Some(first) = rchars.next() {
            out.extend(first.to_uppercase());
        }
        out.push_str(&rchars.as_str().to_lowercase());
        return out;
    }

    replacement.to_lowercase()
}

/// The four word-level passes, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordPass {
    /// Garment colors, routed to mask colors near a mouth covering
    Color,
    /// Hair colors directly before the hair word
    HairColor,
    /// Hair styles directly after the hair word
    HairStyle,
    /// Materials, routed to mouth-mask materials before a mouth covering
    Material,
}

impl WordPass {
    /// Every word pass in application order.
    pub const ALL: [Self; 4] = [Self::Color, Self::HairColor, Self::HairStyle, Self::Material];

    /// Short name used by the CLI and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::HairColor => "hair-color",
            Self::HairStyle => "hair-style",
            Self::Material => "material",
        }
    }
}

impl fmt::Display for WordPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Eligibility and routing for one pass.
#[derive(Debug, Clone)]
enum Rule {
    Color {
        hair_colors: Vocabulary,
        hair_after: Regex,
        near_mask: Regex,
        mask_colors: Vocabulary,
    },
    HairColor {
        hair_after: Regex,
    },
    HairStyle {
        hair_before: Regex,
    },
    Material {
        before_mask: Regex,
        mask_materials: Vocabulary,
    },
}

/// One compiled word pass.
#[derive(Debug, Clone)]
pub struct WordSubstituter {
    pass: WordPass,
    pattern: Option<Regex>,
    pool: Vocabulary,
    rule: Rule,
}

impl WordSubstituter {
    /// Compiles a pass against a lexicon.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if a
    /// generated pattern does not compile.
    pub fn new(pass: WordPass, lexicon: &Lexicon) -> Result<Self> {
        let hair = regex::escape(&lexicon.context.hair);
        let mask = regex::escape(&lexicon.context.mouth_covering);
        let hair_after = || Regex::new(&format!(r"(?i)^\s+{hair}\b"));

        let (pool, rule) = match pass {
            WordPass::Color => (
                lexicon.color.clone(),
                Rule::Color {
                    hair_colors: lexicon.hair_color.clone(),
                    hair_after: hair_after()?,
                    near_mask: Regex::new(&format!(r"(?i)^\s*(?:[a-z_]+\s+){{0,2}}{mask}\b"))?,
                    mask_colors: lexicon.mask_color.clone(),
                },
            ),
            WordPass::HairColor => (
                lexicon.hair_color.clone(),
                Rule::HairColor {
                    hair_after: hair_after()?,
                },
            ),
            WordPass::HairStyle => (
                lexicon.hair_style.clone(),
                Rule::HairStyle {
                    hair_before: Regex::new(&format!(r"(?i){hair}\s+$"))?,
                },
            ),
            WordPass::Material => (
                lexicon.material.clone(),
                Rule::Material {
                    before_mask: Regex::new(&format!(r"(?i)^\s*{mask}\b"))?,
                    mask_materials: lexicon.mouth_mask_material.clone(),
                },
            ),
        };

        Ok(Self {
            pass,
            pattern: word_pattern(&pool)?,
            pool,
            rule,
        })
    }

    /// Which pass this is.
    #[must_use]
    pub const fn pass(&self) -> WordPass {
        self.pass
    }

    /// Decides the replacement for one match.
    ///
    /// Returns the cased replacement and the tally key, or `None` when the
    /// context makes the match ineligible.
    fn decide<R: Rng + ?Sized>(
        &self,
        text: &str,
        found: Match<'_>,
        rng: &mut R,
    ) -> Option<(String, String)> {
        let original = found.as_str();
        let after = trailing_window(text, found.end());

        let pool = match &self.rule {
            Rule::Color {
                hair_colors,
                hair_after,
                near_mask,
                mask_colors,
            } => {
                if hair_colors.contains_ignore_case(original) && hair_after.is_match(after) {
                    return None;
                }
                if near_mask.is_match(after) {
                    mask_colors
                } else {
                    &self.pool
                }
            }
            Rule::HairColor { hair_after } => {
                if !hair_after.is_match(after) {
                    return None;
                }
                &self.pool
            }
            Rule::HairStyle { hair_before } => {
                if !hair_before.is_match(leading_window(text, found.start())) {
                    return None;
                }
                &self.pool
            }
            Rule::Material {
                before_mask,
                mask_materials,
            } => {
                if before_mask.is_match(after) {
                    mask_materials
                } else {
                    &self.pool
                }
            }
        };

        let choice = pool.choose(rng)?;
        Some((preserve_case(original, choice), original.to_lowercase()))
    }

    /// Runs the pass over `text`.
    ///
    /// Matches are found on the input and judged against the input's
    /// context, left to right.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        let Some(pattern) = &self.pattern else {
            return Rewrite::unchanged(text);
        };

        let mut out = String::with_capacity(text.len());
        let mut keys = Vec::new();
        let mut last = 0;

        for found in pattern.find_iter(text) {
            let Some((replacement, key)) = self.decide(text, found, rng) else {
                continue;
            };
            out.push_str(&text[last..found.start()]);
            out.push_str(&replacement);
            last = found.end();
            keys.push(key);
        }
        out.push_str(&text[last..]);

        let tally: Tally = keys.into_iter().collect();
        Rewrite {
            text: out,
            changed: !tally.is_empty(),
            tally,
        }
    }
}

/// Whole-word, case-insensitive alternation over the non-empty entries.
fn word_pattern(vocabulary: &Vocabulary) -> Result<Option<Regex>> {
    let mut words: Vec<&str> = vocabulary.words().collect();
    if words.is_empty() {
        return Ok(None);
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    words.dedup();
    let alternation = words
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Ok(Some(Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))?))
}

fn trailing_window(text: &str, end: usize) -> &str {
    let rest = &text[end..];
    rest.char_indices()
        .nth(TRAILING_WINDOW)
        .map_or(rest, |(i, _)| &rest[..i])
}

fn leading_window(text: &str, start: usize) -> &str {
    let head = &text[..start];
    head.char_indices()
        .rev()
        .nth(LEADING_WINDOW - 1)
        .map_or(head, |(i, _)| &head[i..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::ContextWords;
    use crate::lexicon::tests::sample_lexicon;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn run(pass: WordPass, text: &str, seed: u64) -> Rewrite {
        let substituter = WordSubstituter::new(pass, &sample_lexicon()).unwrap();
        substituter.apply(text, &mut StdRng::seed_from_u64(seed))
    }

    fn is_color(word: &str) -> bool {
        sample_lexicon().color.contains_ignore_case(word)
    }

    #[test]
    fn test_preserve_case() {
        assert_eq!(preserve_case("RED", "dark blue"), "DARK BLUE");
        assert_eq!(preserve_case("Red", "dark Blue"), "Dark blue");
        assert_eq!(preserve_case("red", "Blue"), "blue");
        assert_eq!(preserve_case("rEd", "Blue"), "blue");
        assert_eq!(preserve_case("R", "blue"), "BLUE");
    }

    #[test]
    fn test_text_without_vocabulary_is_unchanged() {
        for pass in WordPass::ALL {
            let rewrite = run(pass, "a quiet garden at dusk", 1);
            assert_eq!(rewrite.text, "a quiet garden at dusk");
            assert!(rewrite.tally.is_empty());
            assert!(!rewrite.changed);
        }
    }

    #[test]
    fn test_color_casing_and_tally() {
        let rewrite = run(WordPass::Color, "RED, Red, red", 3);
        let words: Vec<&str> = rewrite.text.split(", ").collect();
        assert_eq!(words.len(), 3);
        assert!(words.iter().all(|w| is_color(w)));
        assert_eq!(words[0], words[0].to_uppercase());
        assert!(words[1].starts_with(|c: char| c.is_uppercase()));
        assert_eq!(words[1][1..], words[1][1..].to_lowercase());
        assert_eq!(words[2], words[2].to_lowercase());
        assert_eq!(rewrite.tally.get("red"), 3);
        assert!(rewrite.changed);
    }

    #[test]
    fn test_color_skips_hair_colors_before_hair() {
        let rewrite = run(WordPass::Color, "brown hair and a brown dress", 5);
        assert!(rewrite.text.starts_with("brown hair and a "));
        assert_eq!(rewrite.tally.get("brown"), 1);
        assert!(rewrite.text.ends_with(" dress"));
    }

    #[test]
    fn test_color_near_mouth_covering_uses_mask_colors() {
        let lexicon = sample_lexicon();
        for seed in 0..10 {
            let rewrite = run(WordPass::Color, "a red lace mouth_mask", seed);
            let word = rewrite.text.split(' ').nth(1).unwrap();
            assert!(lexicon.mask_color.contains_ignore_case(word), "{word}");
        }
    }

    #[test]
    fn test_hair_color_requires_hair_after() {
        let rewrite = run(WordPass::HairColor, "blonde hair, blonde dress", 2);
        assert!(rewrite.text.ends_with(" hair, blonde dress"));
        assert_eq!(rewrite.tally.get("blonde"), 1);
    }

    #[test]
    fn test_hair_style_requires_hair_before() {
        let rewrite = run(WordPass::HairStyle, "long wavy hair up in a high ponytail", 4);
        assert!(rewrite.changed);
        assert!(rewrite.text.starts_with("long wavy hair "));
        assert_eq!(rewrite.tally.get("up in a high ponytail"), 1);

        let rewrite = run(WordPass::HairStyle, "she is up in a high ponytail", 4);
        assert!(!rewrite.changed);
    }

    #[test]
    fn test_material_before_mouth_covering() {
        let lexicon = sample_lexicon();
        for seed in 0..10 {
            let rewrite = run(WordPass::Material, "satin mouth_mask, satin dress", seed);
            let (mask, dress) = rewrite.text.split_once(", ").unwrap();
            let mask_word = mask.strip_suffix(" mouth_mask").unwrap();
            let dress_word = dress.strip_suffix(" dress").unwrap();
            assert!(lexicon.mouth_mask_material.contains_ignore_case(mask_word));
            assert!(!mask_word.is_empty());
            assert!(lexicon.material.contains_ignore_case(dress_word));
            assert_eq!(rewrite.tally.get("satin"), 2);
        }
    }

    #[test]
    fn test_custom_context_words() {
        let lexicon = sample_lexicon().with_context(ContextWords {
            hair: "locks".to_string(),
            mouth_covering: "veil".to_string(),
        });
        let mut rng = StdRng::seed_from_u64(6);

        let hair = WordSubstituter::new(WordPass::HairColor, &lexicon).unwrap();
        let rewrite = hair.apply("blonde locks, blonde hair", &mut rng);
        assert_eq!(rewrite.tally.get("blonde"), 1);
        assert!(rewrite.text.ends_with(" locks, blonde hair"));

        let material = WordSubstituter::new(WordPass::Material, &lexicon).unwrap();
        let rewrite = material.apply("satin veil", &mut rng);
        let word = rewrite.text.strip_suffix(" veil").unwrap();
        assert!(lexicon.mouth_mask_material.contains_ignore_case(word));
    }

    #[test]
    fn test_same_seed_same_result() {
        let text = "a black dress, a Blue hat and BROWN boots";
        let a = run(WordPass::Color, text, 99);
        let b = run(WordPass::Color, text, 99);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_vocabulary_matches_nothing() {
        let mut lexicon = sample_lexicon();
        lexicon.color = Vocabulary::default();
        let substituter = WordSubstituter::new(WordPass::Color, &lexicon).unwrap();
        let rewrite = substituter.apply("red", &mut StdRng::seed_from_u64(0));
        assert_eq!(rewrite, Rewrite::unchanged("red"));
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let text = format!("{} red {}", "é".repeat(30), "é".repeat(60));
        let start = text.find("red").unwrap();
        assert_eq!(leading_window(&text, start).chars().count(), LEADING_WINDOW);
        assert_eq!(
            trailing_window(&text, start + 3).chars().count(),
            TRAILING_WINDOW
        );
    }

    #[test]
    fn test_tally_fold_and_ordering() {
        let mut tally: Tally = ["red", "blue", "red"].map(String::from).into_iter().collect();
        tally.merge(&["blue", "blue"].map(String::from).into_iter().collect());
        assert_eq!(tally.total(), 5);
        assert_eq!(tally.most_common(), vec![("blue", 3), ("red", 2)]);
    }
}
