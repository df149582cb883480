//! Clothing replacement inside `(... woman is wearing ...)` phrases.

use crate::lexicon::{Lexicon, pick};
use crate::substitute::{Rewrite, Tally};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::trace;

/// Tally key for clothing replacements.
pub const CLOTHES_KEY: &str = "clothes";

/// `(` optional qualifier `woman is wearing` free text `)`, no nested brackets.
static WEARING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(((?:\w+\s+)?woman\s+is\s+wearing\s+[^()]+)\)").unwrap()
});

/// Which vocabulary a found item is replaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Upper,
    Lower,
}

/// Swaps one garment for another of the same kind.
#[derive(Debug, Clone)]
pub struct ClothingSubstituter {
    upper: Vec<String>,
    lower: Vec<String>,
}

impl ClothingSubstituter {
    /// Takes the clothing vocabularies from a lexicon.
    #[must_use]
    pub fn new(lexicon: &Lexicon) -> Self {
        Self {
            upper: lexicon.upper_clothing.words().map(str::to_string).collect(),
            lower: lexicon.lower_clothing.words().map(str::to_string).collect(),
        }
    }

    fn items(&self, side: Side) -> &[String] {
        match side {
            Side::Upper => &self.upper,
            Side::Lower => &self.lower,
        }
    }

    /// Finds the first item to replace in the lowercased phrase.
    ///
    /// Items unique to upper clothing win over items unique to lower
    /// clothing; items on both lists come last. Each list is searched in
    /// vocabulary order, and an item with no alternative is passed over.
    fn locate<R: Rng + ?Sized>(&self, hay: &str, rng: &mut R) -> Option<(usize, usize, Side)> {
        let lowered = |items: &[String]| -> BTreeSet<String> {
            items.iter().map(|i| i.to_ascii_lowercase()).collect()
        };
        let upper_set = lowered(&self.upper);
        let lower_set = lowered(&self.lower);

        let has_alternative = |side: Side, item: &str| {
            self.items(side)
                .iter()
                .any(|other| other.to_ascii_lowercase() != item)
        };

        for (side, other) in [(Side::Upper, &lower_set), (Side::Lower, &upper_set)] {
            for item in self.items(side) {
                let item = item.to_ascii_lowercase();
                if other.contains(&item) || !has_alternative(side, &item) {
                    continue;
                }
                if let Some(idx) = hay.find(&item) {
                    return Some((idx, item.len(), side));
                }
            }
        }

        for item in &self.upper {
            let item = item.to_ascii_lowercase();
            if !lower_set.contains(&item) {
                continue;
            }
            let Some(idx) = hay.find(&item) else {
                continue;
            };
            let side = if rng.random_bool(0.5) {
                Side::Upper
            } else {
                Side::Lower
            };
            if has_alternative(side, &item) {
                return Some((idx, item.len(), side));
            }
        }

        None
    }

    /// Replaces one clothing item in the first matching phrase of `text`.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        let Some(inner) = WEARING.captures(text).and_then(|caps| caps.get(1)) else {
            return Rewrite::unchanged(text);
        };
        let hay = inner.as_str().to_ascii_lowercase();

        let Some((idx, len, side)) = self.locate(&hay, rng) else {
            trace!(phrase = inner.as_str(), "no known clothing item");
            return Rewrite::unchanged(text);
        };

        let current = &hay[idx..idx + len];
        let choices: Vec<&str> = self
            .items(side)
            .iter()
            .map(String::as_str)
            .filter(|item| item.to_ascii_lowercase() != current)
            .collect();
        let Some(replacement) = pick(&choices, rng) else {
            return Rewrite::unchanged(text);
        };

        let start = inner.start() + idx;
        let end = start + len;
        trace!(from = &text[start..end], to = replacement, ?side, "clothing swap");

        let mut out = String::with_capacity(text.len() + replacement.len());
        out.push_str(&text[..start]);
        out.push_str(replacement);
        out.push_str(&text[end..]);

        let mut tally = Tally::default();
        tally.record(CLOTHES_KEY);
        Rewrite {
            text: out,
            tally,
            changed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::tests::sample_lexicon;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn apply(text: &str, seed: u64) -> Rewrite {
        ClothingSubstituter::new(&sample_lexicon()).apply(text, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let text = "(woman is wearing a red jeans and a hat)";
        let first = apply(text, 42);
        let second = apply(text, 42);
        assert_eq!(first, second);
        assert!(first.changed);
        assert_eq!(first.tally.get(CLOTHES_KEY), 1);
        assert!(
            first.text == "(woman is wearing a red tank top and a hat)"
                || first.text == "(woman is wearing a red hat and a hat)"
        );
    }

    #[test]
    fn test_upper_only_item_wins() {
        for seed in 0..10 {
            let rewrite = apply("(woman is wearing a thong and jeans)", seed);
            assert!(rewrite.text.starts_with("(woman is wearing a thong and "));
            assert!(!rewrite.text.contains("jeans"));
        }
    }

    #[test]
    fn test_lower_only_item() {
        for seed in 0..10 {
            let rewrite = apply("(sleeping woman is wearing a skirt)", seed);
            assert!(rewrite.changed);
            assert!(
                rewrite.text == "(sleeping woman is wearing a thong)"
                    || rewrite.text == "(sleeping woman is wearing a hat)"
            );
        }
    }

    #[test]
    fn test_shared_item_uses_either_list() {
        let mut seen_upper = false;
        let mut seen_lower = false;
        for seed in 0..64 {
            let rewrite = apply("(woman is wearing a hat)", seed);
            assert!(rewrite.changed);
            assert!(!rewrite.text.contains("hat"));
            seen_upper |= rewrite.text.contains("jeans") || rewrite.text.contains("tank top");
            seen_lower |= rewrite.text.contains("thong") || rewrite.text.contains("skirt");
        }
        assert!(seen_upper && seen_lower);
    }

    #[test]
    fn test_case_insensitive_item() {
        let rewrite = apply("(Woman is wearing JEANS)", 3);
        assert!(rewrite.changed);
        assert!(!rewrite.text.contains("JEANS"));
    }

    #[test]
    fn test_unchanged_without_item_or_template() {
        assert_eq!(
            apply("(woman is wearing a scarf)", 1),
            Rewrite::unchanged("(woman is wearing a scarf)")
        );
        assert_eq!(
            apply("she is wearing jeans", 1),
            Rewrite::unchanged("she is wearing jeans")
        );
        assert!(!apply("(woman is wearing (blue) jeans)", 1).changed);
    }

    #[test]
    fn test_only_first_phrase_is_considered() {
        let rewrite = apply("(woman is wearing jeans), (woman is wearing jeans)", 5);
        assert!(rewrite.changed);
        assert!(rewrite.text.ends_with(", (woman is wearing jeans)"));
        assert!(!rewrite.text.starts_with("(woman is wearing jeans)"));
    }
}
