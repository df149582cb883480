//! The immutable configuration bundle built once by extraction.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::guard::GuardedLiteral;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Semantic category of a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// General garment colors
    Color,
    /// Hair colors
    HairColor,
    /// Hair styles
    HairStyle,
    /// Fabric materials
    Material,
    /// Mouth-covering colors
    MaskColor,
    /// Mouth-covering materials
    MouthMaskMaterial,
    /// Upper-body clothing items
    UpperClothing,
    /// Lower-body clothing items
    LowerClothing,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Color,
        Self::HairColor,
        Self::HairStyle,
        Self::Material,
        Self::MaskColor,
        Self::MouthMaskMaterial,
        Self::UpperClothing,
        Self::LowerClothing,
    ];

    /// Kebab-case name used in JSON and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::HairColor => "hair-color",
            Self::HairStyle => "hair-style",
            Self::Material => "material",
            Self::MaskColor => "mask-color",
            Self::MouthMaskMaterial => "mouth-mask-material",
            Self::UpperClothing => "upper-clothing",
            Self::LowerClothing => "lower-clothing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered candidate strings for one category.
///
/// An empty entry means "no modifier": it is kept for fidelity with the
/// source list but never matched or drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary(Vec<String>);

impl Vocabulary {
    /// Builds a vocabulary, trimming every entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVocabulary`] if no entry is non-empty.
    pub fn new<I, S>(name: &str, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary = Self(
            entries
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .collect(),
        );
        if vocabulary.is_usable() {
            Ok(vocabulary)
        } else {
            Err(Error::empty_vocabulary(name))
        }
    }

    /// All entries, including empty ones.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Non-empty entries in order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str).filter(|w| !w.is_empty())
    }

    /// Returns true if at least one entry is non-empty.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.words().next().is_some()
    }

    /// Case-insensitive membership among non-empty entries.
    #[must_use]
    pub fn contains_ignore_case(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.words().any(|w| w.to_lowercase() == word)
    }

    /// Draws one non-empty entry uniformly.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        let words: Vec<&str> = self.words().collect();
        pick(&words, rng).copied()
    }
}

/// Uniform pick from a slice.
pub(crate) fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(rng.random_range(0..items.len()))
    }
}

/// Which body-focus classes a placeholder value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusReach {
    /// Only valid when the text focuses on the upper body
    UpperOnly,
    /// Only valid when the text focuses on the lower body
    LowerOnly,
    /// Valid for any focus
    Either,
}

/// A phrase emitted as `prefix + number + suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametricPhrase {
    /// Text before the number, e.g. `(high angle shot:`
    pub prefix: String,
    /// Text after the number, e.g. `)`
    pub suffix: String,
}

impl ParametricPhrase {
    /// Creates a parametric phrase.
    #[must_use]
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Regex source matching any instance of the phrase.
    ///
    /// Whitespace in the fixed parts matches any whitespace run and `:`
    /// tolerates surrounding spaces.
    pub(crate) fn pattern(&self) -> String {
        format!(
            r"{}\d+(?:\.\d+)?{}",
            loose_literal(&self.prefix),
            loose_literal(&self.suffix)
        )
    }
}

fn loose_literal(text: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push_str(r"\s+");
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch == ':' {
            out.push_str(r"\s*:\s*");
        } else {
            out.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
        }
    }
    out
}

/// Camera-angle phrases with the guards gating them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCatalog {
    /// Every emitted phrase, in source order
    pub literals: Vec<GuardedLiteral>,

    /// Phrases with a numeric slot, recognized but never drawn
    #[serde(default)]
    pub parametric: Vec<ParametricPhrase>,

    /// Body-focus reach per placeholder value
    #[serde(default)]
    pub placeholder_reach: BTreeMap<String, FocusReach>,
}

impl CameraCatalog {
    /// Phrase texts in source order.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.literals.iter().map(|l| l.text.as_str())
    }

    /// Reach of a placeholder value; unknown values fit any focus.
    #[must_use]
    pub fn reach(&self, value: &str) -> FocusReach {
        self.placeholder_reach
            .get(value)
            .copied()
            .unwrap_or(FocusReach::Either)
    }
}

/// Words the substitution rules look for around a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWords {
    /// Noun following hair colors and preceding hair styles
    pub hair: String,
    /// Token naming the mouth covering
    pub mouth_covering: String,
}

impl Default for ContextWords {
    fn default() -> Self {
        Self {
            hair: "hair".to_string(),
            mouth_covering: "mouth_mask".to_string(),
        }
    }
}

/// Keywords that reveal which half of the body a text focuses on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusKeywords {
    /// Upper-body words
    pub upper: Vec<String>,
    /// Lower-body words
    pub lower: Vec<String>,
}

impl Default for FocusKeywords {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(ToString::to_string).collect();
        Self {
            upper: words(&[
                "arm", "arms", "neck", "earring", "earrings", "bracelet", "bracelets", "necklace",
                "necklaces", "ring", "rings",
            ]),
            lower: words(&[
                "thigh", "thighs", "calf", "calves", "leg", "legs", "foot", "feet", "barefoot",
                "hip", "hips", "ass",
            ]),
        }
    }
}

/// Everything the substitution passes need, extracted once from a generator source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Lexicon {
    /// General garment colors
    pub color: Vocabulary,
    /// Hair colors
    pub hair_color: Vocabulary,
    /// Hair styles
    pub hair_style: Vocabulary,
    /// Fabric materials
    pub material: Vocabulary,
    /// Mouth-covering colors
    pub mask_color: Vocabulary,
    /// Mouth-covering materials
    pub mouth_mask_material: Vocabulary,
    /// Upper-body clothing
    pub upper_clothing: Vocabulary,
    /// Lower-body clothing
    pub lower_clothing: Vocabulary,
    /// Camera angles and their guards
    pub camera: CameraCatalog,
    /// Context words used by eligibility rules
    #[serde(default)]
    pub context: ContextWords,
    /// Body-focus keywords
    #[serde(default)]
    pub focus_keywords: FocusKeywords,
}

impl Lexicon {
    /// Assembles a lexicon from parts with default context words and keywords.
    #[must_use]
    pub fn new(vocabularies: BTreeMap<Category, Vocabulary>, camera: CameraCatalog) -> Self {
        let mut vocabularies = vocabularies;
        let mut take = |c: Category| vocabularies.remove(&c).unwrap_or_default();
        Self {
            color: take(Category::Color),
            hair_color: take(Category::HairColor),
            hair_style: take(Category::HairStyle),
            material: take(Category::Material),
            mask_color: take(Category::MaskColor),
            mouth_mask_material: take(Category::MouthMaskMaterial),
            upper_clothing: take(Category::UpperClothing),
            lower_clothing: take(Category::LowerClothing),
            camera,
            context: ContextWords::default(),
            focus_keywords: FocusKeywords::default(),
        }
    }

    /// Replaces the context words.
    #[must_use]
    pub fn with_context(mut self, context: ContextWords) -> Self {
        self.context = context;
        self
    }

    /// Replaces the body-focus keywords.
    #[must_use]
    pub fn with_focus_keywords(mut self, keywords: FocusKeywords) -> Self {
        self.focus_keywords = keywords;
        self
    }

    /// Vocabulary for a category.
    #[must_use]
    pub const fn vocabulary(&self, category: Category) -> &Vocabulary {
        match category {
            Category::Color => &self.color,
            Category::HairColor => &self.hair_color,
            Category::HairStyle => &self.hair_style,
            Category::Material => &self.material,
            Category::MaskColor => &self.mask_color,
            Category::MouthMaskMaterial => &self.mouth_mask_material,
            Category::UpperClothing => &self.upper_clothing,
            Category::LowerClothing => &self.lower_clothing,
        }
    }

    /// Checks that every vocabulary and the camera catalog are usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::EmptyVocabulary`] found, or
    /// [`Error::Config`] for an empty camera catalog or blank context word.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            if !self.vocabulary(category).is_usable() {
                return Err(Error::empty_vocabulary(category.name()));
            }
        }
        if self.camera.literals.is_empty() {
            return Err(Error::config("camera catalog has no literals"));
        }
        if self.context.hair.trim().is_empty() || self.context.mouth_covering.trim().is_empty() {
            return Err(Error::config("context words must not be blank"));
        }
        Ok(())
    }

    /// Extracts a lexicon from generator source text.
    ///
    /// # Errors
    ///
    /// Propagates any extraction failure.
    pub fn from_source(source: &str, config: &ExtractConfig) -> Result<Self> {
        crate::extract::Extractor::new(config)?.lexicon(source)
    }

    /// Reads and extracts a generator source file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise any extraction failure.
    pub fn from_source_file(path: impl AsRef<Path>, config: &ExtractConfig) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_source(&String::from_utf8_lossy(&bytes), config)
    }

    /// Parses and validates a lexicon previously saved as JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON or a validation error.
    pub fn from_json(json: &str) -> Result<Self> {
        let lexicon: Self = serde_json::from_str(json)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Loads a JSON lexicon file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise see [`Lexicon::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
