//! Reads vocabularies and guarded camera phrases out of generator source text.

use crate::config::{ExtractConfig, PickListSource};
use crate::error::{Error, Result};
use crate::guard::{Guard, GuardedLiteral, PredicateParser};
use crate::lexer::{
    LITERAL_PATTERN, matching_close, skip_whitespace, sole_literal, split_top_level,
    string_literals, unescape,
};
use crate::lexicon::{CameraCatalog, Category, FocusReach, Lexicon, ParametricPhrase, Vocabulary};
use crate::scanner::ControlFlowScanner;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// One emission statement as found by the scanner, before placeholder values are resolved.
enum Emission {
    Direct {
        text: String,
        guard: Guard,
    },
    Template {
        prefix: String,
        placeholder: String,
        suffix: String,
        guard: Guard,
    },
    Parametric(ParametricPhrase),
}

/// Compiled recognizers for one [`ExtractConfig`].
pub(crate) struct Extractor<'c> {
    config: &'c ExtractConfig,
    predicates: PredicateParser,
    direct: Regex,
    template: Regex,
    numeric_head: Regex,
    numeric_tail: Regex,
}

impl<'c> Extractor<'c> {
    pub(crate) fn new(config: &'c ExtractConfig) -> Result<Self> {
        config.validate()?;
        let emit = emitter_pattern(&config.dialect.emitter);

        Ok(Self {
            config,
            predicates: PredicateParser::new(&config.dialect)?,
            direct: Regex::new(&format!(
                r"^{emit}\s*\(\s*{LITERAL_PATTERN}\s*\)\s*;"
            ))?,
            template: Regex::new(&format!(
                r"^{emit}\s*\(\s*{LITERAL_PATTERN}\s*\+\s*([A-Za-z_]\w*)\s*\+\s*{LITERAL_PATTERN}\s*\)\s*;"
            ))?,
            numeric_head: Regex::new(&format!(
                r"^{emit}\s*\(\s*{LITERAL_PATTERN}\s*\+\s*(?:std\s*::\s*)?to_string\s*\("
            ))?,
            numeric_tail: Regex::new(&format!(r"^\s*\+\s*{LITERAL_PATTERN}\s*\)\s*;"))?,
        })
    }

    /// Builds the complete lexicon.
    #[instrument(skip_all)]
    pub(crate) fn lexicon(&self, src: &str) -> Result<Lexicon> {
        let config = self.config;
        let mut vocabularies = BTreeMap::new();

        vocabularies.insert(Category::Color, Self::declaration(src, &config.color, Category::Color)?);
        vocabularies.insert(
            Category::MaskColor,
            Self::declaration(src, &config.mask_color, Category::MaskColor)?,
        );
        vocabularies.insert(
            Category::Material,
            Self::declaration(src, &config.material, Category::Material)?,
        );
        vocabularies.insert(
            Category::MouthMaskMaterial,
            Self::declaration(src, &config.mouth_mask_material, Category::MouthMaskMaterial)?,
        );
        vocabularies.insert(
            Category::HairColor,
            self.pick_list(src, &config.hair_color, Category::HairColor)?,
        );
        vocabularies.insert(
            Category::HairStyle,
            self.pick_list(src, &config.hair_style, Category::HairStyle)?,
        );
        vocabularies.insert(
            Category::UpperClothing,
            self.clothing(src, &config.upper_clothing, Category::UpperClothing)?,
        );
        vocabularies.insert(
            Category::LowerClothing,
            self.clothing(src, &config.lower_clothing, Category::LowerClothing)?,
        );

        for (category, vocabulary) in &vocabularies {
            debug!(%category, entries = vocabulary.entries().len(), "extracted vocabulary");
        }

        let camera = self.camera_catalog(src)?;
        let lexicon = Lexicon::new(vocabularies, camera);
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Locates the body of `name(...) { ... }`, excluding the outer braces.
    pub(crate) fn function_body<'s>(src: &'s str, name: &str) -> Result<&'s str> {
        let header = Regex::new(&format!(
            r"\b{}\s*\([^)]*\)\s*(?:const\s*)?\{{",
            regex::escape(name)
        ))?;
        let m = header
            .find(src)
            .ok_or_else(|| Error::missing_function(name))?;
        let open = m.end() - 1;
        let close = matching_close(src, open).ok_or_else(|| Error::UnterminatedRegion {
            name: name.to_string(),
        })?;
        Ok(&src[open + 1..close])
    }

    /// Reads `name = { "a", "b", ... }` anywhere in the source.
    pub(crate) fn declaration(src: &str, name: &str, category: Category) -> Result<Vocabulary> {
        let decl = Regex::new(&format!(r"\b{}\s*=\s*\{{", regex::escape(name)))?;
        let m = decl
            .find(src)
            .ok_or_else(|| Error::missing_declaration(name))?;
        let open = m.end() - 1;
        let close = matching_close(src, open).ok_or_else(|| Error::missing_declaration(name))?;
        Vocabulary::new(category.name(), string_literals(&src[open + 1..close]))
    }

    /// Reads `variable = picker({...})` inside a function.
    pub(crate) fn pick_list(
        &self,
        src: &str,
        source: &PickListSource,
        category: Category,
    ) -> Result<Vocabulary> {
        let body = Self::function_body(src, &source.function)?;
        let picker = &self.config.dialect.picker;
        let missing = || Error::MissingAssignment {
            variable: source.variable.clone(),
            picker: picker.clone(),
            function: source.function.clone(),
        };

        let assignment = Regex::new(&format!(
            r"\b{}\s*=\s*{}\s*\(\s*\{{",
            regex::escape(&source.variable),
            regex::escape(picker)
        ))?;
        let m = assignment.find(body).ok_or_else(missing)?;
        let open = m.end() - 1;
        let close = matching_close(body, open).ok_or_else(missing)?;
        Vocabulary::new(category.name(), string_literals(&body[open + 1..close]))
    }

    /// Collects every single-literal element of every picker list inside a function.
    pub(crate) fn clothing(&self, src: &str, function: &str, category: Category) -> Result<Vocabulary> {
        let body = Self::function_body(src, function)?;
        let call = Regex::new(&format!(
            r"\b{}\s*\(\s*\{{",
            regex::escape(&self.config.dialect.picker)
        ))?;

        let mut items = Vec::new();
        for m in call.find_iter(body) {
            let open = m.end() - 1;
            let Some(close) = matching_close(body, open) else {
                continue;
            };
            items.extend(
                split_top_level(&body[open + 1..close])
                    .into_iter()
                    .filter_map(sole_literal)
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty()),
            );
        }

        Vocabulary::new(category.name(), items)
    }

    fn assignment_pattern(&self, variable: &str) -> String {
        format!(
            r"\b{}\s*=\s*(?:{LITERAL_PATTERN}\s*;|{}\s*\(\s*(\{{))",
            regex::escape(variable),
            regex::escape(&self.config.dialect.picker)
        )
    }

    /// Values carried by one assignment match within `hay`.
    fn assigned_values(hay: &str, caps: &Captures<'_>) -> Vec<String> {
        if let Some(raw) = caps.get(1) {
            return vec![unescape(raw.as_str())];
        }
        let Some(open) = caps.get(2).map(|m| m.start()) else {
            return Vec::new();
        };
        let Some(close) = matching_close(hay, open) else {
            return Vec::new();
        };
        split_top_level(&hay[open + 1..close])
            .into_iter()
            .filter_map(sole_literal)
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Every value assigned to `variable` anywhere in the source, sorted and deduplicated.
    pub(crate) fn placeholder_values(&self, src: &str, variable: &str) -> Result<Vec<String>> {
        let assignment = Regex::new(&self.assignment_pattern(variable))?;
        let mut values: Vec<String> = assignment
            .captures_iter(src)
            .flat_map(|caps| Self::assigned_values(src, &caps))
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// Which focus tokens gate each value assigned to `variable`.
    pub(crate) fn placeholder_reach(
        &self,
        src: &str,
        variable: &str,
    ) -> Result<BTreeMap<String, FocusReach>> {
        let dialect = &self.config.dialect;
        let token = |t: &str| {
            let t = regex::escape(t);
            Regex::new(&format!(r"(?:==\s*{t}\b|\b{t}\s*==)"))
        };
        let upper = token(&dialect.upper_token)?;
        let lower = token(&dialect.lower_token)?;
        let header = Regex::new(r"\bif\s*\(")?;
        let assignment = Regex::new(&format!("^(?:{})", self.assignment_pattern(variable)))?;

        let mut seen: BTreeMap<String, (bool, bool)> = BTreeMap::new();
        for value in self.placeholder_values(src, variable)? {
            seen.insert(value, (false, false));
        }

        for m in header.find_iter(src) {
            let open = m.end() - 1;
            let Some(close) = matching_close(src, open) else {
                continue;
            };
            let condition = &src[open + 1..close];
            let mut i = skip_whitespace(src, close + 1);
            if src.as_bytes().get(i) == Some(&b'{') {
                i = skip_whitespace(src, i + 1);
            }
            let rest = &src[i..];
            let Some(caps) = assignment.captures(rest) else {
                continue;
            };
            let (is_upper, is_lower) = (upper.is_match(condition), lower.is_match(condition));
            for value in Self::assigned_values(rest, &caps) {
                let entry = seen.entry(value).or_default();
                entry.0 |= is_upper;
                entry.1 |= is_lower;
            }
        }

        Ok(seen
            .into_iter()
            .map(|(value, flags)| {
                let reach = match flags {
                    (true, false) => FocusReach::UpperOnly,
                    (false, true) => FocusReach::LowerOnly,
                    _ => FocusReach::Either,
                };
                (value, reach)
            })
            .collect())
    }

    /// Matches one emission statement at the start of `rest`.
    fn emission_at(&self, rest: &str, guard: impl FnOnce() -> Guard) -> Option<(Emission, usize)> {
        if let Some(caps) = self.direct.captures(rest) {
            let emission = Emission::Direct {
                text: unescape(&caps[1]),
                guard: guard(),
            };
            return Some((emission, caps[0].len()));
        }

        if let Some(caps) = self.template.captures(rest) {
            let emission = Emission::Template {
                prefix: unescape(&caps[1]),
                placeholder: caps[2].to_string(),
                suffix: unescape(&caps[3]),
                guard: guard(),
            };
            return Some((emission, caps[0].len()));
        }

        let head = self.numeric_head.captures(rest)?;
        let open = head[0].len() - 1;
        let close = matching_close(rest, open)?;
        let tail = self.numeric_tail.captures(&rest[close + 1..])?;
        let phrase = ParametricPhrase::new(unescape(&head[1]), unescape(&tail[1]));
        Some((Emission::Parametric(phrase), close + 1 + tail[0].len()))
    }

    /// Scans the camera function and expands its emissions.
    pub(crate) fn camera_catalog(&self, src: &str) -> Result<CameraCatalog> {
        let function = &self.config.camera;
        let body = Self::function_body(src, function)?;

        let mut emissions = Vec::new();
        ControlFlowScanner::new(body, &self.predicates).run(|rest, scanner| {
            let (emission, consumed) = self.emission_at(rest, || scanner.active_guard())?;
            emissions.push(emission);
            Some(consumed)
        });

        let mut catalog = CameraCatalog::default();
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for emission in emissions {
            match emission {
                Emission::Direct { text, guard } => {
                    catalog.literals.push(GuardedLiteral::new(text, guard));
                }
                Emission::Template {
                    prefix,
                    placeholder,
                    suffix,
                    guard,
                } => {
                    if !values.contains_key(&placeholder) {
                        let found = self.placeholder_values(src, &placeholder)?;
                        if found.is_empty() {
                            debug!(%placeholder, "placeholder has no assigned values");
                        }
                        values.insert(placeholder.clone(), found);
                    }
                    for value in values.get(&placeholder).into_iter().flatten() {
                        catalog
                            .literals
                            .push(GuardedLiteral::expanded(&prefix, value, &suffix, guard.clone()));
                    }
                }
                Emission::Parametric(phrase) => {
                    if !catalog.parametric.contains(&phrase) {
                        trace!(prefix = %phrase.prefix, suffix = %phrase.suffix, "parametric phrase");
                        catalog.parametric.push(phrase);
                    }
                }
            }
        }

        if catalog.literals.is_empty() {
            return Err(Error::NoLiterals {
                function: function.clone(),
                emitter: self.config.dialect.emitter.clone(),
            });
        }

        let focus = &self.config.dialect.focus_placeholder;
        if values.contains_key(focus) {
            catalog.placeholder_reach = self.placeholder_reach(src, focus)?;
        }

        debug!(
            literals = catalog.literals.len(),
            parametric = catalog.parametric.len(),
            "extracted camera catalog"
        );
        Ok(catalog)
    }
}

/// Regex source for an emitter path, tolerating any member separator.
fn emitter_pattern(emitter: &str) -> String {
    emitter
        .replace("::", ".")
        .replace("->", ".")
        .split('.')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s*(?:\.|->|::)\s*")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A condensed generator source with the same shapes as the real one.
    pub(crate) const GENERATOR_SOURCE: &str = r#"
#include <string>
#include <vector>

std::string fondleTarget;
const std::vector<std::string> color =
	{ "darkblue ", "white ", "pink ", "black " };
const std::vector<std::string> maskcolor =
	{ "white ", "pink " };
const std::vector<std::string> chaircolor =
	{ "burgundy " };
const std::vector<std::string> material =
	{ "", "lace ", "satin ", "patterned " };
const std::vector<std::string> mouthMaskMaterial =
	{ "", "lace ", "patterned " };

std::string pickRandomString(const std::vector<std::string>& options);
std::string getShot(std::string output);

std::string pickUpper(std::string output)
{
	std::string upper;
	upper += "(woman is wearing ";
	if (output.find("back") != std::string::npos) {
		upper += pickRandomString({
			"low cut tank top",
			"hat",
			"button down shirt, " + pickRandomString(color) + "tight skirt",
		});
	} else {
		upper += pickRandomString({"pajamas", "slip"});
	}
	upper += "), ";
	return upper;
}

std::string pickLower(std::string output)
{
	std::string lower;
	if (output.find("pajamas") != std::string::npos) return lower;
	lower += pickRandomString({"thong", "jeans", "hat", "  "});
	return lower;
}

std::string getHair()
{
	std::string hair;
	std::string haircolor = pickRandomString({"blonde ", "light brown "});
	hair += haircolor;
	std::string hairstyle = pickRandomString({"up in a high ponytail", "half-up hairstyle"});
	hair += hairstyle;
	return hair;
}

std::string getShot(std::string output)
{
	std::string shot;
	std::vector<std::string> newShot;

	if (kNumberOfWomen == 1 && output.find("pov") == std::string::npos) {
		if (output.find("on back") != std::string::npos) {
			newShot.push_back("(close up)");
			newShot.push_back("(high angle shot:" + to_string(getRandomFloat(1.0, 1.4)) + ")");
			newShot.push_back("(((close-up of " + fondleTarget + ")))");
		} else if (output.find("on stomach") != std::string::npos) {
			newShot.push_back("(((ass view, above view)))");
			// newShot.push_back("(commented out)");
		} else {
			newShot.push_back("(((side view)))");
			newShot.push_back("(woman is wearing " + pickRandomString(color) + " panty briefs)");
		}
	}
	newShot.push_back("(\"quoted\" view)");
	shot = pickRandomString(newShot);
	return shot;
}

void setup()
{
	if (kBodyFocusType == UPPER)
		fondleTarget = "breasts";
	else if (kBodyFocusType == LOWER)
		fondleTarget = pickRandomString({"perfect small round ass", "thick thighs"});
	else if (kBodyFocusType == FULL)
		fondleTarget = pickRandomString({"perfect breasts", "thick thighs"});
}
"#;

    fn extract(src: &str) -> Result<Lexicon> {
        Extractor::new(&ExtractConfig::default())?.lexicon(src)
    }

    fn texts(catalog: &CameraCatalog) -> Vec<&str> {
        catalog.phrases().collect()
    }

    #[test]
    fn test_full_fixture() {
        let lexicon = extract(GENERATOR_SOURCE).unwrap();

        assert_eq!(lexicon.color.entries(), ["darkblue", "white", "pink", "black"]);
        assert_eq!(lexicon.material.entries(), ["", "lace", "satin", "patterned"]);
        assert_eq!(lexicon.hair_color.entries(), ["blonde", "light brown"]);
        assert_eq!(
            lexicon.hair_style.entries(),
            ["up in a high ponytail", "half-up hairstyle"]
        );
        assert_eq!(
            lexicon.upper_clothing.entries(),
            ["low cut tank top", "hat", "pajamas", "slip"]
        );
        assert_eq!(lexicon.lower_clothing.entries(), ["thong", "jeans", "hat"]);

        assert_eq!(
            texts(&lexicon.camera),
            [
                "(close up)",
                "(((close-up of breasts)))",
                "(((close-up of perfect breasts)))",
                "(((close-up of perfect small round ass)))",
                "(((close-up of thick thighs)))",
                "(((ass view, above view)))",
                "(((side view)))",
                "(\"quoted\" view)",
            ]
        );
        assert_eq!(
            lexicon.camera.parametric,
            [ParametricPhrase::new("(high angle shot:", ")")]
        );
    }

    #[test]
    fn test_fixture_guards() {
        let lexicon = extract(GENERATOR_SOURCE).unwrap();
        let guard_of = |text: &str| {
            lexicon
                .camera
                .literals
                .iter()
                .find(|l| l.text == text)
                .map(|l| l.guard.clone())
                .unwrap()
        };

        assert_eq!(guard_of("(close up)"), Guard::new(["on back"], ["pov"]));
        assert_eq!(
            guard_of("(((ass view, above view)))"),
            Guard::new(["on stomach"], ["pov", "on back"])
        );
        assert_eq!(
            guard_of("(((side view)))"),
            Guard::new(Vec::<String>::new(), ["pov", "on back", "on stomach"])
        );
        assert_eq!(guard_of("(\"quoted\" view)"), Guard::default());
    }

    #[test]
    fn test_placeholder_reach() {
        let lexicon = extract(GENERATOR_SOURCE).unwrap();
        let reach = &lexicon.camera.placeholder_reach;
        assert_eq!(reach["breasts"], FocusReach::UpperOnly);
        assert_eq!(reach["thick thighs"], FocusReach::LowerOnly);
        assert_eq!(reach["perfect small round ass"], FocusReach::LowerOnly);
        assert_eq!(reach["perfect breasts"], FocusReach::Either);
    }

    #[test]
    fn test_if_else_literals() {
        let src = r#"
            const x = { "a" };
            void getShot(std::string output) {
                if (output.find("X") != std::string::npos) {
                    newShot.push_back("A");
                } else {
                    newShot.push_back("B");
                }
            }
        "#;
        let config = ExtractConfig::default();
        let catalog = Extractor::new(&config).unwrap().camera_catalog(src).unwrap();

        assert_eq!(
            catalog.literals,
            [
                GuardedLiteral::new("A", Guard::new(["X"], Vec::<String>::new())),
                GuardedLiteral::new("B", Guard::new(Vec::<String>::new(), ["X"])),
            ]
        );
        assert!(catalog.literals[0].is_eligible("has X"));
        assert!(!catalog.literals[1].is_eligible("has X"));
        assert!(!catalog.literals[0].is_eligible("nothing"));
        assert!(catalog.literals[1].is_eligible("nothing"));
    }

    #[test]
    fn test_template_expansion_shares_guard() {
        let src = r#"
            void pick() { target = pickRandomString({"lips", "eyes"}); }
            void getShot(std::string output) {
                if (output.find("face") != npos) {
                    newShot.push_back("shot of " + target + " close up");
                }
            }
        "#;
        let config = ExtractConfig::default();
        let catalog = Extractor::new(&config).unwrap().camera_catalog(src).unwrap();

        let guard = Guard::new(["face"], Vec::<String>::new());
        assert_eq!(
            catalog.literals,
            [
                GuardedLiteral::expanded("shot of ", "eyes", " close up", guard.clone()),
                GuardedLiteral::expanded("shot of ", "lips", " close up", guard),
            ]
        );
        assert!(catalog.placeholder_reach.is_empty());
    }

    #[test]
    fn test_missing_function() {
        let err = extract("const color = {\"red\"};").unwrap_err();
        assert!(err.is_extraction());
        assert!(matches!(err, Error::MissingDeclaration { ref name } if name == "maskcolor"));

        let config = ExtractConfig::default();
        let extractor = Extractor::new(&config).unwrap();
        let err = extractor.camera_catalog("getShot(output);").unwrap_err();
        assert!(matches!(err, Error::MissingFunction { ref name } if name == "getShot"));
    }

    #[test]
    fn test_unterminated_function() {
        let err = Extractor::function_body("void getShot() { if (x) { ", "getShot")
            .unwrap_err();
        assert!(matches!(err, Error::UnterminatedRegion { .. }));
    }

    #[test]
    fn test_empty_vocabulary() {
        let src = GENERATOR_SOURCE.replace(r#"{ "", "lace ", "satin ", "patterned " }"#, r#"{ "", " " }"#);
        let err = extract(&src).unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary { ref name } if name == "material"));
    }

    #[test]
    fn test_missing_pick_list() {
        let src = GENERATOR_SOURCE.replace("hairstyle = pickRandomString", "hairstyle = choose");
        let err = extract(&src).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAssignment { ref variable, .. } if variable == "hairstyle"
        ));
    }

    #[test]
    fn test_no_literals() {
        let src = r#"void getShot(std::string o) { newShot.push_back(x); }"#;
        let config = ExtractConfig::default();
        let err = Extractor::new(&config).unwrap().camera_catalog(src).unwrap_err();
        assert!(matches!(err, Error::NoLiterals { .. }));
    }

    #[test]
    fn test_custom_dialect() {
        let src = r#"
            void angles(std::string prompt) {
                if (prompt.find("night") != npos) { out->emit("(dark shot)"); }
                out->emit("(wide shot)");
            }
        "#;
        let config = ExtractConfig::builder()
            .camera("angles")
            .haystack("prompt")
            .emitter("out->emit")
            .build()
            .unwrap();
        let catalog = Extractor::new(&config).unwrap().camera_catalog(src).unwrap();
        assert_eq!(catalog.literals.len(), 2);
        assert_eq!(
            catalog.literals[0].guard,
            Guard::new(["night"], Vec::<String>::new())
        );
    }

    #[test]
    fn test_emitter_pattern() {
        let re = Regex::new(&format!("^{}$", emitter_pattern("newShot.push_back"))).unwrap();
        assert!(re.is_match("newShot.push_back"));
        assert!(re.is_match("newShot -> push_back"));
        assert!(!re.is_match("newShotXpush_back"));
    }
}
