use crate::{
    camera::{CAMERA_KEY, CameraSubstituter},
    clothing::ClothingSubstituter,
    error::Result,
    lexicon::Lexicon,
    substitute::{Rewrite, Tally, WordPass, WordSubstituter},
};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// One substitution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pass {
    /// Garment colors
    Color,
    /// Hair colors
    HairColor,
    /// Hair styles
    HairStyle,
    /// Materials
    Material,
    /// Camera angle
    Camera,
    /// Clothing item
    Clothes,
}

impl Pass {
    /// The word passes, in application order.
    pub const RECOLOR: [Self; 4] = [Self::Color, Self::HairColor, Self::HairStyle, Self::Material];

    /// Every pass, in application order.
    pub const ALL: [Self; 6] = [
        Self::Color,
        Self::HairColor,
        Self::HairStyle,
        Self::Material,
        Self::Camera,
        Self::Clothes,
    ];

    /// Kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::HairColor => "hair-color",
            Self::HairStyle => "hair-style",
            Self::Material => "material",
            Self::Camera => "camera",
            Self::Clothes => "clothes",
        }
    }

    const fn word_pass(self) -> Option<WordPass> {
        match self {
            Self::Color => Some(WordPass::Color),
            Self::HairColor => Some(WordPass::HairColor),
            Self::HairStyle => Some(WordPass::HairStyle),
            Self::Material => Some(WordPass::Material),
            Self::Camera | Self::Clothes => None,
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Count for one replaced token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementCount {
    /// Lowercased original token, or a pass key such as `camera`
    pub token: String,
    /// Times it was replaced
    pub count: usize,
}

/// Statistics collected during one remix run.
#[derive(Debug, Clone, Serialize)]
pub struct RemixStats {
    /// Passes applied, in order
    pub passes: Vec<Pass>,

    /// Total number of replacements
    pub total_replacements: usize,

    /// Whether the text changed
    pub changed: bool,

    /// Per-token counts, most common first
    pub counts: Vec<ReplacementCount>,

    /// Total execution time
    pub duration: Duration,
}

impl RemixStats {
    /// Summarizes a merged tally.
    #[must_use]
    pub fn new(passes: &[Pass], tally: &Tally, changed: bool, duration: Duration) -> Self {
        Self {
            passes: passes.to_vec(),
            total_replacements: tally.total(),
            changed,
            counts: tally
                .most_common()
                .into_iter()
                .map(|(token, count)| ReplacementCount {
                    token: token.to_string(),
                    count,
                })
                .collect(),
            duration,
        }
    }

    /// Prints a formatted summary to stderr.
    pub fn print_summary(&self) {
        let passes: Vec<&str> = self.passes.iter().map(|p| p.name()).collect();

        eprintln!("\n╔═══════════════════════════════════════════════════════╗");
        eprintln!("║               Remix Summary                           ║");
        eprintln!("╠═══════════════════════════════════════════════════════╣");
        eprintln!("║ Passes: {:<46}║", passes.join(", "));
        eprintln!(
            "║ Replacements:         {:>8}                        ║",
            self.total_replacements
        );
        for entry in &self.counts {
            eprintln!("║   - {:<30} {:>8}              ║", entry.token, entry.count);
        }
        if !self.changed {
            eprintln!("║ ⚠ Text unchanged                                      ║");
        }
        eprintln!(
            "║ Total time:           {:>8.3}s                     ║",
            self.duration.as_secs_f64()
        );
        eprintln!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Output of [`Remixer::run`].
#[derive(Debug, Clone)]
pub struct Remix {
    /// Final text, merged tally and change flag
    pub rewrite: Rewrite,
    /// Run summary
    pub stats: RemixStats,
}

/// Applies substitution passes to prose using one [`Lexicon`].
#[derive(Debug, Clone)]
pub struct Remixer {
    lexicon: Lexicon,
    words: Vec<WordSubstituter>,
    camera: CameraSubstituter,
    clothing: ClothingSubstituter,
}

impl Remixer {
    /// Compiles every pass for `lexicon`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The lexicon fails validation
    /// - A generated pattern does not compile
    pub fn new(lexicon: Lexicon) -> Result<Self> {
        lexicon.validate()?;

        let words = WordPass::ALL
            .into_iter()
            .map(|pass| WordSubstituter::new(pass, &lexicon))
            .collect::<Result<Vec<_>>>()?;
        let camera = CameraSubstituter::new(&lexicon)?;
        let clothing = ClothingSubstituter::new(&lexicon);

        Ok(Self {
            lexicon,
            words,
            camera,
            clothing,
        })
    }

    /// The lexicon the passes were compiled from.
    #[must_use]
    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Applies a single pass.
    pub fn apply<R: Rng + ?Sized>(&self, pass: Pass, text: &str, rng: &mut R) -> Rewrite {
        match pass.word_pass() {
            Some(word) => self
                .words
                .iter()
                .find(|s| s.pass() == word)
                .map_or_else(|| Rewrite::unchanged(text), |s| s.apply(text, rng)),
            None if pass == Pass::Camera => self.camera.apply(text, rng),
            None => self.clothing.apply(text, rng),
        }
    }

    fn chain<R: Rng + ?Sized>(&self, passes: &[Pass], text: &str, rng: &mut R) -> Rewrite {
        passes.iter().fold(Rewrite::unchanged(text), |acc, &pass| {
            let step = self.apply(pass, &acc.text, rng);
            debug!(%pass, replacements = step.tally.total(), changed = step.changed, "pass done");
            let mut tally = acc.tally;
            tally.merge(&step.tally);
            Rewrite {
                text: step.text,
                tally,
                changed: acc.changed || step.changed,
            }
        })
    }

    /// Runs color, hair color, hair style and material in order.
    pub fn recolor<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        self.chain(&Pass::RECOLOR, text, rng)
    }

    /// Replaces the first camera phrase.
    pub fn camera<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        self.camera.apply(text, rng)
    }

    /// Replaces one clothing item.
    pub fn clothes<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Rewrite {
        self.clothing.apply(text, rng)
    }

    /// Applies `passes` in order and summarizes the run.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guardmix::{ExtractConfig, Lexicon, Pass, Remixer};
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let lexicon = Lexicon::from_source_file("ai.cpp", &ExtractConfig::default())?;
    /// let remixer = Remixer::new(lexicon)?;
    ///
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let remix = remixer.run("(woman is wearing red jeans)", &Pass::ALL, &mut rng);
    /// println!("{}", remix.rewrite.text);
    /// remix.stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(passes = passes.len(), chars = text.len()))]
    pub fn run<R: Rng + ?Sized>(&self, text: &str, passes: &[Pass], rng: &mut R) -> Remix {
        let start = Instant::now();
        let rewrite = self.chain(passes, text, rng);
        let stats = RemixStats::new(passes, &rewrite.tally, rewrite.changed, start.elapsed());

        info!(
            replacements = stats.total_replacements,
            camera = rewrite.tally.get(CAMERA_KEY),
            changed = rewrite.changed,
            "remix complete"
        );

        Remix { rewrite, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clothing::CLOTHES_KEY;
    use crate::lexicon::Vocabulary;
    use crate::lexicon::tests::sample_lexicon;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn remixer() -> Remixer {
        Remixer::new(sample_lexicon()).unwrap()
    }

    #[test]
    fn test_run_merges_tallies() {
        let text = "a red dress, (close up) on back, (woman is wearing jeans)";
        let remix = remixer().run(
            text,
            &[Pass::Color, Pass::Camera, Pass::Clothes],
            &mut StdRng::seed_from_u64(11),
        );

        assert!(remix.rewrite.changed);
        assert_eq!(remix.rewrite.tally.get("red"), 1);
        assert_eq!(remix.rewrite.tally.get(CAMERA_KEY), 1);
        assert_eq!(remix.rewrite.tally.get(CLOTHES_KEY), 1);
        assert_eq!(remix.stats.total_replacements, 3);
        assert_eq!(remix.stats.counts.len(), 3);
        assert_eq!(remix.stats.passes, [Pass::Color, Pass::Camera, Pass::Clothes]);
    }

    #[test]
    fn test_run_is_reproducible() {
        let text = "Blonde hair up in a high ponytail, black satin dress, \
                    (close up) on back, (woman is wearing a hat)";
        let r = remixer();
        let a = r.run(text, &Pass::ALL, &mut StdRng::seed_from_u64(5));
        let b = r.run(text, &Pass::ALL, &mut StdRng::seed_from_u64(5));
        assert_eq!(a.rewrite, b.rewrite);
    }

    #[test]
    fn test_unchanged_text() {
        let remix = remixer().run("nothing to see", &Pass::ALL, &mut StdRng::seed_from_u64(0));
        assert!(!remix.rewrite.changed);
        assert_eq!(remix.rewrite.text, "nothing to see");
        assert_eq!(remix.stats.total_replacements, 0);
        assert!(remix.stats.counts.is_empty());
    }

    #[test]
    fn test_recolor_runs_word_passes_only() {
        let text = "brown hair, (close up) on back";
        let rewrite = remixer().recolor(text, &mut StdRng::seed_from_u64(2));
        assert_eq!(rewrite.tally.get("brown"), 1);
        assert_eq!(rewrite.tally.get(CAMERA_KEY), 0);
        assert!(rewrite.text.ends_with(" hair, (close up) on back"));
    }

    #[test]
    fn test_invalid_lexicon_is_rejected() {
        let mut lexicon = sample_lexicon();
        lexicon.upper_clothing = Vocabulary::default();
        assert!(Remixer::new(lexicon).is_err());
    }

    #[test]
    fn test_stats_order_and_json() {
        let tally: Tally = ["red", "camera", "red"].map(String::from).into_iter().collect();
        let stats = RemixStats::new(&Pass::ALL, &tally, true, Duration::from_millis(3));
        assert_eq!(stats.counts[0].token, "red");
        assert_eq!(stats.counts[0].count, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["passes"][1], "hair-color");
        assert_eq!(json["total_replacements"], 3);
    }
}
