//! # guardmix
//!
//! Mines a prompt generator's C-family source for vocabularies and
//! conditionally emitted phrases, then uses them to remix free-form prompt
//! text while respecting the conditions the generator itself enforces.
//!
//! ## Features
//!
//! - Comment- and string-aware extraction of declaration and pick lists
//! - Guard mining from `if` / `else if` / `else` chains over `find(...)` checks
//! - Context-sensitive word replacement with case preservation
//! - Camera-angle replacement filtered by guards and body focus
//! - Clothing replacement inside `(woman is wearing ...)` phrases
//! - Seedable randomness for reproducible runs
//!
//! ## Quick Start
//!
//! ```no_run
//! use guardmix::{ExtractConfig, Pass, Remixer};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = std::fs::read_to_string("ai.cpp")?;
//! let lexicon = guardmix::extract(&source, &ExtractConfig::default())?;
//!
//! let remixer = Remixer::new(lexicon)?;
//! let remix = remixer.run(
//!     "blonde hair, red satin dress, (close up)",
//!     &Pass::ALL,
//!     &mut StdRng::seed_from_u64(42),
//! );
//! println!("{}", remix.rewrite.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Extractor**: locates functions and lists, drives the control-flow scanner
//! 2. **Lexicon**: the immutable result, serializable to JSON
//! 3. **Substituters**: word, camera and clothing passes over caller text
//! 4. **Remixer**: applies passes in order and folds their tallies

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod camera;
mod clothing;
mod config;
mod error;
mod extract;
mod guard;
mod lexer;
mod lexicon;
mod pipeline;
mod scanner;
mod substitute;

pub use camera::{BodyFocus, CAMERA_KEY, CameraSubstituter};
pub use clothing::{CLOTHES_KEY, ClothingSubstituter};
pub use config::{Dialect, ExtractConfig, ExtractConfigBuilder, PickListSource};
pub use error::{Error, Result};
pub use guard::{Guard, GuardedLiteral};
pub use lexicon::{
    CameraCatalog, Category, ContextWords, FocusKeywords, FocusReach, Lexicon, ParametricPhrase,
    Vocabulary,
};
pub use pipeline::{Pass, Remix, RemixStats, Remixer, ReplacementCount};
pub use substitute::{Rewrite, Tally, WordPass, WordSubstituter, preserve_case};

/// Extracts a [`Lexicon`] from generator source text.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid
/// - A declaration, function or pick-list assignment cannot be found
/// - A vocabulary or the camera catalog ends up empty
///
/// # Examples
///
/// ```
/// use guardmix::{Error, ExtractConfig};
///
/// let err = guardmix::extract("int main() {}", &ExtractConfig::default()).unwrap_err();
/// assert!(matches!(err, Error::MissingDeclaration { .. }));
/// ```
pub fn extract(source: &str, config: &ExtractConfig) -> Result<Lexicon> {
    Lexicon::from_source(source, config)
}
