use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use guardmix::{ExtractConfig, Lexicon, Pass, Remixer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "guardmix",
    version,
    author,
    about = "Remix prompt text with vocabularies mined from a generator source",
    long_about = "Remix prompt text with vocabularies mined from a generator source.\n\n\
    The generator source is read once to extract color, hair, material and clothing \
    lists together with the camera phrases it emits and the conditions guarding them. \
    Input text is then rewritten so that every replacement is one the generator could \
    have produced for that text.\n\n\
    USAGE EXAMPLES:\n  \
      # Inspect what was extracted\n  \
      guardmix extract --source ai.cpp\n\n  \
      # Recolor a prompt read from stdin\n  \
      echo 'red satin dress' | guardmix recolor --source ai.cpp\n\n  \
      # Run every pass on a file in place with a fixed seed\n  \
      guardmix all prompt.txt --source ai.cpp --inplace --seed 42\n\n  \
      # Reuse a saved lexicon\n  \
      guardmix extract --source ai.cpp -o lexicon.json\n  \
      guardmix camera prompt.txt --lexicon lexicon.json"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the extracted lexicon as JSON
    Extract {
        /// Generator source file
        #[arg(short, long, value_name = "FILE", env = "GUARDMIX_SOURCE")]
        source: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace colors, hair colors, hair styles and materials
    Recolor(RemixArgs),

    /// Replace the first camera angle
    Camera(RemixArgs),

    /// Replace one clothing item
    Clothes(RemixArgs),

    /// Run every pass in order
    All(RemixArgs),
}

impl Command {
    const fn passes(&self) -> &'static [Pass] {
        match self {
            Self::Extract { .. } => &[],
            Self::Recolor(_) => &Pass::RECOLOR,
            Self::Camera(_) => &[Pass::Camera],
            Self::Clothes(_) => &[Pass::Clothes],
            Self::All(_) => &Pass::ALL,
        }
    }
}

#[derive(Args, Debug)]
struct RemixArgs {
    /// Input text file; stdin when omitted or '-'
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    #[command(flatten)]
    lexicon: LexiconArgs,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "inplace")]
    output: Option<PathBuf>,

    /// Overwrite INPUT with the result
    #[arg(long)]
    inplace: bool,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Don't print the replacement summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct LexiconArgs {
    /// Generator source to extract from
    #[arg(long, value_name = "FILE")]
    source: Option<PathBuf>,

    /// Lexicon JSON written by `guardmix extract`
    #[arg(long, value_name = "FILE")]
    lexicon: Option<PathBuf>,
}

impl LexiconArgs {
    fn load(&self) -> anyhow::Result<Lexicon> {
        match (&self.source, &self.lexicon) {
            (_, Some(path)) => Lexicon::load(path)
                .with_context(|| format!("Failed to load lexicon from {}", path.display())),
            (Some(path), None) => Lexicon::from_source_file(path, &ExtractConfig::default())
                .with_context(|| format!("Failed to extract lexicon from {}", path.display())),
            (None, None) => bail!("either --source or --lexicon is required"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let passes = cli.command.passes();
    match cli.command {
        Command::Extract { source, output } => extract(&source, output.as_deref()),
        Command::Recolor(args)
        | Command::Camera(args)
        | Command::Clothes(args)
        | Command::All(args) => remix(&args, passes),
    }
}

fn extract(source: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let lexicon = Lexicon::from_source_file(source, &ExtractConfig::default())
        .with_context(|| format!("Failed to extract lexicon from {}", source.display()))?;
    let json = lexicon
        .to_json_pretty()
        .context("Failed to serialize lexicon")?;

    write_output(output, &format!("{json}\n"))
}

fn remix(args: &RemixArgs, passes: &[Pass]) -> anyhow::Result<()> {
    let input = args
        .input
        .as_deref()
        .filter(|path| *path != Path::new("-"));
    if args.inplace && input.is_none() {
        bail!("--inplace requires an INPUT file");
    }

    let lexicon = args.lexicon.load()?;
    let remixer = Remixer::new(lexicon).context("Failed to prepare substitution passes")?;

    let text = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("Failed to read stdin")?,
    };

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!(seed, "using seed");
    let mut rng = StdRng::seed_from_u64(seed);

    let remix = remixer.run(&text, passes, &mut rng);

    let destination = if args.inplace { input } else { args.output.as_deref() };
    write_output(destination, &remix.rewrite.text)?;

    if !args.quiet {
        remix.stats.print_summary();
    }

    Ok(())
}

fn write_output(path: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(contents.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("guardmix=info"),
        1 => EnvFilter::new("guardmix=debug"),
        _ => EnvFilter::new("guardmix=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();

    Ok(())
}
