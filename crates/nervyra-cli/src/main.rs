use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use nervyra_core::{
    annotate_entry, load_library, ClauseEntry, ClauseLibrary, EngineConfig, LibraryContext,
    LineOutcome, LineReview, LineReviewer, MatchResult, MatchStatus, Matcher, Normalizer,
    ResultSet, LEGAL_TRANSITIONS,
};

/// Nervyra — clause matching for reinsurance wording
///
/// Normalize clause text, match it against a reinsurer's clause library,
/// and review multi-line wording one clause per line.
#[derive(Parser)]
#[command(name = "nervyra", version, about, long_about = None)]
struct Cli {
    /// Suppress human-readable output (exit code only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log more detail to stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized token set of some text
    Normalize {
        /// Text to normalize
        text: String,
        #[command(flatten)]
        engine: EngineArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match text against a clause library as one query
    Match {
        #[command(flatten)]
        library: LibraryArgs,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Review wording line by line, one library clause per line
    Review {
        #[command(flatten)]
        library: LibraryArgs,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the SHA-256 digest of a clause library
    Digest {
        #[command(flatten)]
        library: LibraryArgs,
    },

    /// Print the legal match status transitions
    Transitions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct EngineArgs {
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extra ignore-list word or phrase (repeatable)
    #[arg(long = "ignore", value_name = "WORD")]
    ignore: Vec<String>,
}

impl EngineArgs {
    fn load(&self) -> Result<EngineConfig> {
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("invalid configuration {}", path.display()))?,
            None => EngineConfig::default(),
        };
        Ok(config.with_extra_ignores(self.ignore.iter().cloned()))
    }
}

#[derive(Args)]
struct LibraryArgs {
    /// Clause library file (JSON)
    #[arg(long = "library", value_name = "FILE")]
    path: PathBuf,
    /// Department, overriding the library file
    #[arg(long)]
    department: Option<String>,
    /// Reinsurer, overriding the library file
    #[arg(long)]
    reinsurer: Option<String>,
}

impl LibraryArgs {
    fn load(&self) -> Result<ClauseLibrary> {
        let context = LibraryContext {
            department: self.department.clone(),
            reinsurer: self.reinsurer.clone(),
        };
        load_library(&self.path, &context)
            .with_context(|| format!("cannot load library {}", self.path.display()))
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Clause wording given inline
    #[arg(long)]
    text: Option<String>,
    /// File containing the clause wording
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

impl InputArgs {
    fn read(&self) -> Result<String> {
        match (&self.text, &self.input) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => read_input(path),
            (None, None) => anyhow::bail!("one of --text or --input is required"),
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read input {}", path.display()))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let quiet = cli.quiet;
    let exit_code = match run(cli.command, quiet) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            2
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit codes: 0 = something matched (or nothing to match), 1 = nothing
/// matched, 2 = error.
fn run(command: Commands, quiet: bool) -> Result<i32> {
    match command {
        Commands::Normalize { text, engine, json } => {
            let normalizer = Normalizer::from_config(&engine.load()?);
            let tokens = normalizer.normalize(&text);
            if json {
                let out = serde_json::json!({
                    "tokens": tokens,
                    "fingerprint": normalizer.fingerprint(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if !quiet {
                println!("{}", tokens);
            }
            Ok(0)
        }

        Commands::Match {
            library,
            input,
            engine,
            json,
        } => {
            let matcher = Matcher::from_config(&engine.load()?)?;
            let library = library.load()?;
            let text = input.read()?;
            let set = matcher.match_text(&text, &library);

            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else if !quiet {
                print_result_set(&set, &library, &text);
            }
            Ok(if set.is_empty() { 1 } else { 0 })
        }

        Commands::Review {
            library,
            input,
            engine,
            json,
        } => {
            let reviewer = LineReviewer::from_config(&engine.load()?)?;
            let library = library.load()?;
            let text = input.read()?;
            let review = reviewer.review(&text, &library);

            if json {
                println!("{}", serde_json::to_string_pretty(&review)?);
            } else if !quiet {
                print_line_review(&review, &library);
            }
            Ok(if review.matched_count() == 0 { 1 } else { 0 })
        }

        Commands::Digest { library } => {
            let library = library.load()?;
            if !quiet {
                println!("{}", library.digest());
            }
            Ok(0)
        }

        Commands::Transitions { json } => {
            if json {
                let rows: Vec<_> = LEGAL_TRANSITIONS
                    .iter()
                    .map(|(from, action, to)| {
                        serde_json::json!({ "from": from, "action": action, "to": to })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if !quiet {
                for (from, action, to) in LEGAL_TRANSITIONS.iter() {
                    println!(
                        "{:<14} --{:<8}--> {}",
                        paint_status(*from),
                        action.to_string(),
                        paint_status(*to)
                    );
                }
            }
            Ok(0)
        }

        Commands::Version => {
            if !quiet {
                println!(
                    "nervyra {} (nervyra-core {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("CARGO_PKG_VERSION")
                );
            }
            Ok(0)
        }
    }
}

// ── Human output ──────────────────────────────────────────

fn paint_status(status: MatchStatus) -> colored::ColoredString {
    match status {
        MatchStatus::Matched => status.as_str().green(),
        MatchStatus::PartialMatch => status.as_str().yellow(),
        MatchStatus::Rejected => status.as_str().red(),
        MatchStatus::Overridden => status.as_str().cyan(),
    }
}

fn print_header(library: &ClauseLibrary) {
    println!(
        "{} {} / {} ({} clauses)",
        "Library:".bold(),
        library.department(),
        library.reinsurer(),
        library.len()
    );
}

fn print_result(rank: usize, result: &MatchResult, library: &ClauseLibrary, text: &str) {
    let title = library
        .get(&result.clause_id)
        .map(|entry| render_completion(text, entry))
        .unwrap_or_else(|| result.clause_id.to_string());
    println!(
        "  {:>2}. {:<14} {:>5.2}  [{}] {}",
        rank,
        paint_status(result.status),
        result.score,
        result.clause_id,
        title
    );
    println!("      {} {}", "matched:".dimmed(), result.matched_tokens);
}

/// Clause display text with typed words in bold and autocompleted words in italics.
fn render_completion(text: &str, entry: &ClauseEntry) -> String {
    annotate_entry(text, entry)
        .into_iter()
        .map(|segment| {
            if segment.autocompleted {
                segment.text.italic().to_string()
            } else {
                segment.text.bold().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_result_set(set: &ResultSet, library: &ClauseLibrary, text: &str) {
    print_header(library);
    println!("{} {}", "Query:".bold(), set.query_tokens);

    if set.is_empty() {
        println!("{}", "No matching clauses".yellow());
        return;
    }
    for (i, result) in set.results.iter().enumerate() {
        print_result(i + 1, result, library, text);
    }

    let counts = set.counts();
    println!(
        "{} {} matched, {} partial, out of {} clauses",
        "Summary:".bold(),
        counts.matched,
        counts.partial_match,
        set.total_candidates
    );
}

fn print_line_review(review: &LineReview, library: &ClauseLibrary) {
    print_header(library);

    for line in &review.lines {
        let marker = match &line.outcome {
            LineOutcome::Matched { .. } => "✓".green(),
            LineOutcome::Protected => "=".cyan(),
            LineOutcome::Unmatched => "✗".red(),
        };
        println!("{} {:>2}: {}", marker, line.index + 1, line.text);

        match &line.outcome {
            LineOutcome::Matched { result } => print_result(1, result, library, &line.text),
            LineOutcome::Protected => println!("      {}", "kept verbatim".dimmed()),
            LineOutcome::Unmatched if !line.candidates.is_empty() => {
                println!(
                    "      {} {} candidate(s) for manual review",
                    "unassigned:".dimmed(),
                    line.candidates.len()
                );
            }
            LineOutcome::Unmatched => {}
        }
    }

    println!(
        "{} {} matched, {} unmatched, {} protected",
        "Summary:".bold(),
        review.matched_count(),
        review.unmatched_count(),
        review.protected_count()
    );
}
