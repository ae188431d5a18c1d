//! Recommend binary entry point.
//!
//! This binary provides a command-line front end for the café recommender. It
//! supports both a one-shot mode driven by flags and an interactive
//! questionnaire, with flexible output formatting (table or JSON).
//!
//! # Examples
//!
//! One-shot recommendation:
//! ```bash
//! recommend --study-space yes --drive no --price mid \
//!     --atmosphere cozy,modern,local --specials nutty,sweet,rich
//! ```
//!
//! JSON output against a custom data directory:
//! ```bash
//! recommend --data-dir ./data --format json --atmosphere airy,chic,local --specials fruity,light,floral
//! ```
//!
//! Interactive questionnaire:
//! ```bash
//! recommend --interactive
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use cafe_recommender::{
    api::RecommendResponse,
    encoding::normalize_text,
    models::{PriceTier, Recommendation},
    query::{
        GeneralPreferences, RecommendError, Recommender, UnknownTagPolicy, UserPreferences,
        TAGS_PER_FAMILY,
    },
    EngineConfig,
};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ATMOSPHERE_SUGGESTIONS: [&str; 13] = [
    "cozy",
    "bright",
    "modern",
    "funky",
    "airy",
    "hole in the wall",
    "chic",
    "bustling",
    "upscale",
    "modest",
    "local",
    "authentic",
    "cheap",
];

const SPECIALS_SUGGESTIONS: [&str; 13] = [
    "fruity",
    "sweet",
    "earthy",
    "nutty",
    "chocolatey",
    "bitter",
    "spicy",
    "floral",
    "rich",
    "strong",
    "creamy",
    "vanilla",
    "light",
];

/// Output format for the recommendation
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

impl YesNo {
    fn as_bool(self) -> bool {
        self == YesNo::Yes
    }
}

/// Recommend binary CLI for the café recommender
#[derive(Parser, Debug)]
#[command(
    name = "recommend",
    version,
    about = "Recommend a café from your answers to a short questionnaire",
    long_about = "Answer eight questions about how you like your café and get the single \
                  best match. Supports both one-shot and interactive modes with flexible \
                  output formatting.

EXAMPLES:
  One-shot:
    recommend --study-space yes --price mid --atmosphere cozy,modern,local --specials nutty,sweet,rich

  JSON output:
    recommend --format json --atmosphere airy,chic,local --specials fruity,light,floral

  Interactive mode:
    recommend --interactive"
)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the catalog, descriptor and reference CSV files
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// What to do with tags the catalog has never seen (ignore or reject)
    #[arg(long, value_name = "POLICY")]
    unknown_tags: Option<UnknownTagPolicy>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Ask the questions interactively
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    /// Do you want to study at this café?
    #[arg(long, value_enum, default_value = "no", conflicts_with = "interactive")]
    study_space: YesNo,

    /// Are you willing to drive to this café?
    #[arg(long, value_enum, default_value = "no", conflicts_with = "interactive")]
    drive: YesNo,

    /// Do you typically order coffee with non-dairy milk?
    #[arg(long, value_enum, default_value = "no", conflicts_with = "interactive")]
    nondairy: YesNo,

    /// Are you gluten free?
    #[arg(long, value_enum, default_value = "no", conflicts_with = "interactive")]
    gluten_free: YesNo,

    /// Do you want to eat a full meal at this café?
    #[arg(long, value_enum, default_value = "no", conflicts_with = "interactive")]
    full_meal: YesNo,

    /// Preferred price point (low, mid or high)
    #[arg(long, default_value = "low", value_name = "TIER", conflicts_with = "interactive")]
    price: PriceTier,

    /// Three atmosphere adjectives, comma separated
    #[arg(long, value_delimiter = ',', value_name = "TAGS", conflicts_with = "interactive")]
    atmosphere: Vec<String>,

    /// Three coffee flavors, comma separated
    #[arg(long, value_delimiter = ',', value_name = "TAGS", conflicts_with = "interactive")]
    specials: Vec<String>,
}

impl Args {
    fn general(&self) -> GeneralPreferences {
        GeneralPreferences {
            study_space: self.study_space.as_bool(),
            car_req: self.drive.as_bool(),
            nondairy_charge: self.nondairy.as_bool(),
            gluten_free: self.gluten_free.as_bool(),
            food_menu: self.full_meal.as_bool(),
            price_tier: self.price,
        }
    }
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Resolve the engine configuration from the config file and CLI overrides
fn resolve_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(policy) = args.unknown_tags {
        config.unknown_tags = policy;
    }

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Format a recommendation as a pretty table
fn format_recommendation_table(rec: &Recommendation) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Café").add_attribute(Attribute::Bold),
        Cell::new("Try their").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
        Cell::new("Asset").add_attribute(Attribute::Bold),
    ]);

    let asset = rec
        .record
        .asset
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    table.add_row(vec![
        Cell::new(&rec.record.cafe_name).fg(Color::Green),
        Cell::new(&rec.record.specials).fg(Color::Cyan),
        Cell::new(format!("{:.4}", rec.score)),
        Cell::new(asset),
    ]);

    format!(
        "Your café recommendation is {}.\nYou should try their {}!\n{}",
        rec.record.cafe_name, rec.record.specials, table
    )
}

/// Format a recommendation as JSON
fn format_recommendation_json(rec: &Recommendation) -> Result<String> {
    let response = RecommendResponse::from(rec.clone());
    serde_json::to_string_pretty(&response).with_context(|| "Failed to serialize recommendation to JSON")
}

/// What happened to one recommendation request
#[derive(Debug, PartialEq)]
enum Outcome {
    /// A recommendation was printed
    Shown,
    /// The hard filters left no café
    NoMatch,
    /// The answers were rejected; the message says why
    Rejected(String),
}

/// Run the engine and print the outcome.
///
/// Answers the engine rejects are reported rather than returned as errors, so
/// the interactive session can ask again.
fn run_once(recommender: &dyn Recommender, prefs: &UserPreferences, format: OutputFormat) -> Result<Outcome> {
    match recommender.recommend(prefs) {
        Ok(rec) => {
            let output = match format {
                OutputFormat::Table => format_recommendation_table(&rec),
                OutputFormat::Json => format_recommendation_json(&rec)?,
            };
            println!("{}", output);
            Ok(Outcome::Shown)
        }
        Err(RecommendError::EmptyCandidateSet) => {
            eprintln!("No café matches your answers. Try relaxing one of the yes/no questions.");
            Ok(Outcome::NoMatch)
        }
        Err(e @ (RecommendError::InvalidInput(_) | RecommendError::VocabularyMismatch(_))) => {
            eprintln!("{}", e);
            Ok(Outcome::Rejected(e.to_string()))
        }
        Err(e) => Err(e).with_context(|| "Failed to compute a recommendation"),
    }
}

enum Answer<T> {
    Value(T),
    Quit,
}

/// Read one line; `None` on Ctrl+C or Ctrl+D
fn prompt(rl: &mut DefaultEditor, question: &str) -> Result<Option<String>> {
    match rl.readline(&format!("{}\n> ", question)) {
        Ok(line) => {
            let line = line.trim().to_string();
            if !line.is_empty() {
                rl.add_history_entry(line.as_str()).ok(); // Ignore errors from adding to history
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err).with_context(|| "Failed to read input"),
    }
}

fn ask_yes_no(rl: &mut DefaultEditor, question: &str) -> Result<Answer<bool>> {
    loop {
        let Some(line) = prompt(rl, &format!("{} (yes/no)", question))? else {
            return Ok(Answer::Quit);
        };
        match line.to_lowercase().as_str() {
            "y" | "yes" | "1" => return Ok(Answer::Value(true)),
            "n" | "no" | "0" => return Ok(Answer::Value(false)),
            _ => eprintln!("Please answer yes or no."),
        }
    }
}

fn ask_price(rl: &mut DefaultEditor) -> Result<Answer<PriceTier>> {
    loop {
        let Some(line) = prompt(rl, "What is your preferred price point? (low/mid/high)")? else {
            return Ok(Answer::Quit);
        };
        match line.parse::<PriceTier>() {
            Ok(tier) => return Ok(Answer::Value(tier)),
            Err(e) => eprintln!("{}", e),
        }
    }
}

/// Split a comma separated answer into normalized tags.
///
/// Tags are compared after normalization, the same way the engine compares
/// them, so "Cozy" and "cozy" count as one entry.
fn parse_tags(line: &str) -> std::result::Result<Vec<String>, String> {
    let tags: Vec<String> = line
        .split(',')
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() != TAGS_PER_FAMILY {
        return Err(format!(
            "Please pick exactly {} entries (you gave {}).",
            TAGS_PER_FAMILY,
            tags.len()
        ));
    }
    let distinct: HashSet<&String> = tags.iter().collect();
    if distinct.len() != tags.len() {
        return Err(format!("Please pick {} different entries.", TAGS_PER_FAMILY));
    }
    Ok(tags)
}

fn ask_tags(rl: &mut DefaultEditor, question: &str, suggestions: &[&str]) -> Result<Answer<Vec<String>>> {
    let question = format!(
        "{}\n  suggestions: {}\n  (three, comma separated)",
        question,
        suggestions.join(", ")
    );
    loop {
        let Some(line) = prompt(rl, &question)? else {
            return Ok(Answer::Quit);
        };
        match parse_tags(&line) {
            Ok(tags) => return Ok(Answer::Value(tags)),
            Err(msg) => eprintln!("{}", msg),
        }
    }
}

macro_rules! answer {
    ($ask:expr) => {
        match $ask? {
            Answer::Value(v) => v,
            Answer::Quit => return Ok(None),
        }
    };
}

/// Ask the six yes/no and price questions; `None` if the user quits midway
fn ask_general(rl: &mut DefaultEditor) -> Result<Option<GeneralPreferences>> {
    Ok(Some(GeneralPreferences {
        study_space: answer!(ask_yes_no(rl, "Do you want to study at this café?")),
        car_req: answer!(ask_yes_no(rl, "Are you willing to drive to this café?")),
        nondairy_charge: answer!(ask_yes_no(rl, "Do you typically order coffee with non-dairy milk?")),
        gluten_free: answer!(ask_yes_no(rl, "Are you gluten free?")),
        food_menu: answer!(ask_yes_no(rl, "Do you want to eat a full meal at this café?")),
        price_tier: answer!(ask_price(rl)),
    }))
}

/// Ask the two tag questions; `None` if the user quits midway
fn ask_preferences(rl: &mut DefaultEditor, general: GeneralPreferences) -> Result<Option<UserPreferences>> {
    loop {
        let atmosphere = answer!(ask_tags(
            rl,
            "Please select your top three adjectives for the ideal café atmosphere:",
            &ATMOSPHERE_SUGGESTIONS
        ));
        let specials = answer!(ask_tags(
            rl,
            "Please select your top three flavors for a coffee drink:",
            &SPECIALS_SUGGESTIONS
        ));
        match UserPreferences::new(general, atmosphere, specials) {
            Ok(prefs) => return Ok(Some(prefs)),
            Err(e) => eprintln!("{}", e),
        }
    }
}

/// Run interactive questionnaire mode
fn run_interactive(recommender: &dyn Recommender, format: OutputFormat) -> Result<()> {
    println!("Café Recommender");
    println!("Answer the questions below to get your recommendation.");
    println!("  Ctrl+D or Ctrl+C - Exit");
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    'session: loop {
        let Some(general) = ask_general(&mut rl)? else {
            break;
        };

        // Rejected tags only send the user back to the tag questions
        loop {
            let Some(prefs) = ask_preferences(&mut rl, general)? else {
                break 'session;
            };
            match run_once(recommender, &prefs, format)? {
                Outcome::Rejected(_) => eprintln!("Please choose your tags again."),
                Outcome::Shown | Outcome::NoMatch => break,
            }
        }

        match ask_yes_no(&mut rl, "Would you like another recommendation?")? {
            Answer::Value(true) => println!(),
            _ => break,
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!("Using data directory {}", config.data_dir.display());

    let recommender = config
        .build_recommender()
        .with_context(|| format!("Failed to load café data from {}", config.data_dir.display()))?;

    if args.interactive {
        run_interactive(recommender.as_ref(), args.format)?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.atmosphere.is_empty() || args.specials.is_empty() {
        bail!("--atmosphere and --specials are required unless --interactive is given");
    }

    let prefs = UserPreferences::new(args.general(), args.atmosphere.clone(), args.specials.clone())
        .with_context(|| "Invalid answers")?;

    match run_once(recommender.as_ref(), &prefs, args.format)? {
        Outcome::Shown => Ok(ExitCode::SUCCESS),
        Outcome::NoMatch => Ok(ExitCode::from(2)),
        Outcome::Rejected(_) => Ok(ExitCode::FAILURE),
    }
}
