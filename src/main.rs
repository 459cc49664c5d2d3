use clap::{Parser, Subcommand};
use classmate::{Config, FileStore, ProblemId, ProgressStore, UserStats, parser};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "classmate")]
#[command(version, about = "Inspect and edit locally stored Classmate progress")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an answer to a problem
    Record {
        /// User id the attempt belongs to
        user: String,
        /// Problem id
        problem: ProblemId,
        /// The answer was wrong
        #[arg(long)]
        wrong: bool,
        /// Difficulty label of the problem (easy, medium, hard)
        #[arg(short, long, default_value = "easy")]
        difficulty: String,
    },

    /// Show a user's statistics
    Stats {
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a user's stored progress record
    Show { user: String },

    /// Delete stored progress
    Purge {
        /// User whose record is deleted
        #[arg(required_unless_present = "all")]
        user: Option<String>,
        /// Delete every user's record
        #[arg(long, conflicts_with = "user")]
        all: bool,
    },

    /// Parse a plain-text problem sheet and list what it contains
    Parse {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Parse { file, json } => parse_sheet(&file, json)?,
        Commands::Record {
            user,
            problem,
            wrong,
            difficulty,
        } => {
            let store = open_store(&config)?;
            let (record, report) =
                store.record_attempt_with_report(&user, problem, !wrong, &difficulty);
            println!(
                "{} problem {}: {:+} points (total {})",
                if wrong { "Wrong answer to" } else { "Correct answer to" },
                problem,
                report.points_delta,
                record.total_points()
            );
        }
        Commands::Stats { user, json } => {
            let stats = open_store(&config)?.stats(&user);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&user, &stats);
            }
        }
        Commands::Show { user } => {
            let record = open_store(&config)?.load(&user);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Purge { user, all } => {
            let store = open_store(&config)?;
            if all {
                println!("Purged {} progress records", store.purge_all());
            } else if let Some(user) = user {
                store.purge(&user);
                println!("Purged progress of {}", user);
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<ProgressStore<FileStore>, Box<dyn std::error::Error>> {
    Ok(ProgressStore::new(FileStore::open(config.progress_dir())?))
}

fn print_stats(user: &str, stats: &UserStats) {
    println!("Progress of {}", user);
    println!("  Solved:   {}", stats.total_solved);
    println!("  Correct:  {}", stats.total_correct);
    println!("  Points:   {}", stats.total_points);
    println!("  Accuracy: {}%", stats.accuracy);
}

fn parse_sheet(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(file)?;
    let problems = parser::parse_problems(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&problems)?);
        return Ok(());
    }

    for problem in &problems {
        println!(
            "{:>4} [{}] {} ({} options)",
            problem.id,
            problem.difficulty,
            problem.content,
            problem.options.len()
        );
    }
    println!("{} problems", problems.len());

    Ok(())
}
