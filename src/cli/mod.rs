//! CLI command definitions and handlers

mod challenge;
mod init;
mod play;
mod status;
mod validate;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyline::config::{load_storyline_config, OutputFormat};
use storyline::models::Challenge;
use storyline::storage::StorylineDb;
use storyline::Storyline;

/// Storyline - prerequisite graphs for CTF challenges
#[derive(Parser, Debug)]
#[command(name = "storyline")]
#[command(
    version,
    about = "Storyline engine for CTF challenges: gate challenges behind their predecessors",
    after_help = "\
Examples:
  storyline init                                   Create storyline.toml and an empty database
  storyline import story.toml                      Load a whole storyline definition
  storyline challenge add 3 --name Pivot --after 1,2
  storyline solve --player 7 3                     Record a solve
  storyline view player 7 --format json            What player 7 can see
  storyline validate --file story.toml             Lint a definition before importing"
)]
pub struct Cli {
    /// Storyline directory (holds storyline.toml and the database)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Database file (overrides storage.path from config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Output format: text, json (default: from config)
    #[arg(long, short = 'f', global = true, value_parser = ["text", "json"])]
    pub format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create storyline.toml and an empty database
    Init,

    /// Import a storyline definition file (TOML or JSON)
    #[command(after_help = "\
Definition format:
  [[challenge]]
  id = 1
  name = \"Recon\"
  category = \"osint\"

  [[challenge]]
  id = 2
  name = \"Foothold\"
  predecessors = [1]
  max_lifetime = 30")]
    Import {
        /// Definition file
        file: PathBuf,
    },

    /// Add, update or remove a single challenge
    Challenge {
        #[command(subcommand)]
        action: ChallengeAction,
    },

    /// Record a solve for a player
    Solve {
        #[arg(long)]
        player: u64,
        challenge: u64,
    },

    /// Submit (or replace) a solution description
    Describe {
        #[arg(long)]
        player: u64,
        challenge: u64,
        /// Description text
        text: String,
    },

    /// Close the description window for a player's challenge
    Finalize {
        #[arg(long)]
        player: u64,
        challenge: u64,
    },

    /// Show the storyline from a player's or an admin's point of view
    View {
        #[command(subcommand)]
        target: ViewTarget,
    },

    /// Check the stored graph (or a definition file) for problems
    Validate {
        /// Lint this definition file instead of the database
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Progress of one player, or of every player
    Progress {
        #[arg(long)]
        player: Option<u64>,
    },

    /// List submitted solution descriptions
    Solutions,

    /// Show storyline statistics
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ChallengeAction {
    /// Add a new challenge
    Add {
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: Option<String>,
        /// Predecessor ids, comma separated
        #[arg(long = "after", value_delimiter = ',')]
        predecessors: Vec<u64>,
        /// Minutes the challenge stays solvable once unlocked
        #[arg(long)]
        max_lifetime: Option<u32>,
    },

    /// Change an existing challenge; omitted fields keep their value
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replace the predecessor set (comma separated)
        #[arg(long = "after", value_delimiter = ',', conflicts_with = "root")]
        predecessors: Option<Vec<u64>>,
        /// Drop every predecessor
        #[arg(long)]
        root: bool,
        #[arg(long)]
        max_lifetime: Option<u32>,
        /// Remove the time limit
        #[arg(long, conflicts_with = "max_lifetime")]
        untimed: bool,
    },

    /// Remove a challenge and its edges
    Remove { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum ViewTarget {
    /// Statuses as a player sees them
    Player { player: u64 },
    /// Admin listing with predecessor candidates
    Admin {
        /// Challenge being edited (excluded from candidates with its dependents)
        #[arg(long)]
        editing: Option<u64>,
    },
    /// Nodes and edges
    Graph,
}

/// On-disk storyline definition
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StorylineDefinition {
    #[serde(rename = "challenge", default)]
    pub challenges: Vec<Challenge>,
}

pub(crate) fn read_definition(path: &Path) -> Result<StorylineDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let definition = if is_json {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))?
    };
    Ok(definition)
}

/// An opened storyline plus the database it came from
pub(crate) struct Session {
    pub storyline: Storyline,
    pub db: StorylineDb,
    pub format: OutputFormat,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self> {
        let config = load_storyline_config(&cli.dir);
        let db_path = match &cli.db {
            Some(path) => path.clone(),
            None => config.db_path(&cli.dir),
        };
        let format = cli
            .format
            .as_deref()
            .and_then(OutputFormat::parse)
            .unwrap_or(config.defaults.format);

        let db = StorylineDb::open(&db_path)?;
        let storyline = Storyline::load(&db, config)?;
        Ok(Self {
            storyline,
            db,
            format,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.storyline.save(&self.db)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => init::run(&cli),
        Commands::Import { file } => challenge::import(&cli, file),
        Commands::Challenge { action } => challenge::run(&cli, action),
        Commands::Solve { player, challenge } => play::solve(&cli, *player, *challenge),
        Commands::Describe {
            player,
            challenge,
            text,
        } => play::describe(&cli, *player, *challenge, text),
        Commands::Finalize { player, challenge } => play::finalize(&cli, *player, *challenge),
        Commands::View { target } => view::run(&cli, target),
        Commands::Validate { file } => validate::run(&cli, file.as_deref()),
        Commands::Progress { player } => view::progress(&cli, *player),
        Commands::Solutions => view::solutions(&cli),
        Commands::Status => status::run(&cli),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_challenge_add() {
        let cli = Cli::parse_from([
            "storyline", "challenge", "add", "3", "--name", "Pivot", "--after", "1,2",
        ]);
        match cli.command {
            Commands::Challenge {
                action: ChallengeAction::Add { id, predecessors, .. },
            } => {
                assert_eq!(id, 3);
                assert_eq!(predecessors, vec![1, 2]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_definition_parses_toml() {
        let definition: StorylineDefinition = toml::from_str(
            r#"
[[challenge]]
id = 1
name = "Recon"

[[challenge]]
id = 2
name = "Foothold"
predecessors = [1]
max_lifetime = 30
"#,
        )
        .unwrap();
        assert_eq!(definition.challenges.len(), 2);
        assert_eq!(definition.challenges[1].max_lifetime, Some(30));
        assert!(definition.challenges[0].is_root());
    }
}
