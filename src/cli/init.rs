//! Init command - create a storyline config and database

use super::{Cli, Session};
use anyhow::{Context, Result};
use console::style;
use storyline::config::StorylineConfig;

/// Run the init command
pub fn run(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.dir)
        .with_context(|| format!("Failed to create {}", cli.dir.display()))?;

    println!("\n{} Initializing storyline\n", style("▶").bold());

    let config_path = cli.dir.join("storyline.toml");
    if config_path.exists() {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    } else {
        std::fs::write(&config_path, StorylineConfig::template())
            .with_context(|| "Failed to create storyline.toml")?;
        println!(
            "{} Created {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    }

    // Opening creates the database file; saving writes the (empty) tables
    let session = Session::open(cli)?;
    session.save()?;
    println!(
        "{} Database ready at {} ({} challenges)",
        style("✓").green(),
        style(session.db.path().display()).cyan(),
        session.storyline.graph().len()
    );

    println!(
        "\nNext: {} or {}",
        style("storyline import <file>").cyan(),
        style("storyline challenge add").cyan()
    );
    Ok(())
}
