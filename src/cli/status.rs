//! Status command - storyline statistics

use super::{print_json, Cli, Session};
use anyhow::Result;
use console::style;
use serde_json::json;

/// Run the status command
pub fn run(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let stats = session.storyline.queries().stats();
    let cache = session.storyline.frontier().stats();

    if session.is_json() {
        return print_json(&json!({
            "database": session.db.path().display().to_string(),
            "stats": stats,
            "cacheEnabled": session.storyline.config().evaluator.cache,
        }));
    }

    println!("\nStoryline Status\n");
    println!("  Database: {}", style(session.db.path().display()).cyan());
    println!();
    println!(
        "  {} challenges ({} roots, {} timed), {} edges",
        style(stats.total_challenges).cyan(),
        stats.root_challenges,
        stats.timed_challenges,
        stats.edges
    );
    println!("  Longest chain: {}", stats.max_depth);
    println!(
        "  {} players, {} solves, {} descriptions",
        style(stats.players).cyan(),
        stats.solves,
        stats.descriptions
    );
    println!(
        "  Unlock cache: {} ({} entries)",
        if session.storyline.config().evaluator.cache {
            style("on").green()
        } else {
            style("off").dim()
        },
        cache.entries
    );
    Ok(())
}
