//! Player commands - solve, describe, finalize

use super::{print_json, Cli, Session};
use anyhow::Result;
use console::style;
use serde_json::json;
use storyline::models::{ChallengeId, PlayerId};

pub fn solve(cli: &Cli, player: u64, challenge: u64) -> Result<()> {
    let session = Session::open(cli)?;
    let outcome = session
        .storyline
        .record_solve(PlayerId(player), ChallengeId(challenge))?;
    if !outcome.already_solved {
        session.save()?;
    }

    if session.is_json() {
        return print_json(&json!({
            "player": player,
            "challenge": challenge,
            "alreadySolved": outcome.already_solved,
            "solvedAt": outcome.record.solved_at,
            "unlocked": outcome.unlocked,
            "newlyUnlocked": outcome.newly_unlocked,
        }));
    }

    if outcome.already_solved {
        println!(
            "{} Player {} already solved challenge {}",
            style("=").dim(),
            player,
            challenge
        );
        return Ok(());
    }

    println!(
        "{} Player {} solved challenge {}",
        style("✓").green(),
        style(player).cyan(),
        style(challenge).cyan()
    );
    if !outcome.newly_unlocked.is_empty() {
        let ids: Vec<String> = outcome.newly_unlocked.iter().map(|id| id.to_string()).collect();
        println!("  {} Unlocked: {}", style("→").yellow(), ids.join(", "));
    }
    println!(
        "  {} Describe the solution with {}",
        style("✎").dim(),
        style(format!("storyline describe --player {} {} \"...\"", player, challenge)).cyan()
    );
    Ok(())
}

pub fn describe(cli: &Cli, player: u64, challenge: u64, text: &str) -> Result<()> {
    let session = Session::open(cli)?;
    session
        .storyline
        .submit_description(PlayerId(player), ChallengeId(challenge), text)?;
    session.save()?;

    if session.is_json() {
        return print_json(&json!({ "success": true }));
    }
    println!(
        "{} Saved description for challenge {}",
        style("✓").green(),
        style(challenge).cyan()
    );
    Ok(())
}

pub fn finalize(cli: &Cli, player: u64, challenge: u64) -> Result<()> {
    let session = Session::open(cli)?;
    session
        .storyline
        .finalize_description(PlayerId(player), ChallengeId(challenge))?;
    session.save()?;

    if session.is_json() {
        return print_json(&json!({ "success": true }));
    }
    println!(
        "{} Finalized description of player {} for challenge {}",
        style("✓").green(),
        player,
        challenge
    );
    Ok(())
}
