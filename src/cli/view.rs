//! View commands - player and admin views, progress, solutions

use super::{print_json, Cli, Session, ViewTarget};
use anyhow::Result;
use console::style;
use storyline::models::{ChallengeId, ChallengeStatus, PlayerId};
use storyline::query::PlayerProgress;

pub fn run(cli: &Cli, target: &ViewTarget) -> Result<()> {
    let session = Session::open(cli)?;
    let queries = session.storyline.queries();

    match target {
        ViewTarget::Player { player } => {
            let view = queries.player_view(PlayerId(*player));
            if session.is_json() {
                return print_json(&view);
            }

            println!(
                "\nPlayer {} (graph version {})\n",
                style(player).cyan(),
                view.version
            );
            for c in &view.challenges {
                let status = match c.status {
                    ChallengeStatus::Solved => style("solved  ").green(),
                    ChallengeStatus::Unlocked => style("unlocked").yellow(),
                    ChallengeStatus::Expired => style("expired ").red(),
                    ChallengeStatus::Locked => style("locked  ").dim(),
                };
                let title = c.name.as_deref().unwrap_or("???");
                let timer = c
                    .minutes_remaining
                    .map(|m| format!(" ({} min left)", m))
                    .unwrap_or_default();
                println!(
                    "  {} {:>4}  {}{}{}",
                    status,
                    c.challenge_id,
                    title,
                    c.category
                        .as_deref()
                        .map(|cat| format!(" [{}]", cat))
                        .unwrap_or_default(),
                    style(timer).dim()
                );
            }
        }

        ViewTarget::Admin { editing } => {
            let view = queries.admin_view(editing.map(ChallengeId));
            if session.is_json() {
                return print_json(&view);
            }

            println!("\nChallenges (graph version {})\n", view.version);
            for c in &view.challenges {
                println!(
                    "  {:>4}  {}  after [{}]{}",
                    style(c.id).cyan(),
                    c.name,
                    join(&c.predecessor_ids),
                    c.max_lifetime
                        .map(|m| format!("  {} min", m))
                        .unwrap_or_default()
                );
            }
            if editing.is_some() {
                println!(
                    "\n  Candidate predecessors: {}",
                    join(&view.candidate_predecessors)
                );
            }
        }

        ViewTarget::Graph => {
            let graph = queries.admin_graph();
            if session.is_json() {
                return print_json(&graph);
            }

            println!(
                "\n{} nodes, {} edges, roots [{}]\n",
                graph.nodes.len(),
                graph.edges.len(),
                join(&graph.roots)
            );
            for edge in &graph.edges {
                println!("  {} -> {}", edge.from, edge.to);
            }
        }
    }
    Ok(())
}

pub fn progress(cli: &Cli, player: Option<u64>) -> Result<()> {
    let session = Session::open(cli)?;
    let queries = session.storyline.queries();

    let report: Vec<PlayerProgress> = match player {
        Some(p) => vec![queries.progress(PlayerId(p))],
        None => queries.progress_report(),
    };
    if session.is_json() {
        return print_json(&report);
    }

    if report.is_empty() {
        println!("No solves recorded yet");
        return Ok(());
    }
    println!("\n  {:>8}  {:>8}  {:>8}  {:>7}", "player", "solved", "unlocked", "done");
    for p in &report {
        println!(
            "  {:>8}  {:>8}  {:>8}  {:>6.2}%",
            style(p.player).cyan(),
            p.solved_count,
            p.unlocked_count,
            p.progress_percentage
        );
    }
    Ok(())
}

pub fn solutions(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let solutions = session.storyline.queries().solutions();
    if session.is_json() {
        return print_json(&solutions);
    }

    if solutions.is_empty() {
        println!("No solution descriptions submitted");
        return Ok(());
    }
    for s in &solutions {
        let marker = if s.finalized {
            style("final").green()
        } else {
            style("open ").yellow()
        };
        println!(
            "  [{}] challenge {} / player {}: {}",
            marker, s.challenge, s.player, s.text
        );
    }
    Ok(())
}

fn join(ids: &[ChallengeId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
