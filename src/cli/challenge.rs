//! Challenge commands - import, add, update, remove

use super::{print_json, read_definition, ChallengeAction, Cli, Session};
use anyhow::{Context, Result};
use console::style;
use serde_json::json;
use std::path::Path;
use storyline::models::{Challenge, ChallengeId};

pub fn import(cli: &Cli, file: &Path) -> Result<()> {
    let definition = read_definition(file)?;
    let count = definition.challenges.len();

    let session = Session::open(cli)?;
    let version = session
        .storyline
        .import_challenges(definition.challenges)
        .with_context(|| format!("Import of {} rejected", file.display()))?;
    session.save()?;

    if session.is_json() {
        return print_json(&json!({ "imported": count, "version": version }));
    }
    println!(
        "{} Imported {} challenges (graph version {})",
        style("✓").green(),
        style(count).cyan(),
        version
    );
    Ok(())
}

pub fn run(cli: &Cli, action: &ChallengeAction) -> Result<()> {
    let session = Session::open(cli)?;

    let (verb, id, version) = match action {
        ChallengeAction::Add {
            id,
            name,
            category,
            predecessors,
            max_lifetime,
        } => {
            let mut challenge = Challenge::new(*id, name).with_predecessors(predecessors.iter().copied());
            challenge.category = category.clone();
            challenge.max_lifetime = *max_lifetime;
            ("Added", *id, session.storyline.add_challenge(challenge)?)
        }

        ChallengeAction::Update {
            id,
            name,
            category,
            predecessors,
            root,
            max_lifetime,
            untimed,
        } => {
            let mut challenge = session
                .storyline
                .graph()
                .get(ChallengeId(*id))
                .with_context(|| format!("Challenge {} not found", id))?;

            if let Some(name) = name {
                challenge.name = name.clone();
            }
            if let Some(category) = category {
                challenge.category = Some(category.clone());
            }
            if *root {
                challenge.predecessors.clear();
            } else if let Some(predecessors) = predecessors {
                challenge.predecessors = predecessors.iter().copied().map(ChallengeId).collect();
            }
            if *untimed {
                challenge.max_lifetime = None;
            } else if max_lifetime.is_some() {
                challenge.max_lifetime = *max_lifetime;
            }

            ("Updated", *id, session.storyline.update_challenge(challenge)?)
        }

        ChallengeAction::Remove { id } => {
            session.storyline.remove_challenge(ChallengeId(*id))?;
            ("Removed", *id, session.storyline.graph().version())
        }
    };

    session.save()?;

    if session.is_json() {
        return print_json(&json!({ "challenge": id, "version": version }));
    }
    println!(
        "{} {} challenge {} (graph version {})",
        style("✓").green(),
        verb,
        style(id).cyan(),
        version
    );
    Ok(())
}
