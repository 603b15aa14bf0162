//! Validate command - integrity scan of the stored graph or a definition file

use super::{print_json, read_definition, Cli, Session};
use anyhow::Result;
use console::style;
use std::path::Path;
use storyline::config::{load_storyline_config, OutputFormat};
use storyline::graph::GraphSnapshot;
use storyline::query::IntegrityReport;

pub fn run(cli: &Cli, file: Option<&Path>) -> Result<()> {
    let (report, json) = match file {
        Some(path) => {
            let definition = read_definition(path)?;
            let graph = GraphSnapshot::from_unchecked(definition.challenges);
            let format = cli
                .format
                .as_deref()
                .and_then(OutputFormat::parse)
                .unwrap_or(load_storyline_config(&cli.dir).defaults.format);
            (IntegrityReport::scan(&graph), format == OutputFormat::Json)
        }
        None => {
            let session = Session::open(cli)?;
            (
                session.storyline.queries().integrity_report(),
                session.is_json(),
            )
        }
    };

    if json {
        print_json(&report)?;
    } else if report.valid {
        println!(
            "{} Storyline is valid: {} challenges, {} roots",
            style("✓").green(),
            report.challenge_count,
            report.root_count
        );
    } else {
        println!(
            "{} Found {} problems:",
            style("✗").red(),
            report.issues.len()
        );
        for issue in &report.issues {
            println!("  - {}", issue);
        }
    }

    if !report.valid {
        anyhow::bail!("storyline integrity check failed");
    }
    Ok(())
}
