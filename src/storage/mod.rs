//! Storyline persistence using redb
//!
//! Challenges are keyed by id, solves and descriptions by
//! `"{player}:{challenge}"`, with JSON values. A small meta table carries the
//! graph version. `save` rewrites everything in one write transaction, so a
//! crash leaves either the old or the new state.

use crate::models::{Challenge, PlayerSolveRecord, SolutionDescription};
use anyhow::{Context, Result};
use redb::ReadableTable;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

// redb table definitions
const CHALLENGES_TABLE: redb::TableDefinition<u64, &[u8]> =
    redb::TableDefinition::new("challenges");
const SOLVES_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("solves");
const DESCRIPTIONS_TABLE: redb::TableDefinition<&str, &[u8]> =
    redb::TableDefinition::new("descriptions");
const META_TABLE: redb::TableDefinition<&str, u64> = redb::TableDefinition::new("meta");

const GRAPH_VERSION_KEY: &str = "graph_version";

/// Everything a storyline needs to be rebuilt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Version of the graph when it was saved
    pub graph_version: u64,
    pub challenges: Vec<Challenge>,
    pub solves: Vec<PlayerSolveRecord>,
    pub descriptions: Vec<SolutionDescription>,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty() && self.solves.is_empty() && self.descriptions.is_empty()
    }
}

pub struct StorylineDb {
    db: redb::Database,
    path: PathBuf,
}

impl StorylineDb {
    /// Create or open the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let db = redb::Database::create(path).context("Failed to open redb database")?;
        debug!("Opened storyline database at {}", path.display());

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored state with `state`
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        // Dropping tables first removes rows for deleted challenges
        write_txn.delete_table(CHALLENGES_TABLE)?;
        write_txn.delete_table(SOLVES_TABLE)?;
        write_txn.delete_table(DESCRIPTIONS_TABLE)?;
        write_txn.delete_table(META_TABLE)?;
        {
            let mut table = write_txn.open_table(META_TABLE)?;
            table.insert(GRAPH_VERSION_KEY, state.graph_version)?;

            let mut table = write_txn.open_table(CHALLENGES_TABLE)?;
            for challenge in &state.challenges {
                let value = serde_json::to_vec(challenge)?;
                table.insert(challenge.id.0, value.as_slice())?;
            }

            let mut table = write_txn.open_table(SOLVES_TABLE)?;
            for record in &state.solves {
                let key = format!("{}:{}", record.player, record.challenge);
                let value = serde_json::to_vec(record)?;
                table.insert(key.as_str(), value.as_slice())?;
            }

            let mut table = write_txn.open_table(DESCRIPTIONS_TABLE)?;
            for description in &state.descriptions {
                let key = format!("{}:{}", description.player, description.challenge);
                let value = serde_json::to_vec(description)?;
                table.insert(key.as_str(), value.as_slice())?;
            }
        }
        write_txn.commit()?;

        debug!(
            version = state.graph_version,
            challenges = state.challenges.len(),
            solves = state.solves.len(),
            descriptions = state.descriptions.len(),
            "Saved storyline to {}",
            self.path.display()
        );
        Ok(())
    }

    /// Read the stored state; a fresh database yields an empty state
    pub fn load(&self) -> Result<PersistedState> {
        let read_txn = self.db.begin_read()?;

        let challenges = match read_txn.open_table(CHALLENGES_TABLE) {
            Ok(table) => {
                let mut out = Vec::new();
                for item in table.iter()? {
                    let (_, value) = item?;
                    out.push(decode::<Challenge>(value.value(), "challenge")?);
                }
                out
            }
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(PersistedState::default()),
            Err(e) => return Err(e.into()),
        };

        let graph_version = match read_txn.open_table(META_TABLE) {
            Ok(table) => table.get(GRAPH_VERSION_KEY)?.map_or(0, |v| v.value()),
            Err(redb::TableError::TableDoesNotExist(_)) => 0,
            Err(e) => return Err(e.into()),
        };
        let solves = load_keyed::<PlayerSolveRecord>(&read_txn, SOLVES_TABLE, "solve")?;
        let descriptions =
            load_keyed::<SolutionDescription>(&read_txn, DESCRIPTIONS_TABLE, "description")?;

        Ok(PersistedState {
            graph_version,
            challenges,
            solves,
            descriptions,
        })
    }
}

fn load_keyed<T: DeserializeOwned>(
    read_txn: &redb::ReadTransaction,
    definition: redb::TableDefinition<'static, &'static str, &'static [u8]>,
    what: &str,
) -> Result<Vec<T>> {
    let table = match read_txn.open_table(definition) {
        Ok(t) => t,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for item in table.iter()? {
        let (_, value) = item?;
        out.push(decode(value.value(), what)?);
    }
    Ok(out)
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(bytes).with_context(|| format!("Corrupt {} record", what))
}
