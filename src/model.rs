//! Saving and restoring what the Oracle has learned.
//!
//! A model file is a versioned, flat list of `(decision, value)` entries,
//! optionally followed by the visit and transition counters. Files ending in
//! `.json` are written as JSON; anything else uses bincode.

use crate::config::LearningConfig;
use crate::grid::Window;
use crate::oracle::{Decision, Oracle, QTable};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CURRENT_MODEL_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QEntry {
    pub decision: Decision,
    pub value: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VisitEntry {
    pub window: Window,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransitionEntry {
    pub from: Decision,
    pub to: Decision,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ModelFile {
    pub version: u32,
    pub entries: Vec<QEntry>,
    pub visits: Vec<VisitEntry>,
    pub transitions: Vec<TransitionEntry>,
}

impl ModelFile {
    /// Snapshot of `oracle`. Counters are only included on request.
    pub fn from_oracle(oracle: &Oracle, with_counters: bool) -> Self {
        let mut file = Self::from_table(oracle.table());
        if with_counters {
            file.visits = oracle
                .visit_counts()
                .map(|(window, count)| VisitEntry { window: window.clone(), count })
                .collect();
            file.transitions = oracle
                .transition_counts()
                .map(|(from, to, count)| TransitionEntry { from: from.clone(), to: to.clone(), count })
                .collect();
        }
        file
    }

    pub fn from_table(table: &QTable) -> Self {
        Self {
            version: CURRENT_MODEL_VERSION,
            entries: table
                .iter()
                .map(|(decision, value)| QEntry { decision: decision.clone(), value })
                .collect(),
            visits: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn table(&self) -> QTable {
        self.entries
            .iter()
            .map(|e| (e.decision.clone(), e.value))
            .collect()
    }

    pub fn into_oracle(self, params: LearningConfig) -> Result<Oracle> {
        let mut oracle = Oracle::with_table(params, self.table())?;
        for v in self.visits {
            oracle.restore_visits(v.window, v.count);
        }
        for t in self.transitions {
            oracle.restore_transition(t.from, t.to, t.count);
        }
        Ok(oracle)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).context("Failed to encode model")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (file, _) = bincode::serde::decode_from_slice::<ModelFile, _>(bytes, bincode::config::standard())
            .context("Failed to decode model")?;
        Ok(file)
    }

    fn check_version(&self) -> Result<()> {
        match self.version {
            CURRENT_MODEL_VERSION => Ok(()),
            v if v > CURRENT_MODEL_VERSION => bail!(
                "Model file version {} is newer than supported version {}",
                v,
                CURRENT_MODEL_VERSION
            ),
            v => bail!("Unsupported model version: {v}"),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn save_model(oracle: &Oracle, path: impl AsRef<Path>, with_counters: bool) -> Result<()> {
    let path = path.as_ref();
    let file = ModelFile::from_oracle(oracle, with_counters);
    let data = if is_json(path) {
        serde_json::to_vec(&file).context("Failed to serialize model")?
    } else {
        file.to_bytes()?
    };
    fs::write(path, data).with_context(|| format!("Failed to write model {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = file.entries.len(), "model saved");
    Ok(())
}

pub fn load_model_file(path: impl AsRef<Path>) -> Result<ModelFile> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("Failed to read model {}", path.display()))?;
    let file: ModelFile = if is_json(path) {
        serde_json::from_slice(&data).context("Failed to deserialize model")?
    } else {
        ModelFile::from_bytes(&data)?
    };
    file.check_version()?;
    tracing::info!(path = %path.display(), entries = file.entries.len(), "model loaded");
    Ok(file)
}

/// Restores an Oracle from disk with the given learning parameters.
pub fn load_model(path: impl AsRef<Path>, params: LearningConfig) -> Result<Oracle> {
    params.validate()?;
    load_model_file(path)?.into_oracle(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::board::Board;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("snake-oracle-{}-{name}", std::process::id()))
    }

    fn trained_board() -> Board {
        let mut config = SimConfig::default();
        config.board.side_length = 10;
        config.board.initial_snakes = 4;
        config.seed = Some(21);
        let mut board = Board::new(config).unwrap();
        board.run(150);
        board
    }

    fn assert_same_table(a: &QTable, b: &QTable) {
        assert_eq!(a.len(), b.len());
        for (decision, value) in a.iter() {
            assert_eq!(b.get(decision), Some(value));
        }
    }

    #[test]
    fn table_round_trips_in_memory() {
        let board = trained_board();
        let table = board.oracle().table();
        assert!(!table.is_empty());
        let back = ModelFile::from_bytes(&ModelFile::from_table(table).to_bytes().unwrap()).unwrap();
        assert_same_table(table, &back.table());
    }

    #[test]
    fn json_file_round_trip() {
        let board = trained_board();
        let path = temp_path("model.json");
        save_model(board.oracle(), &path, false).unwrap();
        let oracle = load_model(&path, LearningConfig::default()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_same_table(board.oracle().table(), oracle.table());
        assert_eq!(oracle.visit_counts().count(), 0);
    }

    #[test]
    fn binary_file_keeps_counters() {
        let board = trained_board();
        let path = temp_path("model.bin");
        save_model(board.oracle(), &path, true).unwrap();
        let oracle = load_model(&path, LearningConfig::default()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_same_table(board.oracle().table(), oracle.table());
        for (window, count) in board.oracle().visit_counts() {
            assert_eq!(oracle.visits(window), count);
        }
        for (from, to, count) in board.oracle().transition_counts() {
            assert_eq!(oracle.transition_count(from, to), count);
        }
    }

    #[test]
    fn rejects_newer_version() {
        let path = temp_path("future.json");
        let file = ModelFile { version: CURRENT_MODEL_VERSION + 1, ..ModelFile::default() };
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();
        let err = load_model_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn rejects_invalid_learning_params() {
        let board = trained_board();
        let path = temp_path("params.json");
        save_model(board.oracle(), &path, false).unwrap();
        let params = LearningConfig { alpha: 0.0, ..LearningConfig::default() };
        let result = load_model(&path, params);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_model(temp_path("absent.bin"), LearningConfig::default()).is_err());
    }
}
