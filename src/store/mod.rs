pub mod keys;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

/// Snapshot store for per-student engine state. Abilities and skill trees
/// live in separate trees keyed by user id; values are JSON.
#[derive(Debug)]
pub struct Store {
    db: Db,
    pub student_abilities: sled::Tree,
    pub skill_trees: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transaction aborted: entity={entity}, key={key}")]
    Aborted { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let student_abilities = db.open_tree(trees::STUDENT_ABILITIES)?;
        let skill_trees = db.open_tree(trees::SKILL_TREES)?;

        Ok(Self {
            db,
            student_abilities,
            skill_trees,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
