use thiserror::Error;

use crate::adaptive::catalog::CatalogError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    Parse(#[from] serde_json::Error),
}
