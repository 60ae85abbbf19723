use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Merge error: {0}")]
    Merge(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
