#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no such run: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidConfig(#[from] tot_config::ConfigError),
}
