use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("Order rejected: {0}")]
    InvalidOrder(String),

    #[error("Execution venue unavailable: {0}")]
    Unavailable(String),
}
