use thiserror::Error;

#[derive(Error, Debug)]
pub enum PicError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Guard cells too small on axis {axis}: shape needs {required}, only {available} available")]
    GuardCellViolation {
        axis: usize,
        required: i64,
        available: i64,
    },

    #[error("{count} particle(s) out of deposition range (allowed guard overshoot {range:?})")]
    ParticleOutOfRange { count: usize, range: [i64; 3] },

    #[error("Level mismatch: {0}")]
    LevelMismatch(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PicResult<T> = Result<T, PicError>;
