use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A loop or click buffer could not be allocated; the engine never starts half-built.
    #[error("failed to allocate {frames} frames for {what}")]
    Allocation { what: &'static str, frames: usize },

    #[error("invalid engine settings: {0}")]
    InvalidSettings(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
