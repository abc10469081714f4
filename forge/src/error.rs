use thiserror::Error;

/// Top-level error surface for [`crate::node::Node`] construction and shutdown. Mirrors the
/// teacher's `EngineError::BuilderIncomplete` pattern for a builder missing a required lego
/// piece, generalised with the kernel's own shutdown-timeout case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("node builder missing required component: {0}")]
    BuilderIncomplete(&'static str),

    #[error("shutdown did not complete within the configured timeout")]
    ShutdownTimeout,
}
