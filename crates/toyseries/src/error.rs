//! Errors raised while synthesizing series.

/// Everything that can go wrong in a single generation call.
///
/// None of these are recovered internally. Any of them aborts the call and no
/// partial matrix is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum SynthError {
    /// A configuration value or input is outside of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The shape function returned a block whose shape differs from its input.
    #[error("shape function returned shape {actual:?} for cluster {cluster}, expected {expected:?}")]
    ShapeMismatch {
        /// Index of the cluster being generated.
        cluster: usize,
        /// Shape of the block passed to the shape function.
        expected: (usize, usize),
        /// Shape of the block it returned.
        actual: (usize, usize),
    },

    /// The shape function itself failed.
    #[error("shape function failed for cluster {cluster}: {message}")]
    CallbackFailure {
        /// Index of the cluster being generated.
        cluster: usize,
        /// The message returned by the shape function, unmodified.
        message: String,
    },
}

impl SynthError {
    /// Shorthand for building an `InvalidArgument` from anything printable.
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SynthError>;
