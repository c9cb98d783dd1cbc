use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }

    /// Classifies an engine error: configuration and partition problems are the caller's fault.
    pub fn from_core(err: typeload_core::Error) -> Self {
        use typeload_core::Error as E;

        match err {
            E::InvalidConcurrency
            | E::InvalidCheckpointInterval
            | E::InvalidSnapshotInterval
            | E::InvalidDocument
            | E::InvalidParts
            | E::Metrics(_)
            | E::PartitionLookup(_) => Self::InvalidInput(err.into()),
            other => Self::RuntimeError(other.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}
