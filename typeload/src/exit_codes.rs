#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run finished but one or more chunks failed.
    ChunksFailed = 10,

    /// Invalid CLI/config/options (bad flags, unreadable corpus, invalid run file, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (no chunk completed, IO errors, task failures).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_failed_chunks(failed: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else {
            Self::ChunksFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_chunks_map_to_exit_code() {
        assert_eq!(ExitCode::from_failed_chunks(0), ExitCode::Success);
        assert_eq!(ExitCode::from_failed_chunks(3).as_i32(), 10);
    }
}
