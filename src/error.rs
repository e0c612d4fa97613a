use nix::unistd::Pid;
use std::io;
use thiserror::Error;

/// Everything that can go wrong between reading a line and reaping its children.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A segment carried more tokens than an argument vector may hold.
    #[error("too many arguments ({count}, at most {max} allowed)")]
    ArgumentOverflow { count: usize, max: usize },

    /// A token could not be passed to exec because it contains a NUL byte.
    #[error("{0}: argument contains a NUL byte")]
    NulInArgument(String),

    /// The child process could not be created at all.
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    /// The status of a specific child could not be retrieved.
    #[error("wait failed for process {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: nix::Error,
    },

    #[error("Unable to read command line: {0}")]
    Read(#[source] io::Error),

    #[error("Unable to read command line: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),

    #[error("Failed to open input file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: nix::Error,
    },

    #[error("Failed to set new file as input: {0}")]
    Redirect(#[source] nix::Error),

    /// Writing a report line to the operator failed.
    #[error("unable to write output: {0}")]
    Output(#[from] io::Error),
}

impl ShellError {
    /// Exit status the interpreter terminates with when this error is fatal.
    pub fn exit_status(&self) -> i32 {
        match self {
            ShellError::Read(_) | ShellError::Editor(_) | ShellError::Redirect(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_exit_status_by_kind() {
        let read = ShellError::Read(io::Error::new(io::ErrorKind::InvalidInput, "bad"));
        assert_eq!(read.exit_status(), 2);
        assert_eq!(ShellError::Redirect(Errno::EBADF).exit_status(), 2);
        let open = ShellError::Open {
            path: "missing.txt".into(),
            source: Errno::ENOENT,
        };
        assert_eq!(open.exit_status(), 1);
        let wait = ShellError::Wait {
            pid: Pid::from_raw(42),
            source: Errno::ECHILD,
        };
        assert_eq!(wait.exit_status(), 1);
    }

    #[test]
    fn test_overflow_message() {
        let err = ShellError::ArgumentOverflow { count: 130, max: 128 };
        assert_eq!(err.to_string(), "too many arguments (130, at most 128 allowed)");
    }
}
