//! Run-level error type and process exit codes.
//!
//! Only failures that end a run become an `AppError`. Per-code fetch and
//! parse problems are ordinary values folded into zone outcomes.

/// Missing credential, bad arguments, bad zone file, unreadable input directory.
pub const EXIT_CONFIG: u8 = 2;
/// A merge input directory holds no feed file.
pub const EXIT_NO_INPUT: u8 = 3;
/// Reading or writing a persisted file failed.
pub const EXIT_IO: u8 = 4;
/// A feed produced no records for any zone.
pub const EXIT_NO_DATA: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn no_input(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_INPUT, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
