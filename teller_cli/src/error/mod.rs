use colored::*;
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Network,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    NetworkError = 3,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

const COMMANDS: [&str; 4] = ["server", "client", "config", "completions"];

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Misuse);
        error
            .suggestions
            .push("Run 'teller --help' for usage information".to_string());

        // Simple typo detection
        if message.contains("Unknown command")
            && let Some(cmd) = message.split(':').nth(1).map(|s| s.trim())
        {
            for known_cmd in COMMANDS {
                if levenshtein_distance(cmd, known_cmd) <= 2 {
                    error
                        .suggestions
                        .insert(0, format!("Did you mean '{known_cmd}'?"));
                    break;
                }
            }
        }

        error
    }

    /// Create a network error
    pub fn network(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Network);
        error.suggestions = vec![
            "Check that 'teller server' is running".to_string(),
            "Verify the server address with 'teller config get client.server'".to_string(),
            "Try again later".to_string(),
        ];
        error
    }

    /// Create an error from an IO error
    pub fn from_io_error(error: io::Error, what: &str) -> Self {
        let message = format!("IO error on '{what}': {error}");
        let mut cli_error = match error.kind() {
            io::ErrorKind::AddrInUse
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut => Self::network(&message),
            _ => Self::general(&message),
        };

        if error.kind() == io::ErrorKind::AddrInUse {
            cli_error
                .suggestions
                .insert(0, "Another process is using that port; pick another with --bind".to_string());
        }

        cli_error.source = Some(Box::new(error));
        cli_error
            .context
            .push(("address".to_string(), what.to_string()));
        cli_error
    }

    /// Map a library error to the matching category
    pub fn from_core_error(error: teller_core::Error) -> Self {
        let mut cli_error = match &error {
            teller_core::Error::ServerUnresponsive {
                request_id,
                attempts,
                ..
            } => Self::network("Server is assumed to be unresponsive")
                .with_context("request", &request_id.to_string())
                .with_context("attempts", &attempts.to_string())
                .with_suggestion(
                    "A server serves one client session per run; restart it before starting another",
                ),
            teller_core::Error::RequestIdsExhausted { .. } => Self::general(&error.to_string())
                .with_suggestion("Restart the server and start a new client session"),
            teller_core::Error::SessionAborted => {
                Self::network("Session aborted after the server became unresponsive")
            }
            teller_core::Error::Protocol(e) if e.is_transient() => Self::network(&error.to_string()),
            teller_core::Error::Protocol(_) => Self::general(&error.to_string()),
        };
        cli_error.source = Some(Box::new(error));
        cli_error
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Network => ExitCode::NetworkError,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Network => "Network Error",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            ErrorCategory::General | ErrorCategory::Network => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

/// Convert anyhow errors to CLI errors, keeping library errors categorised
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<teller_core::Error>() {
            Ok(core) => Self::from_core_error(core),
            Err(error) => match error.downcast::<CliError>() {
                Ok(cli) => cli,
                Err(error) => Self::general(&format!("{error:#}")),
            },
        }
    }
}

impl From<teller_core::Error> for CliError {
    fn from(error: teller_core::Error) -> Self {
        Self::from_core_error(error)
    }
}

impl From<teller_core::protocol::ProtocolError> for CliError {
    fn from(error: teller_core::protocol::ProtocolError) -> Self {
        Self::from_core_error(error.into())
    }
}

/// Simple Levenshtein distance for command suggestions
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();
    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate().take(len2 + 1) {
        *cell = j;
    }

    for (i, c1) in s1_chars.iter().enumerate() {
        let i1 = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let j1 = j + 1;
            let cost = if c1 == c2 { 0 } else { 1 };
            matrix[i1][j1] = std::cmp::min(
                std::cmp::min(matrix[i][j1] + 1, matrix[i1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[len1][len2]
}
