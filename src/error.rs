use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for extraction and lexicon handling.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A named vocabulary declaration is absent from the source.
    #[error("Could not find declaration '{name}' in generator source")]
    MissingDeclaration {
        /// Declared identifier that was searched for
        name: String,
    },

    /// A named function definition is absent from the source.
    #[error("Could not find function '{name}()' in generator source")]
    MissingFunction {
        /// Function name that was searched for
        name: String,
    },

    /// A function header was found but its body never closes.
    #[error("Body of function '{name}()' is not terminated by a matching '}}'")]
    UnterminatedRegion {
        /// Function name whose body is unbalanced
        name: String,
    },

    /// A pick-list assignment is absent from a function body.
    #[error("Could not find '{variable} = {picker}({{...}})' in {function}()")]
    MissingAssignment {
        /// Variable being assigned
        variable: String,
        /// Picker function expected on the right-hand side
        picker: String,
        /// Function searched
        function: String,
    },

    /// A located vocabulary resolved to no usable entries.
    #[error("Vocabulary '{name}' has no non-empty entries")]
    EmptyVocabulary {
        /// Vocabulary name
        name: String,
    },

    /// A function produced no emitted literals.
    #[error("{function}() contained no parseable literals emitted via {emitter}(...)")]
    NoLiterals {
        /// Function scanned
        function: String,
        /// Emitter call that was expected
        emitter: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// A pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing declaration error.
    #[must_use]
    pub fn missing_declaration(name: impl Into<String>) -> Self {
        Self::MissingDeclaration { name: name.into() }
    }

    /// Creates a missing function error.
    #[must_use]
    pub fn missing_function(name: impl Into<String>) -> Self {
        Self::MissingFunction { name: name.into() }
    }

    /// Creates an empty vocabulary error.
    #[must_use]
    pub fn empty_vocabulary(name: impl Into<String>) -> Self {
        Self::EmptyVocabulary { name: name.into() }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error comes from reading the generator source.
    #[must_use]
    pub const fn is_extraction(&self) -> bool {
        matches!(
            self,
            Self::MissingDeclaration { .. }
                | Self::MissingFunction { .. }
                | Self::UnterminatedRegion { .. }
                | Self::MissingAssignment { .. }
                | Self::EmptyVocabulary { .. }
                | Self::NoLiterals { .. }
        )
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: "<generated>".to_string(),
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(!err.is_extraction());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_extraction_errors() {
        let err = Error::missing_function("getShot");
        assert!(err.is_extraction());
        assert_eq!(
            err.to_string(),
            "Could not find function 'getShot()' in generator source"
        );

        let err = Error::MissingAssignment {
            variable: "haircolor".into(),
            picker: "pickRandomString".into(),
            function: "getHair".into(),
        };
        assert!(err.to_string().contains("haircolor = pickRandomString({...})"));
    }

    #[test]
    fn test_unterminated_message_braces() {
        let err = Error::UnterminatedRegion {
            name: "getShot".into(),
        };
        assert!(err.to_string().ends_with("matching '}'"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/ai.cpp", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/ai.cpp"));
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_regex_error() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: Error = regex_err.into();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
