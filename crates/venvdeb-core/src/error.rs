//! Error types for venvdeb

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for venvdeb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for venvdeb
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Virtual environment validation error
    #[error("Virtual environment error: {message}")]
    Venv { message: String, help: String },

    /// Project metadata query error
    #[error("Metadata error: {message}")]
    Metadata { message: String, help: String },

    /// Path rewrite error
    #[error("Path rewrite error: {message}")]
    Rewrite { message: String, help: String },

    /// Source distribution error
    #[error("Source distribution error: {message}")]
    Sdist { message: String, help: String },

    /// Packaging error
    #[error("Packaging error: {message}")]
    Package { message: String, help: String },

    /// Publishing error
    #[error("Publish error: {message}")]
    Publish { message: String, help: String },

    /// External command error
    #[error("Command error: {message}")]
    Command { message: String, help: String },
}

impl Error {
    /// Create a virtual environment error
    pub fn venv(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Venv {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a metadata error
    pub fn metadata(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a path rewrite error
    pub fn rewrite(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Rewrite {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a source distribution error
    pub fn sdist(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Sdist {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a packaging error
    pub fn package(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a publishing error
    pub fn publish(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an external command error
    pub fn command(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            help: help.into(),
        }
    }
}
