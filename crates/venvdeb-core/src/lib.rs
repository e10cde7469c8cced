//! venvdeb - package Python virtual environments as Debian packages
//!
//! This crate provides the library behind the `venvdeb` CLI, including:
//! - Configuration file parsing and merging
//! - Virtual environment validation and project metadata queries
//! - Reversible install-prefix rewriting of console scripts and .pth files
//! - Source distribution bundling for shipped integration tests
//! - Debian package assembly via fpm
//! - Publishing built packages to a remote apt pool repository

pub mod command;
pub mod config;
pub mod error;
pub mod package;
pub mod provenance;
pub mod publish;
pub mod rewrite;
pub mod sdist;
pub mod venv;

pub use error::{Error, Result};
