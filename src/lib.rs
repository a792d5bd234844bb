//! pydepup - pyproject.toml editor, dependency upgrader and import checker
//!
//! This library provides:
//! - A comment-preserving editor for Poetry and PEP 621 manifests
//! - Constraint upgrades against the latest releases on PyPI
//! - Reconciliation of source imports against declared dependencies

pub mod cli;
pub mod config;
pub mod constraint;
pub mod domain;
pub mod editor;
pub mod error;
pub mod imports;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod upgrade;
