//! Shared test utilities for the scanner extension workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: fake extensions covering every declaration style
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace), a temporary
//!   analysis root with settings layers and plan files

pub mod fixtures;
pub mod workspace;
