//! Command implementations for scanner-cli

pub mod inspect;
pub mod order;

use std::sync::Arc;

use colored::Colorize;
use scanner_extensions::metadata::{resolve_phase, resolve_roles};
use scanner_extensions::{Capability, Extension, Phase};
use serde::Serialize;

use crate::error::Result;

pub use inspect::run_inspect;
pub use order::{run_order, run_post_jobs, run_sensors};

/// One line of an ordered selection.
#[derive(Debug, Serialize)]
pub struct ExtensionSummary {
    pub position: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub phase: Phase,
    pub roles: Vec<Capability>,
}

impl ExtensionSummary {
    fn of(position: usize, extension: &dyn Extension) -> Self {
        let ty = extension.extension_type();
        Self {
            position,
            name: extension.name(),
            type_name: ty.name().to_string(),
            phase: resolve_phase(&ty),
            roles: resolve_roles(&ty).iter().collect(),
        }
    }
}

/// Print an ordered selection as a numbered list or as JSON.
pub(crate) fn print_selection(
    title: &str,
    extensions: &[Arc<dyn Extension>],
    json: bool,
) -> Result<()> {
    let summaries: Vec<ExtensionSummary> = extensions
        .iter()
        .enumerate()
        .map(|(i, ext)| ExtensionSummary::of(i + 1, ext.as_ref()))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{}", title.bold());
    if summaries.is_empty() {
        println!("  {}", "(nothing selected)".dimmed());
        return Ok(());
    }
    for summary in &summaries {
        let phase = match summary.phase {
            Phase::Default => String::new(),
            other => format!(" [{}]", other),
        };
        println!(
            "  {:>3}. {}{} ({})",
            summary.position,
            summary.name.green(),
            phase.yellow(),
            summary.type_name.dimmed()
        );
    }
    Ok(())
}
