//! Inspect command: containers and resolved declarations

use colored::Colorize;
use scanner_extensions::metadata::{EffectiveDeclarations, resolve_phase};
use scanner_extensions::{DependencyKey, Extension, Phase};
use serde::Serialize;

use crate::context::PlanContext;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct ContainerReport {
    name: String,
    parent: Option<String>,
    extensions: Vec<ExtensionReport>,
}

#[derive(Debug, Serialize)]
struct ExtensionReport {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    ancestors: Vec<String>,
    phase: Phase,
    generates: Vec<String>,
    requires: Vec<String>,
}

impl ExtensionReport {
    fn of(extension: &dyn Extension, ctx: &PlanContext) -> Result<Self> {
        let ty = extension.extension_type();
        let declarations = EffectiveDeclarations::resolve(extension)?;
        let render = |keys: &[DependencyKey]| -> Vec<String> {
            keys.iter().map(|key| describe_key(key, ctx)).collect()
        };
        Ok(Self {
            name: extension.name(),
            type_name: ty.name().to_string(),
            ancestors: ty
                .ancestors()
                .iter()
                .skip(1)
                .map(|t| t.name().to_string())
                .collect(),
            phase: resolve_phase(&ty),
            generates: render(&declarations.generates),
            requires: render(&declarations.requires),
        })
    }
}

/// Extension references print as `@name` when the plan knows the target.
fn describe_key(key: &DependencyKey, ctx: &PlanContext) -> String {
    if let DependencyKey::Extension(id) = key {
        if let Some(name) = ctx.plan.name_of(*id) {
            return format!("@{}", name);
        }
    }
    key.to_string()
}

/// Run the inspect command
pub fn run_inspect(ctx: &PlanContext, json: bool) -> Result<()> {
    let mut reports = Vec::new();
    for container in ctx.plan.containers() {
        let extensions = container
            .components()
            .map(|ext| ExtensionReport::of(ext.as_ref(), ctx))
            .collect::<Result<Vec<_>>>()?;
        reports.push(ContainerReport {
            name: container.name().to_string(),
            parent: container.parent().map(|p| p.name().to_string()),
            extensions,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        match &report.parent {
            Some(parent) => println!(
                "{} {}",
                report.name.cyan().bold(),
                format!("(child of {})", parent).dimmed()
            ),
            None => println!("{}", report.name.cyan().bold()),
        }
        if report.extensions.is_empty() {
            println!("  {}", "(empty)".dimmed());
        }
        for ext in &report.extensions {
            println!(
                "  {} {} {}",
                ext.name.green(),
                ext.type_name.dimmed(),
                format!("[{}]", ext.phase).yellow()
            );
            if !ext.ancestors.is_empty() {
                println!("      extends:  {}", ext.ancestors.join(", "));
            }
            if !ext.generates.is_empty() {
                println!("      provides: {}", ext.generates.join(", "));
            }
            if !ext.requires.is_empty() {
                println!("      requires: {}", ext.requires.join(", "));
            }
        }
        println!();
    }

    let total: usize = reports.iter().map(|r| r.extensions.len()).sum();
    println!(
        "{} {} containers, {} extensions.",
        "Total:".dimmed(),
        reports.len(),
        total
    );
    Ok(())
}
