//! Selection commands: order, sensors, post-jobs

use scanner_extensions::Capability;

use super::print_selection;
use crate::context::PlanContext;
use crate::error::Result;

/// Run the order command
pub fn run_order(
    ctx: &PlanContext,
    capability: Capability,
    container: Option<&str>,
    unit: Option<&str>,
    check_eligibility: bool,
    json: bool,
) -> Result<()> {
    let dict = ctx.dictionary(container)?;
    let unit = ctx.unit(unit);
    let selected = dict.select(capability, Some(&unit), check_eligibility, None)?;

    let title = format!(
        "Execution order of {} extensions in '{}' for '{}'",
        capability,
        dict.container().name(),
        unit
    );
    print_selection(&title, &selected, json)
}

/// Run the sensors command
pub fn run_sensors(
    ctx: &PlanContext,
    container: Option<&str>,
    global: bool,
    json: bool,
) -> Result<()> {
    let dict = ctx.dictionary(container)?;
    let unit = ctx.unit(None);
    let selected = dict.select_sensors(&unit, global)?;

    let pass = if global { "global" } else { "unit" };
    let title = format!("Sensors of the {} pass for '{}'", pass, unit);
    print_selection(&title, &selected, json)
}

/// Run the post-jobs command
pub fn run_post_jobs(ctx: &PlanContext, container: Option<&str>, json: bool) -> Result<()> {
    let dict = ctx.dictionary(container)?;
    let selected = dict.select_post_jobs()?;
    print_selection("Post-jobs", &selected, json)
}
