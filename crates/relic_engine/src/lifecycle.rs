//! Lifecycle pipeline plumbing: ordered hook execution with
//! short-circuit on failure.

use relic_foundation::{Error, Record, Result};
use relic_schema::{HookSet, HookStage};

/// Runs the given stages in order, threading the attributes through each
/// hook. Missing hooks pass through.
///
/// A failure from the `validate` stage surfaces as `ValidationFailed`;
/// any other failing stage surfaces as `HookFailed` naming the hook.
/// Either aborts the remaining stages.
pub(crate) fn run_stages(
    hooks: &HookSet,
    stages: &[HookStage],
    resource: &str,
    mut attrs: Record,
) -> Result<Record> {
    for stage in stages {
        if let Some(hook) = hooks.get(*stage) {
            attrs = hook(resource, &attrs).map_err(|source| wrap(*stage, resource, &source))?;
        }
    }
    Ok(attrs)
}

/// Runs a single stage.
pub(crate) fn run_stage(
    hooks: &HookSet,
    stage: HookStage,
    resource: &str,
    attrs: Record,
) -> Result<Record> {
    run_stages(hooks, &[stage], resource, attrs)
}

fn wrap(stage: HookStage, resource: &str, source: &Error) -> Error {
    if stage == HookStage::Validate {
        Error::validation_failed(resource, source.to_string())
    } else {
        Error::hook_failed(stage.name(), resource, source.to_string())
    }
}

/// The validation triple shared by every write pipeline.
pub(crate) const VALIDATION: [HookStage; 3] = [
    HookStage::BeforeValidate,
    HookStage::Validate,
    HookStage::AfterValidate,
];
