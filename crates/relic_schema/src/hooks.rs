//! Lifecycle hooks and their default/override resolution.

use std::fmt;
use std::sync::Arc;

use relic_foundation::{Record, Result};

/// A lifecycle hook.
///
/// Receives the resource name and the attributes at this point of the
/// pipeline; returns the (possibly transformed) attributes, or fails to
/// abort the remaining pipeline steps.
pub type Hook = Arc<dyn Fn(&str, &Record) -> Result<Record>>;

/// The lifecycle stages a hook can attach to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// Before validation.
    BeforeValidate,
    /// Validation proper; failure surfaces as `ValidationFailed`.
    Validate,
    /// After validation.
    AfterValidate,
    /// Before the adapter create call.
    BeforeCreate,
    /// After a successful adapter create, before inject.
    AfterCreate,
    /// Before the adapter update call.
    BeforeUpdate,
    /// After a successful adapter update, before inject.
    AfterUpdate,
    /// Before the adapter destroy call.
    BeforeDestroy,
    /// After a successful adapter destroy, before eject.
    AfterDestroy,
    /// Before a record is stored by inject.
    BeforeInject,
    /// After a record is stored; fires on every inject call.
    AfterInject,
}

impl HookStage {
    /// All stages, in slot order.
    pub const ALL: [Self; 11] = [
        Self::BeforeValidate,
        Self::Validate,
        Self::AfterValidate,
        Self::BeforeCreate,
        Self::AfterCreate,
        Self::BeforeUpdate,
        Self::AfterUpdate,
        Self::BeforeDestroy,
        Self::AfterDestroy,
        Self::BeforeInject,
        Self::AfterInject,
    ];

    /// The conventional camel-case hook name, used in error reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeforeValidate => "beforeValidate",
            Self::Validate => "validate",
            Self::AfterValidate => "afterValidate",
            Self::BeforeCreate => "beforeCreate",
            Self::AfterCreate => "afterCreate",
            Self::BeforeUpdate => "beforeUpdate",
            Self::AfterUpdate => "afterUpdate",
            Self::BeforeDestroy => "beforeDestroy",
            Self::AfterDestroy => "afterDestroy",
            Self::BeforeInject => "beforeInject",
            Self::AfterInject => "afterInject",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::BeforeValidate => 0,
            Self::Validate => 1,
            Self::AfterValidate => 2,
            Self::BeforeCreate => 3,
            Self::AfterCreate => 4,
            Self::BeforeUpdate => 5,
            Self::AfterUpdate => 6,
            Self::BeforeDestroy => 7,
            Self::AfterDestroy => 8,
            Self::BeforeInject => 9,
            Self::AfterInject => 10,
        }
    }
}

/// One optional hook per lifecycle stage.
///
/// Missing hooks are pass-through no-ops. A resource-level set is merged
/// over the engine defaults once at registration: for each stage the
/// resource's hook wins if present.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: [Option<Hook>; 11],
}

impl HookSet {
    /// Creates an empty hook set (all stages pass through).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a hook to a stage, builder-style. Replaces any hook
    /// already attached to that stage.
    #[must_use]
    pub fn on<F>(mut self, stage: HookStage, hook: F) -> Self
    where
        F: Fn(&str, &Record) -> Result<Record> + 'static,
    {
        self.hooks[stage.slot()] = Some(Arc::new(hook));
        self
    }

    /// Returns the hook attached to a stage, if any.
    #[must_use]
    pub fn get(&self, stage: HookStage) -> Option<&Hook> {
        self.hooks[stage.slot()].as_ref()
    }

    /// Returns true if no stage has a hook.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.iter().all(Option::is_none)
    }

    /// Merges this set over `defaults`: per stage, this set's hook wins
    /// when present. Computed once at registration.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut merged = Self::new();
        for stage in HookStage::ALL {
            let slot = stage.slot();
            merged.hooks[slot] = self.hooks[slot]
                .clone()
                .or_else(|| defaults.hooks[slot].clone());
        }
        merged
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attached: Vec<_> = HookStage::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_some())
            .map(HookStage::name)
            .collect();
        f.debug_struct("HookSet").field("attached", &attached).finish()
    }
}

/// Process-wide engine defaults, initialized once.
///
/// Per-resource overrides win field-by-field at registration time; hook
/// resolution never happens dynamically at call time.
#[derive(Clone, Debug, Default)]
pub struct EngineDefaults {
    /// Default hooks applied to every resource unless overridden.
    pub hooks: HookSet,
}

impl EngineDefaults {
    /// Creates defaults with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default hook set, builder-style.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }
}
