//! Build selection.
//!
//! The registry decides, by builder name, whether a `build()` call runs. It is
//! configured once per run and only read afterwards.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// Which builders run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    #[default]
    All,
    /// Only the named builders
    Only(BTreeSet<String>),
    /// Everything except the named builders
    Skip(BTreeSet<String>),
    /// Nothing builds (`--skip-build`)
    Nothing,
}

impl SelectionPolicy {
    /// Policy from the command line selection flags.
    ///
    /// `--build` and `--skip` are mutually exclusive at the CLI; `--skip-build`
    /// overrides both.
    pub fn from_selection(build: &[String], skip: &[String], skip_build: bool) -> Self {
        if skip_build {
            SelectionPolicy::Nothing
        } else if !skip.is_empty() {
            SelectionPolicy::Skip(skip.iter().cloned().collect())
        } else if !build.is_empty() {
            SelectionPolicy::Only(build.iter().cloned().collect())
        } else {
            SelectionPolicy::All
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        match self {
            SelectionPolicy::All => true,
            SelectionPolicy::Only(names) => names.contains(name),
            SelectionPolicy::Skip(names) => !names.contains(name),
            SelectionPolicy::Nothing => false,
        }
    }

    fn named(&self) -> Option<&BTreeSet<String>> {
        match self {
            SelectionPolicy::Only(names) | SelectionPolicy::Skip(names) => Some(names),
            SelectionPolicy::All | SelectionPolicy::Nothing => None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    policy: SelectionPolicy,
    queried: Mutex<BTreeSet<String>>,
}

/// Shared, read-only build gate.
#[derive(Debug, Clone)]
pub struct BuilderRegistry {
    inner: Arc<Inner>,
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        BuilderRegistry::new(SelectionPolicy::All)
    }
}

impl BuilderRegistry {
    pub fn new(policy: SelectionPolicy) -> Self {
        BuilderRegistry {
            inner: Arc::new(Inner {
                policy,
                queried: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.inner.policy
    }

    /// Whether the builder called `name` should run.
    pub fn should_build(&self, name: &str) -> bool {
        if let Ok(mut queried) = self.inner.queried.lock() {
            queried.insert(name.to_string());
        }
        self.inner.policy.allows(name)
    }

    /// Selected or skipped names that no builder has asked about.
    ///
    /// Usually a typo on the command line.
    pub fn unmatched_selections(&self) -> Vec<String> {
        let Some(named) = self.inner.policy.named() else {
            return Vec::new();
        };
        let queried = self
            .inner
            .queried
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default();
        named.difference(&queried).cloned().collect()
    }
}
