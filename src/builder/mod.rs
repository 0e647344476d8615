//! Builders.
//!
//! A builder is a [`BuildStep`] bound to its configs and toolchains by
//! [`Builder`]. The tool bindings ([`cmake`], [`autoconf`]) implement the step
//! for a project description; [`projects`] holds the concrete projects.

pub mod autoconf;
pub mod cmake;
pub mod events;
pub mod llvm;
pub mod projects;
pub mod registry;
pub mod step;
pub mod util;

pub use autoconf::{AutoconfProject, AutoconfStep};
pub use cmake::{CMakeProject, CMakeStep};
pub use events::{BuildEvent, EventSink};
pub use registry::{BuilderRegistry, SelectionPolicy};
pub use step::{BuildEnv, BuildState, BuildStep, Builder, ConfigContext, FinalizeContext};
