//! The concrete builders of a toolchain release.

pub mod host_libs;
pub mod runtimes;
pub mod stage1;
pub mod stage2;

pub use host_libs::{Libedit, Libncurses, Libxml2, Swig, Xz};
pub use runtimes::{Builtins, CompilerRt, LibUnwind};
pub use stage1::Stage1;
pub use stage2::Stage2;
