//! Fixtures for builder tests: settings rooted in a temp dir and fake
//! toolchain trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::step::BuildEnv;
use crate::core::toolchain::Toolchain;
use crate::util::config::Settings;
use crate::util::process::ProcessRunner;

/// Settings with every directory under `root` and fixed tool names, so
/// recorded command lines do not depend on the machine.
pub fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.out_dir = Some(root.join("out"));
    settings.paths.source_dir = Some(root.join("src"));
    settings.tools.cmake = Some(PathBuf::from("cmake"));
    settings.tools.make = Some(PathBuf::from("make"));
    settings.tools.ninja = Some(PathBuf::from("ninja"));
    settings.tools.install_name_tool = Some(PathBuf::from("install_name_tool"));
    settings.tools.python = Some(PathBuf::from("python3"));
    settings.build.jobs = Some(4);
    settings
}

pub fn test_env(root: &Path, runner: Arc<dyn ProcessRunner>) -> BuildEnv {
    BuildEnv::new(runner, test_settings(root))
}

/// A prebuilt toolchain tree with `lib/clang/<version>/lib/linux`.
pub fn fake_toolchain(root: &Path, version: &str) -> Toolchain {
    fake_tree(root, version);
    Toolchain::prebuilt(root)
}

/// Create the directories a toolchain install has.
pub fn fake_tree(root: &Path, version: &str) {
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(root.join("lib/clang").join(version).join("lib/linux")).unwrap();
}

/// Write an empty file, creating parent directories.
pub fn touch_file(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_toolchain_resolves_version() {
        let tmp = tempfile::TempDir::new().unwrap();
        let tc = fake_toolchain(&tmp.path().join("clang"), "14.0.6");
        assert_eq!(tc.version().unwrap().dir_name, "14.0.6");
        assert!(tc.resource_dir().unwrap().is_dir());
    }

    #[test]
    fn test_settings_are_rooted() {
        let settings = test_settings(Path::new("/tmp/t"));
        assert_eq!(settings.out_dir(), PathBuf::from("/tmp/t/out"));
        assert_eq!(settings.cmake(), PathBuf::from("cmake"));
        assert_eq!(settings.jobs(), 4);
    }
}
