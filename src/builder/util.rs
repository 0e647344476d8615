//! Shared helpers for the tool bindings.

use std::collections::BTreeMap;

/// Parse a version string into semver::Version, handling incomplete versions.
///
/// Handles versions like "14.0.6", "17", or "3.20.5-rc1" with only the
/// leading numeric part considered.
pub fn parse_version_flexible(version_str: &str) -> Option<semver::Version> {
    let clean_version = version_str
        .trim()
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or(version_str);

    if let Ok(v) = clean_version.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = clean_version.split('.').collect();
    let major = parts.first().and_then(|s| s.parse().ok())?;
    let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let patch = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

/// Join flags the way CMake's `*_FLAGS` variables expect them.
pub fn join_flags<S: AsRef<str>>(flags: &[S]) -> String {
    flags
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A CMake list: sorted, deduplicated, `;`-separated.
pub fn cmake_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let mut items: Vec<&str> = items.into_iter().collect();
    items.sort_unstable();
    items.dedup();
    items.join(";")
}

/// `-DKEY=VALUE` arguments in key order.
pub fn define_args(defines: &BTreeMap<String, String>) -> Vec<String> {
    defines
        .iter()
        .map(|(key, value)| format!("-D{}={}", key, value))
        .collect()
}

pub fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_flexible() {
        assert_eq!(
            parse_version_flexible("14.0.6"),
            Some(semver::Version::new(14, 0, 6))
        );
        assert_eq!(parse_version_flexible("17"), Some(semver::Version::new(17, 0, 0)));
        assert_eq!(
            parse_version_flexible("3.20.5-rc1"),
            Some(semver::Version::new(3, 20, 5))
        );
        assert_eq!(parse_version_flexible("clang"), None);
    }

    #[test]
    fn test_join_flags_skips_empty() {
        let flags = vec!["-fPIC".to_string(), String::new(), "-O2".to_string()];
        assert_eq!(join_flags(&flags), "-fPIC -O2");
    }

    #[test]
    fn test_cmake_list_is_sorted() {
        assert_eq!(cmake_list(["lld", "clang", "compiler-rt", "clang"]), "clang;compiler-rt;lld");
    }

    #[test]
    fn test_define_args_in_key_order() {
        let mut defines = BTreeMap::new();
        defines.insert("CMAKE_BUILD_TYPE".to_string(), "Release".to_string());
        defines.insert("ANDROID".to_string(), "1".to_string());
        assert_eq!(
            define_args(&defines),
            vec!["-DANDROID=1", "-DCMAKE_BUILD_TYPE=Release"]
        );
    }
}
