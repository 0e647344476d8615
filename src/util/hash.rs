//! Fingerprints for invocation records.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Incremental hasher over string components.
///
/// Components are separated so `["ab", "c"]` and `["a", "bc"]` differ.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    pub fn update_strs<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for s in items {
            self.update_str(s);
        }
        self
    }

    /// Add key/value pairs in key order.
    pub fn update_map(&mut self, map: &BTreeMap<String, String>) -> &mut Self {
        for (key, value) in map {
            self.update_str(key).update_str(value);
        }
        self
    }

    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update(b"\x01");
                self.update_str(s);
            }
            None => {
                self.hasher.update(b"\x00");
            }
        }
        self
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// First 16 hex characters of the digest.
    pub fn finish_short(self) -> String {
        self.finish()[..16].to_string()
    }
}
