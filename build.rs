// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=DEPTHSTATS_VERSION");

    // Packagers can pin the version string when building outside a git checkout
    let version = std::env::var("DEPTHSTATS_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Build a semver-style version string from git metadata
///
/// - exact tag `v0.1.0` -> `0.1.0`
/// - `v0.1.0-5-gabcdef1` -> `0.1.0+5.abcdef1`
/// - no tags -> `<crate version>+abcdef1`
/// - no git at all -> `<crate version>`
fn describe_version() -> String {
    let crate_version = env!("CARGO_PKG_VERSION");

    let Some(described) = git(&["describe", "--tags", "--match", "v*"]) else {
        return match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{}+{}", crate_version, hash),
            None => crate_version.to_string(),
        };
    };

    let described = described.strip_prefix('v').unwrap_or(&described);

    // rsplitn yields [ghash, commits, tag] for "tag-commits-ghash"
    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, commits, tag] if hash.starts_with('g') => {
            format!("{}+{}.{}", tag, commits, &hash[1..])
        }
        _ => described.to_string(),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
