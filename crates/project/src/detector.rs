//! Framework detection for projects loaded from disk
//!
//! The framework decides which directory holds the contract sources and which
//! directories are vendored dependencies that never enter the snapshot.

use std::path::Path;

/// Supported project layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    /// Foundry project (foundry.toml), sources in `src/`
    Foundry,
    /// Hardhat project (hardhat.config.*), sources in `contracts/`
    Hardhat,
    /// Plain Solidity files, the whole directory is the project
    Plain,
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::Foundry => write!(f, "foundry"),
            Framework::Hardhat => write!(f, "hardhat"),
            Framework::Plain => write!(f, "plain"),
        }
    }
}

impl Framework {
    /// Directory (relative to the project root) that holds the sources
    pub fn source_dir(&self) -> &'static str {
        match self {
            Framework::Foundry => "src",
            Framework::Hardhat => "contracts",
            Framework::Plain => ".",
        }
    }

    /// Directory names that are never part of the snapshot
    pub fn excluded_dirs(&self) -> &'static [&'static str] {
        match self {
            Framework::Foundry => &["lib", "out", "cache", "broadcast"],
            Framework::Hardhat => &["node_modules", "artifacts", "cache", "typechain-types"],
            Framework::Plain => &["node_modules", "lib"],
        }
    }
}

/// Detect the framework used by a project at the given path
pub fn detect_framework(path: &Path) -> Framework {
    if path.join("foundry.toml").exists() {
        return Framework::Foundry;
    }

    const HARDHAT_CONFIGS: [&str; 4] = [
        "hardhat.config.js",
        "hardhat.config.ts",
        "hardhat.config.cjs",
        "hardhat.config.mjs",
    ];
    if HARDHAT_CONFIGS.iter().any(|name| path.join(name).exists()) {
        return Framework::Hardhat;
    }

    if let Ok(content) = std::fs::read_to_string(path.join("package.json")) {
        if content.contains("\"hardhat\"") {
            return Framework::Hardhat;
        }
    }

    Framework::Plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_foundry() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("foundry.toml"), "[profile.default]").unwrap();

        assert_eq!(detect_framework(temp.path()), Framework::Foundry);
        assert_eq!(Framework::Foundry.source_dir(), "src");
    }

    #[test]
    fn test_detect_hardhat_from_package_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"devDependencies": {"hardhat": "^2.19.0"}}"#,
        )
        .unwrap();

        assert_eq!(detect_framework(temp.path()), Framework::Hardhat);
    }

    #[test]
    fn test_detect_hardhat_ts() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("hardhat.config.ts"), "export default {}").unwrap();

        assert_eq!(detect_framework(temp.path()), Framework::Hardhat);
    }

    #[test]
    fn test_detect_plain() {
        let temp = TempDir::new().unwrap();
        assert_eq!(detect_framework(temp.path()), Framework::Plain);
    }
}
