//! Registry of known external library families
//!
//! An import whose path starts with a registered prefix belongs to a third-party
//! package the compiler service fetches on its own; it never becomes a graph edge.

use serde::{Deserialize, Serialize};

/// A known external library family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// Import path prefix, e.g. `@openzeppelin/contracts/`
    pub prefix: String,
    /// Display name
    pub name: String,
    /// Documentation URL
    #[serde(default)]
    pub docs_url: String,
    /// Short description
    #[serde(default)]
    pub description: String,
}

impl LibraryInfo {
    pub fn new(prefix: &str, name: &str, docs_url: &str, description: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
            docs_url: docs_url.to_string(),
            description: description.to_string(),
        }
    }
}

/// An import statement that addresses a known external library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalLibraryReference {
    /// Matched registry prefix
    pub prefix: String,
    /// Concrete import path as written
    pub import_path: String,
    pub name: String,
    pub docs_url: String,
    pub description: String,
}

impl ExternalLibraryReference {
    fn new(info: &LibraryInfo, import_path: &str) -> Self {
        Self {
            prefix: info.prefix.clone(),
            import_path: import_path.to_string(),
            name: info.name.clone(),
            docs_url: info.docs_url.clone(),
            description: info.description.clone(),
        }
    }
}

/// Immutable prefix table, longest prefix first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRegistry {
    libraries: Vec<LibraryInfo>,
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LibraryRegistry {
    /// Create a registry from the given entries
    pub fn new(libraries: Vec<LibraryInfo>) -> Self {
        let mut sorted = libraries;
        // Longest match wins
        sorted.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { libraries: sorted }
    }

    /// A registry that knows no libraries
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The library families the studio ships with
    pub fn builtin() -> Self {
        Self::new(vec![
            LibraryInfo::new(
                "@openzeppelin/contracts/",
                "OpenZeppelin Contracts",
                "https://docs.openzeppelin.com/contracts",
                "Audited implementations of token standards, access control and security utilities",
            ),
            LibraryInfo::new(
                "@openzeppelin/contracts-upgradeable/",
                "OpenZeppelin Contracts Upgradeable",
                "https://docs.openzeppelin.com/contracts/upgradeable",
                "Initializer-based variants of OpenZeppelin Contracts for proxy deployments",
            ),
            LibraryInfo::new(
                "@chainlink/contracts/",
                "Chainlink",
                "https://docs.chain.link",
                "Oracle interfaces for price feeds, VRF and automation",
            ),
            LibraryInfo::new(
                "@uniswap/",
                "Uniswap",
                "https://docs.uniswap.org/contracts",
                "Core and periphery interfaces of the Uniswap protocol",
            ),
            LibraryInfo::new(
                "hardhat/",
                "Hardhat",
                "https://hardhat.org/hardhat-network/docs/reference#console.log",
                "Development helpers such as hardhat/console.sol",
            ),
            LibraryInfo::new(
                "forge-std/",
                "Forge Standard Library",
                "https://book.getfoundry.sh/reference/forge-std/",
                "Testing and scripting helpers for Foundry",
            ),
        ])
    }

    /// Find the library an import path belongs to
    ///
    /// Relative paths are never external, whatever the registry says.
    pub fn classify(&self, import_path: &str) -> Option<&LibraryInfo> {
        if crate::is_relative(import_path) {
            return None;
        }
        self.libraries
            .iter()
            .find(|lib| import_path.starts_with(&lib.prefix))
    }

    /// Classify and build the reference record in one step
    pub fn reference(&self, import_path: &str) -> Option<ExternalLibraryReference> {
        self.classify(import_path)
            .map(|info| ExternalLibraryReference::new(info, import_path))
    }

    /// Check if an import path matches any library
    pub fn is_known(&self, import_path: &str) -> bool {
        self.classify(import_path).is_some()
    }

    /// All entries, longest prefix first
    pub fn libraries(&self) -> &[LibraryInfo] {
        &self.libraries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classification() {
        let registry = LibraryRegistry::builtin();

        let oz = registry
            .classify("@openzeppelin/contracts/token/ERC20/ERC20.sol")
            .unwrap();
        assert_eq!(oz.prefix, "@openzeppelin/contracts/");

        let hh = registry.classify("hardhat/console.sol").unwrap();
        assert_eq!(hh.name, "Hardhat");

        assert!(registry.classify("contracts/Token.sol").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let registry = LibraryRegistry::new(vec![
            LibraryInfo::new("@org/", "Org", "", ""),
            LibraryInfo::new("@org/special/", "Org Special", "", ""),
        ]);

        assert_eq!(
            registry.classify("@org/special/Token.sol").unwrap().name,
            "Org Special"
        );
        assert_eq!(registry.classify("@org/other/Token.sol").unwrap().name, "Org");
    }

    #[test]
    fn test_upgradeable_is_not_shadowed() {
        let registry = LibraryRegistry::builtin();
        let info = registry
            .classify("@openzeppelin/contracts-upgradeable/proxy/utils/Initializable.sol")
            .unwrap();
        assert_eq!(info.prefix, "@openzeppelin/contracts-upgradeable/");
    }

    #[test]
    fn test_relative_paths_are_internal() {
        let registry = LibraryRegistry::new(vec![LibraryInfo::new("./", "Dot", "", "")]);
        assert!(registry.classify("./Token.sol").is_none());
        assert!(!registry.is_known("../lib/Token.sol"));
    }

    #[test]
    fn test_reference_carries_metadata() {
        let registry = LibraryRegistry::builtin();
        let reference = registry
            .reference("@chainlink/contracts/src/v0.8/interfaces/AggregatorV3Interface.sol")
            .unwrap();

        assert_eq!(reference.prefix, "@chainlink/contracts/");
        assert_eq!(reference.docs_url, "https://docs.chain.link");
        assert!(reference.import_path.ends_with("AggregatorV3Interface.sol"));
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = LibraryRegistry::empty();
        assert!(!registry.is_known("@openzeppelin/contracts/access/Ownable.sol"));
    }
}
