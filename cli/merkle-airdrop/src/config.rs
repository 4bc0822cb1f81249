use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::leaf::ClaimScheme;
use crate::tree::{OddNodePolicy, PairOrdering, TreeOptions};

/// Build configuration loaded from TOML. Every field has a default, so an
/// empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AirdropConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Leaf encoding and tree policies. These must match the deployed verifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    pub scheme: ClaimScheme,
    pub odd_nodes: OddNodePolicy,
    pub pairing: PairOrdering,
    pub sort_leaves: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        let options = TreeOptions::default();
        Self {
            scheme: ClaimScheme::default(),
            odd_nodes: options.odd_nodes,
            pairing: options.pairing,
            sort_leaves: options.sort_leaves,
        }
    }
}

impl TreeConfig {
    pub fn options(&self) -> TreeOptions {
        TreeOptions {
            pairing: self.pairing,
            odd_nodes: self.odd_nodes,
            sort_leaves: self.sort_leaves,
        }
    }
}

/// Parameters of the distributor the root is deployed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettlementConfig {
    /// Fixed per-claimant amount under the `address` scheme, as a decimal
    /// string so values above 2^64 survive TOML.
    pub payout: Option<String>,
}

/// Artifact locations. Relative paths resolve against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub proofs: PathBuf,
    pub frontend: Option<PathBuf>,
    pub root: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            proofs: PathBuf::from("merkle-proofs.json"),
            frontend: None,
            root: None,
        }
    }
}

/// Errors from config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AirdropConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(payout) = &self.settlement.payout {
            crate::leaf::parse_amount(payout)
                .map_err(|e| ConfigError::Validation(format!("settlement.payout: {e}")))?;
        }

        if self.output.proofs.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output.proofs must not be empty".into()));
        }

        let outputs = [Some(&self.output.proofs), self.output.frontend.as_ref(), self.output.root.as_ref()];
        let outputs: Vec<&PathBuf> = outputs.into_iter().flatten().collect();
        for (i, a) in outputs.iter().enumerate() {
            if outputs[i + 1..].contains(a) {
                return Err(ConfigError::Validation(format!(
                    "output path {} is used for more than one artifact",
                    a.display()
                )));
            }
        }

        Ok(())
    }

    pub fn payout(&self) -> Option<u128> {
        self.settlement
            .payout
            .as_deref()
            .and_then(|p| crate::leaf::parse_amount(p).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AirdropConfig::from_toml("").unwrap();
        assert_eq!(config, AirdropConfig::default());
        assert_eq!(config.tree.options(), TreeOptions::default());
        assert_eq!(config.output.proofs, PathBuf::from("merkle-proofs.json"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[tree]
scheme = "address-amount"
odd_nodes = "promote"
pairing = "positional"
sort_leaves = false

[settlement]
payout = "1000000000000000000000"

[output]
proofs = "out/proofs.json"
frontend = "out/frontend.json"
root = "out/root.txt"
"#;
        let config = AirdropConfig::from_toml(toml).unwrap();
        assert_eq!(config.tree.scheme, ClaimScheme::AddressAmount);
        assert_eq!(
            config.tree.options(),
            TreeOptions {
                pairing: PairOrdering::Positional,
                odd_nodes: OddNodePolicy::Promote,
                sort_leaves: false,
            }
        );
        assert_eq!(config.payout(), Some(1_000_000_000_000_000_000_000));
        assert_eq!(config.output.root, Some(PathBuf::from("out/root.txt")));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = AirdropConfig::from_toml("[tree]\nodd_nodes = \"drop\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AirdropConfig::from_toml("[tree]\nsortPairs = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_negative_payout_rejected() {
        let err = AirdropConfig::from_toml("[settlement]\npayout = \"-1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_colliding_outputs_rejected() {
        let toml = "[output]\nproofs = \"a.json\"\nfrontend = \"a.json\"\n";
        let err = AirdropConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
