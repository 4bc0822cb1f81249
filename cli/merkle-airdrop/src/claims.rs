//! Claim sets, the airdrop bundle built over them, and the JSON artifacts
//! handed to deployment scripts and front ends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::common::{
    hex_encode, keccak256, parse_address, parse_hash, to_checksum_address, write_file_atomic,
    Address, Hash,
};
use crate::error::{AirdropError, Result};
use crate::leaf::{packed_leaf_preimage, parse_amount, ClaimRecord, ClaimScheme};
use crate::proof::{verify, Proof, Side};
use crate::tree::{MerkleTree, PairOrdering, TreeOptions};

/// Validated, duplicate-free list of claimants in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    records: Vec<ClaimRecord>,
}

impl ClaimSet {
    /// # Errors
    /// Rejects an empty list and any address that appears twice.
    pub fn new(records: Vec<ClaimRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(AirdropError::EmptyClaimSet);
        }
        let mut seen: HashMap<Address, usize> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if let Some(first) = seen.insert(record.address, index) {
                return Err(AirdropError::DuplicateAddress {
                    address: record.checksum_address(),
                    first,
                    second: index,
                });
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ClaimRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct JsonClaim {
    address: String,
    #[serde(default)]
    amount: Option<serde_json::Value>,
}

fn json_amount(value: &serde_json::Value) -> Result<Option<u128>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => parse_amount(s).map(Some),
        serde_json::Value::Number(n) => parse_amount(&n.to_string()).map(Some),
        other => Err(AirdropError::InvalidAmount {
            input: other.to_string(),
            reason: "expected an integer or a decimal string".to_string(),
        }),
    }
}

/// Parses claimant records from a JSON document: either a bare array or
/// `{ "claims": [...] }` / `{ "users": [...] }`.
///
/// Integer amounts keep every digit, so wei-sized values above `u64::MAX`
/// parse the same as their string form.
pub fn parse_json_claims(content: &str) -> Result<Vec<ClaimRecord>> {
    let document: serde_json::Value = serde_json::from_str(content)?;
    let list = match document {
        list @ serde_json::Value::Array(_) => list,
        serde_json::Value::Object(mut map) => match map.remove("claims").or_else(|| map.remove("users")) {
            Some(list) => list,
            None => {
                return Err(AirdropError::MalformedInput {
                    line: 1,
                    reason: "expected an array or an object with 'claims' or 'users'".to_string(),
                })
            }
        },
        other => {
            return Err(AirdropError::MalformedInput {
                line: 1,
                reason: format!("expected an array of claims, got {other}"),
            })
        }
    };
    let claims: Vec<JsonClaim> = serde_json::from_value(list)?;
    claims
        .iter()
        .map(|claim| {
            let address = parse_address(&claim.address)?;
            let amount = match &claim.amount {
                Some(value) => json_amount(value)?,
                None => None,
            };
            Ok(ClaimRecord::new(address, amount))
        })
        .collect()
}

/// Parses claimant records from CSV with a header row naming an `address`
/// column and optionally an `amount` column.
pub fn parse_csv_claims(content: &str) -> Result<Vec<ClaimRecord>> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(AirdropError::EmptyClaimSet)?;
    let headers: Vec<String> = header
        .split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let address_col = headers
        .iter()
        .position(|h| h == "address")
        .ok_or_else(|| AirdropError::MalformedInput {
            line: 1,
            reason: format!("header has no 'address' column: '{}'", header.trim()),
        })?;
    let amount_col = headers.iter().position(|h| h == "amount");

    let mut records = Vec::new();
    for (line_num, line) in lines {
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        let address = values.get(address_col).ok_or_else(|| AirdropError::MalformedInput {
            line: line_num + 1,
            reason: format!("expected {} columns, got {}", headers.len(), values.len()),
        })?;
        let amount = amount_col
            .and_then(|col| values.get(col).copied())
            .filter(|v| !v.is_empty());
        records.push(ClaimRecord::parse(address, amount)?);
    }
    Ok(records)
}

/// Parses one address per line; blank lines are skipped.
pub fn parse_address_list(content: &str) -> Result<Vec<ClaimRecord>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_address(line).map(|address| ClaimRecord::new(address, None)))
        .collect()
}

/// Loads claimant records from `path`, choosing the parser by extension:
/// `.json`, `.csv`, anything else is read as a plain address list.
pub fn load_claims(path: &Path) -> Result<ClaimSet> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let records = match extension.as_deref() {
        Some("json") => parse_json_claims(&content)?,
        Some("csv") => parse_csv_claims(&content)?,
        _ => parse_address_list(&content)?,
    };
    info!(path = %path.display(), records = records.len(), "loaded claim records");
    ClaimSet::new(records)
}

/// A claim set together with the tree built over it and the scheme its
/// leaves were encoded with.
#[derive(Debug, Clone)]
pub struct Airdrop {
    scheme: ClaimScheme,
    claims: ClaimSet,
    leaves: Vec<Hash>,
    tree: MerkleTree,
    index: HashMap<Address, usize>,
}

impl Airdrop {
    /// Encodes every record under `scheme` and builds the tree.
    ///
    /// # Errors
    /// Fails on the first record the scheme cannot encode; no partial tree is
    /// produced.
    pub fn build(claims: ClaimSet, scheme: ClaimScheme, options: TreeOptions) -> Result<Self> {
        let leaves = claims
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| packed_leaf_preimage(record, scheme, i).map(keccak256))
            .collect::<Result<Vec<Hash>>>()?;

        let tree = MerkleTree::build(&leaves, options)?;
        let index = claims
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| (record.address, i))
            .collect();

        debug!(
            leaves = leaves.len(),
            depth = tree.depth(),
            scheme = %scheme,
            pairing = %options.pairing,
            odd_nodes = %options.odd_nodes,
            "built merkle tree"
        );

        Ok(Self {
            scheme,
            claims,
            leaves,
            tree,
            index,
        })
    }

    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    pub fn scheme(&self) -> ClaimScheme {
        self.scheme
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Leaf of the record at input `index`.
    pub fn leaf(&self, index: usize) -> Result<Hash> {
        self.leaves
            .get(index)
            .copied()
            .ok_or(AirdropError::IndexOutOfRange {
                index,
                leaf_count: self.leaves.len(),
            })
    }

    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.index.get(address).copied()
    }

    pub fn proof(&self, index: usize) -> Result<Proof> {
        self.tree.prove(index)
    }

    pub fn proof_for(&self, address: &Address) -> Result<Proof> {
        let index = self
            .index_of(address)
            .ok_or_else(|| AirdropError::AddressNotFound(to_checksum_address(address)))?;
        self.proof(index)
    }

    /// Replays the leaf encoding for `record` and checks `proof` against the
    /// root, the way the settlement contract does at claim time.
    pub fn verify_claim(&self, record: &ClaimRecord, proof: &Proof) -> bool {
        match packed_leaf_preimage(record, self.scheme, 0) {
            Ok(packed) => verify(&keccak256(packed), proof, &self.root(), self.tree.options().pairing),
            Err(_) => false,
        }
    }

    /// Sum of all entitlements; records without an amount count as zero.
    pub fn total_amount(&self) -> u128 {
        self.claims
            .records()
            .iter()
            .filter_map(|r| r.amount)
            .fold(0u128, u128::saturating_add)
    }

    /// Verifies every generated proof against the root.
    pub fn self_check(&self) -> Result<()> {
        let pairing = self.tree.options().pairing;
        for (i, record) in self.claims.records().iter().enumerate() {
            let proof = self.proof(i)?;
            if !verify(&self.leaves[i], &proof, &self.root(), pairing) {
                return Err(AirdropError::SelfCheckFailed(record.checksum_address()));
            }
        }
        debug!(claims = self.claims.len(), "all proofs verify against the root");
        Ok(())
    }

    pub fn proofs_file(&self, generated_at: String) -> Result<ProofsFile> {
        let options = self.tree.options();
        let positional = options.pairing == PairOrdering::Positional;
        let users = self
            .claims
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let proof = self.proof(i)?;
                Ok(UserProof {
                    address: record.checksum_address(),
                    amount: record.amount.map(|a| a.to_string()),
                    leaf: hex_encode(self.leaves[i]),
                    proof: proof.to_hex(),
                    proof_sides: positional.then(|| proof.sides.clone()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ProofsFile {
            merkle_root: hex_encode(self.root()),
            scheme: self.scheme,
            tree: options,
            total_users: users.len(),
            total_amount: self.total_amount().to_string(),
            payout: None,
            users,
            generated_at,
        })
    }

    pub fn frontend_file(&self) -> Result<FrontendClaims> {
        let claims = self
            .claims
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                Ok(FrontendClaim {
                    address: record.checksum_address(),
                    amount: record.amount.map(|a| a.to_string()),
                    proof: self.proof(i)?.to_hex(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FrontendClaims {
            merkle_root: hex_encode(self.root()),
            claims,
        })
    }
}

/// Full build output: root, tree policies and every claimant's proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofsFile {
    pub merkle_root: String,
    pub scheme: ClaimScheme,
    pub tree: TreeOptions,
    pub users: Vec<UserProof>,
    pub total_users: usize,
    pub total_amount: String,
    /// Flat per-claimant amount of an address-scheme airdrop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProof {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub leaf: String,
    pub proof: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_sides: Option<Vec<Side>>,
}

/// Trimmed artifact for front ends: just what a claim transaction needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendClaims {
    pub merkle_root: String,
    pub claims: Vec<FrontendClaim>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendClaim {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub proof: Vec<String>,
}

/// A single claimant's entry decoded back into bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClaim {
    pub record: ClaimRecord,
    pub leaf: Hash,
    pub proof: Proof,
}

impl ProofsFile {
    /// Records the distributor's fixed payout and sets `totalAmount` to
    /// `payout * totalUsers`. Under the address-amount scheme each leaf
    /// carries its own amount and the artifact is returned unchanged.
    pub fn with_payout(mut self, payout: u128) -> Self {
        if self.scheme == ClaimScheme::Address {
            let users = u128::try_from(self.total_users).unwrap_or(u128::MAX);
            self.total_amount = payout.saturating_mul(users).to_string();
            self.payout = Some(payout.to_string());
        }
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file_atomic(path, &json)
    }

    pub fn root(&self) -> Result<Hash> {
        parse_hash(&self.merkle_root)
    }

    /// Finds `address` and decodes its leaf and proof.
    pub fn resolve(&self, address: &Address) -> Result<ResolvedClaim> {
        let user = self
            .users
            .iter()
            .find(|u| parse_address(&u.address).map(|a| a == *address).unwrap_or(false))
            .ok_or_else(|| AirdropError::AddressNotFound(to_checksum_address(address)))?;

        let amount = user.amount.as_deref().map(parse_amount).transpose()?;
        let siblings = user
            .proof
            .iter()
            .map(|h| parse_hash(h))
            .collect::<Result<Vec<Hash>>>()?;
        let sides = match &user.proof_sides {
            Some(sides) => sides.clone(),
            None => vec![Side::Right; siblings.len()],
        };
        if sides.len() != siblings.len() {
            return Err(AirdropError::MalformedInput {
                line: 0,
                reason: format!(
                    "proof for {} has {} elements but {} sides",
                    user.address,
                    siblings.len(),
                    sides.len()
                ),
            });
        }

        Ok(ResolvedClaim {
            record: ClaimRecord::new(*address, amount),
            leaf: parse_hash(&user.leaf)?,
            proof: Proof { siblings, sides },
        })
    }
}

impl FrontendClaims {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file_atomic(path, &json)
    }
}
