//! In-memory model of the airdrop distributor contract.
//!
//! Mirrors the contract's claim entry point so tree outputs can be exercised
//! end to end without a chain: the caller's leaf is rebuilt from its own
//! address, checked against the stored root, and the caller is recorded
//! in the claimed set. Only the owner may replace the root.

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::common::{hex_encode, keccak256, to_checksum_address, Address, Hash};
use crate::leaf::{packed_leaf_preimage, ClaimRecord, ClaimScheme};
use crate::proof::{verify, Proof};
use crate::tree::PairOrdering;

/// Claim rejections, one per contract revert reason
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("Already claimed")]
    AlreadyClaimed,

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Amount required by the claim scheme")]
    MissingAmount,

    #[error("Caller is not the owner")]
    NotOwner,
}

/// Emitted on every successful claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claimed {
    pub account: Address,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct Distributor {
    merkle_root: Hash,
    owner: Address,
    scheme: ClaimScheme,
    pairing: PairOrdering,
    /// Paid to every claimant under [`ClaimScheme::Address`].
    payout: u128,
    claimed: HashSet<Address>,
}

impl Distributor {
    pub fn new(merkle_root: Hash, owner: Address, scheme: ClaimScheme, payout: u128) -> Self {
        Self {
            merkle_root,
            owner,
            scheme,
            pairing: PairOrdering::Sorted,
            payout,
            claimed: HashSet::new(),
        }
    }

    /// Verifier variant hashing pairs in tree position order.
    pub fn with_pairing(mut self, pairing: PairOrdering) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn merkle_root(&self) -> Hash {
        self.merkle_root
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_claimed(&self, account: &Address) -> bool {
        self.claimed.contains(account)
    }

    /// Claims the caller's entitlement.
    ///
    /// `amount` is only consulted under [`ClaimScheme::AddressAmount`], where
    /// it is both part of the leaf and the payout.
    pub fn claim(
        &mut self,
        caller: Address,
        proof: &Proof,
        amount: Option<u128>,
    ) -> Result<Claimed, ClaimError> {
        if self.claimed.contains(&caller) {
            return Err(ClaimError::AlreadyClaimed);
        }

        let record = ClaimRecord::new(caller, amount);
        let packed = packed_leaf_preimage(&record, self.scheme, 0).map_err(|_| ClaimError::MissingAmount)?;
        let leaf = keccak256(packed);
        if !verify(&leaf, proof, &self.merkle_root, self.pairing) {
            debug!(caller = %to_checksum_address(&caller), "claim rejected: invalid proof");
            return Err(ClaimError::InvalidProof);
        }

        let amount = match self.scheme {
            ClaimScheme::Address => self.payout,
            ClaimScheme::AddressAmount => amount.ok_or(ClaimError::MissingAmount)?,
        };
        self.claimed.insert(caller);

        info!(account = %to_checksum_address(&caller), amount, "claimed");
        Ok(Claimed {
            account: caller,
            amount,
        })
    }

    /// Replaces the stored root. Already-claimed accounts stay claimed.
    pub fn set_merkle_root(&mut self, caller: Address, merkle_root: Hash) -> Result<(), ClaimError> {
        if caller != self.owner {
            return Err(ClaimError::NotOwner);
        }
        info!(root = %hex_encode(merkle_root), "merkle root updated");
        self.merkle_root = merkle_root;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Airdrop, ClaimSet};
    use crate::common::parse_address;
    use crate::tree::TreeOptions;

    const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const USER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const OTHER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

    fn single_user_airdrop() -> Airdrop {
        let user = parse_address(USER).unwrap();
        let set = ClaimSet::new(vec![ClaimRecord::new(user, None)]).unwrap();
        Airdrop::build(set, ClaimScheme::Address, TreeOptions::merkletreejs()).unwrap()
    }

    #[test]
    fn test_claim_with_valid_proof() {
        let airdrop = single_user_airdrop();
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let mut distributor = Distributor::new(airdrop.root(), owner, ClaimScheme::Address, 1000);

        let proof = airdrop.proof_for(&user).unwrap();
        let event = distributor.claim(user, &proof, None).unwrap();
        assert_eq!(event, Claimed { account: user, amount: 1000 });
        assert!(distributor.is_claimed(&user));
    }

    #[test]
    fn test_cannot_claim_twice() {
        let airdrop = single_user_airdrop();
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let mut distributor = Distributor::new(airdrop.root(), owner, ClaimScheme::Address, 1000);

        let proof = airdrop.proof_for(&user).unwrap();
        distributor.claim(user, &proof, None).unwrap();
        assert_eq!(
            distributor.claim(user, &proof, None),
            Err(ClaimError::AlreadyClaimed)
        );
    }

    #[test]
    fn test_foreign_caller_rejected() {
        let airdrop = single_user_airdrop();
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let other = parse_address(OTHER).unwrap();
        let mut distributor = Distributor::new(airdrop.root(), owner, ClaimScheme::Address, 1000);

        let proof = airdrop.proof_for(&user).unwrap();
        assert_eq!(distributor.claim(other, &proof, None), Err(ClaimError::InvalidProof));
        assert!(!distributor.is_claimed(&other));
    }

    #[test]
    fn test_only_owner_sets_root() {
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let mut distributor = Distributor::new([1u8; 32], owner, ClaimScheme::Address, 1);

        let new_root = keccak256(b"newMerkleRoot");
        assert_eq!(distributor.set_merkle_root(user, new_root), Err(ClaimError::NotOwner));
        distributor.set_merkle_root(owner, new_root).unwrap();
        assert_eq!(distributor.merkle_root(), new_root);
    }

    #[test]
    fn test_amount_scheme_requires_matching_amount() {
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let other = parse_address(OTHER).unwrap();
        let set = ClaimSet::new(vec![
            ClaimRecord::new(user, Some(100)),
            ClaimRecord::new(other, Some(200)),
        ])
        .unwrap();
        let airdrop = Airdrop::build(set, ClaimScheme::AddressAmount, TreeOptions::default()).unwrap();
        let mut distributor = Distributor::new(airdrop.root(), owner, ClaimScheme::AddressAmount, 0);

        let proof = airdrop.proof_for(&other).unwrap();
        assert_eq!(distributor.claim(other, &proof, None), Err(ClaimError::MissingAmount));
        assert_eq!(distributor.claim(other, &proof, Some(201)), Err(ClaimError::InvalidProof));
        let event = distributor.claim(other, &proof, Some(200)).unwrap();
        assert_eq!(event.amount, 200);
    }

    #[test]
    fn test_positional_verifier() {
        let owner = parse_address(OWNER).unwrap();
        let user = parse_address(USER).unwrap();
        let other = parse_address(OTHER).unwrap();
        let set = ClaimSet::new(vec![ClaimRecord::new(user, None), ClaimRecord::new(other, None)]).unwrap();
        let options = TreeOptions {
            pairing: PairOrdering::Positional,
            odd_nodes: crate::tree::OddNodePolicy::Duplicate,
            sort_leaves: false,
        };
        let airdrop = Airdrop::build(set, ClaimScheme::Address, options).unwrap();

        let proof = airdrop.proof_for(&other).unwrap();
        let mut sorted = Distributor::new(airdrop.root(), owner, ClaimScheme::Address, 5);
        let mut positional = sorted.clone().with_pairing(PairOrdering::Positional);
        assert_eq!(positional.claim(other, &proof, None).unwrap().amount, 5);

        // A sorted verifier only agrees when the pair was already in order.
        let leaves = &airdrop.tree().levels()[0];
        assert_eq!(sorted.claim(other, &proof, None).is_ok(), leaves[0] <= leaves[1]);
    }
}
