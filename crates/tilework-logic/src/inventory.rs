//! Item stacks with locks and claims.
//!
//! A claim reserves part of a floor stack for one agent while it walks over
//! to pick it up. Claims are first-committer-wins: a second agent only sees
//! what is left unclaimed. They are released explicitly on pick-up, on a
//! failed move, or when the claiming agent is interrupted.

use serde::{Deserialize, Serialize};

/// Identifies whoever holds a claim. The engine uses entity bits.
pub type ClaimantId = u64;

/// Amount of a stack reserved by one claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claimant: ClaimantId,
    pub amount: u32,
}

/// A stack of a single item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: String,
    pub stack_size: u32,
    pub max_stack_size: u32,
    /// Locked stacks are never picked up.
    pub locked: bool,
    claims: Vec<Claim>,
}

impl Inventory {
    pub fn new(kind: impl Into<String>, stack_size: u32, max_stack_size: u32) -> Self {
        Self {
            kind: kind.into(),
            stack_size,
            max_stack_size,
            locked: false,
            claims: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack_size == 0
    }

    /// Room left before the stack is full.
    pub fn space(&self) -> u32 {
        self.max_stack_size.saturating_sub(self.stack_size)
    }

    pub fn claimed(&self) -> u32 {
        self.claims.iter().map(|c| c.amount).sum()
    }

    /// Units nobody has claimed yet.
    pub fn available(&self) -> u32 {
        self.stack_size.saturating_sub(self.claimed())
    }

    /// Units `claimant` may take: everything not claimed by someone else.
    pub fn available_to(&self, claimant: ClaimantId) -> u32 {
        let others: u32 = self
            .claims
            .iter()
            .filter(|c| c.claimant != claimant)
            .map(|c| c.amount)
            .sum();
        self.stack_size.saturating_sub(others)
    }

    pub fn claimed_by(&self, claimant: ClaimantId) -> u32 {
        self.claims
            .iter()
            .find(|c| c.claimant == claimant)
            .map_or(0, |c| c.amount)
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Reserve up to `amount` units. Returns the amount actually reserved.
    ///
    /// Re-claiming replaces the claimant's previous claim.
    pub fn claim(&mut self, claimant: ClaimantId, amount: u32) -> u32 {
        self.release_claim(claimant);
        let granted = amount.min(self.available());
        if granted > 0 {
            self.claims.push(Claim {
                claimant,
                amount: granted,
            });
        }
        granted
    }

    pub fn release_claim(&mut self, claimant: ClaimantId) -> bool {
        let before = self.claims.len();
        self.claims.retain(|c| c.claimant != claimant);
        self.claims.len() != before
    }

    /// Take `amount` units off into a new, unclaimed stack.
    ///
    /// Clamped to the stack size. Claims that now exceed the remaining
    /// stack are trimmed.
    pub fn split(&mut self, amount: u32) -> Inventory {
        let taken = amount.min(self.stack_size);
        self.stack_size -= taken;
        let mut excess = self.claimed().saturating_sub(self.stack_size);
        for claim in self.claims.iter_mut().rev() {
            if excess == 0 {
                break;
            }
            let cut = claim.amount.min(excess);
            claim.amount -= cut;
            excess -= cut;
        }
        self.claims.retain(|c| c.amount > 0);
        Inventory::new(self.kind.clone(), taken, self.max_stack_size)
    }

    /// Whether `other` could be merged in without overflowing.
    pub fn can_merge(&self, other: &Inventory) -> bool {
        self.kind == other.kind && self.space() >= other.stack_size
    }

    /// Move as much of `other` as fits into this stack.
    ///
    /// Returns whatever did not fit, if anything.
    pub fn merge(&mut self, mut other: Inventory) -> Option<Inventory> {
        if self.kind != other.kind {
            return Some(other);
        }
        let moved = other.stack_size.min(self.space());
        self.stack_size += moved;
        other.stack_size -= moved;
        (!other.is_empty()).then_some(other)
    }
}
