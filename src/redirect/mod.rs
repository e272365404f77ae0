//! Redirect history maintenance.
//!
//! The redirect table is a graph stored as flat `old_slug -> new_slug` rows.
//! A rename goes through three steps, strictly in order:
//!
//! 1. [`detect_cycle`] rejects renames that would loop and recognizes reverts
//!    (deleting the inverse edge). A manual edge leaving the new slug is then
//!    dropped with [`release_live_slug`].
//! 2. [`rewrite_chain`] retargets every edge pointing at the vacated slug in
//!    batches, then links the vacated slug to the new one.
//! 3. [`remove_self_redirects`] drops self-references left by revert-then-flatten.
//!
//! Nothing wraps the steps in a single transaction: batches that completed stay
//! committed if a later step fails, and the whole rename is safe to retry.

mod chain;
mod cleanup;
mod cycle;

pub use chain::{flatten_inbound, rewrite_chain};
pub use cleanup::{release_live_slug, remove_self_redirects};
pub use cycle::{detect_cycle, walk_chain, CycleCheck};

/// Edges retargeted per update statement.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Hops followed before a chain is treated as a cycle.
pub const DEFAULT_MAX_DEPTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenamePolicy {
    batch_size: usize,
    max_depth: usize,
}

impl RenamePolicy {
    /// Default policy: batches of 100 edges, chains of at most 50 hops.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Clamps zero values to 1 so the batch loop always makes progress.
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            batch_size: self.batch_size.max(1),
            max_depth: self.max_depth.max(1),
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self::new()
    }
}
