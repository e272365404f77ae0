//! # Permalink (durable slugs with redirect history)
//!
//! `permalink` maps human-readable identifiers ("slugs") to content records and
//! keeps every slug a record has ever published resolving after it is renamed.
//!
//! ## Slugs
//!
//! - **Normalization:** titles and manual input are folded to lowercase ASCII
//!   `[a-z0-9-]`, with diacritics stripped and separators collapsed.
//! - **Validation:** at most 100 characters, no leading or trailing hyphen.
//! - **Collisions:** auto-derived slugs take the first free `base`, `base-1`,
//!   `base-2`, … found with a single bulk lookup.
//!
//! ## Redirects
//!
//! Every rename leaves an `old_slug -> new_slug` edge behind. Edges are kept
//! flat (one hop to the live slug) by retargeting inbound edges on every rename,
//! in bounded batches. Renames that would close a loop are rejected before any
//! write happens; renaming back to a previous slug deletes the old edge instead
//! of adding its inverse.

pub mod cli;
pub mod error;
pub mod permalink;
pub mod redirect;
pub mod service;
pub mod slug;
pub mod store;
