use std::collections::HashSet;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{error::SlugError, store::RedirectStore};

/// Outcome of an approved rename check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleCheck {
    /// No loop; a new edge should be linked.
    Clear,
    /// The rename undoes an earlier one and the inverse edge was deleted.
    Reverted,
}

/// Decides whether renaming `old_slug` to `new_slug` for `record_id` is safe.
///
/// An edge of this record that is the exact inverse of the rename means the
/// record is going back to a slug it held before: that edge is deleted and the
/// rename proceeds. Otherwise the chain starting at `new_slug` is walked and
/// the rename is refused if it leads back to `old_slug`.
///
/// # Errors
/// `RedirectCycle` or `ChainTooDeep` when the rename must be refused; store
/// errors are passed through. A refusal performs no writes.
#[instrument(skip(store))]
pub async fn detect_cycle<S>(
    store: &S,
    record_id: Uuid,
    old_slug: &str,
    new_slug: &str,
    max_depth: usize,
) -> Result<CycleCheck, SlugError>
where
    S: RedirectStore + ?Sized,
{
    if let Some(inverse) = store
        .find_record_redirect(record_id, new_slug, old_slug)
        .await?
    {
        store.delete_redirect(inverse.id).await?;
        debug!(redirect_id = %inverse.id, "rename reverts an earlier one, inverse redirect removed");
        return Ok(CycleCheck::Reverted);
    }

    walk_chain(store, old_slug, new_slug, max_depth).await?;
    Ok(CycleCheck::Clear)
}

/// Follows redirects from `start` and returns the slug the chain ends at.
///
/// Fails if the walk reaches `origin`, visits a slug twice, or needs more than
/// `max_depth` hops.
///
/// # Errors
/// `RedirectCycle`, `ChainTooDeep`, or a store error.
pub async fn walk_chain<S>(
    store: &S,
    origin: &str,
    start: &str,
    max_depth: usize,
) -> Result<String, SlugError>
where
    S: RedirectStore + ?Sized,
{
    let cycle = |hops: usize| {
        warn!(old_slug = origin, new_slug = start, hops, "redirect cycle rejected");
        SlugError::RedirectCycle {
            old_slug: origin.to_string(),
            new_slug: start.to_string(),
            hops,
        }
    };

    let mut visited = HashSet::from([start.to_string()]);
    let mut current = start.to_string();
    let mut hops = 0;

    loop {
        if current == origin {
            return Err(cycle(hops));
        }
        let Some(edge) = store.find_redirect(&current).await? else {
            return Ok(current);
        };
        if hops == max_depth {
            warn!(old_slug = origin, new_slug = start, hops, "redirect chain too deep");
            return Err(SlugError::ChainTooDeep {
                old_slug: origin.to_string(),
                new_slug: start.to_string(),
                depth: max_depth,
            });
        }
        hops += 1;
        current = edge.new_slug;
        if current != origin && !visited.insert(current.clone()) {
            return Err(cycle(hops));
        }
    }
}
