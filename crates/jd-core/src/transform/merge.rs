use std::collections::HashSet;

use crate::ids::JobId;
use crate::job::CollectionItem;
use crate::snapshot::{CollectionSnapshot, FetchedPage};

/// Merge a fetched page into a snapshot item by item.
///
/// The page decides order and content for every id except the `protected`
/// ones, which keep their local state: a protected item the local snapshot no
/// longer holds stays out, and a protected item the page lacks is kept after
/// its nearest local predecessor. `total_count` follows the page, adjusted for
/// the protected items that differ in presence.
pub fn merge_page<T: CollectionItem>(
    current: &CollectionSnapshot<T>,
    page: &FetchedPage<T>,
    protected: &HashSet<JobId>,
) -> FetchedPage<T> {
    let mut items: Vec<T> = Vec::with_capacity(page.items.len());
    let mut dropped: u64 = 0;

    for fetched in &page.items {
        let id = fetched.item_id();
        if !protected.contains(id) {
            items.push(fetched.clone());
            continue;
        }
        match current.get(id) {
            Some(local) => items.push(local.clone()),
            None => dropped += 1,
        }
    }

    let mut kept: u64 = 0;
    for (index, local) in current.items.iter().enumerate() {
        let id = local.item_id();
        if !protected.contains(id) || items.iter().any(|item| item.item_id() == id) {
            continue;
        }
        let insert_at = current.items[..index]
            .iter()
            .rev()
            .find_map(|prev| items.iter().position(|item| item.item_id() == prev.item_id()))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        items.insert(insert_at, local.clone());
        kept += 1;
    }

    FetchedPage {
        items,
        total_count: (page.total_count + kept).saturating_sub(dropped),
    }
}
