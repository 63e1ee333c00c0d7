//! Quote Reconciler
//!
//! Pure merge of a local quote collection with a freshly fetched remote one.
//! Conflicts on the same quote are resolved last-write-wins: the remote entry
//! must carry a strictly newer timestamp to overwrite the local one. The
//! reconciler performs no I/O and cannot fail; callers persist the result.

use crate::domain::entities::quote::Quote;
use tracing::warn;

/// Result of merging a remote collection into the local one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The local collection with remote changes applied. Pre-existing local
    /// entries keep their order; new entries are appended in remote order.
    pub merged: Vec<Quote>,
    /// Number of remote entries appended
    pub added: usize,
    /// Number of local entries overwritten by newer remote entries
    pub updated: usize,
}

/// Merge `remote` into `local`
///
/// Each remote entry is matched against the local collection (including
/// entries appended earlier in the same pass): by id when both sides carry
/// one, otherwise by exact text. Unmatched entries are appended. On a match,
/// the remote entry wins only when the local timestamp is absent or strictly
/// older; a losing remote entry is discarded. Nothing is ever removed, so
/// `merged.len() == local.len() + added`.
pub fn reconcile(local: Vec<Quote>, remote: Vec<Quote>) -> MergeOutcome {
    let mut merged = local;
    let mut added = 0;
    let mut updated = 0;

    for incoming in remote {
        let match_indices: Vec<usize> = merged
            .iter()
            .enumerate()
            .filter(|(_, q)| is_match(q, &incoming))
            .map(|(index, _)| index)
            .collect();

        match match_indices.first() {
            None => {
                merged.push(incoming);
                added += 1;
            }
            Some(&index) => {
                if match_indices.len() > 1 {
                    // First-match semantics; duplicate keys in the local
                    // collection are not merged together.
                    warn!(
                        text = %incoming.text,
                        "remote quote matches multiple local quotes, updating first match only"
                    );
                }

                let current = &mut merged[index];
                if remote_wins(current.updated_at, incoming.updated_at) {
                    current.text = incoming.text;
                    current.category = incoming.category;
                    current.updated_at = incoming.updated_at;
                    if current.id.is_none() {
                        current.id = incoming.id;
                    }
                    updated += 1;
                }
            }
        }
    }

    MergeOutcome {
        merged,
        added,
        updated,
    }
}

/// Match by stable id when both sides have one, else fall back to text
fn is_match(local: &Quote, incoming: &Quote) -> bool {
    match (&local.id, &incoming.id) {
        (Some(local_id), Some(incoming_id)) => local_id == incoming_id,
        _ => local.text == incoming.text,
    }
}

/// A local entry without a timestamp is older than anything; otherwise the
/// remote entry must be strictly newer to win.
fn remote_wins(local_ts: Option<i64>, remote_ts: Option<i64>) -> bool {
    match (local_ts, remote_ts) {
        (None, _) => true,
        (Some(local), Some(remote)) => local < remote,
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(text: &str, category: &str, updated_at: Option<i64>) -> Quote {
        Quote {
            id: None,
            text: text.to_string(),
            category: category.to_string(),
            updated_at,
        }
    }

    fn quote_with_id(id: &str, text: &str, category: &str, updated_at: Option<i64>) -> Quote {
        Quote {
            id: Some(id.to_string()),
            ..quote(text, category, updated_at)
        }
    }

    #[test]
    fn test_empty_remote_is_noop() {
        let local = vec![quote("A", "X", Some(100)), quote("B", "Y", None)];
        let outcome = reconcile(local.clone(), vec![]);
        assert_eq!(outcome.merged, local);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn test_empty_local_adds_everything() {
        let remote = vec![quote("A", "X", Some(1)), quote("B", "Y", Some(2))];
        let outcome = reconcile(vec![], remote.clone());
        assert_eq!(outcome.merged, remote);
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn test_all_new_texts_are_appended_in_remote_order() {
        let local = vec![quote("A", "X", Some(100))];
        let remote = vec![quote("C", "Z", Some(3)), quote("B", "Y", Some(2))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.merged.len(), 3);
        assert_eq!(outcome.merged[0].text, "A");
        assert_eq!(outcome.merged[1].text, "C");
        assert_eq!(outcome.merged[2].text, "B");
    }

    #[test]
    fn test_last_write_wins() {
        let local = vec![quote("A", "X", Some(100))];
        let remote = vec![quote("A", "Y", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.merged[0].category, "Y");
        assert_eq!(outcome.merged[0].updated_at, Some(200));
    }

    #[test]
    fn test_stale_remote_is_ignored() {
        let local = vec![quote("A", "X", Some(300))];
        let remote = vec![quote("A", "Y", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.merged[0].category, "X");
        assert_eq!(outcome.merged[0].updated_at, Some(300));
    }

    #[test]
    fn test_equal_timestamps_keep_local() {
        let local = vec![quote("A", "X", Some(200))];
        let remote = vec![quote("A", "Y", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.merged[0].category, "X");
    }

    #[test]
    fn test_missing_local_timestamp_always_loses() {
        let local = vec![quote("A", "X", None)];
        let remote = vec![quote("A", "Y", Some(1))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged[0].category, "Y");
        assert_eq!(outcome.merged[0].updated_at, Some(1));
    }

    #[test]
    fn test_idempotent_on_second_pass() {
        let local = vec![quote("A", "X", Some(100)), quote("B", "Y", None)];
        let remote = vec![quote("A", "Z", Some(200)), quote("C", "W", Some(150))];

        let first = reconcile(local, remote.clone());
        assert_eq!(first.added, 1);
        assert_eq!(first.updated, 1);

        let second = reconcile(first.merged.clone(), remote);
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.merged, first.merged);
    }

    #[test]
    fn test_mixed_stale_conflict_and_new_entry() {
        let local = vec![quote("Be yourself", "Inspiration", Some(100))];
        let remote = vec![
            quote("Be yourself", "Wisdom", Some(50)),
            quote("New one", "Life", Some(999)),
        ];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.merged.len(), 2);
        assert_eq!(outcome.merged[0].category, "Inspiration");
        assert_eq!(outcome.merged[0].updated_at, Some(100));
        assert_eq!(outcome.merged[1].text, "New one");
        assert_eq!(outcome.merged[1].category, "Life");
    }

    #[test]
    fn test_duplicate_local_text_updates_first_match_only() {
        let local = vec![quote("A", "X", Some(1)), quote("A", "Y", Some(1))];
        let remote = vec![quote("A", "Z", Some(2))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged[0].category, "Z");
        assert_eq!(outcome.merged[1].category, "Y");
    }

    #[test]
    fn test_entry_appended_in_same_pass_is_matched() {
        let remote = vec![quote("A", "X", Some(100)), quote("A", "Y", Some(200))];
        let outcome = reconcile(vec![], remote);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.merged[0].category, "Y");
    }

    #[test]
    fn test_id_match_takes_precedence_over_text() {
        let local = vec![quote_with_id("q1", "Old words", "X", Some(100))];
        let remote = vec![quote_with_id("q1", "New words", "X", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged[0].text, "New words");
        assert_eq!(outcome.merged[0].id, Some("q1".to_string()));
    }

    #[test]
    fn test_differing_ids_with_same_text_do_not_match() {
        let local = vec![quote_with_id("q1", "A", "X", Some(100))];
        let remote = vec![quote_with_id("q2", "A", "Y", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.merged.len(), 2);
    }

    #[test]
    fn test_text_match_keeps_local_id() {
        let local = vec![quote_with_id("q1", "A", "X", Some(100))];
        let remote = vec![quote("A", "Y", Some(200))];
        let outcome = reconcile(local, remote);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.merged[0].id, Some("q1".to_string()));
        assert_eq!(outcome.merged[0].category, "Y");
    }

    #[test]
    fn test_merged_length_invariant() {
        let local = vec![quote("A", "X", Some(1)), quote("B", "X", Some(1))];
        let remote = vec![
            quote("A", "Y", Some(2)),
            quote("C", "Y", Some(2)),
            quote("D", "Y", Some(2)),
        ];
        let outcome = reconcile(local.clone(), remote);
        assert_eq!(outcome.merged.len(), local.len() + outcome.added);
    }
}
