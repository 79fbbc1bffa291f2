//! Pull-based projections over the accumulated set.
//!
//! Both shapes are computed on read, so they are always consistent with the
//! latest accumulated set; no separate cache invariant exists.

use serde::Serialize;
use watchfeed_rs_protocol::{MediaKind, RequestedItem, SourceGroup, SourceId};

/// One row of the flat projection: a request denormalized with its source.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlatItem {
    /// The request itself.
    #[serde(flatten)]
    pub request: RequestedItem,
    /// Id of the source that caused this request.
    pub source_id: SourceId,
    /// Title of the source that caused this request.
    pub source_title: String,
    /// Poster image reference of the source.
    pub source_poster_path: Option<String>,
    /// Logo image reference of the source.
    pub source_logo_path: Option<String>,
    /// Backdrop image reference of the source.
    pub source_backdrop_path: Option<String>,
}

impl FlatItem {
    /// Media kind of the flattened request.
    pub fn media_type(&self) -> MediaKind {
        self.request.media_type
    }
}

/// Flatten groups into one row per request, preserving nested order.
///
/// Deterministic for a given snapshot: groups in arrival order, requests in
/// server order within each group.
pub fn flatten(groups: &[SourceGroup]) -> Vec<FlatItem> {
    let mut items = Vec::with_capacity(groups.iter().map(|group| group.requests.len()).sum());
    for group in groups {
        for request in &group.requests {
            items.push(FlatItem {
                request: request.clone(),
                source_id: group.source_id.clone(),
                source_title: group.source_title.clone(),
                source_poster_path: group.source_poster_path.clone(),
                source_logo_path: group.logo_path.clone(),
                source_backdrop_path: group.backdrop_path.clone(),
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::flatten;
    use pretty_assertions::assert_eq;
    use watchfeed_rs_test_utils::fixtures::{request, source};

    #[test]
    fn flattening_is_stable_and_length_matches_children() {
        let groups = vec![
            source(
                "src-1",
                "Alien",
                vec![request("req-1", "Aliens"), request("req-2", "Prometheus")],
            ),
            source("src-2", "Heat", vec![request("req-3", "Ronin")]),
        ];

        let first = flatten(&groups);
        let second = flatten(&groups);
        assert_eq!(first, second);
        assert_eq!(
            first.len(),
            groups.iter().map(|group| group.requests.len()).sum::<usize>()
        );
        assert_eq!(
            first
                .iter()
                .map(|item| item.request.request_id.as_str())
                .collect::<Vec<_>>(),
            vec!["req-1", "req-2", "req-3"]
        );
    }

    #[test]
    fn parent_fields_are_copied_onto_each_row() {
        let mut group = source("src-1", "Alien", vec![request("req-1", "Aliens")]);
        group.source_poster_path = Some("/poster.jpg".to_string());
        group.logo_path = Some("/logo.png".to_string());
        group.backdrop_path = Some("/backdrop.jpg".to_string());

        let items = flatten(&[group]);
        assert_eq!(items[0].source_id, "src-1");
        assert_eq!(items[0].source_title, "Alien");
        assert_eq!(items[0].source_poster_path.as_deref(), Some("/poster.jpg"));
        assert_eq!(items[0].source_logo_path.as_deref(), Some("/logo.png"));
        assert_eq!(
            items[0].source_backdrop_path.as_deref(),
            Some("/backdrop.jpg")
        );
    }

    #[test]
    fn empty_groups_flatten_to_nothing() {
        let groups = vec![source("src-1", "Alien", vec![])];
        assert_eq!(flatten(&groups).len(), 0);
    }
}
