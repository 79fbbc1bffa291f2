//! Builders for wire-shaped fixtures.

use chrono::{TimeZone, Utc};
use watchfeed_rs_protocol::{MediaKind, PageResponse, RequestedItem, SourceGroup};

/// A requested movie with a fixed timestamp.
pub fn request(id: &str, title: &str) -> RequestedItem {
    request_of_kind(id, title, MediaKind::Movie)
}

/// A requested item of the given kind.
pub fn request_of_kind(id: &str, title: &str, kind: MediaKind) -> RequestedItem {
    RequestedItem {
        request_id: id.to_string(),
        title: title.to_string(),
        media_type: kind,
        requested_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
        overview: None,
        poster_path: None,
        release_date: None,
        rating: None,
        logo_path: None,
        backdrop_path: None,
    }
}

/// A movie source group carrying the given requests.
pub fn source(id: &str, title: &str, requests: Vec<RequestedItem>) -> SourceGroup {
    source_of_kind(id, title, MediaKind::Movie, requests)
}

/// A source group of the given kind.
pub fn source_of_kind(
    id: &str,
    title: &str,
    kind: MediaKind,
    requests: Vec<RequestedItem>,
) -> SourceGroup {
    SourceGroup {
        source_id: id.to_string(),
        source_title: title.to_string(),
        source_release_date: None,
        source_overview: None,
        source_poster_path: None,
        rating: None,
        media_type: kind,
        logo_path: None,
        backdrop_path: None,
        requests,
        expanded: false,
    }
}

/// A page response whose aggregate counts cover only the groups it carries.
pub fn page(number: u32, total_pages: u32, groups: Vec<SourceGroup>) -> PageResponse {
    let total_records = groups.iter().map(|group| group.requests.len() as u64).sum();
    PageResponse {
        total_sources: groups.len() as u64,
        total_records,
        data: groups,
        page: number,
        total_pages,
    }
}
