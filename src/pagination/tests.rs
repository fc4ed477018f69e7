//! Tests for pagination module

use super::*;
use serde_json::json;

// ============================================================================
// NextPage / State Tests
// ============================================================================

#[test]
fn test_next_page_with_param() {
    let next = NextPage::with_param("pageToken", "CAUQAA");
    assert!(next.is_continue());
    assert!(!next.is_done());

    if let NextPage::Continue { query_params } = next {
        assert_eq!(query_params.get("pageToken"), Some(&"CAUQAA".to_string()));
    } else {
        panic!("Expected Continue");
    }
}

#[test]
fn test_pagination_state_default() {
    let state = PaginationState::new();
    assert_eq!(state.pages, 0);
    assert!(state.cursor.is_none());
    assert_eq!(state.total_fetched, 0);
    assert!(!state.done);
}

#[test]
fn test_extract_jsonpath() {
    let body = json!({"nextPageToken": "abc", "pageInfo": {"totalResults": 12}});
    assert_eq!(extract_jsonpath(&body, "nextPageToken"), Some("abc".to_string()));
    assert_eq!(
        extract_jsonpath(&body, "$.pageInfo.totalResults"),
        Some("12".to_string())
    );
    assert_eq!(extract_jsonpath(&body, "missing"), None);
    assert_eq!(extract_jsonpath(&body, "pageInfo"), None);
}

// ============================================================================
// Token Paginator Tests
// ============================================================================

#[test]
fn test_token_paginator_first_request_has_no_token() {
    let paginator = TokenPaginator::youtube();
    let state = PaginationState::new();
    assert!(paginator.initial_params(&state).is_empty());
}

#[test]
fn test_token_paginator_continues_while_token_present() {
    let paginator = TokenPaginator::youtube();
    let mut state = PaginationState::new();

    let body = json!({"items": [{}, {}], "nextPageToken": "page2"});
    let next = paginator.process_response(&body, 2, &mut state);

    assert_eq!(next, NextPage::with_param("pageToken", "page2"));
    assert_eq!(state.cursor, Some("page2".to_string()));
    assert_eq!(
        paginator.initial_params(&state).get("pageToken"),
        Some(&"page2".to_string())
    );
    assert!(!state.done);
}

#[test]
fn test_token_paginator_terminates_on_page_without_token() {
    let paginator = TokenPaginator::youtube();
    let mut state = PaginationState::new();

    let pages = [
        json!({"items": [1, 2], "nextPageToken": "p2"}),
        json!({"items": [3], "nextPageToken": "p3"}),
        json!({"items": [4]}),
        json!({"items": [5], "nextPageToken": "never-read"}),
    ];

    let mut processed = 0;
    for page in &pages {
        processed += 1;
        let count = page["items"].as_array().map_or(0, Vec::len);
        if paginator.process_response(page, count, &mut state).is_done() {
            break;
        }
    }

    assert_eq!(processed, 3);
    assert_eq!(state.pages, 3);
    assert_eq!(state.total_fetched, 4);
    assert!(state.done);
}

#[test]
fn test_token_paginator_empty_token_is_done() {
    let paginator = TokenPaginator::youtube();
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!({"nextPageToken": ""}), 0, &mut state);
    assert!(next.is_done());
}

#[test]
fn test_token_paginator_max_pages() {
    let paginator = TokenPaginator::youtube().with_max_pages(2);
    let mut state = PaginationState::new();

    let body = json!({"nextPageToken": "more"});
    assert!(paginator.process_response(&body, 1, &mut state).is_continue());
    assert!(paginator.process_response(&body, 1, &mut state).is_done());
}
