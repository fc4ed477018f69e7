//! Pagination strategy implementations

use super::types::{extract_jsonpath, NextPage, PaginationState, Paginator};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// Continuation Token Pagination
// ============================================================================

/// Continuation-token pagination (e.g. YouTube `nextPageToken`/`pageToken`)
///
/// Each response may carry a token at `token_path`; when present it is sent
/// back as `token_param` on the next request. The page without a token is
/// the last one.
#[derive(Debug, Clone)]
pub struct TokenPaginator {
    /// Query parameter name for the token
    pub token_param: String,
    /// Path to the token in the response body
    pub token_path: String,
    /// Hard cap on pages, guards against APIs that never stop issuing tokens
    pub max_pages: Option<u32>,
}

impl TokenPaginator {
    /// Create a new token paginator
    pub fn new(token_param: impl Into<String>, token_path: impl Into<String>) -> Self {
        Self {
            token_param: token_param.into(),
            token_path: token_path.into(),
            max_pages: None,
        }
    }

    /// YouTube Data API convention
    pub fn youtube() -> Self {
        Self::new("pageToken", "nextPageToken")
    }

    /// Stop after this many pages even if tokens keep coming
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

impl Paginator for TokenPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(cursor) = &state.cursor {
            params.insert(self.token_param.clone(), cursor.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        if self.max_pages.is_some_and(|max| state.pages >= max) {
            debug!("Reached page limit of {}", state.pages);
            state.mark_done();
            return NextPage::Done;
        }

        match extract_jsonpath(body, &self.token_path) {
            Some(token) if !token.is_empty() => {
                state.set_cursor(token.clone());
                NextPage::with_param(&self.token_param, token)
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
