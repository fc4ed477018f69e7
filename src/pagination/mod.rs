//! Pagination module
//!
//! A [`Paginator`] turns each response into either the query parameters of
//! the next request or [`NextPage::Done`].

mod strategies;
mod types;

pub use strategies::TokenPaginator;
pub use types::{extract_jsonpath, NextPage, PaginationState, Paginator};

#[cfg(test)]
mod tests;
