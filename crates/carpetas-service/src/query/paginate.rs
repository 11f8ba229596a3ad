//! Slicing a sorted list into pages.

use carpetas_core::types::{PageRequest, PageResponse};

/// Return the requested one-based page of `items`.
///
/// A page past the end yields no items but still reports the totals.
pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);

    let page: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    PageResponse::new(page, request.page, request.page_size, total)
}
