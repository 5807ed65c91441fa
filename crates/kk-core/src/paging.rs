//! Page arithmetic for the category picker and the saved-collection viewer.
//!
//! Everything here is pure; callers always pass lengths read from live storage.

use crate::{errors::Error, Result};

/// `ceil(total / page_size)`.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// One page of the category picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryPage {
    pub page: usize,
    pub page_count: usize,
    /// Range of catalog entries shown on this page.
    pub start: usize,
    pub end: usize,
}

impl CategoryPage {
    /// Fails with `Error::Range` unless `0 <= page < page_count`.
    pub fn at(total: usize, page_size: usize, page: i64) -> Result<Self> {
        let page_count = page_count(total, page_size);
        let page = usize::try_from(page)
            .ok()
            .filter(|p| *p < page_count)
            .ok_or_else(|| {
                Error::Range(format!("category page {page} not in 0..{page_count}"))
            })?;

        let start = page * page_size;
        let end = (start + page_size).min(total);
        Ok(Self {
            page,
            page_count,
            start,
            end,
        })
    }

    pub fn prev(&self) -> Option<usize> {
        self.page.checked_sub(1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.page + 1 < self.page_count).then_some(self.page + 1)
    }
}

/// Position of the item shown in the saved-collection viewer.
///
/// Page index == list index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedPage {
    pub index: usize,
    pub total: usize,
}

impl SavedPage {
    /// Fails with `Error::Range` unless `index < total`.
    pub fn at(total: usize, index: usize) -> Result<Self> {
        if index >= total {
            return Err(Error::Range(format!(
                "saved page {index} not in 0..{total}"
            )));
        }
        Ok(Self { index, total })
    }

    pub fn prev(&self) -> Option<usize> {
        self.index.checked_sub(1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.index + 1 < self.total).then_some(self.index + 1)
    }

    pub fn has_prev(&self) -> bool {
        self.prev().is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next().is_some()
    }
}

/// Index to show after removing position `removed` from a list of `len_before` items.
///
/// `None` means the list is now empty. Otherwise `min(removed, len_before - 2)`:
/// the same position (now the following item), or one back when the last item
/// was removed.
pub fn index_after_removal(removed: usize, len_before: usize) -> Option<usize> {
    let remaining = len_before.checked_sub(1)?;
    if remaining == 0 {
        return None;
    }
    Some(removed.min(remaining - 1))
}
