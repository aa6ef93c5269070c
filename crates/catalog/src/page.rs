//! Fixed-size page slicing.

use std::num::NonZeroUsize;

/// One page of a longer sequence.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}
impl<T> Page<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `items` into pages of `page_size` and return page `requested`.
///
/// Out-of-range requests are clamped into `1..=total_pages`; an empty
/// sequence still has one (empty) page.
///
/// ```
/// use sprite_catalog::paginate;
/// use std::num::NonZeroUsize;
///
/// let letters = ['a', 'b', 'c', 'd', 'e'];
/// let page = paginate(&letters, 99, NonZeroUsize::new(2).unwrap());
/// assert_eq!(page.items, &['e']);
/// assert_eq!((page.page, page.total_pages), (3, 3));
/// ```
pub fn paginate<T>(items: &[T], requested: usize, page_size: NonZeroUsize) -> Page<'_, T> {
    let size = page_size.get();
    let total_items = items.len();
    let total_pages = total_items.div_ceil(size).max(1);
    let page = requested.clamp(1, total_pages);
    let from = ((page - 1) * size).min(total_items);
    let to = (from + size).min(total_items);
    Page {
        items: &items[from..to],
        page,
        total_pages,
        total_items,
    }
}
