//! Slices an ordered sequence into fixed-size pages and works out which
//! navigation controls to offer for the current one. Also holds the
//! arithmetic for keeping the reader's distance from the bottom of the
//! document steady across page changes.

/// The number of articles per listings page.
pub const PAGE_SIZE: usize = 6;

/// Above this many pages the page-number controls are windowed around the
/// current page.
const MAX_UNWINDOWED_PAGES: usize = 7;

/// The pagination state for one active sequence: which 1-based page is
/// showing, how big a page is, and how many items there are in total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
}

impl Pagination {
    /// Starts on page 1. A `page_size` of zero is treated as one.
    pub fn new(total_items: usize, page_size: usize) -> Pagination {
        Pagination {
            page: 1,
            page_size: page_size.max(1),
            total_items,
        }
    }

    /// The same sequence showing `page`.
    pub fn at(self, page: usize) -> Pagination {
        Pagination { page, ..self }
    }

    /// `ceil(total_items / page_size)`; zero for an empty sequence.
    pub fn total_pages(&self) -> usize {
        match self.total_items % self.page_size {
            0 => self.total_items / self.page_size,
            _ => self.total_items / self.page_size + 1,
        }
    }

    /// The items on the current page: `[(page-1)*size, page*size)`, clipped
    /// to the end of `items`. Empty for a page past the end (or page 0).
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if self.page == 0 {
            return &[];
        }
        let start = (self.page - 1).saturating_mul(self.page_size).min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }

    pub fn previous_disabled(&self) -> bool {
        self.page <= 1
    }

    pub fn next_disabled(&self) -> bool {
        self.page >= self.total_pages()
    }

    /// Pagination is only shown when there's more than one page.
    pub fn is_visible(&self) -> bool {
        self.total_pages() > 1
    }

    /// The page-number controls. Up to seven pages are all listed. Beyond
    /// that: the first page, an ellipsis when the current page is past 3, the
    /// pages from `page-1` to `page+1` (kept clear of the first and last),
    /// an ellipsis when the current page is before `total-2`, and the last
    /// page.
    pub fn controls(&self) -> Vec<PageControl> {
        let total = self.total_pages();
        let link = |number: usize| PageControl::Page {
            number,
            active: number == self.page,
        };

        if total <= MAX_UNWINDOWED_PAGES {
            return (1..=total).map(link).collect();
        }

        let mut controls = vec![link(1)];
        if self.page > 3 {
            controls.push(PageControl::Ellipsis);
        }
        let start = self.page.saturating_sub(1).max(2);
        let end = (self.page + 1).min(total - 1);
        controls.extend((start..=end).map(link));
        if self.page + 2 < total {
            controls.push(PageControl::Ellipsis);
        }
        controls.push(link(total));
        controls
    }
}

/// One entry in the page-number container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageControl {
    Page { number: usize, active: bool },
    Ellipsis,
}

/// A snapshot of the scroll position and the sizes it is measured against,
/// all in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    /// How far the bottom of the viewport is from the bottom of the document.
    pub fn distance_from_bottom(&self) -> f64 {
        self.document_height - (self.scroll_y + self.viewport_height)
    }

    /// The largest valid scroll offset.
    pub fn max_scroll(&self) -> f64 {
        (self.document_height - self.viewport_height).max(0.0)
    }

    /// The scroll offset that puts the viewport `distance` above the bottom of
    /// the document, clamped to `[0, max_scroll]`.
    pub fn restore(&self, distance: f64) -> f64 {
        let target = self.document_height - distance - self.viewport_height;
        target.max(0.0).min(self.max_scroll())
    }
}
