use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// `?page=N` query parameter shared by every feed view.
#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// One fixed-size slice of an ordered result set, plus the metadata
/// templates need to draw pager links.
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Slices `items` into page `number` of `page_size` elements.
///
/// Out-of-range page numbers clamp to the nearest valid page instead of
/// erroring; an empty input yields zero total pages and an empty page 1.
pub fn paginate<T>(items: Vec<T>, number: usize, page_size: usize) -> Page<T> {
    debug_assert!(page_size > 0);

    let total_pages = (items.len() + page_size - 1) / page_size;
    let number = number.clamp(1, std::cmp::max(total_pages, 1));

    let items: Vec<T> = items
        .into_iter()
        .skip((number - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        number,
        page_size,
        total_pages,
        has_next: number < total_pages,
        has_previous: number > 1 && total_pages > 0,
    }
}
