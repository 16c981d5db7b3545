use std::ops::Range;

/// 总页数；页大小为 0 时没有页。
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

pub fn page_bounds(len: usize, page_size: usize, index: usize) -> Range<usize> {
    let start = page_size.saturating_mul(index).min(len);
    let end = start.saturating_add(page_size).min(len);
    start..end
}

pub fn page<T>(items: &[T], page_size: usize, index: usize) -> &[T] {
    &items[page_bounds(items.len(), page_size, index)]
}
