//! Fixed-capacity pagination for option lists larger than one select menu.

/// Upper bound on options per select menu imposed by the chat API.
pub const MAX_PAGE_CAPACITY: usize = 25;

fn effective(capacity: usize) -> usize {
    capacity.clamp(1, MAX_PAGE_CAPACITY)
}

/// Split `options` into pages of at most `capacity`, preserving order.
/// Zero options yield zero pages.
pub fn paginate<T>(options: &[T], capacity: usize) -> Vec<&[T]> {
    options.chunks(effective(capacity)).collect()
}

/// Number of pages `len` options occupy.
pub fn page_count(len: usize, capacity: usize) -> usize {
    len.div_ceil(effective(capacity))
}

/// Index of the page holding the first option matching `pred`.
pub fn locate_by<T>(options: &[T], capacity: usize, pred: impl Fn(&T) -> bool) -> Option<usize> {
    options
        .iter()
        .position(pred)
        .map(|pos| pos / effective(capacity))
}

/// Index of the page containing `value`, or None if it is not an option.
pub fn locate<T: PartialEq>(options: &[T], capacity: usize, value: &T) -> Option<usize> {
    locate_by(options, capacity, |o| o == value)
}

/// Page `index`, or an empty slice when out of range.
pub fn page<T>(options: &[T], capacity: usize, index: usize) -> &[T] {
    let cap = effective(capacity);
    let start = index.saturating_mul(cap).min(options.len());
    let end = start.saturating_add(cap).min(options.len());
    &options[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_partition_the_list() {
        for len in [0usize, 1, 24, 25, 26, 40, 50, 51] {
            let options: Vec<usize> = (0..len).collect();
            let pages = paginate(&options, 25);
            assert_eq!(pages.len(), page_count(len, 25));
            let flat: Vec<usize> = pages.iter().flat_map(|p| p.iter().copied()).collect();
            assert_eq!(flat, options, "len {len}");
            for (i, p) in pages.iter().enumerate() {
                assert!(!p.is_empty());
                assert!(p.len() <= 25);
                if i + 1 < pages.len() {
                    assert_eq!(p.len(), 25);
                }
                assert_eq!(*p, page(&options, 25, i));
            }
        }
    }

    #[test]
    fn zero_options_is_zero_pages() {
        let empty: [u8; 0] = [];
        assert!(paginate(&empty, 25).is_empty());
        assert_eq!(page_count(0, 25), 0);
    }

    #[test]
    fn locate_agrees_with_paginate() {
        let options: Vec<String> = (0..40).map(|i| format!("opt{i}")).collect();
        let pages = paginate(&options, 25);
        for value in &options {
            let idx = locate(&options, 25, value).unwrap();
            assert!(pages[idx].contains(value));
        }
        assert_eq!(locate(&options, 25, &"missing".to_string()), None);
        assert_eq!(locate(&options, 25, &"opt25".to_string()), Some(1));
    }

    #[test]
    fn capacity_is_clamped() {
        let options: Vec<u32> = (0..60).collect();
        assert_eq!(paginate(&options, 100).len(), 3);
        assert_eq!(paginate(&options, 0).len(), 60);
        assert!(page(&options, 25, 7).is_empty());
    }
}
