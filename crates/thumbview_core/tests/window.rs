use thumbview_core::{compute_required, ReadAhead, WindowRequest};

fn required(start: usize, end: usize, count: usize, multiplier: u32) -> Vec<usize> {
    compute_required(
        Some(WindowRequest::new(start, end)),
        count,
        ReadAhead::new(multiplier),
    )
    .into_iter()
    .collect()
}

#[test]
fn default_window_is_twice_the_visible_span() {
    // span = 3, mid = (2 + 5) / 2 + 1 = 4, window = [4 - 3, 4 + 3)
    assert_eq!(required(2, 5, 20, 2), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn window_covers_the_visible_range() {
    for start in 0..30 {
        for len in 1..10 {
            let got = required(start, start + len, 100, 2);
            for idx in start..start + len {
                assert!(got.contains(&idx), "visible {idx} missing for [{start}, {})", start + len);
            }
        }
    }
}

#[test]
fn wider_multiplier_reads_further() {
    // half width = 3 * 4 / 2 = 6, window = [-2, 10) clipped to [0, 10)
    assert_eq!(required(2, 5, 20, 4), (0..10).collect::<Vec<_>>());
}

#[test]
fn window_is_clipped_to_item_count() {
    // mid = 11, span = 4, window = [7, 15) clipped to [7, 11)
    assert_eq!(required(8, 12, 11, 2), vec![7, 8, 9, 10]);
    assert_eq!(required(0, 2, 1, 2), vec![0]);
}

#[test]
fn empty_or_missing_range_requires_nothing() {
    assert!(compute_required(None, 20, ReadAhead::default()).is_empty());
    assert!(required(5, 5, 20, 2).is_empty());
    assert!(required(6, 2, 20, 2).is_empty());
    assert!(required(0, 5, 0, 2).is_empty());
}

#[test]
fn range_past_the_end_requires_nothing() {
    assert!(required(40, 44, 20, 2).is_empty());
}

#[test]
fn range_at_the_top_of_usize_requires_nothing() {
    assert!(required(usize::MAX - 1, usize::MAX, 10, 2).is_empty());
    assert!(required(usize::MAX - 40, usize::MAX, 10, 8).is_empty());
}

#[test]
fn odd_and_even_spans_share_the_midpoint_rule() {
    // mid = (3 + 7) / 2 + 1 = 6, span 4
    assert_eq!(required(3, 7, 50, 2), (2..10).collect::<Vec<_>>());
    // mid = (3 + 8) / 2 + 1 = 6, span 5
    assert_eq!(required(3, 8, 50, 2), (1..11).collect::<Vec<_>>());
}
