//! Majority-vote denoising of object bitmaps.

use ndarray::{Array2, s};

use crate::model::Bitmap;

/// Votes needed for a window of `cells` pixels to produce foreground.
///
/// Interior cells see a full 3x3 window, border cells a 3x2 or 2x3 window
/// and corners a 2x2 window. Bitmaps thinner than two pixels fall back to a
/// strict majority.
fn vote_threshold(cells: usize) -> usize {
    match cells {
        9 => 5,
        6 => 3,
        4 => 3,
        n => n / 2 + 1,
    }
}

/// Apply a single majority-filter pass.
///
/// Every output cell is decided from the unmodified input, so the result
/// does not depend on scan order. Any non-zero input counts as foreground;
/// the output holds only 0 and 1. An empty bitmap is returned unchanged.
pub fn majority_filter(map: &Bitmap) -> Bitmap {
    if map.is_empty() {
        return map.clone();
    }

    let (width, height) = map.dim();
    Array2::from_shape_fn((width, height), |(x, y)| {
        let x0 = x.saturating_sub(1);
        let y0 = y.saturating_sub(1);
        let x1 = (x + 1).min(width - 1);
        let y1 = (y + 1).min(height - 1);

        let window = map.slice(s![x0..=x1, y0..=y1]);
        let votes = window.iter().filter(|&&v| v > 0).count();
        u8::from(votes >= vote_threshold(window.len()))
    })
}

/// Apply `passes` independent filter passes in sequence.
pub fn majority_filter_passes(map: &Bitmap, passes: u32) -> Bitmap {
    let mut current = map.clone();
    for pass in 0..passes {
        let next = majority_filter(&current);
        if next == current {
            log::trace!("Majority filter reached a fixed point after {} pass(es)", pass);
            break;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{bitmap_from_rows, empty_bitmap};

    #[test]
    fn test_uniform_input_is_unchanged() {
        let zeros = empty_bitmap(7, 5);
        assert_eq!(majority_filter(&zeros), zeros);

        let ones = Array2::from_elem((6, 9), 1u8);
        assert_eq!(majority_filter(&ones), ones);
    }

    #[test]
    fn test_repeated_single_passes_agree() {
        let map = bitmap_from_rows(&[
            &[1, 0, 1, 1, 0],
            &[0, 1, 1, 0, 0],
            &[1, 1, 0, 1, 1],
            &[0, 0, 1, 1, 0],
        ]);
        let first = majority_filter(&map);
        let second = majority_filter(&map);
        assert_eq!(first, second);
        assert_eq!(first.dim(), map.dim());
    }

    #[test]
    fn test_isolated_pixel_is_removed() {
        let map = bitmap_from_rows(&[
            &[0, 0, 0, 0],
            &[0, 1, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ]);
        assert_eq!(majority_filter(&map), empty_bitmap(4, 4));
    }

    #[test]
    fn test_hole_is_filled() {
        let map = bitmap_from_rows(&[&[1, 1, 1], &[1, 0, 1], &[1, 1, 1]]);
        let filtered = majority_filter(&map);
        assert_eq!(filtered[[1, 1]], 1);
        assert_eq!(filtered, Array2::from_elem((3, 3), 1u8));
    }

    #[test]
    fn test_corner_needs_three_of_four() {
        let three = bitmap_from_rows(&[&[0, 1, 0], &[1, 1, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&three)[[0, 0]], 1);

        let two = bitmap_from_rows(&[&[0, 1, 0], &[1, 0, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&two)[[0, 0]], 0);
    }

    #[test]
    fn test_border_window_threshold() {
        // Top edge cell (1, 0) sees six cells.
        let three = bitmap_from_rows(&[&[1, 0, 1], &[0, 1, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&three)[[1, 0]], 1);

        let two = bitmap_from_rows(&[&[1, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&two)[[1, 0]], 0);
    }

    #[test]
    fn test_interior_threshold_is_five() {
        let four = bitmap_from_rows(&[&[1, 1, 0], &[1, 1, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&four)[[1, 1]], 0);

        let five = bitmap_from_rows(&[&[1, 1, 1], &[1, 1, 0], &[0, 0, 0]]);
        assert_eq!(majority_filter(&five)[[1, 1]], 1);
    }

    #[test]
    fn test_non_binary_values_count_as_foreground() {
        let map = Array2::from_elem((3, 3), 200u8);
        assert_eq!(majority_filter(&map), Array2::from_elem((3, 3), 1u8));
    }

    #[test]
    fn test_empty_bitmap_is_noop() {
        let empty = empty_bitmap(0, 0);
        assert_eq!(majority_filter(&empty), empty);
        let thin = empty_bitmap(0, 5);
        assert_eq!(majority_filter(&thin).dim(), (0, 5));
    }

    #[test]
    fn test_passes_stop_at_fixed_point() {
        let map = bitmap_from_rows(&[&[1, 1, 1], &[1, 0, 1], &[1, 1, 1]]);
        let filtered = majority_filter_passes(&map, 5);
        assert_eq!(filtered, majority_filter(&map));
        assert_eq!(majority_filter_passes(&map, 0), map);
    }
}
