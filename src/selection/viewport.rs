/// Scroll origin that keeps `selected` visible with the least movement.
///
/// The origin stays put while the selection is visible. Otherwise the
/// selection becomes the top line when it fell off the bottom, or the
/// bottom line when it fell off the top.
pub fn calculate_origin(origin: usize, height: usize, selected: usize, line_count: usize) -> usize {
    let height = height.max(1);
    let max_origin = line_count.saturating_sub(height);

    let origin = if selected < origin {
        (selected + 1).saturating_sub(height)
    } else if selected >= origin + height {
        selected
    } else {
        origin
    };

    origin.min(max_origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn visible_selection_keeps_origin() {
        assert_eq!(calculate_origin(10, 5, 10, 100), 10);
        assert_eq!(calculate_origin(10, 5, 14, 100), 10);
    }

    #[test]
    fn moving_down_past_the_bottom() {
        assert_eq!(calculate_origin(10, 5, 15, 100), 15);
        assert_eq!(calculate_origin(0, 5, 40, 100), 40);
    }

    #[test]
    fn moving_up_past_the_top() {
        assert_eq!(calculate_origin(10, 5, 9, 100), 5);
        assert_eq!(calculate_origin(10, 5, 2, 100), 0);
    }

    #[test]
    fn clamped_to_the_last_page() {
        assert_eq!(calculate_origin(0, 5, 98, 100), 95);
        assert_eq!(calculate_origin(50, 5, 3, 4), 0);
    }

    #[test]
    fn zero_height_behaves_like_one() {
        assert_eq!(calculate_origin(3, 0, 7, 20), 7);
        assert_eq!(calculate_origin(3, 0, 3, 20), 3);
    }
}
