//! Categorical colors for series lines and breakdown wedges.
//!
//! `CATEGORY20` is the 20-color categorical palette; a palette sized for `n`
//! categories (3 <= n <= 20) is its first `n` entries.

pub const CATEGORY20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
    "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Smallest palette size available
const MIN_PALETTE_SIZE: usize = 3;

/// Palette sized for `n` categories. Sizes below 3 get the 3-color palette,
/// sizes above 20 get the full palette.
pub fn category20(n: usize) -> &'static [&'static str] {
    &CATEGORY20[..n.clamp(MIN_PALETTE_SIZE, CATEGORY20.len())]
}

/// Line color for the observation type at `position` in the request.
pub fn series_color(position: usize) -> &'static str {
    CATEGORY20[position % CATEGORY20.len()]
}

/// Wedge colors for `count` breakdown rows.
///
/// One row takes slot 0 of the 3-color palette and two rows both take slot 1.
/// Three or more rows walk the palette sized to the row count, wrapping past 20.
pub fn breakdown_colors(count: usize) -> Vec<&'static str> {
    match count {
        0 => Vec::new(),
        1 => vec![category20(3)[0]],
        2 => vec![category20(3)[1]; 2],
        n => {
            let palette = category20(n);
            (0..n).map(|i| palette[i % palette.len()]).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_sizes() {
        assert_eq!(category20(1).len(), 3);
        assert_eq!(category20(7).len(), 7);
        assert_eq!(category20(40).len(), 20);
    }

    #[test]
    fn test_small_count_slots() {
        assert!(breakdown_colors(0).is_empty());
        assert_eq!(breakdown_colors(1), vec!["#1f77b4"]);
        assert_eq!(breakdown_colors(2), vec!["#aec7e8", "#aec7e8"]);
    }

    #[test]
    fn test_general_case_follows_palette() {
        let colors = breakdown_colors(4);
        assert_eq!(colors, vec!["#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78"]);

        let wrapped = breakdown_colors(22);
        assert_eq!(wrapped[20], CATEGORY20[0]);
        assert_eq!(wrapped[21], CATEGORY20[1]);
    }

    #[test]
    fn test_series_color_wraps() {
        assert_eq!(series_color(0), "#1f77b4");
        assert_eq!(series_color(2), "#ff7f0e");
        assert_eq!(series_color(20), series_color(0));
    }
}
