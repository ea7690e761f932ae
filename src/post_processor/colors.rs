use std::f64::consts::PI;

/// Entries of the sampled rainbow table
const LUT_SIZE: usize = 256;

/// Samples the rainbow ramp (violet to red) at `x` in `[0, 1]`
///
/// The ramp is tabulated on 256 entries and looked up by truncation, the way
/// matplotlib's `rainbow` colormap does, so colors match plots made there.
pub fn rainbow(x: f64) -> [f64; 3] {
    let index = ((x * LUT_SIZE as f64) as isize).clamp(0, LUT_SIZE as isize - 1);
    let t = index as f64 / (LUT_SIZE - 1) as f64;

    [
        (2.0 * t - 0.5).abs().clamp(0.0, 1.0),
        (t * PI).sin().clamp(0.0, 1.0),
        (t * PI / 2.0).cos().clamp(0.0, 1.0),
    ]
}

/// `count` evenly spaced rainbow colors as `rgb(r,g,b)` strings
pub fn rainbow_ramp(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let x = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            to_rgb(rainbow(x))
        })
        .collect()
}

fn to_rgb(color: [f64; 3]) -> String {
    format!(
        "rgb({},{},{})",
        (color[0] * 255.0) as u8,
        (color[1] * 255.0) as u8,
        (color[2] * 255.0) as u8
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_ends() {
        assert_eq!(rainbow_ramp(2), vec!["rgb(127,0,255)", "rgb(255,0,0)"]);
    }

    #[test]
    fn test_single_color_is_start_of_ramp() {
        assert_eq!(rainbow_ramp(1), vec!["rgb(127,0,255)"]);
        assert!(rainbow_ramp(0).is_empty());
    }

    #[test]
    fn test_colors_are_distinct() {
        let colors = rainbow_ramp(5);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
