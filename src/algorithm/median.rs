use diagram_align_kernel::types::color::Bgr;

/// Median of unsigned values; an even count takes the floored mean of the
/// two middle values.
pub fn median_u32(values: &mut [u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2)
    }
}

/// Channel-wise median color.
pub fn median_color(colors: impl IntoIterator<Item = Bgr>) -> Option<Bgr> {
    let mut b = vec![];
    let mut g = vec![];
    let mut r = vec![];
    for color in colors {
        b.push(u32::from(color.b));
        g.push(u32::from(color.g));
        r.push(u32::from(color.r));
    }
    let channel = |values: &mut Vec<u32>| median_u32(values).map(|v| v as u8);
    Some(Bgr::new(channel(&mut b)?, channel(&mut g)?, channel(&mut r)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_counts() {
        assert_eq!(median_u32(&mut []), None);
        assert_eq!(median_u32(&mut [7]), Some(7));
        assert_eq!(median_u32(&mut [9, 1, 5]), Some(5));
        assert_eq!(median_u32(&mut [10, 8, 10, 9]), Some(9));
        assert_eq!(median_u32(&mut [2, 3]), Some(2));
    }

    #[test]
    fn median_of_colors() {
        let colors = [
            Bgr::new(255, 0, 0),
            Bgr::new(250, 10, 3),
            Bgr::new(0, 0, 255),
        ];
        assert_eq!(median_color(colors), Some(Bgr::new(250, 0, 3)));
        assert_eq!(median_color([]), None);
    }
}
