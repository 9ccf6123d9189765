use diagram_align_kernel::types::geometry::Bounds;
use imageproc::image::RgbImage;

/// Distance-plus-size score between a detected box and the box it should
/// replace. Lower is better.
pub fn shape_match_score(candidate: &Bounds, target: &Bounds, size_weight: f32) -> f32 {
    let distance = candidate.center().distance(target.center());
    let dw = (candidate.w - target.w).abs() / target.w.max(1.0);
    let dh = (candidate.h - target.h).abs() / target.h.max(1.0);
    distance + size_weight * (dw + dh)
}

/// Zero-mean normalized cross-correlation over every channel of two
/// equally sized images, in `[-1, 1]`.
///
/// Returns 0 when the sizes differ or either image is flat.
pub fn normalized_cross_correlation(template: &RgbImage, patch: &RgbImage) -> f32 {
    if template.dimensions() != patch.dimensions() || template.as_raw().is_empty() {
        return 0.0;
    }
    let t = template.as_raw();
    let p = patch.as_raw();
    let n = t.len() as f64;

    let mean_t = t.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_p = p.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let (mut cov, mut var_t, mut var_p) = (0.0, 0.0, 0.0);
    for (&a, &b) in t.iter().zip(p) {
        let da = f64::from(a) - mean_t;
        let db = f64::from(b) - mean_p;
        cov += da * db;
        var_t += da * da;
        var_p += db * db;
    }
    let std_t = (var_t / n).sqrt();
    let std_p = (var_p / n).sqrt();
    if std_t < f64::EPSILON || std_p < f64::EPSILON {
        return 0.0;
    }
    ((cov / n) / (std_t * std_p)) as f32
}

#[cfg(test)]
mod tests {
    use imageproc::image::Rgb;

    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 20) as u8, (y * 30) as u8, 100]))
    }

    #[test]
    fn ncc_is_contrast_invariant() {
        let a = gradient(8, 6);
        let b = RgbImage::from_fn(8, 6, |x, y| {
            let Rgb([r, g, bl]) = *a.get_pixel(x, y);
            Rgb([r / 2 + 10, g / 2 + 10, bl / 2 + 10])
        });
        assert!((normalized_cross_correlation(&a, &a) - 1.0).abs() < 1e-4);
        assert!(normalized_cross_correlation(&a, &b) > 0.99);

        let inverted = RgbImage::from_fn(8, 6, |x, y| {
            let Rgb(px) = *a.get_pixel(x, y);
            Rgb(px.map(|v| 255 - v))
        });
        assert!((normalized_cross_correlation(&a, &inverted) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn ncc_of_flat_or_mismatched_images_is_zero() {
        let flat = RgbImage::from_pixel(8, 6, Rgb([30, 30, 30]));
        assert_eq!(normalized_cross_correlation(&flat, &gradient(8, 6)), 0.0);
        assert_eq!(normalized_cross_correlation(&gradient(8, 6), &gradient(6, 8)), 0.0);
    }

    #[test]
    fn match_score_prefers_close_and_similar() {
        let target = Bounds::new(45.0, 55.0, 90.0, 55.0);
        let exact = Bounds::new(50.0, 50.0, 100.0, 60.0);
        let far = Bounds::new(200.0, 200.0, 90.0, 55.0);
        let small = Bounds::new(60.0, 60.0, 20.0, 20.0);
        let score = |b: &Bounds| shape_match_score(b, &target, 50.0);
        assert!(score(&exact) < score(&far));
        assert!(score(&exact) < score(&small));
        assert_eq!(score(&target), 0.0);
    }
}
