use explore_core::constants::WEIGHT_EPSILON;

/// Rescale weights to sum to 1.0. All-zero input becomes uniform 1/N.
pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: f64 = weights.iter().sum();
    if sum <= WEIGHT_EPSILON {
        let uniform = 1.0 / weights.len() as f64;
        return vec![uniform; weights.len()];
    }
    weights.iter().map(|w| w / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_is_uniform() {
        assert_eq!(normalize_weights(&[0.0, 0.0, 0.0, 0.0]), vec![0.25; 4]);
    }

    #[test]
    fn already_normalized_is_unchanged() {
        let w = normalize_weights(&[0.5, 0.5]);
        assert!((w[0] - 0.5).abs() < 1e-12 && (w[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_stays_zero() {
        let w = normalize_weights(&[0.0, 0.4]);
        assert_eq!(w, vec![0.0, 1.0]);
    }
}
