//! Numerically stable Poisson weights.
//!
//! Weights are built by iterated multiplication of `lambda / i` rather than
//! through factorials, so they stay finite for every count the engine can
//! reach under its delta and window bounds.

use crate::error::{EngineError, EngineResult};

/// The probability `P(lambda, k) = e^{-lambda} lambda^k / k!`.
///
/// Fails for negative counts and for negative or non-finite rates.
pub fn poisson_weight(lambda: f64, count: i64) -> EngineResult<f64> {
    if count < 0 {
        return Err(EngineError::NegativePoissonCount { count });
    }
    if !(lambda >= 0.0) || !lambda.is_finite() {
        return Err(EngineError::InvalidRate { value: lambda });
    }
    let mut result = 1.0;
    for i in 1..=count {
        result *= lambda / i as f64;
    }
    Ok((-lambda).exp() * result)
}

/// The truncated PMF `[P(lambda, 0), ..., P(lambda, truncation)]`.
///
/// The entries sum to strictly less than 1 for any finite truncation; the
/// deficit is the tail probability the caller has chosen to ignore.
pub fn truncated_pmf(lambda: f64, truncation: usize) -> EngineResult<Vec<f64>> {
    let mut pmf = Vec::with_capacity(truncation + 1);
    let mut weight = poisson_weight(lambda, 0)?;
    pmf.push(weight);
    for k in 1..=truncation {
        weight *= lambda / k as f64;
        pmf.push(weight);
    }
    Ok(pmf)
}

/// The smallest truncation point whose tail probability is at most `tail`.
///
/// Used to size the adversarial outcome space so that the ignored Poisson
/// tail is negligible relative to the caller's target precision.
pub fn truncation_for_tail(lambda: f64, tail: f64) -> EngineResult<usize> {
    if !(tail > 0.0) || !tail.is_finite() {
        return Err(EngineError::InvalidThreshold { value: tail });
    }
    let mut cumulative = poisson_weight(lambda, 0)?;
    let mut weight = cumulative;
    let mut k = 0usize;
    while 1.0 - cumulative > tail {
        k += 1;
        weight *= lambda / k as f64;
        cumulative += weight;
        // The loop always terminates: the tail of a Poisson distribution
        // goes to zero, and once weight underflows to 0.0 the cumulative
        // stops changing with 1 - cumulative at the f64 rounding floor.
        if weight == 0.0 {
            break;
        }
    }
    Ok(k)
}

/// Per-step honest outcome weights for the isolation model: the probabilities
/// of zero, exactly one, and two-or-more honest successes in one slot under a
/// Poisson rate.
pub fn isolated_honest_weights(lambda: f64) -> EngineResult<[f64; 3]> {
    if !(lambda >= 0.0) || !lambda.is_finite() {
        return Err(EngineError::InvalidRate { value: lambda });
    }
    let none = (-lambda).exp();
    let one = lambda * none;
    Ok([none, one, 1.0 - none * (1.0 + lambda)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_at_zero_is_exp_negative_lambda() {
        let w = poisson_weight(1.5, 0).unwrap();
        assert!((w - (-1.5f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn negative_count_is_rejected() {
        assert_eq!(
            poisson_weight(1.0, -1),
            Err(EngineError::NegativePoissonCount { count: -1 })
        );
    }

    #[test]
    fn negative_rate_is_rejected() {
        assert!(matches!(
            poisson_weight(-0.5, 2),
            Err(EngineError::InvalidRate { .. })
        ));
    }

    #[test]
    fn truncated_pmf_sums_below_one_and_grows_with_truncation() {
        let lambda = 2.0;
        let mut previous = 0.0;
        for truncation in [0usize, 1, 2, 5, 10, 20, 40] {
            let sum: f64 = truncated_pmf(lambda, truncation).unwrap().iter().sum();
            assert!(sum <= 1.0 + 1e-12, "sum {sum} exceeds 1");
            assert!(sum >= previous, "sum must grow with the truncation point");
            previous = sum;
        }
        assert!(1.0 - previous < 1e-12, "K=40 tail should be negligible");
    }

    #[test]
    fn truncation_for_tail_covers_requested_mass() {
        let lambda = 3.0;
        let k = truncation_for_tail(lambda, 1e-12).unwrap();
        let sum: f64 = truncated_pmf(lambda, k).unwrap().iter().sum();
        assert!(1.0 - sum <= 1e-12 + 1e-15);
        // One term fewer must leave a larger tail.
        if k > 0 {
            let sum: f64 = truncated_pmf(lambda, k - 1).unwrap().iter().sum();
            assert!(1.0 - sum > 1e-12);
        }
    }

    #[test]
    fn isolated_honest_weights_form_a_distribution() {
        let [none, one, many] = isolated_honest_weights(0.7).unwrap();
        assert!((none + one + many - 1.0).abs() < 1e-15);
        assert!(none > 0.0 && one > 0.0 && many > 0.0);
    }

    #[test]
    fn zero_rate_concentrates_on_zero() {
        let [none, one, many] = isolated_honest_weights(0.0).unwrap();
        assert_eq!(none, 1.0);
        assert_eq!(one, 0.0);
        assert_eq!(many, 0.0);
        assert_eq!(poisson_weight(0.0, 0).unwrap(), 1.0);
        assert_eq!(poisson_weight(0.0, 3).unwrap(), 0.0);
    }
}
