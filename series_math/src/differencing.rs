//! Differencing and its inverse
//!
//! A series differenced `d` times loses `d` points. To undo it, the first
//! (or last) value of every intermediate level is needed, so
//! [`difference_levels`] returns all of them.

/// First differences `x[t] - x[t-1]`
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Difference a series `d` times, keeping every level
///
/// `levels[0]` is the input and `levels[d]` the fully differenced series.
/// Returns `None` if a pass would have to start from fewer than two points.
pub fn difference_levels(values: &[f64], d: usize) -> Option<Vec<Vec<f64>>> {
    let mut levels = Vec::with_capacity(d + 1);
    levels.push(values.to_vec());

    for _ in 0..d {
        let current = levels.last()?;
        if current.len() < 2 {
            return None;
        }
        let next = first_difference(current);
        levels.push(next);
    }

    Some(levels)
}

/// Difference a series `d` times
pub fn difference(values: &[f64], d: usize) -> Option<Vec<f64>> {
    difference_levels(values, d).and_then(|mut levels| levels.pop())
}

/// Undo differencing from the front of the series
///
/// `heads[k]` is the first value of level `k` (so `heads.len()` is the number
/// of differencing passes). Each pass prepends the head and accumulates, so
/// the result is `heads.len()` points longer than `differenced`.
pub fn integrate_from_heads(differenced: &[f64], heads: &[f64]) -> Vec<f64> {
    let mut current = differenced.to_vec();

    for &head in heads.iter().rev() {
        let mut restored = Vec::with_capacity(current.len() + 1);
        let mut running = head;
        restored.push(running);
        for delta in &current {
            running += delta;
            restored.push(running);
        }
        current = restored;
    }

    current
}

/// Continue differenced values past the end of a series
///
/// `tails[k]` is the last known value of level `k`. The output has the same
/// length as `differenced` and holds the level-0 continuation.
pub fn integrate_from_tails(differenced: &[f64], tails: &[f64]) -> Vec<f64> {
    let mut current = differenced.to_vec();

    for &tail in tails.iter().rev() {
        let mut running = tail;
        for value in current.iter_mut() {
            running += *value;
            *value = running;
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[1.0, 4.0, 9.0, 16.0]), vec![3.0, 5.0, 7.0]);
        assert!(first_difference(&[1.0]).is_empty());
    }

    #[test]
    fn test_difference_levels_keeps_every_level() {
        let levels = difference_levels(&[1.0, 4.0, 9.0, 16.0], 2).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1], vec![3.0, 5.0, 7.0]);
        assert_eq!(levels[2], vec![2.0, 2.0]);
    }

    #[test]
    fn test_difference_exhausts_short_series() {
        assert!(difference(&[1.0, 2.0], 2).is_none());
        assert_eq!(difference(&[1.0, 2.0], 1), Some(vec![1.0]));
        assert_eq!(difference(&[5.0], 0), Some(vec![5.0]));
    }

    #[test]
    fn test_integrate_from_heads_reconstructs() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        for d in 0..data.len() {
            let levels = difference_levels(&data, d).unwrap();
            let heads: Vec<f64> = levels[..d].iter().map(|l| l[0]).collect();
            let restored = integrate_from_heads(&levels[d], &heads);

            assert_eq!(restored.len(), data.len());
            for (a, b) in restored.iter().zip(data.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_integrate_from_tails_continues_linear_trend() {
        // 2, 4, 6, 8 differenced once is constant 2
        let tails = [8.0];
        let continued = integrate_from_tails(&[2.0, 2.0, 2.0], &tails);
        assert_eq!(continued, vec![10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_integrate_from_tails_second_order() {
        // Squares: 1, 4, 9, 16 -> first diff 3, 5, 7 -> second diff 2, 2
        let levels = difference_levels(&[1.0, 4.0, 9.0, 16.0], 2).unwrap();
        let tails: Vec<f64> = levels[..2].iter().map(|l| l[l.len() - 1]).collect();
        let continued = integrate_from_tails(&[2.0, 2.0], &tails);
        assert_eq!(continued, vec![25.0, 36.0]);
    }
}
