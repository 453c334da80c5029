use crate::fXX;

/// One-dimensional piecewise-linear interpolation of `ys(xs)` at `query`.
///
/// `xs` must be non-decreasing, this is not checked. Queries outside of the range of `xs`
/// return the first or last value of `ys` respectively (flat extrapolation). If multiple
/// entries of `xs` are equal to `query`, the value belonging to the last one is returned.
///
/// Returns `None` if `xs` is empty or if `xs` and `ys` differ in length.
///
/// ```
/// # use glider_align::align::interp;
/// let xs = [1.0, 3.0, 4.0];
/// let ys = [100.0, 300.0, 400.0];
///
/// assert_eq!(interp(0.0, &xs, &ys), Some(100.0));
/// assert_eq!(interp(2.0, &xs, &ys), Some(200.0));
/// assert_eq!(interp(9.0, &xs, &ys), Some(400.0));
/// ```
pub fn interp<T>(query: T, xs: &[T], ys: &[T]) -> Option<T>
where
    T: fXX,
{
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }

    Some(interp_unchecked(query, xs, ys))
}

/// Same as [`interp`], evaluated for every entry of `queries`.
pub fn interp_many<T>(queries: &[T], xs: &[T], ys: &[T]) -> Option<Vec<T>>
where
    T: fXX,
{
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }

    Some(
        queries
            .iter()
            .map(|query| interp_unchecked(*query, xs, ys))
            .collect(),
    )
}

/// Assumes `xs` is non-empty and of equal length to `ys`.
fn interp_unchecked<T>(query: T, xs: &[T], ys: &[T]) -> T
where
    T: fXX,
{
    if query.is_nan() {
        return query;
    }

    // Index of the first knot strictly to the right of the query.
    let jdx = xs.partition_point(|x| *x <= query);

    if jdx == 0 {
        return ys[0];
    } else if jdx == xs.len() {
        return ys[xs.len() - 1];
    }

    let (x0, x1) = (xs[jdx - 1], xs[jdx]);
    let (y0, y1) = (ys[jdx - 1], ys[jdx]);

    if x0 == query {
        y0
    } else {
        y0 + (y1 - y0) * (query - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::ulps_eq;

    #[test]
    fn test_interp() {
        let xs = [1.0, 3.0, 4.0];
        let ys = [100.0, 300.0, 400.0];

        assert!(interp(-5.0, &xs, &ys) == Some(100.0));
        assert!(interp(1.0, &xs, &ys) == Some(100.0));
        assert!(interp(3.0, &xs, &ys) == Some(300.0));
        assert!(interp(4.0, &xs, &ys) == Some(400.0));
        assert!(interp(5.0, &xs, &ys) == Some(400.0));
        assert!(ulps_eq!(interp(3.25, &xs, &ys).unwrap(), 325.0));

        assert!(interp(f64::NAN, &xs, &ys).unwrap().is_nan());
        assert!(interp(1.0, &[], &[]).is_none());
        assert!(interp(1.0, &xs, &ys[..2]).is_none());
    }

    #[test]
    fn test_interp_linearity() {
        let (t0, t1, v0, v1) = (10.0f32, 14.0, -3.5, 8.25);

        for t in [10.5f32, 11.0, 12.75, 13.9] {
            assert!(interp(t, &[t0, t1], &[v0, v1]) == Some(v0 + (v1 - v0) * (t - t0) / (t1 - t0)));
        }
    }

    #[test]
    fn test_interp_duplicates() {
        let xs = [0.0, 1.0, 1.0, 2.0];
        let ys = [0.0, 5.0, 7.0, 9.0];

        assert!(interp(1.0, &xs, &ys) == Some(7.0));
        assert!(interp(1.5, &xs, &ys) == Some(8.0));
        assert!(interp(0.5, &xs, &ys) == Some(2.5));

        assert!(
            interp_many(&[-1.0, 0.5, 1.5, 3.0], &xs, &ys).unwrap() == vec![0.0, 2.5, 8.0, 9.0]
        );
        assert!(interp_many(&[0.0], &[], &[]).is_none());
    }
}
