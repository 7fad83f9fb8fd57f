//! Optional data parallelism.
//!
//! With the `parallel` feature, per-item work fans out over rayon's thread
//! pool; without it (e.g. WASM builds) the same calls run sequentially.
//! Either way results come back in index order, so callers see identical
//! output.

/// Evaluate `f(0), f(1), .., f(n - 1)` and collect the results in index order.
#[cfg(feature = "parallel")]
pub(crate) fn map_indexed<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;
    (0..n).into_par_iter().map(f).collect()
}

/// Evaluate `f(0), f(1), .., f(n - 1)` and collect the results in index order.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indexed<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..n).map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_indexed_preserves_order() {
        let squares = map_indexed(1000, |i| i * i);
        assert_eq!(squares.len(), 1000);
        assert!(squares.iter().enumerate().all(|(i, &v)| v == i * i));
    }
}
