//! Randomized, page-through pool of catalog entries

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::Hit;
use crate::track::Track;

/// Shuffled buffer of raw hits paged out in fixed-size batches
///
/// The pool is replaced, never appended, when the cursor reaches its end. The
/// cursor only grows between refills.
pub struct ShufflePool<R: Rng = StdRng> {
    pool: Vec<Hit>,
    cursor: usize,
    rng: R,
}

impl ShufflePool<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for ShufflePool<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ShufflePool<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            pool: Vec::new(),
            cursor: 0,
            rng,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// True when the next page needs a refill
    pub fn is_exhausted(&self) -> bool {
        self.pool.is_empty() || self.cursor >= self.pool.len()
    }

    /// Replace the pool with a shuffled copy of `hits` and rewind
    fn refill(&mut self, mut hits: Vec<Hit>) {
        hits.shuffle(&mut self.rng);
        self.pool = hits;
        self.cursor = 0;
    }

    /// Take the next page of raw hits, advancing the cursor by a full page
    ///
    /// Pages hold at least one hit.
    fn take_page(&mut self, page_size: usize) -> Vec<Hit> {
        let page_size = page_size.max(1);
        let start = self.cursor.min(self.pool.len());
        let end = (start + page_size).min(self.pool.len());
        let page = self.pool[start..end].to_vec();
        self.cursor += page_size;
        page
    }
}

impl<R: Rng + Send> ShufflePool<R> {
    /// Next page of normalized tracks, refilling from the catalog if needed
    ///
    /// A failed refill leaves the pool and cursor as they were.
    pub async fn next_page(&mut self, catalog: &Catalog) -> Result<Vec<Track>> {
        if self.is_exhausted() {
            let hits = catalog.shuffle_candidates().await?;
            debug!("Refilling shuffle pool with {} candidates", hits.len());
            self.refill(hits);
        }

        let page = self.take_page(catalog.settings().shuffle_page_size);
        Ok(catalog.normalize(&page).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(n: usize) -> Vec<Hit> {
        (0..n)
            .map(|i| Hit {
                id: Some(format!("h{i}")),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_pages_are_disjoint_until_exhausted() {
        let mut pool = ShufflePool::with_rng(StdRng::seed_from_u64(42));
        pool.refill(hits(10));
        assert_eq!(pool.cursor(), 0);

        let mut seen = Vec::new();
        for expected_cursor in [3, 6, 9, 12] {
            assert!(!pool.is_exhausted());
            seen.extend(pool.take_page(3));
            assert_eq!(pool.cursor(), expected_cursor);
        }
        assert!(pool.is_exhausted());

        let mut ids: Vec<_> = seen.iter().filter_map(|h| h.id.clone()).collect();
        assert_eq!(ids.len(), 10);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_refill_is_a_permutation() {
        let mut pool = ShufflePool::with_rng(StdRng::seed_from_u64(1));
        pool.refill(hits(50));

        let mut ids: Vec<_> = pool.pool.iter().filter_map(|h| h.id.clone()).collect();
        ids.sort();
        let mut expected: Vec<_> = hits(50).into_iter().filter_map(|h| h.id).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let mut a = ShufflePool::with_rng(StdRng::seed_from_u64(9));
        let mut b = ShufflePool::with_rng(StdRng::seed_from_u64(9));
        a.refill(hits(20));
        b.refill(hits(20));
        assert_eq!(a.pool, b.pool);
    }

    #[test]
    fn test_empty_pool_is_exhausted() {
        let mut pool = ShufflePool::with_rng(StdRng::seed_from_u64(0));
        assert!(pool.is_exhausted());
        pool.refill(Vec::new());
        assert!(pool.is_exhausted());
        assert!(pool.take_page(3).is_empty());
    }

    #[test]
    fn test_zero_page_size_still_advances() {
        let mut pool = ShufflePool::with_rng(StdRng::seed_from_u64(3));
        pool.refill(hits(2));

        assert_eq!(pool.take_page(0).len(), 1);
        assert_eq!(pool.take_page(0).len(), 1);
        assert!(pool.is_exhausted());
    }
}
