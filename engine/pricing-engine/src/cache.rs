//! Memoized price solving.
//!
//! Results are keyed by a content hash of the whole request. The stored
//! request is compared on every hit, so a hash collision only costs a
//! recomputation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::calculator::PriceSolver;
use crate::error::Result;
use crate::models::{PricingRequest, PricingResult};

/// Content hash of a pricing request
pub fn request_key(request: &PricingRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.hash(&mut hasher);
    hasher.finish()
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe memoizing wrapper around a [`PriceSolver`]
pub struct PricingCache {
    solver: PriceSolver,
    entries: DashMap<u64, (PricingRequest, PricingResult)>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PricingCache {
    pub fn new(solver: PriceSolver) -> Self {
        Self {
            solver,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn solver(&self) -> &PriceSolver {
        &self.solver
    }

    /// Solve, reusing an earlier result for an identical request.
    ///
    /// Validation errors are not cached.
    pub fn solve(&self, request: &PricingRequest) -> Result<PricingResult> {
        let cache = &self.solver.config().cache;
        if !cache.enabled {
            return self.solver.solve(request);
        }

        let key = request_key(request);
        if let Some(entry) = self.entries.get(&key) {
            let (cached_request, cached_result) = entry.value();
            if cached_request == request {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached_result.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = self.solver.solve(request)?;

        if self.entries.len() >= cache.max_entries {
            debug!("Pricing cache full ({} entries), clearing", self.entries.len());
            self.entries.clear();
        }
        self.entries.insert(key, (request.clone(), result.clone()));

        Ok(result)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
