use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::store::{RosterStore, StoreResult};

/// Expected capacity and false-positive rate.
/// Tune these based on real student counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
fn normalize(nisn: &str) -> String {
    nisn.trim().to_string()
}

/// NISN → owning student id.
///
/// Lookup order: cuckoo filter (fast negative), moka cache (fast positive),
/// then the roster store.
pub struct NisnIndex {
    filter: RwLock<CuckooFilter<String>>,
    owners: Cache<String, String>,
    /// Bumped by every `forget`.
    generation: AtomicU64,
    /// NISN → generation at which it was last forgotten.
    forgotten: Cache<String, u64>,
}

impl Default for NisnIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NisnIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            owners: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
            generation: AtomicU64::new(0),
            forgotten: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    /// Might this NISN already be taken (false positives possible)?
    pub fn might_exist(&self, nisn: &str) -> bool {
        let nisn = normalize(nisn);
        match self.filter.read() {
            Ok(filter) => filter.contains(&nisn),
            // a poisoned filter cannot rule anything out
            Err(_) => true,
        }
    }

    /// Id of the student holding `nisn`, if any.
    pub async fn owner_of(&self, nisn: &str, roster: &dyn RosterStore) -> StoreResult<Option<String>> {
        let nisn = normalize(nisn);

        if !self.might_exist(&nisn) {
            return Ok(None);
        }

        if let Some(owner) = self.owners.get(&nisn).await {
            return Ok(Some(owner));
        }

        let owner = roster.find_student_by_nisn(&nisn).await?.map(|s| s.id);
        if let Some(id) = &owner {
            self.owners.insert(nisn, id.clone()).await;
        }
        Ok(owner)
    }

    pub async fn record(&self, nisn: &str, student_id: &str) {
        let nisn = normalize(nisn);
        if let Ok(mut filter) = self.filter.write() {
            filter.add(&nisn);
        }
        self.owners.insert(nisn, student_id.to_string()).await;
    }

    pub async fn forget(&self, nisn: &str) {
        let nisn = normalize(nisn);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.forgotten.insert(nisn.clone(), generation).await;
        if let Ok(mut filter) = self.filter.write() {
            filter.remove(&nisn);
        }
        self.owners.invalidate(&nisn).await;
    }

    /// Loads every current student into the index. NISNs forgotten while
    /// the snapshot was in flight are skipped.
    pub async fn warmup(&self, roster: &dyn RosterStore) -> StoreResult<usize> {
        let started = self.generation.load(Ordering::SeqCst);
        let students = roster.list_students().await?;

        let mut fresh = Vec::with_capacity(students.len());
        for s in students {
            let nisn = normalize(&s.nisn);
            match self.forgotten.get(&nisn).await {
                Some(at) if at > started => {
                    tracing::debug!(nisn = %nisn, "Skipping NISN forgotten during warmup");
                }
                _ => fresh.push((nisn, s.id)),
            }
        }
        let total = fresh.len();

        if let Ok(mut filter) = self.filter.write() {
            for (nisn, _) in &fresh {
                filter.add(nisn);
            }
        }
        for (nisn, id) in fresh {
            self.owners.insert(nisn, id).await;
        }

        tracing::info!(total, "NISN index warmup complete");
        Ok(total)
    }
}
