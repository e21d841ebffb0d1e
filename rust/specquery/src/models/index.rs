use crate::features::Fingerprint;
use crate::models::spectrum::SpectrumId;
use nohash_hasher::BuildNoHashHasher;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;

/// Votes granted to every member of the matching fingerprint bucket.
const FINGERPRINT_VOTES: u32 = 10;

/// Half-width of the peak-list window inspected around the dominant
/// peak's insertion point. Offsets run from `-PEAK_WINDOW` to
/// `PEAK_WINDOW - 1` and contribute `PEAK_WINDOW - |offset|` votes.
const PEAK_WINDOW: isize = 5;

/// One `(position, id)` entry of the sorted peak list. A spectrum owns
/// one entry per detected peak, so the same id shows up many times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakEntry {
    pub position: f64,
    pub id: SpectrumId,
}

/// Approximate-retrieval structure for one spectrum category.
///
/// Two views over the same population: a fingerprint -> ids bucket map
/// for the coarse multi-scale signature, and a peak list sorted
/// ascending by domain position at all times. `query` combines both
/// through voting; neither view is authoritative for scoring, callers
/// re-fetch real intensity vectors afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityIndex {
    buckets: HashMap<Fingerprint, Vec<SpectrumId>, BuildNoHashHasher<Fingerprint>>,
    peak_list: Vec<PeakEntry>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spectra tracked by the bucket map.
    pub fn len(&self) -> usize {
        let mut ids: Vec<SpectrumId> = self.buckets.values().flatten().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.peak_list.is_empty()
    }

    pub fn buckets(&self) -> &HashMap<Fingerprint, Vec<SpectrumId>, BuildNoHashHasher<Fingerprint>> {
        &self.buckets
    }

    pub fn peak_list(&self) -> &[PeakEntry] {
        &self.peak_list
    }

    /// Registers `id` under every fingerprint in `fingerprints` and one
    /// peak-list entry per peak position.
    ///
    /// Strict mode passes a single fingerprint; the fuzzy mode passes
    /// the whole candidate set so borderline spectra land in every
    /// bucket they could hash to.
    pub fn insert(&mut self, id: SpectrumId, fingerprints: &[Fingerprint], peaks: &[f64]) {
        for fp in fingerprints {
            let bucket = self.buckets.entry(*fp).or_default();
            if !bucket.contains(&id) {
                bucket.push(id);
            }
        }
        for position in peaks.iter().copied() {
            let at = self
                .peak_list
                .partition_point(|entry| entry.position < position);
            self.peak_list.insert(at, PeakEntry { position, id });
        }
    }

    /// Removes every trace of `id` from the buckets named by
    /// `fingerprints` and from the peak list. Empty buckets are dropped
    /// so stale fingerprints do not accumulate.
    pub fn remove(&mut self, id: SpectrumId, fingerprints: &[Fingerprint]) {
        for fp in fingerprints {
            if let Some(bucket) = self.buckets.get_mut(fp) {
                bucket.retain(|other| *other != id);
                if bucket.is_empty() {
                    self.buckets.remove(fp);
                }
            }
        }
        self.peak_list.retain(|entry| entry.id != id);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.peak_list.clear();
    }

    /// The voting shortlist.
    ///
    /// Every id in any of the queried fingerprint buckets gets
    /// [`FINGERPRINT_VOTES`]; ids near the dominant peak's insertion
    /// point in the peak list get `5 - |offset|` votes per slot over a
    /// ten-slot window. Returns at most `limit` ids ordered by
    /// descending total votes (ties broken by id, so results are
    /// deterministic).
    pub fn query(
        &self,
        fingerprints: &[Fingerprint],
        dominant_peak: f64,
        limit: usize,
    ) -> Vec<(SpectrumId, u32)> {
        let mut votes: HashMap<SpectrumId, u32, BuildNoHashHasher<SpectrumId>> =
            HashMap::default();

        // Union first so a spectrum that landed in several fuzzy buckets
        // is not rewarded for it.
        let mut bucket_hits: Vec<SpectrumId> = fingerprints
            .iter()
            .filter_map(|fp| self.buckets.get(fp))
            .flatten()
            .copied()
            .collect();
        bucket_hits.sort_unstable();
        bucket_hits.dedup();
        for id in bucket_hits {
            *votes.entry(id).or_insert(0) += FINGERPRINT_VOTES;
        }

        let pivot = self
            .peak_list
            .partition_point(|entry| entry.position < dominant_peak) as isize;
        for offset in -PEAK_WINDOW..PEAK_WINDOW {
            let slot = pivot + offset;
            if slot < 0 || slot >= self.peak_list.len() as isize {
                continue;
            }
            let weight = (PEAK_WINDOW - offset.abs()) as u32;
            if weight == 0 {
                continue;
            }
            let entry = &self.peak_list[slot as usize];
            *votes.entry(entry.id).or_insert(0) += weight;
        }

        let mut ranked: Vec<(SpectrumId, u32)> = votes.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Consistency check: the peak list owns no entry for an id that is
    /// absent from every bucket, and no bucket is empty.
    pub fn verify(&self) -> bool {
        if self.buckets.values().any(|bucket| bucket.is_empty()) {
            return false;
        }
        for pair in self.peak_list.windows(2) {
            if pair[0].position > pair[1].position {
                return false;
            }
        }
        self.peak_list.iter().all(|entry| {
            self.buckets
                .values()
                .any(|bucket| bucket.contains(&entry.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(x: u64) -> SpectrumId {
        SpectrumId(x)
    }

    #[test]
    fn test_insert_remove_no_orphans() {
        let mut index = SimilarityIndex::new();
        index.insert(id(1), &[0b1010_0001], &[710.0, 1500.0, 2200.0]);
        index.insert(id(2), &[0b1010_0001], &[711.0]);
        assert!(index.verify());
        assert_eq!(index.peak_list().len(), 4);

        index.remove(id(1), &[0b1010_0001]);
        assert!(index.verify());
        assert_eq!(index.peak_list().len(), 1);
        assert_eq!(index.buckets().get(&0b1010_0001).unwrap(), &vec![id(2)]);

        index.remove(id(2), &[0b1010_0001]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_peak_list_stays_sorted() {
        let mut index = SimilarityIndex::new();
        index.insert(id(1), &[3], &[2000.0, 800.0]);
        index.insert(id(2), &[4], &[1500.0]);
        index.insert(id(3), &[5], &[799.0, 2100.0]);
        let positions: Vec<f64> = index.peak_list().iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![799.0, 800.0, 1500.0, 2000.0, 2100.0]);
    }

    #[test]
    fn test_fingerprint_match_outranks_peak_only_neighbor() {
        let mut index = SimilarityIndex::new();
        // Same bucket as the query.
        index.insert(id(1), &[42], &[1000.0]);
        // Only nearby in peak space.
        index.insert(id(2), &[77], &[1001.0]);

        let ranked = index.query(&[42], 1000.0, 10);
        assert_eq!(ranked[0].0, id(1));
        assert!(ranked[0].1 > ranked.iter().find(|r| r.0 == id(2)).unwrap().1);
    }

    #[test]
    fn test_query_respects_limit() {
        let mut index = SimilarityIndex::new();
        for i in 0..50 {
            index.insert(id(i), &[9], &[1000.0 + i as f64]);
        }
        let ranked = index.query(&[9], 1000.0, 10);
        assert_eq!(ranked.len(), 10);
    }

    #[test]
    fn test_query_votes_accumulate_across_sources() {
        let mut index = SimilarityIndex::new();
        index.insert(id(1), &[8], &[1200.0]);
        let ranked = index.query(&[8], 1200.0, 10);
        // Bucket hit (10) plus the offset-0 slot of the peak window (5).
        assert_eq!(ranked, vec![(id(1), 15)]);
    }

    #[test]
    fn test_query_empty_index() {
        let index = SimilarityIndex::new();
        assert!(index.query(&[0], 1000.0, 10).is_empty());
    }

    #[test]
    fn test_index_survives_serialization() {
        // The store persists the index as one serialized blob, so the
        // deserialized structure has to behave identically.
        let mut index = SimilarityIndex::new();
        index.insert(id(7), &[42], &[900.0, 1800.0]);
        index.insert(id(9), &[42, 43], &[901.0]);

        let blob = serde_json::to_vec(&index).unwrap();
        let back: SimilarityIndex = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back, index);
        assert_eq!(
            back.query(&[42], 900.0, 10),
            index.query(&[42], 900.0, 10)
        );
    }

    #[test]
    fn test_fuzzy_bucket_union_counts_once() {
        let mut index = SimilarityIndex::new();
        index.insert(id(1), &[10, 11], &[]);
        let ranked = index.query(&[10, 11], 0.0, 10);
        assert_eq!(ranked, vec![(id(1), 10)]);
    }
}
