use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

const DEFAULT_SHARDS: usize = 16;

/// Concurrent word → occurrence count table.
///
/// Words are partitioned across independently locked shards by the high bits
/// of their hash, so workers touching different words rarely contend.
pub struct WordFrequencyTable {
    shards: Vec<Mutex<FxHashMap<String, u64>>>,
    shard_shift: u32,
}

impl WordFrequencyTable {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// `shards` is rounded up to a power of two.
    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1).next_power_of_two();
        let shard_shift = if shards == 1 { 0 } else { 64 - shards.trailing_zeros() };
        WordFrequencyTable {
            shards: (0..shards).map(|_| Mutex::new(FxHashMap::default())).collect(),
            shard_shift,
        }
    }

    fn shard_for(&self, word: &str) -> &Mutex<FxHashMap<String, u64>> {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        let mut hasher = FxHasher::default();
        word.hash(&mut hasher);
        &self.shards[(hasher.finish() >> self.shard_shift) as usize]
    }

    pub fn increment(&self, word: &str) {
        let mut shard = self.shard_for(word).lock();
        match shard.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                shard.insert(word.to_owned(), 1);
            }
        }
    }

    pub fn count(&self, word: &str) -> u64 {
        self.shard_for(word).lock().get(word).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().values().sum::<u64>()).sum()
    }

    pub fn distinct(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct() == 0
    }

    /// Copy of every entry, in no particular order.
    pub fn snapshot(&self) -> FxHashMap<String, u64> {
        let mut all = FxHashMap::default();
        for shard in &self.shards {
            all.extend(shard.lock().iter().map(|(w, c)| (w.clone(), *c)));
        }
        all
    }
}

impl Default for WordFrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}
