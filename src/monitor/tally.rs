use ahash::AHashMap;
use parking_lot::Mutex;

/// Per-type contention counts shared by every contending thread.
///
/// Entries are never removed. The lock covers only the read-modify-write of a
/// single entry; callers must resolve the type name before calling in.
#[derive(Debug, Default)]
pub struct ContentionTally {
    counts: Mutex<AHashMap<String, u64>>,
}

impl ContentionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the count for `type_name` and return the new value
    pub fn record_contention(&self, type_name: &str) -> u64 {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(type_name) {
            *count += 1;
            return *count;
        }
        counts.insert(type_name.to_owned(), 1);
        1
    }

    pub fn get(&self, type_name: &str) -> u64 {
        self.counts.lock().get(type_name).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }

    /// Counts ordered by descending count, ties broken by name
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<_> = {
            let counts = self.counts.lock();
            counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}
