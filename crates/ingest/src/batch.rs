//! Per-channel batch accumulator
//!
//! Hand-off is a mutex-guarded `mem::take`, so a snapshot leaves the
//! accumulator atomically with the reset: each appended record lands in
//! exactly one flushed batch, in arrival order, even while a previous
//! flush is still being written.

use std::mem;
use std::sync::Mutex;

use satlink_wire::TelemetryRecord;

/// Accumulates decoded records for one channel between flushes
pub struct Batcher {
    max_records: usize,
    buf: Mutex<Vec<TelemetryRecord>>,
}

impl Batcher {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            buf: Mutex::new(Vec::with_capacity(max_records)),
        }
    }

    /// Append one record. Returns the full batch snapshot when this
    /// append reaches the size threshold, leaving the accumulator empty.
    pub fn append(&self, record: TelemetryRecord) -> Option<Vec<TelemetryRecord>> {
        let mut buf = self.buf.lock().unwrap();
        buf.push(record);
        if buf.len() >= self.max_records {
            Some(mem::take(&mut *buf))
        } else {
            None
        }
    }

    /// Take whatever has accumulated (timer and shutdown path).
    /// `None` when the batch is empty: an empty batch never flushes.
    pub fn take(&self) -> Option<Vec<TelemetryRecord>> {
        let mut buf = self.buf.lock().unwrap();
        if buf.is_empty() {
            None
        } else {
            Some(mem::take(&mut *buf))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(satellite_id: u32) -> TelemetryRecord {
        TelemetryRecord {
            satellite_id,
            temperature: 21.5,
            battery_voltage: 87.25,
            altitude: 312.0,
        }
    }

    #[test]
    fn test_append_below_threshold_accumulates() {
        let batcher = Batcher::new(3);
        assert!(batcher.append(record(1)).is_none());
        assert!(batcher.append(record(2)).is_none());
        assert!(!batcher.is_empty());
    }

    #[test]
    fn test_append_at_threshold_flushes_and_resets() {
        let batcher = Batcher::new(3);
        batcher.append(record(1));
        batcher.append(record(2));
        let batch = batcher.append(record(3)).unwrap();
        assert_eq!(
            batch.iter().map(|r| r.satellite_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_take_empty_is_noop() {
        let batcher = Batcher::new(3);
        assert!(batcher.take().is_none());
    }

    #[test]
    fn test_take_partial_batch() {
        let batcher = Batcher::new(10);
        batcher.append(record(7));
        batcher.append(record(8));
        let batch = batcher.take().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batcher.take().is_none());
    }

    #[test]
    fn test_completeness_across_mixed_triggers() {
        // Union of all flushed batches must equal the appended sequence,
        // in order, no duplicates, no omissions.
        let batcher = Batcher::new(4);
        let mut flushed = Vec::new();
        for id in 0..10 {
            if let Some(batch) = batcher.append(record(id)) {
                flushed.extend(batch);
            }
            // Simulate a timer firing mid-stream
            if id == 5 {
                if let Some(batch) = batcher.take() {
                    flushed.extend(batch);
                }
            }
        }
        if let Some(batch) = batcher.take() {
            flushed.extend(batch);
        }
        assert_eq!(
            flushed.iter().map(|r| r.satellite_id).collect::<Vec<_>>(),
            (0..10).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_concurrent_appends_never_lose_records() {
        use std::sync::Arc;

        let batcher = Arc::new(Batcher::new(7));
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let batcher = Arc::clone(&batcher);
            handles.push(std::thread::spawn(move || {
                let mut flushed = Vec::new();
                for i in 0..100u32 {
                    if let Some(batch) = batcher.append(record(t * 1000 + i)) {
                        flushed.extend(batch);
                    }
                }
                flushed
            }));
        }

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|r| r.satellite_id)
            .collect();
        if let Some(batch) = batcher.take() {
            all.extend(batch.iter().map(|r| r.satellite_id));
        }

        all.sort_unstable();
        let mut expected: Vec<u32> = (0..4u32)
            .flat_map(|t| (0..100u32).map(move |i| t * 1000 + i))
            .collect();
        expected.sort_unstable();
        assert_eq!(all, expected);
    }
}
