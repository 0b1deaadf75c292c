//! Batch planner — splits an ordered recipient list into bounded chunks.
//!
//! Planning is pure and reproducible: the same input list always yields the
//! same batches, so a caller can re-derive the plan to inspect or re-drive a
//! single batch without the engine holding state.

/// Default maximum recipients per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One ordered slice of a dispatch job's recipient list.
///
/// Generic over the recipient representation: the service plans over
/// directory records, the engine over channel-projected gateway recipients.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    /// 1-based position within the plan, for "Batch i of N" reporting.
    pub index: usize,
    pub recipients: Vec<T>,
}

/// Split `recipients` into batches of at most `batch_size`, preserving input
/// order. Batch count is ceil(len / batch_size); the last batch may be short.
/// A zero `batch_size` is treated as 1 rather than panicking.
pub fn plan<T: Clone>(recipients: &[T], batch_size: usize) -> Vec<Batch<T>> {
    let size = batch_size.max(1);
    recipients
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            recipients: chunk.to_vec(),
        })
        .collect()
}
