//! Partition deliverable items into bounded groups for transports with a
//! per-call item limit.

/// Default number of items per delivery call.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Hard upper bound accepted by media-group style transports.
pub const MAX_BATCH_SIZE: usize = 10;

/// Splits `items` into contiguous, in-order batches of at most `capacity`.
///
/// A `capacity` of 0, or one at least as large as the input, yields a single
/// batch. Empty input yields no batches.
pub fn split<T>(items: &[T], capacity: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    if capacity == 0 || capacity >= items.len() {
        return vec![items];
    }
    items.chunks(capacity).collect()
}

/// Clamp a configured batch size into the transport's accepted range.
/// Zero means "use the default".
pub fn effective_batch_size(configured: usize) -> usize {
    match configured {
        0 => DEFAULT_BATCH_SIZE,
        n => n.min(MAX_BATCH_SIZE),
    }
}
