/// Default debounce window for invalidation sweeps, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Initial delay before re-establishing a dropped change subscription, in
/// seconds. Also the floor: the manager never retries more than once per
/// second.
pub const RESUBSCRIBE_MIN_BACKOFF_SECS: u64 = 1;

/// Cap on the resubscribe backoff, in seconds. The manager never gives up;
/// it keeps retrying at this cadence.
pub const RESUBSCRIBE_MAX_BACKOFF_SECS: u64 = 30;
