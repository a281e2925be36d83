//! Shared primitive types used across the entire engine.

/// A logical slot index within one corpus, in `[0, total)`.
/// The unit of determinism and pagination.
pub type Position = usize;

/// One inbound request. The unit by which simulated time and
/// pending-response delays advance.
pub type Tick = u64;

/// Simulated incident minutes.
pub type Minutes = u64;
