/// Classification for retry policy.
///
/// Used by the gateway to decide whether a failed request is worth repeating
/// and by callers to decide whether a skipped item is likely to succeed later.
///
/// | Class | Retry now? | Skip item? |
/// |-------|-----------|------------|
/// | `Never` | No | Yes |
/// | `WithBackoff` | After waiting (Retry-After or next window) | Only once retries are exhausted |
/// | `Abort` | No | No, stop the surrounding loop |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The request is fundamentally invalid or the payload unusable.
    /// Retrying won't help.
    Never,

    /// Transient: quota exhausted, timeout, upstream 5xx.
    WithBackoff,

    /// The caller asked to stop. Never wrapped as a generic failure.
    Abort,
}
