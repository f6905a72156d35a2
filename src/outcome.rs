//! What a work unit's future may resolve to.

use std::fmt::Display;

/// Conversion from a work unit's output into "succeeded" or "failed with a message".
///
/// Implemented for `()` (never fails) and for any `Result<T, E>` whose error
/// implements [`Display`], so plain `async {}` blocks and fallible `async` blocks
/// both work as work units.
///
/// # Examples
///
/// ```
/// use concurrent_timer::WorkOutcome;
///
/// assert_eq!(().failure(), None);
/// assert_eq!(Ok::<u8, String>(1).failure(), None);
/// assert_eq!(Err::<(), _>("disk full").failure(), Some("disk full".to_string()));
/// ```
pub trait WorkOutcome {
    /// `None` on success, otherwise a description of the failure
    fn failure(self) -> Option<String>;
}

impl WorkOutcome for () {
    fn failure(self) -> Option<String> {
        None
    }
}

impl<T, E: Display> WorkOutcome for Result<T, E> {
    fn failure(self) -> Option<String> {
        self.err().map(|e| e.to_string())
    }
}
