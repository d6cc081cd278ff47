//! Scoped suppression of widget notifications.

use std::cell::Cell;

/// Flag that silences widget handlers while the view writes to the widget.
///
/// Only [`Suppression::enter`] raises it, and the returned guard lowers it
/// again when dropped, on every exit path.
#[derive(Debug, Default)]
pub struct Suppression {
    active: Cell<bool>,
}

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Suppress notifications until the guard is dropped.
    ///
    /// Nested guards restore the state they found.
    #[must_use = "suppression ends as soon as the guard is dropped"]
    pub fn enter(&self) -> SuppressionGuard<'_> {
        let previous = self.active.replace(true);
        SuppressionGuard {
            flag: &self.active,
            previous,
        }
    }
}

pub struct SuppressionGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let suppression = Suppression::new();
        {
            let _guard = suppression.enter();
            assert!(suppression.is_active());
        }
        assert!(!suppression.is_active());
    }

    #[test]
    fn test_nested_guards() {
        let suppression = Suppression::new();
        let outer = suppression.enter();
        {
            let _inner = suppression.enter();
        }
        assert!(suppression.is_active());
        drop(outer);
        assert!(!suppression.is_active());
    }

    #[test]
    fn test_guard_releases_on_error_path() {
        fn failing(suppression: &Suppression) -> Result<(), &'static str> {
            let _guard = suppression.enter();
            let write: Result<(), &'static str> = Err("widget detached");
            write?;
            Ok(())
        }

        let suppression = Suppression::new();
        assert!(failing(&suppression).is_err());
        assert!(!suppression.is_active());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let suppression = Suppression::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = suppression.enter();
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(!suppression.is_active());
    }
}
