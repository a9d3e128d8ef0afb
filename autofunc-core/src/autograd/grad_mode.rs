use std::cell::Cell;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// RAII guard restoring the previous grad mode when dropped.
#[must_use = "grad mode is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GradModeGuard {
    prev: bool,
}

impl Drop for GradModeGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|c| c.set(self.prev));
    }
}

/// Whether functions applied on this thread record graph nodes.
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|c| c.get())
}

/// Sets grad mode until the returned guard goes out of scope.
pub fn set_grad_enabled(enabled: bool) -> GradModeGuard {
    let prev = GRAD_ENABLED.with(|c| c.replace(enabled));
    GradModeGuard { prev }
}

/// Disables graph recording, e.g. `let _guard = no_grad();`.
pub fn no_grad() -> GradModeGuard {
    set_grad_enabled(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_grad_restores_previous_mode() {
        assert!(is_grad_enabled());
        {
            let _guard = no_grad();
            assert!(!is_grad_enabled());
            {
                let _inner = set_grad_enabled(true);
                assert!(is_grad_enabled());
            }
            assert!(!is_grad_enabled());
        }
        assert!(is_grad_enabled());
    }
}
