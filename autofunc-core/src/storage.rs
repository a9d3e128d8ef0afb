use std::sync::{Arc, RwLock};

/// Element buffer shared by a tensor and every alias of it (detached copies,
/// saved outputs, rebased dirty inputs).
///
/// `version` is bumped by every in-place write. Saved tensors record it so that a
/// later mismatch can be reported instead of silently producing wrong gradients.
#[derive(Debug)]
pub(crate) struct Storage {
    pub(crate) values: Vec<f64>,
    pub(crate) version: u64,
}

pub(crate) type SharedStorage = Arc<RwLock<Storage>>;

impl Storage {
    pub(crate) fn shared(values: Vec<f64>) -> SharedStorage {
        Arc::new(RwLock::new(Storage { values, version: 0 }))
    }

    /// Applies `f` to the buffer and records the write.
    pub(crate) fn write_with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut [f64]),
    {
        f(&mut self.values);
        self.version += 1;
    }
}
