// src/tensor/debug.rs
use crate::tensor::Tensor;
use std::fmt;

/// Elements shown before the preview is elided.
const PREVIEW_LEN: usize = 8;

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = match self.data.read() {
            Ok(guard) => guard,
            Err(_) => return write!(f, "Tensor(Error: RwLock poisoned)"),
        };
        let preview: Vec<f64> = match guard.storage.read() {
            Ok(storage) => storage.values.iter().take(PREVIEW_LEN).copied().collect(),
            Err(_) => return write!(f, "Tensor(Error: RwLock poisoned)"),
        };
        let elided = if guard.numel() > PREVIEW_LEN { ", ..." } else { "" };
        write!(
            f,
            "Tensor(shape={:?}, dtype={:?}, data={:?}{}, requires_grad={}, grad_fn={:?})",
            guard.shape,
            guard.dtype,
            preview,
            elided,
            guard.requires_grad,
            guard.grad_fn.as_ref().map(|node| node.name()),
        )
    }
}
