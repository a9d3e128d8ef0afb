use crate::autograd::is_grad_enabled;
use crate::error::AutofuncError;
use crate::ops::check_float;
use crate::tensor::utils::{
    broadcast_shapes, broadcast_source_index, calculate_strides, index_to_coord,
};
use crate::tensor::Tensor;

impl Tensor {
    /// In-place ops are not recorded. Differentiating through one goes through a
    /// function that marks its input dirty.
    fn check_inplace_allowed(&self, operation: &str) -> Result<(), AutofuncError> {
        if is_grad_enabled() && self.requires_grad() {
            return Err(AutofuncError::InplaceOnTrackedTensor {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Applies `f` to every element in place and bumps the version counter.
    fn apply_inplace<F>(&self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        let dtype = self.dtype();
        let storage = self.storage();
        let mut guard = storage.write().expect("RwLock poisoned");
        guard.write_with(|values| {
            for value in values.iter_mut() {
                *value = dtype.round(f(*value));
            }
        });
    }

    /// Multiplies every element by `scalar` in place.
    pub fn mul_scalar_(&self, scalar: f64) -> Result<(), AutofuncError> {
        self.check_inplace_allowed("mul_scalar_")?;
        check_float(self, "mul_scalar_")?;
        self.apply_inplace(|v| v * scalar);
        Ok(())
    }

    /// Sets every element to `value` in place.
    pub fn fill_(&self, value: f64) -> Result<(), AutofuncError> {
        self.check_inplace_allowed("fill_")?;
        self.apply_inplace(|_| value);
        Ok(())
    }

    /// Adds `other` in place. `other` must broadcast to this tensor's shape.
    pub fn add_(&self, other: &Tensor) -> Result<(), AutofuncError> {
        self.check_inplace_allowed("add_")?;
        check_float(self, "add_")?;
        check_float(other, "add_")?;
        let shape = self.shape();
        let other_shape = other.shape();
        if broadcast_shapes(&shape, &other_shape)? != shape {
            return Err(AutofuncError::BroadcastError {
                shape1: shape,
                shape2: other_shape,
            });
        }
        // Read first: `other` may share this tensor's storage.
        let other_values = other.to_vec_f64();
        let strides = calculate_strides(&shape);
        let other_strides = calculate_strides(&other_shape);
        let dtype = self.dtype();

        let storage = self.storage();
        let mut guard = storage.write().expect("RwLock poisoned");
        guard.write_with(|values| {
            for (i, value) in values.iter_mut().enumerate() {
                let coord = index_to_coord(i, &strides, &shape);
                let source = broadcast_source_index(&coord, &other_shape, &other_strides);
                *value = dtype.round(*value + other_values[source]);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "inplace_methods_test.rs"]
mod tests;
