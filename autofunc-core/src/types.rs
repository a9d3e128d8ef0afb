use num_traits::NumCast;

/// Defines the possible data types for Tensor elements.
///
/// Elements are always held as `f64` in storage; the dtype decides how values are
/// rounded after every kernel and whether the tensor may take part in differentiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 64-bit integer type.
    I64,
    /// Boolean type (true/false values).
    Bool,
}

impl DType {
    /// Whether tensors of this type can require gradients.
    pub fn is_floating_point(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Rounds a value to what this dtype can represent.
    pub fn round(&self, value: f64) -> f64 {
        match self {
            DType::F64 => value,
            DType::F32 => {
                <f32 as NumCast>::from(value).map_or(f64::NAN, <f64 as From<f32>>::from)
            }
            DType::I64 => <i64 as NumCast>::from(value.trunc()).map_or(f64::NAN, |v| v as f64),
            DType::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Result type of a binary floating point operation.
    pub(crate) fn promote(self, other: DType) -> DType {
        if self == DType::F64 || other == DType::F64 {
            DType::F64
        } else {
            DType::F32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_dtype() {
        assert_eq!(DType::F32.round(0.1), 0.1f32 as f64);
        assert_ne!(DType::F32.round(0.1), 0.1);
        assert_eq!(DType::F64.round(0.1), 0.1);
        assert_eq!(DType::I64.round(-2.7), -2.0);
        assert!(DType::I64.round(f64::NAN).is_nan());
        assert_eq!(DType::Bool.round(-3.0), 1.0);
        assert_eq!(DType::Bool.round(0.0), 0.0);
    }

    #[test]
    fn test_promote() {
        assert_eq!(DType::F32.promote(DType::F64), DType::F64);
        assert_eq!(DType::F32.promote(DType::F32), DType::F32);
    }
}
