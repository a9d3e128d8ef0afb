use crate::error::AutofuncError;

/// Calculates the strides for a contiguous tensor given its shape.
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    if shape.is_empty() {
        return strides;
    }
    strides[shape.len() - 1] = 1;
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1].max(1);
    }
    strides
}

/// Converts a linear index into coordinates for a contiguous shape.
pub fn index_to_coord(index: usize, strides: &[usize], shape: &[usize]) -> Vec<usize> {
    let mut coord = vec![0; shape.len()];
    let mut remainder = index;
    for (dim, &stride) in strides.iter().enumerate() {
        if stride == 0 {
            continue;
        }
        coord[dim] = remainder / stride;
        remainder %= stride;
    }
    coord
}

/// Computes the broadcast shape of two shapes, numpy style (right-aligned, size-1 dims stretch).
pub fn broadcast_shapes(shape1: &[usize], shape2: &[usize]) -> Result<Vec<usize>, AutofuncError> {
    let rank = shape1.len().max(shape2.len());
    let mut result = vec![0; rank];
    for i in 0..rank {
        let d1 = if i < rank - shape1.len() { 1 } else { shape1[i - (rank - shape1.len())] };
        let d2 = if i < rank - shape2.len() { 1 } else { shape2[i - (rank - shape2.len())] };
        result[i] = match (d1, d2) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(AutofuncError::BroadcastError {
                    shape1: shape1.to_vec(),
                    shape2: shape2.to_vec(),
                })
            }
        };
    }
    Ok(result)
}

/// Maps coordinates in a broadcast output shape to the linear index of an input whose
/// shape broadcasts to it.
pub fn broadcast_source_index(out_coord: &[usize], in_shape: &[usize], in_strides: &[usize]) -> usize {
    let rank_diff = out_coord.len() - in_shape.len();
    in_shape
        .iter()
        .zip(in_strides)
        .enumerate()
        .map(|(dim, (&size, &stride))| {
            if size == 1 {
                0
            } else {
                out_coord[rank_diff + dim] * stride
            }
        })
        .sum()
}

#[cfg(test)]
#[path = "utils_test.rs"]
mod tests;
