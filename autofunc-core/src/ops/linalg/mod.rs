pub mod matmul;
pub mod transpose;

pub use matmul::{matmul_op, MatmulFunction};
pub use transpose::{transpose_op, TransposeFunction};
