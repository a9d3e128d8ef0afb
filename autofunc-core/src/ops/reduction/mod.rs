pub mod expand;
pub mod sum;
pub mod sum_to;

pub use expand::{expand_op, ExpandFunction};
pub use sum::{sum_op, SumFunction};
pub use sum_to::{sum_to_op, SumToFunction};
