pub mod add;
pub mod mul;
pub mod mul_scalar;
pub mod neg;
pub mod sub;

pub use add::{add_op, AddFunction};
pub use mul::{mul_op, MulFunction};
pub use mul_scalar::{mul_scalar_op, MulScalarFunction};
pub use neg::{neg_op, NegFunction};
pub use sub::{sub_op, SubFunction};
