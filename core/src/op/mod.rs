mod ops;


pub use ops::{ArithOp, CompareOp};
pub(crate) use ops::{err_arith, err_compare};
