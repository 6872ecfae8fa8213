//! python 包装

mod py_isinstance;
pub use py_isinstance::{is_torch_tensor, isinstance};
