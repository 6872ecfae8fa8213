//! 工具

pub mod log;
