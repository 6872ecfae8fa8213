// python 包装
pub mod python;
pub mod torch;
pub mod webui;
