//! stable-diffusion-webui 宿主接口
//!
//! 相关定义: modules/script_callbacks.py, modules/shared.py

mod conditioning;
mod script_callbacks;
mod sd_model;

pub use conditioning::{read_conditioning, write_conditioning, CROSSATTN_KEY};
pub use script_callbacks::{on_cfg_denoiser, remove_current_script_callbacks};
pub use sd_model::SdModelEncoder;
