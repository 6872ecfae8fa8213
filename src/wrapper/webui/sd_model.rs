//! modules.shared.sd_model 文本编码

use candle_core::{Device, Tensor};
use log::error;
use pyo3::{types::PyAnyMethods, Python};

use crate::{core::encoder::TextEncoder, error::Error, wrapper::webui::read_conditioning};

/// 使用当前加载的 sd_model 编码提示词
///
/// 每次调用时重新获取 `shared.sd_model`, 切换模型后不会使用旧模型
#[derive(Debug, Default, Clone, Copy)]
pub struct SdModelEncoder;

impl SdModelEncoder {
    fn encode_with_gil(py: Python<'_>, prompts: &[&str]) -> Result<Tensor, Error> {
        let sd_model = py.import("modules.shared")?.getattr("sd_model")?;
        if sd_model.is_none() {
            return Err(Error::Encoder("shared.sd_model is not loaded".to_string()));
        }

        let cond = sd_model.call_method1("get_learned_conditioning", (prompts.to_vec(),))?;
        read_conditioning(&cond, &Device::Cpu)
    }
}

impl TextEncoder for SdModelEncoder {
    fn encode(&self, prompts: &[&str]) -> Result<Tensor, Error> {
        Python::with_gil(|py| Self::encode_with_gil(py, prompts)).map_err(|e| {
            error!("get_learned_conditioning failed, {e}");
            match e {
                Error::Encoder(_) => e,
                e => Error::Encoder(e.to_string()),
            }
        })
    }
}
