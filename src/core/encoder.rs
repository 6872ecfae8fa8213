//! 文本编码服务
//!
//! 由宿主提供, 例如 webui 的 `shared.sd_model.get_learned_conditioning`

use candle_core::Tensor;

use crate::error::Error;

/// 将提示词编码为条件张量 (batch, sequence, channels)
pub trait TextEncoder {
    fn encode(&self, prompts: &[&str]) -> Result<Tensor, Error>;
}

impl<F> TextEncoder for F
where
    F: Fn(&[&str]) -> Result<Tensor, Error>,
{
    fn encode(&self, prompts: &[&str]) -> Result<Tensor, Error> {
        self(prompts)
    }
}
