//! 空提示词条件缓存

use candle_core::Tensor;
use log::debug;

use crate::{
    core::{encoder::TextEncoder, weights::WeightKind},
    error::Error,
};

/// 空提示词 "" 编码得到的参考条件, 每个任务只计算一次
#[derive(Debug, Clone)]
pub struct EmptyReferences {
    prompt: Tensor,
    uncond: Tensor,
}

impl EmptyReferences {
    pub fn new(prompt: Tensor, uncond: Tensor) -> Self {
        Self { prompt, uncond }
    }

    /// 调用一次编码器, 正向与反向共用同一结果
    pub fn encode(encoder: &dyn TextEncoder) -> Result<Self, Error> {
        let empty = encoder.encode(&[""])?;
        if empty.rank() != 3 {
            return Err(Error::Encoder(format!(
                "empty prompt encoded to rank {} tensor {:?}, expected (batch, sequence, channels)",
                empty.rank(),
                empty.dims()
            )));
        }
        debug!("empty prompt reference: {:?}", empty.dims());

        Ok(Self {
            prompt: empty.clone(),
            uncond: empty,
        })
    }

    pub fn get(&self, kind: WeightKind) -> &Tensor {
        match kind {
            WeightKind::Prompt => &self.prompt,
            WeightKind::NegativePrompt => &self.uncond,
        }
    }
}
