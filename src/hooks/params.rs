//! 去噪步骤参数

use candle_core::Tensor;

/// 单个去噪步骤的参数
///
/// 对应 webui 的 `CFGDenoiserParams`, 只携带钩子会改写的 `text_cond` / `text_uncond` 与步骤信息
#[derive(Debug, Clone)]
pub struct DenoiserParams {
    /// 当前步骤
    pub sampling_step: usize,
    /// 总步骤数
    pub total_sampling_steps: usize,
    /// 正向提示词条件
    pub text_cond: Tensor,
    /// 反向提示词条件
    pub text_uncond: Tensor,
}

impl DenoiserParams {
    pub fn new(text_cond: Tensor, text_uncond: Tensor) -> Self {
        Self {
            sampling_step: 0,
            total_sampling_steps: 0,
            text_cond,
            text_uncond,
        }
    }

    pub fn with_step(mut self, sampling_step: usize, total_sampling_steps: usize) -> Self {
        self.sampling_step = sampling_step;
        self.total_sampling_steps = total_sampling_steps;
        self
    }
}
