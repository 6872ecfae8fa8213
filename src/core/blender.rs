//! 条件混合器
//!
//! 每个去噪步骤将正向/反向条件替换为与空提示词条件的插值结果

use std::sync::atomic::{AtomicUsize, Ordering};

use candle_core::Tensor;
use log::debug;

use crate::{
    core::{
        blend::blend,
        encoder::TextEncoder,
        references::EmptyReferences,
        weights::{PromptWeights, WeightKind, WeightNotice, WEIGHT_DEFAULT},
    },
    error::Error,
    hooks::{DenoiserHook, DenoiserParams},
};

/// 条件混合器
#[derive(Debug, Default)]
pub struct ConditioningBlender {
    weights: PromptWeights,
    references: Option<EmptyReferences>,
    steps: AtomicUsize,
}

impl ConditioningBlender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验并保存权重, 返回需要提示的权重
    pub fn configure(&mut self, weights: PromptWeights) -> Result<Vec<WeightNotice>, Error> {
        weights.validate()?;

        let notices = weights.notices();
        for notice in &notices {
            notice.emit();
        }

        self.weights = weights;
        Ok(notices)
    }

    /// 编码空提示词并缓存, 权重均为 1.0 时不调用编码器
    pub fn prepare_empty_references(&mut self, encoder: &dyn TextEncoder) -> Result<(), Error> {
        if self.weights.is_identity() || self.references.is_some() {
            return Ok(());
        }
        self.references = Some(EmptyReferences::encode(encoder)?);
        Ok(())
    }

    pub fn weights(&self) -> PromptWeights {
        self.weights
    }

    pub fn has_references(&self) -> bool {
        self.references.is_some()
    }

    /// 已处理的去噪步骤数
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::Relaxed)
    }

    /// 处理一个去噪步骤
    pub fn blend_step(&self, params: &mut DenoiserParams) -> Result<(), Error> {
        let references = self.references.as_ref().ok_or(Error::InvalidState {
            state: "unprepared".to_string(),
            action: "blend conditioning".to_string(),
        })?;

        let text_cond = self.blend_side(&params.text_cond, references, WeightKind::Prompt)?;
        let text_uncond =
            self.blend_side(&params.text_uncond, references, WeightKind::NegativePrompt)?;

        if let Some(text_cond) = text_cond {
            params.text_cond = text_cond;
        }
        if let Some(text_uncond) = text_uncond {
            params.text_uncond = text_uncond;
        }

        let steps = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "blended step {}/{} ({steps} total)",
            params.sampling_step, params.total_sampling_steps
        );
        Ok(())
    }

    /// 权重为 1.0 的一侧保持原张量, 返回 None
    fn blend_side(
        &self,
        cond: &Tensor,
        references: &EmptyReferences,
        kind: WeightKind,
    ) -> Result<Option<Tensor>, Error> {
        let weight = self.weights.get(kind);
        if weight == WEIGHT_DEFAULT {
            return Ok(None);
        }
        Ok(Some(blend(cond, references.get(kind), weight)?))
    }
}

impl DenoiserHook for ConditioningBlender {
    fn name(&self) -> &str {
        "ConditioningBlender"
    }

    fn on_cfg_denoiser(&self, params: &mut DenoiserParams) -> Result<(), Error> {
        self.blend_step(params)
    }
}
