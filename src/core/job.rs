//! 单次生成任务
//!
//! 状态: Idle -> Configured -> EmptyReferenceCached -> BlendingPerStep -> Done
//!
//! 两个权重均为 1.0 时停留在 Configured, 不编码空提示词, 也不订阅去噪钩子。

use std::sync::Arc;

use log::{debug, info};
use serde_json::{Map, Value};
use strum_macros::Display;

use crate::{
    core::{
        blender::ConditioningBlender,
        encoder::TextEncoder,
        weights::{PromptWeights, WeightNotice, WeightOverrides},
    },
    error::Error,
    hooks::{HookHandle, StepHooks},
    infotext,
};

/// 任务状态
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
pub enum JobState {
    #[default]
    Idle,
    Configured,
    EmptyReferenceCached,
    BlendingPerStep,
    Done,
}

/// 提示词权重任务
#[derive(Debug, Default)]
pub struct PromptWeightJob {
    state: JobState,
    weights: PromptWeights,
    blender: Option<Arc<ConditioningBlender>>,
    handle: Option<HookHandle>,
}

impl PromptWeightJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn weights(&self) -> PromptWeights {
        self.weights
    }

    pub fn blender(&self) -> Option<&Arc<ConditioningBlender>> {
        self.blender.as_ref()
    }

    pub fn handle(&self) -> Option<HookHandle> {
        self.handle
    }

    /// 是否已订阅去噪钩子
    pub fn is_blending(&self) -> bool {
        self.state == JobState::BlendingPerStep
    }

    /// 任务开始前调用
    ///
    /// - `ui`: 界面上的权重
    /// - `overrides`: 任务上显式指定的权重, 优先于 `ui`
    /// - `extra_generation_params`: 生成参数, 非默认权重会写入其中
    pub fn process(
        &mut self,
        ui: PromptWeights,
        overrides: &WeightOverrides,
        encoder: &dyn TextEncoder,
        hooks: &mut StepHooks,
        extra_generation_params: &mut Map<String, Value>,
    ) -> Result<Vec<WeightNotice>, Error> {
        if self.state == JobState::Done {
            return Err(Error::InvalidState {
                state: self.state.to_string(),
                action: "process".to_string(),
            });
        }

        // 先校验, 失败时保留上一次的订阅与状态
        let weights = PromptWeights::resolve(ui, overrides);
        weights.validate()?;

        // 同一任务重复处理时先移除上一次的订阅
        self.detach(hooks)?;

        let mut blender = ConditioningBlender::new();
        let notices = blender.configure(weights)?;
        self.weights = weights;
        self.state = JobState::Configured;

        if weights.is_identity() {
            debug!("prompt weights are 1.0, denoiser hook not installed");
            return Ok(notices);
        }

        blender.prepare_empty_references(encoder)?;
        self.state = JobState::EmptyReferenceCached;

        let blender = Arc::new(blender);
        let handle = hooks.subscribe(blender.clone());
        self.blender = Some(blender);
        self.handle = Some(handle);
        self.state = JobState::BlendingPerStep;

        infotext::record(extra_generation_params, &weights);

        info!(
            "prompt weight {}, negative prompt weight {}",
            weights.prompt_weight, weights.neg_prompt_weight
        );
        Ok(notices)
    }

    /// 任务结束后调用, 取消订阅并释放缓存的空提示词条件
    pub fn postprocess(&mut self, hooks: &mut StepHooks) -> Result<(), Error> {
        self.detach(hooks)?;
        self.state = JobState::Done;
        Ok(())
    }

    fn detach(&mut self, hooks: &mut StepHooks) -> Result<(), Error> {
        if let Some(handle) = self.handle.take() {
            if hooks.contains(handle) {
                hooks.unsubscribe(handle)?;
            }
        }
        if let Some(blender) = self.blender.take() {
            info!("prompt weight applied to {} denoising steps", blender.steps());
        }
        if self.state != JobState::Done {
            self.state = JobState::Idle;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use candle_core::{DType, Device, Tensor};

    use super::*;
    use crate::hooks::DenoiserParams;

    #[derive(Default)]
    struct SpyEncoder {
        calls: Cell<usize>,
    }

    impl TextEncoder for SpyEncoder {
        fn encode(&self, prompts: &[&str]) -> Result<Tensor, Error> {
            self.calls.set(self.calls.get() + 1);
            Ok(Tensor::zeros((prompts.len(), 3, 2), DType::F32, &Device::Cpu)?)
        }
    }

    #[test]
    fn test_identity_job_stays_unsubscribed() -> anyhow::Result<()> {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();
        assert_eq!(job.state(), JobState::Idle);

        let notices = job.process(
            PromptWeights::default(),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;

        assert!(notices.is_empty());
        assert_eq!(job.state(), JobState::Configured);
        assert!(hooks.is_empty());
        assert!(job.blender().is_none());
        assert_eq!(encoder.calls.get(), 0);
        assert!(params.is_empty());
        Ok(())
    }

    #[test]
    fn test_lifecycle() -> anyhow::Result<()> {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        let notices = job.process(
            PromptWeights::new(1.8, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        assert_eq!(notices.len(), 1);
        assert_eq!(job.state(), JobState::BlendingPerStep);
        assert_eq!(encoder.calls.get(), 1);
        assert_eq!(hooks.len(), 1);
        assert_eq!(params.get("prompt_weight"), Some(&Value::from(1.8)));
        assert_eq!(params.get("neg_prompt_weight"), Some(&Value::from(1.0)));

        let cond = Tensor::ones((1, 3, 2), DType::F32, &Device::Cpu)?;
        for step in 0..4 {
            let mut step_params = DenoiserParams::new(cond.clone(), cond.clone()).with_step(step, 4);
            hooks.dispatch(&mut step_params)?;
        }
        let blender = job.blender().cloned().ok_or(anyhow::anyhow!("no blender"))?;
        assert_eq!(blender.steps(), 4);
        assert_eq!(encoder.calls.get(), 1);

        job.postprocess(&mut hooks)?;
        assert_eq!(job.state(), JobState::Done);
        assert!(hooks.is_empty());
        assert!(job.blender().is_none());

        let result = job.process(
            PromptWeights::new(1.2, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        );
        assert!(matches!(result, Err(Error::InvalidState { .. })));
        Ok(())
    }

    #[test]
    fn test_overrides_win() -> anyhow::Result<()> {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        let overrides = WeightOverrides {
            prompt_weight: Some(1.0),
            neg_prompt_weight: Some(0.7),
        };
        job.process(
            PromptWeights::new(1.5, 1.0),
            &overrides,
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        assert_eq!(job.weights(), PromptWeights::new(1.0, 0.7));
        Ok(())
    }

    #[test]
    fn test_reprocess_replaces_subscription() -> anyhow::Result<()> {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        job.process(
            PromptWeights::new(0.8, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        let first = job.handle();

        job.process(
            PromptWeights::new(1.2, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        assert_eq!(hooks.len(), 1);
        assert_ne!(job.handle(), first);

        job.process(
            PromptWeights::default(),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        assert!(hooks.is_empty());
        assert_eq!(job.state(), JobState::Configured);
        Ok(())
    }

    #[test]
    fn test_rejected_reprocess_keeps_subscription() -> anyhow::Result<()> {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        job.process(
            PromptWeights::new(0.8, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        )?;
        let handle = job.handle();

        let result = job.process(
            PromptWeights::new(2.5, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(job.state(), JobState::BlendingPerStep);
        assert_eq!(job.handle(), handle);
        assert_eq!(hooks.len(), 1);
        assert!(handle.is_some_and(|h| hooks.contains(h)));
        assert_eq!(job.weights(), PromptWeights::new(0.8, 1.0));
        Ok(())
    }

    #[test]
    fn test_failed_reprocess_leaves_no_blending_state() -> anyhow::Result<()> {
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        job.process(
            PromptWeights::new(0.8, 1.0),
            &WeightOverrides::default(),
            &SpyEncoder::default(),
            &mut hooks,
            &mut params,
        )?;

        let failing = |_: &[&str]| -> Result<Tensor, Error> {
            Err(Error::Encoder("sd_model is not loaded".to_string()))
        };
        let result = job.process(
            PromptWeights::new(1.2, 1.0),
            &WeightOverrides::default(),
            &failing,
            &mut hooks,
            &mut params,
        );
        assert!(matches!(result, Err(Error::Encoder(_))));
        assert!(!job.is_blending());
        assert!(job.handle().is_none());
        assert!(hooks.is_empty());
        Ok(())
    }

    #[test]
    fn test_encoder_failure_is_fatal() {
        let encoder = |_: &[&str]| -> Result<Tensor, Error> {
            Err(Error::Encoder("sd_model is not loaded".to_string()))
        };
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        let result = job.process(
            PromptWeights::new(0.4, 1.0),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        );
        assert!(matches!(result, Err(Error::Encoder(_))));
        assert!(hooks.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_invalid_weight_is_rejected() {
        let encoder = SpyEncoder::default();
        let mut hooks = StepHooks::new();
        let mut params = Map::new();
        let mut job = PromptWeightJob::new();

        let result = job.process(
            PromptWeights::new(1.0, 2.5),
            &WeightOverrides::default(),
            &encoder,
            &mut hooks,
            &mut params,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(job.state(), JobState::Idle);
        assert_eq!(encoder.calls.get(), 0);
    }
}
