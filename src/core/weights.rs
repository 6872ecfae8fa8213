//! 提示词权重配置
//!
//! 权重为 1.0 时等同于不处理

use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::error::Error;

pub const WEIGHT_MIN: f64 = 0.0;
pub const WEIGHT_MAX: f64 = 2.0;
pub const WEIGHT_STEP: f64 = 0.05;
pub const WEIGHT_DEFAULT: f64 = 1.0;

/// 低于该值视为极端权重
pub const EXTREME_LOW: f64 = 0.5;
/// 高于该值视为极端权重
pub const EXTREME_HIGH: f64 = 1.5;

/// 权重对应的条件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum WeightKind {
    /// 正向提示词
    #[strum(to_string = "prompt")]
    Prompt,
    /// 反向提示词
    #[strum(to_string = "negative prompt")]
    NegativePrompt,
}

/// 权重提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NoticeLevel {
    Moderate,
    Extreme,
}

/// 非默认权重的提示
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightNotice {
    pub kind: WeightKind,
    pub value: f64,
    pub level: NoticeLevel,
}

impl WeightNotice {
    /// 权重为 1.0 时不提示
    pub fn check(kind: WeightKind, value: f64) -> Option<Self> {
        if value == WEIGHT_DEFAULT {
            return None;
        }
        let level = if !(EXTREME_LOW..=EXTREME_HIGH).contains(&value) {
            NoticeLevel::Extreme
        } else {
            NoticeLevel::Moderate
        };
        Some(Self { kind, value, level })
    }

    /// 输出到日志
    pub fn emit(&self) {
        match self.level {
            NoticeLevel::Extreme => warn!(
                "ATTENTION: {} weight is set to {}, which is unusually extreme",
                self.kind, self.value
            ),
            NoticeLevel::Moderate => {
                info!("ATTENTION: {} weight is set to {}", self.kind, self.value)
            }
        }
    }
}

/// 正向/反向提示词权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptWeights {
    pub prompt_weight: f64,
    pub neg_prompt_weight: f64,
}

impl Default for PromptWeights {
    fn default() -> Self {
        Self {
            prompt_weight: WEIGHT_DEFAULT,
            neg_prompt_weight: WEIGHT_DEFAULT,
        }
    }
}

impl PromptWeights {
    pub fn new(prompt_weight: f64, neg_prompt_weight: f64) -> Self {
        Self {
            prompt_weight,
            neg_prompt_weight,
        }
    }

    /// 按优先级合并: 任务上的覆盖值 > UI 值
    pub fn resolve(ui: PromptWeights, overrides: &WeightOverrides) -> Self {
        Self {
            prompt_weight: overrides.prompt_weight.unwrap_or(ui.prompt_weight),
            neg_prompt_weight: overrides.neg_prompt_weight.unwrap_or(ui.neg_prompt_weight),
        }
    }

    /// 两个权重均为 1.0
    pub fn is_identity(&self) -> bool {
        self.prompt_weight == WEIGHT_DEFAULT && self.neg_prompt_weight == WEIGHT_DEFAULT
    }

    pub fn get(&self, kind: WeightKind) -> f64 {
        match kind {
            WeightKind::Prompt => self.prompt_weight,
            WeightKind::NegativePrompt => self.neg_prompt_weight,
        }
    }

    /// 超出 [0, 2] 或非有限值直接拒绝, 不做截断
    pub fn validate(&self) -> Result<(), Error> {
        for kind in WeightKind::iter() {
            let value = self.get(kind);
            if !value.is_finite() || !(WEIGHT_MIN..=WEIGHT_MAX).contains(&value) {
                return Err(Error::Configuration(format!(
                    "{kind} weight {value} is outside [{WEIGHT_MIN}, {WEIGHT_MAX}]"
                )));
            }
        }
        Ok(())
    }

    /// 非默认权重的提示列表
    pub fn notices(&self) -> Vec<WeightNotice> {
        WeightKind::iter()
            .filter_map(|kind| WeightNotice::check(kind, self.get(kind)))
            .collect()
    }
}

/// 任务上显式指定的权重, 例如从生成参数回放
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    pub prompt_weight: Option<f64>,
    pub neg_prompt_weight: Option<f64>,
}

impl WeightOverrides {
    pub fn is_empty(&self) -> bool {
        self.prompt_weight.is_none() && self.neg_prompt_weight.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let weights = PromptWeights::default();
        assert!(weights.is_identity());
        assert!(weights.notices().is_empty());
    }

    #[test]
    fn test_extreme_notice() {
        let weights = PromptWeights::new(1.8, 1.0);
        let notices = weights.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, WeightKind::Prompt);
        assert_eq!(notices[0].level, NoticeLevel::Extreme);

        let weights = PromptWeights::new(1.2, 0.3);
        let notices = weights.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].level, NoticeLevel::Moderate);
        assert_eq!(notices[1].kind, WeightKind::NegativePrompt);
        assert_eq!(notices[1].level, NoticeLevel::Extreme);
    }

    #[test]
    fn test_notice_bounds() {
        assert_eq!(
            WeightNotice::check(WeightKind::Prompt, 0.5).map(|n| n.level),
            Some(NoticeLevel::Moderate)
        );
        assert_eq!(
            WeightNotice::check(WeightKind::Prompt, 1.5).map(|n| n.level),
            Some(NoticeLevel::Moderate)
        );
        assert_eq!(
            WeightNotice::check(WeightKind::Prompt, 0.45).map(|n| n.level),
            Some(NoticeLevel::Extreme)
        );
    }

    #[test]
    fn test_validate() {
        assert!(PromptWeights::new(0.0, 2.0).validate().is_ok());
        assert!(matches!(
            PromptWeights::new(2.5, 1.0).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            PromptWeights::new(1.0, -0.1).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(PromptWeights::new(f64::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn test_resolve_prefers_overrides() {
        let ui = PromptWeights::new(1.2, 0.8);
        let overrides = WeightOverrides {
            prompt_weight: Some(0.6),
            neg_prompt_weight: None,
        };
        assert_eq!(
            PromptWeights::resolve(ui, &overrides),
            PromptWeights::new(0.6, 0.8)
        );
        assert_eq!(PromptWeights::resolve(ui, &WeightOverrides::default()), ui);
    }

    #[test]
    fn test_deserialize_defaults() -> anyhow::Result<()> {
        let weights: PromptWeights = serde_json::from_str(r#"{"prompt_weight": 1.3}"#)?;
        assert_eq!(weights, PromptWeights::new(1.3, 1.0));
        Ok(())
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(WeightKind::Prompt.to_string(), "prompt");
        assert_eq!(WeightKind::NegativePrompt.as_ref(), "negative prompt");
    }
}
