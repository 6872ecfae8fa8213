//! 界面描述
//!
//! 宿主根据该描述渲染折叠面板: 每个权重一个滑块 + 一个数字输入框, 以及重置按钮。

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    core::weights::{WeightKind, WEIGHT_DEFAULT, WEIGHT_MAX, WEIGHT_MIN, WEIGHT_STEP},
    infotext::{KEY_NEG_PROMPT_WEIGHT, KEY_PROMPT_WEIGHT},
};

pub const TITLE: &str = "Prompt Weight";
pub const ACCORDION_ID: &str = "pw";
pub const RESET_BUTTON_ID: &str = "pw-x";
pub const RESET_BUTTON_LABEL: &str = "✕";
/// 数字输入框的小数位数
pub const NUMBER_PRECISION: u32 = 2;

/// 滑块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slider {
    pub elem_id: String,
    pub label: String,
    pub minimum: f64,
    pub maximum: f64,
    pub step: f64,
    pub value: f64,
}

/// 数字输入框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Number {
    pub elem_id: String,
    pub label: String,
    pub precision: u32,
    pub value: f64,
}

/// 单个权重的控件, 滑块与输入框双向同步
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightControl {
    /// 生成参数中的键
    pub key: String,
    pub slider: Slider,
    pub number: Number,
}

impl WeightControl {
    pub fn new(kind: WeightKind) -> Self {
        let (key, prefix, label) = match kind {
            WeightKind::Prompt => (KEY_PROMPT_WEIGHT, "pw-prompt", "Prompt Weight"),
            WeightKind::NegativePrompt => {
                (KEY_NEG_PROMPT_WEIGHT, "pw-neg-prompt", "Negative Prompt Weight")
            }
        };

        Self {
            key: key.to_string(),
            slider: Slider {
                elem_id: format!("{prefix}-slider"),
                label: label.to_string(),
                minimum: WEIGHT_MIN,
                maximum: WEIGHT_MAX,
                step: WEIGHT_STEP,
                value: WEIGHT_DEFAULT,
            },
            number: Number {
                elem_id: format!("{prefix}-number"),
                label: label.to_string(),
                precision: NUMBER_PRECISION,
                value: WEIGHT_DEFAULT,
            },
        }
    }
}

/// 重置按钮, 点击后所有控件恢复为 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetButton {
    pub elem_id: String,
    pub label: String,
    pub value: f64,
}

/// 折叠面板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSchema {
    pub title: String,
    pub elem_id: String,
    pub open: bool,
    pub controls: Vec<WeightControl>,
    pub reset: ResetButton,
}

impl Default for UiSchema {
    fn default() -> Self {
        Self {
            title: TITLE.to_string(),
            elem_id: ACCORDION_ID.to_string(),
            open: true,
            controls: WeightKind::iter().map(WeightControl::new).collect(),
            reset: ResetButton {
                elem_id: RESET_BUTTON_ID.to_string(),
                label: RESET_BUTTON_LABEL.to_string(),
                value: WEIGHT_DEFAULT,
            },
        }
    }
}
