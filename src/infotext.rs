//! 生成参数 (infotext)
//!
//! 非默认权重写入 `extra_generation_params`, 之后可从保存的参数中复现同一任务。
//! webui 参数行格式: `Steps: 20, Sampler: Euler a, prompt_weight: 1.25, neg_prompt_weight: 0.8`

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    core::weights::{PromptWeights, WeightOverrides},
    error::Error,
};

pub const KEY_PROMPT_WEIGHT: &str = "prompt_weight";
pub const KEY_NEG_PROMPT_WEIGHT: &str = "neg_prompt_weight";

/// (UI 元素 ID, 参数键) 粘贴参数时回填
pub const INFOTEXT_FIELDS: [(&str, &str); 2] = [
    ("pw-prompt-number", KEY_PROMPT_WEIGHT),
    ("pw-neg-prompt-number", KEY_NEG_PROMPT_WEIGHT),
];

// `key: value` 对, value 允许带引号
lazy_static! {
    static ref PARAM_RE: Regex =
        Regex::new(r#"\s*(\w[\w \-/]*):\s*("(?:\\.|[^\\"])+"|[^,]*)(?:,|$)"#)
            .expect("valid regex");
}

/// 任一权重不为 1.0 时记录两个权重
pub fn record(params: &mut Map<String, Value>, weights: &PromptWeights) {
    if weights.is_identity() {
        return;
    }
    params.insert(
        KEY_PROMPT_WEIGHT.to_string(),
        Value::from(weights.prompt_weight),
    );
    params.insert(
        KEY_NEG_PROMPT_WEIGHT.to_string(),
        Value::from(weights.neg_prompt_weight),
    );
}

/// 从参数行解析权重
///
/// 多行 infotext 只看最后一行 (前面是提示词)
pub fn parse_overrides(infotext: &str) -> Result<WeightOverrides, Error> {
    let line = infotext.lines().last().unwrap_or_default();

    let mut overrides = WeightOverrides::default();
    for caps in PARAM_RE.captures_iter(line) {
        let key = caps[1].trim();
        let value = caps[2].trim().trim_matches('"');
        match key {
            KEY_PROMPT_WEIGHT => overrides.prompt_weight = Some(parse_weight(key, value)?),
            KEY_NEG_PROMPT_WEIGHT => {
                overrides.neg_prompt_weight = Some(parse_weight(key, value)?)
            }
            _ => {}
        }
    }
    Ok(overrides)
}

/// 从 JSON 参数表读取权重
pub fn overrides_from_params(params: &Map<String, Value>) -> Result<WeightOverrides, Error> {
    let read = |key: &str| -> Result<Option<f64>, Error> {
        match params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| Error::InvalidParameter(format!("{key}: {n}"))),
            Some(Value::String(s)) => parse_weight(key, s).map(Some),
            Some(v) => Err(Error::InvalidParameter(format!("{key}: {v}"))),
        }
    };

    Ok(WeightOverrides {
        prompt_weight: read(KEY_PROMPT_WEIGHT)?,
        neg_prompt_weight: read(KEY_NEG_PROMPT_WEIGHT)?,
    })
}

/// 粘贴生成参数时的权重
///
/// 宿主已解析出的参数表优先, 缺失的键再从参数行读取
pub fn pasted_overrides(
    infotext: &str,
    params: &Map<String, Value>,
) -> Result<WeightOverrides, Error> {
    let parsed = overrides_from_params(params)?;
    if parsed.prompt_weight.is_some() && parsed.neg_prompt_weight.is_some() {
        return Ok(parsed);
    }

    let line = parse_overrides(infotext)?;
    Ok(WeightOverrides {
        prompt_weight: parsed.prompt_weight.or(line.prompt_weight),
        neg_prompt_weight: parsed.neg_prompt_weight.or(line.neg_prompt_weight),
    })
}

fn parse_weight(key: &str, value: &str) -> Result<f64, Error> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::InvalidParameter(format!("{key}: {value:?}, {e}")))
}
