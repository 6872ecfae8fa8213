//! Prompt Weight
//!
//! 在每个去噪步骤前, 将正向/反向提示词条件与空提示词条件做线性插值,
//! 用于调节提示词整体强度。

#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

#[cfg(feature = "accelerate")]
extern crate accelerate_src;

pub mod core;
pub mod error;
pub mod hooks;
pub mod infotext;
pub mod ui;
pub mod utils;

#[cfg(feature = "python")]
pub mod script;
#[cfg(feature = "python")]
pub mod wrapper;

#[cfg(feature = "python")]
mod py_module {
    use pyo3::{
        pyfunction, pymodule,
        types::{PyDict, PyDictMethods, PyModule, PyModuleMethods},
        wrap_pyfunction, Bound, PyResult, Python,
    };
    use serde_json::{Map, Value};

    use crate::{
        infotext::{self, INFOTEXT_FIELDS, KEY_NEG_PROMPT_WEIGHT, KEY_PROMPT_WEIGHT},
        script::PromptWeightScript,
    };

    /// 粘贴生成参数时调用, 将两个权重写回 `params` (float)
    ///
    /// 对应 `script_callbacks.on_infotext_pasted(infotext, params)`
    #[pyfunction]
    fn on_infotext_pasted(infotext: &str, params: &Bound<'_, PyDict>) -> PyResult<()> {
        let mut parsed = Map::new();
        for key in [KEY_PROMPT_WEIGHT, KEY_NEG_PROMPT_WEIGHT] {
            if let Some(value) = params.get_item(key)? {
                parsed.insert(key.to_string(), pythonize::depythonize::<Value>(&value)?);
            }
        }

        let overrides = infotext::pasted_overrides(infotext, &parsed)?;
        if let Some(value) = overrides.prompt_weight {
            params.set_item(KEY_PROMPT_WEIGHT, value)?;
        }
        if let Some(value) = overrides.neg_prompt_weight {
            params.set_item(KEY_NEG_PROMPT_WEIGHT, value)?;
        }
        Ok(())
    }

    /// A Python module implemented in Rust.
    #[pymodule]
    #[pyo3(name = "PromptWeight")] // 需要与包名保持一致
    fn py_init(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add("INFOTEXT_FIELDS", INFOTEXT_FIELDS.to_vec())?;
        m.add_function(wrap_pyfunction!(on_infotext_pasted, m)?)?;
        m.add_class::<PromptWeightScript>()?;
        Ok(())
    }
}
