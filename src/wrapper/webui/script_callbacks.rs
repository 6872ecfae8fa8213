//! modules.script_callbacks 封装

use pyo3::{types::PyAnyMethods, Bound, PyAny, PyResult, Python};

const SCRIPT_CALLBACKS: &str = "modules.script_callbacks";

/// 注册去噪回调, 每个去噪步骤调用一次 `callback(params: CFGDenoiserParams)`
pub fn on_cfg_denoiser(py: Python<'_>, callback: &Bound<'_, PyAny>) -> PyResult<()> {
    py.import(SCRIPT_CALLBACKS)?
        .getattr("on_cfg_denoiser")?
        .call1((callback,))?;
    Ok(())
}

/// 移除当前脚本注册的所有回调
pub fn remove_current_script_callbacks(py: Python<'_>) -> PyResult<()> {
    py.import(SCRIPT_CALLBACKS)?
        .getattr("remove_current_script_callbacks")?
        .call0()?;
    Ok(())
}
