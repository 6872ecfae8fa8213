//! CFGDenoiserParams 中的条件读写
//!
//! SD1/SD2 的条件是 Tensor, SDXL 是 dict: {"crossattn": Tensor, "vector": Tensor},
//! 只有 crossattn (batch, sequence, channels) 参与插值。

use candle_core::{Device, Tensor};
use pyo3::{
    types::{PyAnyMethods, PyDict, PyDictMethods, PyTypeMethods},
    Bound, PyAny, Python,
};

use crate::{
    error::Error,
    wrapper::{python::is_torch_tensor, torch::TensorWrapper},
};

pub const CROSSATTN_KEY: &str = "crossattn";

fn crossattn<'py>(cond: &Bound<'py, PyAny>) -> Result<Bound<'py, PyAny>, Error> {
    if let Ok(dict) = cond.downcast::<PyDict>() {
        return dict.get_item(CROSSATTN_KEY)?.ok_or_else(|| {
            Error::TypeConversion(format!("conditioning dict has no '{CROSSATTN_KEY}' entry"))
        });
    }
    Ok(cond.clone())
}

/// 读取条件张量
pub fn read_conditioning(cond: &Bound<'_, PyAny>, device: &Device) -> Result<Tensor, Error> {
    let tensor = crossattn(cond)?;
    if !is_torch_tensor(&tensor)? {
        return Err(Error::TypeConversion(format!(
            "conditioning is not a torch.Tensor: {}",
            tensor.get_type().name()?
        )));
    }
    Ok(TensorWrapper::new(&tensor, device)?.into_tensor())
}

/// 生成新的条件对象, dtype/device 与原对象一致
///
/// dict 会复制一份再替换 crossattn, 不修改宿主持有的原对象
pub fn write_conditioning<'py>(
    py: Python<'py>,
    original: &Bound<'py, PyAny>,
    tensor: Tensor,
) -> Result<Bound<'py, PyAny>, Error> {
    let target = crossattn(original)?;
    let py_tensor = TensorWrapper::from_tensor(tensor).to_py_tensor_like(py, &target)?;

    if let Ok(dict) = original.downcast::<PyDict>() {
        let copied = dict.copy()?;
        copied.set_item(CROSSATTN_KEY, py_tensor)?;
        return Ok(copied.into_any());
    }
    Ok(py_tensor)
}
