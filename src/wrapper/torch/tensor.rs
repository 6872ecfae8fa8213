//! torch.Tensor 与 candle Tensor 相互转换
//! 依赖:
//! - python: torch, numpy

use candle_core::{DType, Device, Tensor};
use numpy::{PyArray, PyArrayDyn, PyArrayMethods, PyUntypedArrayMethods};
use pyo3::{
    types::{PyAnyMethods, PyDict, PyDictMethods},
    Bound, PyAny, Python,
};

use crate::error::Error;

pub struct TensorWrapper {
    tensor: Tensor,
}

impl TensorWrapper {
    /// 从 torch.Tensor 构建, 统一转换为 f32
    pub fn new(py_any: &Bound<'_, PyAny>, device: &Device) -> Result<Self, Error> {
        let tensor = Self::torch_to_candle(py_any, device)?;
        Ok(Self { tensor })
    }

    /// The dimension size for this tensor on each axis.
    pub fn dims(&self) -> &[usize] {
        self.tensor.dims()
    }

    pub fn from_tensor(tensor: Tensor) -> Self {
        Self { tensor }
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }

    /// 从 Python torch.Tensor 转为 Rust candle_core::Tensor
    ///
    /// 先移到 CPU 并转为连续的 float32, 再经 numpy 读取
    fn torch_to_candle(torch_tensor: &Bound<'_, PyAny>, device: &Device) -> Result<Tensor, Error> {
        // 1. 获取 numpy 数组
        let np = torch_tensor
            .call_method0("detach")?
            .call_method0("cpu")?
            .call_method0("float")?
            .call_method0("contiguous")?
            .call_method0("numpy")?;

        // 2. 使用 downcast 而不是 extract
        let arr = np
            .downcast::<PyArrayDyn<f32>>()
            .map_err(|e| Error::PyDowncastError(e.to_string()))?;

        // 3. 获取形状
        let shape = arr.shape().to_vec();

        // 4. 获取数据
        let data = arr
            .to_vec()
            .map_err(|e| Error::TypeConversion(e.to_string()))?;

        // 5. 创建 tensor
        Ok(Tensor::from_vec(data, shape, device)?)
    }

    /// 转换为 torch.Tensor, dtype 与 device 与 `like` 保持一致
    ///
    /// ```python,ignore
    /// import torch
    /// tensor = torch.from_numpy(data).to(device=like.device, dtype=like.dtype)
    /// ```
    pub fn to_py_tensor_like<'py>(
        self,
        py: Python<'py>,
        like: &Bound<'py, PyAny>,
    ) -> Result<Bound<'py, PyAny>, Error> {
        let tensor = self.into_tensor();
        let shape = tensor.dims().to_vec();

        let data = tensor
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;

        // 创建数组并重新排列维度
        let array = PyArray::from_vec(py, data).reshape(shape)?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("device", like.getattr("device")?)?;
        kwargs.set_item("dtype", like.getattr("dtype")?)?;

        let torch = py.import("torch")?;
        let py_tensor = torch
            .getattr("from_numpy")?
            .call1((array,))?
            .getattr("to")?
            .call((), Some(&kwargs))?;
        Ok(py_tensor)
    }
}

impl From<Tensor> for TensorWrapper {
    fn from(value: Tensor) -> Self {
        TensorWrapper::from_tensor(value)
    }
}
