//! 错误处理

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // 形状
    #[error("shape mismatch, expected {expected:?}, actual {actual:?}: {reason}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        reason: String,
    },

    // 配置
    #[error("configuration error, {0}")]
    Configuration(String),
    #[error("invalid parameter, {0}")]
    InvalidParameter(String),

    // 宿主服务
    #[error("text encoder error, {0}")]
    Encoder(String),

    // 任务状态机
    #[error("invalid job state, cannot {action} while {state}")]
    InvalidState { state: String, action: String },
    #[error("step hook not found, handle {0}")]
    HookNotFound(u64),

    #[error("type conversion failed, {0}")]
    TypeConversion(String),

    #[error("tensor error, {0}")]
    TensorErr(#[from] candle_core::Error),
    #[error("serde json error, {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[cfg(feature = "python")]
    #[error("py error, {0}")]
    PyErr(#[from] pyo3::PyErr),
    #[cfg(feature = "python")]
    #[error("pythonize error, {0}")]
    PythonizeError(#[from] pythonize::PythonizeError),
    #[cfg(feature = "python")]
    #[error("py downcast error, {0}")]
    PyDowncastError(String),
}

impl Error {
    pub fn shape_mismatch(expected: &[usize], actual: &[usize], reason: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<Error> for pyo3::PyErr {
    fn from(e: Error) -> Self {
        match e {
            Error::PyErr(e) => e,
            e => pyo3::PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()),
        }
    }
}
