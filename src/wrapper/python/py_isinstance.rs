//! python 原生对象或函数封装

use pyo3::{
    types::{PyAnyMethods, PyModule},
    Bound, PyAny, PyResult,
};

/// Python `isinstance(obj, torch.Tensor)`
pub fn is_torch_tensor(py_any: &Bound<'_, PyAny>) -> PyResult<bool> {
    let py = py_any.py();
    let tensor = PyModule::import(py, "torch")?.getattr("Tensor")?;
    isinstance(py_any, &tensor)
}

/// Python `isinstance` function wrapper
pub fn isinstance<'py>(py_any: &Bound<'py, PyAny>, py_type: &Bound<'py, PyAny>) -> PyResult<bool> {
    // Import the built-in isinstance function
    let builtins = PyModule::import(py_any.py(), "builtins")?;
    let isinstance_fn = builtins.getattr("isinstance")?;

    // Call isinstance(obj, type)
    let result = isinstance_fn.call1((py_any, py_type))?;

    // Extract the boolean result
    result.extract()
}
