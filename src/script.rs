//! Prompt Weight 脚本
//!
//! 对应 webui 的 `scripts.Script` (AlwaysVisible),
//! 由 `scripts/prompt_weight.py` 转发 process / postprocess 调用。

use candle_core::Device;
use log::{error, info};
use pyo3::{
    exceptions::PyRuntimeError,
    pyclass, pymethods,
    types::{PyAnyMethods, PyDict, PyDictMethods, PyTuple},
    Bound, PyAny, PyErr, PyResult, Python,
};
use serde_json::{Map, Value};

use crate::{
    core::{
        job::{JobState, PromptWeightJob},
        weights::{PromptWeights, WeightOverrides, WEIGHT_DEFAULT},
    },
    error::Error,
    hooks::{DenoiserParams, StepHooks},
    infotext::{KEY_NEG_PROMPT_WEIGHT, KEY_PROMPT_WEIGHT},
    ui::{UiSchema, TITLE},
    utils::log::init_logger,
    wrapper::webui::{
        on_cfg_denoiser, read_conditioning, remove_current_script_callbacks, write_conditioning,
        SdModelEncoder,
    },
};

/// Prompt Weight 脚本
#[pyclass(subclass)]
pub struct PromptWeightScript {
    job: PromptWeightJob,
    hooks: StepHooks,
    callbacks_added: bool,
}

#[pymethods]
impl PromptWeightScript {
    #[new]
    fn new() -> Self {
        init_logger();
        Self {
            job: PromptWeightJob::new(),
            hooks: StepHooks::new(),
            callbacks_added: false,
        }
    }

    fn title(&self) -> &'static str {
        TITLE
    }

    /// 文生图和图生图均显示
    fn show(&self, _is_img2img: bool) -> bool {
        true
    }

    /// 界面描述
    fn ui_schema<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        Ok(pythonize::pythonize(py, &UiSchema::default())?)
    }

    /// 当前任务状态
    fn state(&self) -> String {
        self.job.state().to_string()
    }

    /// 生成开始前调用
    fn process(
        slf: &Bound<'_, Self>,
        p: &Bound<'_, PyAny>,
        prompt_weight: f64,
        neg_prompt_weight: f64,
    ) -> PyResult<()> {
        let py = slf.py();
        let results = Self::start_job(slf, p, PromptWeights::new(prompt_weight, neg_prompt_weight));

        match results {
            Ok(v) => Ok(v),
            Err(e) => {
                error!("PromptWeight process error, {e}");
                // 失败时不保留任何回调
                if let Err(e) = slf.borrow_mut().stop_job(py) {
                    error!("PromptWeight cleanup failed, {e}");
                }
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }

    /// 每个去噪步骤调用一次, 改写 params.text_cond / params.text_uncond
    fn denoiser_callback(&self, py: Python<'_>, params: &Bound<'_, PyAny>) -> PyResult<()> {
        self.blend_params(py, params).map_err(|e| {
            error!("PromptWeight denoiser callback error, {e}");
            PyErr::new::<PyRuntimeError, _>(e.to_string())
        })
    }

    /// 生成结束后调用
    #[pyo3(signature = (_p, _processed, *_args))]
    fn postprocess(
        &mut self,
        py: Python<'_>,
        _p: &Bound<'_, PyAny>,
        _processed: &Bound<'_, PyAny>,
        _args: &Bound<'_, PyTuple>,
    ) -> PyResult<()> {
        self.stop_job(py).map_err(|e| {
            error!("PromptWeight postprocess error, {e}");
            PyErr::new::<PyRuntimeError, _>(e.to_string())
        })
    }
}

impl PromptWeightScript {
    fn start_job(
        slf: &Bound<'_, Self>,
        p: &Bound<'_, PyAny>,
        ui: PromptWeights,
    ) -> Result<(), Error> {
        let py = slf.py();
        let overrides = Self::overrides(p)?;

        let mut extra_generation_params = Map::new();
        let blending = {
            let mut this = slf.borrow_mut();
            this.stop_job(py)?;

            let this = &mut *this;
            this.job = PromptWeightJob::new();
            this.job.process(
                ui,
                &overrides,
                &SdModelEncoder,
                &mut this.hooks,
                &mut extra_generation_params,
            )?;
            this.job.is_blending()
        };

        if !blending {
            return Ok(());
        }

        on_cfg_denoiser(py, &slf.getattr("denoiser_callback")?)?;
        slf.borrow_mut().callbacks_added = true;

        Self::update_generation_params(p, &extra_generation_params)?;
        Ok(())
    }

    /// 结束当前任务并移除宿主回调
    fn stop_job(&mut self, py: Python<'_>) -> Result<(), Error> {
        if self.callbacks_added {
            remove_current_script_callbacks(py)?;
            self.callbacks_added = false;
        }
        if !matches!(self.job.state(), JobState::Idle | JobState::Done) {
            self.job.postprocess(&mut self.hooks)?;
        }
        Ok(())
    }

    /// 任务对象上显式设置的权重, 例如 XYZ 图表或粘贴的生成参数
    fn overrides(p: &Bound<'_, PyAny>) -> Result<WeightOverrides, Error> {
        let read = |key: &str| -> Result<Option<f64>, Error> {
            if !p.hasattr(key)? {
                return Ok(None);
            }
            let value = p.getattr(key)?;
            if value.is_none() {
                return Ok(None);
            }
            Ok(Some(value.extract::<f64>()?))
        };

        let overrides = WeightOverrides {
            prompt_weight: read(KEY_PROMPT_WEIGHT)?,
            neg_prompt_weight: read(KEY_NEG_PROMPT_WEIGHT)?,
        };
        if !overrides.is_empty() {
            info!("prompt weight overrides from job: {overrides:?}");
        }
        Ok(overrides)
    }

    /// 写入 p.extra_generation_params
    fn update_generation_params(
        p: &Bound<'_, PyAny>,
        params: &Map<String, Value>,
    ) -> Result<(), Error> {
        let py = p.py();
        let extra = p.getattr("extra_generation_params")?;
        let update = PyDict::new(py);
        for (key, value) in params {
            update.set_item(key, pythonize::pythonize(py, value)?)?;
        }
        extra.call_method1("update", (update,))?;
        Ok(())
    }

    /// 条件经 numpy 在 CPU 上以 f32 计算, 每步一次往返
    ///
    /// 条件张量只有 (batch, 77*n, channels), 相对 UNet 前向可以忽略;
    /// 权重为 1.0 的一侧不写回, 宿主继续使用原对象。
    fn blend_params(&self, py: Python<'_>, params: &Bound<'_, PyAny>) -> Result<(), Error> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        let weights = self.job.weights();

        let py_cond = params.getattr("text_cond")?;
        let py_uncond = params.getattr("text_uncond")?;

        let device = Device::Cpu;
        let mut step = DenoiserParams::new(
            read_conditioning(&py_cond, &device)?,
            read_conditioning(&py_uncond, &device)?,
        )
        .with_step(
            params.getattr("sampling_step")?.extract()?,
            params.getattr("total_sampling_steps")?.extract()?,
        );

        self.hooks.dispatch(&mut step)?;

        if weights.prompt_weight != WEIGHT_DEFAULT {
            params.setattr("text_cond", write_conditioning(py, &py_cond, step.text_cond)?)?;
        }
        if weights.neg_prompt_weight != WEIGHT_DEFAULT {
            params.setattr(
                "text_uncond",
                write_conditioning(py, &py_uncond, step.text_uncond)?,
            )?;
        }
        Ok(())
    }
}
