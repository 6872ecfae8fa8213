//! 去噪步骤钩子
//!
//! 宿主采样器每个去噪步骤调用一次 [`StepHooks::dispatch`],
//! 订阅方通过 [`HookHandle`] 在任务结束时取消订阅。
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prompt_weight::{
//!     error::Error,
//!     hooks::{DenoiserHook, DenoiserParams, StepHooks},
//! };
//!
//! #[derive(Debug)]
//! struct Noop;
//!
//! impl DenoiserHook for Noop {
//!     fn name(&self) -> &str {
//!         "Noop"
//!     }
//!
//!     fn on_cfg_denoiser(&self, _params: &mut DenoiserParams) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! let mut hooks = StepHooks::new();
//! let handle = hooks.subscribe(Arc::new(Noop));
//! assert_eq!(hooks.len(), 1);
//! hooks.unsubscribe(handle).unwrap();
//! assert!(hooks.is_empty());
//! ```

mod params;
mod registry;
mod traits;

pub use params::DenoiserParams;
pub use registry::{HookHandle, StepHooks};
pub use traits::{DenoiserHook, DynHook};
