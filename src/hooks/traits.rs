//! 去噪钩子 trait

use std::sync::Arc;

use crate::{error::Error, hooks::DenoiserParams};

/// 去噪步骤钩子
///
/// 在每个去噪步骤的数值计算之前同步调用, 可改写 `text_cond` / `text_uncond`
pub trait DenoiserHook: Send + Sync + std::fmt::Debug {
    /// 钩子名称
    ///
    /// 用于日志记录和调试
    fn name(&self) -> &str;

    fn on_cfg_denoiser(&self, params: &mut DenoiserParams) -> Result<(), Error>;
}

/// 动态钩子类型（用于存储）
pub type DynHook = Arc<dyn DenoiserHook>;
