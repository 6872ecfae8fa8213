//! 钩子注册表

use std::fmt;

use log::{debug, error};

use crate::error::Error;

use super::{DenoiserParams, DynHook};

/// 订阅句柄, 取消订阅时使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 钩子注册表
///
/// 按订阅顺序执行, 句柄只增不复用
#[derive(Debug, Default)]
pub struct StepHooks {
    hooks: Vec<(HookHandle, DynHook)>,
    next_id: u64,
}

impl StepHooks {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅去噪步骤
    pub fn subscribe(&mut self, hook: DynHook) -> HookHandle {
        let handle = HookHandle(self.next_id);
        self.next_id += 1;

        debug!("Subscribed hook: {} {handle}", hook.name());
        self.hooks.push((handle, hook));
        handle
    }

    /// 取消订阅, 返回被移除的钩子
    pub fn unsubscribe(&mut self, handle: HookHandle) -> Result<DynHook, Error> {
        let index = self
            .hooks
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(Error::HookNotFound(handle.id()))?;

        let (_, hook) = self.hooks.remove(index);
        debug!("Unsubscribed hook: {} {handle}", hook.name());
        Ok(hook)
    }

    /// 执行一个去噪步骤的所有钩子
    ///
    /// 某个钩子失败时立即返回错误, 后续钩子不再执行
    pub fn dispatch(&self, params: &mut DenoiserParams) -> Result<(), Error> {
        for (handle, hook) in &self.hooks {
            if let Err(e) = hook.on_cfg_denoiser(params) {
                error!(
                    "Denoiser hook '{}' {handle} failed at step {}: {e}",
                    hook.name(),
                    params.sampling_step
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// 是否仍在订阅
    pub fn contains(&self, handle: HookHandle) -> bool {
        self.hooks.iter().any(|(h, _)| *h == handle)
    }

    /// 检查是否有钩子
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 获取钩子数量
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// 清空所有钩子
    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}
