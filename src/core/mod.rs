//! 核心逻辑
//!
//! 不依赖 Python, 宿主通过 [`encoder::TextEncoder`] 与 [`crate::hooks::StepHooks`] 接入

pub mod blend;
pub mod blender;
pub mod encoder;
pub mod job;
pub mod references;
pub mod weights;

pub use blend::{blend, build_reference, lerp};
pub use blender::ConditioningBlender;
pub use encoder::TextEncoder;
pub use job::{JobState, PromptWeightJob};
pub use references::EmptyReferences;
pub use weights::{PromptWeights, WeightKind, WeightNotice, WeightOverrides};
