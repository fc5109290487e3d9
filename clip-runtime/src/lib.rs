//! # Clip Runtime
//!
//! 可逆演示效果引擎的核心库。
//!
//! ## 架构概述
//!
//! `clip-runtime` 不依赖任何渲染引擎。元素通过 [`VisualElement`] trait
//! 暴露数值属性与可见性，宿主按帧驱动：
//!
//! ```text
//! Host                               Runtime
//!   │                                   │
//!   │──── play() / rewind() ──────────►│ 准备本次播放
//!   │                                   │
//!   │──── update(dt) ─────────────────►│ 推进计时器、触发任务、写入属性
//!   │◄─── Vec<ClipEvent> ───────────────│
//!   │                                   │
//! ```
//!
//! ## 核心类型
//!
//! - [`Clip`]：一个元素上的一个可逆效果
//! - [`EffectDefinition`] / [`EffectFrameSet`]：效果组合协议
//! - [`ClipFactory`] / [`EffectBank`]：按类别和名称创建 clip
//! - [`ClipDriver`]：统一推进多个 clip
//! - [`PhaseTimer`]：delay → active → end-delay 三段计时
//! - [`TaskScheduler`]：挂在时间线坐标上的任务与等待点
//!
//! ## 使用示例
//!
//! ```ignore
//! use clip_runtime::{ClipFactory, EffectArgs, EntranceEffect, MemoryElement, Visibility};
//!
//! let element = MemoryElement::new("title").with_visibility(Visibility::Unrendered);
//! let factory = ClipFactory::builtin();
//! let mut clip = factory.entrance(element.handle(), EntranceEffect::FadeIn, EffectArgs::new(), None)?;
//!
//! let done = clip.play()?;
//! while !done.is_settled() {
//!     for event in clip.update(1.0 / 60.0) {
//!         host.handle(event);
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`easing`] / [`tween`]：缓动与插值
//! - [`config`]：clip 配置与分层合并
//! - [`keyframes`]：关键帧与采样
//! - [`phase`]：阶段、方向、时间线坐标与计时器
//! - [`schedule`]：任务调度
//! - [`effect`]：效果组合协议与效果库
//! - [`clip`]：clip 状态机、类别钩子与工厂
//! - [`scroll`]：滚动锚点栈
//! - [`driver`]：clip 驱动器
//! - [`error`]：错误类型定义

pub mod clip;
pub mod config;
pub mod deferred;
pub mod driver;
pub mod easing;
pub mod effect;
pub mod element;
pub mod error;
pub mod keyframes;
pub mod phase;
pub mod schedule;
pub mod scroll;
pub mod tween;

// 重导出核心类型
pub use clip::{Clip, ClipEvent, ClipFactory, ClipId, ClipSnapshot, ClipStatus, EffectCategory};
pub use config::{ClipConfig, ClipConfigPartial, Composite, FillMode};
pub use deferred::Deferred;
pub use driver::ClipDriver;
pub use easing::{Easing, StepPosition};
pub use effect::{
    BuildContext, BuiltinEffect, CompositionFrequency, ConnectorEntranceEffect,
    ConnectorExitEffect, ConnectorSetterEffect, EffectArg, EffectArgs, EffectBank,
    EffectBankBuilder, EffectDefinition, EffectFrameSet, EmphasisEffect, EntranceEffect,
    ExitEffect, MotionEffect, Mutator, ScrollEffect, TransitionEffect, mutator,
};
pub use element::{HideType, MemoryElement, Visibility, VisualElement};
pub use error::{ClipError, ClipResult, ConfigError, EffectError, PlaybackError};
pub use keyframes::{Keyframe, KeyframeTrack, reverse_keyframes};
pub use phase::{Coordinate, Direction, Phase, PhaseTimer};
pub use schedule::{TaskCallbacks, TaskOutcome, TaskScheduler};
pub use scroll::ScrollAnchor;
pub use tween::{TweenContext, tween};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _bank = EffectBank::builtin();
        let _config = ClipConfig::default();
        let _coordinate = Coordinate::new(Phase::Active, 50.0).unwrap();
        let _driver = ClipDriver::new();
        assert_eq!(tween(0.0, 10.0, 0.5, Easing::Linear), 5.0);
    }
}
