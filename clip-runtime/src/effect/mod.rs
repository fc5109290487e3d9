//! # Effect 模块
//!
//! 效果组合协议：效果定义如何为每次播放产出动画数据。
//!
//! ## 核心组件
//!
//! - [`EffectDefinition`]：可复用的具名效果配方（默认配置、不可变配置、
//!   重建频率、builder）
//! - [`EffectFrameSet`]：builder 的产物，最多四个生成器
//! - [`CompositionFrequency`]：何时重新运行 builder
//! - [`EffectBank`]：按类别和名称查找效果定义
//!
//! ## 省略与反转
//!
//! 关键帧与 mutator 是两对相互独立的生成器。某一对中只提供一个方向时，
//! 另一个方向由反转合成：
//!
//! ```text
//! 关键帧：  backward(t) = forward(1 - t)
//! mutator： backward 调用 forward mutator，tween(a, b) 交换为 b → a
//! ```
//!
//! 引擎不会验证反转结果是否真的回到起点（例如 accumulate 合成的位移），
//! 需要时由作者显式提供反向生成器。

pub mod args;
pub mod presets;
pub mod registry;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub use args::{EffectArg, EffectArgs};
pub use registry::{
    BuiltinEffect, ConnectorEntranceEffect, ConnectorExitEffect, ConnectorSetterEffect,
    EffectBank, EffectBankBuilder, EmphasisEffect, EntranceEffect, ExitEffect, MotionEffect,
    ScrollEffect, TransitionEffect,
};

use crate::clip::EffectCategory;
use crate::config::{ClipConfig, ClipConfigPartial};
use crate::element::VisualElement;
use crate::error::{ClipResult, EffectError};
use crate::keyframes::Keyframe;
use crate::phase::Direction;
use crate::tween::TweenContext;

/// 关键帧生成器
pub type KeyframeGenerator = Box<dyn FnMut() -> ClipResult<Vec<Keyframe>>>;

/// 每个时间步调用的过程
pub type Mutator = Box<dyn FnMut(&TweenContext) -> ClipResult<()>>;

/// mutator 生成器
pub type MutatorGenerator = Box<dyn FnMut() -> ClipResult<Mutator>>;

/// builder 签名
pub type EffectBuilder = dyn Fn(&BuildContext<'_>) -> ClipResult<EffectFrameSet>;

/// 把闭包装箱为 [`Mutator`]
pub fn mutator(f: impl FnMut(&TweenContext) -> ClipResult<()> + 'static) -> Mutator {
    Box::new(f)
}

/// builder 重新运行的频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositionFrequency {
    /// 只在第一次 `play()` 时运行
    #[default]
    OnFirstPlayOnly,
    /// 每次 `play()` 时运行，随后的 `rewind()` 复用
    OnEveryPlay,
    /// 每次 `play()` 与 `rewind()` 前都运行
    OnEveryPlayAndRewind,
}

impl CompositionFrequency {
    /// 本次播放前是否需要运行 builder
    pub fn rebuilds_on(self, direction: Direction, has_frame_set: bool) -> bool {
        if !has_frame_set {
            return true;
        }
        match (self, direction) {
            (CompositionFrequency::OnFirstPlayOnly, _) => false,
            (CompositionFrequency::OnEveryPlay, Direction::Forward) => true,
            (CompositionFrequency::OnEveryPlay, Direction::Backward) => false,
            (CompositionFrequency::OnEveryPlayAndRewind, _) => true,
        }
    }
}

/// 传给 builder 的显式上下文
pub struct BuildContext<'a> {
    pub element: &'a Rc<dyn VisualElement>,
    pub config: &'a ClipConfig,
    pub args: &'a EffectArgs,
    pub effect_name: &'a str,
    pub category: EffectCategory,
    /// 触发本次构建的播放方向
    pub direction: Direction,
}

impl BuildContext<'_> {
    /// 元素句柄的克隆，便于移入生成器闭包
    pub fn element(&self) -> Rc<dyn VisualElement> {
        self.element.clone()
    }

    /// 构造带效果名的生成器错误
    pub fn error(&self, message: impl Into<String>) -> EffectError {
        EffectError::generator(self.effect_name, message)
    }
}

/// builder 产出的生成器集合
#[derive(Default)]
pub struct EffectFrameSet {
    forward_keyframes: Option<KeyframeGenerator>,
    backward_keyframes: Option<KeyframeGenerator>,
    forward_mutator: Option<MutatorGenerator>,
    backward_mutator: Option<MutatorGenerator>,
    reverse_keyframes_effect: bool,
    reverse_mutator_effect: bool,
}

impl EffectFrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forward_keyframes(
        mut self,
        f: impl FnMut() -> ClipResult<Vec<Keyframe>> + 'static,
    ) -> Self {
        self.forward_keyframes = Some(Box::new(f));
        self
    }

    pub fn with_backward_keyframes(
        mut self,
        f: impl FnMut() -> ClipResult<Vec<Keyframe>> + 'static,
    ) -> Self {
        self.backward_keyframes = Some(Box::new(f));
        self
    }

    pub fn with_forward_mutator(mut self, f: impl FnMut() -> ClipResult<Mutator> + 'static) -> Self {
        self.forward_mutator = Some(Box::new(f));
        self
    }

    pub fn with_backward_mutator(
        mut self,
        f: impl FnMut() -> ClipResult<Mutator> + 'static,
    ) -> Self {
        self.backward_mutator = Some(Box::new(f));
        self
    }

    /// 即使提供了反向关键帧，也使用正向关键帧的反转
    pub fn reverse_keyframes_effect(mut self, enabled: bool) -> Self {
        self.reverse_keyframes_effect = enabled;
        self
    }

    /// 即使提供了反向 mutator，也使用正向 mutator 的反转
    pub fn reverse_mutator_effect(mut self, enabled: bool) -> Self {
        self.reverse_mutator_effect = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.forward_keyframes.is_none()
            && self.backward_keyframes.is_none()
            && self.forward_mutator.is_none()
            && self.backward_mutator.is_none()
    }

    /// 结构校验：至少一个生成器
    pub fn validate(&self, effect: &str) -> Result<(), EffectError> {
        if self.is_empty() {
            return Err(EffectError::EmptyFrameSet {
                effect: effect.to_string(),
            });
        }
        Ok(())
    }

    /// 为一次播放运行生成器，解析省略与反转
    pub(crate) fn plan(&mut self, direction: Direction) -> ClipResult<PassPlan> {
        let (kf_primary, kf_fallback, mut_primary, mut_fallback) = match direction {
            Direction::Forward => (
                &mut self.forward_keyframes,
                &mut self.backward_keyframes,
                &mut self.forward_mutator,
                &mut self.backward_mutator,
            ),
            Direction::Backward => (
                &mut self.backward_keyframes,
                &mut self.forward_keyframes,
                &mut self.backward_mutator,
                &mut self.forward_mutator,
            ),
        };
        let backward = direction == Direction::Backward;

        let keyframes = match pick(kf_primary, kf_fallback, backward && self.reverse_keyframes_effect) {
            Some((generate, reversed)) => Some(PlannedKeyframes {
                frames: generate()?,
                reversed,
            }),
            None => None,
        };
        let mutator = match pick(mut_primary, mut_fallback, backward && self.reverse_mutator_effect) {
            Some((generate, swapped)) => Some(PlannedMutator {
                mutator: generate()?,
                swapped,
            }),
            None => None,
        };

        Ok(PassPlan { keyframes, mutator })
    }
}

impl fmt::Debug for EffectFrameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectFrameSet")
            .field("forward_keyframes", &self.forward_keyframes.is_some())
            .field("backward_keyframes", &self.backward_keyframes.is_some())
            .field("forward_mutator", &self.forward_mutator.is_some())
            .field("backward_mutator", &self.backward_mutator.is_some())
            .field("reverse_keyframes_effect", &self.reverse_keyframes_effect)
            .field("reverse_mutator_effect", &self.reverse_mutator_effect)
            .finish()
    }
}

/// 选择本方向的生成器，返回 `(生成器, 是否来自反方向)`
fn pick<'a, G>(
    primary: &'a mut Option<G>,
    fallback: &'a mut Option<G>,
    prefer_fallback: bool,
) -> Option<(&'a mut G, bool)> {
    if prefer_fallback && fallback.is_some() {
        return fallback.as_mut().map(|g| (g, true));
    }
    if primary.is_some() {
        return primary.as_mut().map(|g| (g, false));
    }
    fallback.as_mut().map(|g| (g, true))
}

/// 一次播放所用的动画数据
pub(crate) struct PassPlan {
    pub keyframes: Option<PlannedKeyframes>,
    pub mutator: Option<PlannedMutator>,
}

pub(crate) struct PlannedKeyframes {
    pub frames: Vec<Keyframe>,
    /// 按 `1 - t` 采样
    pub reversed: bool,
}

pub(crate) struct PlannedMutator {
    pub mutator: Mutator,
    /// 交换 tween 起止值
    pub swapped: bool,
}

/// 具名效果定义
///
/// 构造后冻结，通过 `Rc` 被所有引用它的 clip 共享。
pub struct EffectDefinition {
    default_config: ClipConfigPartial,
    immutable_config: ClipConfigPartial,
    frequency: CompositionFrequency,
    builder: Box<EffectBuilder>,
}

impl EffectDefinition {
    pub fn new(builder: impl Fn(&BuildContext<'_>) -> ClipResult<EffectFrameSet> + 'static) -> Self {
        Self {
            default_config: ClipConfigPartial::default(),
            immutable_config: ClipConfigPartial::default(),
            frequency: CompositionFrequency::default(),
            builder: Box::new(builder),
        }
    }

    pub fn with_defaults(mut self, config: ClipConfigPartial) -> Self {
        self.default_config = config;
        self
    }

    pub fn with_immutable(mut self, config: ClipConfigPartial) -> Self {
        self.immutable_config = config;
        self
    }

    pub fn with_frequency(mut self, frequency: CompositionFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn default_config(&self) -> &ClipConfigPartial {
        &self.default_config
    }

    pub fn immutable_config(&self) -> &ClipConfigPartial {
        &self.immutable_config
    }

    pub fn frequency(&self) -> CompositionFrequency {
        self.frequency
    }

    /// 运行 builder
    pub fn build(&self, ctx: &BuildContext<'_>) -> ClipResult<EffectFrameSet> {
        (self.builder)(ctx)
    }
}

impl fmt::Debug for EffectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectDefinition")
            .field("default_config", &self.default_config)
            .field("immutable_config", &self.immutable_config)
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}
