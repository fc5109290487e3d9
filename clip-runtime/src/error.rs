//! # Error 模块
//!
//! 定义 clip-runtime 中使用的错误类型。
//!
//! - [`ConfigError`]：构造阶段同步抛出（配置、参数、注册表）
//! - [`PlaybackError`]：`play()` / `rewind()` 调用时同步抛出
//! - [`EffectError`]：播放过程中由生成器或任务产生，通过 [`Deferred`](crate::Deferred) 传递
//!
//! 每条消息都由诊断描述和 `提示：` 修复建议组成。

use thiserror::Error;

use crate::clip::{ClipStatus, EffectCategory};
use crate::element::Visibility;

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 无效的隐藏方式
    #[error("无效的隐藏方式 '{value}'；提示：可选值为 display-none 或 visibility-hidden")]
    InvalidHideType { value: String },

    /// 未知的效果类别
    #[error(
        "未知的效果类别 '{value}'；提示：可选值为 entrance、exit、emphasis、motion、transition、connector-setter、connector-entrance、connector-exit 或 scroll"
    )]
    UnknownCategory { value: String },

    /// 无效的缓动函数
    #[error(
        "无效的缓动函数 '{value}'；提示：可选值为 linear、ease、ease-in、ease-out、ease-in-out、cubic-bezier(x1, y1, x2, y2) 或 steps(n[, start|end])"
    )]
    InvalidEasing { value: String },

    /// 无效的时长
    #[error("配置项 '{field}' 的值 {value} 无效；提示：时长必须是非负有限数（单位：秒）")]
    InvalidDuration { field: &'static str, value: f32 },

    /// 无效的播放速率
    #[error("播放速率 {value} 无效；提示：playback_rate 必须是大于 0 的有限数")]
    InvalidPlaybackRate { value: f32 },

    /// 无效的进度百分比
    #[error("进度百分比 {value} 无效；提示：百分比必须在 0 到 100 之间")]
    InvalidPercentage { value: f32 },

    /// 无效的关键帧偏移
    #[error("第 {index} 个关键帧的 offset {offset} 无效；提示：offset 必须在 0 到 1 之间且不递减")]
    InvalidKeyframeOffset { index: usize, offset: f32 },

    /// 效果不存在
    #[error("{category} 类别中不存在效果 '{name}'；提示：可用效果为 [{available}]")]
    UnknownEffect {
        category: EffectCategory,
        name: String,
        available: String,
    },

    /// 效果重复注册
    #[error("{category} 类别中已存在效果 '{name}'；提示：内置效果不能被覆盖，请为自定义效果换一个名称")]
    DuplicateEffect {
        category: EffectCategory,
        name: String,
    },

    /// 效果名称为空
    #[error("{category} 类别中存在空的效果名称；提示：注册效果时提供非空名称")]
    EmptyEffectName { category: EffectCategory },

    /// 缺少效果参数
    #[error("效果 '{effect}' 缺少参数 '{param}'；提示：按位置或名称提供该参数")]
    MissingArgument { effect: String, param: String },

    /// 无效的效果参数
    #[error("效果 '{effect}' 的参数 '{param}' 无效 - {message}；提示：检查参数类型与取值")]
    InvalidArgument {
        effect: String,
        param: String,
        message: String,
    },

    /// 配置解析失败
    #[error("配置解析失败 - {message}；提示：检查 JSON 字段名与取值")]
    Malformed { message: String },
}

/// 播放前置条件错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// 当前状态不允许此操作
    #[error(
        "clip '{label}' 无法在 {status} 状态下执行 {action}；提示：play() 只能在 idle 或 finished-backward 状态调用，rewind() 只能在 finished-forward 状态调用，请先等待上一次播放完成"
    )]
    InvalidTransition {
        label: String,
        action: &'static str,
        status: ClipStatus,
    },

    /// 元素可见性与效果类别不匹配
    #[error(
        "{category} 效果要求元素 '{label}' 处于{expected}状态，实际为 {actual}；提示：entrance 只能作用于隐藏元素，exit 只能作用于可见元素"
    )]
    VisibilityMismatch {
        label: String,
        category: EffectCategory,
        expected: &'static str,
        actual: Visibility,
    },

    /// clip 已因错误中止
    #[error("clip '{label}' 已因错误中止；提示：查看上一次 play/rewind 返回的 Deferred 中的错误，然后重新创建 clip")]
    Faulted { label: String },

    /// driver 中不存在该 clip
    #[error("clip '{id}' 不存在；提示：先通过 ClipDriver::insert 注册 clip")]
    UnknownClip { id: String },
}

/// 效果执行错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    /// 生成器执行失败
    #[error("效果 '{effect}' 的生成器执行失败 - {message}；提示：检查效果定义中的 builder、关键帧生成器与 mutator")]
    Generator { effect: String, message: String },

    /// 效果帧集合为空
    #[error(
        "效果 '{effect}' 没有提供任何生成器；提示：至少提供 forward/backward 关键帧生成器或 forward/backward mutator 之一"
    )]
    EmptyFrameSet { effect: String },

    /// 违反效果的使用限制
    #[error("效果 '{effect}' 违反使用限制 - {message}；提示：该效果不能与其它 clip 同时使用")]
    Exclusivity { effect: String, message: String },

    /// 调度任务执行失败
    #[error("调度任务执行失败 - {message}；提示：检查 schedule_task 注册的回调")]
    Task { message: String },
}

impl EffectError {
    /// 构造生成器错误
    pub fn generator(effect: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generator {
            effect: effect.into(),
            message: message.into(),
        }
    }

    /// 构造任务错误
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

/// clip-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 播放错误
    #[error("播放错误: {0}")]
    Playback(#[from] PlaybackError),

    /// 效果错误
    #[error("效果错误: {0}")]
    Effect(#[from] EffectError),
}

/// Result 类型别名
pub type ClipResult<T> = Result<T, ClipError>;
