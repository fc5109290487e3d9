//! # Config 模块
//!
//! clip 的时间与呈现配置。
//!
//! ## 合并顺序
//!
//! 后者覆盖前者，不可变层永远最后生效：
//!
//! 1. 框架默认值（[`ClipConfig::default`]）
//! 2. 类别默认值
//! 3. 效果作者默认值
//! 4. 调用方覆盖
//! 5. 类别不可变值
//! 6. 效果作者不可变值

use serde::{Deserialize, Deserializer, Serialize};

use crate::easing::Easing;
use crate::element::HideType;
use crate::error::ConfigError;

/// 关键帧值与元素原值的合成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Composite {
    /// 覆盖原值
    #[default]
    Replace,
    /// 叠加在原值上
    Add,
    /// 累加在原值上
    Accumulate,
}

impl Composite {
    /// 把关键帧值与原值合成
    pub fn combine(self, underlying: f32, value: f32) -> f32 {
        match self {
            Composite::Replace => value,
            Composite::Add | Composite::Accumulate => underlying + value,
        }
    }
}

/// 活跃阶段之外是否保持效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// 两侧都不保持
    None,
    /// 结束后保持最后一帧
    #[default]
    Forwards,
    /// 延迟阶段提前应用第一帧
    Backwards,
    /// 两侧都保持
    Both,
}

impl FillMode {
    /// 延迟阶段是否应用第一帧
    pub fn applies_backwards(self) -> bool {
        matches!(self, FillMode::Backwards | FillMode::Both)
    }

    /// 活跃阶段结束后是否保留最后一帧
    pub fn holds_forwards(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }
}

/// 合并完成的 clip 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// 活跃阶段时长（秒）
    #[serde(default = "default_duration")]
    pub duration: f32,

    /// 延迟阶段时长（秒）
    #[serde(default)]
    pub delay: f32,

    /// 结束延迟阶段时长（秒）
    #[serde(default)]
    pub end_delay: f32,

    /// 播放速率，帧时间乘以该值后推进计时器
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f32,

    #[serde(default)]
    pub easing: Easing,

    #[serde(default)]
    pub composite: Composite,

    #[serde(default)]
    pub fill: FillMode,

    /// 构造时立即隐藏元素（仅 entrance 类别生效）
    #[serde(default)]
    pub hide_now_type: Option<HideType>,

    /// exit 类别播放结束后的隐藏方式
    #[serde(default)]
    pub exit_type: HideType,
}

fn default_duration() -> f32 {
    0.5
}

fn default_playback_rate() -> f32 {
    1.0
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            delay: 0.0,
            end_delay: 0.0,
            playback_rate: default_playback_rate(),
            easing: Easing::Linear,
            composite: Composite::Replace,
            fill: FillMode::Forwards,
            hide_now_type: None,
            exit_type: HideType::Unrendered,
        }
    }
}

impl ClipConfig {
    /// 依次应用各层部分配置并校验
    pub fn resolve<'a>(
        layers: impl IntoIterator<Item = &'a ClipConfigPartial>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for layer in layers {
            layer.apply_to(&mut config);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("duration", self.duration),
            ("delay", self.delay),
            ("end_delay", self.end_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(ConfigError::InvalidPlaybackRate {
                value: self.playback_rate,
            });
        }
        self.easing.validate()
    }
}

/// 部分配置：每个字段都是可选的
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClipConfigPartial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_delay: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<Composite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillMode>,
    /// 外层 `None` 表示未设置，`Some(None)` 表示显式关闭
    #[serde(
        deserialize_with = "deserialize_explicit",
        skip_serializing_if = "Option::is_none"
    )]
    pub hide_now_type: Option<Option<HideType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_type: Option<HideType>,
}

/// 区分字段缺失与显式 `null`
fn deserialize_explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ClipConfigPartial {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Malformed {
            message: e.to_string(),
        })
    }

    pub fn duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = Some(seconds);
        self
    }

    pub fn end_delay(mut self, seconds: f32) -> Self {
        self.end_delay = Some(seconds);
        self
    }

    pub fn playback_rate(mut self, rate: f32) -> Self {
        self.playback_rate = Some(rate);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn composite(mut self, composite: Composite) -> Self {
        self.composite = Some(composite);
        self
    }

    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn hide_now_type(mut self, hide: Option<HideType>) -> Self {
        self.hide_now_type = Some(hide);
        self
    }

    pub fn exit_type(mut self, hide: HideType) -> Self {
        self.exit_type = Some(hide);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 合并两层部分配置，`over` 中已设置的字段优先
    pub fn merge(&self, over: &ClipConfigPartial) -> ClipConfigPartial {
        ClipConfigPartial {
            duration: over.duration.or(self.duration),
            delay: over.delay.or(self.delay),
            end_delay: over.end_delay.or(self.end_delay),
            playback_rate: over.playback_rate.or(self.playback_rate),
            easing: over.easing.or(self.easing),
            composite: over.composite.or(self.composite),
            fill: over.fill.or(self.fill),
            hide_now_type: over.hide_now_type.or(self.hide_now_type),
            exit_type: over.exit_type.or(self.exit_type),
        }
    }

    /// 把已设置的字段写入完整配置
    pub fn apply_to(&self, config: &mut ClipConfig) {
        if let Some(v) = self.duration {
            config.duration = v;
        }
        if let Some(v) = self.delay {
            config.delay = v;
        }
        if let Some(v) = self.end_delay {
            config.end_delay = v;
        }
        if let Some(v) = self.playback_rate {
            config.playback_rate = v;
        }
        if let Some(v) = self.easing {
            config.easing = v;
        }
        if let Some(v) = self.composite {
            config.composite = v;
        }
        if let Some(v) = self.fill {
            config.fill = v;
        }
        if let Some(v) = self.hide_now_type {
            config.hide_now_type = v;
        }
        if let Some(v) = self.exit_type {
            config.exit_type = v;
        }
    }
}
