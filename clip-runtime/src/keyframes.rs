//! # Keyframes 模块
//!
//! 声明式关键帧数据与采样。
//!
//! 关键帧列表在每次播放开始时由生成器产出，编译成按属性划分的
//! [`KeyframeTrack`]，之后每个时间步按进度采样并写回元素。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Composite;
use crate::easing::Easing;
use crate::error::ConfigError;

/// 单个关键帧
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframe {
    /// 在活跃阶段中的位置 (0.0 - 1.0)，缺省时均匀分布
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
    /// 从本帧到下一帧使用的缓动
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
    /// 本帧的合成方式，缺省时使用 clip 配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<Composite>,
    pub values: BTreeMap<String, f32>,
}

impl Keyframe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(offset: f32) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn set(mut self, property: impl Into<String>, value: f32) -> Self {
        self.values.insert(property.into(), value);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn with_composite(mut self, composite: Composite) -> Self {
        self.composite = Some(composite);
        self
    }

    pub fn value(&self, property: &str) -> Option<f32> {
        self.values.get(property).copied()
    }
}

/// 计算每一帧的实际 offset
///
/// 显式 offset 必须在 `[0, 1]` 内且不递减；两帧及以上时首帧缺省为 0、
/// 末帧缺省为 1，单帧缺省为 1；中间缺省帧在相邻已知帧之间均匀分布。
pub fn compute_offsets(frames: &[Keyframe]) -> Result<Vec<f32>, ConfigError> {
    let mut previous = f32::NEG_INFINITY;
    for (index, frame) in frames.iter().enumerate() {
        if let Some(offset) = frame.offset {
            if !(0.0..=1.0).contains(&offset) || offset < previous {
                return Err(ConfigError::InvalidKeyframeOffset { index, offset });
            }
            previous = offset;
        }
    }

    let count = frames.len();
    let mut offsets: Vec<Option<f32>> = frames.iter().map(|f| f.offset).collect();
    match count {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![offsets[0].unwrap_or(1.0)]),
        _ => {}
    }
    offsets[0].get_or_insert(0.0);
    offsets[count - 1].get_or_insert(1.0);

    // 首尾已确定，逐段填充缺口
    let mut start = 0;
    let mut start_value = offsets[0].unwrap_or(0.0);
    for end in 1..count {
        let Some(end_value) = offsets[end] else {
            continue;
        };
        let gap = (end - start) as f32;
        for (step, slot) in offsets[start + 1..end].iter_mut().enumerate() {
            *slot = Some(start_value + (end_value - start_value) * (step + 1) as f32 / gap);
        }
        start = end;
        start_value = end_value;
    }

    Ok(offsets.into_iter().map(|o| o.unwrap_or(1.0)).collect())
}

/// 关键帧列表的时间反转
///
/// 顺序倒置、offset 镜像为 `1 - o`，每段缓动改为原段缓动的时间反向，
/// 因此倒放得到的曲线与正放的曲线在时间上严格对称。
pub fn reverse_keyframes(frames: &[Keyframe]) -> Result<Vec<Keyframe>, ConfigError> {
    let offsets = compute_offsets(frames)?;
    let count = frames.len();
    let reversed = (0..count)
        .map(|i| {
            let source = count - 1 - i;
            // 倒放后本帧开始的段，对应原列表中结束于 source 的段
            let easing = source
                .checked_sub(1)
                .map(|prev| frames[prev].easing.unwrap_or_default().reversed());
            Keyframe {
                offset: Some(1.0 - offsets[source]),
                easing,
                composite: frames[source].composite,
                values: frames[source].values.clone(),
            }
        })
        .collect();
    Ok(reversed)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StopValue {
    Explicit(f32),
    /// 缺少 0 或 1 处的帧时，用元素原值补齐
    Underlying,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Stop {
    offset: f32,
    value: StopValue,
    easing: Easing,
    composite: Composite,
}

impl Stop {
    fn resolve(&self, underlying: f32) -> f32 {
        match self.value {
            StopValue::Explicit(value) => self.composite.combine(underlying, value),
            StopValue::Underlying => underlying,
        }
    }
}

/// 编译后的关键帧轨道
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeTrack {
    properties: BTreeMap<String, Vec<Stop>>,
}

impl KeyframeTrack {
    /// 编译关键帧列表
    pub fn compile(frames: &[Keyframe], default_composite: Composite) -> Result<Self, ConfigError> {
        let offsets = compute_offsets(frames)?;
        let mut properties: BTreeMap<String, Vec<Stop>> = BTreeMap::new();

        for (frame, offset) in frames.iter().zip(offsets) {
            if let Some(easing) = &frame.easing {
                easing.validate()?;
            }
            for (name, value) in &frame.values {
                properties.entry(name.clone()).or_default().push(Stop {
                    offset,
                    value: StopValue::Explicit(*value),
                    easing: frame.easing.unwrap_or_default(),
                    composite: frame.composite.unwrap_or(default_composite),
                });
            }
        }

        for stops in properties.values_mut() {
            let implicit = |offset| Stop {
                offset,
                value: StopValue::Underlying,
                easing: Easing::Linear,
                composite: Composite::Replace,
            };
            if stops.first().is_some_and(|s| s.offset > 0.0) {
                stops.insert(0, implicit(0.0));
            }
            if stops.last().is_some_and(|s| s.offset < 1.0) {
                stops.push(implicit(1.0));
            }
        }

        Ok(Self { properties })
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// 轨道涉及的属性名
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// 在进度 `progress` 处采样所有属性
    ///
    /// `underlying` 中缺少的属性按 0 处理。
    pub fn sample(&self, progress: f32, underlying: &BTreeMap<String, f32>) -> Vec<(String, f32)> {
        self.properties
            .iter()
            .map(|(name, stops)| {
                let base = underlying.get(name).copied().unwrap_or(0.0);
                (name.clone(), sample_stops(stops, progress, base))
            })
            .collect()
    }
}

fn sample_stops(stops: &[Stop], progress: f32, underlying: f32) -> f32 {
    let idx = stops.partition_point(|s| s.offset <= progress);
    if idx == 0 {
        return stops.first().map_or(underlying, |s| s.resolve(underlying));
    }
    if idx >= stops.len() {
        return stops.last().map_or(underlying, |s| s.resolve(underlying));
    }

    let a = &stops[idx - 1];
    let b = &stops[idx];
    let span = b.offset - a.offset;
    if span <= 0.0 {
        return b.resolve(underlying);
    }
    let t = a.easing.apply((progress - a.offset) / span);
    let from = a.resolve(underlying);
    let to = b.resolve(underlying);
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> BTreeMap<String, f32> {
        BTreeMap::new()
    }

    #[test]
    fn test_compute_offsets_distributes_evenly() {
        let frames = vec![Keyframe::new(), Keyframe::new(), Keyframe::new()];
        assert_eq!(compute_offsets(&frames).unwrap(), vec![0.0, 0.5, 1.0]);

        let frames = vec![
            Keyframe::new(),
            Keyframe::new(),
            Keyframe::at(0.5),
            Keyframe::new(),
        ];
        assert_eq!(compute_offsets(&frames).unwrap(), vec![0.0, 0.25, 0.5, 1.0]);

        assert_eq!(compute_offsets(&[Keyframe::new()]).unwrap(), vec![1.0]);
        assert!(compute_offsets(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_compute_offsets_rejects_invalid() {
        let frames = vec![Keyframe::at(0.6), Keyframe::at(0.4)];
        assert!(matches!(
            compute_offsets(&frames),
            Err(ConfigError::InvalidKeyframeOffset { index: 1, .. })
        ));
        assert!(compute_offsets(&[Keyframe::at(1.5)]).is_err());
    }

    #[test]
    fn test_sample_linear() {
        let frames = vec![
            Keyframe::new().set("opacity", 0.0),
            Keyframe::new().set("opacity", 1.0),
        ];
        let track = KeyframeTrack::compile(&frames, Composite::Replace).unwrap();
        assert_eq!(track.sample(0.0, &none()), vec![("opacity".to_string(), 0.0)]);
        assert_eq!(track.sample(0.25, &none()), vec![("opacity".to_string(), 0.25)]);
        assert_eq!(track.sample(1.0, &none()), vec![("opacity".to_string(), 1.0)]);
    }

    #[test]
    fn test_sample_multiple_segments() {
        let frames = vec![
            Keyframe::new().set("x", 0.0),
            Keyframe::at(0.5).set("x", 10.0),
            Keyframe::new().set("x", 0.0),
        ];
        let track = KeyframeTrack::compile(&frames, Composite::Replace).unwrap();
        assert_eq!(track.sample(0.25, &none())[0].1, 5.0);
        assert_eq!(track.sample(0.5, &none())[0].1, 10.0);
        assert_eq!(track.sample(0.75, &none())[0].1, 5.0);
    }

    #[test]
    fn test_implicit_endpoints_use_underlying() {
        let frames = vec![Keyframe::new().set("opacity", 1.0)];
        let track = KeyframeTrack::compile(&frames, Composite::Replace).unwrap();
        let underlying = BTreeMap::from([("opacity".to_string(), 0.5)]);
        assert_eq!(track.sample(0.0, &underlying)[0].1, 0.5);
        assert_eq!(track.sample(0.5, &underlying)[0].1, 0.75);
        assert_eq!(track.sample(1.0, &underlying)[0].1, 1.0);
    }

    #[test]
    fn test_accumulate_composite() {
        let frames = vec![Keyframe::new().set("x", 0.0), Keyframe::new().set("x", 100.0)];
        let track = KeyframeTrack::compile(&frames, Composite::Accumulate).unwrap();
        let underlying = BTreeMap::from([("x".to_string(), 50.0)]);
        assert_eq!(track.sample(0.0, &underlying)[0].1, 50.0);
        assert_eq!(track.sample(1.0, &underlying)[0].1, 150.0);
    }

    #[test]
    fn test_per_frame_composite_overrides_default() {
        let frames = vec![
            Keyframe::new().set("x", 0.0),
            Keyframe::new().set("x", 10.0).with_composite(Composite::Add),
        ];
        let track = KeyframeTrack::compile(&frames, Composite::Replace).unwrap();
        let underlying = BTreeMap::from([("x".to_string(), 5.0)]);
        assert_eq!(track.sample(0.0, &underlying)[0].1, 0.0);
        assert_eq!(track.sample(1.0, &underlying)[0].1, 15.0);
    }

    #[test]
    fn test_compile_rejects_invalid_frame_easing() {
        let frames = vec![
            Keyframe::new()
                .set("x", 0.0)
                .with_easing(Easing::CubicBezier(f32::NAN, 0.0, 0.5, 1.0)),
            Keyframe::new().set("x", 10.0),
        ];
        assert!(matches!(
            KeyframeTrack::compile(&frames, Composite::Replace),
            Err(ConfigError::InvalidEasing { .. })
        ));

        let frames = vec![
            Keyframe::new()
                .set("x", 0.0)
                .with_easing(Easing::CubicBezier(1.5, 0.0, 0.5, 1.0)),
            Keyframe::new().set("x", 10.0),
        ];
        assert!(KeyframeTrack::compile(&frames, Composite::Replace).is_err());
    }

    #[test]
    fn test_reverse_keyframes() {
        let frames = vec![
            Keyframe::new().set("x", 0.0).with_easing(Easing::EaseIn),
            Keyframe::at(0.25).set("x", 10.0),
            Keyframe::new().set("x", 20.0),
        ];
        let reversed = reverse_keyframes(&frames).unwrap();
        assert_eq!(reversed.len(), 3);
        assert_eq!(reversed[0].offset, Some(0.0));
        assert_eq!(reversed[0].value("x"), Some(20.0));
        assert_eq!(reversed[0].easing, Some(Easing::Linear));
        assert_eq!(reversed[1].offset, Some(0.75));
        assert_eq!(reversed[1].easing, Some(Easing::EaseOut));
        assert_eq!(reversed[2].offset, Some(1.0));
        assert_eq!(reversed[2].easing, None);

        let forward = KeyframeTrack::compile(&frames, Composite::Replace).unwrap();
        let backward = KeyframeTrack::compile(&reversed, Composite::Replace).unwrap();
        for i in 0..=8 {
            let t = i as f32 / 8.0;
            let a = forward.sample(1.0 - t, &none())[0].1;
            let b = backward.sample(t, &none())[0].1;
            assert!((a - b).abs() < 1e-2, "t = {t}: {a} vs {b}");
        }
    }
}
