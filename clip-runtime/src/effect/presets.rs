//! # Presets
//!
//! 内置效果定义。每个类别一到两个，只用于让工厂开箱可用，
//! 不是完整的效果目录。
//!
//! | 类别 | 名称 | 说明 |
//! |------|------|------|
//! | entrance | `appear` / `fade-in` | 瞬间出现 / opacity 0 → 1 |
//! | exit | `disappear` / `fade-out` | 瞬间消失 / opacity 1 → 0 |
//! | emphasis | `highlight` / `pulse` | mutator 驱动 highlight / scale 放大复原 |
//! | motion | `translate` | 平移 `(x, y)`，显式提供反向关键帧 |
//! | transition | `fade-to` | opacity 从当前值过渡到目标值 |
//! | connector-setter | `set` | 把命名参数直接写入属性 |
//! | connector-entrance | `trace` | trace 0 → 1 |
//! | connector-exit | `untrace` | trace 1 → 0 |
//! | scroll | `scroll-to` | scroll_top / scroll_left 滚动到目标 |

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::registry::{
    BuiltinEffect, ConnectorEntranceEffect, ConnectorExitEffect, ConnectorSetterEffect,
    EffectBank, EmphasisEffect, EntranceEffect, ExitEffect, MotionEffect, ScrollEffect,
    TransitionEffect,
};
use super::{BuildContext, CompositionFrequency, EffectArg, EffectDefinition, EffectFrameSet, mutator};
use crate::config::ClipConfigPartial;
use crate::error::{ClipError, ClipResult, ConfigError};
use crate::keyframes::{Keyframe, reverse_keyframes};

/// 内置效果使用的属性名与默认参数
pub mod defaults {
    /// 不透明度
    pub const OPACITY: &str = "opacity";
    /// 高亮强度
    pub const HIGHLIGHT: &str = "highlight";
    /// 缩放
    pub const SCALE: &str = "scale";
    /// 水平位移
    pub const TRANSLATE_X: &str = "translate_x";
    /// 垂直位移
    pub const TRANSLATE_Y: &str = "translate_y";
    /// 连接线描出比例
    pub const TRACE: &str = "trace";
    /// 垂直滚动位置
    pub const SCROLL_TOP: &str = "scroll_top";
    /// 水平滚动位置
    pub const SCROLL_LEFT: &str = "scroll_left";
    /// pulse 默认放大倍数
    pub const PULSE_SCALE: f32 = 1.1;
}

pub(super) fn builtin_bank() -> EffectBank {
    fn entry<E: BuiltinEffect>(
        effect: E,
        definition: EffectDefinition,
    ) -> (crate::clip::EffectCategory, &'static str, EffectDefinition) {
        (E::CATEGORY, effect.as_str(), definition)
    }

    EffectBank::from_builtin(vec![
        entry(EntranceEffect::Appear, instant()),
        entry(EntranceEffect::FadeIn, ramp(defaults::OPACITY, 0.0, 1.0)),
        entry(ExitEffect::Disappear, instant()),
        entry(ExitEffect::FadeOut, fade_out()),
        entry(EmphasisEffect::Highlight, highlight()),
        entry(EmphasisEffect::Pulse, pulse()),
        entry(MotionEffect::Translate, translate()),
        entry(TransitionEffect::FadeTo, fade_to()),
        entry(ConnectorSetterEffect::Set, set_properties()),
        entry(ConnectorEntranceEffect::Trace, ramp(defaults::TRACE, 0.0, 1.0)),
        entry(ConnectorExitEffect::Untrace, ramp(defaults::TRACE, 1.0, 0.0)),
        entry(ScrollEffect::ScrollTo, scroll_to()),
    ])
}

fn two_frames(property: &str, from: f32, to: f32) -> Vec<Keyframe> {
    vec![
        Keyframe::new().set(property, from),
        Keyframe::new().set(property, to),
    ]
}

/// 零时长、无关键帧；只依赖类别钩子切换可见性
fn instant() -> EffectDefinition {
    EffectDefinition::new(|_| Ok(EffectFrameSet::new().with_forward_keyframes(|| Ok(Vec::new()))))
        .with_immutable(ClipConfigPartial::new().duration(0.0))
}

/// 单属性线性过渡，反向由反转合成
fn ramp(property: &'static str, from: f32, to: f32) -> EffectDefinition {
    EffectDefinition::new(move |_| {
        Ok(EffectFrameSet::new().with_forward_keyframes(move || Ok(two_frames(property, from, to))))
    })
}

fn fade_out() -> EffectDefinition {
    EffectDefinition::new(|_| {
        Ok(EffectFrameSet::new().with_forward_keyframes(|| {
            Ok(reverse_keyframes(&two_frames(defaults::OPACITY, 0.0, 1.0))?)
        }))
    })
}

fn highlight() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let element = ctx.element();
        Ok(EffectFrameSet::new().with_forward_mutator(move || {
            let element = element.clone();
            Ok(mutator(move |tween| {
                element.set_property(defaults::HIGHLIGHT, tween.tween(0.0, 1.0));
                Ok(())
            }))
        }))
    })
}

fn pulse() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let factor = ctx
            .args
            .number_or(ctx.effect_name, "scale", 0, defaults::PULSE_SCALE)?;
        Ok(EffectFrameSet::new().with_forward_keyframes(move || {
            Ok(vec![
                Keyframe::new().set(defaults::SCALE, 1.0),
                Keyframe::new().set(defaults::SCALE, factor),
                Keyframe::new().set(defaults::SCALE, 1.0),
            ])
        }))
    })
}

/// 平移。motion 类别默认 accumulate 合成，反转合成不会回到原位，
/// 因此显式提供反向关键帧。
fn translate() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let dx = ctx.args.number_or(ctx.effect_name, "x", 0, 0.0)?;
        let dy = ctx.args.number_or(ctx.effect_name, "y", 1, 0.0)?;
        let offset = |x: f32, y: f32| {
            vec![
                Keyframe::new()
                    .set(defaults::TRANSLATE_X, 0.0)
                    .set(defaults::TRANSLATE_Y, 0.0),
                Keyframe::new()
                    .set(defaults::TRANSLATE_X, x)
                    .set(defaults::TRANSLATE_Y, y),
            ]
        };
        Ok(EffectFrameSet::new()
            .with_forward_keyframes(move || Ok(offset(dx, dy)))
            .with_backward_keyframes(move || Ok(offset(-dx, -dy))))
    })
}

/// 起点在每次 play 时从元素读取
fn fade_to() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let target = ctx.args.number(ctx.effect_name, "opacity", 0)?;
        let from = ctx.element.get_property(defaults::OPACITY).unwrap_or(1.0);
        Ok(EffectFrameSet::new()
            .with_forward_keyframes(move || Ok(two_frames(defaults::OPACITY, from, target))))
    })
    .with_frequency(CompositionFrequency::OnEveryPlay)
}

/// 正向写入命名参数，反向恢复写入前的值
fn set_properties() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let values = numeric_named_args(ctx)?;
        let element = ctx.element();
        let previous: Rc<RefCell<BTreeMap<String, f32>>> = Rc::default();
        let saved = previous.clone();

        Ok(EffectFrameSet::new()
            .with_forward_keyframes(move || {
                let mut saved = saved.borrow_mut();
                saved.clear();
                let mut frame = Keyframe::new();
                for (name, value) in &values {
                    if let Some(current) = element.get_property(name) {
                        saved.insert(name.clone(), current);
                    }
                    frame = frame.set(name.clone(), *value);
                }
                Ok(vec![frame])
            })
            .with_backward_keyframes(move || {
                let frame = previous
                    .borrow()
                    .iter()
                    .fold(Keyframe::new(), |frame, (name, value)| frame.set(name.clone(), *value));
                Ok(vec![frame])
            }))
    })
}

fn numeric_named_args(ctx: &BuildContext<'_>) -> ClipResult<BTreeMap<String, f32>> {
    ctx.args
        .named_entries()
        .map(|(name, arg)| match arg {
            EffectArg::Number(n) if n.is_finite() => Ok((name.to_string(), *n)),
            other => Err(ClipError::from(ConfigError::InvalidArgument {
                effect: ctx.effect_name.to_string(),
                param: name.to_string(),
                message: format!("期望有限数字，实际为 {other}"),
            })),
        })
        .collect()
}

/// 起点在正向播放开始时记录，反向滚动回该起点
fn scroll_to() -> EffectDefinition {
    EffectDefinition::new(|ctx| {
        let top = ctx.args.number(ctx.effect_name, "top", 0)?;
        let left = ctx.args.number_or(ctx.effect_name, "left", 1, 0.0)?;
        let origin: Rc<Cell<Option<(f32, f32)>>> = Rc::default();

        let forward_element = ctx.element();
        let forward_origin = origin.clone();
        let backward_element = ctx.element();

        Ok(EffectFrameSet::new()
            .with_forward_mutator(move || {
                let element = forward_element.clone();
                let start = (
                    element.get_property(defaults::SCROLL_TOP).unwrap_or(0.0),
                    element.get_property(defaults::SCROLL_LEFT).unwrap_or(0.0),
                );
                forward_origin.set(Some(start));
                Ok(mutator(move |tween| {
                    element.set_property(defaults::SCROLL_TOP, tween.tween(start.0, top));
                    element.set_property(defaults::SCROLL_LEFT, tween.tween(start.1, left));
                    Ok(())
                }))
            })
            .with_backward_mutator(move || {
                let element = backward_element.clone();
                let (origin_top, origin_left) = origin.get().unwrap_or((top, left));
                Ok(mutator(move |tween| {
                    element.set_property(defaults::SCROLL_TOP, tween.tween(top, origin_top));
                    element.set_property(defaults::SCROLL_LEFT, tween.tween(left, origin_left));
                    Ok(())
                }))
            }))
    })
    .with_frequency(CompositionFrequency::OnEveryPlay)
}
