//! # Easing 模块
//!
//! 缓动函数库，用于把活跃阶段的线性进度映射为插值进度。
//!
//! 取值集合与 CSS 时间函数一致，可从字符串解析（`"ease-in-out"`、
//! `"cubic-bezier(0.4, 0, 0.2, 1)"`、`"steps(4, start)"`），
//! 序列化时也使用同样的字符串形式。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 阶跃函数的跳变位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPosition {
    /// 区间开始时跳变
    Start,
    /// 区间结束时跳变
    #[default]
    End,
}

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    /// 线性（匀速）
    #[default]
    Linear,
    /// CSS `ease`
    Ease,
    /// 缓入（先慢后快）
    EaseIn,
    /// 缓出（先快后慢）
    EaseOut,
    /// 缓入缓出（两头慢中间快）
    EaseInOut,
    /// 三次贝塞尔曲线，控制点为 `(x1, y1)` 与 `(x2, y2)`
    CubicBezier(f32, f32, f32, f32),
    /// 阶跃函数
    Steps { count: u32, position: StepPosition },
}

impl Easing {
    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度 (0.0 - 1.0)，超出范围会被截断
    ///
    /// # 返回
    /// - 缓动后的进度值
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match *self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Easing::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Easing::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Easing::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(x1, y1, x2, y2, t),
            Easing::Steps { count, position } => steps(count, position, t),
        }
    }

    /// 时间反向后的缓动函数
    ///
    /// 满足 `e.reversed().apply(t) == 1 - e.apply(1 - t)`（数值误差内），
    /// 用于把关键帧列表整体倒放时保持每段曲线的形状。
    pub fn reversed(&self) -> Easing {
        match *self {
            Easing::Linear => Easing::Linear,
            Easing::Ease => Easing::CubicBezier(0.75, 0.0, 0.75, 0.9),
            Easing::EaseIn => Easing::EaseOut,
            Easing::EaseOut => Easing::EaseIn,
            Easing::EaseInOut => Easing::EaseInOut,
            Easing::CubicBezier(x1, y1, x2, y2) => {
                Easing::CubicBezier(1.0 - x2, 1.0 - y2, 1.0 - x1, 1.0 - y1)
            }
            Easing::Steps { count, position } => Easing::Steps {
                count,
                position: match position {
                    StepPosition::Start => StepPosition::End,
                    StepPosition::End => StepPosition::Start,
                },
            },
        }
    }

    /// 校验参数合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = match *self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                [x1, y1, x2, y2].iter().all(|v| v.is_finite())
                    && (0.0..=1.0).contains(&x1)
                    && (0.0..=1.0).contains(&x2)
            }
            Easing::Steps { count, .. } => count > 0,
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidEasing {
                value: self.to_string(),
            })
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => write!(f, "linear"),
            Easing::Ease => write!(f, "ease"),
            Easing::EaseIn => write!(f, "ease-in"),
            Easing::EaseOut => write!(f, "ease-out"),
            Easing::EaseInOut => write!(f, "ease-in-out"),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            Easing::Steps { count, position } => match position {
                StepPosition::Start => write!(f, "steps({count}, start)"),
                StepPosition::End => write!(f, "steps({count}, end)"),
            },
        }
    }
}

impl FromStr for Easing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let invalid = || ConfigError::InvalidEasing {
            value: s.to_string(),
        };

        let easing = match text.as_str() {
            "linear" => Easing::Linear,
            "ease" => Easing::Ease,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "step-start" => Easing::Steps {
                count: 1,
                position: StepPosition::Start,
            },
            "step-end" => Easing::Steps {
                count: 1,
                position: StepPosition::End,
            },
            _ => {
                if let Some(inner) = function_args(&text, "cubic-bezier") {
                    let values = inner
                        .split(',')
                        .map(|part| part.trim().parse::<f32>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|_| invalid())?;
                    let [x1, y1, x2, y2] = values.as_slice() else {
                        return Err(invalid());
                    };
                    Easing::CubicBezier(*x1, *y1, *x2, *y2)
                } else if let Some(inner) = function_args(&text, "steps") {
                    let mut parts = inner.split(',').map(str::trim);
                    let count = parts
                        .next()
                        .and_then(|c| c.parse::<u32>().ok())
                        .ok_or_else(invalid)?;
                    let position = match parts.next() {
                        None | Some("end") | Some("jump-end") => StepPosition::End,
                        Some("start") | Some("jump-start") => StepPosition::Start,
                        Some(_) => return Err(invalid()),
                    };
                    if parts.next().is_some() {
                        return Err(invalid());
                    }
                    Easing::Steps { count, position }
                } else {
                    return Err(invalid());
                }
            }
        };

        easing.validate().map_err(|_| invalid())?;
        Ok(easing)
    }
}

impl TryFrom<String> for Easing {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.to_string()
    }
}

/// 提取 `name(...)` 括号内的内容
fn function_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// 三次贝塞尔缓动（端点固定为 (0,0) 与 (1,1)）
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, t: f32) -> f32 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }
    let s = solve_curve_x(x1, x2, t);
    sample_curve(y1, y2, s)
}

/// 曲线在参数 `s` 处的一维坐标
fn sample_curve(p1: f32, p2: f32, s: f32) -> f32 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * s + b) * s + c) * s
}

fn sample_derivative(p1: f32, p2: f32, s: f32) -> f32 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * s + 2.0 * b) * s + c
}

/// 求解 x(s) = x 的参数 s：先牛顿迭代，失败时退回二分
fn solve_curve_x(x1: f32, x2: f32, x: f32) -> f32 {
    const EPSILON: f32 = 1e-6;

    let mut s = x;
    for _ in 0..8 {
        let err = sample_curve(x1, x2, s) - x;
        if err.abs() < EPSILON {
            return s;
        }
        let d = sample_derivative(x1, x2, s);
        if d.abs() < EPSILON {
            break;
        }
        s -= err / d;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..32 {
        let v = sample_curve(x1, x2, s);
        if (v - x).abs() < EPSILON {
            break;
        }
        if x > v {
            lo = s;
        } else {
            hi = s;
        }
        s = lo + (hi - lo) / 2.0;
    }
    s
}

/// 阶跃缓动
fn steps(count: u32, position: StepPosition, t: f32) -> f32 {
    let n = count.max(1) as f32;
    let value = match position {
        StepPosition::Start => (t * n).ceil() / n,
        StepPosition::End => (t * n).floor() / n,
    };
    value.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::Ease,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::CubicBezier(0.4, 0.0, 0.2, 1.0),
        Easing::Steps {
            count: 4,
            position: StepPosition::End,
        },
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-5, "{easing} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-5, "{easing} at 1");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(Easing::Linear.apply(-0.5), 0.0);
        assert_eq!(Easing::Linear.apply(1.5), 1.0);
    }

    #[test]
    fn test_ease_in_out_symmetric() {
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < 1e-3);
        assert!(Easing::EaseIn.apply(0.25) < 0.25);
        assert!(Easing::EaseOut.apply(0.25) > 0.25);
    }

    #[test]
    fn test_linear_bezier_matches_linear() {
        let curve = Easing::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 1..10 {
            let t = i as f32 / 10.0;
            assert!((curve.apply(t) - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_steps() {
        let end = Easing::Steps {
            count: 4,
            position: StepPosition::End,
        };
        assert_eq!(end.apply(0.2), 0.0);
        assert_eq!(end.apply(0.5), 0.5);

        let start = Easing::Steps {
            count: 4,
            position: StepPosition::Start,
        };
        assert_eq!(start.apply(0.2), 0.25);
        assert_eq!(start.apply(1.0), 1.0);
    }

    #[test]
    fn test_reversed_mirrors_curve() {
        for easing in [Easing::Ease, Easing::EaseIn, Easing::EaseOut] {
            let reversed = easing.reversed();
            for i in 1..10 {
                let t = i as f32 / 10.0;
                let expected = 1.0 - easing.apply(1.0 - t);
                assert!((reversed.apply(t) - expected).abs() < 1e-3, "{easing} at {t}");
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("linear".parse::<Easing>().unwrap(), Easing::Linear);
        assert_eq!(" Ease-In-Out ".parse::<Easing>().unwrap(), Easing::EaseInOut);
        assert_eq!(
            "cubic-bezier(0.4, 0, 0.2, 1)".parse::<Easing>().unwrap(),
            Easing::CubicBezier(0.4, 0.0, 0.2, 1.0)
        );
        assert_eq!(
            "steps(3, start)".parse::<Easing>().unwrap(),
            Easing::Steps {
                count: 3,
                position: StepPosition::Start
            }
        );
        assert_eq!(
            "steps(2)".parse::<Easing>().unwrap(),
            Easing::Steps {
                count: 2,
                position: StepPosition::End
            }
        );
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for text in [
            "bouncy",
            "cubic-bezier(1, 2, 3)",
            "cubic-bezier(1.5, 0, 0.2, 1)",
            "steps(0)",
            "steps(2, middle)",
        ] {
            assert!(
                matches!(text.parse::<Easing>(), Err(ConfigError::InvalidEasing { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for easing in ALL {
            assert_eq!(easing.to_string().parse::<Easing>().unwrap(), easing);
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&Easing::EaseOut).unwrap();
        assert_eq!(json, "\"ease-out\"");
        let parsed: Easing = serde_json::from_str("\"steps(2, end)\"").unwrap();
        assert_eq!(
            parsed,
            Easing::Steps {
                count: 2,
                position: StepPosition::End
            }
        );
    }
}
