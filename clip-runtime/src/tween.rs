//! # Tween 模块
//!
//! 数值插值。mutator 通过 [`TweenContext`] 读取当前进度并计算中间值。

use crate::easing::Easing;
use crate::phase::Direction;

/// 在 `from` 与 `to` 之间按缓动后的进度插值
pub fn tween(from: f32, to: f32, progress: f32, easing: Easing) -> f32 {
    from + (to - from) * easing.apply(progress)
}

/// 传递给 mutator 的插值上下文
///
/// 当 mutator 是由正向 mutator 反转而来时 `swapped` 为真，
/// 此时 [`TweenContext::tween`] 会交换起止值，使同一段代码倒放。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenContext {
    progress: f32,
    easing: Easing,
    direction: Direction,
    swapped: bool,
}

impl TweenContext {
    pub(crate) fn new(progress: f32, easing: Easing, direction: Direction, swapped: bool) -> Self {
        Self {
            progress: progress.clamp(0.0, 1.0),
            easing,
            direction,
            swapped,
        }
    }

    /// 活跃阶段内的线性进度 (0.0 - 1.0)
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// 缓动后的进度
    pub fn eased_progress(&self) -> f32 {
        self.easing.apply(self.progress)
    }

    /// 当前播放方向
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 是否为反转合成的 mutator
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    /// 计算当前进度下的插值
    pub fn tween(&self, from: f32, to: f32) -> f32 {
        if self.swapped {
            tween(to, from, self.progress, self.easing)
        } else {
            tween(from, to, self.progress, self.easing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tween_linear() {
        assert_eq!(tween(0.0, 100.0, 0.25, Easing::Linear), 25.0);
        assert_eq!(tween(10.0, -10.0, 1.0, Easing::Linear), -10.0);
    }

    #[test]
    fn test_tween_clamps_progress() {
        assert_eq!(tween(0.0, 8.0, 2.0, Easing::Linear), 8.0);
        assert_eq!(tween(0.0, 8.0, -1.0, Easing::Linear), 0.0);
    }

    #[test]
    fn test_context_swaps_bounds() {
        let forward = TweenContext::new(0.25, Easing::Linear, Direction::Forward, false);
        let backward = TweenContext::new(0.25, Easing::Linear, Direction::Backward, true);
        assert_eq!(forward.tween(0.0, 100.0), 25.0);
        assert_eq!(backward.tween(0.0, 100.0), 75.0);
        assert!(backward.is_swapped());
        assert_eq!(backward.direction(), Direction::Backward);
    }

    #[test]
    fn test_eased_progress() {
        let ctx = TweenContext::new(0.5, Easing::EaseIn, Direction::Forward, false);
        assert_eq!(ctx.progress(), 0.5);
        assert!(ctx.eased_progress() < 0.5);
    }
}
