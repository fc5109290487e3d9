//! # Phase 模块
//!
//! 阶段计时器。
//!
//! 每次播放（无论方向）都按固定顺序经过三个阶段：
//!
//! ```text
//! Delay ──► Active ──► EndDelay ──► 结束
//! ```
//!
//! 阶段不会被跳过；时长为 0 的阶段在同一步内进入并离开。
//! 计时器只负责时间推进，不关心关键帧或任务。

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ClipConfig;
use crate::error::ConfigError;

/// 播放阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// 延迟阶段
    Delay,
    /// 活跃阶段
    Active,
    /// 结束延迟阶段
    EndDelay,
}

impl Phase {
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Delay => Some(Phase::Active),
            Phase::Active => Some(Phase::EndDelay),
            Phase::EndDelay => None,
        }
    }

    /// 时间反向后对应的阶段
    pub fn mirror(self) -> Phase {
        match self {
            Phase::Delay => Phase::EndDelay,
            Phase::Active => Phase::Active,
            Phase::EndDelay => Phase::Delay,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Delay => "delay",
            Phase::Active => "active",
            Phase::EndDelay => "end-delay",
        }
    }

    fn index(self) -> usize {
        match self {
            Phase::Delay => 0,
            Phase::Active => 1,
            Phase::EndDelay => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 播放方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 时间线上的位置：阶段 + 阶段内百分比
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub phase: Phase,
    /// 0 - 100
    pub percent: f32,
}

impl Coordinate {
    pub fn new(phase: Phase, percent: f32) -> Result<Self, ConfigError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ConfigError::InvalidPercentage { value: percent });
        }
        Ok(Self { phase, percent })
    }

    /// 反向播放时经过同一视觉位置的坐标
    pub fn mirror(self) -> Self {
        Self {
            phase: self.phase.mirror(),
            percent: 100.0 - self.percent,
        }
    }

    /// 在时长为 `duration` 的阶段内对应的已用时间
    pub fn elapsed_in(&self, duration: f32) -> f32 {
        self.percent / 100.0 * duration
    }

    /// 按时间先后比较
    pub fn cmp_position(&self, other: &Coordinate) -> Ordering {
        self.phase
            .cmp(&other.phase)
            .then(self.percent.total_cmp(&other.percent))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}%", self.phase, self.percent)
    }
}

/// 阶段计时器
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTimer {
    durations: [f32; 3],
    phase: Phase,
    elapsed: f32,
    paused: bool,
    finished: bool,
}

impl PhaseTimer {
    /// 创建计时器，负数或非有限时长按 0 处理
    pub fn new(delay: f32, active: f32, end_delay: f32) -> Self {
        let sanitize = |d: f32| if d.is_finite() { d.max(0.0) } else { 0.0 };
        Self {
            durations: [sanitize(delay), sanitize(active), sanitize(end_delay)],
            phase: Phase::Delay,
            elapsed: 0.0,
            paused: false,
            finished: false,
        }
    }

    pub fn from_config(config: &ClipConfig) -> Self {
        Self::new(config.delay, config.duration, config.end_delay)
    }

    pub fn duration(&self, phase: Phase) -> f32 {
        self.durations[phase.index()]
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 当前阶段内的已用时间
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// 当前阶段内的进度 (0.0 - 1.0)，时长为 0 的阶段恒为 1.0
    pub fn progress(&self) -> f32 {
        let duration = self.duration(self.phase);
        if duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / duration).clamp(0.0, 1.0)
        }
    }

    /// 当前所在的时间线坐标
    pub fn position(&self) -> Coordinate {
        Coordinate {
            phase: self.phase,
            percent: self.progress() * 100.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 是否已到达当前阶段末尾
    pub fn is_at_phase_end(&self) -> bool {
        self.elapsed >= self.duration(self.phase)
    }

    /// 计时器是否已经到达（或越过）某个坐标
    pub fn has_reached(&self, coordinate: Coordinate) -> bool {
        if self.finished {
            return true;
        }
        match coordinate.phase.cmp(&self.phase) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => {
                let duration = self.duration(self.phase);
                duration <= 0.0 || coordinate.elapsed_in(duration) <= self.elapsed
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// 推进计时器
    ///
    /// 在以下任一条件满足时停止：时间预算用完、到达当前阶段末尾、
    /// 到达 `stop` 坐标。处于阶段末尾时调用会进入下一阶段（不消耗预算），
    /// 在最后一个阶段末尾调用则标记为结束。
    ///
    /// # 返回
    /// - 剩余的时间预算
    pub fn step(&mut self, budget: f32, stop: Option<Coordinate>) -> f32 {
        if self.paused || self.finished {
            return budget;
        }

        let duration = self.duration(self.phase);
        if self.elapsed >= duration {
            match self.phase.next() {
                Some(next) => {
                    self.phase = next;
                    self.elapsed = 0.0;
                }
                None => self.finished = true,
            }
            return budget;
        }

        let mut target = duration;
        if let Some(stop) = stop.filter(|s| s.phase == self.phase) {
            let at = stop.elapsed_in(duration);
            if at > self.elapsed && at < target {
                target = at;
            }
        }

        let needed = target - self.elapsed;
        if budget >= needed {
            self.elapsed = target;
            budget - needed
        } else {
            self.elapsed += budget;
            0.0
        }
    }
}
