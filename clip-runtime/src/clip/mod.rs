//! # Clip 模块
//!
//! 一个元素上的一个可逆效果，以及驱动它的状态机。
//!
//! ## 状态流转
//!
//! ```text
//! Idle ──play()──► PlayingForward ──完成──► FinishedForward
//!                                                │
//!                                            rewind()
//!                                                ▼
//! FinishedBackward ◄──完成── PlayingBackward ◄───┘
//!        │
//!      play() ──► PlayingForward ...
//! ```
//!
//! 只有 `play()`、`rewind()` 与播放完成会改变状态。
//!
//! ## 帧驱动
//!
//! `play()` / `rewind()` 只准备本次播放，不推进时间；宿主每帧调用
//! [`Clip::update`]，引擎在其中推进 [`PhaseTimer`]、触发调度项、
//! 应用关键帧与 mutator，并返回本帧产生的 [`ClipEvent`]。

pub mod category;
pub mod factory;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use category::EffectCategory;
pub use factory::ClipFactory;

use crate::config::{ClipConfig, ClipConfigPartial};
use crate::deferred::Deferred;
use crate::effect::presets::defaults;
use crate::effect::{
    BuildContext, EffectArgs, EffectDefinition, EffectFrameSet, PlannedMutator,
};
use crate::element::{HideType, VisualElement};
use crate::error::{ClipError, ClipResult, ConfigError, EffectError, PlaybackError};
use crate::keyframes::KeyframeTrack;
use crate::phase::{Coordinate, Direction, Phase, PhaseTimer};
use crate::schedule::{RunningPass, TaskCallbacks, TaskScheduler};
use crate::scroll::{self, ScrollAnchor};
use crate::tween::{TweenContext, tween};

static NEXT_CLIP_ID: AtomicU64 = AtomicU64::new(1);

/// clip 唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub(crate) u64);

impl ClipId {
    fn next() -> Self {
        Self(NEXT_CLIP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipStatus {
    #[default]
    Idle,
    PlayingForward,
    FinishedForward,
    PlayingBackward,
    FinishedBackward,
}

impl ClipStatus {
    pub fn running(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ClipStatus::PlayingForward,
            Direction::Backward => ClipStatus::PlayingBackward,
        }
    }

    pub fn finished(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ClipStatus::FinishedForward,
            Direction::Backward => ClipStatus::FinishedBackward,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, ClipStatus::PlayingForward | ClipStatus::PlayingBackward)
    }

    /// 最近一次播放的方向
    pub fn direction(self) -> Option<Direction> {
        match self {
            ClipStatus::Idle => None,
            ClipStatus::PlayingForward | ClipStatus::FinishedForward => Some(Direction::Forward),
            ClipStatus::PlayingBackward | ClipStatus::FinishedBackward => Some(Direction::Backward),
        }
    }

    pub fn can_play(self) -> bool {
        matches!(self, ClipStatus::Idle | ClipStatus::FinishedBackward)
    }

    pub fn can_rewind(self) -> bool {
        self == ClipStatus::FinishedForward
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClipStatus::Idle => "idle",
            ClipStatus::PlayingForward => "playing-forward",
            ClipStatus::FinishedForward => "finished-forward",
            ClipStatus::PlayingBackward => "playing-backward",
            ClipStatus::FinishedBackward => "finished-backward",
        }
    }
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// clip 事件
#[derive(Debug, Clone, PartialEq)]
pub enum ClipEvent {
    /// 开始一次播放
    PassStarted(Direction),
    /// 进入阶段
    PhaseEntered { direction: Direction, phase: Phase },
    /// 调度任务已触发
    TaskFired {
        direction: Direction,
        coordinate: Coordinate,
    },
    /// 等待点已结算
    PromiseResolved {
        direction: Direction,
        coordinate: Coordinate,
    },
    /// 等待任务返回的结果，暂停推进
    Suspended {
        direction: Direction,
        coordinate: Coordinate,
    },
    /// 恢复推进
    Resumed(Direction),
    /// 播放完成
    PassFinished(Direction),
    /// 播放出错中止
    Faulted(ClipError),
}

/// 播放状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSnapshot {
    pub status: ClipStatus,
    /// 播放中所处阶段
    pub phase: Option<Phase>,
    /// 阶段内进度 (0.0 - 1.0)
    pub phase_progress: f32,
    /// 本次播放时间线上的坐标
    pub position: Option<Coordinate>,
    pub paused: bool,
    /// 正在等待任务结果
    pub suspended: bool,
    pub faulted: bool,
}

struct AppliedKeyframes {
    track: KeyframeTrack,
    reversed: bool,
    /// 播放开始时元素的原值
    underlying: BTreeMap<String, f32>,
}

struct ActivePass {
    id: u64,
    direction: Direction,
    timer: PhaseTimer,
    keyframes: Option<AppliedKeyframes>,
    mutator: Option<PlannedMutator>,
    completion: Deferred,
    waits: Vec<Deferred>,
    last_applied: Option<(Phase, f32)>,
}

/// 可逆效果 clip
pub struct Clip {
    id: ClipId,
    category: EffectCategory,
    effect_name: String,
    definition: Rc<EffectDefinition>,
    args: EffectArgs,
    element: Rc<dyn VisualElement>,
    config: ClipConfig,
    frame_set: Option<EffectFrameSet>,
    build_count: u32,
    status: ClipStatus,
    pass: Option<ActivePass>,
    pass_counter: u64,
    scheduler: TaskScheduler,
    /// entrance 播放前元素的隐藏方式
    hidden_before: Option<HideType>,
    paused: bool,
    fault: Option<ClipError>,
    events: Vec<ClipEvent>,
}

impl Clip {
    /// 创建 clip
    ///
    /// 配置按 框架默认 → 类别默认 → 作者默认 → `overrides` → 类别不可变
    /// → 作者不可变 的顺序合并。
    pub fn new(
        category: EffectCategory,
        effect_name: impl Into<String>,
        definition: Rc<EffectDefinition>,
        element: Rc<dyn VisualElement>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> Result<Self, ConfigError> {
        let overrides = overrides.cloned().unwrap_or_default();
        let config = ClipConfig::resolve([
            &category.default_config(),
            definition.default_config(),
            &overrides,
            &category.immutable_config(),
            definition.immutable_config(),
        ])?;

        category::on_construct(category, element.as_ref(), &config);

        let clip = Self {
            id: ClipId::next(),
            category,
            effect_name: effect_name.into(),
            definition,
            args,
            element,
            config,
            frame_set: None,
            build_count: 0,
            status: ClipStatus::Idle,
            pass: None,
            pass_counter: 0,
            scheduler: TaskScheduler::new(),
            hidden_before: None,
            paused: false,
            fault: None,
            events: Vec::new(),
        };
        tracing::debug!(clip = %clip.id, label = %clip.label(), "创建 clip");
        Ok(clip)
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn category(&self) -> EffectCategory {
        self.category
    }

    pub fn effect_name(&self) -> &str {
        &self.effect_name
    }

    pub fn config(&self) -> &ClipConfig {
        &self.config
    }

    pub fn element(&self) -> &Rc<dyn VisualElement> {
        &self.element
    }

    pub fn args(&self) -> &EffectArgs {
        &self.args
    }

    /// builder 已运行的次数
    pub fn build_count(&self) -> u32 {
        self.build_count
    }

    pub fn status(&self) -> ClipStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// 导致中止的错误
    pub fn fault(&self) -> Option<&ClipError> {
        self.fault.as_ref()
    }

    /// 诊断标签：`类别:效果@元素`
    pub fn label(&self) -> String {
        format!("{}:{}@{}", self.category, self.effect_name, self.element.label())
    }

    pub fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            status: self.status,
            phase: self.pass.as_ref().map(|p| p.timer.phase()),
            phase_progress: self.pass.as_ref().map_or(0.0, |p| p.timer.progress()),
            position: self.pass.as_ref().map(|p| p.timer.position()),
            paused: self.paused,
            suspended: self.pass.as_ref().is_some_and(|p| !p.waits.is_empty()),
            faulted: self.fault.is_some(),
        }
    }

    /// 注册任务，见 [`TaskScheduler::schedule_task`]
    pub fn schedule_task(
        &mut self,
        phase: Phase,
        percent: f32,
        callbacks: TaskCallbacks,
    ) -> ClipResult<()> {
        self.scheduler
            .schedule_task_during(phase, percent, callbacks, running_pass(&self.pass))?;
        Ok(())
    }

    /// 注册等待点，见 [`TaskScheduler::schedule_promise`]
    pub fn schedule_promise(
        &mut self,
        direction: Direction,
        phase: Phase,
        percent: f32,
    ) -> ClipResult<Deferred> {
        Ok(self.scheduler.schedule_promise_during(
            direction,
            phase,
            percent,
            running_pass(&self.pass),
        )?)
    }

    /// 按当前播放进度在 `from` 与 `to` 之间插值
    ///
    /// 延迟阶段取 0，结束延迟阶段取 1；未在播放时，正向完成取 1，其余取 0。
    pub fn compute_tween(&self, from: f32, to: f32) -> f32 {
        let progress = match &self.pass {
            Some(pass) => match pass.timer.phase() {
                Phase::Delay => 0.0,
                Phase::Active => pass.timer.progress(),
                Phase::EndDelay => 1.0,
            },
            None if self.status == ClipStatus::FinishedForward => 1.0,
            None => 0.0,
        };
        tween(from, to, progress, self.config.easing)
    }

    /// 正向播放
    ///
    /// 状态或可见性不满足时同步返回错误；生成器错误通过返回的
    /// [`Deferred`] 传递。
    pub fn play(&mut self) -> ClipResult<Deferred> {
        self.ensure_healthy()?;
        if !self.status.can_play() {
            return Err(self.transition_error("play").into());
        }
        category::check_play(self.category, self.element.as_ref(), &self.label())?;
        Ok(self.start_pass(Direction::Forward))
    }

    /// 反向播放
    pub fn rewind(&mut self) -> ClipResult<Deferred> {
        self.ensure_healthy()?;
        if !self.status.can_rewind() {
            return Err(self.transition_error("rewind").into());
        }
        Ok(self.start_pass(Direction::Backward))
    }

    /// 暂停推进，没有进行中的播放时返回 `false`
    pub fn pause(&mut self) -> bool {
        let Some(pass) = self.pass.as_mut() else {
            return false;
        };
        if self.paused {
            return false;
        }
        pass.timer.pause();
        self.paused = true;
        true
    }

    /// 从暂停处继续
    pub fn resume(&mut self) -> bool {
        let Some(pass) = self.pass.as_mut() else {
            return false;
        };
        if !self.paused {
            return false;
        }
        pass.timer.resume();
        self.paused = false;
        true
    }

    /// 推进一帧
    ///
    /// `dt` 为帧时间（秒），乘以 `playback_rate` 后推进计时器。
    pub fn update(&mut self, dt: f32) -> Vec<ClipEvent> {
        let mut events = std::mem::take(&mut self.events);
        if self.paused || self.fault.is_some() {
            return events;
        }
        let Some(mut pass) = self.pass.take() else {
            return events;
        };

        match self.drive(&mut pass, dt, &mut events) {
            Ok(true) => self.finish_pass(pass, &mut events),
            Ok(false) => self.pass = Some(pass),
            Err(err) => {
                self.fail(err, &pass.completion);
                events.append(&mut self.events);
            }
        }
        events
    }

    fn ensure_healthy(&self) -> Result<(), PlaybackError> {
        if self.fault.is_some() {
            return Err(PlaybackError::Faulted {
                label: self.label(),
            });
        }
        Ok(())
    }

    fn transition_error(&self, action: &'static str) -> PlaybackError {
        PlaybackError::InvalidTransition {
            label: self.label(),
            action,
            status: self.status,
        }
    }

    fn start_pass(&mut self, direction: Direction) -> Deferred {
        let completion = Deferred::pending();
        self.status = ClipStatus::running(direction);
        self.pass_counter += 1;
        self.paused = false;
        tracing::debug!(clip = %self.id, effect = %self.effect_name, %direction, "开始播放");
        self.events.push(ClipEvent::PassStarted(direction));

        if let Some(hidden) =
            category::on_pass_start(self.category, direction, self.element.as_ref(), &self.config)
        {
            self.hidden_before = Some(hidden);
        }
        if self.category.uses_scroll_anchor() {
            scroll::push(ScrollAnchor {
                clip: self.id,
                label: self.element.label(),
                direction,
                scroll_top: self.element.get_property(defaults::SCROLL_TOP).unwrap_or(0.0),
                scroll_left: self.element.get_property(defaults::SCROLL_LEFT).unwrap_or(0.0),
            });
        }

        match self.prepare_pass(direction, completion.clone()) {
            Ok(pass) => {
                self.events.push(ClipEvent::PhaseEntered {
                    direction,
                    phase: Phase::Delay,
                });
                self.pass = Some(pass);
            }
            Err(err) => self.fail(err, &completion),
        }
        completion
    }

    /// 按频率策略运行 builder，再为本方向运行生成器
    fn prepare_pass(&mut self, direction: Direction, completion: Deferred) -> ClipResult<ActivePass> {
        if self
            .definition
            .frequency()
            .rebuilds_on(direction, self.frame_set.is_some())
        {
            let ctx = BuildContext {
                element: &self.element,
                config: &self.config,
                args: &self.args,
                effect_name: &self.effect_name,
                category: self.category,
                direction,
            };
            let frame_set = self.definition.build(&ctx)?;
            frame_set.validate(&self.effect_name)?;
            self.build_count += 1;
            tracing::debug!(clip = %self.id, build_count = self.build_count, "运行 builder");
            self.frame_set = Some(frame_set);
        }

        let Some(frame_set) = self.frame_set.as_mut() else {
            return Err(EffectError::EmptyFrameSet {
                effect: self.effect_name.clone(),
            }
            .into());
        };
        let plan = frame_set.plan(direction)?;

        let keyframes = match plan.keyframes {
            Some(planned) => {
                let track = KeyframeTrack::compile(&planned.frames, self.config.composite)?;
                let underlying = track
                    .properties()
                    .map(|name| {
                        let value = self.element.get_property(name).unwrap_or(0.0);
                        (name.to_string(), value)
                    })
                    .collect();
                Some(AppliedKeyframes {
                    track,
                    reversed: planned.reversed,
                    underlying,
                })
            }
            None => None,
        };

        Ok(ActivePass {
            id: self.pass_counter,
            direction,
            timer: PhaseTimer::from_config(&self.config),
            keyframes,
            mutator: plan.mutator,
            completion,
            waits: Vec::new(),
            last_applied: None,
        })
    }

    /// 推进本次播放，返回是否已经完成
    fn drive(
        &mut self,
        pass: &mut ActivePass,
        dt: f32,
        events: &mut Vec<ClipEvent>,
    ) -> ClipResult<bool> {
        let direction = pass.direction;
        let mut budget = dt.max(0.0) * self.config.playback_rate;

        if !pass.waits.is_empty() {
            if !settle_waits(&mut pass.waits)? {
                return Ok(false);
            }
            // 等待期间的帧时间不计入
            budget = 0.0;
            tracing::debug!(clip = %self.id, "任务结果已结算，恢复推进");
            events.push(ClipEvent::Resumed(direction));
        }

        loop {
            while let Some(group) =
                self.scheduler
                    .fire_next_group(direction, pass.id, &pass.timer)?
            {
                let coordinate = group.coordinate;
                for _ in 0..group.tasks {
                    events.push(ClipEvent::TaskFired {
                        direction,
                        coordinate,
                    });
                }
                for _ in 0..group.promises {
                    events.push(ClipEvent::PromiseResolved {
                        direction,
                        coordinate,
                    });
                }
                pass.waits = group.waits;
                if !settle_waits(&mut pass.waits)? {
                    tracing::debug!(clip = %self.id, %coordinate, "等待任务结果");
                    events.push(ClipEvent::Suspended {
                        direction,
                        coordinate,
                    });
                    return Ok(false);
                }
            }

            if pass.timer.is_finished() {
                return Ok(true);
            }
            if budget <= 0.0 && !pass.timer.is_at_phase_end() {
                return Ok(false);
            }

            let stop = self.scheduler.next_stop(direction, pass.id, &pass.timer);
            let before = pass.timer.phase();
            budget = pass.timer.step(budget, stop);
            if pass.timer.is_finished() {
                continue;
            }

            let phase = pass.timer.phase();
            if phase != before {
                events.push(ClipEvent::PhaseEntered { direction, phase });
                if phase == Phase::EndDelay {
                    self.restore_underlying(pass);
                }
            }
            self.apply_frame(pass)?;
        }
    }

    fn apply_frame(&self, pass: &mut ActivePass) -> ClipResult<()> {
        let phase = pass.timer.phase();
        let progress = pass.timer.progress();
        if pass.last_applied == Some((phase, progress)) {
            return Ok(());
        }
        pass.last_applied = Some((phase, progress));

        match phase {
            Phase::Delay => {
                if self.config.fill.applies_backwards() {
                    self.apply_keyframes(pass, 0.0);
                }
            }
            Phase::Active => {
                self.apply_keyframes(pass, progress);
                if let Some(planned) = pass.mutator.as_mut() {
                    let ctx = TweenContext::new(
                        progress,
                        self.config.easing,
                        pass.direction,
                        planned.swapped,
                    );
                    (planned.mutator)(&ctx)?;
                }
            }
            Phase::EndDelay => {}
        }
        Ok(())
    }

    /// 反转合成的关键帧按 `1 - t` 采样正向轨道
    fn apply_keyframes(&self, pass: &ActivePass, progress: f32) {
        let Some(keyframes) = &pass.keyframes else {
            return;
        };
        let local = if keyframes.reversed {
            1.0 - progress
        } else {
            progress
        };
        let eased = self.config.easing.apply(local);
        for (name, value) in keyframes.track.sample(eased, &keyframes.underlying) {
            self.element.set_property(&name, value);
        }
    }

    /// fill 不保持最后一帧时，活跃阶段结束后恢复原值
    fn restore_underlying(&self, pass: &ActivePass) {
        if self.config.fill.holds_forwards() {
            return;
        }
        if let Some(keyframes) = &pass.keyframes {
            for (name, value) in &keyframes.underlying {
                self.element.set_property(name, *value);
            }
        }
    }

    fn finish_pass(&mut self, pass: ActivePass, events: &mut Vec<ClipEvent>) {
        let direction = pass.direction;
        self.status = ClipStatus::finished(direction);
        category::on_pass_finish(
            self.category,
            direction,
            self.element.as_ref(),
            &self.config,
            self.hidden_before,
        );
        self.release_scroll_anchor();
        tracing::debug!(clip = %self.id, effect = %self.effect_name, %direction, "播放完成");
        events.push(ClipEvent::PassFinished(direction));
        pass.completion.resolve();
    }

    /// 中止：拒绝结果，保留当前状态，不回滚
    fn fail(&mut self, error: ClipError, completion: &Deferred) {
        tracing::warn!(clip = %self.id, label = %self.label(), error = %error, "clip 执行出错，已中止");
        self.release_scroll_anchor();
        self.fault = Some(error.clone());
        self.events.push(ClipEvent::Faulted(error.clone()));
        completion.reject(error);
    }

    fn release_scroll_anchor(&self) {
        if self.category.uses_scroll_anchor() {
            scroll::pop(self.id);
        }
    }
}

impl Drop for Clip {
    fn drop(&mut self) {
        if self.pass.is_some() {
            self.release_scroll_anchor();
        }
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("status", &self.status)
            .field("config", &self.config)
            .field("build_count", &self.build_count)
            .field("paused", &self.paused)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

fn running_pass(pass: &Option<ActivePass>) -> Option<RunningPass<'_>> {
    pass.as_ref().map(|pass| RunningPass {
        id: pass.id,
        direction: pass.direction,
        timer: &pass.timer,
    })
}

/// 检查等待中的结果：任一失败则返回错误，全部成功返回 `true`
fn settle_waits(waits: &mut Vec<Deferred>) -> ClipResult<bool> {
    if let Some(err) = waits.iter().find_map(Deferred::error) {
        return Err(err);
    }
    waits.retain(|d| !d.is_settled());
    Ok(waits.is_empty())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::element::{MemoryElement, Visibility};
    use crate::keyframes::Keyframe;
    use crate::schedule::TaskOutcome;

    fn opacity_ramp() -> Rc<EffectDefinition> {
        Rc::new(EffectDefinition::new(|_| {
            Ok(EffectFrameSet::new().with_forward_keyframes(|| {
                Ok(vec![
                    Keyframe::new().set("opacity", 0.0),
                    Keyframe::new().set("opacity", 1.0),
                ])
            }))
        }))
    }

    fn emphasis(element: &MemoryElement, overrides: ClipConfigPartial) -> Clip {
        Clip::new(
            EffectCategory::Emphasis,
            "ramp",
            opacity_ramp(),
            element.handle(),
            EffectArgs::new(),
            Some(&overrides),
        )
        .unwrap()
    }

    fn run_to_end(clip: &mut Clip, dt: f32) -> Vec<ClipEvent> {
        let mut events = Vec::new();
        for _ in 0..1000 {
            events.extend(clip.update(dt));
            if !clip.status().is_running() || clip.is_faulted() {
                break;
            }
        }
        events
    }

    #[test]
    fn test_status_guards() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        assert!(matches!(
            clip.rewind(),
            Err(ClipError::Playback(PlaybackError::InvalidTransition { action: "rewind", .. }))
        ));

        let done = clip.play().unwrap();
        assert_eq!(clip.status(), ClipStatus::PlayingForward);
        assert!(clip.play().is_err());
        assert!(clip.rewind().is_err());

        run_to_end(&mut clip, 0.25);
        assert!(done.is_resolved());
        assert_eq!(clip.status(), ClipStatus::FinishedForward);
        assert!(clip.play().is_err());

        let back = clip.rewind().unwrap();
        run_to_end(&mut clip, 0.25);
        assert!(back.is_resolved());
        assert_eq!(clip.status(), ClipStatus::FinishedBackward);
        assert!(clip.play().is_ok());
    }

    #[test]
    fn test_play_does_not_advance_synchronously() {
        let element = MemoryElement::new("box").with_property("opacity", 0.5);
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        clip.play().unwrap();
        assert_eq!(element.property("opacity"), Some(0.5));

        clip.update(0.25);
        assert_eq!(element.property("opacity"), Some(0.25));
    }

    #[test]
    fn test_event_order() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(
            &element,
            ClipConfigPartial::new().delay(0.25).duration(0.5).end_delay(0.25),
        );
        clip.play().unwrap();
        let events = run_to_end(&mut clip, 0.25);
        assert_eq!(
            events,
            vec![
                ClipEvent::PassStarted(Direction::Forward),
                ClipEvent::PhaseEntered { direction: Direction::Forward, phase: Phase::Delay },
                ClipEvent::PhaseEntered { direction: Direction::Forward, phase: Phase::Active },
                ClipEvent::PhaseEntered { direction: Direction::Forward, phase: Phase::EndDelay },
                ClipEvent::PassFinished(Direction::Forward),
            ]
        );
    }

    #[test]
    fn test_delay_respects_fill() {
        let element = MemoryElement::new("box").with_property("opacity", 0.5);
        let mut clip = emphasis(&element, ClipConfigPartial::new().delay(1.0).duration(1.0));
        clip.play().unwrap();
        clip.update(0.25);
        assert_eq!(element.property("opacity"), Some(0.5));

        let element = MemoryElement::new("box").with_property("opacity", 0.5);
        let mut clip = emphasis(
            &element,
            ClipConfigPartial::new()
                .delay(1.0)
                .duration(1.0)
                .fill(crate::config::FillMode::Backwards),
        );
        clip.play().unwrap();
        clip.update(0.25);
        assert_eq!(element.property("opacity"), Some(0.0));

        // backwards 不保持最后一帧
        run_to_end(&mut clip, 0.25);
        assert_eq!(element.property("opacity"), Some(0.5));
    }

    #[test]
    fn test_playback_rate_scales_time() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(
            &element,
            ClipConfigPartial::new().duration(1.0).playback_rate(2.0),
        );
        clip.play().unwrap();
        clip.update(0.125);
        assert_eq!(element.property("opacity"), Some(0.25));
    }

    #[test]
    fn test_pause_and_resume() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        assert!(!clip.pause());
        clip.play().unwrap();
        clip.update(0.25);
        assert!(clip.pause());
        assert!(!clip.pause());
        clip.update(0.5);
        assert_eq!(element.property("opacity"), Some(0.25));
        assert!(clip.snapshot().paused);

        assert!(clip.resume());
        clip.update(0.25);
        assert_eq!(element.property("opacity"), Some(0.5));
        let snapshot = clip.snapshot();
        assert_eq!(snapshot.phase, Some(Phase::Active));
        assert_eq!(snapshot.phase_progress, 0.5);
        assert_eq!(snapshot.position, Coordinate::new(Phase::Active, 50.0).ok());
    }

    #[test]
    fn test_compute_tween() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        assert_eq!(clip.compute_tween(0.0, 10.0), 0.0);
        clip.play().unwrap();
        clip.update(0.25);
        assert_eq!(clip.compute_tween(0.0, 10.0), 2.5);
        run_to_end(&mut clip, 0.25);
        assert_eq!(clip.compute_tween(0.0, 10.0), 10.0);
    }

    #[test]
    fn test_builder_error_faults_without_rollback() {
        let definition = Rc::new(EffectDefinition::new(|ctx| Err(ctx.error("no frames").into())));
        let element = MemoryElement::new("box");
        let mut clip = Clip::new(
            EffectCategory::Emphasis,
            "broken",
            definition,
            element.handle(),
            EffectArgs::new(),
            None,
        )
        .unwrap();

        let done = clip.play().unwrap();
        assert!(matches!(done.error(), Some(ClipError::Effect(EffectError::Generator { .. }))));
        assert_eq!(clip.status(), ClipStatus::PlayingForward);
        assert!(clip.is_faulted());

        let events = clip.update(0.1);
        assert!(matches!(events.last(), Some(ClipEvent::Faulted(_))));
        assert!(matches!(
            clip.play(),
            Err(ClipError::Playback(PlaybackError::Faulted { .. }))
        ));
    }

    #[test]
    fn test_empty_frame_set_faults() {
        let definition = Rc::new(EffectDefinition::new(|_| Ok(EffectFrameSet::new())));
        let element = MemoryElement::new("box");
        let mut clip = Clip::new(
            EffectCategory::Emphasis,
            "blank",
            definition,
            element.handle(),
            EffectArgs::new(),
            None,
        )
        .unwrap();
        let done = clip.play().unwrap();
        assert!(matches!(
            done.error(),
            Some(ClipError::Effect(EffectError::EmptyFrameSet { .. }))
        ));
    }

    #[test]
    fn test_task_error_faults_clip() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        clip.schedule_task(
            Phase::Active,
            50.0,
            TaskCallbacks::new().on_play(|| Err(EffectError::task("boom").into())),
        )
        .unwrap();
        let done = clip.play().unwrap();
        run_to_end(&mut clip, 0.25);
        assert!(done.is_rejected());
        assert_eq!(clip.status(), ClipStatus::PlayingForward);
        assert_eq!(element.property("opacity"), Some(0.5));
    }

    #[test]
    fn test_suspension_discards_frame_time() {
        let element = MemoryElement::new("box");
        let mut clip = emphasis(&element, ClipConfigPartial::new().duration(1.0));
        let gate = Deferred::pending();
        let handle = gate.clone();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        clip.schedule_task(
            Phase::Active,
            25.0,
            TaskCallbacks::new().on_play(move || {
                counter.set(counter.get() + 1);
                Ok(TaskOutcome::Await(handle.clone()))
            }),
        )
        .unwrap();

        clip.play().unwrap();
        let events = clip.update(0.5);
        assert!(events.iter().any(|e| matches!(e, ClipEvent::Suspended { .. })));
        assert_eq!(element.property("opacity"), Some(0.25));
        assert!(clip.snapshot().suspended);

        clip.update(0.5);
        assert_eq!(element.property("opacity"), Some(0.25));

        gate.resolve();
        let events = clip.update(0.5);
        assert!(events.contains(&ClipEvent::Resumed(Direction::Forward)));
        assert_eq!(element.property("opacity"), Some(0.25));

        clip.update(0.25);
        assert_eq!(element.property("opacity"), Some(0.5));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_hide_now_on_entrance_construct() {
        let element = MemoryElement::new("box");
        let _clip = Clip::new(
            EffectCategory::Entrance,
            "ramp",
            opacity_ramp(),
            element.handle(),
            EffectArgs::new(),
            Some(&ClipConfigPartial::new().hide_now_type(Some(HideType::Invisible))),
        )
        .unwrap();
        assert_eq!(element.visibility(), Visibility::Invisible);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let element = MemoryElement::new("box");
        let result = Clip::new(
            EffectCategory::Emphasis,
            "ramp",
            opacity_ramp(),
            element.handle(),
            EffectArgs::new(),
            Some(&ClipConfigPartial::new().duration(-1.0)),
        );
        assert!(matches!(result, Err(ConfigError::InvalidDuration { .. })));
    }
}
