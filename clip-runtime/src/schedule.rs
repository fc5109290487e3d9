//! # Schedule 模块
//!
//! 挂在时间线坐标上的任务与等待点。
//!
//! - 任务（[`TaskCallbacks`]）：`on_play` 在正向播放到达坐标时触发，
//!   `on_rewind` 在反向播放经过同一视觉位置（镜像坐标）时触发；
//!   每次播放各触发一次，可重复触发。
//! - 等待点（[`TaskScheduler::schedule_promise`]）：按给定方向自己的时间线
//!   计算坐标，触发一次后移除。
//!
//! 同一坐标上的项目按注册顺序触发。

use crate::deferred::Deferred;
use crate::error::{ClipResult, ConfigError};
use crate::phase::{Coordinate, Direction, Phase, PhaseTimer};

/// 任务回调
pub type TaskFn = Box<dyn FnMut() -> ClipResult<TaskOutcome>>;

/// 任务执行结果
#[derive(Debug)]
pub enum TaskOutcome {
    /// 立即完成
    Done,
    /// 引擎暂停推进，直到该结果结算
    Await(Deferred),
}

/// 一组正向/反向回调
#[derive(Default)]
pub struct TaskCallbacks {
    pub on_play: Option<TaskFn>,
    pub on_rewind: Option<TaskFn>,
}

impl TaskCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_play(mut self, f: impl FnMut() -> ClipResult<TaskOutcome> + 'static) -> Self {
        self.on_play = Some(Box::new(f));
        self
    }

    pub fn on_rewind(mut self, f: impl FnMut() -> ClipResult<TaskOutcome> + 'static) -> Self {
        self.on_rewind = Some(Box::new(f));
        self
    }
}

enum ItemAction {
    Task(TaskFn),
    Promise(Deferred),
}

struct ScheduledItem {
    direction: Direction,
    coordinate: Coordinate,
    action: ItemAction,
    /// 最近一次触发所在的播放编号
    fired_in_pass: Option<u64>,
    /// 注册时该播放已经越过坐标，本次播放不再触发
    passed_in: Option<u64>,
}

impl ScheduledItem {
    fn is_due(&self, direction: Direction, pass: u64) -> bool {
        self.direction == direction
            && self.fired_in_pass != Some(pass)
            && self.passed_in != Some(pass)
    }
}

/// 注册时正在进行的播放
#[derive(Clone, Copy)]
pub(crate) struct RunningPass<'a> {
    pub id: u64,
    pub direction: Direction,
    pub timer: &'a PhaseTimer,
}

/// 一次触发的汇总
#[derive(Debug)]
pub(crate) struct FiredGroup {
    pub coordinate: Coordinate,
    pub tasks: usize,
    pub promises: usize,
    /// 任务返回的等待结果
    pub waits: Vec<Deferred>,
}

/// 任务调度器
#[derive(Default)]
pub struct TaskScheduler {
    items: Vec<ScheduledItem>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册任务
    pub fn schedule_task(
        &mut self,
        phase: Phase,
        percent: f32,
        callbacks: TaskCallbacks,
    ) -> Result<(), ConfigError> {
        self.schedule_task_during(phase, percent, callbacks, None)
    }

    /// 注册等待点
    pub fn schedule_promise(
        &mut self,
        direction: Direction,
        phase: Phase,
        percent: f32,
    ) -> Result<Deferred, ConfigError> {
        self.schedule_promise_during(direction, phase, percent, None)
    }

    /// 播放进行中注册任务：已经越过的坐标等到下一次播放再触发
    pub(crate) fn schedule_task_during(
        &mut self,
        phase: Phase,
        percent: f32,
        callbacks: TaskCallbacks,
        running: Option<RunningPass<'_>>,
    ) -> Result<(), ConfigError> {
        let coordinate = Coordinate::new(phase, percent)?;
        if let Some(f) = callbacks.on_play {
            self.push(Direction::Forward, coordinate, ItemAction::Task(f), running);
        }
        if let Some(f) = callbacks.on_rewind {
            self.push(Direction::Backward, coordinate.mirror(), ItemAction::Task(f), running);
        }
        Ok(())
    }

    pub(crate) fn schedule_promise_during(
        &mut self,
        direction: Direction,
        phase: Phase,
        percent: f32,
        running: Option<RunningPass<'_>>,
    ) -> Result<Deferred, ConfigError> {
        let coordinate = Coordinate::new(phase, percent)?;
        let deferred = Deferred::pending();
        self.push(direction, coordinate, ItemAction::Promise(deferred.clone()), running);
        Ok(deferred)
    }

    fn push(
        &mut self,
        direction: Direction,
        coordinate: Coordinate,
        action: ItemAction,
        running: Option<RunningPass<'_>>,
    ) {
        let passed_in = running
            .filter(|r| r.direction == direction && r.timer.has_reached(coordinate))
            .map(|r| r.id);
        self.items.push(ScheduledItem {
            direction,
            coordinate,
            action,
            fired_in_pass: None,
            passed_in,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 本次播放中下一个尚未到达的坐标，作为计时器的停靠点
    pub(crate) fn next_stop(
        &self,
        direction: Direction,
        pass: u64,
        timer: &PhaseTimer,
    ) -> Option<Coordinate> {
        self.items
            .iter()
            .filter(|i| i.is_due(direction, pass) && !timer.has_reached(i.coordinate))
            .map(|i| i.coordinate)
            .min_by(|a, b| a.cmp_position(b))
    }

    /// 触发已到达的最早一组（同一坐标）项目
    ///
    /// 没有到期项目时返回 `None`。任务出错时立即返回错误，
    /// 同组剩余项目不再触发。
    pub(crate) fn fire_next_group(
        &mut self,
        direction: Direction,
        pass: u64,
        timer: &PhaseTimer,
    ) -> ClipResult<Option<FiredGroup>> {
        let Some(coordinate) = self
            .items
            .iter()
            .filter(|i| i.is_due(direction, pass) && timer.has_reached(i.coordinate))
            .map(|i| i.coordinate)
            .min_by(|a, b| a.cmp_position(b))
        else {
            return Ok(None);
        };

        let mut group = FiredGroup {
            coordinate,
            tasks: 0,
            promises: 0,
            waits: Vec::new(),
        };
        for item in self
            .items
            .iter_mut()
            .filter(|i| i.is_due(direction, pass) && i.coordinate == coordinate)
        {
            item.fired_in_pass = Some(pass);
            match &mut item.action {
                ItemAction::Task(f) => {
                    tracing::trace!(%direction, %coordinate, "触发调度任务");
                    group.tasks += 1;
                    if let TaskOutcome::Await(deferred) = f()? {
                        group.waits.push(deferred);
                    }
                }
                ItemAction::Promise(deferred) => {
                    tracing::trace!(%direction, %coordinate, "结算等待点");
                    group.promises += 1;
                    deferred.resolve();
                }
            }
        }

        self.items
            .retain(|i| !(matches!(i.action, ItemAction::Promise(_)) && i.fired_in_pass.is_some()));
        Ok(Some(group))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn active_timer_at(elapsed: f32) -> PhaseTimer {
        let mut timer = PhaseTimer::new(0.0, 1.0, 0.0);
        timer.step(0.0, None);
        timer.step(elapsed, None);
        timer
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> TaskFn {
        let log = log.clone();
        Box::new(move || {
            log.borrow_mut().push(name);
            Ok(TaskOutcome::Done)
        })
    }

    #[test]
    fn test_rewind_callback_uses_mirrored_coordinate() {
        let mut scheduler = TaskScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler
            .schedule_task(
                Phase::Active,
                25.0,
                TaskCallbacks {
                    on_play: Some(recorder(&log, "play")),
                    on_rewind: Some(recorder(&log, "rewind")),
                },
            )
            .unwrap();

        let timer = active_timer_at(0.5);
        assert_eq!(
            scheduler.next_stop(Direction::Backward, 1, &timer),
            Some(Coordinate::new(Phase::Active, 75.0).unwrap())
        );
        assert!(scheduler.fire_next_group(Direction::Backward, 1, &timer).unwrap().is_none());

        let timer = active_timer_at(0.75);
        let group = scheduler
            .fire_next_group(Direction::Backward, 1, &timer)
            .unwrap()
            .unwrap();
        assert_eq!(group.tasks, 1);
        assert_eq!(*log.borrow(), vec!["rewind"]);
    }

    #[test]
    fn test_same_coordinate_fires_in_registration_order() {
        let mut scheduler = TaskScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            scheduler
                .schedule_task(
                    Phase::Active,
                    50.0,
                    TaskCallbacks {
                        on_play: Some(recorder(&log, name)),
                        on_rewind: None,
                    },
                )
                .unwrap();
        }
        let timer = active_timer_at(0.5);
        let group = scheduler
            .fire_next_group(Direction::Forward, 1, &timer)
            .unwrap()
            .unwrap();
        assert_eq!(group.tasks, 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);

        // 同一次播放不再重复触发，下一次播放再次触发
        assert!(scheduler.fire_next_group(Direction::Forward, 1, &timer).unwrap().is_none());
        assert!(scheduler.fire_next_group(Direction::Forward, 2, &timer).unwrap().is_some());
        assert_eq!(log.borrow().len(), 6);
    }

    #[test]
    fn test_groups_fire_earliest_first() {
        let mut scheduler = TaskScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler
            .schedule_task(Phase::Active, 75.0, TaskCallbacks { on_play: Some(recorder(&log, "late")), on_rewind: None })
            .unwrap();
        scheduler
            .schedule_task(Phase::Active, 25.0, TaskCallbacks { on_play: Some(recorder(&log, "early")), on_rewind: None })
            .unwrap();

        let timer = active_timer_at(1.0);
        while scheduler.fire_next_group(Direction::Forward, 1, &timer).unwrap().is_some() {}
        assert_eq!(*log.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn test_promise_resolves_once_and_is_consumed() {
        let mut scheduler = TaskScheduler::new();
        let promise = scheduler
            .schedule_promise(Direction::Forward, Phase::Active, 50.0)
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        let timer = active_timer_at(0.25);
        assert!(scheduler.fire_next_group(Direction::Forward, 1, &timer).unwrap().is_none());
        assert!(!promise.is_settled());

        let timer = active_timer_at(0.5);
        let group = scheduler
            .fire_next_group(Direction::Forward, 1, &timer)
            .unwrap()
            .unwrap();
        assert_eq!(group.promises, 1);
        assert!(promise.is_resolved());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_promise_ignores_other_direction() {
        let mut scheduler = TaskScheduler::new();
        let promise = scheduler
            .schedule_promise(Direction::Backward, Phase::Active, 10.0)
            .unwrap();
        let timer = active_timer_at(1.0);
        assert!(scheduler.fire_next_group(Direction::Forward, 1, &timer).unwrap().is_none());
        assert!(!promise.is_settled());
    }

    #[test]
    fn test_registration_behind_running_timer_waits_for_next_pass() {
        let mut scheduler = TaskScheduler::new();
        let timer = active_timer_at(0.75);
        let running = RunningPass {
            id: 1,
            direction: Direction::Forward,
            timer: &timer,
        };
        let behind = scheduler
            .schedule_promise_during(Direction::Forward, Phase::Active, 10.0, Some(running))
            .unwrap();
        let ahead = scheduler
            .schedule_promise_during(Direction::Forward, Phase::Active, 90.0, Some(running))
            .unwrap();

        let later = active_timer_at(1.0);
        let group = scheduler
            .fire_next_group(Direction::Forward, 1, &later)
            .unwrap()
            .unwrap();
        assert_eq!(group.coordinate, Coordinate::new(Phase::Active, 90.0).unwrap());
        assert!(ahead.is_resolved());
        assert!(scheduler.fire_next_group(Direction::Forward, 1, &later).unwrap().is_none());
        assert!(!behind.is_settled());

        let next_pass = active_timer_at(0.5);
        scheduler.fire_next_group(Direction::Forward, 2, &next_pass).unwrap();
        assert!(behind.is_resolved());
    }

    #[test]
    fn test_task_outcome_await_is_collected() {
        let mut scheduler = TaskScheduler::new();
        let gate = Deferred::pending();
        let handle = gate.clone();
        scheduler
            .schedule_task(
                Phase::Delay,
                0.0,
                TaskCallbacks::new().on_play(move || Ok(TaskOutcome::Await(handle.clone()))),
            )
            .unwrap();
        let timer = PhaseTimer::new(1.0, 1.0, 0.0);
        let group = scheduler
            .fire_next_group(Direction::Forward, 1, &timer)
            .unwrap()
            .unwrap();
        assert_eq!(group.waits.len(), 1);
        assert!(group.waits[0].ptr_eq(&gate));
    }

    #[test]
    fn test_invalid_percentage() {
        let mut scheduler = TaskScheduler::new();
        assert!(matches!(
            scheduler.schedule_task(Phase::Active, 120.0, TaskCallbacks::new()),
            Err(ConfigError::InvalidPercentage { .. })
        ));
        assert!(scheduler.schedule_promise(Direction::Forward, Phase::Delay, -5.0).is_err());
    }
}
