//! # Driver 模块
//!
//! 统一推进多个 clip 的管理器。
//!
//! ```rust,ignore
//! let mut driver = ClipDriver::new();
//! let id = driver.insert(clip);
//! driver.play(id)?;
//! // 每帧
//! for (id, event) in driver.update(dt) { /* ... */ }
//! ```

use std::collections::BTreeMap;

use crate::clip::{Clip, ClipEvent, ClipId};
use crate::deferred::Deferred;
use crate::error::{ClipResult, PlaybackError};

/// clip 驱动器
///
/// 按 [`ClipId`] 顺序（即创建顺序）推进 clip，事件按同样的顺序返回。
#[derive(Default)]
pub struct ClipDriver {
    clips: BTreeMap<ClipId, Clip>,
}

impl std::fmt::Debug for ClipDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipDriver")
            .field("clips", &self.clips.len())
            .field("running", &self.running_count())
            .finish()
    }
}

impl ClipDriver {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== clip 管理 ==========

    /// 接管 clip，返回其 ID
    pub fn insert(&mut self, clip: Clip) -> ClipId {
        let id = clip.id();
        self.clips.insert(id, clip);
        id
    }

    /// 移除 clip 并交还所有权
    pub fn remove(&mut self, id: ClipId) -> Option<Clip> {
        self.clips.remove(&id)
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }

    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.get_mut(&id)
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.clips.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    // ========== 播放控制 ==========

    pub fn play(&mut self, id: ClipId) -> ClipResult<Deferred> {
        self.clip_mut(id)?.play()
    }

    pub fn rewind(&mut self, id: ClipId) -> ClipResult<Deferred> {
        self.clip_mut(id)?.rewind()
    }

    fn clip_mut(&mut self, id: ClipId) -> Result<&mut Clip, PlaybackError> {
        self.clips
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::UnknownClip { id: id.to_string() })
    }

    /// 推进所有 clip
    pub fn update(&mut self, dt: f32) -> Vec<(ClipId, ClipEvent)> {
        let mut events = Vec::new();
        for (id, clip) in &mut self.clips {
            events.extend(clip.update(dt).into_iter().map(|event| (*id, event)));
        }
        events
    }

    /// 正在播放（含暂停与等待中）的 clip 数量
    pub fn running_count(&self) -> usize {
        self.clips
            .values()
            .filter(|c| c.status().is_running() && !c.is_faulted())
            .count()
    }

    pub fn has_running(&self) -> bool {
        self.running_count() > 0
    }

    /// 移除所有 clip
    pub fn clear(&mut self) {
        self.clips.clear();
    }
}
