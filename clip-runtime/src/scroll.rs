//! # Scroll 模块
//!
//! 滚动锚点栈。
//!
//! scroll 类别的 clip 在播放开始时压入锚点，播放结算（完成或出错）时弹出。
//! 嵌套的滚动效果按开始顺序叠放，[`current`] 总是返回最内层的锚点。
//! 执行模型是单线程的，栈以线程局部变量保存。

use std::cell::RefCell;

use crate::clip::ClipId;
use crate::phase::Direction;

/// 滚动锚点
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAnchor {
    pub clip: ClipId,
    /// 元素标签
    pub label: String,
    pub direction: Direction,
    /// 播放开始时的滚动位置
    pub scroll_top: f32,
    pub scroll_left: f32,
}

thread_local! {
    static ANCHORS: RefCell<Vec<ScrollAnchor>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn push(anchor: ScrollAnchor) {
    tracing::trace!(clip = %anchor.clip, depth = depth() + 1, "压入滚动锚点");
    ANCHORS.with(|stack| stack.borrow_mut().push(anchor));
}

/// 弹出该 clip 最近压入的锚点
pub(crate) fn pop(clip: ClipId) -> Option<ScrollAnchor> {
    ANCHORS.with(|stack| {
        let mut stack = stack.borrow_mut();
        let index = stack.iter().rposition(|a| a.clip == clip)?;
        Some(stack.remove(index))
    })
}

/// 最内层锚点
pub fn current() -> Option<ScrollAnchor> {
    ANCHORS.with(|stack| stack.borrow().last().cloned())
}

/// 当前嵌套深度
pub fn depth() -> usize {
    ANCHORS.with(|stack| stack.borrow().len())
}

/// 从外到内的全部锚点
pub fn snapshot() -> Vec<ScrollAnchor> {
    ANCHORS.with(|stack| stack.borrow().clone())
}
