//! # Element 模块
//!
//! 视觉元素适配层。
//!
//! 引擎只通过 [`VisualElement`] 读写元素的数值属性与可见性，
//! 具体渲染由宿主实现。[`MemoryElement`] 是纯内存实现，
//! 供测试和无头播放器使用。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 元素可见性（三态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    /// 可见
    #[default]
    Visible,
    /// 占位但不可见
    Invisible,
    /// 不参与渲染
    Unrendered,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        !matches!(self, Visibility::Visible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Visible => "visible",
            Visibility::Invisible => "invisible",
            Visibility::Unrendered => "unrendered",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 隐藏方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HideType {
    /// 移出渲染（`display-none`）
    #[default]
    #[serde(rename = "display-none")]
    Unrendered,
    /// 保留占位（`visibility-hidden`）
    #[serde(rename = "visibility-hidden")]
    Invisible,
}

impl HideType {
    pub fn as_str(self) -> &'static str {
        match self {
            HideType::Unrendered => "display-none",
            HideType::Invisible => "visibility-hidden",
        }
    }

    /// 从元素当前可见性推断隐藏方式，可见时返回 `None`
    pub fn from_visibility(visibility: Visibility) -> Option<HideType> {
        match visibility {
            Visibility::Visible => None,
            Visibility::Invisible => Some(HideType::Invisible),
            Visibility::Unrendered => Some(HideType::Unrendered),
        }
    }
}

impl From<HideType> for Visibility {
    fn from(value: HideType) -> Self {
        match value {
            HideType::Unrendered => Visibility::Unrendered,
            HideType::Invisible => Visibility::Invisible,
        }
    }
}

impl FromStr for HideType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "display-none" => Ok(HideType::Unrendered),
            "visibility-hidden" => Ok(HideType::Invisible),
            other => Err(ConfigError::InvalidHideType {
                value: other.to_string(),
            }),
        }
    }
}

/// 可被 clip 驱动的视觉元素
///
/// 所有方法都取 `&self`：元素由宿主和多个 clip 共享，
/// 实现方自行使用内部可变性。
pub trait VisualElement {
    /// 用于诊断信息的标签
    fn label(&self) -> String;

    /// 读取数值属性，不存在时返回 `None`
    fn get_property(&self, name: &str) -> Option<f32>;

    /// 写入数值属性，不支持该属性时返回 `false`
    fn set_property(&self, name: &str, value: f32) -> bool;

    /// 当前可见性
    fn visibility(&self) -> Visibility;

    /// 设置可见性
    fn set_visibility(&self, visibility: Visibility);
}

#[derive(Debug)]
struct MemoryElementData {
    label: String,
    properties: BTreeMap<String, f32>,
    visibility: Visibility,
}

/// 纯内存元素
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Debug, Clone)]
pub struct MemoryElement {
    inner: Rc<RefCell<MemoryElementData>>,
}

impl MemoryElement {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryElementData {
                label: label.into(),
                properties: BTreeMap::new(),
                visibility: Visibility::Visible,
            })),
        }
    }

    pub fn with_property(self, name: impl Into<String>, value: f32) -> Self {
        self.inner.borrow_mut().properties.insert(name.into(), value);
        self
    }

    pub fn with_visibility(self, visibility: Visibility) -> Self {
        self.inner.borrow_mut().visibility = visibility;
        self
    }

    pub fn property(&self, name: &str) -> Option<f32> {
        self.inner.borrow().properties.get(name).copied()
    }

    /// 所有属性的快照
    pub fn properties(&self) -> BTreeMap<String, f32> {
        self.inner.borrow().properties.clone()
    }

    /// 转换为 trait 对象句柄（共享状态）
    pub fn handle(&self) -> Rc<dyn VisualElement> {
        Rc::new(self.clone())
    }
}

impl VisualElement for MemoryElement {
    fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    fn get_property(&self, name: &str) -> Option<f32> {
        self.property(name)
    }

    fn set_property(&self, name: &str, value: f32) -> bool {
        self.inner
            .borrow_mut()
            .properties
            .insert(name.to_string(), value);
        true
    }

    fn visibility(&self) -> Visibility {
        self.inner.borrow().visibility
    }

    fn set_visibility(&self, visibility: Visibility) {
        self.inner.borrow_mut().visibility = visibility;
    }
}
