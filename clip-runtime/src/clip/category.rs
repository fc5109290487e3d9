//! # Category 模块
//!
//! 效果类别及其钩子。
//!
//! 类别决定三件事：默认/不可变配置层、`play()` 的可见性前置条件、
//! 播放开始与结束时对元素可见性的处理。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ClipConfig, ClipConfigPartial, Composite};
use crate::element::{HideType, Visibility, VisualElement};
use crate::error::{ConfigError, PlaybackError};
use crate::phase::Direction;

/// 效果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectCategory {
    Entrance,
    Exit,
    Emphasis,
    Motion,
    Transition,
    ConnectorSetter,
    ConnectorEntrance,
    ConnectorExit,
    Scroll,
}

/// 类别对元素可见性的作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VisibilityRole {
    /// 播放前隐藏、播放后可见
    Reveals,
    /// 播放前可见、播放后隐藏
    Conceals,
    Neutral,
}

impl EffectCategory {
    pub const ALL: [EffectCategory; 9] = [
        EffectCategory::Entrance,
        EffectCategory::Exit,
        EffectCategory::Emphasis,
        EffectCategory::Motion,
        EffectCategory::Transition,
        EffectCategory::ConnectorSetter,
        EffectCategory::ConnectorEntrance,
        EffectCategory::ConnectorExit,
        EffectCategory::Scroll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EffectCategory::Entrance => "entrance",
            EffectCategory::Exit => "exit",
            EffectCategory::Emphasis => "emphasis",
            EffectCategory::Motion => "motion",
            EffectCategory::Transition => "transition",
            EffectCategory::ConnectorSetter => "connector-setter",
            EffectCategory::ConnectorEntrance => "connector-entrance",
            EffectCategory::ConnectorExit => "connector-exit",
            EffectCategory::Scroll => "scroll",
        }
    }

    /// 类别默认配置
    pub fn default_config(self) -> ClipConfigPartial {
        match self {
            EffectCategory::Motion => ClipConfigPartial::new().composite(Composite::Accumulate),
            _ => ClipConfigPartial::new(),
        }
    }

    /// 类别不可变配置
    pub fn immutable_config(self) -> ClipConfigPartial {
        match self {
            EffectCategory::ConnectorSetter => ClipConfigPartial::new().duration(0.0),
            _ => ClipConfigPartial::new(),
        }
    }

    pub(crate) fn visibility_role(self) -> VisibilityRole {
        match self {
            EffectCategory::Entrance | EffectCategory::ConnectorEntrance => VisibilityRole::Reveals,
            EffectCategory::Exit | EffectCategory::ConnectorExit => VisibilityRole::Conceals,
            _ => VisibilityRole::Neutral,
        }
    }

    /// 播放期间是否登记滚动锚点
    pub fn uses_scroll_anchor(self) -> bool {
        self == EffectCategory::Scroll
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        EffectCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| ConfigError::UnknownCategory {
                value: value.to_string(),
            })
    }
}

/// 构造时的处理：entrance 按 `hide_now_type` 立即隐藏元素
pub(crate) fn on_construct(category: EffectCategory, element: &dyn VisualElement, config: &ClipConfig) {
    if let (VisibilityRole::Reveals, Some(hide)) = (category.visibility_role(), config.hide_now_type) {
        element.set_visibility(hide.into());
    }
}

/// `play()` 的可见性前置条件
pub(crate) fn check_play(
    category: EffectCategory,
    element: &dyn VisualElement,
    label: &str,
) -> Result<(), PlaybackError> {
    let actual = element.visibility();
    let expected = match category.visibility_role() {
        VisibilityRole::Reveals if !actual.is_hidden() => "隐藏",
        VisibilityRole::Conceals if actual.is_hidden() => "可见",
        _ => return Ok(()),
    };
    Err(PlaybackError::VisibilityMismatch {
        label: label.to_string(),
        category,
        expected,
        actual,
    })
}

/// 播放开始时的处理
///
/// 返回 entrance 正向播放前元素的隐藏方式，供反向播放结束时恢复。
pub(crate) fn on_pass_start(
    category: EffectCategory,
    direction: Direction,
    element: &dyn VisualElement,
    config: &ClipConfig,
) -> Option<HideType> {
    match (category.visibility_role(), direction) {
        (VisibilityRole::Reveals, Direction::Forward) => {
            let hidden = HideType::from_visibility(element.visibility())
                .or(config.hide_now_type)
                .unwrap_or_default();
            element.set_visibility(Visibility::Visible);
            Some(hidden)
        }
        (VisibilityRole::Conceals, Direction::Backward) => {
            element.set_visibility(Visibility::Visible);
            None
        }
        _ => None,
    }
}

/// 播放结束时的处理
pub(crate) fn on_pass_finish(
    category: EffectCategory,
    direction: Direction,
    element: &dyn VisualElement,
    config: &ClipConfig,
    remembered: Option<HideType>,
) {
    match (category.visibility_role(), direction) {
        (VisibilityRole::Reveals, Direction::Backward) => {
            element.set_visibility(remembered.unwrap_or_default().into());
        }
        (VisibilityRole::Conceals, Direction::Forward) => {
            element.set_visibility(config.exit_type.into());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;

    #[test]
    fn test_category_layers() {
        assert_eq!(
            EffectCategory::Motion.default_config().composite,
            Some(Composite::Accumulate)
        );
        assert_eq!(
            EffectCategory::ConnectorSetter.immutable_config().duration,
            Some(0.0)
        );
        assert!(EffectCategory::Emphasis.default_config().is_empty());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("connector-exit".parse(), Ok(EffectCategory::ConnectorExit));
        assert_eq!(" Scroll ".parse(), Ok(EffectCategory::Scroll));
        for category in EffectCategory::ALL {
            assert_eq!(category.to_string().parse(), Ok(category));
        }
        assert!(matches!(
            "fly".parse::<EffectCategory>(),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_entrance_requires_hidden() {
        let element = MemoryElement::new("box");
        let err = check_play(EffectCategory::Entrance, &element, "entrance:fade-in@box").unwrap_err();
        assert!(matches!(err, PlaybackError::VisibilityMismatch { expected: "隐藏", .. }));

        let hidden = MemoryElement::new("box").with_visibility(Visibility::Invisible);
        assert!(check_play(EffectCategory::ConnectorEntrance, &hidden, "x").is_ok());
    }

    #[test]
    fn test_exit_requires_visible() {
        let hidden = MemoryElement::new("box").with_visibility(Visibility::Unrendered);
        assert!(check_play(EffectCategory::Exit, &hidden, "x").is_err());
        assert!(check_play(EffectCategory::Emphasis, &hidden, "x").is_ok());
    }

    #[test]
    fn test_entrance_remembers_hide_type() {
        let element = MemoryElement::new("box").with_visibility(Visibility::Invisible);
        let config = ClipConfig::default();
        let remembered = on_pass_start(EffectCategory::Entrance, Direction::Forward, &element, &config);
        assert_eq!(remembered, Some(HideType::Invisible));
        assert_eq!(element.visibility(), Visibility::Visible);

        on_pass_finish(EffectCategory::Entrance, Direction::Backward, &element, &config, remembered);
        assert_eq!(element.visibility(), Visibility::Invisible);
    }

    #[test]
    fn test_exit_hides_on_finish_and_shows_on_rewind() {
        let element = MemoryElement::new("box");
        let config = ClipConfig {
            exit_type: HideType::Invisible,
            ..ClipConfig::default()
        };
        on_pass_finish(EffectCategory::Exit, Direction::Forward, &element, &config, None);
        assert_eq!(element.visibility(), Visibility::Invisible);
        on_pass_start(EffectCategory::Exit, Direction::Backward, &element, &config);
        assert_eq!(element.visibility(), Visibility::Visible);
    }

    #[test]
    fn test_hide_now_on_construct() {
        let element = MemoryElement::new("box");
        let config = ClipConfig {
            hide_now_type: Some(HideType::Unrendered),
            ..ClipConfig::default()
        };
        on_construct(EffectCategory::Exit, &element, &config);
        assert_eq!(element.visibility(), Visibility::Visible);
        on_construct(EffectCategory::Entrance, &element, &config);
        assert_eq!(element.visibility(), Visibility::Unrendered);
    }
}
