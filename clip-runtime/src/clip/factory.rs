//! # Factory 模块
//!
//! 按类别和效果名创建 clip。
//!
//! 每个类别一个便捷方法，效果名既可以是字符串，也可以是内置效果枚举：
//!
//! ```ignore
//! let factory = ClipFactory::builtin();
//! let clip = factory.entrance(element, EntranceEffect::FadeIn, EffectArgs::new(), None)?;
//! ```

use std::rc::Rc;

use super::{Clip, EffectCategory};
use crate::config::ClipConfigPartial;
use crate::effect::{EffectArgs, EffectBank};
use crate::element::VisualElement;
use crate::error::ClipResult;

/// clip 工厂
#[derive(Debug, Clone)]
pub struct ClipFactory {
    bank: EffectBank,
}

impl Default for ClipFactory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClipFactory {
    pub fn new(bank: EffectBank) -> Self {
        Self { bank }
    }

    /// 使用内置效果库
    pub fn builtin() -> Self {
        Self::new(EffectBank::builtin())
    }

    pub fn bank(&self) -> &EffectBank {
        &self.bank
    }

    /// 创建 clip
    ///
    /// 效果名未注册或配置无效时返回错误，不会改动元素。
    pub fn create(
        &self,
        category: EffectCategory,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        let name = name.as_ref();
        let definition = self.bank.get(category, name)?;
        Ok(Clip::new(category, name, definition, element, args, overrides)?)
    }

    pub fn entrance(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Entrance, element, name, args, overrides)
    }

    pub fn exit(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Exit, element, name, args, overrides)
    }

    pub fn emphasis(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Emphasis, element, name, args, overrides)
    }

    pub fn motion(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Motion, element, name, args, overrides)
    }

    pub fn transition(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Transition, element, name, args, overrides)
    }

    pub fn connector_setter(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::ConnectorSetter, element, name, args, overrides)
    }

    pub fn connector_entrance(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::ConnectorEntrance, element, name, args, overrides)
    }

    pub fn connector_exit(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::ConnectorExit, element, name, args, overrides)
    }

    pub fn scroll(
        &self,
        element: Rc<dyn VisualElement>,
        name: impl AsRef<str>,
        args: EffectArgs,
        overrides: Option<&ClipConfigPartial>,
    ) -> ClipResult<Clip> {
        self.create(EffectCategory::Scroll, element, name, args, overrides)
    }
}
