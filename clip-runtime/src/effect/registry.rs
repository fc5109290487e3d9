//! # Effect Registry
//!
//! 效果名称到效果定义的映射，按类别划分。
//!
//! [`EffectBank`] 构造后只读；扩展时通过 [`EffectBank::with_extensions`]
//! 得到新的 bank，已有名称（包括内置效果）不能被覆盖。
//! 内置效果名称由各类别的枚举给出，是这些名称的**唯一来源**。

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::EffectDefinition;
use crate::clip::EffectCategory;
use crate::error::ConfigError;

/// 内置效果名称
pub trait BuiltinEffect: Copy + 'static {
    const CATEGORY: EffectCategory;

    fn as_str(self) -> &'static str;

    fn all() -> &'static [Self];
}

macro_rules! builtin_effects {
    ($(#[$meta:meta])* $name:ident, $category:expr, { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl BuiltinEffect for $name {
            const CATEGORY: EffectCategory = $category;

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            fn all() -> &'static [Self] {
                &[$($name::$variant),+]
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

builtin_effects!(
    /// 内置 entrance 效果
    EntranceEffect, EffectCategory::Entrance, {
        /// 瞬间出现
        Appear => "appear",
        /// 淡入
        FadeIn => "fade-in",
    }
);

builtin_effects!(
    /// 内置 exit 效果
    ExitEffect, EffectCategory::Exit, {
        /// 瞬间消失
        Disappear => "disappear",
        /// 淡出
        FadeOut => "fade-out",
    }
);

builtin_effects!(
    /// 内置 emphasis 效果
    EmphasisEffect, EffectCategory::Emphasis, {
        /// 高亮强度 0 → 1
        Highlight => "highlight",
        /// 放大后复原
        Pulse => "pulse",
    }
);

builtin_effects!(
    /// 内置 motion 效果
    MotionEffect, EffectCategory::Motion, {
        /// 平移 `(dx, dy)`
        Translate => "translate",
    }
);

builtin_effects!(
    /// 内置 transition 效果
    TransitionEffect, EffectCategory::Transition, {
        /// 把不透明度过渡到目标值
        FadeTo => "fade-to",
    }
);

builtin_effects!(
    /// 内置 connector-setter 效果
    ConnectorSetterEffect, EffectCategory::ConnectorSetter, {
        /// 按命名参数直接设置属性
        Set => "set",
    }
);

builtin_effects!(
    /// 内置 connector-entrance 效果
    ConnectorEntranceEffect, EffectCategory::ConnectorEntrance, {
        /// 沿路径描出
        Trace => "trace",
    }
);

builtin_effects!(
    /// 内置 connector-exit 效果
    ConnectorExitEffect, EffectCategory::ConnectorExit, {
        /// 沿路径擦除
        Untrace => "untrace",
    }
);

builtin_effects!(
    /// 内置 scroll 效果
    ScrollEffect, EffectCategory::Scroll, {
        /// 滚动到目标位置
        ScrollTo => "scroll-to",
    }
);

type CategoryTable = HashMap<EffectCategory, BTreeMap<String, Rc<EffectDefinition>>>;

/// 效果库
#[derive(Debug, Clone, Default)]
pub struct EffectBank {
    categories: Rc<CategoryTable>,
}

impl EffectBank {
    /// 空效果库
    pub fn empty() -> Self {
        Self::default()
    }

    /// 仅包含内置效果
    pub fn builtin() -> Self {
        super::presets::builtin_bank()
    }

    pub fn builder() -> EffectBankBuilder {
        EffectBankBuilder::new()
    }

    /// 查找效果定义
    pub fn get(&self, category: EffectCategory, name: &str) -> Result<Rc<EffectDefinition>, ConfigError> {
        self.categories
            .get(&category)
            .and_then(|table| table.get(name))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEffect {
                category,
                name: name.to_string(),
                available: self.names(category).join(", "),
            })
    }

    pub fn contains(&self, category: EffectCategory, name: &str) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|table| table.contains_key(name))
    }

    /// 某类别下的全部名称（按字典序）
    pub fn names(&self, category: EffectCategory) -> Vec<&str> {
        self.categories
            .get(&category)
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// 定义总数
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 由固定的内置名称直接构造，内置名称互不重复
    pub(super) fn from_builtin(entries: Vec<(EffectCategory, &'static str, EffectDefinition)>) -> Self {
        let mut table = CategoryTable::new();
        for (category, name, definition) in entries {
            table
                .entry(category)
                .or_default()
                .insert(name.to_string(), Rc::new(definition));
        }
        Self {
            categories: Rc::new(table),
        }
    }

    /// 在当前效果库基础上追加定义，返回新的效果库
    pub fn with_extensions(&self, extensions: EffectBankBuilder) -> Result<EffectBank, ConfigError> {
        let mut table = (*self.categories).clone();
        extensions.insert_into(&mut table)?;
        Ok(EffectBank {
            categories: Rc::new(table),
        })
    }
}

/// 效果库构建器
#[derive(Debug, Default)]
pub struct EffectBankBuilder {
    entries: Vec<(EffectCategory, String, EffectDefinition)>,
}

impl EffectBankBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个效果定义
    pub fn define(
        mut self,
        category: EffectCategory,
        name: impl Into<String>,
        definition: EffectDefinition,
    ) -> Self {
        self.entries.push((category, name.into(), definition));
        self
    }

    /// 登记一个内置名称的效果定义
    pub fn define_builtin<E: BuiltinEffect>(self, effect: E, definition: EffectDefinition) -> Self {
        self.define(E::CATEGORY, effect.as_str(), definition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 冻结为效果库
    pub fn build(self) -> Result<EffectBank, ConfigError> {
        let mut table = CategoryTable::new();
        self.insert_into(&mut table)?;
        Ok(EffectBank {
            categories: Rc::new(table),
        })
    }

    fn insert_into(self, table: &mut CategoryTable) -> Result<(), ConfigError> {
        for (category, name, definition) in self.entries {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyEffectName { category });
            }
            let slot = table.entry(category).or_default();
            if slot.contains_key(&name) {
                return Err(ConfigError::DuplicateEffect { category, name });
            }
            tracing::debug!(%category, name = %name, "登记效果定义");
            slot.insert(name, Rc::new(definition));
        }
        Ok(())
    }
}
