//! # Effect Args
//!
//! 传给效果定义的参数。支持位置参数与命名参数，
//! 取值时优先命名参数，回退到位置参数。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 单个效果参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectArg {
    /// 数字参数，如 `1.5`
    Number(f32),
    /// 布尔参数，如 `true`
    Bool(bool),
    /// 字符串参数，如 `"left"`
    Text(String),
}

impl EffectArg {
    /// 从命令行风格的文本推断类型：数字、布尔，否则作为字符串
    pub fn infer(text: &str) -> Self {
        if let Ok(n) = text.parse::<f32>() {
            EffectArg::Number(n)
        } else if let Ok(b) = text.parse::<bool>() {
            EffectArg::Bool(b)
        } else {
            EffectArg::Text(text.to_string())
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            EffectArg::Number(_) => "数字",
            EffectArg::Bool(_) => "布尔值",
            EffectArg::Text(_) => "字符串",
        }
    }
}

impl fmt::Display for EffectArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectArg::Number(n) => write!(f, "{n}"),
            EffectArg::Bool(b) => write!(f, "{b}"),
            EffectArg::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f32> for EffectArg {
    fn from(value: f32) -> Self {
        EffectArg::Number(value)
    }
}

impl From<f64> for EffectArg {
    fn from(value: f64) -> Self {
        EffectArg::Number(value as f32)
    }
}

impl From<bool> for EffectArg {
    fn from(value: bool) -> Self {
        EffectArg::Bool(value)
    }
}

impl From<&str> for EffectArg {
    fn from(value: &str) -> Self {
        EffectArg::Text(value.to_string())
    }
}

impl From<String> for EffectArg {
    fn from(value: String) -> Self {
        EffectArg::Text(value)
    }
}

/// 效果参数列表
///
/// - `None` 键 = 位置参数
/// - `Some(key)` = 命名参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectArgs {
    args: Vec<(Option<String>, EffectArg)>,
}

impl EffectArgs {
    /// 空参数
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部为位置参数
    pub fn positional(args: impl IntoIterator<Item = EffectArg>) -> Self {
        Self {
            args: args.into_iter().map(|a| (None, a)).collect(),
        }
    }

    /// 追加位置参数
    pub fn push(mut self, arg: impl Into<EffectArg>) -> Self {
        self.args.push((None, arg.into()));
        self
    }

    /// 追加命名参数
    pub fn named(mut self, key: impl Into<String>, arg: impl Into<EffectArg>) -> Self {
        self.args.push((Some(key.into()), arg.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// 所有命名参数
    pub fn named_entries(&self) -> impl Iterator<Item = (&str, &EffectArg)> {
        self.args
            .iter()
            .filter_map(|(k, v)| k.as_deref().map(|k| (k, v)))
    }

    /// 获取位置参数（按索引）
    pub fn get_positional(&self, index: usize) -> Option<&EffectArg> {
        self.args
            .iter()
            .filter(|(key, _)| key.is_none())
            .nth(index)
            .map(|(_, v)| v)
    }

    /// 获取命名参数（按 key）
    pub fn get_named(&self, key: &str) -> Option<&EffectArg> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// 获取参数值：优先命名参数，回退到位置参数
    pub fn get(&self, key: &str, positional_index: usize) -> Option<&EffectArg> {
        self.get_named(key)
            .or_else(|| self.get_positional(positional_index))
    }

    /// 必填数字参数
    pub fn number(&self, effect: &str, key: &str, index: usize) -> Result<f32, ConfigError> {
        match self.get(key, index) {
            Some(EffectArg::Number(n)) if n.is_finite() => Ok(*n),
            Some(other) => Err(invalid(effect, key, other, "有限数字")),
            None => Err(ConfigError::MissingArgument {
                effect: effect.to_string(),
                param: key.to_string(),
            }),
        }
    }

    /// 可选数字参数
    pub fn number_or(
        &self,
        effect: &str,
        key: &str,
        index: usize,
        default: f32,
    ) -> Result<f32, ConfigError> {
        if self.get(key, index).is_none() {
            return Ok(default);
        }
        self.number(effect, key, index)
    }

    /// 可选布尔参数
    pub fn bool_or(
        &self,
        effect: &str,
        key: &str,
        index: usize,
        default: bool,
    ) -> Result<bool, ConfigError> {
        match self.get(key, index) {
            None => Ok(default),
            Some(EffectArg::Bool(b)) => Ok(*b),
            Some(other) => Err(invalid(effect, key, other, "布尔值")),
        }
    }

    /// 可选字符串参数
    pub fn text(&self, effect: &str, key: &str, index: usize) -> Result<Option<&str>, ConfigError> {
        match self.get(key, index) {
            None => Ok(None),
            Some(EffectArg::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(invalid(effect, key, other, "字符串")),
        }
    }
}

fn invalid(effect: &str, key: &str, got: &EffectArg, expected: &str) -> ConfigError {
    ConfigError::InvalidArgument {
        effect: effect.to_string(),
        param: key.to_string(),
        message: format!("期望{expected}，实际为{} {got}", got.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_overrides_positional() {
        let args = EffectArgs::new().push(10.0).named("x", 20.0);
        assert_eq!(args.get("x", 0), Some(&EffectArg::Number(20.0)));
        assert_eq!(args.get("y", 0), Some(&EffectArg::Number(10.0)));
        assert_eq!(args.get("y", 1), None);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_positional_skips_named() {
        let args = EffectArgs::new().named("a", 1.0).push(2.0).push(3.0);
        assert_eq!(args.get_positional(0), Some(&EffectArg::Number(2.0)));
        assert_eq!(args.get_positional(1), Some(&EffectArg::Number(3.0)));
        assert_eq!(args.named_entries().count(), 1);
    }

    #[test]
    fn test_typed_getters() {
        let args = EffectArgs::new().named("dx", 5.0).named("label", "top");
        assert_eq!(args.number("translate", "dx", 0).unwrap(), 5.0);
        assert_eq!(args.number_or("translate", "dy", 1, 0.0).unwrap(), 0.0);
        assert_eq!(args.text("translate", "label", 9).unwrap(), Some("top"));
        assert!(args.bool_or("translate", "loop", 9, true).unwrap());
    }

    #[test]
    fn test_typed_getter_errors() {
        let args = EffectArgs::new().named("dx", "far");
        assert!(matches!(
            args.number("translate", "dy", 5),
            Err(ConfigError::MissingArgument { .. })
        ));
        let err = args.number("translate", "dx", 0).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"效果 'translate' 的参数 'dx' 无效 - 期望有限数字，实际为字符串 "far"；提示：检查参数类型与取值"#
        );
    }

    #[test]
    fn test_infer() {
        assert_eq!(EffectArg::infer("1.5"), EffectArg::Number(1.5));
        assert_eq!(EffectArg::infer("true"), EffectArg::Bool(true));
        assert_eq!(EffectArg::infer("left"), EffectArg::Text("left".to_string()));
    }
}
