//! 本地化边界：引擎只通过 `Localizer` 取显示文本。

use std::collections::HashMap;

use serde::Deserialize;

use super::rules::RuleError;

pub trait Localizer {
    /// 查找 `category` 下 `key` 的文本并依次填入 `{}` 占位符。找不到时返回 key 本身，不允许失败。
    fn localize(&self, category: &str, key: &str, args: &[&str]) -> String;
}

/// 依次用参数替换模板中的 `{}`，多余的占位符保持原样。
pub fn fill_placeholders(template: &str, args: &[&str]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(index) = rest.find("{}") {
        output.push_str(&rest[..index]);
        match args.next() {
            Some(arg) => output.push_str(arg),
            None => output.push_str("{}"),
        }
        rest = &rest[index + 2..];
    }
    output.push_str(rest);
    output
}

/// 不做翻译，直接使用 key。
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyLocalizer;

impl Localizer for KeyLocalizer {
    fn localize(&self, _category: &str, key: &str, args: &[&str]) -> String {
        fill_placeholders(key, args)
    }
}

/// 分类 -> key -> 文本 的翻译表。
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TableLocalizer {
    tables: HashMap<String, HashMap<String, String>>,
}

impl TableLocalizer {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|error| RuleError::InvalidArgument {
            reason: format!("invalid translation table: {error}"),
        })
    }

    pub fn insert(
        &mut self,
        category: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.tables
            .entry(category.into())
            .or_default()
            .insert(key.into(), text.into());
    }
}

impl Localizer for TableLocalizer {
    fn localize(&self, category: &str, key: &str, args: &[&str]) -> String {
        let template = self
            .tables
            .get(category)
            .and_then(|table| table.get(key))
            .map(String::as_str)
            .unwrap_or(key);
        fill_placeholders(template, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_fill_in_order() {
        assert_eq!(fill_placeholders("{} hits {}", &["A", "B"]), "A hits B");
        assert_eq!(fill_placeholders("{} wins {}", &["A"]), "A wins {}");
        assert_eq!(KeyLocalizer.localize("message", "Game over!", &[]), "Game over!");
    }

    #[test]
    fn table_falls_back_to_the_key() {
        let table = TableLocalizer::from_json(
            r#"{"message": {"{} wins!": "{} 获胜！"}, "actions": {"draw 2 cards": "抽两张牌"}}"#,
        )
        .expect("valid table");

        assert_eq!(table.localize("message", "{} wins!", &["Alex"]), "Alex 获胜！");
        assert_eq!(table.localize("actions", "draw 2 cards", &[]), "抽两张牌");
        assert_eq!(table.localize("message", "{} is dead", &["Bo"]), "Bo is dead");
        assert!(TableLocalizer::from_json("[1, 2]").is_err());
    }
}
