use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
};

/// 文法符号, 终结符和非终结符共用同一个类型, 分类由 [`crate::Grammar`] 决定.
///
/// 符号字符串被驻留在文法的 [`bumpalo::Bump`] 中, 因此 `Symbol` 是 [`Copy`] 的.
#[derive(PartialEq, Eq, Clone, Hash, Copy, PartialOrd, Ord)]
pub struct Symbol<'a> {
    ident: &'a str,
}

impl Debug for Symbol<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("s{:?}", self.ident))
    }
}

impl Display for Symbol<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.ident)
    }
}

impl<'a> From<&'a str> for Symbol<'a> {
    fn from(ident: &'a str) -> Self {
        Symbol { ident }
    }
}

// 排序和哈希都只依赖 ident, 所以可以直接用 &str 查询以 Symbol 为键的集合.
impl Borrow<str> for Symbol<'_> {
    fn borrow(&self) -> &str {
        self.ident
    }
}

impl<'a> Symbol<'a> {
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.ident
    }

    /// 是否为保留符号 ([`END`] 或 [`AUGMENTED_START`]).
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        *self == END || *self == AUGMENTED_START
    }
}

/// 输入结束符.
pub const END: Symbol<'static> = Symbol { ident: "$" };
/// 增广产生式 `@ -> start` 的头部.
pub const AUGMENTED_START: Symbol<'static> = Symbol { ident: "@" };

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::{AUGMENTED_START, END, Symbol};
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_by_str() {
        let map: BTreeMap<Symbol<'static>, usize> =
            [(Symbol::from("NP"), 1), (END, 2)].into_iter().collect();
        assert_eq!(map.get("NP"), Some(&1));
        assert_eq!(map.get("$"), Some(&2));
        assert_eq!(map.get("VP"), None);
    }

    #[test]
    fn reserved() {
        assert!(END.is_reserved());
        assert!(AUGMENTED_START.is_reserved());
        assert!(!Symbol::from("S").is_reserved());
        assert_eq!(format!("{:?} {}", Symbol::from("S"), END), r#"s"S" $"#);
    }
}
