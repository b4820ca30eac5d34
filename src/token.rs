use std::fmt::Display;

use crate::symbol::END;

/// 输入 token: 文法终结符和它在源文本中的值.
///
/// 终结符不在文法中的 token 也可以输入, 在整体匹配模式下它会让所有分支失败,
/// 在局部匹配模式下它只是一个短语边界.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token<'t> {
    symbol: &'t str,
    value: &'t str,
    /// 在源文本中的字节范围 (如果有的话).
    span: Option<(usize, usize)>,
}

impl<'t> Token<'t> {
    #[must_use]
    pub fn new(symbol: &'t str, value: &'t str) -> Self {
        Self {
            symbol,
            value,
            span: None,
        }
    }

    /// 输入结束标记 `$`.
    #[must_use]
    pub fn end() -> Self {
        Self::new(END.as_str(), "")
    }

    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }

    #[must_use]
    pub fn symbol(&self) -> &'t str {
        self.symbol
    }

    #[must_use]
    pub fn value(&self) -> &'t str {
        self.value
    }

    #[must_use]
    pub fn span(&self) -> Option<(usize, usize)> {
        self.span
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.symbol == END.as_str()
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value.is_empty() || self.value == self.symbol {
            f.pad(self.symbol)
        } else {
            f.pad(&format!("{}({})", self.symbol, self.value))
        }
    }
}

impl<'t> From<&'t str> for Token<'t> {
    /// 值与终结符相同的 token.
    fn from(symbol: &'t str) -> Self {
        Self::new(symbol, symbol)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Token;

    #[test]
    fn display() {
        assert_eq!(Token::new("n", "dog").to_string(), "n(dog)");
        assert_eq!(Token::from("det").to_string(), "det");
        assert_eq!(Token::end().to_string(), "$");
        assert!(Token::end().is_end());
        assert_eq!(Token::new("n", "dog").with_span(4, 7).span(), Some((4, 7)));
    }
}
