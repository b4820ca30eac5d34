use std::fmt::Display;

use crate::{Grammar, Symbol, Token};

/// 接受的分析结果, 叶子是输入 token, 内部节点对应一次归约.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxTree<'a, 't> {
    Leaf(Token<'t>),
    Node {
        symbol: Symbol<'a>,
        /// 归约使用的产生式编号.
        rule: usize,
        children: Vec<SyntaxTree<'a, 't>>,
    },
}

impl<'a, 't> SyntaxTree<'a, 't> {
    /// 叶子为 token 的终结符, 内部节点为产生式头部.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Leaf(token) => token.symbol(),
            Self::Node { symbol, .. } => symbol.as_str(),
        }
    }

    #[must_use]
    pub fn rule(&self) -> Option<usize> {
        match self {
            Self::Leaf(_) => None,
            Self::Node { rule, .. } => Some(*rule),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&Token<'t>> {
        match self {
            Self::Leaf(token) => Some(token),
            Self::Node { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[SyntaxTree<'a, 't>] {
        match self {
            Self::Leaf(_) => &[],
            Self::Node { children, .. } => children,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// 从左到右的叶子, 也就是被这棵树覆盖的输入 token.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Token<'t>> {
        let mut result = Vec::new();
        let mut pending = vec![self];
        while let Some(tree) = pending.pop() {
            match tree {
                Self::Leaf(token) => result.push(token),
                Self::Node { children, .. } => pending.extend(children.iter().rev()),
            }
        }
        result
    }

    /// 先序遍历中所有符号为 `symbol` 的最外层子树, 不会深入已经匹配的子树.
    #[must_use]
    pub fn find(&self, symbol: &str) -> Vec<&SyntaxTree<'a, 't>> {
        let mut result = Vec::new();
        let mut pending = vec![self];
        while let Some(tree) = pending.pop() {
            if tree.symbol() == symbol {
                result.push(tree);
            } else {
                pending.extend(tree.children().iter().rev());
            }
        }
        result
    }

    /// 所有归约所用产生式权重的乘积.
    #[must_use]
    pub fn weight(&self, grammar: &Grammar) -> f64 {
        let mut weight = 1.0;
        let mut pending = vec![self];
        while let Some(tree) = pending.pop() {
            if let Self::Node { rule, children, .. } = tree {
                weight *= grammar.rule(*rule).map_or(1.0, |r| r.weight());
                pending.extend(children);
            }
        }
        weight
    }

    /// 单行的括号形式, 叶子输出 token 的值: `S(NP(I) VP(saw NP(her)))`.
    #[must_use]
    pub fn to_bracketed(&self) -> String {
        match self {
            Self::Leaf(token) if token.value().is_empty() => token.symbol().to_string(),
            Self::Leaf(token) => token.value().to_string(),
            Self::Node {
                symbol, children, ..
            } => format!(
                "{symbol}({})",
                children
                    .iter()
                    .map(Self::to_bracketed)
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        }
    }
}

impl Display for SyntaxTree<'_, '_> {
    /// 缩进的树形:
    /// ```text
    /// S
    /// ├── NP
    /// │   ╰── n(I)
    /// ╰── VP
    /// ```
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // (子树, 前缀, 是否为最后一个孩子), 根节点没有连接线.
        let mut pending = vec![(self, String::new(), None)];
        while let Some((tree, prefix, last)) = pending.pop() {
            let label = match tree {
                Self::Leaf(token) => token.to_string(),
                Self::Node { symbol, .. } => symbol.to_string(),
            };
            let child_prefix = match last {
                None => {
                    writeln!(f, "{label}")?;
                    String::new()
                }
                Some(last) => {
                    writeln!(f, "{prefix}{}{label}", if last { "╰── " } else { "├── " })?;
                    format!("{prefix}{}", if last { "    " } else { "│   " })
                }
            };
            let children = tree.children();
            for (i, child) in children.iter().enumerate().rev() {
                pending.push((child, child_prefix.clone(), Some(i + 1 == children.len())));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    use crate::{Grammar, RawRule, Symbol, Token, tree::SyntaxTree};

    fn node<'a, 't>(
        symbol: &'a str,
        rule: usize,
        children: Vec<SyntaxTree<'a, 't>>,
    ) -> SyntaxTree<'a, 't> {
        SyntaxTree::Node {
            symbol: Symbol::from(symbol),
            rule,
            children,
        }
    }

    fn leaf<'t>(symbol: &'t str, value: &'t str) -> SyntaxTree<'static, 't> {
        SyntaxTree::Leaf(Token::new(symbol, value))
    }

    fn sample() -> SyntaxTree<'static, 'static> {
        node(
            "S",
            1,
            vec![
                node("NP", 3, vec![leaf("n", "I")]),
                node(
                    "VP",
                    7,
                    vec![leaf("v", "saw"), node("NP", 3, vec![leaf("n", "her")])],
                ),
            ],
        )
    }

    #[test]
    fn display() {
        assert_eq!(
            sample().to_string(),
            "S
├── NP
│   ╰── n(I)
╰── VP
    ├── v(saw)
    ╰── NP
        ╰── n(her)
"
        );
        assert_eq!(sample().to_bracketed(), "S(NP(I) VP(saw NP(her)))");
    }

    #[test]
    fn leaves_and_find() {
        let tree = sample();
        let values: Vec<_> = tree.leaves().iter().map(|t| t.value()).collect();
        assert_eq!(values, ["I", "saw", "her"]);
        let nps: Vec<_> = tree.find("NP").iter().map(|t| t.to_bracketed()).collect();
        assert_eq!(nps, ["NP(I)", "NP(her)"]);
        assert_eq!(tree.find("S").len(), 1);
        assert!(tree.find("PP").is_empty());
        assert_eq!(tree.rule(), Some(1));
        assert!(tree.children()[0].children()[0].is_leaf());
    }

    #[test]
    fn weight() {
        let bump = Bump::new();
        let grammar = Grammar::build(
            RawRule::from_cfg("S -> NP v (0.5)\nNP -> n (3)").unwrap(),
            "S",
            &bump,
        )
        .unwrap();
        let tree = node("S", 1, vec![node("NP", 2, vec![leaf("n", "n")]), leaf("v", "v")]);
        assert!((tree.weight(&grammar) - 1.5).abs() < f64::EPSILON);
        assert!((leaf("n", "n").weight(&grammar) - 1.0).abs() < f64::EPSILON);
    }
}
