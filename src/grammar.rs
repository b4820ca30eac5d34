use bumpalo::Bump;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt::{Debug, Display},
};
use tracing::debug;

use crate::{
    Symbol,
    epsilon::eliminate_epsilon,
    error::{Error, ParseProductionError},
    symbol::{AUGMENTED_START, END},
};

/// 单个尾部符号上的标签: 属性名 -> 属性值集合 (值可以缺省).
///
/// 解析器本身不解释标签, 只负责原样交给 [`crate::ReduceValidator`].
pub type Labels = BTreeMap<String, BTreeSet<Option<String>>>;

/// 未经处理的产生式, 由外部的文法读取器提供, 可能含有空产生式.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRule {
    pub left: String,
    pub right: Vec<String>,
    /// 归约一旦被选择就不再重新考虑.
    pub commit: bool,
    /// 为空, 或者与 `right` 一一对应.
    pub labels: Vec<Labels>,
    pub weight: f64,
}

impl RawRule {
    #[must_use]
    pub fn new<S: Into<String>>(
        left: impl Into<String>,
        right: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into_iter().map(Into::into).collect(),
            commit: false,
            labels: Vec::new(),
            weight: 1.0,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Vec<Labels>) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }

    /// 读取箭头形式的文法, 每行一个产生式:
    ///
    /// ```text
    /// S -> NP VP | S PP
    /// NP -> n (2.5) | det n
    /// Opt -> x |
    /// ```
    ///
    /// 候选式以 `|` 分隔, 空候选式即为空产生式, 末尾的 `(2.5)` 为权重 (也接受 `(2,5)`).
    pub fn from_cfg(s: &str) -> Result<Vec<Self>, Error> {
        let mut rules = Vec::new();
        for (line_num, line) in s
            .lines()
            .enumerate()
            .filter(|(_, s)| s.chars().any(|c| !c.is_whitespace()))
        {
            let (head, tails) = line.split_once("->").ok_or(Error::parse_production_error(
                line_num,
                ParseProductionError::NoArrow,
            ))?;
            let head = head.trim();
            if head.is_empty() {
                Err(Error::parse_production_error(
                    line_num,
                    ParseProductionError::EmptyHead,
                ))?
            }
            for tail in tails.split('|') {
                let mut tail = tail.trim();
                let mut weight: f64 = 1.0;
                if let Some(open) = tail.rfind('(')
                    && tail.ends_with(')')
                {
                    let raw = &tail[open + 1..tail.len() - 1];
                    weight = raw.trim().replace(',', ".").parse::<f64>().map_err(|_| {
                        Error::parse_production_error(
                            line_num,
                            ParseProductionError::InvalidWeight(raw.to_string()),
                        )
                    })?;
                    tail = tail[..open].trim_end();
                }
                rules.push(Self::new(head, tail.split_ascii_whitespace()).with_weight(weight));
            }
        }
        Ok(rules)
    }
}

/// 文法中的产生式, 构建之后不可变.
#[derive(Clone, PartialEq)]
pub struct Rule<'a> {
    index: usize,
    left: Symbol<'a>,
    right: Vec<Symbol<'a>>,
    commit: bool,
    /// 长度总是与 `right` 相同.
    labels: Vec<Labels>,
    weight: f64,
}

impl Debug for Rule<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule")
            .field(&format_args!(
                "#{} {:?} -> {}",
                self.index,
                self.left,
                self.right
                    .iter()
                    .map(|t| format!("{:?} ", t))
                    .collect::<String>()
                    .trim_end()
            ))
            .finish()
    }
}

impl Display for Rule<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tail = self
            .right
            .iter()
            .zip(&self.labels)
            .map(|(sym, labels)| {
                if labels.is_empty() {
                    format!("{sym} ")
                } else {
                    format!("{sym}<{}> ", format_labels(labels))
                }
            })
            .collect::<String>();
        let weight = if self.weight == 1.0 {
            String::new()
        } else {
            format!(" ({})", self.weight)
        };
        f.pad(&format!(
            "#{}: {} -> {}{}",
            self.index,
            self.left,
            tail.trim_end(),
            weight
        ))
    }
}

fn format_labels(labels: &Labels) -> String {
    labels
        .iter()
        .flat_map(|(key, values)| {
            values.iter().map(move |value| match value {
                Some(value) => format!("{key}={value}"),
                None => key.clone(),
            })
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl<'a> Rule<'a> {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn left(&self) -> Symbol<'a> {
        self.left
    }

    #[must_use]
    pub fn right(&self) -> &[Symbol<'a>] {
        &self.right
    }

    #[must_use]
    pub fn commit(&self) -> bool {
        self.commit
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// 第 `i` 个尾部符号的标签, 越界时返回 [`None`].
    #[must_use]
    pub fn labels(&self, i: usize) -> Option<&Labels> {
        self.labels.get(i)
    }

    /// 产生式尾部的符号数量.
    #[must_use]
    pub fn len(&self) -> usize {
        self.right.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grammar<'a> {
    /// 0 号产生式总是 `@ -> start`.
    rules: Vec<Rule<'a>>,
    rules_by_symbol: HashMap<Symbol<'a>, BTreeSet<usize>>,
    terminals: BTreeSet<Symbol<'a>>,
    nonterminals: BTreeSet<Symbol<'a>>,
    start: Symbol<'a>,
}

impl<'a> Grammar<'a> {
    /// 由不含空产生式的产生式列表构建文法, 符号字符串驻留在 `bump` 中.
    ///
    /// 重复的 (头部, 尾部) 会被静默去重, 保留第一个.
    /// # Errors
    /// - [`Error::EmptyRightHandSide`] 存在空产生式.
    /// - [`Error::UndefinedNonTerminal`] 起始符没有产生式.
    /// - [`Error::ReservedSymbol`] 使用了 `@` 或 `$`.
    /// - [`Error::LabelArity`], [`Error::InvalidWeight`] 产生式附加信息不合法.
    pub fn build(
        rules: impl IntoIterator<Item = RawRule>,
        start: &str,
        bump: &'a Bump,
    ) -> Result<Self, Error> {
        let mut interned: HashSet<&'a str> = HashSet::new();
        let mut intern = |s: &str| -> Symbol<'a> {
            if let Some(&s) = interned.get(s) {
                return s.into();
            }
            let s: &'a str = bump.alloc_str(s);
            interned.insert(s);
            s.into()
        };
        let start = intern(start);
        if start.is_reserved() {
            Err(Error::ReservedSymbol(start.as_str().to_string()))?
        }
        let mut built = vec![Rule {
            index: 0,
            left: AUGMENTED_START,
            right: vec![start],
            commit: false,
            labels: vec![Labels::new()],
            weight: 1.0,
        }];
        let mut seen: HashSet<(Symbol<'a>, Vec<Symbol<'a>>)> = HashSet::new();
        for raw in rules {
            if raw.is_epsilon() {
                Err(Error::EmptyRightHandSide {
                    left: raw.left.clone(),
                })?
            }
            if !raw.weight.is_finite() || raw.weight < 0.0 {
                Err(Error::InvalidWeight {
                    left: raw.left.clone(),
                    weight: raw.weight.to_string(),
                })?
            }
            if !raw.labels.is_empty() && raw.labels.len() != raw.right.len() {
                Err(Error::LabelArity {
                    left: raw.left.clone(),
                    labels: raw.labels.len(),
                    symbols: raw.right.len(),
                })?
            }
            let left = intern(&raw.left);
            let right: Vec<_> = raw.right.iter().map(|s| intern(s)).collect();
            if let Some(reserved) = std::iter::once(&left)
                .chain(right.iter())
                .find(|s| s.is_reserved())
            {
                Err(Error::ReservedSymbol(reserved.as_str().to_string()))?
            }
            if !seen.insert((left, right.clone())) {
                debug!("duplicated production dropped: {} -> {:?}", left, right);
                continue;
            }
            let labels = if raw.labels.is_empty() {
                vec![Labels::new(); right.len()]
            } else {
                raw.labels
            };
            built.push(Rule {
                index: built.len(),
                left,
                right,
                commit: raw.commit,
                labels,
                weight: raw.weight,
            });
        }
        let nonterminals: BTreeSet<_> = built.iter().map(|r| r.left).collect();
        if built.iter().skip(1).all(|r| r.left != start) {
            Err(Error::UndefinedNonTerminal(start.as_str().to_string()))?
        }
        let terminals: BTreeSet<_> = built
            .iter()
            .flat_map(|r| r.right.iter().copied())
            .filter(|s| !nonterminals.contains(s))
            .collect();
        let mut rules_by_symbol: HashMap<Symbol<'a>, BTreeSet<usize>> = HashMap::new();
        for rule in &built {
            rules_by_symbol
                .entry(rule.left)
                .or_default()
                .insert(rule.index);
        }
        debug!(
            "grammar built: {} productions, {} terminals, {} non-terminals",
            built.len(),
            terminals.len(),
            nonterminals.len()
        );
        Ok(Self {
            rules: built,
            rules_by_symbol,
            terminals,
            nonterminals,
            start,
        })
    }

    /// 先消除空产生式, 再构建文法.
    /// # Errors
    /// 见 [`eliminate_epsilon`] 和 [`Grammar::build`].
    pub fn with_epsilon_elimination(
        rules: impl IntoIterator<Item = RawRule>,
        start: &str,
        bump: &'a Bump,
    ) -> Result<Self, Error> {
        let rules = eliminate_epsilon(rules.into_iter().collect())?;
        Self::build(rules, start, bump)
    }

    /// 按产生式编号遍历产生式.
    #[must_use]
    pub fn rules(&self) -> &[Rule<'a>] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&Rule<'a>> {
        self.rules.get(index)
    }

    /// 以 `symbol` 为头部的产生式编号, 终结符或未知符号返回 [`None`].
    #[must_use]
    pub fn rules_of(&self, symbol: &str) -> Option<&BTreeSet<usize>> {
        self.rules_by_symbol.get(symbol)
    }

    /// 用户给定的起始符 (不是 `@`).
    #[must_use]
    pub fn start(&self) -> Symbol<'a> {
        self.start
    }

    #[must_use]
    pub fn terminals(&self) -> &BTreeSet<Symbol<'a>> {
        &self.terminals
    }

    /// 包含 `@`.
    #[must_use]
    pub fn nonterminals(&self) -> &BTreeSet<Symbol<'a>> {
        &self.nonterminals
    }

    #[must_use]
    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol)
    }

    #[must_use]
    pub fn is_nonterminal(&self, symbol: &str) -> bool {
        self.nonterminals.contains(symbol)
    }

    /// 查找文法中的符号, `$` 总是存在.
    #[must_use]
    pub fn symbol(&self, symbol: &str) -> Option<Symbol<'a>> {
        if symbol == END.as_str() {
            return Some(END);
        }
        self.terminals
            .get(symbol)
            .or_else(|| self.nonterminals.get(symbol))
            .copied()
    }
}

impl Display for Grammar<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
