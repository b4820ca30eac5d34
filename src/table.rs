use std::{collections::BTreeMap, fmt::Display};

use tracing::debug;

use crate::{
    Family, Grammar, Symbol,
    follow::Followers,
    symbol::{AUGMENTED_START, END},
};

/// 分析表中的一个动作, 一个表格可以有多个动作 (冲突), GLR 运行时会把它们全部执行.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// 移入项集状态编号.
    Shift(usize),
    /// 规约产生式编号.
    Reduce(usize),
    /// 归约之后转到的项集状态编号.
    Goto(usize),
    /// 接受
    Accept,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&match self {
            Self::Shift(s) => format!("s{s}"),
            Self::Reduce(r) => format!("r{r}"),
            Self::Goto(to) => format!("{to}"),
            Self::Accept => "acc".to_string(),
        })
    }
}

/// 状态 × 符号 -> 动作列表.
///
/// 同一个表格中的动作顺序为: 归约 (按项集中项的顺序), 然后是移入或者 goto.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<'a> {
    /// 下标即为状态编号.
    rows: Vec<BTreeMap<Symbol<'a>, Vec<Action>>>,
    /// 输出表格时的列, 终结符, `$`, 然后是非终结符 (不含 `@`).
    columns: Vec<Symbol<'a>>,
}

impl<'a> Table<'a> {
    #[must_use]
    pub fn build_from(family: &Family<'a>, grammar: &Grammar<'a>) -> Self {
        let followers = Followers::new(grammar);
        let mut rows = Vec::with_capacity(family.len());
        let mut conflicts = 0;
        for state in family.states() {
            let mut row: BTreeMap<Symbol<'a>, Vec<Action>> = BTreeMap::new();
            for item in state.items().reduces(grammar) {
                let rule = &grammar.rules()[item.rule()];
                if rule.left() == AUGMENTED_START {
                    row.entry(END).or_default().push(Action::Accept);
                    continue;
                }
                for follower in followers.followers(rule.left().as_str()) {
                    row.entry(follower)
                        .or_default()
                        .push(Action::Reduce(rule.index()));
                }
                row.entry(END)
                    .or_default()
                    .push(Action::Reduce(rule.index()));
            }
            for (symbol, to) in state.transitions() {
                let action = if grammar.is_nonterminal(symbol.as_str()) {
                    Action::Goto(to)
                } else {
                    Action::Shift(to)
                };
                row.entry(symbol).or_default().push(action);
            }
            conflicts += row.values().filter(|actions| actions.len() > 1).count();
            rows.push(row);
        }
        debug!("table built: {} rows, {} conflicting cells", rows.len(), conflicts);
        let columns = grammar
            .terminals()
            .iter()
            .copied()
            .chain(std::iter::once(END))
            .chain(
                grammar
                    .nonterminals()
                    .iter()
                    .copied()
                    .filter(|&nt| nt != AUGMENTED_START),
            )
            .collect();
        Self { rows, columns }
    }

    /// 状态数量.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// 查询 `state` 在 `symbol` 下的动作, 没有动作 (或者状态不存在) 时返回空切片.
    #[must_use]
    pub fn actions(&self, state: usize, symbol: &str) -> &[Action] {
        self.rows
            .get(state)
            .and_then(|row| row.get(symbol))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 遍历一个项集状态的所有非空表格.
    pub fn row(&self, state: usize) -> impl Iterator<Item = (Symbol<'a>, &[Action])> {
        self.rows
            .get(state)
            .into_iter()
            .flatten()
            .map(|(&symbol, actions)| (symbol, actions.as_slice()))
    }

    /// 含有多个动作的表格 (状态, 符号).
    pub fn conflicts(&self) -> impl Iterator<Item = (usize, Symbol<'a>)> + '_ {
        self.rows.iter().enumerate().flat_map(|(state, row)| {
            row.iter()
                .filter(|(_, actions)| actions.len() > 1)
                .map(move |(&symbol, _)| (state, symbol))
        })
    }

    /// 文法在 LR(0) 分析中是否是冲突的, 也就是是否需要 GLR 才能分析.
    #[must_use]
    pub fn conflict(&self) -> bool {
        self.conflicts().next().is_some()
    }

    /// 使用 markdown 形式输出表格.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut header_line = "| |".to_string();
        header_line += &self
            .columns
            .iter()
            .map(|t| format!(" `{}` |", t.as_str()))
            .collect::<String>();
        let sep_line: String = String::from("| - |")
            + &std::iter::repeat_n(" - |", self.columns.len()).collect::<String>();
        let mut data_lines = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            let line = format!("| $I_{{{i}}}$ |")
                + &self
                    .columns
                    .iter()
                    .map(|col| {
                        let cell = row
                            .get(col)
                            .map(|actions| {
                                actions
                                    .iter()
                                    .map(Action::to_string)
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            })
                            .unwrap_or_default();
                        format!(" {cell} |")
                    })
                    .collect::<String>();
            data_lines += &line;
            data_lines += "\n";
        }
        format!("{header_line}\n{sep_line}\n{}", data_lines.trim_end())
    }
}
