//! GLR 运行时.
//!
//! 每读入一个 token:
//! 1. 对前沿 (frontier) 中的栈顶执行该 token 下所有的归约, 新产生的栈顶加入前沿并继续归约, 直到不动点;
//! 2. 记录可以接受的栈顶;
//! 3. 对前沿中的栈顶执行所有移入, 合并 (标签, 状态) 相同的新栈顶, 作为下一个前沿.
//!
//! 分析表中的冲突不需要解决, 每个动作都会在图结构栈上得到一个分支.

use std::collections::HashSet;

use tracing::{debug, info, trace};

use crate::{
    Family, Grammar, Table, Token,
    grammar::{Labels, Rule},
    stack::{Gss, Label, NodeId},
    symbol::END,
    table::Action,
    tree::SyntaxTree,
};

/// 匹配模式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// 整个输入必须是起始符的一个句子.
    #[default]
    Full,
    /// 在每个位置开始新的分析, 输出输入中所有能归约为起始符的片段.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserConfig {
    pub mode: MatchMode,
}

/// 一次待定的归约: 产生式和将要成为孩子的栈节点.
pub struct Reduction<'r, 'a, 't> {
    rule: &'r Rule<'a>,
    children: &'r [NodeId],
    gss: &'r Gss,
    grammar: &'r Grammar<'a>,
    tokens: &'r [Token<'t>],
}

impl<'r, 'a, 't> Reduction<'r, 'a, 't> {
    #[must_use]
    pub fn rule(&self) -> &'r Rule<'a> {
        self.rule
    }

    /// 孩子数量, 总是等于产生式尾部的长度.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// 第 `i` 个孩子的符号.
    #[must_use]
    pub fn symbol(&self, i: usize) -> Option<&'r str> {
        let id = *self.children.get(i)?;
        Some(self.gss.symbol(id, self.grammar, self.tokens))
    }

    /// 第 `i` 个孩子是移入的 token 时返回这个 token.
    #[must_use]
    pub fn token(&self, i: usize) -> Option<&'r Token<'t>> {
        let gss: &'r Gss = self.gss;
        match gss.node(*self.children.get(i)?).label() {
            Label::Shifted(position) => self.tokens.get(*position),
            Label::Start | Label::Reduced { .. } => None,
        }
    }

    /// 产生式在第 `i` 个尾部符号上的标签.
    #[must_use]
    pub fn labels(&self, i: usize) -> Option<&'r Labels> {
        let rule: &'r Rule<'a> = self.rule;
        rule.labels(i)
    }

    /// 第 `i` 个孩子对应的语法树.
    #[must_use]
    pub fn subtree(&self, i: usize) -> Option<SyntaxTree<'a, 't>> {
        let id = *self.children.get(i)?;
        Some(self.gss.syntax_tree(id, self.grammar, self.tokens))
    }
}

/// 归约校验器, 在每个归约节点被创建之前调用, 返回 `false` 时放弃这次归约.
///
/// 被放弃的归约不会产生栈节点, 所以依赖它的分支也都不会出现.
pub trait ReduceValidator<'a, 't> {
    fn validate(&self, reduction: &Reduction<'_, 'a, 't>) -> bool;
}

impl<'a, 't, F> ReduceValidator<'a, 't> for F
where
    F: Fn(&Reduction<'_, 'a, 't>) -> bool,
{
    fn validate(&self, reduction: &Reduction<'_, 'a, 't>) -> bool {
        self(reduction)
    }
}

/// 接受所有归约.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<'a, 't> ReduceValidator<'a, 't> for AcceptAll {
    fn validate(&self, _: &Reduction<'_, 'a, 't>) -> bool {
        true
    }
}

/// 基于 LR(0) 表的 GLR 分析器, 构建之后可以重复使用.
#[derive(Debug)]
pub struct Parser<'g, 'a> {
    grammar: &'g Grammar<'a>,
    family: Family<'a>,
    table: Table<'a>,
    config: ParserConfig,
}

impl<'g, 'a> Parser<'g, 'a> {
    #[must_use]
    pub fn new(grammar: &'g Grammar<'a>) -> Self {
        Self::with_config(grammar, ParserConfig::default())
    }

    #[must_use]
    pub fn with_config(grammar: &'g Grammar<'a>, config: ParserConfig) -> Self {
        let family = Family::from_grammar(grammar);
        let table = Table::build_from(&family, grammar);
        info!(
            "parser ready: {} states, conflict: {}, mode: {:?}",
            family.len(),
            table.conflict(),
            config.mode
        );
        Self {
            grammar,
            family,
            table,
            config,
        }
    }

    #[must_use]
    pub fn grammar(&self) -> &'g Grammar<'a> {
        self.grammar
    }

    #[must_use]
    pub fn family(&self) -> &Family<'a> {
        &self.family
    }

    #[must_use]
    pub fn table(&self) -> &Table<'a> {
        &self.table
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// 开始一次逐个 token 输入的分析.
    #[must_use]
    pub fn start<'p, 't>(
        &'p self,
        validator: &'p dyn ReduceValidator<'a, 't>,
    ) -> ParseRun<'p, 'a, 't> {
        let mut gss = Gss::new();
        let frontier = match self.config.mode {
            MatchMode::Full => vec![gss.start()],
            // 局部匹配在每个 token 之前放入新的栈底.
            MatchMode::Partial => Vec::new(),
        };
        ParseRun {
            grammar: self.grammar,
            table: &self.table,
            mode: self.config.mode,
            validator,
            gss,
            tokens: Vec::new(),
            frontier,
            accepted: Vec::new(),
        }
    }

    /// 分析整个 token 序列, 序列应当以 `$` 结尾.
    ///
    /// 返回所有 (去重之后的) 接受的语法树, 拒绝时返回空列表.
    pub fn parse<'t>(
        &self,
        tokens: impl IntoIterator<Item = Token<'t>>,
    ) -> Vec<SyntaxTree<'a, 't>> {
        let mut run = self.start(&AcceptAll);
        tokens.into_iter().for_each(|t| run.feed(t));
        run.finish()
    }

    /// 同 [`Parser::parse`], 每次归约之前调用 `validator`.
    pub fn parse_with<'t, F>(
        &self,
        tokens: impl IntoIterator<Item = Token<'t>>,
        validator: F,
    ) -> Vec<SyntaxTree<'a, 't>>
    where
        F: Fn(&Reduction<'_, 'a, 't>) -> bool,
    {
        let mut run = self.start(&validator);
        tokens.into_iter().for_each(|t| run.feed(t));
        run.finish()
    }
}

/// (产生式, 起点, 孩子, 目标状态), 同一步中相同的归约只做一次.
type ReductionKey = (usize, NodeId, Vec<NodeId>, usize);

/// 一次分析的全部状态, 由 [`Parser::start`] 创建.
pub struct ParseRun<'p, 'a, 't> {
    grammar: &'p Grammar<'a>,
    table: &'p Table<'a>,
    mode: MatchMode,
    validator: &'p dyn ReduceValidator<'a, 't>,
    gss: Gss,
    tokens: Vec<Token<'t>>,
    frontier: Vec<NodeId>,
    accepted: Vec<NodeId>,
}

impl<'a, 't> ParseRun<'_, 'a, 't> {
    /// 读入下一个 token.
    pub fn feed(&mut self, token: Token<'t>) {
        let position = self.tokens.len();
        self.tokens.push(token);
        let mut reduce_by = Vec::with_capacity(2);
        match self.mode {
            MatchMode::Full => {
                if self.frontier.is_empty() {
                    trace!("token #{position} {token} ignored, all stacks died");
                    return;
                }
                reduce_by.push(token.symbol());
            }
            MatchMode::Partial => {
                self.frontier.push(self.gss.start());
                if self.grammar.is_terminal(token.symbol()) {
                    reduce_by.push(token.symbol());
                } else {
                    trace!("token #{position} {token} is not in grammar, phrase boundary");
                }
                // 以当前位置为结尾的片段.
                if !reduce_by.contains(&END.as_str()) {
                    reduce_by.push(END.as_str());
                }
            }
        }
        debug!(
            "token #{position} {token}, frontier: {} nodes",
            self.frontier.len()
        );
        let mut done = HashSet::new();
        for symbol in reduce_by {
            self.reduce_all(symbol, &mut done);
            self.accept(symbol);
        }
        self.shift(position, token.symbol());
    }

    fn reduce_all(&mut self, symbol: &str, done: &mut HashSet<ReductionKey>) {
        let table = self.table;
        let mut pending = self.frontier.clone();
        while !pending.is_empty() {
            let mut created = Vec::new();
            for node in pending {
                for action in table.actions(self.gss.node(node).state(), symbol) {
                    match *action {
                        Action::Reduce(rule) => created.extend(self.reduce(node, rule, done)),
                        Action::Shift(_) | Action::Goto(_) | Action::Accept => {}
                    }
                }
            }
            self.frontier.extend(created.iter().copied());
            pending = created;
        }
    }

    /// 沿 `top` 下所有长度为产生式尾部长度的路径归约, 返回新的栈顶.
    fn reduce(
        &mut self,
        top: NodeId,
        index: usize,
        done: &mut HashSet<ReductionKey>,
    ) -> Vec<NodeId> {
        let grammar = self.grammar;
        let table = self.table;
        let rule = &grammar.rules()[index];
        let mut created = Vec::new();
        for path in self.gss.paths(top, rule.len()) {
            let (origin, children) = (path[0], &path[1..]);
            let origin_state = self.gss.node(origin).state();
            for action in table.actions(origin_state, rule.left().as_str()) {
                match *action {
                    Action::Goto(to) => {
                        if !done.insert((index, origin, children.to_vec(), to)) {
                            trace!("reduction {rule} onto I_{to} already done");
                            continue;
                        }
                        let reduction = Reduction {
                            rule,
                            children,
                            gss: &self.gss,
                            grammar,
                            tokens: &self.tokens,
                        };
                        if !self.validator.validate(&reduction) {
                            debug!("reduction {rule} rejected by validator");
                            continue;
                        }
                        trace!("reduce {rule}, goto I_{to}");
                        created.push(self.gss.reduce(origin, index, children.to_vec(), to));
                    }
                    Action::Shift(_) | Action::Reduce(_) | Action::Accept => {}
                }
            }
        }
        created
    }

    fn accept(&mut self, symbol: &str) {
        for &node in &self.frontier {
            for action in self.table.actions(self.gss.node(node).state(), symbol) {
                match action {
                    Action::Accept => {
                        if !self.accepted.contains(&node) {
                            debug!("accepted node {}", node.index());
                            self.accepted.push(node);
                        }
                    }
                    Action::Shift(_) | Action::Reduce(_) | Action::Goto(_) => {}
                }
            }
        }
    }

    fn shift(&mut self, position: usize, symbol: &str) {
        let mut shifted = Vec::new();
        for &node in &self.frontier {
            for action in self.table.actions(self.gss.node(node).state(), symbol) {
                match *action {
                    Action::Shift(to) => shifted.push(self.gss.shift(node, position, to)),
                    Action::Reduce(_) | Action::Goto(_) | Action::Accept => {}
                }
            }
        }
        self.frontier = self.gss.merge(shifted);
        if self.frontier.is_empty() && self.mode == MatchMode::Full {
            debug!("no stack survived token #{position}");
        }
    }

    /// 当前的栈顶.
    #[must_use]
    pub fn frontier(&self) -> &[NodeId] {
        &self.frontier
    }

    /// 目前为止接受的节点.
    #[must_use]
    pub fn accepted(&self) -> &[NodeId] {
        &self.accepted
    }

    #[must_use]
    pub fn gss(&self) -> &Gss {
        &self.gss
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token<'t>] {
        &self.tokens
    }

    /// 整体匹配模式下所有的栈都已经失败, 后面的输入不会再改变结果.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.mode == MatchMode::Full && self.frontier.is_empty()
    }

    /// 结束分析, 返回去重之后的语法树 (保持接受的顺序).
    #[must_use]
    pub fn finish(self) -> Vec<SyntaxTree<'a, 't>> {
        let mut trees: Vec<SyntaxTree<'a, 't>> = Vec::new();
        for &node in &self.accepted {
            let tree = self.gss.syntax_tree(node, self.grammar, &self.tokens);
            if !trees.contains(&tree) {
                trees.push(tree);
            }
        }
        info!(
            "{} tokens, {} stack nodes, {} trees accepted",
            self.tokens.len(),
            self.gss.len(),
            trees.len()
        );
        trees
    }
}
