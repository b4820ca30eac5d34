//! 图结构栈 (graph-structured stack).
//!
//! 所有节点都保存在 [`Gss`] 的 arena 中, 以 [`NodeId`] 互相引用, 只增不删.
//! 一个节点可以有多个前驱, 从某个栈顶沿前驱走到底的每一条路径都是一个普通 LR 栈.

use std::collections::HashMap;

use crate::{Grammar, Token, tree::SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// 栈底.
    Start,
    /// 移入的 token 在输入中的位置.
    Shifted(usize),
    /// 归约得到的节点, 孩子按从左到右的顺序排列.
    Reduced { rule: usize, children: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackNode {
    label: Label,
    /// 自动机状态.
    state: usize,
    predecessors: Vec<NodeId>,
}

impl StackNode {
    #[must_use]
    pub fn label(&self) -> &Label {
        &self.label
    }

    #[must_use]
    pub fn state(&self) -> usize {
        self.state
    }

    #[must_use]
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }
}

#[derive(Debug, Clone, Default)]
pub struct Gss {
    nodes: Vec<StackNode>,
}

impl Gss {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, label: Label, state: usize, predecessors: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(StackNode {
            label,
            state,
            predecessors,
        });
        id
    }

    /// 新的栈底, 处于 0 号状态.
    pub fn start(&mut self) -> NodeId {
        self.push(Label::Start, 0, Vec::new())
    }

    /// 在 `from` 之上移入输入中第 `position` 个 token, 转到 `state`.
    pub fn shift(&mut self, from: NodeId, position: usize, state: usize) -> NodeId {
        self.push(Label::Shifted(position), state, vec![from])
    }

    /// 把 `children` 归约为产生式 `rule` 的头部, 放在 `origin` 之上.
    pub fn reduce(
        &mut self,
        origin: NodeId,
        rule: usize,
        children: Vec<NodeId>,
        state: usize,
    ) -> NodeId {
        self.push(Label::Reduced { rule, children }, state, vec![origin])
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &StackNode {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 从 `top` 开始沿前驱向下走 `depth` 步的所有路径.
    ///
    /// 每条路径为 `[origin, ..., top]`, 长度为 `depth + 1`, `origin` 之上的 `depth` 个节点即为要归约的孩子.
    /// 提前到达栈底的路径被丢弃. 路径按照前驱的顺序排列.
    #[must_use]
    pub fn paths(&self, top: NodeId, depth: usize) -> Vec<Vec<NodeId>> {
        let mut result = Vec::new();
        // 路径从栈顶向下记录.
        let mut pending = vec![vec![top]];
        while let Some(path) = pending.pop() {
            if path.len() == depth + 1 {
                result.push(path.into_iter().rev().collect());
                continue;
            }
            let Some(&last) = path.last() else {
                continue;
            };
            for &pred in self.node(last).predecessors.iter().rev() {
                let mut next = path.clone();
                next.push(pred);
                pending.push(next);
            }
        }
        result
    }

    /// 合并 (标签, 状态) 相同的节点, 合并后的节点拥有所有前驱.
    ///
    /// 结果保持每组第一次出现的顺序, 只有一个成员的组原样保留.
    pub fn merge(&mut self, nodes: Vec<NodeId>) -> Vec<NodeId> {
        let mut groups: Vec<Vec<NodeId>> = Vec::new();
        let mut index: HashMap<(&Label, usize), usize> = HashMap::new();
        for &id in &nodes {
            let node = &self.nodes[id.0];
            match index.get(&(&node.label, node.state)) {
                Some(&g) => groups[g].push(id),
                None => {
                    index.insert((&node.label, node.state), groups.len());
                    groups.push(vec![id]);
                }
            }
        }
        let mut merged = Vec::with_capacity(groups.len());
        for group in groups {
            let Some(&first) = group.first() else {
                continue;
            };
            if group.len() == 1 {
                merged.push(first);
                continue;
            }
            let mut predecessors = Vec::new();
            for &id in &group {
                for &pred in &self.nodes[id.0].predecessors {
                    if !predecessors.contains(&pred) {
                        predecessors.push(pred);
                    }
                }
            }
            let first = &self.nodes[first.0];
            let (label, state) = (first.label.clone(), first.state);
            tracing::trace!("merging {} nodes into state {state}", group.len());
            merged.push(self.push(label, state, predecessors));
        }
        merged
    }

    /// 节点对应的文法符号: 移入节点为 token 的终结符, 归约节点为产生式头部.
    #[must_use]
    pub fn symbol<'r>(
        &self,
        id: NodeId,
        grammar: &'r Grammar<'_>,
        tokens: &'r [Token<'_>],
    ) -> &'r str {
        match &self.node(id).label {
            Label::Start => "",
            Label::Shifted(position) => tokens[*position].symbol(),
            Label::Reduced { rule, .. } => grammar.rules()[*rule].left().as_str(),
        }
    }

    /// 以 `root` 为根的语法树.
    ///
    /// 节点数量可以很大, 所以使用显式的栈而不是递归.
    #[must_use]
    pub fn syntax_tree<'a, 't>(
        &self,
        root: NodeId,
        grammar: &Grammar<'a>,
        tokens: &[Token<'t>],
    ) -> SyntaxTree<'a, 't> {
        enum Visit {
            Enter(NodeId),
            Exit(NodeId),
        }
        let mut pending = vec![Visit::Enter(root)];
        let mut built: Vec<SyntaxTree<'a, 't>> = Vec::new();
        while let Some(visit) = pending.pop() {
            match visit {
                Visit::Enter(id) => match &self.node(id).label {
                    // 栈底不会出现在孩子中.
                    Label::Start => {}
                    Label::Shifted(position) => built.push(SyntaxTree::Leaf(tokens[*position])),
                    Label::Reduced { children, .. } => {
                        pending.push(Visit::Exit(id));
                        pending.extend(children.iter().rev().map(|&c| Visit::Enter(c)));
                    }
                },
                Visit::Exit(id) => {
                    let Label::Reduced { rule, children } = &self.node(id).label else {
                        continue;
                    };
                    let children = built.split_off(built.len() - children.len());
                    built.push(SyntaxTree::Node {
                        symbol: grammar.rules()[*rule].left(),
                        rule: *rule,
                        children,
                    });
                }
            }
        }
        // 根总是最后一个完成的节点.
        built.pop().unwrap_or(SyntaxTree::Leaf(Token::end()))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Gss, Label};

    #[test]
    fn paths_follow_every_predecessor() {
        let mut gss = Gss::new();
        let a = gss.start();
        let b = gss.start();
        let x = gss.shift(a, 0, 3);
        let y = gss.shift(b, 0, 3);
        let top = gss.merge(vec![x, y]);
        assert_eq!(top.len(), 1);
        let z = gss.shift(top[0], 1, 4);
        assert_eq!(gss.paths(z, 1), [vec![top[0], z]]);
        assert_eq!(gss.paths(z, 2), [vec![a, top[0], z], vec![b, top[0], z]]);
        // 路径不能穿过栈底.
        assert!(gss.paths(z, 3).is_empty());
    }

    #[test]
    fn merge_by_label_and_state() {
        let mut gss = Gss::new();
        let bottoms: Vec<_> = (0..3).map(|_| gss.start()).collect();
        let shifted = vec![
            gss.shift(bottoms[0], 5, 3),
            gss.shift(bottoms[1], 5, 4),
            gss.shift(bottoms[2], 5, 3),
            gss.shift(bottoms[0], 5, 3),
        ];
        let merged = gss.merge(shifted.clone());
        assert_eq!(merged.len(), 2);
        let first = gss.node(merged[0]);
        assert_eq!(first.state(), 3);
        assert_eq!(first.label(), &Label::Shifted(5));
        // 同一个前驱只记录一次.
        assert_eq!(first.predecessors(), [bottoms[0], bottoms[2]]);
        assert_eq!(merged[1], shifted[1]);
    }
}
