use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt::Debug,
};

use crate::{Grammar, Symbol};

/// LR(0) 项: 产生式编号和 dot 的位置.
///
/// 按 (产生式编号, dot) 排序, 项集的迭代顺序决定了状态的编号顺序.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    rule: usize,
    /// dot 所处的位置, 在 `0..=rule.len()` 范围中.
    dot: usize,
}

impl Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("#{}.{}", self.rule, self.dot))
    }
}

impl Item {
    #[must_use]
    pub fn new(rule: usize, dot: usize) -> Self {
        Self { rule, dot }
    }

    #[must_use]
    pub fn initial(rule: usize) -> Self {
        Self { rule, dot: 0 }
    }

    #[must_use]
    pub fn rule(&self) -> usize {
        self.rule
    }

    #[must_use]
    pub fn dot(&self) -> usize {
        self.dot
    }

    /// dot 后面的符号, dot 在末尾时返回 [`None`].
    #[must_use]
    pub fn expected<'a>(&self, grammar: &Grammar<'a>) -> Option<Symbol<'a>> {
        grammar.rules()[self.rule].right().get(self.dot).copied()
    }

    #[must_use]
    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot == grammar.rules()[self.rule].len()
    }

    #[must_use]
    fn advanced(&self) -> Self {
        Self {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }

    /// 形如 `S -> NP ⋅ VP`.
    #[must_use]
    pub fn format(&self, grammar: &Grammar) -> String {
        let rule = &grammar.rules()[self.rule];
        let tail: String = rule
            .right()
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}{} ", if i == self.dot { "⋅ " } else { "" }, t))
            .collect();
        format!(
            "{} -> {}{}",
            rule.left(),
            tail.trim_end(),
            if self.is_complete(grammar) { " ⋅" } else { "" }
        )
    }
}

/// 去重并且有序的项集, 相等的项集对应同一个状态.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemSet {
    items: BTreeSet<Item>,
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl ItemSet {
    /// 0 号状态的项集: `closure({@ -> ⋅ start})`.
    #[must_use]
    pub fn initial(grammar: &Grammar) -> Self {
        Self::from_iter([Item::initial(0)]).closure(grammar)
    }

    /// 项集的闭包.
    ///
    /// 对每个 dot 后为非终结符的项, 加入该非终结符所有产生式的初始项.
    /// 每个非终结符在一次闭包计算中只展开一次, 所以间接左递归也能终止.
    #[must_use]
    pub fn closure(self, grammar: &Grammar) -> Self {
        let mut items = self.items;
        let mut expanded = HashSet::new();
        let mut pending: Vec<Item> = items.iter().copied().collect();
        while let Some(item) = pending.pop() {
            let Some(next) = item.expected(grammar) else {
                continue;
            };
            // 终结符没有产生式.
            let Some(rules) = grammar.rules_of(next.as_str()) else {
                continue;
            };
            if !expanded.insert(next) {
                continue;
            }
            for &rule in rules {
                let item = Item::initial(rule);
                if items.insert(item) {
                    pending.push(item);
                }
            }
        }
        Self { items }
    }

    /// 当前项集的所有转移: 对每个 dot 后的符号, 合并移动 dot 之后各项的闭包.
    ///
    /// 结果按照符号在 (有序的) 项集中第一次出现的顺序排列.
    #[must_use]
    pub fn transitions<'a>(&self, grammar: &Grammar<'a>) -> Vec<(Symbol<'a>, ItemSet)> {
        let mut result: Vec<(Symbol<'a>, ItemSet)> = Vec::new();
        let mut position: HashMap<Symbol<'a>, usize> = HashMap::new();
        for item in &self.items {
            let Some(symbol) = item.expected(grammar) else {
                continue;
            };
            let moved = Self::from_iter([item.advanced()]).closure(grammar);
            match position.get(&symbol) {
                Some(&i) => result[i].1.items.extend(moved.items),
                None => {
                    position.insert(symbol, result.len());
                    result.push((symbol, moved));
                }
            }
        }
        result
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// dot 在末尾, 可以归约的项.
    pub fn reduces<'s>(&'s self, grammar: &'s Grammar) -> impl Iterator<Item = &'s Item> {
        self.items.iter().filter(|i| i.is_complete(grammar))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn format(&self, grammar: &Grammar) -> String {
        self.items
            .iter()
            .map(|i| i.format(grammar))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// LR(0) 自动机的一个状态.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State<'a> {
    index: usize,
    items: ItemSet,
    /// 描述了 goto 动作: 转移符号 -> 到达的状态.
    transitions: BTreeMap<Symbol<'a>, BTreeSet<usize>>,
}

impl<'a> State<'a> {
    fn new(index: usize, items: ItemSet) -> Self {
        Self {
            index,
            items,
            transitions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    /// 遍历 (转换符号, 到达状态).
    pub fn transitions(&self) -> impl Iterator<Item = (Symbol<'a>, usize)> + '_ {
        self.transitions
            .iter()
            .flat_map(|(&symbol, to)| to.iter().map(move |&to| (symbol, to)))
    }
}

/// LR(0) 项集族, 也就是自动机的状态图.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family<'a> {
    states: Vec<State<'a>>,
}

impl<'a> Family<'a> {
    /// 从 `grammar` 广度优先地构建 LR(0) 项集族.
    ///
    /// 状态按照第一次被发现的顺序编号, 对于同一个文法 (以及同样的产生式顺序) 编号总是相同的.
    #[must_use]
    pub fn from_grammar(grammar: &Grammar<'a>) -> Self {
        let i0 = ItemSet::initial(grammar);
        let mut index: HashMap<ItemSet, usize> = HashMap::new();
        index.insert(i0.clone(), 0);
        let mut states = vec![State::new(0, i0)];
        let mut cursor = 0;
        while cursor < states.len() {
            for (symbol, items) in states[cursor].items.transitions(grammar) {
                let to = match index.get(&items) {
                    Some(&to) => to,
                    None => {
                        let to = states.len();
                        index.insert(items.clone(), to);
                        states.push(State::new(to, items));
                        to
                    }
                };
                states[cursor]
                    .transitions
                    .entry(symbol)
                    .or_default()
                    .insert(to);
            }
            cursor += 1;
        }
        tracing::debug!("LR(0) family built: {} states", states.len());
        Self { states }
    }

    /// 按照 I_i (i = 0, 1, 2, 3...) 顺序获取状态.
    #[must_use]
    pub fn states(&self) -> &[State<'a>] {
        &self.states
    }

    #[must_use]
    pub fn state(&self, index: usize) -> Option<&State<'a>> {
        self.states.get(index)
    }

    /// 获取状态数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 每个状态一段: 项集, 然后是出边.
    #[must_use]
    pub fn format(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        for state in &self.states {
            out += &format!("I_{}:\n", state.index);
            for item in state.items.items() {
                out += &format!("    {}\n", item.format(grammar));
            }
            for (symbol, to) in state.transitions() {
                out += &format!("    I_{} -- {} --> I_{}\n", state.index, symbol, to);
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    use crate::{
        Family, Grammar, RawRule,
        item::{Item, ItemSet},
    };

    fn grammar<'a>(cfg: &str, start: &str, bump: &'a Bump) -> Grammar<'a> {
        Grammar::build(RawRule::from_cfg(cfg).unwrap(), start, bump).unwrap()
    }

    const TOMITA: &str = "
        S -> NP VP | S PP
        NP -> n | det n | NP PP
        PP -> prep NP
        VP -> v NP
    ";

    fn items(pairs: &[(usize, usize)]) -> ItemSet {
        pairs.iter().map(|&(r, d)| Item::new(r, d)).collect()
    }

    #[test]
    fn closure() {
        let bump = Bump::new();
        let grammar = grammar(TOMITA, "S", &bump);
        let i0 = ItemSet::initial(&grammar);
        assert_eq!(i0, items(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]));
        assert_eq!(
            i0.format(&grammar),
            "@ -> ⋅ S; S -> ⋅ NP VP; S -> ⋅ S PP; NP -> ⋅ n; NP -> ⋅ det n; NP -> ⋅ NP PP"
        );
    }

    #[test]
    fn closure_with_indirect_left_recursion() {
        let bump = Bump::new();
        let grammar = grammar("A -> B x | a\nB -> A y | b", "A", &bump);
        let i0 = ItemSet::initial(&grammar);
        assert_eq!(i0, items(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]));
    }

    #[test]
    fn transitions_in_first_appearance_order() {
        let bump = Bump::new();
        let grammar = grammar(TOMITA, "S", &bump);
        let i0 = ItemSet::initial(&grammar);
        let transitions = i0.transitions(&grammar);
        let symbols: Vec<_> = transitions.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, ["S", "NP", "n", "det"]);
        // S 和 NP 都合并了两个项的闭包.
        assert_eq!(transitions[0].1, items(&[(0, 1), (2, 1), (6, 0)]));
        assert_eq!(transitions[1].1, items(&[(1, 1), (5, 1), (6, 0), (7, 0)]));
    }

    #[test]
    fn complete_items() {
        let bump = Bump::new();
        let grammar = grammar(TOMITA, "S", &bump);
        let set = items(&[(5, 1), (6, 0), (6, 2)]);
        let reduces: Vec<_> = set.reduces(&grammar).copied().collect();
        assert_eq!(reduces, [Item::new(6, 2)]);
        assert_eq!(Item::new(6, 2).format(&grammar), "PP -> prep NP ⋅");
        assert_eq!(Item::new(6, 1).expected(&grammar).map(|s| s.as_str()), Some("NP"));
    }

    #[test]
    fn state_graph_of_tomita_grammar() {
        let bump = Bump::new();
        let grammar = grammar(TOMITA, "S", &bump);
        let family = Family::from_grammar(&grammar);
        let expected = [
            items(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]),
            items(&[(0, 1), (2, 1), (6, 0)]),
            items(&[(1, 1), (5, 1), (6, 0), (7, 0)]),
            items(&[(3, 1)]),
            items(&[(4, 1)]),
            items(&[(2, 2)]),
            items(&[(3, 0), (4, 0), (5, 0), (6, 1)]),
            items(&[(1, 2)]),
            items(&[(5, 2)]),
            items(&[(3, 0), (4, 0), (5, 0), (7, 1)]),
            items(&[(4, 2)]),
            items(&[(5, 1), (6, 0), (6, 2)]),
            items(&[(5, 1), (6, 0), (7, 2)]),
        ];
        // 这里使用 Vec, 就是要确保状态顺序的不变性, 不能每次运行都是随机的编号.
        assert_eq!(
            family.states().iter().map(|s| s.items().clone()).collect::<Vec<_>>(),
            expected
        );
        let edges: Vec<_> = family
            .states()
            .iter()
            .flat_map(|s| s.transitions().map(move |(sym, to)| (s.index(), sym.as_str(), to)))
            .collect();
        assert_eq!(
            edges,
            [
                (0, "NP", 2),
                (0, "S", 1),
                (0, "det", 4),
                (0, "n", 3),
                (1, "PP", 5),
                (1, "prep", 6),
                (2, "PP", 8),
                (2, "VP", 7),
                (2, "prep", 6),
                (2, "v", 9),
                (4, "n", 10),
                (6, "NP", 11),
                (6, "det", 4),
                (6, "n", 3),
                (9, "NP", 12),
                (9, "det", 4),
                (9, "n", 3),
                (11, "PP", 8),
                (11, "prep", 6),
                (12, "PP", 8),
                (12, "prep", 6),
            ]
        );
    }

    #[test]
    fn state_graph_is_reproducible() {
        (0..10).for_each(|_| {
            let (a, b) = (Bump::new(), Bump::new());
            let first = grammar(TOMITA, "S", &a);
            let second = grammar(TOMITA, "S", &b);
            assert_eq!(Family::from_grammar(&first), Family::from_grammar(&second));
        });
    }
}
