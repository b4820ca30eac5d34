use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{Grammar, Symbol};

/// 每个非终结符的首符集合 (starters) 和后继集合 (followers).
///
/// 文法不含空产生式, 所以首符只需要看每个产生式尾部的第一个符号.
/// 结果只包含终结符, 不包含 `$`, 归约表项总是额外加上 `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Followers<'a> {
    starters: HashMap<Symbol<'a>, BTreeSet<Symbol<'a>>>,
    followers: HashMap<Symbol<'a>, BTreeSet<Symbol<'a>>>,
}

impl<'a> Followers<'a> {
    #[must_use]
    pub fn new(grammar: &Grammar<'a>) -> Self {
        // 非终结符 -> 出现位置 (产生式编号, 尾部下标).
        let mut occurrences: HashMap<Symbol<'a>, Vec<(usize, usize)>> = HashMap::new();
        for rule in grammar.rules() {
            for (pos, &sym) in rule.right().iter().enumerate() {
                if grammar.is_nonterminal(sym.as_str()) {
                    occurrences.entry(sym).or_default().push((rule.index(), pos));
                }
            }
        }
        let starters: HashMap<_, _> = grammar
            .nonterminals()
            .iter()
            .map(|&nt| (nt, starters_of(grammar, nt)))
            .collect();
        let followers = grammar
            .nonterminals()
            .iter()
            .map(|&nt| (nt, followers_of(grammar, &occurrences, &starters, nt)))
            .collect();
        Self {
            starters,
            followers,
        }
    }

    /// 能够作为 `symbol` 推导出的句子第一个符号的终结符.
    ///
    /// 终结符或者未知符号返回空集合.
    pub fn starters(&self, symbol: &str) -> impl Iterator<Item = Symbol<'a>> + '_ {
        self.starters.get(symbol).into_iter().flatten().copied()
    }

    /// 在某个句型中能紧跟在 `symbol` 之后的终结符.
    pub fn followers(&self, symbol: &str) -> impl Iterator<Item = Symbol<'a>> + '_ {
        self.followers.get(symbol).into_iter().flatten().copied()
    }
}

fn starters_of<'a>(grammar: &Grammar<'a>, symbol: Symbol<'a>) -> BTreeSet<Symbol<'a>> {
    let mut result = BTreeSet::new();
    let mut visited = HashSet::from([symbol]);
    let mut pending = vec![symbol];
    while let Some(sym) = pending.pop() {
        for &rule in grammar.rules_of(sym.as_str()).into_iter().flatten() {
            let first = grammar.rules()[rule].right()[0];
            if grammar.is_nonterminal(first.as_str()) {
                if visited.insert(first) {
                    pending.push(first);
                }
            } else {
                result.insert(first);
            }
        }
    }
    result
}

/// 对 `symbol` 的每一处出现:
/// - 位于尾部末尾时, 并入产生式头部的 followers;
/// - 否则后一个符号是非终结符时并入它的 starters, 是终结符时直接加入.
fn followers_of<'a>(
    grammar: &Grammar<'a>,
    occurrences: &HashMap<Symbol<'a>, Vec<(usize, usize)>>,
    starters: &HashMap<Symbol<'a>, BTreeSet<Symbol<'a>>>,
    symbol: Symbol<'a>,
) -> BTreeSet<Symbol<'a>> {
    let mut result = BTreeSet::new();
    let mut visited = HashSet::from([symbol]);
    let mut pending = vec![symbol];
    while let Some(sym) = pending.pop() {
        for &(rule, pos) in occurrences.get(&sym).into_iter().flatten() {
            let rule = &grammar.rules()[rule];
            match rule.right().get(pos + 1) {
                None => {
                    if visited.insert(rule.left()) {
                        pending.push(rule.left());
                    }
                }
                Some(next) if grammar.is_nonterminal(next.as_str()) => {
                    result.extend(starters.get(next).into_iter().flatten().copied());
                }
                Some(&next) => {
                    result.insert(next);
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    use crate::{Grammar, RawRule, follow::Followers};

    const TOMITA: &str = "
        S -> NP VP | S PP
        NP -> n | det n | NP PP
        PP -> prep NP
        VP -> v NP
    ";

    fn names<'a>(it: impl Iterator<Item = crate::Symbol<'a>>) -> Vec<&'a str> {
        it.map(|s| s.as_str()).collect()
    }

    #[test]
    fn tomita() {
        let bump = Bump::new();
        let grammar = Grammar::build(RawRule::from_cfg(TOMITA).unwrap(), "S", &bump).unwrap();
        let f = Followers::new(&grammar);
        assert_eq!(names(f.starters("S")), ["det", "n"]);
        assert_eq!(names(f.starters("PP")), ["prep"]);
        assert_eq!(names(f.starters("VP")), ["v"]);
        assert_eq!(names(f.followers("S")), ["prep"]);
        assert_eq!(names(f.followers("NP")), ["prep", "v"]);
        assert_eq!(names(f.followers("PP")), ["prep", "v"]);
        assert_eq!(names(f.followers("VP")), ["prep"]);
        assert_eq!(names(f.followers("@")), Vec::<&str>::new());
        assert_eq!(names(f.starters("n")), Vec::<&str>::new());
    }

    #[test]
    fn every_occurrence_counts() {
        // A 出现了两次, 后继分别是 x 和 y.
        let bump = Bump::new();
        let grammar =
            Grammar::build(RawRule::from_cfg("S -> A x | b A y\nA -> a").unwrap(), "S", &bump)
                .unwrap();
        let f = Followers::new(&grammar);
        assert_eq!(names(f.followers("A")), ["x", "y"]);
        assert_eq!(names(f.starters("S")), ["a", "b"]);
    }

    #[test]
    fn recursive_symbols_terminate() {
        let bump = Bump::new();
        let grammar = Grammar::build(
            RawRule::from_cfg("E -> E plus T | T\nT -> T mul F | F\nF -> lp E rp | id").unwrap(),
            "E",
            &bump,
        )
        .unwrap();
        let f = Followers::new(&grammar);
        assert_eq!(names(f.starters("E")), ["id", "lp"]);
        assert_eq!(names(f.followers("E")), ["plus", "rp"]);
        assert_eq!(names(f.followers("T")), ["mul", "plus", "rp"]);
        assert_eq!(names(f.followers("F")), ["mul", "plus", "rp"]);
    }
}
