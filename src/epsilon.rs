//! 空产生式消除.
//!
//! 自动机和 GLR 运行时都假设产生式尾部非空, 因此文法在构建之前需要先改写成等价的无空产生式形式.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::{RawRule, error::Error};

/// 消除空产生式, 返回等价 (除空串外) 的产生式列表.
///
/// 对每个可空的非终结符 `E`:
/// - 如果 `E` 还有非空候选式, 那么为每个含有 `E` 的产生式补充删去任意几处 `E` 的变体;
/// - 否则 `E` 只能推出空串, 直接在原处删去所有 `E`.
///
/// 变体为空时, 其头部也变为可空的, 继续处理直到不动点.
/// 形如 `X -> X` 的变体不改变语言, 直接丢弃.
/// # Errors
/// - [`Error::LabelArity`] 标签数量与尾部长度不一致.
/// - [`Error::EpsilonEliminationBug`] 消除之后仍然存在空产生式, 这不应该出现.
pub fn eliminate_epsilon(rules: Vec<RawRule>) -> Result<Vec<RawRule>, Error> {
    if let Some(rule) = rules
        .iter()
        .find(|r| !r.labels.is_empty() && r.labels.len() != r.right.len())
    {
        Err(Error::LabelArity {
            left: rule.left.clone(),
            labels: rule.labels.len(),
            symbols: rule.right.len(),
        })?
    }
    let (mut set, mut queue) = WorkingSet::fill(rules);
    let mut nullable: HashSet<String> = queue.iter().cloned().collect();
    let mut cursor = 0;
    while let Some(eps) = queue.get(cursor).cloned() {
        cursor += 1;
        let found = if set.produces(&eps) {
            debug!("adding {eps}-free variants");
            set.add_epsilon_free(&eps)
        } else {
            debug!("removing {eps} which only derives epsilon");
            set.remove_epsilon(&eps)
        };
        for left in found {
            // 已经处理过但失去了所有非空候选式的符号, 需要再处理一次把它从尾部删掉.
            if nullable.insert(left.clone()) || !set.produces(&left) {
                trace!("new nullable symbol: {left}");
                queue.push(left);
            }
        }
    }
    let rules = set.into_rules();
    let left_over: Vec<_> = rules
        .iter()
        .filter(|r| r.is_epsilon())
        .map(|r| r.left.clone())
        .collect();
    if !left_over.is_empty() {
        Err(Error::EpsilonEliminationBug(left_over))?
    }
    Ok(rules)
}

#[derive(Debug, Default)]
struct WorkingSet {
    /// 被删除的产生式为 [`None`], 保持编号稳定.
    rules: Vec<Option<RawRule>>,
    by_left: HashMap<String, BTreeSet<usize>>,
    known: HashSet<(String, Vec<String>)>,
}

impl WorkingSet {
    /// 返回 (非空产生式集合, 按出现顺序排列的可空符号).
    fn fill(rules: Vec<RawRule>) -> (Self, Vec<String>) {
        let mut set = Self::default();
        let mut epsilons = Vec::new();
        for rule in rules {
            if rule.is_epsilon() {
                if !epsilons.contains(&rule.left) {
                    epsilons.push(rule.left);
                }
            } else {
                set.add(rule);
            }
        }
        (set, epsilons)
    }

    fn add(&mut self, rule: RawRule) {
        if !self.known.insert((rule.left.clone(), rule.right.clone())) {
            return;
        }
        self.by_left
            .entry(rule.left.clone())
            .or_default()
            .insert(self.rules.len());
        self.rules.push(Some(rule));
    }

    fn produces(&self, symbol: &str) -> bool {
        self.by_left.get(symbol).is_some_and(|s| !s.is_empty())
    }

    /// 返回新产生的空变体的头部.
    fn add_epsilon_free(&mut self, eps: &str) -> Vec<String> {
        let mut found = Vec::new();
        // 循环过程中新加入的产生式也要处理.
        let mut i = 0;
        while i < self.rules.len() {
            let Some(rule) = &self.rules[i] else {
                i += 1;
                continue;
            };
            let positions: Vec<_> = rule
                .right
                .iter()
                .enumerate()
                .filter(|(_, s)| *s == eps)
                .map(|(p, _)| p)
                .collect();
            if positions.is_empty() {
                i += 1;
                continue;
            }
            let mut variants: Vec<Vec<usize>> = vec![(0..rule.right.len()).collect()];
            for p in positions {
                let without: Vec<Vec<usize>> = variants
                    .iter()
                    .map(|kept| kept.iter().copied().filter(|&k| k != p).collect())
                    .collect();
                variants.extend(without);
            }
            let variants: Vec<_> = variants
                .into_iter()
                .skip(1)
                .map(|kept| project(rule, &kept))
                .collect();
            for variant in variants {
                if variant.is_epsilon() {
                    found.push(variant.left);
                } else if is_unit_cycle(&variant) {
                    trace!("dropping variant {} -> {}", variant.left, variant.left);
                } else {
                    trace!("variant: {} -> {:?}", variant.left, variant.right);
                    self.add(variant);
                }
            }
            i += 1;
        }
        found
    }

    /// 原地删去 `eps`, 返回因此变空的产生式的头部.
    fn remove_epsilon(&mut self, eps: &str) -> Vec<String> {
        let mut found = Vec::new();
        for i in 0..self.rules.len() {
            let Some(rule) = &self.rules[i] else {
                continue;
            };
            if !rule.right.iter().any(|s| s == eps) {
                continue;
            }
            let kept: Vec<_> = (0..rule.right.len())
                .filter(|&k| rule.right[k] != eps)
                .collect();
            let stripped = project(rule, &kept);
            self.known.remove(&(rule.left.clone(), rule.right.clone()));
            if let Some(indexes) = self.by_left.get_mut(&rule.left) {
                indexes.remove(&i);
            }
            if stripped.is_epsilon() {
                found.push(stripped.left);
                self.rules[i] = None;
            } else if is_unit_cycle(&stripped) {
                self.rules[i] = None;
            } else if self
                .known
                .insert((stripped.left.clone(), stripped.right.clone()))
            {
                self.by_left
                    .entry(stripped.left.clone())
                    .or_default()
                    .insert(i);
                self.rules[i] = Some(stripped);
            } else {
                // 删去之后与已有产生式重复.
                self.rules[i] = None;
            }
        }
        found
    }

    fn into_rules(self) -> Vec<RawRule> {
        self.rules.into_iter().flatten().collect()
    }
}

/// `X -> X`, 归约之后回到同一个状态.
fn is_unit_cycle(rule: &RawRule) -> bool {
    matches!(rule.right.as_slice(), [only] if *only == rule.left)
}

/// 只保留 `kept` 位置上的尾部符号 (以及对应的标签).
fn project(rule: &RawRule, kept: &[usize]) -> RawRule {
    RawRule {
        left: rule.left.clone(),
        right: kept.iter().map(|&k| rule.right[k].clone()).collect(),
        commit: rule.commit,
        labels: if rule.labels.is_empty() {
            Vec::new()
        } else {
            kept.iter().map(|&k| rule.labels[k].clone()).collect()
        },
        weight: rule.weight,
    }
}
