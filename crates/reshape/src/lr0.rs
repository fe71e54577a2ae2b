//! Item sets and the shift-reduce automaton derived from them.

use crate::{
    grammar::{Grammar, MatchElement, Rule, RuleID},
    types::{Map, Queue, Set},
    util::display_fn,
};
use reshape_runtime::definition::StateID;
use std::{collections::VecDeque, fmt};

/// A grammar extended with the accepting rule `$accept := <start symbol>`.
#[derive(Debug)]
pub struct Augmented<'g> {
    grammar: &'g Grammar,
    accept: Rule,
}

impl<'g> Augmented<'g> {
    pub fn new(grammar: &'g Grammar, start_symbol: &str) -> Self {
        Self {
            grammar,
            accept: Rule::accept(start_symbol),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        if id == RuleID::ACCEPT {
            &self.accept
        } else {
            self.grammar.rule(id)
        }
    }

    pub fn alternatives(&self, name: &str) -> &'g [RuleID] {
        self.grammar.alternatives(name)
    }
}

/// The title of a grammar symbol: the pattern of a terminal,
/// or the name of a nonterminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolTitle<'a> {
    Terminal(&'a str),
    Nonterminal(&'a str),
}

impl<'a> SymbolTitle<'a> {
    fn of(element: &'a MatchElement) -> Self {
        match element {
            MatchElement::Identifier { name, .. } => Self::Nonterminal(name),
            MatchElement::RegexLiteral { pattern, .. } => Self::Terminal(pattern),
        }
    }
}

impl fmt::Display for SymbolTitle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(pattern) => write!(f, "/{}/", pattern),
            Self::Nonterminal(name) => f.write_str(name),
        }
    }
}

/// A rule paired with the position of the dot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemCore {
    pub rule: RuleID,
    pub dot: u16,
}

impl ItemCore {
    fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }

    pub fn display<'a>(&'a self, g: &'a Augmented<'a>) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "{} -> [ ", rule.name())?;
            for (i, element) in rule.matches().iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                if i == usize::from(self.dot) {
                    f.write_str(". ")?;
                }
                write!(f, "{}", element)?;
            }
            if rule.matches().len() == usize::from(self.dot) {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// An item, with the title of the symbol right after the dot cached.
///
/// The title is `None` iff the dot is at the end of the rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Item<'a> {
    pub core: ItemCore,
    pub title: Option<SymbolTitle<'a>>,
}

impl<'a> Item<'a> {
    pub fn new(g: &'a Augmented<'_>, core: ItemCore) -> Self {
        let title = g
            .rule(core.rule)
            .matches()
            .get(usize::from(core.dot))
            .map(SymbolTitle::of);
        Self { core, title }
    }

    pub fn is_reduce_ready(&self) -> bool {
        self.title.is_none()
    }
}

/// Compute the closure of the kernel items.
///
/// Each nonterminal is expanded at most once, so recursive rules terminate.
/// The kernels come first in the result, followed by the derived items in
/// the order they were found.
pub fn expand<'a>(g: &'a Augmented<'_>, kernels: &[ItemCore]) -> Vec<Item<'a>> {
    let mut items = Set::<Item<'a>>::default();
    let mut expanded = Set::<&'a str>::default();
    let mut pending: Queue<ItemCore> = kernels.iter().copied().collect();
    while let Some(core) = pending.pop() {
        let item = Item::new(g, core);
        if !items.insert(item) {
            continue;
        }
        if let Some(SymbolTitle::Nonterminal(name)) = item.title {
            if expanded.insert(name) {
                for &rule in g.alternatives(name) {
                    pending.push(ItemCore { rule, dot: 0 });
                }
            }
        }
    }
    items.into_iter().collect()
}

/// The items of a state sharing the same symbol after their dots.
#[derive(Debug)]
pub struct ItemGroup<'a> {
    pub title: SymbolTitle<'a>,
    pub items: Vec<Item<'a>>,
}

/// Partition the items by the title after the dot, in order of first appearance.
///
/// The rules of the reduce-ready items are returned separately, in declaration order.
pub fn group<'a>(items: &[Item<'a>]) -> (Vec<ItemGroup<'a>>, Vec<RuleID>) {
    let mut groups = Map::<SymbolTitle<'a>, Vec<Item<'a>>>::default();
    let mut reduces = vec![];
    for item in items {
        match item.title {
            Some(title) => groups.entry(title).or_default().push(*item),
            None => reduces.push(item.core.rule),
        }
    }
    reduces.sort();
    reduces.dedup();

    let groups = groups
        .into_iter()
        .map(|(title, items)| ItemGroup { title, items })
        .collect();
    (groups, reduces)
}

#[derive(Debug, Clone)]
pub struct LR0State<'a> {
    pub kernels: Vec<ItemCore>,
    pub shifts: Map<&'a str, StateID>,
    pub gotos: Map<&'a str, StateID>,
    pub reduces: Vec<RuleID>,
}

impl<'a> LR0State<'a> {
    pub fn display(&'a self, g: &'a Augmented<'a>) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            writeln!(f, "## kernels:")?;
            for kernel in &self.kernels {
                writeln!(f, "- {}", kernel.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (pattern, to) in &self.shifts {
                    writeln!(f, "- /{}/ => {:?}", pattern, to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (name, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", name, to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for reduce in &self.reduces {
                    writeln!(f, "- {}", g.rule(*reduce).display())?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton<'a> {
    pub states: Map<StateID, LR0State<'a>>,
}

impl<'a> LR0Automaton<'a> {
    pub fn display(&'a self, g: &'a Augmented<'a>) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the automaton of the augmented grammar.
///
/// States are identified by their kernels, so a kernel set reached along
/// different paths yields a single state.
pub fn lr0<'a>(g: &'a Augmented<'_>) -> LR0Automaton<'a> {
    let mut states = Map::<StateID, LR0State<'a>>::default();
    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID::from_raw(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let initial = vec![ItemCore {
        rule: RuleID::ACCEPT,
        dot: 0,
    }];
    let mut isocores = Map::<Vec<ItemCore>, StateID>::default();
    let mut pending_states = VecDeque::<(StateID, Vec<ItemCore>)>::new();
    let id = state_id();
    isocores.insert(initial.clone(), id);
    pending_states.push_back((id, initial));

    while let Some((current, kernels)) = pending_states.pop_front() {
        let items = expand(g, &kernels);
        let (groups, reduces) = group(&items);

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for group in groups {
            let mut new_kernel: Vec<_> =
                group.items.iter().map(|item| item.core.advance()).collect();
            new_kernel.sort();
            new_kernel.dedup();

            let next = match isocores.get(&new_kernel) {
                Some(id) => *id,
                None => {
                    let id = state_id();
                    isocores.insert(new_kernel.clone(), id);
                    pending_states.push_back((id, new_kernel));
                    id
                }
            };
            match group.title {
                SymbolTitle::Terminal(pattern) => {
                    shifts.insert(pattern, next);
                }
                SymbolTitle::Nonterminal(name) => {
                    gotos.insert(name, next);
                }
            }
        }

        states.insert(
            current,
            LR0State {
                kernels,
                shifts,
                gotos,
                reduces,
            },
        );
    }

    tracing::trace!("{} states", states.len());

    LR0Automaton { states }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::MatchElement as M;

    #[test]
    fn expands_right_recursive_rule_after_the_dot() {
        let mut list = vec![];
        let grammar = Grammar::define(|g| {
            list.push(g.rule("list", [M::regex("x"), M::ident("list")], [])?);
            list.push(g.rule("list", [M::regex("x")], [])?);
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "list");

        // list := /x/ . list
        // list := /x/ .
        let kernels = [
            ItemCore {
                rule: list[0],
                dot: 1,
            },
            ItemCore {
                rule: list[1],
                dot: 1,
            },
        ];
        let items = expand(&g, &kernels);
        let cores: Vec<_> = items.iter().map(|item| item.core).collect();
        assert_eq!(
            cores,
            [
                kernels[0],
                kernels[1],
                ItemCore {
                    rule: list[0],
                    dot: 0
                },
                ItemCore {
                    rule: list[1],
                    dot: 0
                },
            ]
        );
        assert!(items[1].is_reduce_ready());
        assert_eq!(items[2].title, Some(SymbolTitle::Terminal("x")));
    }

    #[test]
    fn expands_each_nonterminal_once() {
        let grammar = Grammar::define(|g| {
            g.rule("e", [M::ident("e"), M::regex(r"\+"), M::ident("t")], [])?;
            g.rule("e", [M::ident("t")], [])?;
            g.rule("t", [M::ident("t"), M::regex(r"\*"), M::regex("n")], [])?;
            g.rule("t", [M::regex("n")], [])?;
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "e");
        let items = expand(
            &g,
            &[ItemCore {
                rule: RuleID::ACCEPT,
                dot: 0,
            }],
        );
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn groups_by_title_in_order_of_appearance() {
        let mut ids = vec![];
        let grammar = Grammar::define(|g| {
            ids.push(g.rule("s", [M::ident("a"), M::regex("x")], [])?);
            ids.push(g.rule("s", [M::regex("y")], [])?);
            ids.push(g.rule("a", [M::regex("y"), M::regex("z")], [])?);
            ids.push(g.rule("a", [], [])?);
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "s");
        let items = expand(
            &g,
            &[ItemCore {
                rule: RuleID::ACCEPT,
                dot: 0,
            }],
        );
        let (groups, reduces) = group(&items);

        let titles: Vec<_> = groups.iter().map(|group| group.title).collect();
        assert_eq!(
            titles,
            [
                SymbolTitle::Nonterminal("s"),
                SymbolTitle::Nonterminal("a"),
                SymbolTitle::Terminal("y"),
            ]
        );
        // s := . /y/ and a := . /y/ /z/
        assert_eq!(groups[2].items.len(), 2);
        assert_eq!(reduces, [ids[3]]);
    }

    #[test]
    fn builds_automaton() {
        let mut s = None;
        let grammar = Grammar::define(|g| {
            s = Some(g.rule("s", [M::regex("a"), M::regex("b")], [])?);
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "s");
        let automaton = lr0(&g);
        eprintln!("{}", automaton.display(&g));

        let state = |raw| &automaton.states[&StateID::from_raw(raw)];
        assert_eq!(automaton.states.len(), 4);
        assert_eq!(state(0).gotos["s"], StateID::from_raw(1));
        assert_eq!(state(0).shifts["a"], StateID::from_raw(2));
        assert_eq!(state(1).reduces, [RuleID::ACCEPT]);
        assert_eq!(state(2).shifts["b"], StateID::from_raw(3));
        assert_eq!(state(3).reduces, [s.unwrap()]);
    }

    #[test]
    fn merges_states_with_same_kernels() {
        let grammar = Grammar::define(|g| {
            g.rule("list", [M::regex("x"), M::ident("list")], [])?;
            g.rule("list", [M::regex("x")], [])?;
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "list");
        let automaton = lr0(&g);

        // S0 -list-> S1 (accept), S0 -x-> S2, S2 -x-> S2, S2 -list-> S3
        assert_eq!(automaton.states.len(), 4);
        let after_x = automaton.states[&StateID::INITIAL].shifts["x"];
        assert_eq!(automaton.states[&after_x].shifts["x"], after_x);
    }

    #[test]
    fn states_are_numbered_in_order() {
        let grammar = Grammar::define(|g| {
            g.rule("e", [M::ident("e"), M::regex(r"\+"), M::regex("n")], [])?;
            g.rule("e", [M::regex("n")], [])?;
            Ok(())
        })
        .unwrap();
        let g = Augmented::new(&grammar, "e");
        let automaton = lr0(&g);
        for (i, id) in automaton.states.keys().enumerate() {
            assert_eq!(id.into_raw() as usize, i);
        }
    }
}
