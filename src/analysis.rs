use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::bitset::BitSet;
use crate::cfg::{Cfg, Nonterm, NontermId, Sequence, Symbol};
use crate::scc::strongly_connected_components;

/// Derived attributes of a reduced grammar, computed once at construction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Analysis {
  num_terms: usize,
  /// indexed by nonterminal
  pub(crate) nullable: Vec<bool>,
  /// indexed by nonterminal
  pub(crate) eps_free_first: Vec<BitSet>,
  /// indexed by nonterminal
  pub(crate) follow: Vec<LookSet>,
  pub(crate) conflicts: Vec<Conflict>,
}

/// A set of terminals plus an explicit end-of-input marker.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct LookSet {
  pub(crate) terms: BitSet,
  pub(crate) eof: bool,
}

impl LookSet {
  fn new(num_terms: usize) -> Self {
    LookSet {
      terms: BitSet::new(num_terms),
      eof: false,
    }
  }

  /// Returns whether the set has changed.
  fn union_with(&mut self, other: &LookSet) -> bool {
    let terms_changed = self.terms.union_with(&other.terms);
    let eof_changed = !self.eof && other.eof;
    self.eof |= other.eof;
    terms_changed || eof_changed
  }

  pub(crate) fn intersects(&self, other: &LookSet) -> bool {
    self.terms.intersects(&other.terms) || (self.eof && other.eof)
  }
}

/// Two alternatives of a nonterminal whose lookahead sets overlap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Conflict {
  pub(crate) nonterm: NontermId,
  pub(crate) left: usize,
  pub(crate) right: usize,
}

pub(crate) fn analyze(cfg: &Cfg) -> Analysis {
  let nullable = gen_nullable(cfg);
  let eps_free_first = gen_first(cfg, &nullable);
  let follow = gen_follow(cfg, &nullable, &eps_free_first);

  let mut analysis = Analysis {
    num_terms: cfg.terms.len(),
    nullable,
    eps_free_first,
    follow,
    conflicts: Vec::new(),
  };
  analysis.conflicts = gen_conflicts(cfg, &analysis);
  analysis
}

impl Analysis {
  /// The effective lookahead set of an alternative: FIRST1 of the
  /// sequence, with ε replaced by FOLLOW1 of the left hand side when the
  /// sequence is entirely nullable.
  pub(crate) fn lookahead_set(&self, lhs: NontermId, alt: &[Symbol]) -> LookSet {
    let mut set = LookSet::new(self.num_terms);
    for &sym in alt {
      match sym {
        Symbol::Term(id) => {
          set.terms.insert(id.0 as usize);
          return set;
        }
        Symbol::Nonterm(id) => {
          set.terms.union_with(&self.eps_free_first[id.0 as usize]);
          if !self.nullable[id.0 as usize] {
            return set;
          }
        }
      }
    }
    set.union_with(&self.follow[lhs.0 as usize]);
    set
  }
}

/// Removes unproductive alternatives and unreachable nonterminals,
/// remapping nonterminal ids. The start symbol is always kept, possibly
/// with no alternatives left.
pub(crate) fn reduce(cfg: &Cfg) -> Cfg {
  let prods: Vec<(NontermId, usize, &Sequence)> = cfg.prods().collect();
  let num_nonterms = cfg.nonterms.len();

  // production index of (nonterminal, alternative) pairs
  let mut offsets = vec![0usize; num_nonterms];
  let mut acc = 0;
  for (i, nonterm) in cfg.nonterms.iter().enumerate() {
    offsets[i] = acc;
    acc += nonterm.alts.len();
  }

  // AND-OR fixpoint: a production is productive once every nonterminal
  // occurrence in its right hand side is, a nonterminal once one of its
  // alternatives is.
  let mut count = vec![0usize; prods.len()];
  let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); num_nonterms];
  for (p, &(_, _, rhs)) in prods.iter().enumerate() {
    for &sym in rhs {
      if let Symbol::Nonterm(id) = sym {
        count[p] += 1;
        occurrences[id.0 as usize].push(p);
      }
    }
  }

  let mut productive_prod = vec![false; prods.len()];
  let mut productive = vec![false; num_nonterms];
  let mut queue: Vec<usize> = (0..prods.len()).filter(|&p| count[p] == 0).collect();
  while let Some(p) = queue.pop() {
    productive_prod[p] = true;
    let (lhs, _, _) = prods[p];
    if !productive[lhs.0 as usize] {
      productive[lhs.0 as usize] = true;
      for &q in &occurrences[lhs.0 as usize] {
        count[q] -= 1;
        if count[q] == 0 {
          queue.push(q);
        }
      }
    }
  }

  // forward reachability over productive alternatives only
  let mut reachable = vec![false; num_nonterms];
  let mut work = vec![cfg.start];
  while let Some(id) = work.pop() {
    if reachable[id.0 as usize] {
      continue;
    }
    reachable[id.0 as usize] = true;
    for (ix, alt) in cfg.alts(id).iter().enumerate() {
      if !productive_prod[offsets[id.0 as usize] + ix] {
        continue;
      }
      for &sym in alt {
        if let Symbol::Nonterm(b) = sym {
          work.push(b);
        }
      }
    }
  }

  // rebuild with dense ids; every nonterminal occurring in a kept
  // alternative is itself reachable and productive
  let mut remap = HashMap::<NontermId, NontermId>::new();
  let mut nonterms = Vec::new();
  for (i, nonterm) in cfg.nonterms.iter().enumerate() {
    if !reachable[i] {
      continue;
    }
    remap.insert(NontermId(i as u32), NontermId(nonterms.len() as u32));
    nonterms.push(Nonterm {
      name: nonterm.name.clone(),
      alts: Vec::new(),
    });
  }

  for (i, nonterm) in cfg.nonterms.iter().enumerate() {
    let new_id = match remap.get(&NontermId(i as u32)) {
      Some(&id) => id,
      None => continue,
    };
    nonterms[new_id.0 as usize].alts = nonterm.alts.iter()
      .enumerate()
      .filter(|&(ix, _)| productive_prod[offsets[i] + ix])
      .map(|(_, alt)| {
        alt.iter()
          .map(|&sym| match sym {
            Symbol::Term(id) => Symbol::Term(id),
            Symbol::Nonterm(id) => Symbol::Nonterm(remap[&id]),
          })
          .collect()
      })
      .collect();
  }

  let nonterm_ids = nonterms.iter()
    .enumerate()
    .map(|(i, nonterm)| (nonterm.name.clone(), NontermId(i as u32)))
    .collect();

  Cfg {
    terms: cfg.terms.clone(),
    term_ids: cfg.term_ids.clone(),
    nonterms,
    nonterm_ids,
    start: remap[&cfg.start],
  }
}

/// Fixpoint dual to productivity, driven by sequence length: every
/// occurrence of a symbol that becomes nullable decrements the countdown
/// of the productions containing it.
fn gen_nullable(cfg: &Cfg) -> Vec<bool> {
  let prods: Vec<(NontermId, usize, &Sequence)> = cfg.prods().collect();
  let num_nonterms = cfg.nonterms.len();

  let mut count = vec![0usize; prods.len()];
  let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); num_nonterms];
  for (p, &(_, _, rhs)) in prods.iter().enumerate() {
    count[p] = rhs.len();
    for &sym in rhs {
      if let Symbol::Nonterm(id) = sym {
        occurrences[id.0 as usize].push(p);
      }
    }
  }

  let mut nullable = vec![false; num_nonterms];
  let mut queue: Vec<usize> = (0..prods.len()).filter(|&p| count[p] == 0).collect();
  while let Some(p) = queue.pop() {
    let (lhs, _, _) = prods[p];
    if !nullable[lhs.0 as usize] {
      nullable[lhs.0 as usize] = true;
      for &q in &occurrences[lhs.0 as usize] {
        count[q] -= 1;
        if count[q] == 0 {
          queue.push(q);
        }
      }
    }
  }

  nullable
}

fn full_vertex_graph(cfg: &Cfg) -> IndexMap<NontermId, IndexSet<NontermId>> {
  (0..cfg.nonterms.len())
    .map(|i| (NontermId(i as u32), IndexSet::new()))
    .collect()
}

/// Epsilon-free FIRST1 sets. Local terminal seeding plus a dependency
/// graph resolved with Tarjan's algorithm; reversing the component order
/// guarantees a dependency is final before it is propagated.
fn gen_first(cfg: &Cfg, nullable: &[bool]) -> Vec<BitSet> {
  let num_terms = cfg.terms.len();
  let mut first = vec![BitSet::new(num_terms); cfg.nonterms.len()];
  let mut graph = full_vertex_graph(cfg);

  for (lhs, _, rhs) in cfg.prods() {
    for &sym in rhs {
      match sym {
        Symbol::Term(id) => {
          first[lhs.0 as usize].insert(id.0 as usize);
          break;
        }
        Symbol::Nonterm(id) => {
          // FIRST1 of the occurrence flows into FIRST1 of the left hand side
          if let Some(succs) = graph.get_mut(&id) {
            succs.insert(lhs);
          }
          if !nullable[id.0 as usize] {
            break;
          }
        }
      }
    }
  }

  let components = strongly_connected_components(&graph);
  for component in components.iter().rev() {
    let mut merged = BitSet::new(num_terms);
    for &id in component {
      merged.union_with(&first[id.0 as usize]);
    }
    for &id in component {
      first[id.0 as usize] = merged.clone();
    }
    for &id in component {
      for &succ in &graph[&id] {
        first[succ.0 as usize].union_with(&merged);
      }
    }
  }

  first
}

/// FOLLOW1 sets. The suffix after each nonterminal occurrence contributes
/// terminals and epsilon-free FIRST1 sets; a fully nullable suffix makes
/// FOLLOW1 of the left hand side flow into FOLLOW1 of the occurrence.
fn gen_follow(
  cfg: &Cfg,
  nullable: &[bool],
  eps_free_first: &[BitSet],
) -> Vec<LookSet> {
  let num_terms = cfg.terms.len();
  let mut follow = vec![LookSet::new(num_terms); cfg.nonterms.len()];
  follow[cfg.start.0 as usize].eof = true;

  let mut graph = full_vertex_graph(cfg);

  for (lhs, _, rhs) in cfg.prods() {
    for (i, &sym) in rhs.iter().enumerate() {
      let b = match sym {
        Symbol::Nonterm(id) => id,
        Symbol::Term(_) => continue,
      };

      let mut suffix_nullable = true;
      for &next in &rhs[i + 1..] {
        match next {
          Symbol::Term(id) => {
            follow[b.0 as usize].terms.insert(id.0 as usize);
            suffix_nullable = false;
            break;
          }
          Symbol::Nonterm(id) => {
            follow[b.0 as usize].terms.union_with(&eps_free_first[id.0 as usize]);
            if !nullable[id.0 as usize] {
              suffix_nullable = false;
              break;
            }
          }
        }
      }

      if suffix_nullable {
        if let Some(succs) = graph.get_mut(&lhs) {
          succs.insert(b);
        }
      }
    }
  }

  let components = strongly_connected_components(&graph);
  for component in components.iter().rev() {
    let mut merged = LookSet::new(num_terms);
    for &id in component {
      merged.union_with(&follow[id.0 as usize]);
    }
    for &id in component {
      follow[id.0 as usize] = merged.clone();
    }
    for &id in component {
      for &succ in &graph[&id] {
        follow[succ.0 as usize].union_with(&merged);
      }
    }
  }

  follow
}

fn gen_conflicts(cfg: &Cfg, analysis: &Analysis) -> Vec<Conflict> {
  let mut conflicts = Vec::new();
  for (i, nonterm) in cfg.nonterms.iter().enumerate() {
    let id = NontermId(i as u32);
    let sets: Vec<LookSet> = nonterm.alts.iter()
      .map(|alt| analysis.lookahead_set(id, alt))
      .collect();
    for left in 0..sets.len() {
      for right in left + 1..sets.len() {
        if sets[left].intersects(&sets[right]) {
          conflicts.push(Conflict { nonterm: id, left, right });
        }
      }
    }
  }
  conflicts
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn names(cfg: &Cfg, set: &BitSet) -> Vec<String> {
    set.iter().map(|t| cfg.terms[t].clone()).collect()
  }

  /// S -> S A | B | C, A -> a | ε, B -> b | ε, C -> D, D -> C
  fn unreduced() -> Cfg {
    Cfg::build(
      "S",
      &["a", "b"],
      &["S", "A", "B", "C", "D"],
      &[
        ("S", vec![vec!["S", "A"], vec!["B"], vec!["C"]]),
        ("A", vec![vec!["a"], vec![]]),
        ("B", vec![vec!["b"], vec![]]),
        ("C", vec![vec!["D"]]),
        ("D", vec![vec!["C"]]),
      ],
    )
  }

  #[test]
  fn reduce_drops_unproductive_and_unreachable() {
    let cfg = reduce(&unreduced());

    let nonterms: Vec<&str> = cfg.nonterms.iter()
      .map(|nt| nt.name.as_str())
      .collect();
    assert_eq!(nonterms, vec!["S", "A", "B"]);

    // the S -> C alternative referenced a removed nonterminal
    assert_eq!(cfg.alts(cfg.start).len(), 2);
    assert_eq!(cfg.terms, vec!["a".to_owned(), "b".to_owned()]);
  }

  #[test]
  fn reduce_keeps_unproductive_start() {
    let cfg = Cfg::build(
      "S",
      &["a"],
      &["S"],
      &[("S", vec![vec!["S"]])],
    );
    let reduced = reduce(&cfg);

    assert_eq!(reduced.nonterms.len(), 1);
    assert_eq!(reduced.nonterms[0].name, "S");
    assert!(reduced.nonterms[0].alts.is_empty());
  }

  #[test]
  fn reduce_is_idempotent() {
    let once = reduce(&unreduced());
    let twice = reduce(&once);

    assert_eq!(once, twice);
  }

  #[test]
  fn analysis_is_deterministic() {
    let cfg = reduce(&unreduced());

    assert_eq!(analyze(&cfg), analyze(&cfg));
  }

  #[test]
  fn nullable_per_occurrence() {
    // S -> B B must become nullable when B is
    let cfg = Cfg::build(
      "S",
      &["b"],
      &["S", "B"],
      &[
        ("S", vec![vec!["B", "B"]]),
        ("B", vec![vec!["b"], vec![]]),
      ],
    );
    let nullable = gen_nullable(&cfg);

    assert_eq!(nullable, vec![true, true]);
  }

  #[test]
  fn first_propagates_through_left_recursion() {
    let cfg = reduce(&unreduced());
    let analysis = analyze(&cfg);

    let s = cfg.nonterm_ids["S"];
    assert_eq!(names(&cfg, &analysis.eps_free_first[s.0 as usize]), vec!["a", "b"]);
    assert!(analysis.nullable[s.0 as usize]);
  }

  #[test]
  fn follow_of_start_has_eof() {
    let cfg = reduce(&unreduced());
    let analysis = analyze(&cfg);

    assert!(analysis.follow[cfg.start.0 as usize].eof);
  }

  #[test]
  fn conflicts_on_left_recursive_grammar() {
    let cfg = reduce(&unreduced());
    let analysis = analyze(&cfg);

    let pairs: Vec<(&str, usize, usize)> = analysis.conflicts.iter()
      .map(|c| (cfg.nonterm_name(c.nonterm), c.left, c.right))
      .collect();
    // S A and B both start with every terminal S can derive, and the
    // nullable A -> ε alternative overlaps FOLLOW1(A)
    assert_eq!(pairs, vec![("S", 0, 1), ("A", 0, 1)]);
  }

  #[test]
  fn no_conflicts_on_ll1_expression_grammar() {
    let cfg = Cfg::build(
      "E",
      &["plus", "id"],
      &["E", "E'", "T"],
      &[
        ("E", vec![vec!["T", "E'"]]),
        ("E'", vec![vec!["plus", "T", "E'"], vec![]]),
        ("T", vec![vec!["id"]]),
      ],
    );
    let analysis = analyze(&cfg);

    assert_eq!(analysis.conflicts, vec![]);

    let e1 = cfg.nonterm_ids["E'"];
    let t = cfg.nonterm_ids["T"];
    assert!(analysis.nullable[e1.0 as usize]);
    assert_eq!(names(&cfg, &analysis.follow[t.0 as usize].terms), vec!["plus"]);
    assert!(analysis.follow[t.0 as usize].eof);
  }
}
