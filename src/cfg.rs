use indexmap::IndexSet;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct TermId(pub(crate) u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NontermId(pub(crate) u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Symbol {
  Term(TermId),
  Nonterm(NontermId),
}

/// A production's right hand side; empty means ε.
pub(crate) type Sequence = Vec<Symbol>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Nonterm {
  pub(crate) name: String,
  /// alternatives form a set; duplicates are collapsed at interning time
  pub(crate) alts: Vec<Sequence>,
}

/// Interned grammar. Terminal and nonterminal ids index `terms` and
/// `nonterms`; after reduction nonterminal ids are remapped to stay dense.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Cfg {
  pub(crate) terms: Vec<String>,
  pub(crate) term_ids: HashMap<String, TermId>,
  pub(crate) nonterms: Vec<Nonterm>,
  pub(crate) nonterm_ids: HashMap<String, NontermId>,
  pub(crate) start: NontermId,
}

impl Cfg {
  /// Interns a validated grammar. Every symbol must already be known to
  /// be declared; duplicate declarations and duplicate alternatives are
  /// collapsed.
  pub(crate) fn build(
    start: &str,
    terminals: &[&str],
    nonterminals: &[&str],
    productions: &[(&str, Vec<Vec<&str>>)],
  ) -> Cfg {
    let mut terms = Vec::new();
    let mut term_ids = HashMap::new();
    for &name in terminals {
      if !term_ids.contains_key(name) {
        term_ids.insert(name.to_owned(), TermId(terms.len() as u32));
        terms.push(name.to_owned());
      }
    }

    let mut nonterm_names = Vec::new();
    let mut nonterm_ids = HashMap::new();
    for &name in nonterminals {
      if !nonterm_ids.contains_key(name) {
        nonterm_ids.insert(name.to_owned(), NontermId(nonterm_names.len() as u32));
        nonterm_names.push(name.to_owned());
      }
    }

    let mut alt_sets: Vec<IndexSet<Sequence>> =
      vec![IndexSet::new(); nonterm_names.len()];
    for (lhs, alts) in productions {
      let lhs_id = nonterm_ids[*lhs];
      for alt in alts {
        let seq = alt.iter()
          .map(|&name| match term_ids.get(name) {
            Some(&id) => Symbol::Term(id),
            None => Symbol::Nonterm(nonterm_ids[name]),
          })
          .collect();
        alt_sets[lhs_id.0 as usize].insert(seq);
      }
    }

    let nonterms = nonterm_names.into_iter()
      .zip(alt_sets)
      .map(|(name, alts)| Nonterm {
        name,
        alts: alts.into_iter().collect(),
      })
      .collect();

    let start = nonterm_ids[start];
    Cfg {
      terms,
      term_ids,
      nonterms,
      nonterm_ids,
      start,
    }
  }

  pub(crate) fn term_name(&self, id: TermId) -> &str {
    &self.terms[id.0 as usize]
  }

  pub(crate) fn nonterm_name(&self, id: NontermId) -> &str {
    &self.nonterms[id.0 as usize].name
  }

  pub(crate) fn symbol_name(&self, sym: Symbol) -> &str {
    match sym {
      Symbol::Term(id) => self.term_name(id),
      Symbol::Nonterm(id) => self.nonterm_name(id),
    }
  }

  pub(crate) fn alts(&self, id: NontermId) -> &[Sequence] {
    &self.nonterms[id.0 as usize].alts
  }

  /// Flattened productions as (lhs, alternative index, rhs).
  pub(crate) fn prods(&self) -> impl Iterator<Item = (NontermId, usize, &Sequence)> {
    self.nonterms.iter()
      .enumerate()
      .flat_map(|(nt, nonterm)| {
        nonterm.alts.iter()
          .enumerate()
          .map(move |(ix, alt)| (NontermId(nt as u32), ix, alt))
      })
  }
}
