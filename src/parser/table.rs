use std::collections::HashMap;

use crate::analysis::Analysis;
use crate::cfg::{Cfg, NontermId, TermId};

/// The parser's view of the next input symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(super) enum Lookahead {
  Term(TermId),
  EndOfInput,
}

/// Maps (nonterminal, lookahead) to the candidate alternatives. For an
/// LL(1) grammar every key holds exactly one candidate; the parse loop
/// still checks, since more than one would mean the conflict detection
/// and this table disagree.
pub(super) struct Table {
  /// indexed by nonterminal; values are alternative indices
  rows: Vec<HashMap<Lookahead, Vec<u16>>>,
}

impl Table {
  pub(super) fn build(cfg: &Cfg, analysis: &Analysis) -> Table {
    let mut rows: Vec<HashMap<Lookahead, Vec<u16>>> =
      vec![HashMap::new(); cfg.nonterms.len()];

    for (lhs, ix, alt) in cfg.prods() {
      let lookaheads = analysis.lookahead_set(lhs, alt);
      let row = &mut rows[lhs.0 as usize];
      for term in lookaheads.terms.iter() {
        row.entry(Lookahead::Term(TermId(term as u32)))
          .or_insert_with(Vec::new)
          .push(ix as u16);
      }
      if lookaheads.eof {
        row.entry(Lookahead::EndOfInput)
          .or_insert_with(Vec::new)
          .push(ix as u16);
      }
    }

    Table { rows }
  }

  pub(super) fn candidates(&self, nonterm: NontermId, lookahead: Lookahead) -> &[u16] {
    self.rows[nonterm.0 as usize]
      .get(&lookahead)
      .map(|candidates| &candidates[..])
      .unwrap_or(&[])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::Grammar;
  use pretty_assertions::assert_eq;

  #[test]
  fn deterministic_dispatch() {
    let grammar = Grammar::new(
      "E",
      &["plus", "id"],
      &["E", "E'", "T"],
      &[
        ("E", vec![vec!["T", "E'"]]),
        ("E'", vec![vec!["plus", "T", "E'"], vec![]]),
        ("T", vec![vec!["id"]]),
      ],
    ).unwrap();
    let table = Table::build(&grammar.cfg, &grammar.analysis);

    let e1 = grammar.cfg.nonterm_ids["E'"];
    let plus = grammar.cfg.term_ids["plus"];
    let id = grammar.cfg.term_ids["id"];

    // E' expands to `plus T E'` on plus and to ε at end of input
    assert_eq!(table.candidates(e1, Lookahead::Term(plus)), &[0]);
    assert_eq!(table.candidates(e1, Lookahead::EndOfInput), &[1]);
    assert_eq!(table.candidates(e1, Lookahead::Term(id)), &[] as &[u16]);
  }
}
