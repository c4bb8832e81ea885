use crate::cfg::{Cfg, NontermId, Symbol, TermId};
use crate::grammar::{AUGMENTED_START, END_OF_INPUT};

/// Right hand side of a stack item: either the implicit `start $` of the
/// augmented production or an alternative borrowed from the grammar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum Rhs<'g> {
  Augmented(NontermId),
  Alt(&'g [Symbol]),
}

/// A dotted production; the marker counts the symbols already matched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) struct Item<'g> {
  /// `None` is the augmented start symbol
  pub(super) lhs: Option<NontermId>,
  pub(super) rhs: Rhs<'g>,
  pub(super) marker: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum Marked {
  Term(TermId),
  Nonterm(NontermId),
  End,
}

impl<'g> Item<'g> {
  pub(super) fn augmented(start: NontermId) -> Self {
    Item {
      lhs: None,
      rhs: Rhs::Augmented(start),
      marker: 0,
    }
  }

  pub(super) fn expansion(lhs: NontermId, alt: &'g [Symbol]) -> Self {
    Item {
      lhs: Some(lhs),
      rhs: Rhs::Alt(alt),
      marker: 0,
    }
  }

  fn len(&self) -> usize {
    match self.rhs {
      Rhs::Augmented(_) => 2,
      Rhs::Alt(symbols) => symbols.len(),
    }
  }

  pub(super) fn is_complete(&self) -> bool {
    self.marker == self.len()
  }

  /// The symbol at the marker, or `None` if the item is complete.
  pub(super) fn marked(&self) -> Option<Marked> {
    match self.rhs {
      Rhs::Augmented(start) => match self.marker {
        0 => Some(Marked::Nonterm(start)),
        1 => Some(Marked::End),
        _ => None,
      },
      Rhs::Alt(symbols) => symbols.get(self.marker).map(|&sym| match sym {
        Symbol::Term(id) => Marked::Term(id),
        Symbol::Nonterm(id) => Marked::Nonterm(id),
      }),
    }
  }

  /// A copy of the item with the marker moved past one more symbol.
  pub(super) fn advanced(&self) -> Item<'g> {
    debug_assert!(!self.is_complete());
    Item {
      marker: self.marker + 1,
      ..*self
    }
  }

  pub(super) fn render(&self, cfg: &Cfg) -> String {
    let lhs = match self.lhs {
      Some(id) => cfg.nonterm_name(id),
      None => AUGMENTED_START,
    };
    let names: Vec<&str> = match self.rhs {
      Rhs::Augmented(start) => vec![cfg.nonterm_name(start), END_OF_INPUT],
      Rhs::Alt(symbols) => symbols.iter().map(|&sym| cfg.symbol_name(sym)).collect(),
    };
    format!(
      "[{} → {}·{}]",
      lhs,
      names[..self.marker].join(" "),
      names[self.marker..].join(" "),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn cfg() -> Cfg {
    Cfg::build(
      "S",
      &["a"],
      &["S"],
      &[("S", vec![vec!["a", "S"], vec![]])],
    )
  }

  #[test]
  fn augmented_item() {
    let cfg = cfg();
    let item = Item::augmented(cfg.start);

    assert_eq!(item.marked(), Some(Marked::Nonterm(cfg.start)));
    assert_eq!(item.advanced().marked(), Some(Marked::End));
    assert!(item.advanced().advanced().is_complete());
    assert_eq!(item.render(&cfg), "[S' → ·S $]");
  }

  #[test]
  fn expansion_item() {
    let cfg = cfg();
    let alt = &cfg.alts(cfg.start)[0];
    let item = Item::expansion(cfg.start, alt);

    assert!(!item.is_complete());
    assert_eq!(item.marked(), Some(Marked::Term(crate::cfg::TermId(0))));
    assert_eq!(item.advanced().render(&cfg), "[S → a·S]");
    assert!(item.advanced().advanced().is_complete());
  }

  #[test]
  fn empty_alternative_is_complete() {
    let cfg = cfg();
    let alt = &cfg.alts(cfg.start)[1];
    let item = Item::expansion(cfg.start, alt);

    assert!(item.is_complete());
    assert_eq!(item.marked(), None);
    assert_eq!(item.render(&cfg), "[S → ·]");
  }
}
