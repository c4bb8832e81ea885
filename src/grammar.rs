use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use crate::analysis::{self, Analysis};
use crate::bitset::BitSet;
use crate::cfg::{Cfg, Symbol};

/// Rendering of the empty sequence; reserved, not usable as a terminal.
pub const EPSILON: &str = "ε";
/// End-of-input marker; reserved, not usable as a terminal.
pub const END_OF_INPUT: &str = "$";
/// Left hand side of the internal augmented start production.
pub(crate) const AUGMENTED_START: &str = "S'";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
  #[error("start symbol '{0}' is not a declared nonterminal")]
  StartNotNonterminal(String),
  #[error("'{0}' is reserved and cannot be used as a terminal")]
  ReservedTerminal(String),
  #[error("'{0}' is reserved and cannot be used as a nonterminal")]
  ReservedNonterminal(String),
  #[error("'{0}' is declared as both a terminal and a nonterminal")]
  NotDisjoint(String),
  #[error("production left hand side '{0}' is not a declared nonterminal")]
  UnknownLeftHandSide(String),
  #[error("'{1}' in a production of '{0}' is not a declared symbol")]
  UnknownSymbol(String, String),
}

/// FIRST1 of a nonterminal or a sequence: the terminals that can begin a
/// derivation, plus ε when the whole thing can derive the empty word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct First1 {
  pub terminals: Vec<String>,
  pub epsilon: bool,
}

/// FOLLOW1 of a nonterminal: the terminals that can appear immediately
/// after it in a derivation from the start symbol, plus end-of-input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follow1 {
  pub terminals: Vec<String>,
  pub end_of_input: bool,
}

/// A pair of alternatives of `nonterminal` whose effective lookahead sets
/// overlap, making the grammar unparsable with one symbol of lookahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Conflict {
  pub nonterminal: String,
  pub left: Vec<String>,
  pub right: Vec<String>,
}

/// A reduced context-free grammar with its cached analysis results.
///
/// Construction validates the symbol sets, removes unproductive and
/// unreachable nonterminals, and computes nullability, FIRST1, FOLLOW1
/// and the LL(1) conflict list.
#[derive(Debug)]
pub struct Grammar {
  pub(crate) cfg: Cfg,
  pub(crate) analysis: Analysis,
}

impl Grammar {
  /// Productions map each left hand side to its alternative right hand
  /// sides; an empty right hand side is ε.
  pub fn new(
    start: &str,
    terminals: &[&str],
    nonterminals: &[&str],
    productions: &[(&str, Vec<Vec<&str>>)],
  ) -> Result<Grammar, GrammarError> {
    let term_set: HashSet<&str> = terminals.iter().copied().collect();
    let nonterm_set: HashSet<&str> = nonterminals.iter().copied().collect();

    for &reserved in &[EPSILON, END_OF_INPUT] {
      if term_set.contains(reserved) {
        return Err(GrammarError::ReservedTerminal(reserved.to_owned()));
      }
    }
    if nonterm_set.contains(AUGMENTED_START) {
      return Err(GrammarError::ReservedNonterminal(AUGMENTED_START.to_owned()));
    }
    if let Some(&dup) = terminals.iter().find(|name| nonterm_set.contains(*name)) {
      return Err(GrammarError::NotDisjoint(dup.to_owned()));
    }
    if !nonterm_set.contains(start) {
      return Err(GrammarError::StartNotNonterminal(start.to_owned()));
    }
    for (lhs, alts) in productions {
      if !nonterm_set.contains(lhs) {
        return Err(GrammarError::UnknownLeftHandSide((*lhs).to_owned()));
      }
      for alt in alts {
        for &sym in alt {
          if !term_set.contains(sym) && !nonterm_set.contains(sym) {
            return Err(GrammarError::UnknownSymbol(
              (*lhs).to_owned(),
              sym.to_owned(),
            ));
          }
        }
      }
    }

    let cfg = analysis::reduce(&Cfg::build(start, terminals, nonterminals, productions));
    let analysis = analysis::analyze(&cfg);
    Ok(Grammar { cfg, analysis })
  }

  pub fn start_symbol(&self) -> &str {
    self.cfg.nonterm_name(self.cfg.start)
  }

  pub fn terminals(&self) -> impl Iterator<Item = &str> {
    self.cfg.terms.iter().map(|name| name.as_str())
  }

  /// Nonterminals surviving reduction.
  pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
    self.cfg.nonterms.iter().map(|nonterm| nonterm.name.as_str())
  }

  /// Flattened (left hand side, right hand side) pairs of the reduced
  /// grammar.
  pub fn productions(&self) -> Vec<(&str, Vec<&str>)> {
    self.cfg.prods()
      .map(|(lhs, _, rhs)| {
        let rhs = rhs.iter().map(|&sym| self.cfg.symbol_name(sym)).collect();
        (self.cfg.nonterm_name(lhs), rhs)
      })
      .collect()
  }

  pub fn is_ll1(&self) -> bool {
    self.analysis.conflicts.is_empty()
  }

  pub fn conflicts(&self) -> Vec<Ll1Conflict> {
    self.analysis.conflicts.iter()
      .map(|conflict| {
        let alts = self.cfg.alts(conflict.nonterm);
        Ll1Conflict {
          nonterminal: self.cfg.nonterm_name(conflict.nonterm).to_owned(),
          left: self.sequence_names(&alts[conflict.left]),
          right: self.sequence_names(&alts[conflict.right]),
        }
      })
      .collect()
  }

  /// `None` for symbols not declared (or removed by reduction);
  /// terminals are never nullable.
  pub fn is_nullable(&self, symbol: &str) -> Option<bool> {
    if self.cfg.term_ids.contains_key(symbol) {
      return Some(false);
    }
    let &id = self.cfg.nonterm_ids.get(symbol)?;
    Some(self.analysis.nullable[id.0 as usize])
  }

  pub fn first1_of(&self, nonterminal: &str) -> Option<First1> {
    let &id = self.cfg.nonterm_ids.get(nonterminal)?;
    Some(First1 {
      terminals: self.term_names(&self.analysis.eps_free_first[id.0 as usize]),
      epsilon: self.analysis.nullable[id.0 as usize],
    })
  }

  pub fn follow1_of(&self, nonterminal: &str) -> Option<Follow1> {
    let &id = self.cfg.nonterm_ids.get(nonterminal)?;
    let follow = &self.analysis.follow[id.0 as usize];
    Some(Follow1 {
      terminals: self.term_names(&follow.terms),
      end_of_input: follow.eof,
    })
  }

  /// FIRST1 of an arbitrary sequence of declared symbols; ε is included
  /// exactly when the whole sequence is nullable. `None` if a symbol is
  /// not declared.
  pub fn first1(&self, sequence: &[&str]) -> Option<First1> {
    let mut symbols = Vec::with_capacity(sequence.len());
    for &name in sequence {
      let sym = match self.cfg.term_ids.get(name) {
        Some(&id) => Symbol::Term(id),
        None => Symbol::Nonterm(*self.cfg.nonterm_ids.get(name)?),
      };
      symbols.push(sym);
    }

    let mut terms = BitSet::new(self.cfg.terms.len());
    let mut epsilon = true;
    for sym in symbols {
      match sym {
        Symbol::Term(id) => {
          terms.insert(id.0 as usize);
          epsilon = false;
          break;
        }
        Symbol::Nonterm(id) => {
          terms.union_with(&self.analysis.eps_free_first[id.0 as usize]);
          if !self.analysis.nullable[id.0 as usize] {
            epsilon = false;
            break;
          }
        }
      }
    }

    Some(First1 {
      terminals: self.term_names(&terms),
      epsilon,
    })
  }

  fn term_names(&self, set: &BitSet) -> Vec<String> {
    set.iter().map(|t| self.cfg.terms[t].clone()).collect()
  }

  fn sequence_names(&self, sequence: &[Symbol]) -> Vec<String> {
    sequence.iter()
      .map(|&sym| self.cfg.symbol_name(sym).to_owned())
      .collect()
  }
}

impl Display for Grammar {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    writeln!(f, "start symbol: {}", self.start_symbol())?;
    writeln!(f, "terminals: {}", self.cfg.terms.join(" "))?;
    writeln!(
      f,
      "nonterminals: {}",
      self.nonterminals().collect::<Vec<_>>().join(" "),
    )?;

    for nonterm in &self.cfg.nonterms {
      if nonterm.alts.is_empty() {
        continue;
      }
      let alts: Vec<String> = nonterm.alts.iter()
        .map(|alt| render_sequence(&self.sequence_names(alt)))
        .collect();
      writeln!(f, "{} → {}", nonterm.name, alts.join(" | "))?;
    }

    for name in self.nonterminals() {
      writeln!(
        f,
        "nullable({}) = {}",
        name,
        self.is_nullable(name).unwrap_or(false),
      )?;
    }
    for name in self.nonterminals() {
      if let Some(first) = self.first1_of(name) {
        writeln!(f, "first1({}) = {}", name, render_first(&first))?;
      }
    }
    for name in self.nonterminals() {
      if let Some(follow) = self.follow1_of(name) {
        writeln!(f, "follow1({}) = {}", name, render_follow(&follow))?;
      }
    }

    write!(f, "LL(1): {}", self.is_ll1())
  }
}

fn render_sequence(names: &[String]) -> String {
  if names.is_empty() {
    EPSILON.to_owned()
  } else {
    names.join(" ")
  }
}

fn render_first(first: &First1) -> String {
  let mut entries = first.terminals.clone();
  if first.epsilon {
    entries.push(EPSILON.to_owned());
  }
  format!("{{{}}}", entries.join(", "))
}

fn render_follow(follow: &Follow1) -> String {
  let mut entries = follow.terminals.clone();
  if follow.end_of_input {
    entries.push(END_OF_INPUT.to_owned());
  }
  format!("{{{}}}", entries.join(", "))
}
