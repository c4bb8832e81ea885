use thiserror::Error;

use crate::cfg::{Cfg, NontermId};
use crate::grammar::Grammar;

mod item;
mod table;

use item::{Item, Marked, Rhs};
use table::{Lookahead, Table};

/// Predictive parser for an LL(1) grammar. Borrows the grammar and never
/// mutates it; the stack and lookahead live only for one `parse` call.
pub struct Parser<'g> {
  grammar: &'g Grammar,
  table: Table,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
  #[error("grammar is not LL(1): {0} conflicting alternative pair(s)")]
  NotLl1(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
  /// The token source produced a symbol outside the terminal alphabet.
  #[error("unknown token: {0}")]
  UnknownToken(String),
  /// Invariant violation: the LL(1) check admitted a grammar whose table
  /// holds competing alternatives for one key.
  #[error("lookahead table is ambiguous for {nonterminal} on {lookahead}")]
  AmbiguousTable {
    nonterminal: String,
    lookahead: String,
  },
}

/// Outcome of driving a token source to acceptance or rejection.
/// Rejection is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
  Accepted,
  Rejected(String),
}

impl ParseOutcome {
  pub fn is_accepted(&self) -> bool {
    matches!(self, ParseOutcome::Accepted)
  }
}

/// Optional callbacks threaded through a parse.
#[derive(Default)]
pub struct Hooks<'h> {
  /// invoked with (lhs, rhs) for every completed production, innermost
  /// first
  pub on_reduce: Option<&'h mut dyn FnMut(&str, &[&str])>,
  /// receives rejection messages
  pub diagnostics: Option<&'h mut dyn FnMut(&str)>,
  /// receives the stack and lookahead at every loop iteration
  pub trace: Option<&'h mut dyn FnMut(&str)>,
}

/// Exactly one action applies to every stack/lookahead configuration;
/// `Stuck` is a final classification, not an unhandled case.
enum Action<'g> {
  Accept,
  Expand(Item<'g>, NontermId),
  Shift,
  Reduce,
  Stuck(Item<'g>),
}

impl<'g> Parser<'g> {
  pub fn new(grammar: &'g Grammar) -> Result<Self, ParserError> {
    let conflicts = grammar.analysis.conflicts.len();
    if conflicts > 0 {
      return Err(ParserError::NotLl1(conflicts));
    }

    let table = Table::build(&grammar.cfg, &grammar.analysis);
    Ok(Parser { grammar, table })
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  pub fn parse<I>(&self, tokens: I) -> Result<ParseOutcome, ParseError>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    self.parse_with(tokens, Hooks::default())
  }

  pub fn parse_with<I>(
    &self,
    tokens: I,
    mut hooks: Hooks<'_>,
  ) -> Result<ParseOutcome, ParseError>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    let cfg = &self.grammar.cfg;
    let mut tokens = tokens.into_iter();
    let mut stack = vec![Item::augmented(cfg.start)];
    let mut lookahead = self.pull(&mut tokens)?;

    loop {
      if let Some(trace) = hooks.trace.as_mut() {
        trace(&render_state(cfg, &stack, lookahead));
      }

      match classify(&stack, lookahead) {
        Action::Accept => return Ok(ParseOutcome::Accepted),

        Action::Expand(top, nonterm) => {
          match self.table.candidates(nonterm, lookahead) {
            &[ix] => {
              let alt = &cfg.alts(nonterm)[ix as usize];
              stack.push(Item::expansion(nonterm, alt));
            }
            &[] => {
              let message = format!(
                "cannot expand {} for lookahead {}",
                top.render(cfg),
                render_lookahead(cfg, lookahead),
              );
              return Ok(reject(message, &mut hooks));
            }
            _ => {
              return Err(ParseError::AmbiguousTable {
                nonterminal: cfg.nonterm_name(nonterm).to_owned(),
                lookahead: render_lookahead(cfg, lookahead),
              });
            }
          }
        }

        Action::Shift => {
          if let Some(top) = stack.last_mut() {
            *top = top.advanced();
          }
          lookahead = self.pull(&mut tokens)?;
        }

        Action::Reduce => {
          if let Some(completed) = stack.pop() {
            if let Some(on_reduce) = hooks.on_reduce.as_mut() {
              if let (Some(lhs), Rhs::Alt(rhs)) = (completed.lhs, completed.rhs) {
                let names: Vec<&str> =
                  rhs.iter().map(|&sym| cfg.symbol_name(sym)).collect();
                on_reduce(cfg.nonterm_name(lhs), &names);
              }
            }
          }
          if let Some(top) = stack.last_mut() {
            *top = top.advanced();
          }
        }

        Action::Stuck(top) => {
          let message = format!(
            "{} could neither be expanded, shifted nor reduced for lookahead {}",
            top.render(cfg),
            render_lookahead(cfg, lookahead),
          );
          return Ok(reject(message, &mut hooks));
        }
      }
    }
  }

  /// An exhausted token source reads as end of input; a symbol outside
  /// the terminal alphabet is an error, never a silent end of input.
  fn pull<I>(&self, tokens: &mut I) -> Result<Lookahead, ParseError>
  where
    I: Iterator,
    I::Item: AsRef<str>,
  {
    match tokens.next() {
      None => Ok(Lookahead::EndOfInput),
      Some(token) => {
        let name = token.as_ref();
        match self.grammar.cfg.term_ids.get(name) {
          Some(&id) => Ok(Lookahead::Term(id)),
          None => Err(ParseError::UnknownToken(name.to_owned())),
        }
      }
    }
  }
}

fn classify<'g>(stack: &[Item<'g>], lookahead: Lookahead) -> Action<'g> {
  if let &[item] = stack {
    if item.lhs.is_none() && item.marker == 1 && lookahead == Lookahead::EndOfInput {
      return Action::Accept;
    }
  }

  // the stack never empties before acceptance
  let top = *stack.last().unwrap();

  match top.marked() {
    Some(Marked::Nonterm(nonterm)) => Action::Expand(top, nonterm),
    Some(Marked::Term(term)) if lookahead == Lookahead::Term(term) => Action::Shift,
    Some(_) => Action::Stuck(top),
    None => {
      if let (&[.., below, _], Some(lhs)) = (stack, top.lhs) {
        if below.marked() == Some(Marked::Nonterm(lhs)) {
          return Action::Reduce;
        }
      }
      Action::Stuck(top)
    }
  }
}

fn reject(message: String, hooks: &mut Hooks<'_>) -> ParseOutcome {
  if let Some(diagnostics) = hooks.diagnostics.as_mut() {
    diagnostics(&message);
  }
  ParseOutcome::Rejected(message)
}

fn render_lookahead(cfg: &Cfg, lookahead: Lookahead) -> String {
  match lookahead {
    Lookahead::Term(id) => format!("'{}'", cfg.term_name(id)),
    Lookahead::EndOfInput => "'EOF'".to_owned(),
  }
}

fn render_state(cfg: &Cfg, stack: &[Item<'_>], lookahead: Lookahead) -> String {
  let items: Vec<String> = stack.iter().map(|item| item.render(cfg)).collect();
  format!("{} {}", items.join(" "), render_lookahead(cfg, lookahead))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  /// a+ as an LL(1) grammar
  fn repetition() -> Grammar {
    Grammar::new(
      "S",
      &["a", "b"],
      &["S", "R"],
      &[
        ("S", vec![vec!["a", "R"]]),
        ("R", vec![vec!["a", "R"], vec![]]),
      ],
    ).unwrap()
  }

  fn expression() -> Grammar {
    Grammar::new(
      "E",
      &["plus", "id"],
      &["E", "E1", "T"],
      &[
        ("E", vec![vec!["T", "E1"]]),
        ("E1", vec![vec!["plus", "T", "E1"], vec![]]),
        ("T", vec![vec!["id"]]),
      ],
    ).unwrap()
  }

  #[test]
  fn non_ll1_grammar_is_refused() {
    let grammar = Grammar::new(
      "S",
      &["a"],
      &["S"],
      &[("S", vec![vec!["a", "S"], vec!["a"]])],
    ).unwrap();

    assert!(!grammar.is_ll1());
    assert_eq!(Parser::new(&grammar).err(), Some(ParserError::NotLl1(1)));
  }

  #[test]
  fn accepts_repetitions() {
    let grammar = repetition();
    let parser = Parser::new(&grammar).unwrap();

    assert_eq!(parser.parse(vec!["a"]).unwrap(), ParseOutcome::Accepted);
    assert_eq!(
      parser.parse(vec!["a", "a", "a"]).unwrap(),
      ParseOutcome::Accepted,
    );
  }

  #[test]
  fn rejects_empty_input() {
    let grammar = repetition();
    let parser = Parser::new(&grammar).unwrap();

    let outcome = parser.parse(Vec::<&str>::new()).unwrap();
    match outcome {
      ParseOutcome::Rejected(message) => {
        assert!(message.contains("cannot expand"));
        assert!(message.contains("'EOF'"));
      }
      ParseOutcome::Accepted => panic!("empty input was accepted"),
    }
  }

  #[test]
  fn rejects_undigestible_terminal() {
    let grammar = repetition();
    let parser = Parser::new(&grammar).unwrap();

    // b is a declared terminal no production can consume
    let outcome = parser.parse(vec!["a", "b"]).unwrap();
    assert!(!outcome.is_accepted());
  }

  #[test]
  fn rejects_premature_end() {
    let grammar = expression();
    let parser = Parser::new(&grammar).unwrap();

    let outcome = parser.parse(vec!["id", "plus"]).unwrap();
    match outcome {
      ParseOutcome::Rejected(message) => assert!(message.contains("'EOF'")),
      ParseOutcome::Accepted => panic!("truncated input was accepted"),
    }
  }

  #[test]
  fn unknown_token_is_an_error_not_a_rejection() {
    let grammar = repetition();
    let parser = Parser::new(&grammar).unwrap();

    assert_eq!(
      parser.parse(vec!["a", "x"]).err(),
      Some(ParseError::UnknownToken("x".to_owned())),
    );
  }

  #[test]
  fn reduce_hook_sees_completed_productions() {
    let grammar = repetition();
    let parser = Parser::new(&grammar).unwrap();

    let mut reductions = Vec::new();
    let mut on_reduce = |lhs: &str, rhs: &[&str]| {
      reductions.push(format!("{} -> {}", lhs, rhs.join(" ")));
    };
    let outcome = parser
      .parse_with(vec!["a", "a"], Hooks {
        on_reduce: Some(&mut on_reduce),
        ..Hooks::default()
      })
      .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(
      reductions,
      vec![
        "R -> ".to_owned(),
        "R -> a R".to_owned(),
        "S -> a R".to_owned(),
      ],
    );
  }

  #[test]
  fn diagnostics_and_trace_sinks() {
    let grammar = expression();
    let parser = Parser::new(&grammar).unwrap();

    let mut messages = Vec::new();
    let mut steps = 0usize;
    let mut diagnostics = |message: &str| messages.push(message.to_owned());
    let mut trace = |_: &str| steps += 1;
    let outcome = parser
      .parse_with(vec!["id", "plus"], Hooks {
        diagnostics: Some(&mut diagnostics),
        trace: Some(&mut trace),
        ..Hooks::default()
      })
      .unwrap();

    assert!(!outcome.is_accepted());
    assert_eq!(messages.len(), 1);
    assert!(steps > 0);
    match outcome {
      ParseOutcome::Rejected(message) => assert_eq!(messages[0], message),
      ParseOutcome::Accepted => unreachable!(),
    }
  }

  #[test]
  fn nullable_start_accepts_empty_input() {
    let grammar = Grammar::new(
      "S",
      &["a"],
      &["S"],
      &[("S", vec![vec!["a"], vec![]])],
    ).unwrap();
    let parser = Parser::new(&grammar).unwrap();

    assert!(parser.parse(Vec::<&str>::new()).unwrap().is_accepted());
    assert!(parser.parse(vec!["a"]).unwrap().is_accepted());
    assert!(!parser.parse(vec!["a", "a"]).unwrap().is_accepted());
  }
}
