pub mod grammar;
pub mod parser;

mod analysis;
mod bitset;
mod cfg;
mod scc;

pub use grammar::{
  First1, Follow1, Grammar, GrammarError, Ll1Conflict, END_OF_INPUT, EPSILON,
};
pub use parser::{Hooks, ParseError, ParseOutcome, Parser, ParserError};

/// Builds a predictive parser for an LL(1) grammar.
pub fn build(grammar: &Grammar) -> Result<Parser<'_>, ParserError> {
  Parser::new(grammar)
}
