//! rustipeg: an embedded Parsing Expression Grammar engine
//!
//! Grammars are built directly in host code as trees of parsing
//! expressions, composed with `>>` (sequence), `|` (ordered choice) and
//! named combinators, and bound to named [`Rule`]s that may refer to each
//! other recursively. The engine interprets the tree by recursive descent
//! over a buffered, backtrackable input stream.
//!
//! Semantic work is attached to grammar fragments as deferred actions that
//! run only when the surrounding parse is committed with
//! [`accept`](Parser::accept); speculative alternatives that fail drop
//! their actions on rollback, and lookahead never schedules anything.
//! Actions and inline predicates exchange values through an
//! index-addressed slot store whose base follows the rule currently being
//! parsed.
//!
//! ```
//! use rustipeg::{ccl, InputStream, Parser, Rule};
//!
//! let ws: Rule<i64> = Rule::new();
//! ws.assign(ccl(" \t\r\n").star());
//!
//! let number: Rule<i64> = Rule::named("NUMBER");
//! number.assign(
//!     (ccl("0-9").plus().capture() >> &ws)
//!         .action(|c| c[0] = c.text().parse().unwrap_or(0)),
//! );
//!
//! let sum: Rule<i64> = Rule::new();
//! sum.assign(&number >> ('+' >> &number).action(|c| c[0] = c[0] + c[2]).star());
//!
//! let mut parser = Parser::new(&sum, InputStream::from_str("1+2+3"));
//! assert!(parser.parse());
//! parser.accept();
//! assert_eq!(*parser.val(0), 6);
//! ```

pub mod charclass;
pub mod expr;
pub mod grammar_analysis;
pub mod input_stream;
pub mod matcher;
pub mod parser;
pub mod rule;
pub mod value;

pub use charclass::{CharClass, RangeSet};
pub use expr::{act, any, ccl, chr, lit, look, not, pred, Expr};
pub use input_stream::InputStream;
pub use parser::Parser;
pub use rule::Rule;
pub use value::{Scope, SlotTable, Variant};
