//! Parser facade
//!
//! Binds one start rule to one input stream and drives the run loop:
//!
//! ```
//! use rustipeg::{ccl, InputStream, Parser, Rule};
//!
//! let number: Rule<i64> = Rule::named("NUMBER");
//! number.assign(
//!     ccl("0-9")
//!         .plus()
//!         .capture()
//!         .action(|c| c[0] = c.text().parse().unwrap_or(0)),
//! );
//!
//! let mut parser = Parser::new(&number, InputStream::from_str("42"));
//! while parser.parse() {
//!     parser.accept();
//! }
//! assert_eq!(*parser.val(0), 42);
//! ```

use crate::input_stream::InputStream;
use crate::matcher::Matcher;
use crate::rule::{self, Rule, RuleCore};
use crate::value::{SlotTable, Variant};
use std::rc::Rc;

/// One parse session: a start rule, an input, and the value slots actions
/// write into.
pub struct Parser<V = ()> {
    start: Rc<RuleCore<V>>,
    matcher: Matcher<V>,
}

impl<V: Default> Parser<V> {
    /// Parser with dense (vector-backed) value slots. In debug builds the
    /// grammar reachable from `start` is checked for left recursion.
    pub fn new(start: &Rule<V>, input: InputStream) -> Self {
        Self::build(start, input, SlotTable::dense())
    }

    /// Parser with sparse (map-backed) value slots, for grammars that
    /// touch few of their slot indices.
    pub fn with_sparse_slots(start: &Rule<V>, input: InputStream) -> Self {
        Self::build(start, input, SlotTable::sparse())
    }

    fn build(start: &Rule<V>, input: InputStream, slots: SlotTable<V>) -> Self {
        #[cfg(debug_assertions)]
        crate::grammar_analysis::check_core(start.core());

        Parser {
            start: Rc::clone(start.core()),
            matcher: Matcher::new(input, slots),
        }
    }

    /// One top-level attempt at the start rule. Returns whether it
    /// matched; on failure nothing is consumed and pending actions are
    /// discarded by the rule's own rollback.
    pub fn parse(&mut self) -> bool {
        rule::parse_core(&self.start, &mut self.matcher)
    }

    /// Commit a successful parse: replay queued actions in scheduling
    /// order and consume the matched input prefix.
    pub fn accept(&mut self) {
        self.matcher.accept();
    }

    /// Discard pending actions and buffered input without replay.
    pub fn clear(&mut self) {
        self.matcher.clear();
    }

    /// The most recently captured text.
    pub fn text(&self) -> String {
        self.matcher.text()
    }

    /// Formatted diagnostic for the furthest failure: line number,
    /// expected rule labels, input context.
    pub fn get_error(&self) -> String {
        self.matcher.get_error()
    }

    /// Read value slot `idx`. Outside a parse the base is zero, so this
    /// addresses the start rule's slots: slot 0 is its result.
    pub fn val(&self, idx: usize) -> &V {
        self.matcher.slots().get(self.matcher.base() + idx)
    }

    pub fn val_mut(&mut self, idx: usize) -> &mut V {
        let idx = self.matcher.base() + idx;
        self.matcher.slots_mut().get_mut(idx)
    }

    /// Typed read of slot `idx` for sum-typed slot values. Panics with a
    /// kind mismatch if the slot holds a different variant.
    pub fn val_as<T>(&mut self, idx: usize) -> &mut T
    where
        V: Variant<T>,
    {
        let idx = self.matcher.base() + idx;
        self.matcher
            .slots_mut()
            .get_mut(idx)
            .as_value_mut()
            .unwrap_or_else(|| panic!("slot {} holds a different kind of value", idx))
    }
}
