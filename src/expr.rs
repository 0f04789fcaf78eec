//! Parsing expressions and their composition
//!
//! A grammar is a tree of immutable expression nodes built directly in host
//! code: `>>` sequences, `|` chooses (PEG-ordered), and named combinators
//! cover repetition, lookahead, capture and attachment. Nodes are shared by
//! reference counting, so composition duplicates edges, never sub-trees.
//! Every node knows how many value slots its sub-tree occupies; sequences
//! use that width to give each child a non-colliding slot range.

use crate::charclass::CharClass;
use crate::matcher::{ActionFn, Matcher, PredFn};
use crate::rule::{self, Rule, RuleCore};
use crate::value::Scope;
use std::ops::{BitOr, Bound, RangeBounds, Shr};
use std::rc::{Rc, Weak};

/// A parsing expression. Cheap to clone (one reference-counted edge).
pub struct Expr<V = ()> {
    node: Rc<Node<V>>,
}

struct Node<V> {
    /// Value-stack slots this sub-tree occupies within its parent sequence.
    width: usize,
    kind: Kind<V>,
}

enum Kind<V> {
    /// Verbatim byte string
    Literal(Vec<u8>),
    /// One exact code point
    Char(char),
    /// One code point in a class
    Class(CharClass),
    /// Any one code point
    Any,
    /// Zero-width test; `negate` flips the outcome
    Lookahead { expr: Expr<V>, negate: bool },
    /// Always succeeds, schedules the callable
    Action(ActionFn<V>),
    /// Runs inline; the result decides the match
    Predicate(PredFn<V>),
    Seq(Expr<V>, Expr<V>),
    /// Like `Seq`, but the right side does not widen the left
    Attach(Expr<V>, Expr<V>),
    Alt(Expr<V>, Expr<V>),
    /// `max` of `None` means unbounded
    Repeat {
        expr: Expr<V>,
        min: u32,
        max: Option<u32>,
    },
    Capture(Expr<V>),
    /// Late-bound reference to a named rule; always one slot wide
    RuleRef(Weak<RuleCore<V>>),
}

impl<V> Clone for Expr<V> {
    fn clone(&self) -> Self {
        Expr {
            node: Rc::clone(&self.node),
        }
    }
}

impl<V> Expr<V> {
    fn make(width: usize, kind: Kind<V>) -> Self {
        Expr {
            node: Rc::new(Node { width, kind }),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.node.width
    }

    fn seq(left: Expr<V>, right: Expr<V>) -> Self {
        let width = left.width() + right.width();
        Expr::make(width, Kind::Seq(left, right))
    }

    fn alt(left: Expr<V>, right: Expr<V>) -> Self {
        let width = left.width().max(right.width());
        Expr::make(width, Kind::Alt(left, right))
    }

    /// Attach `other` behind this expression: it must match for the whole
    /// to match, but contributes no slots. This is how actions and
    /// predicates ride along with the unit they describe.
    pub fn attach(&self, other: impl Into<Expr<V>>) -> Expr<V> {
        let right = other.into();
        Expr::make(self.width(), Kind::Attach(self.clone(), right))
    }

    /// Attach a deferred action, scheduled when this expression matches.
    pub fn action(&self, func: impl Fn(&mut Scope<V>) + 'static) -> Expr<V>
    where
        V: 'static,
    {
        self.attach(act(func))
    }

    /// Attach an inline predicate that must approve the match.
    pub fn verify(&self, func: impl Fn(&mut Scope<V>) -> bool + 'static) -> Expr<V>
    where
        V: 'static,
    {
        self.attach(pred(func))
    }

    /// Greedy zero-or-more. Always succeeds.
    pub fn star(&self) -> Expr<V> {
        self.repeat(0..)
    }

    /// Greedy one-or-more.
    pub fn plus(&self) -> Expr<V> {
        self.repeat(1..)
    }

    /// Optional. Always succeeds.
    pub fn opt(&self) -> Expr<V> {
        self.repeat(0..=1)
    }

    /// Match between `min` and `max` times (greedy), e.g. `repeat(2..)`
    /// or `repeat(1..=3)`.
    pub fn repeat(&self, bounds: impl RangeBounds<u32>) -> Expr<V> {
        let min = match bounds.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n + 1,
            Bound::Unbounded => 0,
        };
        let max = match bounds.end_bound() {
            Bound::Included(&n) => Some(n),
            Bound::Excluded(&n) => Some(n.saturating_sub(1)),
            Bound::Unbounded => None,
        };
        Expr::make(
            self.width(),
            Kind::Repeat {
                expr: self.clone(),
                min,
                max,
            },
        )
    }

    /// Match exactly `n` times.
    pub fn times(&self, n: u32) -> Expr<V> {
        self.repeat(n..=n)
    }

    /// On success, publish the matched byte window as the last captured
    /// text.
    pub fn capture(&self) -> Expr<V> {
        Expr::make(self.width(), Kind::Capture(self.clone()))
    }

    pub(crate) fn rule_ref(core: &Rc<RuleCore<V>>) -> Expr<V> {
        Expr::make(1, Kind::RuleRef(Rc::downgrade(core)))
    }
}

impl<V: Default> Expr<V> {
    /// Match this expression against the matcher. On failure the matcher's
    /// position, action queue and capture window are exactly as before the
    /// call.
    pub(crate) fn parse(&self, m: &mut Matcher<V>) -> bool {
        match &self.node.kind {
            Kind::Literal(bytes) => m.match_literal(bytes),
            Kind::Char(ch) => m.match_char(*ch),
            Kind::Class(class) => m.match_class(class),
            Kind::Any => m.match_any(),

            Kind::Lookahead { expr, negate } => {
                let mark = m.set_mark();
                m.enter_lookahead();
                let matched = expr.parse(m);
                m.leave_lookahead();
                m.go_mark(&mark);
                matched != *negate
            }

            Kind::Action(func) => {
                m.schedule(func);
                true
            }

            Kind::Predicate(func) => m.test(func),

            Kind::Seq(left, right) => {
                let mark = m.set_mark();
                let level = m.level();
                if !left.parse(m) {
                    return false;
                }
                m.set_level(level + left.width());
                let ok = right.parse(m);
                m.set_level(level);
                if !ok {
                    m.go_mark(&mark);
                }
                ok
            }

            Kind::Attach(left, right) => {
                let mark = m.set_mark();
                let level = m.level();
                if !left.parse(m) {
                    return false;
                }
                m.set_level(level + self.node.width);
                let ok = right.parse(m);
                m.set_level(level);
                if !ok {
                    m.go_mark(&mark);
                }
                ok
            }

            // Each arm restores on its own failure, so the choice itself
            // needs no mark
            Kind::Alt(left, right) => left.parse(m) || right.parse(m),

            Kind::Repeat { expr, min, max } => {
                let mark = m.set_mark();
                let mut count: u32 = 0;
                while count < *min {
                    if !expr.parse(m) {
                        if count > 0 {
                            m.go_mark(&mark);
                        }
                        return false;
                    }
                    count += 1;
                }
                loop {
                    if let Some(max) = max {
                        if count >= *max {
                            break;
                        }
                    }
                    if !expr.parse(m) {
                        break;
                    }
                    count += 1;
                }
                true
            }

            Kind::Capture(expr) => {
                let begin = m.begin_capture();
                let ok = expr.parse(m);
                if ok {
                    m.end_capture(begin);
                }
                ok
            }

            Kind::RuleRef(weak) => rule::parse_ref(weak, m),
        }
    }
}

impl<V> Expr<V> {
    /// Walk one level of the tree; used by the static grammar check.
    pub(crate) fn visit(&self) -> ExprView<'_, V> {
        match &self.node.kind {
            Kind::Literal(bytes) => ExprView::Terminal {
                min_len: bytes.len(),
            },
            Kind::Char(_) | Kind::Class(_) | Kind::Any => ExprView::Terminal { min_len: 1 },
            Kind::Action(_) | Kind::Predicate(_) => ExprView::Terminal { min_len: 0 },
            Kind::Lookahead { expr, .. } => ExprView::Lookahead(expr),
            Kind::Seq(left, right) | Kind::Attach(left, right) => ExprView::Seq(left, right),
            Kind::Alt(left, right) => ExprView::Alt(left, right),
            Kind::Repeat { expr, min, .. } => ExprView::Repeat(expr, *min),
            Kind::Capture(expr) => ExprView::Child(expr),
            Kind::RuleRef(weak) => ExprView::RuleRef(weak),
        }
    }
}

/// Structural view of one expression node, for analysis passes.
pub(crate) enum ExprView<'a, V> {
    Terminal { min_len: usize },
    Lookahead(&'a Expr<V>),
    Child(&'a Expr<V>),
    Seq(&'a Expr<V>, &'a Expr<V>),
    Alt(&'a Expr<V>, &'a Expr<V>),
    Repeat(&'a Expr<V>, u32),
    RuleRef(&'a Weak<RuleCore<V>>),
}

// --- leaf constructors ---

/// Verbatim byte-string literal.
pub fn lit<V>(text: &str) -> Expr<V> {
    Expr::make(1, Kind::Literal(text.as_bytes().to_vec()))
}

/// One exact code point.
pub fn chr<V>(ch: char) -> Expr<V> {
    Expr::make(1, Kind::Char(ch))
}

/// One code point from a class, given in the `[^]a-b` mini-syntax.
pub fn ccl<V>(pattern: &str) -> Expr<V> {
    Expr::make(1, Kind::Class(CharClass::parse(pattern)))
}

/// Any one code point. Fails only at end of input.
pub fn any<V>() -> Expr<V> {
    Expr::make(1, Kind::Any)
}

/// A deferred action: always matches, schedules `func` for replay on
/// `accept`.
pub fn act<V: 'static>(func: impl Fn(&mut Scope<V>) + 'static) -> Expr<V> {
    Expr::make(1, Kind::Action(Rc::new(func)))
}

/// An inline predicate: `func` runs during parsing and its result is the
/// match outcome.
pub fn pred<V: 'static>(func: impl Fn(&mut Scope<V>) -> bool + 'static) -> Expr<V> {
    Expr::make(1, Kind::Predicate(Rc::new(func)))
}

/// Positive lookahead: succeeds iff `expr` would match here. Consumes
/// nothing and schedules nothing.
pub fn look<V>(expr: impl Into<Expr<V>>) -> Expr<V> {
    let expr = expr.into();
    let width = expr.width();
    Expr::make(
        width,
        Kind::Lookahead {
            expr,
            negate: false,
        },
    )
}

/// Negative lookahead: succeeds iff `expr` would fail here. `not(any())`
/// matches exactly at end of input.
pub fn not<V>(expr: impl Into<Expr<V>>) -> Expr<V> {
    let expr = expr.into();
    let width = expr.width();
    Expr::make(width, Kind::Lookahead { expr, negate: true })
}

// --- conversions ---

impl<V> From<&Expr<V>> for Expr<V> {
    fn from(expr: &Expr<V>) -> Self {
        expr.clone()
    }
}

impl<V> From<&str> for Expr<V> {
    fn from(text: &str) -> Self {
        lit(text)
    }
}

impl<V> From<String> for Expr<V> {
    fn from(text: String) -> Self {
        lit(&text)
    }
}

impl<V> From<char> for Expr<V> {
    fn from(ch: char) -> Self {
        chr(ch)
    }
}

impl<V> From<CharClass> for Expr<V> {
    fn from(class: CharClass) -> Self {
        Expr::make(1, Kind::Class(class))
    }
}

impl<V> From<&Rule<V>> for Expr<V> {
    fn from(rule: &Rule<V>) -> Self {
        Expr::rule_ref(rule.core())
    }
}

// --- operator composition ---

impl<V, R: Into<Expr<V>>> Shr<R> for Expr<V> {
    type Output = Expr<V>;

    fn shr(self, rhs: R) -> Expr<V> {
        Expr::seq(self, rhs.into())
    }
}

impl<V, R: Into<Expr<V>>> BitOr<R> for Expr<V> {
    type Output = Expr<V>;

    fn bitor(self, rhs: R) -> Expr<V> {
        Expr::alt(self, rhs.into())
    }
}

impl<V, R: Into<Expr<V>>> Shr<R> for &Expr<V> {
    type Output = Expr<V>;

    fn shr(self, rhs: R) -> Expr<V> {
        Expr::seq(self.clone(), rhs.into())
    }
}

impl<V, R: Into<Expr<V>>> BitOr<R> for &Expr<V> {
    type Output = Expr<V>;

    fn bitor(self, rhs: R) -> Expr<V> {
        Expr::alt(self.clone(), rhs.into())
    }
}

impl<V, R: Into<Expr<V>>> Shr<R> for &Rule<V> {
    type Output = Expr<V>;

    fn shr(self, rhs: R) -> Expr<V> {
        Expr::seq(Expr::from(self), rhs.into())
    }
}

impl<V, R: Into<Expr<V>>> BitOr<R> for &Rule<V> {
    type Output = Expr<V>;

    fn bitor(self, rhs: R) -> Expr<V> {
        Expr::alt(Expr::from(self), rhs.into())
    }
}

impl<V> Shr<Expr<V>> for &str {
    type Output = Expr<V>;

    fn shr(self, rhs: Expr<V>) -> Expr<V> {
        Expr::seq(lit(self), rhs)
    }
}

impl<V> BitOr<Expr<V>> for &str {
    type Output = Expr<V>;

    fn bitor(self, rhs: Expr<V>) -> Expr<V> {
        Expr::alt(lit(self), rhs)
    }
}

impl<'r, V> Shr<&'r Rule<V>> for &str {
    type Output = Expr<V>;

    fn shr(self, rhs: &'r Rule<V>) -> Expr<V> {
        Expr::seq(lit(self), Expr::from(rhs))
    }
}

impl<'r, V> BitOr<&'r Rule<V>> for &str {
    type Output = Expr<V>;

    fn bitor(self, rhs: &'r Rule<V>) -> Expr<V> {
        Expr::alt(lit(self), Expr::from(rhs))
    }
}

impl<V> Shr<Expr<V>> for char {
    type Output = Expr<V>;

    fn shr(self, rhs: Expr<V>) -> Expr<V> {
        Expr::seq(chr(self), rhs)
    }
}

impl<V> BitOr<Expr<V>> for char {
    type Output = Expr<V>;

    fn bitor(self, rhs: Expr<V>) -> Expr<V> {
        Expr::alt(chr(self), rhs)
    }
}

impl<'r, V> Shr<&'r Rule<V>> for char {
    type Output = Expr<V>;

    fn shr(self, rhs: &'r Rule<V>) -> Expr<V> {
        Expr::seq(chr(self), Expr::from(rhs))
    }
}

impl<'r, V> BitOr<&'r Rule<V>> for char {
    type Output = Expr<V>;

    fn bitor(self, rhs: &'r Rule<V>) -> Expr<V> {
        Expr::alt(chr(self), Expr::from(rhs))
    }
}
