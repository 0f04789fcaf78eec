//! Named, late-bound grammar rules
//!
//! A rule gives a name to an expression, allows forward and recursive
//! references, and anchors the value-slot base: on entry the current level
//! becomes the new base, so the rule body addresses its slots from zero.
//!
//! Expressions refer to rules through weak back-pointers, which breaks the
//! reference cycle rule -> root expression -> rule. The `Rule` itself must
//! outlive every parse that mentions it.

use crate::expr::Expr;
use crate::matcher::Matcher;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared state of one rule. Public only within the crate; hosts handle
/// [`Rule`]s.
pub struct RuleCore<V> {
    pub(crate) label: RefCell<Option<String>>,
    pub(crate) root: RefCell<Option<Expr<V>>>,
}

/// A named, possibly recursive grammar node. Construct it first, mention
/// it from other rules freely, and assign its body later:
///
/// ```
/// use rustipeg::{lit, Rule};
///
/// let item: Rule = Rule::new();
/// let list = Rule::new();
/// list.assign(&item >> (lit(",") >> &list).opt());
/// item.assign(lit("x"));
/// ```
///
/// Assigning a rule to itself (`r.assign(&r)`) is deliberately
/// left-recursive; the debug grammar check reports it.
pub struct Rule<V = ()> {
    core: Rc<RuleCore<V>>,
}

impl<V> Rule<V> {
    /// A fresh unnamed rule with no body.
    pub fn new() -> Self {
        Rule {
            core: Rc::new(RuleCore {
                label: RefCell::new(None),
                root: RefCell::new(None),
            }),
        }
    }

    /// A fresh labeled rule. The label feeds the expected-rule list in
    /// [`get_error`](crate::Parser::get_error) diagnostics.
    pub fn named(label: &str) -> Self {
        let rule = Rule::new();
        rule.set_name(label);
        rule
    }

    /// Set or replace the diagnostic label.
    pub fn set_name(&self, label: &str) {
        *self.core.label.borrow_mut() = Some(label.to_string());
    }

    pub fn name(&self) -> Option<String> {
        self.core.label.borrow().clone()
    }

    /// Assign the rule's body. Everything convertible to an expression
    /// works: expressions, other rules, string and char literals.
    pub fn assign(&self, root: impl Into<Expr<V>>) {
        *self.core.root.borrow_mut() = Some(root.into());
    }

    pub(crate) fn core(&self) -> &Rc<RuleCore<V>> {
        &self.core
    }

    /// This rule as an expression operand.
    pub fn expr(&self) -> Expr<V> {
        Expr::from(self)
    }

    /// See [`Expr::capture`].
    pub fn capture(&self) -> Expr<V> {
        self.expr().capture()
    }

    /// See [`Expr::star`].
    pub fn star(&self) -> Expr<V> {
        self.expr().star()
    }

    /// See [`Expr::plus`].
    pub fn plus(&self) -> Expr<V> {
        self.expr().plus()
    }

    /// See [`Expr::opt`].
    pub fn opt(&self) -> Expr<V> {
        self.expr().opt()
    }

    /// See [`Expr::action`].
    pub fn action(&self, func: impl Fn(&mut crate::value::Scope<V>) + 'static) -> Expr<V>
    where
        V: 'static,
    {
        self.expr().action(func)
    }

    /// See [`Expr::verify`].
    pub fn verify(&self, func: impl Fn(&mut crate::value::Scope<V>) -> bool + 'static) -> Expr<V>
    where
        V: 'static,
    {
        self.expr().verify(func)
    }
}

impl<V> Default for Rule<V> {
    fn default() -> Self {
        Rule::new()
    }
}

impl<V> RuleCore<V> {
    pub(crate) fn describe(&self) -> String {
        self.label
            .borrow()
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// Parse through a rule reference. Panics on the two structural errors:
/// a reference whose rule was dropped, and a rule used before a body was
/// assigned. These are programmer errors, not parse failures.
pub(crate) fn parse_ref<V: Default>(weak: &Weak<RuleCore<V>>, m: &mut Matcher<V>) -> bool {
    let core = weak
        .upgrade()
        .unwrap_or_else(|| panic!("rule was dropped before parsing"));
    parse_core(&core, m)
}

pub(crate) fn parse_core<V: Default>(core: &Rc<RuleCore<V>>, m: &mut Matcher<V>) -> bool {
    // Clone the root handle so recursive references can re-borrow the cell
    let root = core.root.borrow().clone();
    let root = match root {
        Some(root) => root,
        None => panic!("rule {} used before a body was assigned", core.describe()),
    };

    let saved = m.base();
    m.set_base(m.level());
    let ok = root.parse(m);
    m.set_base(saved);

    if !ok {
        if let Some(label) = core.label.borrow().as_deref() {
            m.register_expected(label);
        }
    }
    ok
}
