//! Static grammar analysis
//!
//! A debug-time traversal of the expression graph that rejects
//! left-recursive grammars before any input is read. The walk colors rules
//! unvisited / visiting / visited and carries the minimum number of bytes
//! the parse must have consumed to reach the current point; re-entering a
//! rule that is still being visited at the very consumption count it was
//! entered with means the rule can call itself without consuming anything,
//! which would never terminate at parse time.
//!
//! The check is advisory: it runs once per parser construction in debug
//! builds and is compiled out of release builds.

use crate::expr::{Expr, ExprView};
use crate::rule::{Rule, RuleCore};
use std::collections::HashMap;
use std::rc::Rc;

enum Color {
    Visiting { entry: usize },
    Visited { min_len: usize },
}

struct Analysis {
    /// Keyed by rule identity (core pointer)
    colors: HashMap<usize, Color>,
}

/// Check the grammar reachable from `start` for left recursion. Panics
/// with the offending rule's label on detection; this is a structural
/// grammar error, not a parse failure.
pub fn check<V>(start: &Rule<V>) {
    check_core(start.core());
}

pub(crate) fn check_core<V>(core: &Rc<RuleCore<V>>) {
    let mut analysis = Analysis {
        colors: HashMap::new(),
    };
    visit_rule(core, 0, &mut analysis);
}

/// Returns the minimum number of bytes this rule consumes when it
/// matches.
fn visit_rule<V>(core: &Rc<RuleCore<V>>, consumed: usize, analysis: &mut Analysis) -> usize {
    let key = Rc::as_ptr(core) as usize;

    match analysis.colors.get(&key) {
        Some(Color::Visiting { entry }) => {
            if *entry == consumed {
                panic!("left-recursive rule {}", core.describe());
            }
            // Guarded recursion: something was consumed on the way back
            // here, so the cycle shrinks its input. Count it as one byte.
            return 1;
        }
        Some(Color::Visited { min_len }) => return *min_len,
        None => {}
    }

    analysis
        .colors
        .insert(key, Color::Visiting { entry: consumed });

    // A rule with no body yet fails at parse time anyway; treat it as
    // consuming nothing so the rest of the grammar still gets checked
    let root = core.root.borrow().clone();
    let min_len = match root {
        Some(root) => visit_expr(&root, consumed, analysis),
        None => 0,
    };

    analysis.colors.insert(key, Color::Visited { min_len });
    min_len
}

/// Returns the minimum number of bytes `expr` consumes when it matches,
/// visiting nested rules along the way.
fn visit_expr<V>(expr: &Expr<V>, consumed: usize, analysis: &mut Analysis) -> usize {
    match expr.visit() {
        ExprView::Terminal { min_len } => min_len,

        // Lookahead consumes nothing, but rules inside it still recurse
        // at the current count
        ExprView::Lookahead(child) => {
            visit_expr(child, consumed, analysis);
            0
        }

        ExprView::Child(child) => visit_expr(child, consumed, analysis),

        ExprView::Seq(left, right) => {
            let first = visit_expr(left, consumed, analysis);
            first + visit_expr(right, consumed + first, analysis)
        }

        ExprView::Alt(left, right) => {
            let a = visit_expr(left, consumed, analysis);
            let b = visit_expr(right, consumed, analysis);
            a.min(b)
        }

        ExprView::Repeat(child, min) => visit_expr(child, consumed, analysis) * min as usize,

        ExprView::RuleRef(weak) => match weak.upgrade() {
            Some(core) => visit_rule(&core, consumed, analysis),
            None => 0,
        },
    }
}
