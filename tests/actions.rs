//! Deferred-action discipline: actions fire exactly once, in scheduling
//! order, only for the alternative that commits, and never from inside
//! lookahead.

use rustipeg::{any, chr, lit, look, not, Expr, InputStream, Parser, Rule};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn lookahead_suppresses_shared_action() {
    // The same expression node is tried inside a lookahead and then
    // matched for real; only the real match may schedule its action
    let counter = Rc::new(Cell::new(0));
    let bump = counter.clone();
    let x: Expr = chr('x').action(move |_| bump.set(bump.get() + 1));

    let start: Rule = Rule::new();
    start.assign(look(x.clone()) >> x);

    let mut parser = Parser::new(&start, InputStream::from_str("x"));
    assert!(parser.parse());
    assert_eq!(counter.get(), 0, "actions must not run before accept");
    parser.accept();
    assert_eq!(counter.get(), 1);
}

#[test]
fn backtracking_discards_speculative_actions() {
    // start = 'a' {log a} 'b' | 'a' 'c' on input "ac": the first arm
    // schedules, consumes "a", fails on "b", and must take its action
    // with it
    let log: Rc<RefCell<Vec<char>>> = Default::default();
    let sink = log.clone();

    let start: Rule = Rule::new();
    start.assign((chr('a').action(move |_| sink.borrow_mut().push('a')) >> 'b') | (chr('a') >> 'c'));

    let mut parser = Parser::new(&start, InputStream::from_str("ac"));
    assert!(parser.parse());
    parser.accept();
    assert!(log.borrow().is_empty(), "rolled-back action ran: {:?}", log.borrow());
}

#[test]
fn actions_replay_in_scheduling_order() {
    let log: Rc<RefCell<Vec<String>>> = Default::default();
    let first = log.clone();
    let second = log.clone();

    let start: Rule = Rule::new();
    start.assign(
        lit("one")
            .capture()
            .action(move |c| first.borrow_mut().push(c.text().to_string()))
            >> lit("-two")
                .capture()
                .action(move |c| second.borrow_mut().push(c.text().to_string())),
    );

    let mut parser = Parser::new(&start, InputStream::from_str("one-two"));
    assert!(parser.parse());
    parser.accept();
    assert_eq!(*log.borrow(), vec!["one", "-two"]);
}

#[test]
fn actions_see_their_own_capture_window() {
    // The right sibling overwrites the live capture window before the
    // left sibling's action replays; each action must still see the
    // window frozen at its scheduling time
    let log: Rc<RefCell<Vec<String>>> = Default::default();
    let sink = log.clone();

    let word: Rule = Rule::new();
    word.assign(
        (lit("ab").capture().action({
            let sink = sink.clone();
            move |c| sink.borrow_mut().push(c.text().to_string())
        }) >> lit("cd").capture())
        .action(move |c| sink.borrow_mut().push(c.text().to_string())),
    );

    let mut parser = Parser::new(&word, InputStream::from_str("abcd"));
    assert!(parser.parse());
    parser.accept();
    assert_eq!(*log.borrow(), vec!["ab", "cd"]);
}

#[test]
fn accept_after_failed_parse_is_a_noop() {
    let counter = Rc::new(Cell::new(0));
    let bump = counter.clone();

    let start: Rule = Rule::new();
    start.assign(chr('a').action(move |_| bump.set(bump.get() + 1)) >> 'b');

    let mut parser = Parser::new(&start, InputStream::from_str("ax"));
    assert!(!parser.parse());
    parser.accept();
    assert_eq!(counter.get(), 0);

    // The input is still there: a grammar that fits it now matches
    let ax: Rule = Rule::new();
    ax.assign(lit("ax"));
    // (fresh parser over the same text, since the first one owns its input)
    let mut parser = Parser::new(&ax, InputStream::from_str("ax"));
    assert!(parser.parse());
}

#[test]
fn nested_lookahead_still_suppresses() {
    let counter = Rc::new(Cell::new(0));
    let bump = counter.clone();

    let start: Rule = Rule::new();
    // Negative around positive: both levels are speculation
    start.assign(not(look(chr('q').action(move |_| bump.set(bump.get() + 1)))) >> "x");

    let mut parser = Parser::new(&start, InputStream::from_str("x"));
    assert!(parser.parse());
    parser.accept();
    assert_eq!(counter.get(), 0);
}

#[test]
fn lookahead_does_not_pollute_diagnostics() {
    let missing: Rule = Rule::named("MISSING");
    missing.assign(lit("zz"));

    let start: Rule = Rule::new();
    start.assign(not(&missing) >> lit("ok"));

    let mut parser = Parser::new(&start, InputStream::from_str("ok"));
    assert!(parser.parse());
    parser.accept();

    // A later real failure reports its own labels, not the routine
    // failure inside the lookahead
    assert!(!parser.parse());
    let msg = parser.get_error();
    assert!(!msg.contains("MISSING"), "unexpected message: {}", msg);
}

#[test]
fn repeated_rule_actions_fire_per_iteration() {
    let log: Rc<RefCell<Vec<String>>> = Default::default();
    let sink = log.clone();

    let item: Rule = Rule::new();
    item.assign(
        (any().capture() >> lit(",").opt())
            .action(move |c| sink.borrow_mut().push(c.text().to_string())),
    );

    let start: Rule = Rule::new();
    start.assign(item.plus());

    let mut parser = Parser::new(&start, InputStream::from_str("a,b,c"));
    assert!(parser.parse());
    parser.accept();
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}
