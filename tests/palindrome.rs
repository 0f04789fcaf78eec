//! Palindrome splitter: semantic predicates check symmetry through the
//! value slots while the parse is still speculative, and the winning
//! split is printed from a deferred action.
//!
//! With distinct characters the splitter finds the longest palindromes;
//! with runs of equal characters the PEG-ordered binary split wins, so
//! `aaaaa` comes out as `aa`, `aa`, `a`.

use rustipeg::{any, InputStream, Parser, Rule};
use std::cell::RefCell;
use std::rc::Rc;

fn split(input: &str) -> Vec<String> {
    let out: Rc<RefCell<Vec<String>>> = Default::default();

    // chr = any captured; the inline predicate stores the character in
    // the rule's result slot during parsing so the symmetry checks below
    // can read it
    let chr: Rule<String> = Rule::new();
    chr.assign(any().capture().verify(|c| {
        c[0] = c.text().to_string();
        true
    }));

    let pal: Rule<String> = Rule::new();
    pal.assign(
        (&chr >> &pal >> &chr).verify(|c| c[0] == c[2])
            | (&chr >> &chr).verify(|c| c[0] == c[1])
            | &chr,
    );

    let start: Rule<String> = Rule::new();
    let sink = out.clone();
    start.assign(
        pal.capture()
            .action(move |c| sink.borrow_mut().push(c.text().to_string())),
    );

    let mut parser = Parser::new(&start, InputStream::from_str(input));
    while parser.parse() {
        parser.accept();
    }
    let results = out.borrow().clone();
    results
}

#[test]
fn whole_input_is_one_palindrome() {
    assert_eq!(split("abcba"), vec!["abcba"]);
}

#[test]
fn single_character() {
    assert_eq!(split("x"), vec!["x"]);
}

#[test]
fn greedy_binary_split_on_equal_runs() {
    assert_eq!(split("aaaaa"), vec!["aa", "aa", "a"]);
}

#[test]
fn even_run_splits_cleanly() {
    assert_eq!(split("aaaa"), vec!["aaaa"]);
}

#[test]
fn mixed_input_splits_into_palindromes() {
    assert_eq!(split("abcbax"), vec!["abcba", "x"]);
}

#[test]
fn empty_input_matches_nothing() {
    assert_eq!(split(""), Vec::<String>::new());
}
