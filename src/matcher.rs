//! Input matcher: position, backtracking, capture, deferred actions
//!
//! One matcher drives one parse session. It owns the buffered input, the
//! current read position, the capture window, the queue of deferred
//! actions, the value-slot bookkeeping (base and level), and the
//! furthest-failure diagnostics. Backtracking goes through a single
//! primitive: take a [`Mark`], restore it.

use crate::charclass::CharClass;
use crate::input_stream::InputStream;
use crate::value::{Scope, SlotTable};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Deferred side effect, run during [`Matcher::accept`].
pub type ActionFn<V> = Rc<dyn Fn(&mut Scope<V>)>;

/// Inline test, run during parsing; its result decides the match.
pub type PredFn<V> = Rc<dyn Fn(&mut Scope<V>) -> bool>;

/// Snapshot of the backtrackable matcher state. Never leaves the crate;
/// expressions take one before speculative work and restore it on failure.
pub(crate) struct Mark {
    pos: usize,
    act_len: usize,
    cap_begin: usize,
    cap_end: usize,
}

/// One queued action together with the capture window and slot base that
/// were live when it was scheduled. Replay must see those values, not the
/// ones live at accept time: a later sibling may have moved both.
struct ActionRecord<V> {
    func: ActionFn<V>,
    cap_begin: usize,
    cap_end: usize,
    base: usize,
}

impl<V> Clone for ActionRecord<V> {
    fn clone(&self) -> Self {
        ActionRecord {
            func: Rc::clone(&self.func),
            cap_begin: self.cap_begin,
            cap_end: self.cap_end,
            base: self.base,
        }
    }
}

/// Matcher state for one parse session. All positions are byte offsets
/// into the live input buffer; `accept` erases the consumed prefix and
/// rebases everything to zero.
pub struct Matcher<V> {
    input: InputStream,
    pos: usize,

    cap_begin: usize,
    cap_end: usize,

    actions: Vec<ActionRecord<V>>,

    base: usize,
    level: usize,
    look_depth: usize,

    // Diagnostics: deepest failure seen, the rule labels expected there,
    // newline offsets seen in the live buffer, and lines already accepted
    furthest: Option<usize>,
    expected: Vec<String>,
    newlines: BTreeSet<usize>,
    lines_consumed: usize,

    values: SlotTable<V>,
}

impl<V: Default> Matcher<V> {
    pub(crate) fn new(input: InputStream, values: SlotTable<V>) -> Self {
        Matcher {
            input,
            pos: 0,
            cap_begin: 0,
            cap_end: 0,
            actions: Vec::new(),
            base: 0,
            level: 0,
            look_depth: 0,
            furthest: None,
            expected: Vec::new(),
            newlines: BTreeSet::new(),
            lines_consumed: 0,
            values,
        }
    }

    // --- low-level reads ---

    /// Read one raw byte, advancing the position. Newline offsets are
    /// recorded here so diagnostics can report line numbers without help
    /// from user actions.
    fn getc(&mut self) -> Option<u8> {
        let byte = self.input.get(self.pos)?;
        if byte == b'\n' {
            self.newlines.insert(self.pos);
        }
        self.pos += 1;
        Some(byte)
    }

    /// Decode one code point, advancing past it. Decoding is lenient: a
    /// malformed lead or continuation byte yields the first byte's value
    /// as the code point and leaves the position after that single byte.
    /// Ill-formed UTF-8 is tolerated input, not a parse error.
    pub(crate) fn next_code_point(&mut self) -> Option<u32> {
        let start = self.pos;
        let lead = self.getc()?;

        let (len, mut cp) = match lead {
            0x00..=0x7F => return Some(lead as u32),
            0xC0..=0xDF => (2, (lead & 0x1F) as u32),
            0xE0..=0xEF => (3, (lead & 0x0F) as u32),
            0xF0..=0xF7 => (4, (lead & 0x07) as u32),
            // Stray continuation byte or invalid lead: pass it through
            _ => return Some(lead as u32),
        };

        for _ in 1..len {
            match self.input.get(self.pos) {
                Some(byte) if byte & 0xC0 == 0x80 => {
                    cp = (cp << 6) | (byte & 0x3F) as u32;
                    self.pos += 1;
                }
                _ => {
                    self.pos = start + 1;
                    return Some(lead as u32);
                }
            }
        }
        Some(cp)
    }

    // --- matching primitives ---

    pub(crate) fn match_any(&mut self) -> bool {
        self.next_code_point().is_some()
    }

    pub(crate) fn match_literal(&mut self, bytes: &[u8]) -> bool {
        let mpos = self.pos;
        for &want in bytes {
            match self.getc() {
                Some(byte) if byte == want => {}
                _ => {
                    self.pos = mpos;
                    return false;
                }
            }
        }
        true
    }

    pub(crate) fn match_char(&mut self, ch: char) -> bool {
        let mpos = self.pos;
        match self.next_code_point() {
            Some(cp) if cp == ch as u32 => true,
            _ => {
                self.pos = mpos;
                false
            }
        }
    }

    pub(crate) fn match_class(&mut self, class: &CharClass) -> bool {
        let mpos = self.pos;
        match self.next_code_point() {
            Some(cp) if class.contains_u32(cp) => true,
            _ => {
                self.pos = mpos;
                false
            }
        }
    }

    // --- backtracking ---

    pub(crate) fn set_mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            act_len: self.actions.len(),
            cap_begin: self.cap_begin,
            cap_end: self.cap_end,
        }
    }

    pub(crate) fn go_mark(&mut self, mark: &Mark) {
        self.pos = mark.pos;
        self.actions.truncate(mark.act_len);
        self.cap_begin = mark.cap_begin;
        self.cap_end = mark.cap_end;
    }

    // --- capture ---

    pub(crate) fn begin_capture(&self) -> usize {
        self.pos
    }

    pub(crate) fn end_capture(&mut self, begin: usize) {
        self.cap_begin = begin;
        self.cap_end = self.pos;
    }

    /// The most recently captured text, decoded lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.input.slice(self.cap_begin, self.cap_end)).into_owned()
    }

    // --- slot bookkeeping ---

    pub(crate) fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    pub(crate) fn base(&self) -> usize {
        self.base
    }

    pub(crate) fn set_base(&mut self, base: usize) {
        self.base = base;
    }

    pub(crate) fn slots(&self) -> &SlotTable<V> {
        &self.values
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotTable<V> {
        &mut self.values
    }

    // --- deferred actions and inline predicates ---

    /// Queue an action, freezing the live capture window and base with it.
    /// Inside a lookahead this is a no-op: speculation that can never
    /// consume input must also never produce side effects.
    pub(crate) fn schedule(&mut self, func: &ActionFn<V>) {
        if self.look_depth > 0 {
            return;
        }
        self.actions.push(ActionRecord {
            func: Rc::clone(func),
            cap_begin: self.cap_begin,
            cap_end: self.cap_end,
            base: self.base,
        });
    }

    /// Run a predicate inline against the live capture window and base.
    pub(crate) fn test(&mut self, func: &PredFn<V>) -> bool {
        let func = Rc::clone(func);
        let text =
            String::from_utf8_lossy(self.input.slice(self.cap_begin, self.cap_end)).into_owned();
        let mut scope = Scope::new(text, self.base, &mut self.values);
        func(&mut scope)
    }

    pub(crate) fn enter_lookahead(&mut self) {
        self.look_depth += 1;
    }

    pub(crate) fn leave_lookahead(&mut self) {
        self.look_depth -= 1;
    }

    // --- commit and discard ---

    /// Replay every queued action in scheduling order, each under the
    /// capture window and base recorded with it, then erase the consumed
    /// input prefix and reset all bookkeeping.
    pub fn accept(&mut self) {
        for i in 0..self.actions.len() {
            let act = self.actions[i].clone();
            let text = String::from_utf8_lossy(self.input.slice(act.cap_begin, act.cap_end))
                .into_owned();
            let mut scope = Scope::new(text, act.base, &mut self.values);
            (act.func)(&mut scope);
        }
        self.actions.clear();

        // Fold newlines inside the consumed prefix into the running total
        // and rebase the rest
        let consumed = self.pos;
        let rest = self.newlines.split_off(&consumed);
        self.lines_consumed += self.newlines.len();
        self.newlines = rest.into_iter().map(|p| p - consumed).collect();

        self.input.discard(consumed);
        self.reset_session();
    }

    /// Discard pending actions and buffered input without replay.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.input.discard_all();
        self.newlines.clear();
        self.reset_session();
    }

    fn reset_session(&mut self) {
        self.pos = 0;
        self.cap_begin = 0;
        self.cap_end = 0;
        self.base = 0;
        self.level = 0;
        self.look_depth = 0;
        self.furthest = None;
        self.expected.clear();
    }

    // --- diagnostics ---

    /// Record that a labeled rule failed at the current position. Deeper
    /// failures replace the expected set; equally deep ones extend it.
    /// Suppressed inside lookahead, where failure is routine.
    pub(crate) fn register_expected(&mut self, label: &str) {
        if self.look_depth > 0 {
            return;
        }
        let pos = self.pos;
        match self.furthest {
            Some(furthest) if pos < furthest => {}
            Some(furthest) if pos == furthest => {
                if !self.expected.iter().any(|have| have == label) {
                    self.expected.push(label.to_string());
                }
            }
            _ => {
                self.furthest = Some(pos);
                self.expected.clear();
                self.expected.push(label.to_string());
            }
        }
    }

    /// Human-readable diagnostic for the furthest failure of the current
    /// session: line number, expected rule labels, and up to 60 bytes of
    /// input context at the failure position.
    pub fn get_error(&self) -> String {
        let pos = self.furthest.unwrap_or(self.pos);
        let line = self.lines_consumed + self.newlines.range(..pos).count() + 1;
        let context =
            String::from_utf8_lossy(self.input.slice(pos, pos + 60)).into_owned();

        if self.expected.is_empty() {
            format!("parse error at line {}\n  near {:?}", line, context)
        } else {
            format!(
                "parse error at line {}: expected {}\n  near {:?}",
                line,
                self.expected.join(", "),
                context
            )
        }
    }

    #[cfg(test)]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[cfg(test)]
    pub(crate) fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    #[cfg(test)]
    pub(crate) fn capture_window(&self) -> (usize, usize) {
        (self.cap_begin, self.cap_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn matcher(text: &str) -> Matcher<i64> {
        Matcher::new(InputStream::from_str(text), SlotTable::dense())
    }

    #[test]
    fn test_match_literal_restores_on_failure() {
        let mut m = matcher("abcdef");
        assert!(m.match_literal(b"abc"));
        assert_eq!(m.pos(), 3);
        assert!(!m.match_literal(b"xyz"));
        assert_eq!(m.pos(), 3);
        assert!(!m.match_literal(b"defg"));
        assert_eq!(m.pos(), 3);
    }

    #[test]
    fn test_match_char_decodes_utf8() {
        let mut m = matcher("é!");
        assert!(m.match_char('é'));
        assert_eq!(m.pos(), 2);
        assert!(m.match_char('!'));
        assert!(!m.match_char('!'));
    }

    #[test]
    fn test_lenient_decode_of_malformed_utf8() {
        // 0xC3 lead byte followed by a non-continuation byte
        let mut m: Matcher<i64> =
            Matcher::new(InputStream::from_bytes(vec![0xC3, b'x']), SlotTable::dense());
        assert_eq!(m.next_code_point(), Some(0xC3));
        assert_eq!(m.pos(), 1);
        assert_eq!(m.next_code_point(), Some(b'x' as u32));

        // Stray continuation byte passes through as its own value
        let mut m: Matcher<i64> =
            Matcher::new(InputStream::from_bytes(vec![0x85]), SlotTable::dense());
        assert_eq!(m.next_code_point(), Some(0x85));
    }

    #[test]
    fn test_mark_restores_everything() {
        let mut m = matcher("abcd");
        assert!(m.match_literal(b"a"));
        let begin = m.begin_capture();
        assert!(m.match_literal(b"b"));
        m.end_capture(begin);

        let mark = m.set_mark();
        let noop: ActionFn<i64> = Rc::new(|_| {});
        m.schedule(&noop);
        assert!(m.match_literal(b"cd"));
        m.end_capture(2);
        assert_eq!(m.pending_actions(), 1);

        m.go_mark(&mark);
        assert_eq!(m.pos(), 2);
        assert_eq!(m.pending_actions(), 0);
        assert_eq!(m.capture_window(), (1, 2));
        assert_eq!(m.text(), "b");
    }

    #[test]
    fn test_schedule_suppressed_in_lookahead() {
        let mut m = matcher("x");
        let noop: ActionFn<i64> = Rc::new(|_| {});
        m.enter_lookahead();
        m.schedule(&noop);
        assert_eq!(m.pending_actions(), 0);
        m.leave_lookahead();
        m.schedule(&noop);
        assert_eq!(m.pending_actions(), 1);
    }

    #[test]
    fn test_accept_replays_in_order_with_frozen_state() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut m = matcher("ab");

        let begin = m.begin_capture();
        assert!(m.match_literal(b"a"));
        m.end_capture(begin);
        let first: ActionFn<i64> = {
            let log = log.clone();
            Rc::new(move |c| log.borrow_mut().push(c.text().to_string()))
        };
        m.schedule(&first);

        // Second capture overwrites the live window before replay
        let begin = m.begin_capture();
        assert!(m.match_literal(b"b"));
        m.end_capture(begin);
        m.schedule(&first);

        m.accept();
        assert_eq!(*log.borrow(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(m.pending_actions(), 0);
        assert_eq!(m.pos(), 0);
    }

    #[test]
    fn test_accept_consumes_prefix() {
        let mut m = matcher("abc\ndef");
        assert!(m.match_literal(b"abc\n"));
        m.accept();
        assert!(m.match_literal(b"def"));
        assert!(!m.match_literal(b"x"));
    }

    #[test]
    fn test_furthest_failure_protocol() {
        let mut m = matcher("abcdef");
        m.match_literal(b"ab");
        m.register_expected("FIRST");
        assert_eq!(m.furthest, Some(2));

        // Shallower failure is ignored
        m.pos = 1;
        m.register_expected("SHALLOW");
        assert_eq!(m.expected, vec!["FIRST"]);

        // Equal depth unions, without duplicates
        m.pos = 2;
        m.register_expected("SECOND");
        m.register_expected("FIRST");
        assert_eq!(m.expected, vec!["FIRST", "SECOND"]);

        // Deeper failure replaces
        m.pos = 4;
        m.register_expected("DEEP");
        assert_eq!(m.expected, vec!["DEEP"]);
        assert_eq!(m.furthest, Some(4));
    }

    #[test]
    fn test_register_suppressed_in_lookahead() {
        let mut m = matcher("ab");
        m.enter_lookahead();
        m.register_expected("HIDDEN");
        m.leave_lookahead();
        assert!(m.expected.is_empty());
        assert_eq!(m.furthest, None);
    }

    #[test]
    fn test_error_line_numbers_span_accepts() {
        let mut m = matcher("one\ntwo\nthr");
        assert!(m.match_literal(b"one\ntwo\n"));
        m.accept();
        assert_eq!(m.lines_consumed, 2);

        assert!(m.match_literal(b"thr"));
        m.register_expected("EOL");
        let msg = m.get_error();
        assert!(msg.contains("line 3"), "unexpected message: {}", msg);
        assert!(msg.contains("EOL"));
    }

    #[test]
    fn test_error_context_snippet() {
        let mut m = matcher("good stuff then ~junk~");
        assert!(m.match_literal(b"good stuff then "));
        m.register_expected("WORD");
        let msg = m.get_error();
        assert!(msg.contains("~junk~"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_clear_discards_without_replay() {
        let hits = Rc::new(RefCell::new(0));
        let mut m = matcher("zz");
        let bump: ActionFn<i64> = {
            let hits = hits.clone();
            Rc::new(move |_| *hits.borrow_mut() += 1)
        };
        assert!(m.match_literal(b"z"));
        m.schedule(&bump);
        m.clear();
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(m.pending_actions(), 0);
        assert!(!m.match_literal(b"z"));
    }
}
