//! Single-pass control-flow scanner over one function body.
//!
//! The scanner never builds an expression tree. It mirrors brace nesting
//! with a stack of [`GuardFrame`]s and keeps, per nesting depth, the
//! predicates of the current `if` / `else if` chain so later siblings can
//! inherit their negation.

use crate::guard::{Guard, PredicateParser};
use crate::lexer::{
    at_word_end, at_word_start, is_ident_byte, matching_close, next_boundary, skip_comment,
    skip_quoted, skip_whitespace,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Guard contributed by one conditional block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GuardFrame {
    /// Brace depth inside the block this frame guards
    pub(crate) block_depth: usize,
    pub(crate) guard: Guard,
}

/// Sibling predicates of the `if` chain open at one depth.
#[derive(Debug, Default)]
struct ConditionalChain {
    siblings: Vec<BTreeSet<String>>,
}

impl ConditionalChain {
    fn implied_absent(&self) -> impl Iterator<Item = &String> {
        self.siblings.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header<'a> {
    /// `if (...) {` or `else if (...) {`
    Conditional {
        condition: &'a str,
        body: usize,
        chained: bool,
    },
    /// `else {`
    Else { body: usize },
}

/// Walks a function body, tracking which guards are active at each statement.
pub(crate) struct ControlFlowScanner<'a> {
    src: &'a str,
    predicates: &'a PredicateParser,
    depth: usize,
    frames: Vec<GuardFrame>,
    chains: BTreeMap<usize, ConditionalChain>,
}

impl<'a> ControlFlowScanner<'a> {
    pub(crate) fn new(src: &'a str, predicates: &'a PredicateParser) -> Self {
        Self {
            src,
            predicates,
            depth: 0,
            frames: Vec::new(),
            chains: BTreeMap::new(),
        }
    }

    /// Current brace depth relative to the start of the body.
    pub(crate) const fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn frames(&self) -> &[GuardFrame] {
        &self.frames
    }

    /// All frames ANDed into one guard.
    pub(crate) fn active_guard(&self) -> Guard {
        let mut combined = Guard::default();
        for frame in &self.frames {
            combined.extend(&frame.guard);
        }
        combined
    }

    /// Scans the whole body.
    ///
    /// `visit` is offered every identifier that does not begin a control-flow
    /// header, with the source from that point on. Returning `Some(n)`
    /// consumes `n` bytes (a recognized statement); `None` lets the scanner
    /// move past the identifier.
    pub(crate) fn run<F>(mut self, mut visit: F)
    where
        F: FnMut(&'a str, &Self) -> Option<usize>,
    {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if let Some(next) = skip_comment(src, i) {
                i = next;
                continue;
            }

            let b = bytes[i];
            if b == b'"' || b == b'\'' {
                i = skip_quoted(src, i);
                continue;
            }

            if (b.is_ascii_alphabetic() || b == b'_') && at_word_start(src, i) {
                if let Some(header) = self.header_at(i) {
                    i = self.enter(header);
                    continue;
                }
                if let Some(consumed) = visit(&src[i..], &self) {
                    i += consumed.max(1);
                    continue;
                }
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                continue;
            }

            match b {
                b'{' => self.depth += 1,
                b'}' => self.close_block(),
                _ => {}
            }
            i = next_boundary(src, i);
        }
    }

    fn keyword_at(&self, i: usize, keyword: &str) -> bool {
        self.src[i..].starts_with(keyword)
            && at_word_start(self.src, i)
            && at_word_end(self.src, i + keyword.len())
    }

    fn skip_trivia(&self, mut i: usize) -> usize {
        loop {
            i = skip_whitespace(self.src, i);
            if i >= self.src.len() {
                return i;
            }
            match skip_comment(self.src, i) {
                Some(next) => i = next,
                None => return i,
            }
        }
    }

    fn byte_at(&self, i: usize) -> Option<u8> {
        self.src.as_bytes().get(i).copied()
    }

    fn header_at(&self, i: usize) -> Option<Header<'a>> {
        let mut j = i;
        let mut chained = false;

        if self.keyword_at(j, "else") {
            let k = self.skip_trivia(j + 4);
            if self.byte_at(k) == Some(b'{') {
                return Some(Header::Else { body: k + 1 });
            }
            if k >= self.src.len() || !self.keyword_at(k, "if") {
                return None;
            }
            chained = true;
            j = k;
        }

        if !self.keyword_at(j, "if") {
            return None;
        }

        let open = self.skip_trivia(j + 2);
        if self.byte_at(open) != Some(b'(') {
            return None;
        }
        let close = matching_close(self.src, open)?;
        let brace = self.skip_trivia(close + 1);
        if self.byte_at(brace) != Some(b'{') {
            return None;
        }

        Some(Header::Conditional {
            condition: &self.src[open + 1..close],
            body: brace + 1,
            chained,
        })
    }

    /// Pushes the frame for a conditional block and returns where its body starts.
    fn enter(&mut self, header: Header<'a>) -> usize {
        let base = self.depth;

        let (guard, body) = match header {
            Header::Conditional {
                condition,
                body,
                chained,
            } => {
                let mut guard = self.predicates.parse(condition);
                let own = guard.must_have.clone();
                if chained {
                    if let Some(chain) = self.chains.get(&base) {
                        guard.must_not_have.extend(chain.implied_absent().cloned());
                    }
                } else {
                    self.chains.insert(base, ConditionalChain::default());
                }
                self.chains
                    .entry(base)
                    .or_default()
                    .siblings
                    .push(own);
                (guard, body)
            }
            Header::Else { body } => {
                let guard = self
                    .chains
                    .remove(&base)
                    .map(|chain| Guard::negating(chain.implied_absent()))
                    .unwrap_or_default();
                (guard, body)
            }
        };

        self.depth = base + 1;
        trace!(depth = self.depth, ?guard, "entering conditional block");
        self.frames.push(GuardFrame {
            block_depth: self.depth,
            guard,
        });
        body
    }

    fn close_block(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        while self
            .frames
            .last()
            .is_some_and(|frame| frame.block_depth > self.depth)
        {
            self.frames.pop();
        }
        let depth = self.depth;
        self.chains.retain(|&chain_depth, _| chain_depth <= depth);
    }
}
