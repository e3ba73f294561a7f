//! Lazy, cursor-resumable sequences over paginated query results.
//!
//! A [`Seq`] is returned by `query` and fetches one page at a time from a
//! [`PageSource`], holding at most one page in memory. It is driven either
//! manually with [`Seq::advance`] / [`Seq::head`], with [`Seq::fmap`], or as
//! an [`Iterator`] of `Result<Item>`.
//!
//! # States
//!
//! ```text
//! Fresh ──seed──▶ Paged ──advance past page, no continuation──▶ Exhausted
//!   │               │ ▲
//!   │               └─┘ advance past page, continuation (streaming only)
//!   └──── transport failure / cancellation ─────────────────▶ Erred
//! ```
//!
//! A bounded sequence ([`Seq::limit`]) performs at most one fetch: running off
//! its single page is terminal even when the store reports more items.
//!
//! # Resumption
//!
//! [`Seq::cursor`] is the position of the last element reached. Feeding it to
//! [`Seq::continue_from`] on a fresh query resumes right after that element:
//!
//! ```no_run
//! # use keyval::{Context, KeyVal, Key};
//! # fn run<T: keyval::Thing, D: KeyVal<T>>(db: &D, pattern: &T) -> keyval::Result<()> {
//! let ctx = Context::background();
//! let mut seq = db.query(&ctx, pattern).limit(20);
//! let mut page = Vec::new();
//! seq.fmap(|item| {
//!     page.push(item);
//!     Ok::<_, keyval::Error>(())
//! })?;
//! let cursor: Key = seq.cursor();
//!
//! // later, possibly in another process
//! let next = db.query(&ctx, pattern).continue_from(&cursor).limit(20);
//! # let _ = next;
//! # Ok(())
//! # }
//! ```

use crate::context::Context;
use crate::error::{Error, Result};
use crate::thing::Key;
use std::fmt;

/// One page of raw results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Continuation marker, `None` when the store has no more pages
    pub next: Option<Key>,
}

impl<R> Page<R> {
    pub fn new(items: Vec<R>, next: Option<Key>) -> Self {
        Self { items, next }
    }

    /// Final page
    pub fn last(items: Vec<R>) -> Self {
        Self::new(items, None)
    }
}

/// Backend collaborator that produces pages for a [`Seq`]
pub trait PageSource {
    /// Decoded element
    type Item;
    /// Element as listed in a page
    type Raw;

    /// Fetch the page following `after` (the first page when `None`)
    fn fetch(&mut self, ctx: &Context, after: Option<&Key>, limit: Option<usize>) -> Result<Page<Self::Raw>>;

    /// Decode (and, for listing-only stores, fetch) a listed element
    fn materialize(&self, ctx: &Context, raw: &Self::Raw) -> Result<Self::Item>;

    /// Position of a listed element, usable as `after` in [`PageSource::fetch`]
    fn position(&self, raw: &Self::Raw) -> Key;

    /// Switch to descending order; `false` when the store has no notion of direction
    fn reverse(&mut self) -> bool {
        false
    }
}

enum State<R> {
    Fresh,
    Paged { items: Vec<R>, at: usize },
    Exhausted,
    Erred(Error),
}

/// Observable phase of a [`Seq`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqState {
    Fresh,
    Paged,
    Exhausted,
    Erred,
}

enum Step {
    Moved,
    Seed,
    Exhaust,
    Stop,
}

/// Lazy sequence over a paginated query
///
/// A `Seq` is single-owner mutable state: drive it from one place at a time.
/// Distinct sequences share nothing and can be driven from separate threads.
pub struct Seq<S: PageSource> {
    ctx: Context,
    source: Option<S>,
    state: State<S::Raw>,
    next: Option<Key>,
    position: Option<Key>,
    limit: Option<usize>,
    page_size: Option<usize>,
    reported: bool,
}

impl<S: PageSource> Seq<S> {
    pub fn new(ctx: &Context, source: S) -> Self {
        Self {
            ctx: ctx.clone(),
            source: Some(source),
            state: State::Fresh,
            next: None,
            position: None,
            limit: None,
            page_size: None,
            reported: false,
        }
    }

    /// Sequence that failed before it could be created (e.g. invalid key)
    pub fn failed(ctx: &Context, err: Error) -> Self {
        Self {
            ctx: ctx.clone(),
            source: None,
            state: State::Erred(err),
            next: None,
            position: None,
            limit: None,
            page_size: None,
            reported: false,
        }
    }

    /// Page size requested while streaming
    pub fn page_size(mut self, n: usize) -> Self {
        self.page_size = (n > 0).then_some(n);
        self
    }

    /// Bound the sequence to at most `n` elements fetched in a single page
    ///
    /// `limit(0)` yields nothing and performs no fetch.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        if n == 0 && matches!(self.state, State::Fresh) {
            self.state = State::Exhausted;
        }
        self
    }

    /// Resume after a position previously returned by [`Seq::cursor`]
    ///
    /// An empty key is ignored. Call before traversal starts.
    pub fn continue_from(mut self, key: &Key) -> Self {
        if !key.is_empty() {
            self.next = Some(key.clone());
            self.position = Some(key.clone());
        }
        self
    }

    /// Descending order where the store supports it
    pub fn reverse(mut self) -> Self {
        if let Some(source) = self.source.as_mut() {
            if !source.reverse() {
                log::debug!("store has no notion of direction; reverse ignored");
            }
        }
        self
    }

    /// Position of the last element reached, empty when nothing is known
    pub fn cursor(&self) -> Key {
        self.position.clone().unwrap_or_default()
    }

    /// Terminal error, if any
    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            State::Erred(err) => Some(err),
            _ => None,
        }
    }

    pub fn state(&self) -> SeqState {
        match self.state {
            State::Fresh => SeqState::Fresh,
            State::Paged { .. } => SeqState::Paged,
            State::Exhausted => SeqState::Exhausted,
            State::Erred(_) => SeqState::Erred,
        }
    }

    /// Move to the next element, fetching a page when needed
    ///
    /// Returns `false` when the sequence is exhausted or has failed; the
    /// failure is available from [`Seq::error`].
    pub fn advance(&mut self) -> bool {
        let step = match &mut self.state {
            State::Erred(_) | State::Exhausted => Step::Stop,
            State::Fresh => Step::Seed,
            State::Paged { items, at } => {
                if *at + 1 < items.len() {
                    *at += 1;
                    Step::Moved
                } else if self.limit.is_none() && self.next.is_some() {
                    Step::Seed
                } else {
                    Step::Exhaust
                }
            }
        };

        match step {
            Step::Moved => {
                self.track();
                true
            }
            Step::Seed => self.seed().is_ok(),
            Step::Exhaust => {
                log::debug!("sequence exhausted at {}", self.cursor());
                self.state = State::Exhausted;
                false
            }
            Step::Stop => false,
        }
    }

    /// Materialize the current element
    ///
    /// Seeds the first page when called on a fresh sequence. Returns `None`
    /// when there is no current element. A decode failure is returned without
    /// discarding the rest of the page.
    pub fn head(&mut self) -> Option<Result<S::Item>> {
        if matches!(self.state, State::Fresh) {
            if let Err(err) = self.seed() {
                return match err {
                    Error::EndOfStream => None,
                    err => {
                        self.reported = true;
                        Some(Err(err))
                    }
                };
            }
        }

        let State::Paged { items, at } = &self.state else {
            return None;
        };
        let source = self.source.as_ref()?;
        let raw = items.get(*at)?;

        if let Err(err) = self.ctx.check() {
            return Some(Err(err));
        }
        Some(
            source
                .materialize(&self.ctx, raw)
                .map_err(|err| self.ctx.classify(err)),
        )
    }

    /// Apply `f` to every remaining element
    ///
    /// Stops at the first failure: a decode error is returned as is, a
    /// callback error is wrapped in [`Error::ProcessEntity`] with the position
    /// of the offending element. Otherwise returns the terminal error of the
    /// sequence, or `Ok(())`.
    pub fn fmap<F, E>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(S::Item) -> std::result::Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        while self.advance() {
            let head = match self.head() {
                Some(Ok(head)) => head,
                Some(Err(err)) => return Err(err),
                None => break,
            };
            if let Err(err) = f(head) {
                return Err(Error::process_entity(self.cursor(), err));
            }
        }

        match &self.state {
            State::Erred(err) => {
                self.reported = true;
                Err(err.clone())
            }
            _ => Ok(()),
        }
    }

    fn seed(&mut self) -> Result<()> {
        loop {
            if let Err(err) = self.ctx.check() {
                return Err(self.fail(err));
            }
            let Some(source) = self.source.as_mut() else {
                self.state = State::Exhausted;
                return Err(Error::EndOfStream);
            };

            let limit = self.limit.or(self.page_size);
            log::debug!(
                "fetching page after {:?} (limit {:?})",
                self.next.as_ref().map(ToString::to_string),
                limit
            );

            #[cfg(feature = "metrics")]
            let start = std::time::Instant::now();

            let page = match source.fetch(&self.ctx, self.next.as_ref(), limit) {
                Ok(page) => page,
                Err(err) => {
                    let err = self.ctx.classify(err);
                    return Err(self.fail(err));
                }
            };

            #[cfg(feature = "metrics")]
            crate::metrics::METRICS.record_page(start.elapsed());

            let Page { mut items, next } = page;
            self.next = next;

            if let Some(n) = self.limit {
                items.truncate(n);
            }

            if items.is_empty() {
                if self.limit.is_none() && self.next.is_some() {
                    continue;
                }
                self.state = State::Exhausted;
                return Err(Error::EndOfStream);
            }

            self.state = State::Paged { items, at: 0 };
            self.track();
            return Ok(());
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        log::debug!("sequence failed: {}", err);
        self.state = State::Erred(err.clone());
        err
    }

    fn track(&mut self) {
        if let (State::Paged { items, at }, Some(source)) = (&self.state, self.source.as_ref()) {
            if let Some(raw) = items.get(*at) {
                self.position = Some(source.position(raw));
            }
        }
    }
}

impl<S: PageSource> Iterator for Seq<S> {
    type Item = Result<S::Item>;

    /// Yields elements until exhaustion; a terminal failure is yielded once.
    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.head();
        }
        match &self.state {
            State::Erred(err) if !self.reported => {
                self.reported = true;
                Some(Err(err.clone()))
            }
            _ => None,
        }
    }
}

impl<S: PageSource> fmt::Debug for Seq<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seq")
            .field("state", &self.state())
            .field("next", &self.next)
            .field("position", &self.position)
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "broken pipe")
        }
    }

    impl std::error::Error for Broken {}

    // Sorted keys served `start-after` style, `page` keys at a time
    struct MockSource {
        keys: Vec<String>,
        page: usize,
        fetches: Rc<Cell<usize>>,
        fail_at: Option<usize>,
        bad: Option<String>,
        ignore_limit: bool,
    }

    impl MockSource {
        fn new(n: usize, page: usize) -> (Self, Rc<Cell<usize>>) {
            let fetches = Rc::new(Cell::new(0));
            let source = Self {
                keys: (1..=n).map(|i| format!("k{i:02}")).collect(),
                page,
                fetches: Rc::clone(&fetches),
                fail_at: None,
                bad: None,
                ignore_limit: false,
            };
            (source, fetches)
        }
    }

    impl PageSource for MockSource {
        type Item = String;
        type Raw = String;

        fn fetch(&mut self, _ctx: &Context, after: Option<&Key>, limit: Option<usize>) -> Result<Page<String>> {
            let n = self.fetches.get();
            self.fetches.set(n + 1);
            if self.fail_at == Some(n) {
                return Err(Error::service_io(Broken));
            }

            let size = match limit {
                Some(n) if !self.ignore_limit => n.min(self.page),
                _ => self.page,
            };
            let rest: Vec<String> = self
                .keys
                .iter()
                .filter(|k| after.map_or(true, |a| k.as_str() > a.hash_key.as_str()))
                .cloned()
                .collect();
            let items: Vec<String> = rest.iter().take(size).cloned().collect();
            let next = (rest.len() > items.len())
                .then(|| items.last().map(|k| Key::hash(k.clone())))
                .flatten();
            Ok(Page::new(items, next))
        }

        fn materialize(&self, _ctx: &Context, raw: &String) -> Result<String> {
            if self.bad.as_deref() == Some(raw.as_str()) {
                return Err(Error::InvalidEntity(format!("cannot decode {raw}")));
            }
            Ok(raw.to_uppercase())
        }

        fn position(&self, raw: &String) -> Key {
            Key::hash(raw.clone())
        }
    }

    fn collect(seq: &mut Seq<MockSource>) -> Vec<String> {
        let mut out = Vec::new();
        seq.fmap(|x| {
            out.push(x);
            Ok::<_, Error>(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_streaming_traverses_all_pages() {
        let (source, fetches) = MockSource::new(7, 3);
        let mut seq = Seq::new(&Context::background(), source);
        assert_eq!(seq.state(), SeqState::Fresh);

        let items = collect(&mut seq);
        assert_eq!(items.len(), 7);
        assert_eq!(items[0], "K01");
        assert_eq!(items[6], "K07");
        assert_eq!(fetches.get(), 3);
        assert_eq!(seq.state(), SeqState::Exhausted);
    }

    #[test]
    fn test_fmap_over_empty_result() {
        let (source, fetches) = MockSource::new(0, 3);
        let mut seq = Seq::new(&Context::background(), source);
        let mut calls = 0;
        seq.fmap(|_| {
            calls += 1;
            Ok::<_, Error>(())
        })
        .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(fetches.get(), 1);
        assert!(seq.error().is_none());
    }

    #[test]
    fn test_fmap_on_temporary_sequence() {
        let (source, fetches) = MockSource::new(4, 3);
        let mut seen = Vec::new();
        Seq::new(&Context::background(), source)
            .fmap(|x| {
                seen.push(x);
                Ok::<_, Error>(())
            })
            .unwrap();
        assert_eq!(seen, vec!["K01", "K02", "K03", "K04"]);
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_limit_fetches_exactly_one_page() {
        let (source, fetches) = MockSource::new(10, 5);
        let mut seq = Seq::new(&Context::background(), source).limit(3);
        let items = collect(&mut seq);
        assert_eq!(items, vec!["K01", "K02", "K03"]);
        assert_eq!(fetches.get(), 1);
        assert!(!seq.advance());
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn test_limit_truncates_oversized_page() {
        let (mut source, _) = MockSource::new(10, 10);
        source.ignore_limit = true;
        let mut seq = Seq::new(&Context::background(), source).limit(2);
        assert_eq!(collect(&mut seq), vec!["K01", "K02"]);
    }

    #[test]
    fn test_limit_zero_never_fetches() {
        let (source, fetches) = MockSource::new(10, 5);
        let mut seq = Seq::new(&Context::background(), source).limit(0);
        assert!(collect(&mut seq).is_empty());
        assert_eq!(fetches.get(), 0);
    }

    #[test]
    fn test_resume_from_cursor_mid_stream() {
        let (source, _) = MockSource::new(8, 3);
        let unbroken = collect(&mut Seq::new(&Context::background(), source));

        let (source, _) = MockSource::new(8, 3);
        let mut seq = Seq::new(&Context::background(), source);
        let mut first = Vec::new();
        for _ in 0..4 {
            assert!(seq.advance());
            first.push(seq.head().unwrap().unwrap());
        }
        let cursor = seq.cursor();
        assert_eq!(cursor, Key::hash("k04"));

        let (source, _) = MockSource::new(8, 3);
        let mut resumed = Seq::new(&Context::background(), source).continue_from(&cursor);
        first.extend(collect(&mut resumed));
        assert_eq!(first, unbroken);
    }

    #[test]
    fn test_resume_bounded_pages() {
        let mut all = Vec::new();
        let mut cursor = Key::default();
        loop {
            let (source, fetches) = MockSource::new(7, 10);
            let mut seq = Seq::new(&Context::background(), source)
                .continue_from(&cursor)
                .limit(3);
            let page = collect(&mut seq);
            assert_eq!(fetches.get(), 1);
            if page.is_empty() {
                break;
            }
            all.extend(page);
            cursor = seq.cursor();
        }
        assert_eq!(all.len(), 7);
        assert_eq!(all.last().map(String::as_str), Some("K07"));
    }

    #[test]
    fn test_fmap_stops_on_callback_failure() {
        let (source, _) = MockSource::new(5, 2);
        let mut seq = Seq::new(&Context::background(), source);
        let mut seen = Vec::new();
        let err = seq
            .fmap(|x| {
                if seen.len() == 2 {
                    return Err(format!("cannot process {x}"));
                }
                seen.push(x);
                Ok(())
            })
            .unwrap_err();

        assert_eq!(seen, vec!["K01", "K02"]);
        match err {
            Error::ProcessEntity { key, cause } => {
                assert_eq!(key, Key::hash("k03"));
                assert_eq!(cause.to_string(), "cannot process K03");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transport_failure_is_terminal() {
        let (mut source, fetches) = MockSource::new(6, 2);
        source.fail_at = Some(1);
        let mut seq = Seq::new(&Context::background(), source);

        let err = seq.fmap(|_| Ok::<_, Error>(())).unwrap_err();
        assert!(matches!(err, Error::ServiceIO(_)));
        assert_eq!(seq.state(), SeqState::Erred);
        assert_eq!(fetches.get(), 2);

        assert!(!seq.advance());
        assert!(seq.fmap(|_| Ok::<_, Error>(())).is_err());
        assert!(seq.head().is_none());
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_decode_failure_does_not_poison_sequence() {
        let (mut source, _) = MockSource::new(3, 3);
        source.bad = Some("k02".into());
        let mut seq = Seq::new(&Context::background(), source);

        let results: Vec<Result<String>> = seq.by_ref().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::InvalidEntity(_))));
        assert_eq!(results[2].as_ref().unwrap(), "K03");
        assert!(seq.error().is_none());
    }

    #[test]
    fn test_iterator_yields_terminal_error_once() {
        let (mut source, _) = MockSource::new(4, 2);
        source.fail_at = Some(1);
        let results: Vec<Result<String>> = Seq::new(&Context::background(), source).collect();
        assert_eq!(results.len(), 3);
        assert!(results[2].is_err());
    }

    #[test]
    fn test_head_seeds_fresh_sequence() {
        let (source, _) = MockSource::new(3, 3);
        let mut seq = Seq::new(&Context::background(), source);
        assert_eq!(seq.head().unwrap().unwrap(), "K01");
        assert!(seq.advance());
        assert_eq!(seq.head().unwrap().unwrap(), "K02");
    }

    #[test]
    fn test_cancelled_context_aborts_seed() {
        let ctx = Context::background();
        let (source, fetches) = MockSource::new(3, 3);
        let mut seq = Seq::new(&ctx, source);
        ctx.cancel();

        assert!(matches!(seq.fmap(|_| Ok::<_, Error>(())), Err(Error::Cancelled)));
        assert_eq!(fetches.get(), 0);
    }

    #[test]
    fn test_failed_sequence() {
        let mut seq: Seq<MockSource> =
            Seq::failed(&Context::background(), Error::InvalidKey("empty hash key".into()));
        assert!(!seq.advance());
        assert!(matches!(seq.error(), Some(Error::InvalidKey(_))));
    }

    #[test]
    fn test_reverse_without_support_is_noop() {
        let (source, _) = MockSource::new(3, 3);
        let mut seq = Seq::new(&Context::background(), source).reverse();
        assert_eq!(collect(&mut seq), vec!["K01", "K02", "K03"]);
    }
}
