//! Ownership tokens for host objects held by native objects.
//!
//! The engine never sees a host pointer. Wrapping a host object mints a
//! token, an opaque integer id, and stores the host reference in this
//! table. The native object carries only the token; its finalizer hands
//! the token back and the table drops the reference, after which the host
//! object is freed once host code lets go of it as well.
//!
//! Uses DashMap so wraps on one thread and finalizers on another never
//! contend on a single lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::object::HostRef;

/// Opaque id of one wrap operation. Zero is never minted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub fn from_raw(raw: u64) -> Option<Token> {
        (raw != 0).then_some(Token(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token -> host reference table
pub struct TokenTable {
    entries: DashMap<Token, HostRef>,
    next: AtomicU64,
    released: AtomicU64,
}

static TOKENS: Lazy<TokenTable> = Lazy::new(TokenTable::new);

impl TokenTable {
    pub fn new() -> Self {
        TokenTable {
            entries: DashMap::new(),
            next: AtomicU64::new(1),
            released: AtomicU64::new(0),
        }
    }

    /// The process-wide table shared by every context
    pub fn global() -> &'static TokenTable {
        &TOKENS
    }

    /// Store a reference and mint a fresh token for it
    pub fn mint(&self, host: HostRef) -> Token {
        let token = Token(self.next.fetch_add(1, Ordering::SeqCst));
        self.entries.insert(token, host);
        token
    }

    pub fn get(&self, token: Token) -> Option<HostRef> {
        self.entries.get(&token).map(|entry| entry.value().clone())
    }

    /// Remove a token, returning the reference it held.
    ///
    /// Only the first release of a token returns `Some`.
    pub fn release(&self, token: Token) -> Option<HostRef> {
        let (_, host) = self.entries.remove(&token)?;
        self.released.fetch_add(1, Ordering::SeqCst);
        Some(host)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains_key(&token)
    }

    /// Number of tokens currently outstanding
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total tokens minted so far
    pub fn minted(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }

    /// Total tokens released so far
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        TokenTable::new()
    }
}
