//! Nick verification bookkeeping.
//!
//! A verification request records a pair of one-shot callbacks and the
//! nick under query, then a WHOIS goes out on the wire. Because the
//! server's replies carry only the nick, correlation is by nick: a
//! services-confirmation numeric approves every pending entry for that
//! nick, and end-of-WHOIS without one rejects them. Each entry fires
//! at most one of its two callbacks.

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// One-shot async callback attached to a verification request.
pub type IdentCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct PendingIdent {
    nick: String,
    on_approved: IdentCallback,
    on_rejected: IdentCallback,
    created_at: Instant,
}

/// Outstanding nick verification requests, resolved by WHOIS replies.
#[derive(Default)]
pub struct IdentifyRegistry {
    pending: Mutex<Vec<PendingIdent>>,
}

impl IdentifyRegistry {
    /// Record a request for `nick`. The caller is responsible for
    /// sending the matching WHOIS.
    pub fn request(&self, nick: impl Into<String>, on_approved: IdentCallback, on_rejected: IdentCallback) {
        let nick = nick.into();
        debug!(nick = %nick, "verification requested");
        self.pending.lock().push(PendingIdent {
            nick,
            on_approved,
            on_rejected,
            created_at: Instant::now(),
        });
    }

    /// Remove every entry for `nick` and return its approval callbacks.
    /// The rejection callbacks of those entries are dropped unfired.
    pub fn resolve_approved(&self, nick: &str) -> Vec<IdentCallback> {
        self.extract(nick)
            .into_iter()
            .map(|entry| entry.on_approved)
            .collect()
    }

    /// Remove every entry for `nick` and return its rejection callbacks.
    pub fn resolve_rejected(&self, nick: &str) -> Vec<IdentCallback> {
        self.extract(nick)
            .into_iter()
            .map(|entry| entry.on_rejected)
            .collect()
    }

    /// Remove entries older than `max_age` and return their rejection
    /// callbacks. WHOIS replies that never arrive count as a rejection.
    pub fn expire(&self, max_age: std::time::Duration) -> Vec<IdentCallback> {
        let now = Instant::now();
        let mut pending = self.pending.lock();
        let kept = std::mem::take(&mut *pending);
        let (stale, fresh): (Vec<_>, Vec<_>) = kept
            .into_iter()
            .partition(|entry| now.duration_since(entry.created_at) >= max_age);
        *pending = fresh;
        stale.into_iter().map(|entry| entry.on_rejected).collect()
    }

    /// Number of unresolved requests.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn extract(&self, nick: &str) -> Vec<PendingIdent> {
        let mut pending = self.pending.lock();
        let all = std::mem::take(&mut *pending);
        let (matched, rest): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.nick == nick);
        *pending = rest;
        matched
    }
}
