//! Command dispatch.
//!
//! Incoming messages are routed through a table keyed by parsed
//! command. Handlers are registered once at startup and borrow the
//! message fields through a [`Context`] for the duration of one call.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use corvid_proto::Command;

use crate::session::SessionHandle;

/// Outcome of one handler invocation.
pub type HandlerResult = crate::error::Result<()>;

/// Per-message view handed to a handler.
pub struct Context<'a> {
    /// Short sender name (nick, or server name for server-origin lines).
    pub sender: &'a str,
    /// Middle parameters of the message.
    pub params: &'a [String],
    /// Trailing text, empty when the message carries none.
    pub trailing: &'a str,
    /// Handle for sending replies and issuing further requests.
    pub session: &'a SessionHandle,
}

/// A unit of behavior bound to one command.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult;
}

/// Command-to-handler table. At most one handler per command; binding
/// a command twice replaces the earlier handler.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<Command, Box<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `command`, replacing any previous binding.
    pub fn bind(&mut self, command: Command, handler: Box<dyn Handler>) {
        self.handlers.insert(command, handler);
    }

    /// Invoke the handler bound to `command`. Unbound commands are
    /// dropped silently.
    pub async fn dispatch(&self, command: &Command, ctx: &mut Context<'_>) -> HandlerResult {
        match self.handlers.get(command) {
            Some(handler) => handler.handle(ctx).await,
            None => {
                debug!(command = %command, "no handler bound, dropping");
                Ok(())
            }
        }
    }

    /// Whether any handler is bound to `command`.
    pub fn is_bound(&self, command: &Command) -> bool {
        self.handlers.contains_key(command)
    }
}
