//! Async chat-protocol client core.
//!
//! The crate connects to a server, keeps the connection registered and
//! alive, and routes inbound messages to user-supplied handlers:
//!
//! - [`session::Session`] owns the lifecycle: connect, register, pump
//!   messages, reconnect after a pause, stop on request.
//! - [`writer::OutputBuffer`] paces outbound traffic so the client
//!   stays under server flood limits, with an immediate path for
//!   keep-alive replies.
//! - [`dispatch::Registry`] maps parsed commands to [`dispatch::Handler`]
//!   implementations.
//! - [`identify::IdentifyRegistry`] correlates WHOIS replies back to
//!   pending nick-verification requests.
//!
//! Wire-format concerns (framing, parsing, CTCP) live in the
//! [`proto`] crate.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod identify;
pub mod session;
pub mod transport;
pub mod writer;

pub use corvid_proto as proto;

pub use config::BotConfig;
pub use dispatch::{Context, Handler, HandlerResult, Registry};
pub use error::{ClientError, Result};
pub use identify::{IdentCallback, IdentifyRegistry};
pub use session::{Session, SessionHandle, SessionState};
pub use transport::{BoxedReader, BoxedWriter, Connector, TcpConnector};
pub use writer::OutputBuffer;
