//! Wire grammar for a line-oriented IRC client.
//!
//! This crate covers the protocol surface the corvid client core needs:
//!
//! - [`line::LineCodec`]: reassembles raw byte chunks into CRLF-delimited
//!   lines and frames outbound payloads.
//! - [`message::Message`]: one parsed protocol line (sender prefix,
//!   command, header fields, trailing text).
//! - [`prefix::Prefix`]: the sender portion of a line, with short-nick
//!   normalization.
//! - [`ctcp::Ctcp`]: the `\x01`-delimited control envelope embedded in
//!   PRIVMSG bodies (ACTION and friends).
//!
//! # Example
//!
//! ```
//! use corvid_proto::{Command, Message};
//!
//! let msg: Message = ":serverhost 307 BotName TargetNick :is a registered nick"
//!     .parse()
//!     .unwrap();
//! assert_eq!(msg.command, Command::Numeric(307));
//! assert_eq!(msg.params, vec!["BotName", "TargetNick"]);
//! assert_eq!(msg.trailing.as_deref(), Some("is a registered nick"));
//! ```

pub mod command;
pub mod ctcp;
pub mod error;
pub mod line;
pub mod message;
pub mod prefix;

pub use command::{Command, RPL_ENDOFWHOIS, RPL_WHOISREGNICK};
pub use ctcp::{Ctcp, CtcpKind};
pub use error::{MessageParseError, ProtocolError, Result};
pub use line::LineCodec;
pub use message::Message;
pub use prefix::Prefix;
