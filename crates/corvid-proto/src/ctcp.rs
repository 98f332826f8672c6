//! CTCP (Client-to-Client Protocol) envelope handling.
//!
//! CTCP messages are embedded within PRIVMSG bodies between `\x01`
//! delimiter characters. The one the client core cares about is
//! ACTION (`/me`), which gets reclassified into a synthetic message
//! kind; the rest are exposed for handler code.
//!
//! # Example
//!
//! ```
//! use corvid_proto::ctcp::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Action);
//! assert_eq!(ctcp.params.as_deref(), Some("waves"));
//!
//! assert_eq!(Ctcp::action("dances").to_string(), "\x01ACTION dances\x01");
//! ```

use std::fmt;

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// Known CTCP command types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// ACTION - an action performed by the user (`/me`).
    Action,
    /// VERSION - client version request or reply.
    Version,
    /// PING - round-trip latency probe.
    Ping,
    /// Unknown or custom CTCP command.
    Unknown(String),
}

impl CtcpKind {
    /// Parse a CTCP command name.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Canonical uppercase name of this command.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed CTCP envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    /// The CTCP command type.
    pub kind: CtcpKind,
    /// Optional parameters following the command.
    pub params: Option<String>,
}

impl Ctcp {
    /// Parse a CTCP envelope from a PRIVMSG body.
    ///
    /// Returns `None` if the body is not a CTCP message. A missing
    /// trailing delimiter is tolerated; some clients omit it.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);

        if text.is_empty() {
            return None;
        }

        let (command, params) = match text.find(' ') {
            Some(pos) => {
                let params = &text[pos + 1..];
                (
                    &text[..pos],
                    if params.is_empty() {
                        None
                    } else {
                        Some(params.to_owned())
                    },
                )
            }
            None => (text, None),
        };

        Some(Self {
            kind: CtcpKind::parse(command),
            params,
        })
    }

    /// Check if a message body starts a CTCP envelope.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(CTCP_DELIM)
    }

    /// Create an ACTION envelope.
    pub fn action(text: impl Into<String>) -> Self {
        Self {
            kind: CtcpKind::Action,
            params: Some(text.into()),
        }
    }
}

impl fmt::Display for Ctcp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x01{}", self.kind)?;
        if let Some(ref params) = self.params {
            write!(f, " {}", params)?;
        }
        write!(f, "\x01")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Action);
        assert_eq!(ctcp.params.as_deref(), Some("waves hello"));
    }

    #[test]
    fn test_parse_version_no_params() {
        let ctcp = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Version);
        assert_eq!(ctcp.params, None);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let ctcp = Ctcp::parse("\x01action waves\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Action);
    }

    #[test]
    fn test_parse_missing_trailing_delim() {
        let ctcp = Ctcp::parse("\x01ACTION waves").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Action);
        assert_eq!(ctcp.params.as_deref(), Some("waves"));
    }

    #[test]
    fn test_parse_unknown() {
        let ctcp = Ctcp::parse("\x01CUSTOM foo bar\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Unknown("CUSTOM".to_owned()));
        assert_eq!(ctcp.params.as_deref(), Some("foo bar"));
    }

    #[test]
    fn test_parse_not_ctcp() {
        assert!(Ctcp::parse("hello world").is_none());
        assert!(Ctcp::parse("").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
    }

    #[test]
    fn test_is_ctcp() {
        assert!(Ctcp::is_ctcp("\x01ACTION waves\x01"));
        assert!(!Ctcp::is_ctcp("hello world"));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Ctcp::action("dances").to_string(), "\x01ACTION dances\x01");
    }

    #[test]
    fn test_round_trip() {
        let original = "\x01ACTION does something\x01";
        let parsed = Ctcp::parse(original).unwrap();
        assert_eq!(parsed.to_string(), original);
    }
}
