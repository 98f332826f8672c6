//! Parsed protocol messages.
//!
//! A [`Message`] is one delimiter-stripped line, taken apart into the
//! sender prefix, the command, the header fields between command and
//! trailing marker, and the trailing free text.
//!
//! The parser targets server-to-client lines, which always carry a
//! sender token (the leading `:` marker itself is optional). Lines the
//! client builds for sending carry no prefix and are produced through
//! the constructors plus `Display`.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// One parsed protocol line. Immutable once constructed, except for
/// the ACTION reclassification the session applies to peer messages.
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    /// Sender prefix; `None` only for client-built outbound messages.
    pub prefix: Option<Prefix>,
    /// The command, numeric code, or synthetic/unknown kind.
    pub command: Command,
    /// Header fields between the command and the trailing marker.
    pub params: Vec<String>,
    /// Free text after the trailing marker, marker stripped.
    pub trailing: Option<String>,
}

impl Message {
    /// Create an outbound message from raw components.
    pub fn new(command: Command, params: Vec<String>, trailing: Option<String>) -> Self {
        Self {
            prefix: None,
            command,
            params,
            trailing,
        }
    }

    /// The short sender: nick for user prefixes, name otherwise.
    /// Empty for client-built messages.
    pub fn sender(&self) -> &str {
        self.prefix.as_ref().map(Prefix::name).unwrap_or("")
    }

    /// Create a PRIVMSG to a target with text.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Command::Privmsg, vec![target.into()], Some(text.into()))
    }

    /// Create a JOIN for a channel.
    pub fn join(channel: impl Into<String>) -> Self {
        Self::new(Command::Join, vec![channel.into()], None)
    }

    /// Create a NICK message.
    pub fn nick(nickname: impl Into<String>) -> Self {
        Self::new(Command::Nick, vec![nickname.into()], None)
    }

    /// Create a USER registration message.
    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            Command::User,
            vec![name.clone(), name.clone(), name],
            Some(description.into()),
        )
    }

    /// Create a WHOIS identity query for a nick.
    pub fn whois(nick: impl Into<String>) -> Self {
        Self::new(Command::Whois, vec![nick.into()], None)
    }

    /// Create a QUIT with a parting message.
    pub fn quit(message: impl Into<String>) -> Self {
        Self::new(Command::Quit, Vec::new(), Some(message.into()))
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            line: s.to_owned(),
            cause,
        };

        let stripped = s.trim_end_matches(['\r', '\n']);
        if stripped.is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        // Optional leading sender marker
        let rest = stripped.strip_prefix(':').unwrap_or(stripped);

        // Split off the trailing text at the first trailing marker
        let (header, trailing) = match rest.split_once(" :") {
            Some((h, t)) => (h, Some(t.to_owned())),
            None => (rest, None),
        };

        let mut tokens = header.split_whitespace();
        let sender = tokens
            .next()
            .ok_or_else(|| invalid(MessageParseError::TruncatedHeader))?;
        let command = tokens
            .next()
            .ok_or_else(|| invalid(MessageParseError::TruncatedHeader))?;
        let params: Vec<String> = tokens.map(str::to_owned).collect();

        Ok(Message {
            prefix: Some(Prefix::parse(sender)),
            command: Command::parse(command),
            params,
            trailing,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}
