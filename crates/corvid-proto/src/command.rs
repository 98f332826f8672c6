//! Message commands.
//!
//! The command token of a line is either a textual command name or a
//! three-digit numeric reply code, plus the synthetic ACTION kind
//! carved out of CTCP-wrapped PRIVMSGs for dispatch purposes.
//! Anything the client core has no dedicated handling for is kept as
//! [`Command::Unknown`] with the wire token preserved verbatim.

use std::fmt;

/// Numeric reply: the WHOIS subject is a registered/identified nick.
pub const RPL_WHOISREGNICK: u16 = 307;
/// Numeric reply: end of WHOIS output for the subject nick.
pub const RPL_ENDOFWHOIS: u16 = 318;

/// A message command, as a closed set of kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    /// PRIVMSG - message to a channel or nick.
    Privmsg,
    /// NOTICE - notice to a channel or nick.
    Notice,
    /// JOIN - join a channel.
    Join,
    /// PART - leave a channel.
    Part,
    /// NICK - set or change nickname.
    Nick,
    /// USER - registration identity and description.
    User,
    /// WHOIS - identity query for a nick.
    Whois,
    /// PING - keep-alive probe.
    Ping,
    /// PONG - keep-alive reply.
    Pong,
    /// QUIT - terminate the session.
    Quit,
    /// Synthetic kind for CTCP ACTION bodies; never appears on the wire.
    Action,
    /// Three-digit numeric reply code.
    Numeric(u16),
    /// Any other command, wire token preserved.
    Unknown(String),
}

impl Command {
    /// Parse a command token.
    pub fn parse(token: &str) -> Self {
        if token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = token.parse::<u16>() {
                return Self::Numeric(code);
            }
        }
        match token.to_ascii_uppercase().as_str() {
            "PRIVMSG" => Self::Privmsg,
            "NOTICE" => Self::Notice,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "NICK" => Self::Nick,
            "USER" => Self::User,
            "WHOIS" => Self::Whois,
            "PING" => Self::Ping,
            "PONG" => Self::Pong,
            "QUIT" => Self::Quit,
            _ => Self::Unknown(token.to_owned()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Privmsg => f.write_str("PRIVMSG"),
            Self::Notice => f.write_str("NOTICE"),
            Self::Join => f.write_str("JOIN"),
            Self::Part => f.write_str("PART"),
            Self::Nick => f.write_str("NICK"),
            Self::User => f.write_str("USER"),
            Self::Whois => f.write_str("WHOIS"),
            Self::Ping => f.write_str("PING"),
            Self::Pong => f.write_str("PONG"),
            Self::Quit => f.write_str("QUIT"),
            Self::Action => f.write_str("ACTION"),
            Self::Numeric(code) => write!(f, "{:03}", code),
            Self::Unknown(token) => f.write_str(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_textual() {
        assert_eq!(Command::parse("PRIVMSG"), Command::Privmsg);
        assert_eq!(Command::parse("privmsg"), Command::Privmsg);
        assert_eq!(Command::parse("JOIN"), Command::Join);
        assert_eq!(Command::parse("WHOIS"), Command::Whois);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(Command::parse("307"), Command::Numeric(RPL_WHOISREGNICK));
        assert_eq!(Command::parse("318"), Command::Numeric(RPL_ENDOFWHOIS));
        assert_eq!(Command::parse("001"), Command::Numeric(1));
    }

    #[test]
    fn test_parse_numeric_shape_must_be_three_digits() {
        // "31" and "3181" are not reply codes
        assert_eq!(Command::parse("31"), Command::Unknown("31".into()));
        assert_eq!(Command::parse("3181"), Command::Unknown("3181".into()));
        assert_eq!(Command::parse("3a1"), Command::Unknown("3a1".into()));
    }

    #[test]
    fn test_unknown_preserves_wire_token() {
        let cmd = Command::parse("WaLlOpS");
        assert_eq!(cmd, Command::Unknown("WaLlOpS".into()));
        assert_eq!(cmd.to_string(), "WaLlOpS");
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Privmsg.to_string(), "PRIVMSG");
        assert_eq!(Command::Numeric(1).to_string(), "001");
        assert_eq!(Command::Numeric(307).to_string(), "307");
        assert_eq!(Command::Action.to_string(), "ACTION");
    }
}
