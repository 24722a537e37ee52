//! Structured network addresses.
//!
//! An address is `user@server` where the server names the address class.
//! Non-phone classes (groups, broadcast lists, channels, anonymous linked
//! devices) are validated structurally only; phone addresses additionally go
//! through the existence probe in [`crate::resolve`].

use wamux_common::GatewayError;

/// Server suffix for individual phone-number accounts.
pub const PHONE_SERVER: &str = "s.whatsapp.net";
/// Server suffix for group chats.
pub const GROUP_SERVER: &str = "g.us";
/// Server suffix for broadcast lists (including the status list).
pub const BROADCAST_SERVER: &str = "broadcast";
/// Server suffix for channels.
pub const NEWSLETTER_SERVER: &str = "newsletter";
/// Server suffix for anonymous linked-device identities.
pub const HIDDEN_USER_SERVER: &str = "lid";

/// The closed set of address classes the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Server {
    Phone,
    Group,
    Broadcast,
    Newsletter,
    HiddenUser,
}

impl Server {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            PHONE_SERVER => Some(Server::Phone),
            GROUP_SERVER => Some(Server::Group),
            BROADCAST_SERVER => Some(Server::Broadcast),
            NEWSLETTER_SERVER => Some(Server::Newsletter),
            HIDDEN_USER_SERVER => Some(Server::HiddenUser),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Server::Phone => PHONE_SERVER,
            Server::Group => GROUP_SERVER,
            Server::Broadcast => BROADCAST_SERVER,
            Server::Newsletter => NEWSLETTER_SERVER,
            Server::HiddenUser => HIDDEN_USER_SERVER,
        }
    }
}

/// A structurally valid network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub user: String,
    pub server: Server,
}

impl Address {
    /// Build a phone address from a digit string.
    pub fn phone(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: Server::Phone,
        }
    }

    /// Parse and structurally validate an already-suffixed address.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let Some((user, server)) = raw.split_once('@') else {
            return Err(GatewayError::InvalidAddress(format!(
                "{raw:?} is missing an @server suffix"
            )));
        };
        let Some(server) = Server::parse(server) else {
            return Err(GatewayError::InvalidAddress(format!(
                "{raw:?} has an unrecognized server suffix"
            )));
        };
        let address = Self {
            user: user.to_string(),
            server,
        };
        address.validate()?;
        Ok(address)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.user.is_empty() {
            return Err(GatewayError::InvalidAddress(
                "address has an empty user part".into(),
            ));
        }
        let ok = match self.server {
            // Phone users are bare digit strings; device suffixes only
            // appear in network-issued canonical forms, never in input.
            Server::Phone | Server::Newsletter | Server::HiddenUser => {
                self.user.bytes().all(|b| b.is_ascii_digit())
            }
            // Legacy group ids are `<creator>-<epoch>`.
            Server::Group => self
                .user
                .bytes()
                .all(|b| b.is_ascii_digit() || b == b'-'),
            // The status list is the non-numeric user "status".
            Server::Broadcast => self
                .user
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-'),
        };
        if ok {
            Ok(())
        } else {
            Err(GatewayError::InvalidAddress(format!(
                "{self} has invalid characters for its address class"
            )))
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.server.as_str())
    }
}
