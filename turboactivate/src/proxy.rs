//! Proxy addresses for network calls made by the engine.
//!
//! Form: `scheme://[user[:password]@]host[:port]/`. The engine falls back to
//! port 1080 when none is given.

use crate::error::{LicenseResult, TurboActivateError};
use std::fmt;
use std::str::FromStr;

/// Port used when the address does not name one.
pub const DEFAULT_PROXY_PORT: u16 = 1080;

/// A parsed proxy address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    host: String,
    port: Option<u16>,
}

impl ProxyAddress {
    /// Parses an address.
    ///
    /// # Errors
    ///
    /// Returns [`TurboActivateError::InvalidProxy`] when the scheme or host
    /// is missing, the port is not a number, or anything follows the `/`.
    pub fn parse(address: &str) -> LicenseResult<Self> {
        let invalid =
            |reason: &str| TurboActivateError::InvalidProxy(format!("'{address}': {reason}"));

        let (scheme, rest) = address
            .trim()
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme_ok = scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if scheme.is_empty() || !scheme_ok {
            return Err(invalid("invalid scheme"));
        }

        let (credentials, host_part) = match rest.rsplit_once('@') {
            Some((credentials, host_part)) => (Some(credentials), host_part),
            None => (None, rest),
        };

        let host_port = match host_part.split_once('/') {
            Some((host_port, "")) => host_port,
            Some(_) => return Err(invalid("unexpected path after host")),
            None => host_part,
        };

        let (username, password) = match credentials {
            None => (None, None),
            Some(credentials) => match credentials.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(credentials.to_string()), None),
            },
        };
        match username.as_deref() {
            Some("") => return Err(invalid("empty user name")),
            Some(user) if user.contains('/') => return Err(invalid("unexpected path after host")),
            _ => {}
        }

        let (host, port) = split_host_port(host_port).map_err(invalid)?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            username,
            password,
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the explicit port, if any.
    #[must_use]
    pub fn explicit_port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the port the engine will connect to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PROXY_PORT)
    }
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>), &'static str> {
    // Bracketed IPv6 literal
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or("unterminated IPv6 literal")?;
        return match after.strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(port)?))),
            None if after.is_empty() => Ok((host, None)),
            None => Err("unexpected characters after IPv6 literal"),
        };
    }

    match host_port.split_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((host_port, None)),
    }
}

fn parse_port(port: &str) -> Result<u16, &'static str> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err("invalid port"),
        Ok(port) => Ok(port),
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.username {
            f.write_str(user)?;
            if let Some(pass) = &self.password {
                write!(f, ":{pass}")?;
            }
            f.write_str("@")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str("/")
    }
}

impl FromStr for ProxyAddress {
    type Err = TurboActivateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
