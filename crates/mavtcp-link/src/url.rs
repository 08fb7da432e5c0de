use std::fmt;
use std::str::FromStr;

use mavtcp_frame::Identity;

use crate::config::{ServerConfig, DEFAULT_PORT};
use crate::connection::TcpConnection;
use crate::error::{LinkError, Result};
use crate::interface::MavConnection;
use crate::server::TcpServer;

const DEFAULT_HOST: &str = "localhost";

/// Which side of a TCP link a URL describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `tcp://host:port`: connect out.
    Client,
    /// `tcp-l://host:port`: listen for clients.
    Server,
}

impl Role {
    pub fn scheme(self) -> &'static str {
        match self {
            Role::Client => "tcp",
            Role::Server => "tcp-l",
        }
    }
}

/// Parsed link URL.
///
/// Form: `tcp://[host][:port][/][?ids=sysid,compid]` or the same with
/// `tcp-l`. Host defaults to `localhost`, port to 5760; IPv6 hosts must be
/// bracketed. `ids` overrides the link identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    pub role: Role,
    pub host: String,
    pub port: u16,
    pub ids: Option<Identity>,
}

impl ConnectionUrl {
    pub fn client(host: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Client,
            host: host.into(),
            port,
            ids: None,
        }
    }

    pub fn server(host: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Server,
            host: host.into(),
            port,
            ids: None,
        }
    }
}

impl FromStr for ConnectionUrl {
    type Err = LinkError;

    fn from_str(url: &str) -> Result<Self> {
        let invalid = |reason: &str| LinkError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid("missing '://'"))?;
        let role = match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Role::Client,
            "tcp-l" => Role::Server,
            _ => return Err(LinkError::UnsupportedScheme(scheme.to_string())),
        };

        let (authority, query) = match rest.split_once('?') {
            Some((authority, query)) => (authority, Some(query)),
            None => (rest, None),
        };
        let authority = authority.split('/').next().unwrap_or_default();

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?;
            match after {
                "" => (host, None),
                _ => {
                    let port = after
                        .strip_prefix(':')
                        .ok_or_else(|| invalid("unexpected text after ']'"))?;
                    (host, Some(port))
                }
            }
        } else {
            match authority.split_once(':') {
                Some((_, port)) if port.contains(':') => {
                    return Err(invalid("IPv6 hosts must be enclosed in brackets"));
                }
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        let port = match port {
            None | Some("") => DEFAULT_PORT,
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| invalid("port must be a number between 0 and 65535"))?,
        };
        let host = if host.is_empty() { DEFAULT_HOST } else { host };

        let ids = match query {
            Some(query) => parse_ids(query).map_err(invalid)?,
            None => None,
        };

        Ok(Self {
            role,
            host: host.to_string(),
            port,
            ids,
        })
    }
}

fn parse_ids(query: &str) -> std::result::Result<Option<Identity>, &'static str> {
    let mut ids = None;
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != "ids" {
            return Err("unknown query parameter");
        }
        let (sysid, compid) = value
            .split_once(',')
            .ok_or("ids must be 'sysid,compid'")?;
        let sysid = sysid.trim().parse().map_err(|_| "invalid system id")?;
        let compid = compid.trim().parse().map_err(|_| "invalid component id")?;
        ids = Some(Identity::new(sysid, compid));
    }
    Ok(ids)
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.role.scheme())?;
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)?;
        } else {
            write!(f, "{}:{}", self.host, self.port)?;
        }
        if let Some(ids) = self.ids {
            write!(f, "/?ids={},{}", ids.system_id, ids.component_id)?;
        }
        Ok(())
    }
}

/// Open the link a URL describes.
///
/// `tcp://` connects a [`TcpConnection`] using `config.link`; `tcp-l://`
/// binds a [`TcpServer`] with the whole `config`. An `ids` parameter in the
/// URL overrides the configured identity.
pub fn open(url: &ConnectionUrl, mut config: ServerConfig) -> Result<Box<dyn MavConnection>> {
    if let Some(ids) = url.ids {
        config.link.identity = ids;
    }
    match url.role {
        Role::Client => Ok(Box::new(TcpConnection::connect(
            &url.host,
            url.port,
            config.link,
        )?)),
        Role::Server => Ok(Box::new(TcpServer::bind(&url.host, url.port, config)?)),
    }
}
