use super::ProtocolError;

pub const DEFAULT_PORT: u16 = 1935;

/// The target of a client connection: `rtmp://host[:port]/app[/...]/streamKey`.
///
/// Every path segment but the last forms the application name, the last one is the stream
/// key (query string included).  A single segment is the application name, published or
/// played with an empty stream key.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RtmpUrl {
    pub host: String,
    pub port: u16,
    pub app: String,
    pub stream_key: String,
}

impl RtmpUrl {
    pub fn parse(url: &str) -> Result<RtmpUrl, ProtocolError> {
        let invalid = |reason| ProtocolError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let rest = url
            .strip_prefix("rtmp://")
            .ok_or_else(|| invalid("scheme must be rtmp"))?;

        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid("no application name"))?;

        let (host, port) = split_host_and_port(authority).ok_or_else(|| invalid("bad port"))?;
        if host.is_empty() {
            return Err(invalid("no host"));
        }

        let path = path.trim_start_matches('/');
        let (app, stream_key) = path.rsplit_once('/').unwrap_or((path, ""));
        if app.is_empty() {
            return Err(invalid("no application name"));
        }

        Ok(RtmpUrl {
            host: host.to_string(),
            port,
            app: app.to_string(),
            stream_key: stream_key.to_string(),
        })
    }

    /// The `tcUrl` sent in the connect request
    pub fn tc_url(&self) -> String {
        format!("rtmp://{}:{}/{}", self.host, self.port, self.app)
    }

    /// `host:port`, suitable for `TcpStream::connect()`
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn split_host_and_port(authority: &str) -> Option<(&str, u16)> {
    // bracketed IPv6 literal
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        return match after.strip_prefix(':') {
            Some(port) => Some((host, port.parse().ok()?)),
            None if after.is_empty() => Some((host, DEFAULT_PORT)),
            None => None,
        };
    }

    match authority.split_once(':') {
        Some((host, port)) => Some((host, port.parse().ok()?)),
        None => Some((authority, DEFAULT_PORT)),
    }
}
