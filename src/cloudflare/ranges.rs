use std::fmt;

/// Address family of a published range list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Path of the list on the Cloudflare site
    pub fn path(self) -> &'static str {
        match self {
            IpVersion::V4 => "ips-v4",
            IpVersion::V6 => "ips-v6",
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Split a newline-delimited range list into entries.
///
/// Lines are trimmed and blank lines dropped, so a trailing newline or CRLF
/// endings never produce an empty entry.
pub fn parse_ip_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
