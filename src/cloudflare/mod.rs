//! Cloudflare integration for the sync service.
//! This module fetches the IPv4 and IPv6 ranges Cloudflare publishes for
//! its edge network.

mod client;
mod ranges;

pub use client::{CloudflareIpSource, IpRangeSource};
pub use ranges::{parse_ip_list, IpVersion};

#[cfg(test)]
pub use client::MockIpRangeSource;
