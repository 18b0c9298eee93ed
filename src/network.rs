//! Detection of the network the host is attached to
//!
//! A network is identified by a CIDR string. The host is considered part of
//! the network if any of its interface addresses lies inside the prefix.

use crate::config::NetworkProfile;
use anyhow::{Context, Result};
use ipnet::IpNet;
use log::debug;
use std::net::IpAddr;

/// Parse a CIDR string, `None` if it is empty (network disabled)
pub fn parse_cidr(cidr: &str) -> Result<Option<IpNet>> {
    if cidr.is_empty() {
        return Ok(None);
    }

    cidr.parse::<IpNet>()
        .map(Some)
        .with_context(|| format!("failed to parse CIDR address {cidr:?}"))
}

/// Addresses of the local network interfaces
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceAddrs(Vec<IpAddr>);

impl InterfaceAddrs {
    /// Enumerate the IPv4 and IPv6 addresses of all local interfaces
    pub fn discover() -> Result<Self> {
        let addrs = local_ip_address::list_afinet_netifas()
            .context("failed to list local interface addresses")?
            .into_iter()
            .map(|(name, addr)| {
                debug!("found interface {name} with address {addr}");
                addr
            })
            .collect();

        Ok(Self(addrs))
    }

    pub fn contains_any(&self, net: &IpNet) -> bool {
        self.0.iter().any(|addr| net.contains(addr))
    }

    /// Whether any address lies inside `cidr`; an empty `cidr` never matches
    pub fn in_network(&self, cidr: &str) -> Result<bool> {
        Ok(parse_cidr(cidr)?.is_some_and(|net| self.contains_any(&net)))
    }
}

impl From<Vec<IpAddr>> for InterfaceAddrs {
    fn from(addrs: Vec<IpAddr>) -> Self {
        Self(addrs)
    }
}

/// Returns whether the host is connected to the network identified by `cidr`
///
/// An empty `cidr` is not an error and yields `false` without enumerating
/// the local interfaces.
pub fn is_in_network(cidr: &str) -> Result<bool> {
    let Some(net) = parse_cidr(cidr)? else {
        return Ok(false);
    };

    Ok(InterfaceAddrs::discover()?.contains_any(&net))
}

/// Returns the first profile whose network the host is connected to
///
/// Profiles are checked in order and checking stops at the first match.
pub fn select_profile<'a>(
    profiles: &'a [NetworkProfile],
    mut is_member: impl FnMut(&str) -> Result<bool>,
) -> Result<Option<&'a NetworkProfile>> {
    for profile in profiles {
        if is_member(&profile.cidr)? {
            debug!("connected to network {} ({})", profile.label, profile.cidr);
            return Ok(Some(profile));
        }
    }

    Ok(None)
}
