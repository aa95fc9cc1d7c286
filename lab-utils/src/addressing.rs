//! Address plan of the emulated hosts.
//!
//! The host attached to the switch of site `id` uses the address `10.0.<id>.1/24` and the MAC
//! address `00:00:00:00:00:<id>`. Both mappings are injective and can be inverted, which allows
//! diagnostics to map an observed address back to the site it belongs to.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use mac_address::MacAddress;

/// Largest site id that fits into the address plan (a single octet).
pub const MAX_SITE_ID: u32 = u8::MAX as u32;

/// Prefix length of every host subnet.
pub const HOST_PREFIX_LEN: u8 = 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressingError {
    #[error("Site id {0} does not fit into the address plan (maximum is {MAX_SITE_ID})")]
    OutOfRange(u32),
    #[error("Address {0} is not part of the host address plan")]
    NotInPlan(String),
}

fn octet(id: u32) -> Result<u8, AddressingError> {
    u8::try_from(id).map_err(|_| AddressingError::OutOfRange(id))
}

/// Host address (including the prefix length) of site `id`, i.e., `10.0.<id>.1/24`.
pub fn host_net(id: u32) -> Result<Ipv4Net, AddressingError> {
    let ip = Ipv4Addr::new(10, 0, octet(id)?, 1);
    Ipv4Net::new(ip, HOST_PREFIX_LEN).map_err(|_| AddressingError::OutOfRange(id))
}

/// MAC address of the host of site `id`, i.e., `00:00:00:00:00:<id>`.
pub fn host_mac(id: u32) -> Result<MacAddress, AddressingError> {
    Ok(MacAddress::new([0, 0, 0, 0, 0, octet(id)?]))
}

/// Format a MAC address with lowercase hex digits (the notation used by the emulation runtime).
pub fn format_mac(mac: &MacAddress) -> String {
    mac.bytes().iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

/// Inverse of [`host_net`], accepting the plain host address.
pub fn site_from_ip(ip: Ipv4Addr) -> Result<u32, AddressingError> {
    match ip.octets() {
        [10, 0, id, 1] => Ok(id as u32),
        _ => Err(AddressingError::NotInPlan(ip.to_string())),
    }
}

/// Inverse of [`host_net`].
pub fn site_from_net(net: &Ipv4Net) -> Result<u32, AddressingError> {
    if net.prefix_len() != HOST_PREFIX_LEN {
        return Err(AddressingError::NotInPlan(net.to_string()));
    }
    site_from_ip(net.addr())
}

/// Inverse of [`host_mac`].
pub fn site_from_mac(mac: &MacAddress) -> Result<u32, AddressingError> {
    match mac.bytes() {
        [0, 0, 0, 0, 0, id] => Ok(id as u32),
        _ => Err(AddressingError::NotInPlan(format_mac(mac))),
    }
}
