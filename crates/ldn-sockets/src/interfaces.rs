use std::net::IpAddr;

#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
/// Trait to get IF Address
pub trait GetIfAddrs: Send + Sync + 'static {
    /// Addresses of every local interface.
    fn get(&self) -> std::io::Result<Vec<if_addrs::Interface>>;
}

#[derive(Default)]
/// Reads the interfaces of the running system.
pub struct SystemGetIfAddrs;

impl GetIfAddrs for SystemGetIfAddrs {
    fn get(&self) -> std::io::Result<Vec<if_addrs::Interface>> {
        if_addrs::get_if_addrs()
    }
}

/// Address other nodes on the same LAN can reach this host on.
pub fn local_interface<G: GetIfAddrs + ?Sized>(get_if_addr: &G) -> std::io::Result<Option<IpAddr>> {
    Ok(pick_lan_address(
        get_if_addr
            .get()?
            .into_iter()
            .filter(|x| !x.is_loopback())
            .map(|x| x.ip()),
    ))
}

/// First IPv4 address if any, first address otherwise. Loopback is never picked.
fn pick_lan_address(addrs: impl IntoIterator<Item = IpAddr>) -> Option<IpAddr> {
    let addrs: Vec<IpAddr> = addrs.into_iter().filter(|ip| !ip.is_loopback()).collect();
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
