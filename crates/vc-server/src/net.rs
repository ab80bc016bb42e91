use std::io;
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Public address used only to pick a route; nothing is ever sent to it.
const PROBE_ADDR: &str = "8.8.8.8:80";

/// Best-effort LAN address for telling a headset where to connect.
/// Falls back to loopback when no route is available.
pub async fn local_ip() -> IpAddr {
    match probe_local_ip().await {
        Ok(ip) => ip,
        Err(e) => {
            debug!("LAN IP discovery failed, using loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn probe_local_ip() -> io::Result<IpAddr> {
    // Connecting a UDP socket only selects the outbound interface.
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(PROBE_ADDR).await?;

    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no local route"));
    }
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_ip_is_usable() {
        let ip = local_ip().await;

        assert!(ip.is_ipv4());
        assert!(!ip.is_unspecified());
    }
}
