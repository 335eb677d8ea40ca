//! Builds the announcer's peer representations from a request.
//!
//! A tracker mostly ignores the IP address a client advertises and uses
//! the packet source instead; anything else makes address spoofing
//! trivial. The configured [`SpoofingPolicy`] decides what happens when a
//! client does advertise an address, and `filter_private_ips` drops
//! advertised addresses that could never be dialed from the internet.
use std::net::IpAddr;

use swarm_tracker_configuration::{Core, SpoofingPolicy};
use swarm_tracker_primitives::peer::{Id, Peer};

/// The peer entries an announce stands for: the source-address peer, plus
/// the advertised-address peer when the policy honors it.
#[must_use]
pub fn from_request(peer_id: Id, port: u16, source_ip: IpAddr, advertised_ip: Option<IpAddr>, config: &Core) -> Vec<Peer> {
    let source_peer = Peer {
        peer_id,
        peer_addr: std::net::SocketAddr::new(source_ip, port),
    };

    let advertised_peer = advertised_ip
        .filter(|_| config.allow_ip_spoofing)
        .filter(|ip| *ip != source_ip)
        .filter(|ip| !(config.filter_private_ips && is_private_ip(ip)))
        .map(|ip| Peer {
            peer_id,
            peer_addr: std::net::SocketAddr::new(ip, port),
        });

    match (config.spoofing_policy, advertised_peer) {
        (SpoofingPolicy::PreferAdvertised, Some(advertised)) => vec![advertised],
        (SpoofingPolicy::AppendAdvertised, Some(advertised)) => vec![source_peer, advertised],
        _ => vec![source_peer],
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        // fc00::/7 unique-local and fe80::/10 link-local
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00 || (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use swarm_tracker_configuration::{Core, SpoofingPolicy};
    use swarm_tracker_primitives::peer::Id;

    use super::from_request;

    fn sample_id() -> Id {
        Id(*b"-qB00000000000000001")
    }

    fn source_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))
    }

    fn advertised_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, 42))
    }

    #[test]
    fn the_source_address_should_be_used_by_default() {
        let config = Core::default();

        let peers = from_request(sample_id(), 6881, source_ip(), Some(advertised_ip()), &config);

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].peer_addr.ip(), source_ip());
        assert_eq!(peers[0].peer_addr.port(), 6881);
    }

    #[test]
    fn the_advertised_address_should_be_ignored_unless_spoofing_is_allowed() {
        let config = Core {
            spoofing_policy: SpoofingPolicy::PreferAdvertised,
            allow_ip_spoofing: false,
            ..Core::default()
        };

        let peers = from_request(sample_id(), 6881, source_ip(), Some(advertised_ip()), &config);

        assert_eq!(peers[0].peer_addr.ip(), source_ip());
    }

    #[test]
    fn prefer_advertised_should_replace_the_source_address() {
        let config = Core {
            spoofing_policy: SpoofingPolicy::PreferAdvertised,
            allow_ip_spoofing: true,
            ..Core::default()
        };

        let peers = from_request(sample_id(), 6881, source_ip(), Some(advertised_ip()), &config);

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].peer_addr.ip(), advertised_ip());
    }

    #[test]
    fn append_advertised_should_keep_the_source_and_add_a_candidate() {
        let config = Core {
            spoofing_policy: SpoofingPolicy::AppendAdvertised,
            allow_ip_spoofing: true,
            ..Core::default()
        };

        let peers = from_request(sample_id(), 6881, source_ip(), Some(advertised_ip()), &config);

        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].peer_addr.ip(), source_ip());
        assert_eq!(peers[1].peer_addr.ip(), advertised_ip());
    }

    #[test]
    fn a_private_advertised_address_should_be_dropped_when_filtering_is_on() {
        let config = Core {
            spoofing_policy: SpoofingPolicy::PreferAdvertised,
            allow_ip_spoofing: true,
            filter_private_ips: true,
            ..Core::default()
        };

        let private = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        let peers = from_request(sample_id(), 6881, source_ip(), Some(private), &config);

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].peer_addr.ip(), source_ip());
    }
}
