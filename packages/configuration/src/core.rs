use serde::{Deserialize, Serialize};

/// How to treat the IP address a client advertises inside its announce
/// request when it differs from the packet source address.
///
/// BEP 15 carries an optional IP field, but honoring it blindly lets
/// anybody insert arbitrary addresses into a swarm.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpoofingPolicy {
    /// Ignore the advertised address; the packet source is the peer.
    #[default]
    SourceOnly,
    /// Use the advertised address when present, the source otherwise.
    /// Only honored when `allow_ip_spoofing` is enabled.
    PreferAdvertised,
    /// The source address is the peer; the advertised address is stored as
    /// an additional swarm candidate. Only honored when `allow_ip_spoofing`
    /// is enabled.
    AppendAdvertised,
}

/// Core tracker policies, shared by every frontend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Core {
    /// Interval in seconds that clients should wait between announces.
    #[serde(default = "Core::default_announce_interval")]
    pub announce_interval: u32,

    /// Minimum announce interval, in seconds.
    #[serde(default = "Core::default_min_announce_interval")]
    pub min_announce_interval: u32,

    /// Upper bound for the `numwant` request parameter.
    #[serde(default = "Core::default_max_numwant")]
    pub max_numwant: u32,

    /// Peer count handed out when the client does not ask for a specific
    /// number.
    #[serde(default = "Core::default_default_numwant")]
    pub default_numwant: u32,

    /// Maximum number of infohashes accepted in a single scrape request.
    #[serde(default = "Core::default_max_scrape_infohashes")]
    pub max_scrape_infohashes: u32,

    /// Master switch for honoring client-advertised IP addresses.
    #[serde(default)]
    pub allow_ip_spoofing: bool,

    /// What to do with an advertised IP that contradicts the source IP.
    #[serde(default)]
    pub spoofing_policy: SpoofingPolicy,

    /// Drop peers whose resolved address is in a private range.
    #[serde(default)]
    pub filter_private_ips: bool,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            announce_interval: Self::default_announce_interval(),
            min_announce_interval: Self::default_min_announce_interval(),
            max_numwant: Self::default_max_numwant(),
            default_numwant: Self::default_default_numwant(),
            max_scrape_infohashes: Self::default_max_scrape_infohashes(),
            allow_ip_spoofing: false,
            spoofing_policy: SpoofingPolicy::default(),
            filter_private_ips: false,
        }
    }
}

impl Core {
    fn default_announce_interval() -> u32 {
        1800
    }

    fn default_min_announce_interval() -> u32 {
        900
    }

    fn default_max_numwant() -> u32 {
        100
    }

    fn default_default_numwant() -> u32 {
        50
    }

    fn default_max_scrape_infohashes() -> u32 {
        50
    }
}
