use serde::{Deserialize, Serialize};

/// Optional middleware hooks, enabled by their presence in the
/// configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct Middleware {
    /// Admission control by infohash.
    #[serde(default)]
    pub torrent_approval: Option<TorrentApproval>,

    /// Per-response randomization of the announce interval.
    #[serde(default)]
    pub interval_variation: Option<IntervalVariation>,
}

/// Admission control lists. Exactly one of the two lists should be used:
/// a non-empty `whitelist` serves only the listed torrents; otherwise the
/// `blacklist` refuses the listed torrents.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct TorrentApproval {
    /// Hex-encoded infohashes of the only torrents to serve.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Hex-encoded infohashes of torrents to refuse.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Settings for the interval-variation hook.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct IntervalVariation {
    /// Chance, in `[0, 1]`, that a response gets its interval bumped.
    #[serde(default = "IntervalVariation::default_modify_probability")]
    pub modify_probability: f64,

    /// Upper bound for the random bump, in seconds.
    #[serde(default = "IntervalVariation::default_max_increase_delta")]
    pub max_increase_delta: u32,

    /// Bump the minimum interval along with the interval.
    #[serde(default)]
    pub modify_min_interval: bool,
}

impl Default for IntervalVariation {
    fn default() -> Self {
        Self {
            modify_probability: Self::default_modify_probability(),
            max_increase_delta: Self::default_max_increase_delta(),
            modify_min_interval: false,
        }
    }
}

impl IntervalVariation {
    fn default_modify_probability() -> f64 {
        0.2
    }

    fn default_max_increase_delta() -> u32 {
        60
    }
}
