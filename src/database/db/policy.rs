use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How a key is chosen when memory must be reclaimed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MaxmemoryPolicy {
    /// Refuse writes instead of evicting.
    #[default]
    #[serde(rename = "noeviction")]
    #[strum(serialize = "noeviction")]
    NoEviction,
    /// Any key.
    AllkeysRandom,
    /// Any key with a TTL.
    VolatileRandom,
    /// Among a sample of keys with a TTL, the one expiring soonest.
    VolatileTtl,
}

impl MaxmemoryPolicy {
    /// Whether only keys carrying a TTL are candidates.
    pub fn is_volatile(self) -> bool {
        matches!(
            self,
            MaxmemoryPolicy::VolatileRandom | MaxmemoryPolicy::VolatileTtl
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("noeviction", MaxmemoryPolicy::NoEviction)]
    #[case("allkeys-random", MaxmemoryPolicy::AllkeysRandom)]
    #[case("volatile-random", MaxmemoryPolicy::VolatileRandom)]
    #[case("volatile-ttl", MaxmemoryPolicy::VolatileTtl)]
    fn test_policy_names(
        #[case] name: &str,
        #[case] policy: MaxmemoryPolicy,
    ) {
        assert_eq!(MaxmemoryPolicy::from_str(name).unwrap(), policy);
        assert_eq!(policy.to_string(), name);
        let json = format!("\"{name}\"");
        assert_eq!(serde_json::from_str::<MaxmemoryPolicy>(&json).unwrap(), policy);
    }

    #[test]
    fn test_lru_is_not_a_policy() {
        assert!(MaxmemoryPolicy::from_str("allkeys-lru").is_err());
        assert!(!MaxmemoryPolicy::AllkeysRandom.is_volatile());
        assert!(MaxmemoryPolicy::VolatileTtl.is_volatile());
    }
}
