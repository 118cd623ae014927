use std::fmt;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Serialize, Serializer};

use crate::error::SynthError;

/// An IPv4 network in CIDR notation with no host bits set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Cidr(Ipv4Net);

impl Ipv4Cidr {
    fn from_net(net: Ipv4Net) -> Result<Self, SynthError> {
        if net.trunc() != net {
            return Err(SynthError::invalid_value(
                "cidr block",
                net.to_string(),
                "host bits must be zero",
            ));
        }
        Ok(Self(net))
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.0.contains(&other.0)
    }

    /// Returns the `index`-th subnet of size `/new_prefix` inside this block.
    pub fn subnet(&self, new_prefix: u8, index: u32) -> Result<Ipv4Cidr, SynthError> {
        let mut subnets = self.0.subnets(new_prefix).map_err(|_| {
            SynthError::invalid_value(
                "subnet prefix",
                format!("/{new_prefix}"),
                format!("must be between /{} and /32", self.0.prefix_len()),
            )
        })?;
        let subnet = subnets.nth(index as usize).ok_or_else(|| {
            SynthError::invalid_value(
                "subnet index",
                index.to_string(),
                format!("{self} has no /{new_prefix} subnet at that index"),
            )
        })?;
        Ok(Self(subnet))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = SynthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let net = Ipv4Net::from_str(value)
            .map_err(|error| SynthError::invalid_value("cidr block", value, error.to_string()))?;
        Self::from_net(net)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn carves_consecutive_subnets() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().expect("valid cidr");
        let first = vpc.subnet(24, 0).expect("first subnet");
        let second = vpc.subnet(24, 1).expect("second subnet");

        assert_eq!(first.to_string(), "10.0.0.0/24");
        assert_eq!(second.to_string(), "10.0.1.0/24");
        assert!(vpc.contains(&first));
        assert!(vpc.contains(&second));
        assert!(!first.contains(&second));
    }

    #[test]
    fn rejects_subnet_index_beyond_capacity() {
        let vpc: Ipv4Cidr = "10.0.0.0/23".parse().expect("valid cidr");
        assert!(vpc.subnet(24, 1).is_ok());
        assert!(vpc.subnet(24, 2).is_err());
    }

    #[rstest]
    #[case(16)]
    #[case(33)]
    fn rejects_prefix_outside_block(#[case] new_prefix: u8) {
        let vpc: Ipv4Cidr = "10.0.0.0/20".parse().expect("valid cidr");
        assert!(matches!(
            vpc.subnet(new_prefix, 0),
            Err(SynthError::InvalidValue { kind: "subnet prefix", .. })
        ));
    }

    #[rstest]
    #[case("10.0.0.1/16")]
    #[case("10.0.0.0/33")]
    #[case("10.0.0.0")]
    #[case("10.0.0/16")]
    #[case("10.0.0.0/x")]
    fn rejects_malformed_blocks(#[case] raw: &str) {
        assert!(matches!(
            raw.parse::<Ipv4Cidr>(),
            Err(SynthError::InvalidValue { kind: "cidr block", .. })
        ));
    }
}
