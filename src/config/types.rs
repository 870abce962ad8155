//! Configuration types

use crate::controlplane::{Role, Subnet, SubnetTable, SwitchId, Topology};
use crate::protocol::MacAddr;
use crate::telemetry::LogConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// User-defined configuration (fabricd.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Datapath id of the designated router switch
    pub router: u64,
    #[serde(default, rename = "subnet")]
    pub subnets: Vec<SubnetConfig>,
    /// Datapath id (as a TOML key) to fabric role
    #[serde(default)]
    pub switches: HashMap<String, RoleConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubnetConfig {
    /// Prefix in CIDR notation, e.g. "10.0.0.0/24"
    pub cidr: String,
    pub gateway_ip: IpAddr,
    /// Virtual MAC the controller answers with for the gateway
    pub gateway_mac: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleConfig {
    External,
    EdgeRouter,
    Spine,
    Leaf,
}

impl From<RoleConfig> for Role {
    fn from(role: RoleConfig) -> Role {
        match role {
            RoleConfig::External => Role::External,
            RoleConfig::EdgeRouter => Role::EdgeRouter,
            RoleConfig::Spine => Role::Spine,
            RoleConfig::Leaf => Role::Leaf,
        }
    }
}

/// Parse "a.b.c.d/len" or "v6::/len" into network and prefix length
pub(crate) fn parse_cidr(cidr: &str) -> Result<(IpAddr, u8)> {
    let (net, len) = cidr
        .split_once('/')
        .ok_or_else(|| Error::Config(format!("invalid CIDR (missing /): {cidr}")))?;
    let network: IpAddr = net
        .parse()
        .map_err(|_| Error::Config(format!("invalid network address: {cidr}")))?;
    let prefix_len: u8 = len
        .parse()
        .map_err(|_| Error::Config(format!("invalid prefix length: {cidr}")))?;
    let max = if network.is_ipv4() { 32 } else { 128 };
    if prefix_len > max {
        return Err(Error::Config(format!("prefix length out of range: {cidr}")));
    }
    Ok((network, prefix_len))
}

impl SubnetConfig {
    pub(crate) fn build(&self) -> Result<Subnet> {
        let (network, prefix_len) = parse_cidr(&self.cidr)?;
        let gateway_mac: MacAddr = self
            .gateway_mac
            .parse()
            .map_err(|e: Error| Error::Config(e.to_string()))?;
        Ok(Subnet {
            network,
            prefix_len,
            gateway_ip: self.gateway_ip,
            gateway_mac,
        })
    }
}

impl Config {
    /// Resolve the subnet table; assumes `validate` passed
    pub fn subnet_table(&self) -> Result<SubnetTable> {
        let subnets = self
            .subnets
            .iter()
            .map(|s| s.build())
            .collect::<Result<Vec<_>>>()?;
        Ok(SubnetTable::new(subnets))
    }

    /// Resolve the switch-role table and designated router
    pub fn topology(&self) -> Result<Topology> {
        let mut roles = HashMap::new();
        for (dpid, role) in &self.switches {
            let dpid: u64 = dpid
                .parse()
                .map_err(|_| Error::Config(format!("invalid datapath id: {dpid}")))?;
            roles.insert(SwitchId(dpid), Role::from(*role));
        }
        Ok(Topology::new(SwitchId(self.router), roles))
    }
}
