//! Configuration validation
//!
//! Everything here runs before the engine starts; an error means the
//! process refuses to come up. Overlap between subnets in particular
//! must be caught now, since the decision engine resolves an address
//! to the first matching prefix and silently ignores later ones.

use super::Config;
use crate::controlplane::Subnet;

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

/// Validate configuration and collect warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_subnets(config, &mut result);
    validate_switches(config, &mut result);

    result
}

fn validate_subnets(config: &Config, result: &mut ValidationResult) {
    if config.subnets.is_empty() {
        result.warn("no subnets configured; engine degrades to pure L2 switching");
    }

    let mut built: Vec<(usize, Subnet)> = Vec::new();
    for (i, subnet) in config.subnets.iter().enumerate() {
        match subnet.build() {
            Ok(s) => {
                if !s.gateway_mac.is_unicast() {
                    result.error(format!(
                        "subnet[{i}]: gateway_mac {} is not unicast",
                        subnet.gateway_mac
                    ));
                }
                if !s.contains(s.gateway_ip) {
                    result.warn(format!(
                        "subnet[{i}]: gateway_ip {} lies outside {}",
                        subnet.gateway_ip, subnet.cidr
                    ));
                }
                built.push((i, s));
            }
            Err(e) => result.error(format!("subnet[{i}]: {e}")),
        }
    }

    for (ai, a) in &built {
        for (bi, b) in &built {
            if ai < bi && (a.contains(b.network) || b.contains(a.network)) {
                result.error(format!(
                    "subnet[{ai}] and subnet[{bi}] overlap ({} vs {})",
                    config.subnets[*ai].cidr, config.subnets[*bi].cidr
                ));
            }
        }
    }

    for (ai, a) in &built {
        for (bi, b) in &built {
            if ai < bi && a.gateway_ip == b.gateway_ip {
                result.error(format!(
                    "subnet[{ai}] and subnet[{bi}] share gateway_ip {}",
                    a.gateway_ip
                ));
            }
        }
    }
}

fn validate_switches(config: &Config, result: &mut ValidationResult) {
    for dpid in config.switches.keys() {
        if dpid.parse::<u64>().is_err() {
            result.error(format!("switches: invalid datapath id {dpid:?}"));
        }
    }

    if !config.switches.is_empty() {
        let router_known = config
            .switches
            .keys()
            .any(|dpid| dpid.parse::<u64>().map(|d| d == config.router).unwrap_or(false));
        if !router_known {
            result.warn(format!(
                "router dpid {} has no role entry in [switches]",
                config.router
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let cfg = config(
            r#"
router = 2
[[subnet]]
cidr = "10.1.1.0/24"
gateway_ip = "10.1.1.254"
gateway_mac = "0a:00:00:00:00:01"
[switches]
2 = "edge_router"
"#,
        );
        let result = validate(&cfg);
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_overlapping_subnets_rejected() {
        let cfg = config(
            r#"
router = 2
[[subnet]]
cidr = "10.0.0.0/16"
gateway_ip = "10.0.0.254"
gateway_mac = "0a:00:00:00:00:01"
[[subnet]]
cidr = "10.0.1.0/24"
gateway_ip = "10.0.1.254"
gateway_mac = "0a:00:00:00:00:02"
"#,
        );
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert!(result.errors[0].contains("overlap"));
    }

    #[test]
    fn test_multicast_gateway_mac_rejected() {
        let cfg = config(
            r#"
router = 2
[[subnet]]
cidr = "10.0.0.0/24"
gateway_ip = "10.0.0.254"
gateway_mac = "ff:ff:ff:ff:ff:ff"
"#,
        );
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn test_duplicate_gateway_ip_rejected() {
        let cfg = config(
            r#"
router = 2
[[subnet]]
cidr = "10.0.0.0/24"
gateway_ip = "10.0.0.254"
gateway_mac = "0a:00:00:00:00:01"
[[subnet]]
cidr = "10.1.0.0/24"
gateway_ip = "10.0.0.254"
gateway_mac = "0a:00:00:00:00:02"
"#,
        );
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn test_gateway_outside_subnet_warns() {
        let cfg = config(
            r#"
router = 2
[[subnet]]
cidr = "10.0.0.0/24"
gateway_ip = "192.168.0.1"
gateway_mac = "0a:00:00:00:00:01"
"#,
        );
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_unknown_router_role_warns() {
        let cfg = config(
            r#"
router = 9
[[subnet]]
cidr = "10.0.0.0/24"
gateway_ip = "10.0.0.254"
gateway_mac = "0a:00:00:00:00:01"
[switches]
2 = "edge_router"
"#,
        );
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("router dpid 9")));
    }
}
