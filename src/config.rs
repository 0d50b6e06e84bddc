use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};

use regex::Regex;

use crate::{
    error::{Result, SwitchError},
    network::ethernet::{VlanId, MAX_VLAN_ID},
};

/// How a port treats VLANs.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PortMode {
    /// Untagged traffic for exactly one VLAN. Never participates in STP.
    Access(VlanId),
    /// Tagged traffic for every VLAN. Managed by STP.
    Trunk,
}

impl PortMode {
    pub fn is_trunk(&self) -> bool {
        matches!(self, PortMode::Trunk)
    }

    pub fn access_vlan(&self) -> Option<VlanId> {
        match self {
            PortMode::Access(vlan) => Some(*vlan),
            PortMode::Trunk => None,
        }
    }
}

impl FromStr for PortMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "T" {
            return Ok(PortMode::Trunk);
        }

        match s.parse::<VlanId>() {
            Ok(vlan) if vlan <= MAX_VLAN_ID => Ok(PortMode::Access(vlan)),
            Ok(vlan) => Err(format!("VLAN id {} is outside 0..={}", vlan, MAX_VLAN_ID)),
            Err(_) => Err(format!("unknown VLAN spec '{}'; expected a VLAN id or 'T'", s)),
        }
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::Access(vlan) => write!(f, "access vlan {}", vlan),
            PortMode::Trunk => write!(f, "trunk"),
        }
    }
}

/// Per-switch configuration, read once at startup.
#[derive(Debug, PartialEq, Clone)]
pub struct SwitchConfig {
    /// Bridge priority. Lower is preferred as the root.
    pub priority: u8,
    /// Indexed by port number.
    pub ports: Vec<PortMode>,
}

fn priority_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*$").expect("static pattern"))
}

fn port_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("static pattern"))
}

impl SwitchConfig {
    /// `<dir>/switch<id>.cfg`
    pub fn path_for(dir: &Path, switch_id: &str) -> PathBuf {
        dir.join(format!("switch{}.cfg", switch_id))
    }

    pub fn load(path: &Path, port_count: usize) -> Result<SwitchConfig> {
        let text = std::fs::read_to_string(path)?;
        SwitchConfig::parse(&text, port_count)
    }

    /// Parses a configuration for a switch with `port_count` ports.
    ///
    /// The first meaningful line is the bridge priority. Every following line is
    /// `<port> <vlan spec>`. The port is either a numeric index or an interface
    /// name, in which case it takes the index of its position in the file.
    /// Every port must end up configured exactly once.
    pub fn parse(text: &str, port_count: usize) -> Result<SwitchConfig> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (line_no, line) = lines
            .next()
            .ok_or_else(|| SwitchError::config(1, "missing bridge priority"))?;
        let priority = priority_line()
            .captures(line)
            .and_then(|c| c[1].parse::<u8>().ok())
            .ok_or_else(|| {
                SwitchError::config(line_no, format!("'{}' is not a priority in 0..=255", line))
            })?;

        let mut ports: Vec<Option<PortMode>> = vec![None; port_count];
        let mut last_line = line_no;

        for (position, (line_no, line)) in lines.enumerate() {
            last_line = line_no;
            let captures = port_line().captures(line).ok_or_else(|| {
                SwitchError::config(line_no, format!("expected '<port> <vlan spec>', got '{}'", line))
            })?;

            let index = captures[1].parse::<usize>().unwrap_or(position);
            let mode = captures[2]
                .parse::<PortMode>()
                .map_err(|reason| SwitchError::config(line_no, reason))?;

            let slot = ports.get_mut(index).ok_or_else(|| {
                SwitchError::config(
                    line_no,
                    format!("port {} does not exist; the switch has {} ports", index, port_count),
                )
            })?;
            if slot.is_some() {
                return Err(SwitchError::config(
                    line_no,
                    format!("port {} is configured twice", index),
                ));
            }
            *slot = Some(mode);
        }

        let ports = ports
            .into_iter()
            .enumerate()
            .map(|(index, mode)| {
                mode.ok_or_else(|| {
                    SwitchError::config(last_line, format!("port {} is not configured", index))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SwitchConfig { priority, ports })
    }

    pub fn trunk_ports(&self) -> impl Iterator<Item = usize> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, mode)| mode.is_trunk())
            .map(|(i, _)| i)
    }
}
