//! Run manifest loading and validation
//!
//! A run manifest describes one experiment: which run and scenario it belongs
//! to, how long the gateway listens, where it writes, and optionally how the
//! legitimate node and the sybil attacker behave. Manifests are YAML; JSON
//! manifests parse unchanged since JSON is a subset of YAML.
//!
//! ```yaml
//! run_id: 1
//! scenario_id: S1_SYBIL
//! duration_s: 300
//! gateway:
//!   listen_port: 5005
//! attacker:
//!   enabled: true
//!   target_node_id: ecg_01
//!   attack_rate_pps: 2
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{GatewayError, Result};

/// Gateway section of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub listen_ip: IpAddr,
    pub listen_port: u16,
    pub output_root: PathBuf,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: 5005,
            output_root: PathBuf::from("experiments/outputs"),
        }
    }
}

/// Legitimate node simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub node_id: String,
    pub msg_type: String,
    pub rate_pps: f64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self { node_id: "ecg_01".to_string(), msg_type: "ECG".to_string(), rate_pps: 2.0 }
    }
}

/// Sybil attacker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackerSection {
    pub enabled: bool,
    pub target_node_id: String,
    pub msg_type: String,
    pub attack_rate_pps: f64,
    pub start_delay_s: f64,
}

impl Default for AttackerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            target_node_id: "ecg_01".to_string(),
            msg_type: "ECG".to_string(),
            attack_rate_pps: 2.0,
            start_delay_s: 0.0,
        }
    }
}

/// A run manifest as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: u32,
    pub scenario_id: String,
    #[serde(default)]
    pub description: String,
    pub duration_s: u64,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub attacker: AttackerSection,
}

impl RunManifest {
    /// Load and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| GatewayError::file_error(path, e))?;
        let manifest = Self::parse(&text)?;
        debug!(path = %path.display(), run_id = manifest.run_id, "loaded run manifest");
        Ok(manifest)
    }

    /// Parse and validate manifest text.
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: RunManifest = serde_yaml_ng::from_str(text)
            .map_err(|e| GatewayError::config(format!("malformed manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.duration_s == 0 {
            return Err(GatewayError::config("duration_s must be a positive integer"));
        }
        if self.scenario_id.trim().is_empty() {
            return Err(GatewayError::config("scenario_id must not be empty"));
        }
        Ok(())
    }

    /// Gateway-side view of this manifest.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            run_id: self.run_id,
            scenario_id: self.scenario_id.clone(),
            listen: SocketAddr::new(self.gateway.listen_ip, self.gateway.listen_port),
            duration: Duration::from_secs(self.duration_s),
            output_root: self.gateway.output_root.clone(),
        }
    }
}

/// Everything the collector needs to run, resolved from a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub run_id: u32,
    pub scenario_id: String,
    pub listen: SocketAddr,
    pub duration: Duration,
    pub output_root: PathBuf,
}

impl RunConfig {
    /// Directory this run writes into: `<output_root>/run_<run_id:04>`.
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(format!("run_{:04}", self.run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_with_defaults() {
        let manifest = RunManifest::parse("run_id: 1\nscenario_id: S0_NORMAL\nduration_s: 60\n")
            .expect("manifest should parse");
        assert_eq!(manifest.gateway, GatewaySection::default());
        assert!(!manifest.attacker.enabled);

        let config = manifest.run_config();
        assert_eq!(config.listen, "0.0.0.0:5005".parse().unwrap());
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.output_dir(), PathBuf::from("experiments/outputs/run_0001"));
    }

    #[test]
    fn parses_json_manifests() {
        let json = r#"{
            "run_id": 12,
            "scenario_id": "S1_SYBIL",
            "description": "sybil clone of ecg_01",
            "duration_s": 300,
            "gateway": {"listen_ip": "127.0.0.1", "listen_port": 6000, "output_root": "out"},
            "attacker": {"enabled": true, "target_node_id": "ecg_01", "attack_rate_pps": 5}
        }"#;
        let manifest = RunManifest::parse(json).expect("JSON manifest should parse");
        assert!(manifest.attacker.enabled);
        assert_eq!(manifest.attacker.attack_rate_pps, 5.0);
        assert_eq!(manifest.attacker.msg_type, "ECG");
        assert_eq!(manifest.run_config().output_dir(), PathBuf::from("out/run_0012"));
        assert_eq!(manifest.run_config().listen.port(), 6000);
    }

    #[test]
    fn rejects_zero_duration() {
        let err = RunManifest::parse("run_id: 1\nscenario_id: S0\nduration_s: 0\n").unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
        assert!(err.to_string().contains("duration_s"));
    }

    #[test]
    fn rejects_missing_required_fields() {
        let err = RunManifest::parse("scenario_id: S0\nduration_s: 10\n").unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));

        let err = RunManifest::parse("run_id: 1\nscenario_id: S0\n").unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = RunManifest::parse("run_id: 1\nscenario_id: S0\nduration_s: -5\n").unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = RunManifest::load("/nonexistent/run_0001.yaml").unwrap_err();
        assert!(matches!(err, GatewayError::File { .. }));
    }
}
