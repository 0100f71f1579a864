use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR: &str = ".beluga";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub kubeconfigs: Vec<KubeConfigEntry>,
    #[serde(default)]
    pub ssh_hosts: Vec<SshHostEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct KubeConfigEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SshHostEntry {
    pub name: String,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub key_path: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_ssh_port() -> u16 {
    22
}

impl AppConfig {
    pub fn default_kubeconfig(&self) -> Option<&KubeConfigEntry> {
        self.kubeconfigs
            .iter()
            .find(|entry| entry.default)
            .or_else(|| self.kubeconfigs.first())
    }
}

/// Load `~/.beluga/config.yaml`, creating the directory and a default config
/// (pointing at `~/.kube/config`) on first run.
pub fn load() -> Result<AppConfig> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        let config = default_config()?;
        save(&config)?;
        return Ok(config);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AppConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

pub fn save(config: &AppConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    let path = dir.join(CONFIG_FILE);
    let raw = serde_yaml::to_string(config).context("failed to serialize config")?;
    fs::write(&path, raw).with_context(|| format!("failed to write config {}", path.display()))?;
    Ok(())
}

fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(CONFIG_DIR))
}

fn default_config() -> Result<AppConfig> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(AppConfig {
        kubeconfigs: vec![KubeConfigEntry {
            name: "default".to_string(),
            path: PathBuf::from(home)
                .join(".kube/config")
                .display()
                .to_string(),
            default: true,
        }],
        ssh_hosts: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, KubeConfigEntry, SshHostEntry};

    #[test]
    fn config_round_trips_through_yaml() {
        let config = AppConfig {
            kubeconfigs: vec![KubeConfigEntry {
                name: "prod".to_string(),
                path: "/home/me/.kube/prod".to_string(),
                default: true,
            }],
            ssh_hosts: vec![SshHostEntry {
                name: "node-1".to_string(),
                host: "192.168.1.10".to_string(),
                user: "admin".to_string(),
                key_path: "~/.ssh/id_ed25519".to_string(),
                port: 22,
            }],
        };

        let raw = serde_yaml::to_string(&config).expect("serialize");
        let parsed: AppConfig = serde_yaml::from_str(&raw).expect("parse");
        assert_eq!(parsed.kubeconfigs, config.kubeconfigs);
        assert_eq!(parsed.ssh_hosts, config.ssh_hosts);
    }

    #[test]
    fn ssh_port_defaults_to_22() {
        let raw = "ssh_hosts:\n  - name: n\n    host: h\n    user: u\n";
        let parsed: AppConfig = serde_yaml::from_str(raw).expect("parse");
        assert_eq!(parsed.ssh_hosts[0].port, 22);
    }

    #[test]
    fn default_kubeconfig_prefers_flagged_entry() {
        let config = AppConfig {
            kubeconfigs: vec![
                KubeConfigEntry {
                    name: "a".to_string(),
                    path: "/a".to_string(),
                    default: false,
                },
                KubeConfigEntry {
                    name: "b".to_string(),
                    path: "/b".to_string(),
                    default: true,
                },
            ],
            ssh_hosts: Vec::new(),
        };
        assert_eq!(config.default_kubeconfig().map(|e| e.name.as_str()), Some("b"));
    }
}
