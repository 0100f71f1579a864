use russh::client::{self, Config, Handle, Handler};
use russh::keys::{Algorithm, PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{ChannelMsg, Disconnect};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::SshHostEntry;
use crate::k8s::LineSource;
use crate::model::{NodeFacts, RemoteContainer, RemoteImage, RemotePod, format_age};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The private key is encrypted and no passphrase has been supplied yet;
    /// the caller collects one and retries.
    #[error("passphrase required for the SSH private key")]
    PassphraseRequired,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to load SSH key {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("command exited with status {code}: {output}")]
    NonZeroExit { code: u32, output: String },

    #[error("connection timed out")]
    Timeout,

    #[error("not connected")]
    NotConnected,

    #[error("SSH protocol error: {0}")]
    Protocol(String),
}

impl From<russh::Error> for RemoteError {
    fn from(error: russh::Error) -> Self {
        RemoteError::Protocol(error.to_string())
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

pub struct ShellHandler;

impl Handler for ShellHandler {
    type Error = RemoteError;

    fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> impl Future<Output = std::result::Result<bool, Self::Error>> + Send {
        // TODO: verify against known_hosts instead of accepting every key.
        async { Ok(true) }
    }
}

/// Shell connection to one node. At most one of these is held at a time;
/// connecting to another host replaces it.
#[derive(Clone)]
pub struct RemoteShell {
    entry: SshHostEntry,
    passphrase: Option<String>,
    handle: Option<Arc<Handle<ShellHandler>>>,
}

impl std::fmt::Debug for RemoteShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteShell")
            .field("host", &self.entry.name)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl RemoteShell {
    pub fn new(entry: SshHostEntry) -> Self {
        Self {
            entry,
            passphrase: None,
            handle: None,
        }
    }

    pub fn host(&self) -> &SshHostEntry {
        &self.entry
    }

    pub fn set_passphrase(&mut self, passphrase: impl Into<String>) {
        self.passphrase = Some(passphrase.into());
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Connect and authenticate: ssh-agent first, then the configured key
    /// file. An encrypted key with no stored passphrase yields
    /// [`RemoteError::PassphraseRequired`].
    pub async fn connect(&mut self) -> RemoteResult<()> {
        let config = Config {
            inactivity_timeout: Some(Duration::from_secs(60)),
            keepalive_interval: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        let addr = format!("{}:{}", self.entry.host, self.entry.port);
        debug!(host = %addr, user = %self.entry.user, "connecting over SSH");

        let mut handle = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(Arc::new(config), addr.clone(), ShellHandler),
        )
        .await
        .map_err(|_| RemoteError::Timeout)?
        .map_err(|error| RemoteError::Connection(error.to_string()))?;

        if !self.try_agent_auth(&mut handle).await? {
            self.try_key_file_auth(&mut handle).await?;
        }

        // A trivial command proves the session is usable, not just open.
        self.handle = Some(Arc::new(handle));
        let echo = self.execute("echo ok").await?;
        if echo.trim() != "ok" {
            self.handle = None;
            return Err(RemoteError::Connection(format!(
                "unexpected response from {addr}: {}",
                echo.trim()
            )));
        }

        debug!(host = %addr, "SSH connection established");
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(handle) = &self.handle {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await;
        }
    }

    async fn try_agent_auth(&self, handle: &mut Handle<ShellHandler>) -> RemoteResult<bool> {
        #[cfg(unix)]
        {
            use russh::keys::agent::client::AgentClient;

            let mut agent = match AgentClient::connect_env().await {
                Ok(agent) => agent,
                Err(_) => return Ok(false),
            };

            let keys = match agent.request_identities().await {
                Ok(keys) => keys,
                Err(error) => {
                    debug!(error = %error, "ssh-agent identity listing failed");
                    return Ok(false);
                }
            };

            for key in keys {
                match handle
                    .authenticate_publickey_with(
                        self.entry.user.as_str(),
                        key.public_key().into_owned(),
                        None,
                        &mut agent,
                    )
                    .await
                {
                    Ok(result) if result.success() => return Ok(true),
                    Ok(_) => continue,
                    Err(error) => {
                        debug!(error = %error, "ssh-agent key rejected");
                    }
                }
            }
            Ok(false)
        }

        #[cfg(not(unix))]
        {
            let _ = handle;
            Ok(false)
        }
    }

    async fn try_key_file_auth(&self, handle: &mut Handle<ShellHandler>) -> RemoteResult<()> {
        if self.entry.key_path.trim().is_empty() {
            return Err(RemoteError::Authentication(
                "no ssh-agent key was accepted and no key file is configured".to_string(),
            ));
        }

        let key_path = expand_home(&self.entry.key_path);
        let key = match load_secret_key(&key_path, None) {
            Ok(key) => key,
            Err(error) => {
                let reason = error.to_string();
                let encrypted = reason.to_ascii_lowercase().contains("passphrase")
                    || reason.to_ascii_lowercase().contains("encrypted");
                if encrypted {
                    let Some(passphrase) = self.passphrase.as_deref() else {
                        return Err(RemoteError::PassphraseRequired);
                    };
                    load_secret_key(&key_path, Some(passphrase)).map_err(|error| {
                        RemoteError::KeyLoad {
                            path: key_path.clone(),
                            reason: error.to_string(),
                        }
                    })?
                } else {
                    return Err(RemoteError::KeyLoad {
                        path: key_path,
                        reason,
                    });
                }
            }
        };

        let hash_alg = if matches!(key.algorithm(), Algorithm::Rsa { .. }) {
            handle
                .best_supported_rsa_hash()
                .await
                .map_err(|error| RemoteError::Authentication(error.to_string()))?
                .flatten()
        } else {
            None
        };

        let auth = handle
            .authenticate_publickey(
                self.entry.user.as_str(),
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(|error| RemoteError::Authentication(error.to_string()))?;

        if auth.success() {
            Ok(())
        } else {
            Err(RemoteError::Authentication(format!(
                "key {} was not accepted by the server",
                key_path.display()
            )))
        }
    }

    /// Run a command and return its combined stdout+stderr.
    pub async fn execute(&self, command: &str) -> RemoteResult<String> {
        let handle = self.handle.as_ref().ok_or(RemoteError::NotConnected)?;

        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|error| RemoteError::Channel(error.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|error| RemoteError::CommandFailed(error.to_string()))?;

        let mut output = Vec::new();
        let mut exit_code = 0u32;
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => output.extend_from_slice(&data),
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        output.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => exit_code = exit_status,
                Some(ChannelMsg::Eof) | None => break,
                _ => {}
            }
        }

        let output = String::from_utf8_lossy(&output).to_string();
        if exit_code != 0 {
            return Err(RemoteError::NonZeroExit {
                code: exit_code,
                output: output.trim().to_string(),
            });
        }
        Ok(output)
    }

    pub async fn list_containers(&self) -> RemoteResult<Vec<RemoteContainer>> {
        let output = self
            .execute("sudo crictl ps -a -o json")
            .await
            .map_err(wrap_crictl)?;
        Ok(parse_container_listing(&output))
    }

    pub async fn list_pods(&self) -> RemoteResult<Vec<RemotePod>> {
        let output = self.execute("sudo crictl pods").await.map_err(wrap_crictl)?;
        Ok(parse_pod_listing(&output))
    }

    pub async fn list_images(&self) -> RemoteResult<Vec<RemoteImage>> {
        let output = self
            .execute("sudo crictl images")
            .await
            .map_err(wrap_crictl)?;
        Ok(parse_image_listing(&output))
    }

    pub async fn container_logs(
        &self,
        container_id: &str,
        tail_lines: i64,
        timestamps: bool,
    ) -> RemoteResult<String> {
        let mut command = vec!["sudo".to_string(), "crictl".to_string(), "logs".to_string()];
        if tail_lines > 0 {
            command.push(format!("--tail={tail_lines}"));
        }
        if timestamps {
            command.push("--timestamps".to_string());
        }
        command.push(container_id.to_string());
        self.execute(&command.join(" ")).await.map_err(wrap_crictl)
    }

    /// Follow a container's logs. Stdout and stderr of the remote tail are
    /// merged into one byte stream; dropping the returned reader tears the
    /// exec channel down.
    pub async fn stream_container_logs(
        &self,
        container_id: &str,
        timestamps: bool,
    ) -> RemoteResult<LineSource> {
        let handle = self.handle.as_ref().ok_or(RemoteError::NotConnected)?;

        let mut command = vec![
            "sudo".to_string(),
            "crictl".to_string(),
            "logs".to_string(),
            "-f".to_string(),
            "--since=1s".to_string(),
        ];
        if timestamps {
            command.push("--timestamps".to_string());
        }
        command.push(container_id.to_string());
        let command = command.join(" ");
        debug!(command = %command, "starting remote log stream");

        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|error| RemoteError::Channel(error.to_string()))?;
        channel
            .exec(true, command.as_str())
            .await
            .map_err(|error| RemoteError::CommandFailed(error.to_string()))?;

        let (mut writer, reader) = tokio::io::duplex(8 * 1024);
        tokio::spawn(async move {
            loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => {
                        if writer.write_all(&data).await.is_err() {
                            break;
                        }
                    }
                    Some(ChannelMsg::ExtendedData { data, ext }) => {
                        if ext == 1 && writer.write_all(&data).await.is_err() {
                            break;
                        }
                    }
                    Some(ChannelMsg::Eof) | None => break,
                    _ => {}
                }
            }
        });

        Ok(Box::pin(reader))
    }

    /// Collect node facts; every field is independently best-effort so a
    /// missing tool never fails the whole call.
    pub async fn node_facts(&self) -> RemoteResult<NodeFacts> {
        let hostname = self.execute("hostname").await?;

        let field = |result: RemoteResult<String>| {
            result.map(|value| value.trim().to_string()).unwrap_or_default()
        };

        Ok(NodeFacts {
            hostname: hostname.trim().to_string(),
            os: field(
                self.execute("cat /etc/os-release | grep PRETTY_NAME | cut -d'\"' -f2")
                    .await,
            ),
            kernel: field(self.execute("uname -r").await),
            uptime: field(self.execute("uptime -p").await),
            memory: field(
                self.execute("free -h | grep Mem | awk '{print $3 \"/\" $2}'")
                    .await,
            ),
            disk: field(
                self.execute("df -h / | tail -1 | awk '{print $3 \"/\" $2 \" (\" $5 \")\"}'")
                    .await,
            ),
            load_avg: field(
                self.execute("cat /proc/loadavg | awk '{print $1 \" \" $2 \" \" $3}'")
                    .await,
            ),
        })
    }
}

fn wrap_crictl(error: RemoteError) -> RemoteError {
    match error {
        RemoteError::NonZeroExit { code, output } => RemoteError::NonZeroExit {
            code,
            output: format!("crictl: {output}"),
        },
        other => other,
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    id: String,
    metadata: ContainerMetadata,
    image: ImageSpec,
    state: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ImageSpec {
    image: String,
}

/// Parse `crictl ps -a -o json`. Rows that fail to deserialize are skipped
/// so one malformed entry never hides the rest of the listing.
pub fn parse_container_listing(output: &str) -> Vec<RemoteContainer> {
    let Ok(root) = serde_json::from_str::<serde_json::Value>(output) else {
        return Vec::new();
    };
    let Some(entries) = root.get("containers").and_then(|value| value.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|raw| serde_json::from_value::<ContainerEntry>(raw.clone()).ok())
        .map(|entry| {
            let created_nanos = entry.created_at.parse::<i64>().unwrap_or(0);
            let created = chrono::DateTime::from_timestamp(created_nanos / 1_000_000_000, 0);

            let image = entry
                .image
                .image
                .rsplit('/')
                .next()
                .unwrap_or(&entry.image.image)
                .to_string();

            RemoteContainer {
                short_id: truncate_id(&entry.id),
                name: entry.metadata.name,
                image,
                state: entry.state.to_ascii_lowercase(),
                pod_name: entry
                    .labels
                    .get("io.kubernetes.pod.name")
                    .cloned()
                    .unwrap_or_default(),
                namespace: entry
                    .labels
                    .get("io.kubernetes.pod.namespace")
                    .cloned()
                    .unwrap_or_default(),
                age: format_age(created),
                id: entry.id,
            }
        })
        .collect()
}

/// Parse the column-aligned `crictl pods` output, skipping short rows.
pub fn parse_pod_listing(output: &str) -> Vec<RemotePod> {
    output
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            Some(RemotePod {
                id: fields[0].to_string(),
                created: fields[1].to_string(),
                state: fields[2].to_string(),
                name: fields[3].to_string(),
                namespace: fields[4].to_string(),
            })
        })
        .collect()
}

/// Parse the column-aligned `crictl images` output, skipping short rows.
pub fn parse_image_listing(output: &str) -> Vec<RemoteImage> {
    output
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return None;
            }
            Some(RemoteImage {
                id: fields[0].to_string(),
                tags: fields[1].to_string(),
                size: fields[fields.len() - 1].to_string(),
            })
        })
        .collect()
}

fn truncate_id(id: &str) -> String {
    id.chars().take(13).collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_container_listing, parse_image_listing, parse_pod_listing, truncate_id};

    #[test]
    fn container_listing_parses_well_formed_entries() {
        let output = r#"{
            "containers": [
                {
                    "id": "abcdef0123456789",
                    "podSandboxId": "feedface",
                    "metadata": { "name": "coredns" },
                    "image": { "image": "registry.k8s.io/coredns/coredns:v1.11.1" },
                    "state": "CONTAINER_RUNNING",
                    "createdAt": "1700000000000000000",
                    "labels": {
                        "io.kubernetes.pod.name": "coredns-abc",
                        "io.kubernetes.pod.namespace": "kube-system"
                    }
                }
            ]
        }"#;
        let containers = parse_container_listing(output);
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "coredns");
        assert_eq!(containers[0].short_id, "abcdef0123456");
        assert_eq!(containers[0].image, "coredns:v1.11.1");
        assert_eq!(containers[0].state, "container_running");
        assert_eq!(containers[0].pod_name, "coredns-abc");
        assert_eq!(containers[0].namespace, "kube-system");
    }

    #[test]
    fn malformed_container_entries_are_skipped() {
        let output = r#"{
            "containers": [
                { "id": "good", "metadata": { "name": "a" }, "image": { "image": "x" },
                  "state": "CONTAINER_RUNNING", "createdAt": "0" },
                { "bogus": true }
            ]
        }"#;
        let containers = parse_container_listing(output);
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].id, "good");
    }

    #[test]
    fn garbage_container_json_yields_an_empty_listing() {
        assert!(parse_container_listing("not json at all").is_empty());
    }

    #[test]
    fn pod_listing_skips_short_rows() {
        let output = "POD ID  CREATED  STATE  NAME  NAMESPACE\n\
                      abc123  2d  Ready  web-1  default\n\
                      short row\n";
        let pods = parse_pod_listing(output);
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "web-1");
        assert_eq!(pods[0].namespace, "default");
    }

    #[test]
    fn image_listing_takes_last_field_as_size() {
        let output = "IMAGE  TAG  IMAGE ID  SIZE\n\
                      docker.io/library/nginx  latest  deadbeef  67.2MB\n";
        let images = parse_image_listing(output);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].size, "67.2MB");
    }

    #[test]
    fn ids_are_truncated_for_display() {
        assert_eq!(truncate_id("0123456789abcdefgh"), "0123456789abc");
        assert_eq!(truncate_id("short"), "short");
    }
}
