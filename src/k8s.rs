use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Namespace, Pod, Service};
use kube::api::{DeleteParams, ListParams, LogParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::compat::FuturesAsyncReadCompatExt;

use crate::model::{
    ClusterInfo, DeploymentCondition, DeploymentRow, EventRow, NamespaceRow, PodEventRow, PodRow,
    PodUsage, ServiceRow, format_age,
};

/// Byte source feeding the line-stream reader; both the cluster log stream
/// and the remote tail produce one of these.
pub type LineSource = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// k8s-openapi exposes metadata timestamps as `jiff::Timestamp`; the model's
/// age formatting works in `chrono::DateTime<Utc>`. Bridge the two at the
/// boundary without changing either side's behavior.
fn to_chrono(ts: k8s_openapi::jiff::Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.as_second(), ts.subsec_nanosecond() as u32)
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    info: ClusterInfo,
    namespace: String,
}

impl KubeGateway {
    /// Connect using a kubeconfig file and verify the API server is
    /// reachable before reporting success.
    pub async fn connect(name: &str, kubeconfig_path: &str) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(Path::new(kubeconfig_path))
            .with_context(|| format!("failed to read kubeconfig {kubeconfig_path}"))?;
        let context = kubeconfig.current_context.clone().unwrap_or_default();

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("failed to load Kubernetes configuration")?;
        let server = config.cluster_url.to_string();
        let namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        client
            .apiserver_version()
            .await
            .context("failed to reach the Kubernetes API server")?;

        Ok(Self {
            client,
            info: ClusterInfo {
                name: name.to_string(),
                context,
                server,
                namespace: namespace.clone(),
            },
            namespace,
        })
    }

    pub fn info(&self) -> &ClusterInfo {
        &self.info
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
        self.info.namespace = self.namespace.clone();
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceRow>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .context("failed to list namespaces")?;

        let mut rows = list
            .items
            .into_iter()
            .map(|namespace| {
                let status = namespace
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "-".to_string());
                NamespaceRow {
                    age: format_age(namespace.creation_timestamp().and_then(|time| to_chrono(time.0))),
                    name: namespace.name_any(),
                    status,
                }
            })
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    pub async fn list_pods(&self) -> Result<Vec<PodRow>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list pods in {}", self.namespace))?;

        let mut rows = list.items.iter().map(pod_row).collect::<Vec<_>>();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    pub async fn get_pod(&self, name: &str) -> Result<PodRow> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let pod = api
            .get(name)
            .await
            .with_context(|| format!("failed to get pod {name}"))?;
        Ok(pod_row(&pod))
    }

    pub async fn pod_events(&self, name: &str) -> Result<Vec<PodEventRow>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), &self.namespace);
        let params =
            ListParams::default().fields(&format!("involvedObject.name={name},involvedObject.kind=Pod"));
        let list = api
            .list(&params)
            .await
            .with_context(|| format!("failed to list events for pod {name}"))?;

        Ok(list
            .items
            .into_iter()
            .map(|event| PodEventRow {
                kind: event.type_.unwrap_or_else(|| "-".to_string()),
                reason: event.reason.unwrap_or_else(|| "-".to_string()),
                message: event.message.unwrap_or_default(),
                age: format_age(event.last_timestamp.and_then(|time| to_chrono(time.0))),
            })
            .collect())
    }

    pub async fn pod_containers(&self, name: &str) -> Result<Vec<String>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let pod = api
            .get(name)
            .await
            .with_context(|| format!("failed to get pod {name}"))?;
        Ok(pod
            .spec
            .map(|spec| {
                spec.containers
                    .into_iter()
                    .map(|container| container.name)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn delete_pod(&self, name: &str) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete pod {name}"))?;
        Ok(())
    }

    pub async fn list_deployments(&self) -> Result<Vec<DeploymentRow>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list deployments in {}", self.namespace))?;

        let mut rows = list.items.iter().map(deployment_row).collect::<Vec<_>>();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    pub async fn get_deployment(&self, name: &str) -> Result<DeploymentRow> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let deployment = api
            .get(name)
            .await
            .with_context(|| format!("failed to get deployment {name}"))?;
        Ok(deployment_row(&deployment))
    }

    pub async fn scale_deployment(&self, name: &str, replicas: i32) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let patch = json!({ "spec": { "replicas": replicas } });
        api.patch_scale(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("failed to scale deployment {name} to {replicas}"))?;
        Ok(())
    }

    /// Rolling restart via the same annotation bump kubectl uses.
    pub async fn restart_deployment(&self, name: &str) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            "kubectl.kubernetes.io/restartedAt": chrono::Utc::now().to_rfc3339(),
                        }
                    }
                }
            }
        });
        api.patch(name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await
            .with_context(|| format!("failed to restart deployment {name}"))?;
        Ok(())
    }

    pub async fn delete_deployment(&self, name: &str) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete deployment {name}"))?;
        Ok(())
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRow>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list services in {}", self.namespace))?;

        let mut rows = list.items.iter().map(service_row).collect::<Vec<_>>();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    pub async fn get_service(&self, name: &str) -> Result<ServiceRow> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let service = api
            .get(name)
            .await
            .with_context(|| format!("failed to get service {name}"))?;
        Ok(service_row(&service))
    }

    pub async fn list_events(&self) -> Result<Vec<EventRow>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list events in {}", self.namespace))?;

        let mut rows = list
            .items
            .into_iter()
            .map(|event| {
                let object_kind = event
                    .involved_object
                    .kind
                    .clone()
                    .unwrap_or_else(|| "-".to_string());
                let object_name = event
                    .involved_object
                    .name
                    .clone()
                    .unwrap_or_else(|| "-".to_string());
                let timestamp = event
                    .last_timestamp
                    .as_ref()
                    .map(|time| time.0)
                    .or(event.event_time.as_ref().map(|time| time.0))
                    .and_then(to_chrono);
                EventRow {
                    kind: event.type_.unwrap_or_else(|| "-".to_string()),
                    object_kind,
                    object_name,
                    reason: event.reason.unwrap_or_else(|| "-".to_string()),
                    message: event.message.unwrap_or_default(),
                    count: event.count.unwrap_or(1),
                    age: format_age(timestamp),
                }
            })
            .collect::<Vec<_>>();
        rows.reverse();
        Ok(rows)
    }

    pub async fn fetch_logs(
        &self,
        pod: &str,
        container: Option<&str>,
        tail_lines: i64,
        timestamps: bool,
        previous: bool,
    ) -> Result<String> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = LogParams {
            container: container.map(|name| name.to_string()),
            tail_lines: Some(tail_lines),
            timestamps,
            previous,
            ..LogParams::default()
        };
        api.logs(pod, &params)
            .await
            .with_context(|| format!("failed to fetch logs for {}/{pod}", self.namespace))
    }

    /// Open a follow stream that starts from now rather than re-sending
    /// history; the tail fetch already covered the past.
    pub async fn log_stream(
        &self,
        pod: &str,
        container: Option<&str>,
        timestamps: bool,
    ) -> Result<LineSource> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = LogParams {
            container: container.map(|name| name.to_string()),
            follow: true,
            since_seconds: Some(1),
            timestamps,
            ..LogParams::default()
        };
        let reader = api
            .log_stream(pod, &params)
            .await
            .with_context(|| format!("failed to open log stream for {}/{pod}", self.namespace))?;
        Ok(Box::pin(reader.compat()))
    }

    /// True when the metrics API answers; absence is expected on clusters
    /// without a metrics server and must never surface as an error.
    pub async fn probe_metrics(&self) -> bool {
        let api = self.pod_metrics_api();
        api.list(&ListParams::default().limit(1)).await.is_ok()
    }

    pub async fn fetch_pod_metrics(&self) -> Result<HashMap<String, PodUsage>> {
        let api = self.pod_metrics_api();
        let list = api
            .list(&ListParams::default())
            .await
            .context("failed to list pod metrics")?;

        let mut usage = HashMap::new();
        for item in list {
            let name = item.name_any();
            usage.insert(name, pod_usage_from_metrics(&item.data));
        }
        Ok(usage)
    }

    fn pod_metrics_api(&self) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        Api::namespaced_with(self.client.clone(), &self.namespace, &resource)
    }
}

fn pod_row(pod: &Pod) -> PodRow {
    let name = pod.name_any();
    let namespace = pod.namespace().unwrap_or_default();
    let spec_containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| container.name.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref());
    let total = spec_containers.len().max(1);
    let ready = statuses
        .map(|statuses| statuses.iter().filter(|status| status.ready).count())
        .unwrap_or(0);
    let restarts = statuses
        .map(|statuses| {
            statuses
                .iter()
                .map(|status| status.restart_count.max(0) as u32)
                .sum()
        })
        .unwrap_or(0);

    // A waiting reason (CrashLoopBackOff, ImagePullBackOff) is more useful
    // than the bare phase.
    let mut status_text = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    if let Some(statuses) = statuses {
        for container in statuses {
            if let Some(waiting) = container
                .state
                .as_ref()
                .and_then(|state| state.waiting.as_ref())
                && let Some(reason) = waiting.reason.clone()
            {
                status_text = reason;
                break;
            }
        }
    }

    PodRow {
        ready: format!("{ready}/{total}"),
        status: status_text,
        restarts,
        age: format_age(pod.creation_timestamp().and_then(|time| to_chrono(time.0))),
        node: pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_else(|| "-".to_string()),
        ip: pod
            .status
            .as_ref()
            .and_then(|status| status.pod_ip.clone())
            .unwrap_or_else(|| "-".to_string()),
        containers: spec_containers,
        name,
        namespace,
    }
}

fn deployment_row(deployment: &Deployment) -> DeploymentRow {
    let replicas = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let status = deployment.status.as_ref();
    let ready_replicas = status.and_then(|status| status.ready_replicas).unwrap_or(0);

    let images = deployment
        .spec
        .as_ref()
        .map(|spec| {
            spec.template
                .spec
                .as_ref()
                .map(|pod_spec| {
                    pod_spec
                        .containers
                        .iter()
                        .filter_map(|container| container.image.clone())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .unwrap_or_default();

    let conditions = status
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|condition| DeploymentCondition {
                    kind: condition.type_.clone(),
                    status: condition.status.clone(),
                    reason: condition.reason.clone().unwrap_or_default(),
                    message: condition.message.clone().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    DeploymentRow {
        name: deployment.name_any(),
        namespace: deployment.namespace().unwrap_or_default(),
        ready: format!("{ready_replicas}/{replicas}"),
        up_to_date: status.and_then(|status| status.updated_replicas).unwrap_or(0),
        available: status
            .and_then(|status| status.available_replicas)
            .unwrap_or(0),
        age: format_age(deployment.creation_timestamp().and_then(|time| to_chrono(time.0))),
        replicas,
        ready_replicas,
        strategy: deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.strategy.as_ref())
            .and_then(|strategy| strategy.type_.clone())
            .unwrap_or_default(),
        images,
        conditions,
    }
}

fn service_row(service: &Service) -> ServiceRow {
    let spec = service.spec.as_ref();
    let ports = spec
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|port| {
                    let protocol = port.protocol.clone().unwrap_or_else(|| "TCP".to_string());
                    format!("{}/{protocol}", port.port)
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_else(|| "-".to_string());

    let external_ip = service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|ingress| ingress.ip.clone().or_else(|| ingress.hostname.clone()))
        .or_else(|| {
            spec.and_then(|spec| spec.external_ips.as_ref())
                .and_then(|ips| ips.first().cloned())
        })
        .unwrap_or_else(|| "-".to_string());

    let selector = spec
        .and_then(|spec| spec.selector.as_ref())
        .map(|selector| {
            let mut pairs = selector
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Vec<_>>();
            pairs.sort();
            pairs
        })
        .unwrap_or_default();

    ServiceRow {
        name: service.name_any(),
        namespace: service.namespace().unwrap_or_default(),
        kind: spec
            .and_then(|spec| spec.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec
            .and_then(|spec| spec.cluster_ip.clone())
            .unwrap_or_else(|| "-".to_string()),
        external_ip,
        ports,
        age: format_age(service.creation_timestamp().and_then(|time| to_chrono(time.0))),
        selector,
    }
}

fn pod_usage_from_metrics(data: &Value) -> PodUsage {
    let mut usage = PodUsage::default();
    if let Some(containers) = data.get("containers").and_then(|value| value.as_array()) {
        for container in containers {
            let container_usage = &container["usage"];
            if let Some(cpu) = container_usage.get("cpu").and_then(|value| value.as_str()) {
                usage.cpu_millicores += parse_cpu_millicores(cpu).unwrap_or(0);
            }
            if let Some(memory) = container_usage.get("memory").and_then(|value| value.as_str()) {
                usage.memory_bytes += parse_memory_bytes(memory).unwrap_or(0);
            }
        }
    }
    usage
}

fn parse_cpu_millicores(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    if let Some(value) = quantity.strip_suffix('n') {
        return value.parse::<u64>().ok().map(|n| n / 1_000_000);
    }
    if let Some(value) = quantity.strip_suffix('u') {
        return value.parse::<u64>().ok().map(|u| u / 1_000);
    }
    if let Some(value) = quantity.strip_suffix('m') {
        return value.parse::<u64>().ok();
    }
    quantity.parse::<f64>().ok().map(|cores| (cores * 1000.0) as u64)
}

fn parse_memory_bytes(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    let units: [(&str, u64); 8] = [
        ("Ki", 1024),
        ("Mi", 1024 * 1024),
        ("Gi", 1024 * 1024 * 1024),
        ("Ti", 1024u64.pow(4)),
        ("k", 1000),
        ("K", 1000),
        ("M", 1_000_000),
        ("G", 1_000_000_000),
    ];
    for (suffix, multiplier) in units {
        if let Some(value) = quantity.strip_suffix(suffix) {
            return value.parse::<u64>().ok().map(|n| n * multiplier);
        }
    }
    quantity.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_cpu_millicores, parse_memory_bytes, pod_usage_from_metrics};
    use serde_json::json;

    #[test]
    fn cpu_quantities_normalize_to_millicores() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(1));
        assert_eq!(parse_cpu_millicores("2500u"), Some(2));
        assert_eq!(parse_cpu_millicores("bogus"), None);
    }

    #[test]
    fn memory_quantities_normalize_to_bytes() {
        assert_eq!(parse_memory_bytes("128Mi"), Some(128 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("500k"), Some(500_000));
        assert_eq!(parse_memory_bytes("1024"), Some(1024));
        assert_eq!(parse_memory_bytes("x"), None);
    }

    #[test]
    fn pod_usage_sums_across_containers() {
        let data = json!({
            "containers": [
                { "name": "app", "usage": { "cpu": "100m", "memory": "64Mi" } },
                { "name": "sidecar", "usage": { "cpu": "50m", "memory": "32Mi" } },
            ]
        });
        let usage = pod_usage_from_metrics(&data);
        assert_eq!(usage.cpu_millicores, 150);
        assert_eq!(usage.memory_bytes, 96 * 1024 * 1024);
    }
}
