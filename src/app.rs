use std::collections::HashMap;

use crate::config::{AppConfig, KubeConfigEntry, SshHostEntry};
use crate::input::{Action, InputContext};
use crate::k8s::KubeGateway;
use crate::model::{
    ClusterInfo, ConnectionStatus, DeploymentRow, EventRow, ListRow, NamespaceRow, NodeFacts,
    PodEventRow, PodRow, PodUsage, RemoteContainer, ResourceList, ServiceRow,
};
use crate::ssh::{RemoteError, RemoteShell};
use crate::stream::{LogSession, SessionOutcome, StreamEvent, StreamTicket};

pub const REFRESH_INTERVAL_SECS: u64 = 5;
pub const NOTIFICATION_SECS: u64 = 3;

/// The single full-screen context currently visible.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum View {
    ConfigSelect,
    Connecting,
    Main,
    Namespaces,
    Pods,
    PodDetail,
    Logs,
    SshHosts,
    SshConnecting,
    RemoteContainers,
    RemoteLogs,
    Deployments,
    DeploymentDetail,
    Services,
    ServiceDetail,
    Events,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConfirmAction {
    DeletePod,
    RestartPod,
    DeleteDeployment,
    RestartDeployment,
}

impl ConfirmAction {
    pub fn title(self) -> &'static str {
        match self {
            Self::DeletePod => "Delete Pod",
            Self::RestartPod => "Restart Pod",
            Self::DeleteDeployment => "Delete Deployment",
            Self::RestartDeployment => "Restart Deployment",
        }
    }

    pub fn message(self, target: &str) -> String {
        match self {
            Self::DeletePod => format!("Delete pod '{target}'?"),
            Self::RestartPod => format!(
                "Restart pod '{target}'?\n(The pod is deleted; its controller recreates it)"
            ),
            Self::DeleteDeployment => {
                format!("Delete deployment '{target}'?\n(All associated pods will be terminated)")
            }
            Self::RestartDeployment => {
                format!("Restart deployment '{target}'?\n(Triggers a rolling restart of all pods)")
            }
        }
    }
}

/// At most one overlay can exist, by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Confirm {
        action: ConfirmAction,
        target: String,
        yes_selected: bool,
    },
    Scale {
        deployment: String,
        current: i32,
        input: String,
        error: Option<String>,
    },
    ContainerPicker {
        containers: Vec<String>,
        selected: usize,
    },
    Passphrase {
        input: String,
    },
    Search {
        input: String,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLogTarget {
    pub pod: String,
    pub namespace: String,
    pub container: Option<String>,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLogTarget {
    pub container_id: String,
    pub container_name: String,
    pub node: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub seq: u64,
}

/// One unit of work the reducer asks the dispatcher to run off the UI loop.
/// Every command produces exactly one message back.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Connect { name: String, path: String },
    FetchNamespaces,
    FetchPods,
    FetchPodDetail { name: String },
    FetchContainers { pod: String },
    FetchLogs {
        pod: String,
        container: Option<String>,
        tail: i64,
        timestamps: bool,
        previous: bool,
    },
    StartLogStream {
        pod: String,
        container: Option<String>,
        timestamps: bool,
        ticket: StreamTicket,
    },
    DeletePod { name: String },
    RestartPod { name: String },
    FetchDeployments,
    FetchDeploymentDetail { name: String },
    ScaleDeployment { name: String, replicas: i32 },
    RestartDeployment { name: String },
    DeleteDeployment { name: String },
    FetchServices,
    FetchServiceDetail { name: String },
    FetchEvents,
    ProbeMetrics,
    FetchMetrics,
    RemoteConnect {
        host: SshHostEntry,
        passphrase: Option<String>,
    },
    DisconnectRemote { shell: RemoteShell },
    FetchRemoteContainers,
    FetchNodeFacts,
    FetchRemoteLogs {
        container_id: String,
        tail: i64,
        timestamps: bool,
    },
    StartRemoteLogStream {
        container_id: String,
        timestamps: bool,
        ticket: StreamTicket,
    },
    SchedulePodRefresh,
    ScheduleEventRefresh,
    ScheduleNotificationExpiry { seq: u64 },
}

/// Every async result the dispatcher can deliver. Fetch errors arrive
/// pre-rendered as strings; classification happens at render time.
pub enum AppMsg {
    Connected(Result<KubeGateway, String>),
    NamespacesLoaded(Result<Vec<NamespaceRow>, String>),
    PodsLoaded(Result<Vec<PodRow>, String>),
    PodDetailLoaded(Result<(PodRow, Vec<PodEventRow>), String>),
    ContainersLoaded {
        pod: String,
        result: Result<Vec<String>, String>,
    },
    LogsLoaded(Result<String, String>),
    PodLogEvent {
        generation: u64,
        event: StreamEvent,
    },
    PodDeleted {
        name: String,
        result: Result<(), String>,
    },
    PodRestarted {
        name: String,
        result: Result<(), String>,
    },
    DeploymentsLoaded(Result<Vec<DeploymentRow>, String>),
    DeploymentDetailLoaded(Result<DeploymentRow, String>),
    DeploymentScaled {
        name: String,
        replicas: i32,
        result: Result<(), String>,
    },
    DeploymentRestarted {
        name: String,
        result: Result<(), String>,
    },
    DeploymentDeleted {
        name: String,
        result: Result<(), String>,
    },
    ServicesLoaded(Result<Vec<ServiceRow>, String>),
    ServiceDetailLoaded(Result<ServiceRow, String>),
    EventsLoaded(Result<Vec<EventRow>, String>),
    MetricsProbed(bool),
    MetricsLoaded(Result<HashMap<String, PodUsage>, String>),
    RemoteConnected(Box<Result<RemoteShell, RemoteError>>),
    RemoteContainersLoaded(Result<Vec<RemoteContainer>, String>),
    NodeFactsLoaded(Result<NodeFacts, String>),
    RemoteLogsLoaded(Result<String, String>),
    RemoteLogEvent {
        generation: u64,
        event: StreamEvent,
    },
    PodRefreshTick,
    EventRefreshTick,
    NotificationExpired { seq: u64 },
}

impl ListRow for KubeConfigEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        format!("{} {}", self.name, self.path)
    }
}

impl ListRow for SshHostEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        format!("{} {}@{}", self.name, self.user, self.host)
    }
}

pub struct App {
    running: bool,
    config: AppConfig,
    view: View,
    overlay: Option<Overlay>,
    status: ConnectionStatus,
    gateway: Option<KubeGateway>,
    cluster_info: Option<ClusterInfo>,
    active_namespace: String,
    selected_config: Option<KubeConfigEntry>,
    connect_error: Option<String>,
    loading: bool,

    kubeconfig_list: ResourceList<KubeConfigEntry>,
    namespaces: ResourceList<NamespaceRow>,
    pods: ResourceList<PodRow>,
    deployments: ResourceList<DeploymentRow>,
    services: ResourceList<ServiceRow>,

    selected_pod: Option<String>,
    pod_detail: Option<Result<(PodRow, Vec<PodEventRow>), String>>,
    selected_deployment: Option<String>,
    deployment_detail: Option<Result<DeploymentRow, String>>,
    selected_service: Option<String>,
    service_detail: Option<Result<ServiceRow, String>>,
    detail_scroll: u16,

    events: Vec<EventRow>,
    events_error: Option<String>,
    events_follow: bool,
    events_warnings_only: bool,
    events_kind_filter: Option<String>,
    events_scroll: u16,

    metrics_available: bool,
    metrics_enabled: bool,
    pod_metrics: HashMap<String, PodUsage>,

    pod_logs: LogSession<PodLogTarget>,
    logs_previous: bool,
    logs_origin: View,
    logs_error: Option<String>,
    log_scroll: u16,
    log_autoscroll: bool,

    ssh_hosts: ResourceList<SshHostEntry>,
    connecting_ssh_host: Option<SshHostEntry>,
    remote_shell: Option<RemoteShell>,
    remote_error: Option<String>,
    remote_containers: ResourceList<RemoteContainer>,
    node_facts: Option<NodeFacts>,
    remote_logs: LogSession<RemoteLogTarget>,
    remote_logs_error: Option<String>,
    remote_log_scroll: u16,
    remote_log_autoscroll: bool,

    notification: Option<Notification>,
    notification_seq: u64,
    pod_timer_pending: bool,
    event_timer_pending: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let mut kubeconfig_list = ResourceList::new();
        kubeconfig_list.replace(config.kubeconfigs.clone());
        let mut ssh_hosts = ResourceList::new();
        ssh_hosts.replace(config.ssh_hosts.clone());

        Self {
            running: true,
            config,
            view: View::ConfigSelect,
            overlay: None,
            status: ConnectionStatus::Disconnected,
            gateway: None,
            cluster_info: None,
            active_namespace: String::new(),
            selected_config: None,
            connect_error: None,
            loading: false,
            kubeconfig_list,
            namespaces: ResourceList::new(),
            pods: ResourceList::new(),
            deployments: ResourceList::new(),
            services: ResourceList::new(),
            selected_pod: None,
            pod_detail: None,
            selected_deployment: None,
            deployment_detail: None,
            selected_service: None,
            service_detail: None,
            detail_scroll: 0,
            events: Vec::new(),
            events_error: None,
            events_follow: true,
            events_warnings_only: false,
            events_kind_filter: None,
            events_scroll: 0,
            metrics_available: false,
            metrics_enabled: false,
            pod_metrics: HashMap::new(),
            pod_logs: LogSession::new(),
            logs_previous: false,
            logs_origin: View::Pods,
            logs_error: None,
            log_scroll: 0,
            log_autoscroll: true,
            ssh_hosts,
            connecting_ssh_host: None,
            remote_shell: None,
            remote_error: None,
            remote_containers: ResourceList::new(),
            node_facts: None,
            remote_logs: LogSession::new(),
            remote_logs_error: None,
            remote_log_scroll: 0,
            remote_log_autoscroll: true,
            notification: None,
            notification_seq: 0,
            pod_timer_pending: false,
            event_timer_pending: false,
        }
    }

    /// Commands to run before the first key press: with exactly one
    /// configured kubeconfig the selection screen is skipped entirely.
    pub fn initial_commands(&mut self) -> Vec<AppCommand> {
        if self.config.kubeconfigs.len() == 1 {
            let entry = self.config.kubeconfigs[0].clone();
            self.selected_config = Some(entry.clone());
            self.view = View::Connecting;
            self.status = ConnectionStatus::Connecting;
            return vec![AppCommand::Connect {
                name: entry.name,
                path: entry.path,
            }];
        }
        Vec::new()
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn gateway(&self) -> Option<&KubeGateway> {
        self.gateway.as_ref()
    }

    pub fn take_remote_shell(&mut self) -> Option<RemoteShell> {
        self.remote_shell.take()
    }

    pub fn remote_shell(&self) -> Option<&RemoteShell> {
        self.remote_shell.as_ref()
    }

    pub fn cluster_info(&self) -> Option<&ClusterInfo> {
        self.cluster_info.as_ref()
    }

    pub fn active_namespace(&self) -> &str {
        &self.active_namespace
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn selected_config(&self) -> Option<&KubeConfigEntry> {
        self.selected_config.as_ref()
    }

    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    pub fn remote_error(&self) -> Option<&str> {
        self.remote_error.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn kubeconfig_list(&self) -> &ResourceList<KubeConfigEntry> {
        &self.kubeconfig_list
    }

    pub fn namespaces(&self) -> &ResourceList<NamespaceRow> {
        &self.namespaces
    }

    pub fn pods(&self) -> &ResourceList<PodRow> {
        &self.pods
    }

    pub fn deployments(&self) -> &ResourceList<DeploymentRow> {
        &self.deployments
    }

    pub fn services(&self) -> &ResourceList<ServiceRow> {
        &self.services
    }

    pub fn ssh_hosts(&self) -> &ResourceList<SshHostEntry> {
        &self.ssh_hosts
    }

    pub fn remote_containers(&self) -> &ResourceList<RemoteContainer> {
        &self.remote_containers
    }

    pub fn pod_detail(&self) -> Option<&Result<(PodRow, Vec<PodEventRow>), String>> {
        self.pod_detail.as_ref()
    }

    pub fn deployment_detail(&self) -> Option<&Result<DeploymentRow, String>> {
        self.deployment_detail.as_ref()
    }

    pub fn service_detail(&self) -> Option<&Result<ServiceRow, String>> {
        self.service_detail.as_ref()
    }

    pub fn detail_scroll(&self) -> u16 {
        self.detail_scroll
    }

    pub fn events(&self) -> Vec<&EventRow> {
        self.events
            .iter()
            .filter(|event| !self.events_warnings_only || event.is_warning())
            .filter(|event| {
                self.events_kind_filter
                    .as_deref()
                    .is_none_or(|kind| event.object_kind == kind)
            })
            .collect()
    }

    pub fn events_error(&self) -> Option<&str> {
        self.events_error.as_deref()
    }

    pub fn events_follow(&self) -> bool {
        self.events_follow
    }

    pub fn events_warnings_only(&self) -> bool {
        self.events_warnings_only
    }

    pub fn events_kind_filter(&self) -> Option<&str> {
        self.events_kind_filter.as_deref()
    }

    pub fn events_scroll(&self) -> u16 {
        self.events_scroll
    }

    pub fn metrics_available(&self) -> bool {
        self.metrics_available
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    pub fn pod_metrics(&self) -> &HashMap<String, PodUsage> {
        &self.pod_metrics
    }

    pub fn pod_logs(&self) -> &LogSession<PodLogTarget> {
        &self.pod_logs
    }

    pub fn remote_logs(&self) -> &LogSession<RemoteLogTarget> {
        &self.remote_logs
    }

    pub fn logs_previous(&self) -> bool {
        self.logs_previous
    }

    pub fn logs_error(&self) -> Option<&str> {
        self.logs_error.as_deref()
    }

    pub fn remote_logs_error(&self) -> Option<&str> {
        self.remote_logs_error.as_deref()
    }

    pub fn log_scroll(&self) -> (u16, bool) {
        (self.log_scroll, self.log_autoscroll)
    }

    pub fn remote_log_scroll(&self) -> (u16, bool) {
        (self.remote_log_scroll, self.remote_log_autoscroll)
    }

    pub fn node_facts(&self) -> Option<&NodeFacts> {
        self.node_facts.as_ref()
    }

    pub fn connecting_ssh_host(&self) -> Option<&SshHostEntry> {
        self.connecting_ssh_host.as_ref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Which key table applies right now. Overlays first, then an active
    /// filter edit, then the visible view's class.
    pub fn input_context(&self) -> InputContext {
        match &self.overlay {
            Some(Overlay::Confirm { .. }) => return InputContext::Confirm,
            Some(Overlay::Scale { .. })
            | Some(Overlay::Passphrase { .. })
            | Some(Overlay::Search { .. }) => return InputContext::TextEntry,
            Some(Overlay::ContainerPicker { .. }) => return InputContext::Picker,
            Some(Overlay::Help) => return InputContext::Help,
            None => {}
        }

        if self.active_list_editing_filter() {
            return InputContext::TextEntry;
        }

        match self.view {
            View::Connecting | View::SshConnecting => InputContext::Connecting,
            View::Logs | View::RemoteLogs => InputContext::LogView,
            View::Events => InputContext::EventsView,
            View::PodDetail | View::DeploymentDetail | View::ServiceDetail | View::Main => {
                InputContext::Detail
            }
            _ => InputContext::List,
        }
    }

    fn active_list_editing_filter(&self) -> bool {
        match self.view {
            View::ConfigSelect => self.kubeconfig_list.editing_filter(),
            View::Namespaces => self.namespaces.editing_filter(),
            View::Pods => self.pods.editing_filter(),
            View::Deployments => self.deployments.editing_filter(),
            View::Services => self.services.editing_filter(),
            View::SshHosts => self.ssh_hosts.editing_filter(),
            View::RemoteContainers => self.remote_containers.editing_filter(),
            _ => false,
        }
    }

    pub fn apply_action(&mut self, action: Action) -> Vec<AppCommand> {
        if action == Action::Quit {
            return self.quit();
        }

        if self.overlay.is_some() {
            return self.apply_overlay_action(action);
        }

        if self.active_list_editing_filter() {
            return self.apply_filter_action(action);
        }

        self.apply_view_action(action)
    }

    fn quit(&mut self) -> Vec<AppCommand> {
        self.running = false;
        self.pod_logs.stop_stream();
        self.remote_logs.stop_stream();
        let mut commands = Vec::new();
        if let Some(shell) = self.remote_shell.take() {
            commands.push(AppCommand::DisconnectRemote { shell });
        }
        commands
    }

    fn apply_filter_action(&mut self, action: Action) -> Vec<AppCommand> {
        let list_action = |list: &mut dyn FilterEdit, action: &Action| match action {
            Action::InputChar(c) => list.push_char(*c),
            Action::Backspace => list.pop_char(),
            Action::SubmitInput => list.end(true),
            Action::CancelInput => list.end(false),
            _ => {}
        };

        match self.view {
            View::ConfigSelect => list_action(&mut self.kubeconfig_list, &action),
            View::Namespaces => list_action(&mut self.namespaces, &action),
            View::Pods => list_action(&mut self.pods, &action),
            View::Deployments => list_action(&mut self.deployments, &action),
            View::Services => list_action(&mut self.services, &action),
            View::SshHosts => list_action(&mut self.ssh_hosts, &action),
            View::RemoteContainers => list_action(&mut self.remote_containers, &action),
            _ => {}
        }
        Vec::new()
    }

    fn apply_overlay_action(&mut self, action: Action) -> Vec<AppCommand> {
        let Some(overlay) = self.overlay.take() else {
            return Vec::new();
        };

        match overlay {
            Overlay::Confirm {
                action: confirm,
                target,
                yes_selected,
            } => match action {
                Action::ConfirmYes => self.fire_confirmed(confirm, target),
                Action::ConfirmSelected if yes_selected => self.fire_confirmed(confirm, target),
                Action::ConfirmNo | Action::ConfirmSelected => Vec::new(),
                Action::ConfirmLeft => {
                    self.overlay = Some(Overlay::Confirm {
                        action: confirm,
                        target,
                        yes_selected: true,
                    });
                    Vec::new()
                }
                Action::ConfirmRight => {
                    self.overlay = Some(Overlay::Confirm {
                        action: confirm,
                        target,
                        yes_selected: false,
                    });
                    Vec::new()
                }
                Action::ConfirmToggle => {
                    self.overlay = Some(Overlay::Confirm {
                        action: confirm,
                        target,
                        yes_selected: !yes_selected,
                    });
                    Vec::new()
                }
                _ => {
                    self.overlay = Some(Overlay::Confirm {
                        action: confirm,
                        target,
                        yes_selected,
                    });
                    Vec::new()
                }
            },

            Overlay::Scale {
                deployment,
                current,
                mut input,
                mut error,
            } => match action {
                Action::SubmitInput => match validate_replicas(&input) {
                    Ok(replicas) => vec![AppCommand::ScaleDeployment {
                        name: deployment,
                        replicas,
                    }],
                    Err(message) => {
                        error = Some(message);
                        self.overlay = Some(Overlay::Scale {
                            deployment,
                            current,
                            input,
                            error,
                        });
                        Vec::new()
                    }
                },
                Action::CancelInput => Vec::new(),
                Action::InputChar(c) => {
                    if input.len() < 5 {
                        input.push(c);
                    }
                    self.overlay = Some(Overlay::Scale {
                        deployment,
                        current,
                        input,
                        error: None,
                    });
                    Vec::new()
                }
                Action::Backspace => {
                    input.pop();
                    self.overlay = Some(Overlay::Scale {
                        deployment,
                        current,
                        input,
                        error: None,
                    });
                    Vec::new()
                }
                _ => {
                    self.overlay = Some(Overlay::Scale {
                        deployment,
                        current,
                        input,
                        error,
                    });
                    Vec::new()
                }
            },

            Overlay::ContainerPicker {
                containers,
                mut selected,
            } => match action {
                Action::Select => {
                    let container = containers.get(selected).cloned();
                    if let (Some(container), Some(target)) =
                        (container, self.pod_logs.target().cloned())
                    {
                        self.pod_logs.set_target(PodLogTarget {
                            container: Some(container),
                            ..target
                        });
                        self.loading = true;
                        self.logs_error = None;
                        return self.fetch_pod_logs_tail();
                    }
                    Vec::new()
                }
                Action::Back => Vec::new(),
                Action::Down => {
                    selected = (selected + 1).min(containers.len().saturating_sub(1));
                    self.overlay = Some(Overlay::ContainerPicker { containers, selected });
                    Vec::new()
                }
                Action::Up => {
                    selected = selected.saturating_sub(1);
                    self.overlay = Some(Overlay::ContainerPicker { containers, selected });
                    Vec::new()
                }
                _ => {
                    self.overlay = Some(Overlay::ContainerPicker { containers, selected });
                    Vec::new()
                }
            },

            Overlay::Passphrase { mut input } => match action {
                Action::SubmitInput => {
                    if let Some(host) = self.connecting_ssh_host.clone() {
                        self.loading = true;
                        return vec![AppCommand::RemoteConnect {
                            host,
                            passphrase: Some(input),
                        }];
                    }
                    Vec::new()
                }
                Action::CancelInput => {
                    self.connecting_ssh_host = None;
                    self.view = View::SshHosts;
                    Vec::new()
                }
                Action::InputChar(c) => {
                    input.push(c);
                    self.overlay = Some(Overlay::Passphrase { input });
                    Vec::new()
                }
                Action::Backspace => {
                    input.pop();
                    self.overlay = Some(Overlay::Passphrase { input });
                    Vec::new()
                }
                _ => {
                    self.overlay = Some(Overlay::Passphrase { input });
                    Vec::new()
                }
            },

            Overlay::Search { mut input } => match action {
                Action::SubmitInput => Vec::new(),
                Action::CancelInput => {
                    self.active_log_session_clear_search();
                    Vec::new()
                }
                Action::InputChar(c) => {
                    input.push(c);
                    self.active_log_session_set_search(&input);
                    self.overlay = Some(Overlay::Search { input });
                    Vec::new()
                }
                Action::Backspace => {
                    input.pop();
                    self.active_log_session_set_search(&input);
                    self.overlay = Some(Overlay::Search { input });
                    Vec::new()
                }
                _ => {
                    self.overlay = Some(Overlay::Search { input });
                    Vec::new()
                }
            },

            Overlay::Help => match action {
                Action::ToggleHelp | Action::Back => Vec::new(),
                _ => {
                    self.overlay = Some(Overlay::Help);
                    Vec::new()
                }
            },
        }
    }

    fn fire_confirmed(&mut self, action: ConfirmAction, target: String) -> Vec<AppCommand> {
        match action {
            ConfirmAction::DeletePod => vec![AppCommand::DeletePod { name: target }],
            ConfirmAction::RestartPod => vec![AppCommand::RestartPod { name: target }],
            ConfirmAction::DeleteDeployment => {
                vec![AppCommand::DeleteDeployment { name: target }]
            }
            ConfirmAction::RestartDeployment => {
                vec![AppCommand::RestartDeployment { name: target }]
            }
        }
    }

    fn active_log_session_set_search(&mut self, query: &str) {
        match self.view {
            View::Logs => self.pod_logs.set_search_query(query),
            View::RemoteLogs => self.remote_logs.set_search_query(query),
            _ => {}
        }
    }

    fn active_log_session_clear_search(&mut self) {
        match self.view {
            View::Logs => self.pod_logs.clear_search(),
            View::RemoteLogs => self.remote_logs.clear_search(),
        _ => {}
        }
    }

    fn apply_view_action(&mut self, action: Action) -> Vec<AppCommand> {
        match action {
            Action::ToggleHelp => {
                self.overlay = Some(Overlay::Help);
                Vec::new()
            }
            Action::Down => self.scroll_or_move(1),
            Action::Up => self.scroll_or_move(-1),
            Action::PageDown => self.scroll_or_move(10),
            Action::PageUp => self.scroll_or_move(-10),
            Action::Top => self.jump_top(),
            Action::Bottom => self.jump_bottom(),
            Action::StartFilter => {
                self.with_active_list(|list| list.begin());
                Vec::new()
            }
            Action::StartSearch => {
                let input = match self.view {
                    View::Logs => self.pod_logs.search_query().to_string(),
                    View::RemoteLogs => self.remote_logs.search_query().to_string(),
                    _ => return Vec::new(),
                };
                self.overlay = Some(Overlay::Search { input });
                Vec::new()
            }
            Action::Select => self.select_current(),
            Action::Back => self.navigate_back(),
            Action::Refresh => self.refresh_current(),
            Action::OpenLogs => self.open_logs(),
            Action::Delete => self.request_delete(),
            Action::Restart => self.request_restart(),
            Action::Scale => self.request_scale(),
            Action::ToggleMetrics => self.toggle_metrics(),
            Action::Follow => self.toggle_follow(),
            Action::Timestamps => self.toggle_timestamps(),
            Action::TogglePrevious => self.toggle_previous(),
            Action::ChangeContainer => self.open_container_picker(),
            Action::NextMatch => {
                self.next_search_match(true);
                Vec::new()
            }
            Action::PrevMatch => {
                self.next_search_match(false);
                Vec::new()
            }
            Action::WarningsOnly => {
                if self.view == View::Events {
                    self.events_warnings_only = !self.events_warnings_only;
                }
                Vec::new()
            }
            Action::CycleKind => {
                if self.view == View::Events {
                    self.cycle_event_kind();
                }
                Vec::new()
            }
            Action::GotoNamespaces => self.goto(View::Namespaces),
            Action::GotoPods => self.goto(View::Pods),
            Action::GotoDeployments => self.goto(View::Deployments),
            Action::GotoServices => self.goto(View::Services),
            Action::GotoEvents => self.goto(View::Events),
            Action::GotoSshHosts => {
                if self.config.ssh_hosts.is_empty() {
                    return Vec::new();
                }
                self.leave_log_views();
                self.view = View::SshHosts;
                self.remote_error = None;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn with_active_list(&mut self, f: impl FnOnce(&mut dyn FilterEdit)) {
        match self.view {
            View::ConfigSelect => f(&mut self.kubeconfig_list),
            View::Namespaces => f(&mut self.namespaces),
            View::Pods => f(&mut self.pods),
            View::Deployments => f(&mut self.deployments),
            View::Services => f(&mut self.services),
            View::SshHosts => f(&mut self.ssh_hosts),
            View::RemoteContainers => f(&mut self.remote_containers),
            _ => {}
        }
    }

    fn scroll_or_move(&mut self, delta: isize) -> Vec<AppCommand> {
        match self.view {
            View::ConfigSelect => self.kubeconfig_list.move_selection(delta),
            View::Namespaces => self.namespaces.move_selection(delta),
            View::Pods => self.pods.move_selection(delta),
            View::Deployments => self.deployments.move_selection(delta),
            View::Services => self.services.move_selection(delta),
            View::SshHosts => self.ssh_hosts.move_selection(delta),
            View::RemoteContainers => self.remote_containers.move_selection(delta),
            View::PodDetail | View::DeploymentDetail | View::ServiceDetail | View::Main => {
                self.detail_scroll = add_scroll(self.detail_scroll, delta);
            }
            View::Logs => {
                self.log_autoscroll = false;
                self.log_scroll = add_scroll(self.log_scroll, delta);
            }
            View::RemoteLogs => {
                self.remote_log_autoscroll = false;
                self.remote_log_scroll = add_scroll(self.remote_log_scroll, delta);
            }
            View::Events => {
                self.events_scroll = add_scroll(self.events_scroll, delta);
            }
            _ => {}
        }
        Vec::new()
    }

    fn jump_top(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Logs => {
                self.log_autoscroll = false;
                self.log_scroll = 0;
            }
            View::RemoteLogs => {
                self.remote_log_autoscroll = false;
                self.remote_log_scroll = 0;
            }
            View::Events => self.events_scroll = 0,
            View::PodDetail | View::DeploymentDetail | View::ServiceDetail => {
                self.detail_scroll = 0
            }
            _ => self.with_active_list_move(|list| list.first()),
        }
        Vec::new()
    }

    fn jump_bottom(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Logs => {
                self.log_autoscroll = true;
            }
            View::RemoteLogs => {
                self.remote_log_autoscroll = true;
            }
            View::Events => self.events_scroll = u16::MAX,
            View::PodDetail | View::DeploymentDetail | View::ServiceDetail => {
                self.detail_scroll = u16::MAX
            }
            _ => self.with_active_list_move(|list| list.last()),
        }
        Vec::new()
    }

    fn with_active_list_move(&mut self, f: impl FnOnce(&mut dyn SelectMove)) {
        match self.view {
            View::ConfigSelect => f(&mut self.kubeconfig_list),
            View::Namespaces => f(&mut self.namespaces),
            View::Pods => f(&mut self.pods),
            View::Deployments => f(&mut self.deployments),
            View::Services => f(&mut self.services),
            View::SshHosts => f(&mut self.ssh_hosts),
            View::RemoteContainers => f(&mut self.remote_containers),
            _ => {}
        }
    }

    fn select_current(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::ConfigSelect => {
                let Some(entry) = self.kubeconfig_list.selected().cloned() else {
                    return Vec::new();
                };
                self.selected_config = Some(entry.clone());
                self.view = View::Connecting;
                self.status = ConnectionStatus::Connecting;
                self.connect_error = None;
                vec![AppCommand::Connect {
                    name: entry.name,
                    path: entry.path,
                }]
            }
            View::Namespaces => {
                let Some(namespace) = self.namespaces.selected().cloned() else {
                    return Vec::new();
                };
                self.active_namespace = namespace.name.clone();
                if let Some(gateway) = self.gateway.as_mut() {
                    gateway.set_namespace(namespace.name.clone());
                }
                if let Some(info) = self.cluster_info.as_mut() {
                    info.namespace = namespace.name;
                }
                self.view = View::Pods;
                self.loading = true;
                let mut commands = vec![AppCommand::FetchPods];
                commands.extend(self.schedule_pod_refresh());
                commands
            }
            View::Pods => {
                let Some(pod) = self.pods.selected().cloned() else {
                    return Vec::new();
                };
                self.selected_pod = Some(pod.name.clone());
                self.view = View::PodDetail;
                self.pod_detail = None;
                self.detail_scroll = 0;
                self.loading = true;
                vec![AppCommand::FetchPodDetail { name: pod.name }]
            }
            View::SshHosts => {
                let Some(host) = self.ssh_hosts.selected().cloned() else {
                    return Vec::new();
                };
                self.connecting_ssh_host = Some(host.clone());
                self.view = View::SshConnecting;
                self.remote_error = None;
                self.loading = true;
                let mut commands = Vec::new();
                // a previous connection of this kind is torn down first
                if let Some(shell) = self.remote_shell.take() {
                    commands.push(AppCommand::DisconnectRemote { shell });
                }
                commands.push(AppCommand::RemoteConnect {
                    host,
                    passphrase: None,
                });
                commands
            }
            View::RemoteContainers => {
                let Some(container) = self.remote_containers.selected().cloned() else {
                    return Vec::new();
                };
                let node = self
                    .connecting_ssh_host
                    .as_ref()
                    .map(|host| host.name.clone())
                    .unwrap_or_default();
                self.remote_logs.set_target(RemoteLogTarget {
                    container_id: container.id.clone(),
                    container_name: container.name.clone(),
                    node,
                });
                self.view = View::RemoteLogs;
                self.remote_logs_error = None;
                self.remote_log_autoscroll = true;
                self.loading = true;
                vec![AppCommand::FetchRemoteLogs {
                    container_id: container.id,
                    tail: self.remote_logs.tail_lines,
                    timestamps: self.remote_logs.timestamps(),
                }]
            }
            View::Deployments => {
                let Some(deployment) = self.deployments.selected().cloned() else {
                    return Vec::new();
                };
                self.selected_deployment = Some(deployment.name.clone());
                self.view = View::DeploymentDetail;
                self.deployment_detail = None;
                self.detail_scroll = 0;
                self.loading = true;
                vec![AppCommand::FetchDeploymentDetail {
                    name: deployment.name,
                }]
            }
            View::Services => {
                let Some(service) = self.services.selected().cloned() else {
                    return Vec::new();
                };
                self.selected_service = Some(service.name.clone());
                self.view = View::ServiceDetail;
                self.service_detail = None;
                self.detail_scroll = 0;
                self.loading = true;
                vec![AppCommand::FetchServiceDetail { name: service.name }]
            }
            _ => Vec::new(),
        }
    }

    /// `esc` follows a fixed parent tree, not a history stack.
    fn navigate_back(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Main => {
                if self.connected() {
                    self.view = View::Pods;
                    let mut commands = vec![AppCommand::FetchPods];
                    commands.extend(self.schedule_pod_refresh());
                    return commands;
                }
                if self.config.kubeconfigs.len() > 1 {
                    self.reset_to_config_select();
                }
                Vec::new()
            }
            View::Logs => {
                self.pod_logs.stop_stream();
                self.pod_logs.clear_target();
                self.logs_error = None;
                if self.logs_origin == View::PodDetail && self.selected_pod.is_some() {
                    self.view = View::PodDetail;
                    self.loading = true;
                    let name = self.selected_pod.clone().unwrap_or_default();
                    return vec![AppCommand::FetchPodDetail { name }];
                }
                self.view = View::Pods;
                self.selected_pod = None;
                let mut commands = vec![AppCommand::FetchPods];
                commands.extend(self.schedule_pod_refresh());
                commands
            }
            View::PodDetail => {
                self.view = View::Pods;
                self.selected_pod = None;
                self.pod_detail = None;
                let mut commands = vec![AppCommand::FetchPods];
                commands.extend(self.schedule_pod_refresh());
                commands
            }
            View::Pods => {
                self.view = View::Namespaces;
                self.loading = true;
                vec![AppCommand::FetchNamespaces]
            }
            View::Namespaces => {
                if self.config.kubeconfigs.len() > 1 {
                    self.reset_to_config_select();
                }
                Vec::new()
            }
            View::SshHosts => {
                if self.connected() {
                    self.view = View::Pods;
                    let mut commands = vec![AppCommand::FetchPods];
                    commands.extend(self.schedule_pod_refresh());
                    return commands;
                }
                self.view = View::Namespaces;
                vec![AppCommand::FetchNamespaces]
            }
            View::SshConnecting => {
                self.connecting_ssh_host = None;
                self.view = View::SshHosts;
                Vec::new()
            }
            View::RemoteContainers => {
                self.view = View::SshHosts;
                self.node_facts = None;
                self.connecting_ssh_host = None;
                match self.remote_shell.take() {
                    Some(shell) => vec![AppCommand::DisconnectRemote { shell }],
                    None => Vec::new(),
                }
            }
            View::RemoteLogs => {
                self.remote_logs.stop_stream();
                self.remote_logs.clear_target();
                self.remote_logs_error = None;
                self.view = View::RemoteContainers;
                Vec::new()
            }
            View::Deployments | View::Services | View::Events => {
                self.view = View::Pods;
                let mut commands = vec![AppCommand::FetchPods];
                commands.extend(self.schedule_pod_refresh());
                commands
            }
            View::DeploymentDetail => {
                self.view = View::Deployments;
                self.selected_deployment = None;
                self.deployment_detail = None;
                vec![AppCommand::FetchDeployments]
            }
            View::ServiceDetail => {
                self.view = View::Services;
                self.selected_service = None;
                self.service_detail = None;
                vec![AppCommand::FetchServices]
            }
            View::ConfigSelect | View::Connecting => Vec::new(),
        }
    }

    fn reset_to_config_select(&mut self) {
        self.view = View::ConfigSelect;
        self.gateway = None;
        self.cluster_info = None;
        self.status = ConnectionStatus::Disconnected;
        self.connect_error = None;
        self.metrics_available = false;
        self.metrics_enabled = false;
        self.pod_metrics.clear();
    }

    fn refresh_current(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Namespaces if self.connected() => {
                self.loading = true;
                vec![AppCommand::FetchNamespaces]
            }
            View::Pods if self.connected() => {
                self.loading = true;
                vec![AppCommand::FetchPods]
            }
            View::PodDetail => match self.selected_pod.clone() {
                Some(name) if self.connected() => {
                    self.loading = true;
                    vec![AppCommand::FetchPodDetail { name }]
                }
                _ => Vec::new(),
            },
            View::Logs if self.connected() => {
                self.pod_logs.prepare_refresh();
                self.loading = true;
                self.logs_error = None;
                self.fetch_pod_logs_tail()
            }
            View::Main => {
                if let Some(entry) = self.selected_config.clone()
                    && !self.connected()
                {
                    self.view = View::Connecting;
                    self.status = ConnectionStatus::Connecting;
                    self.connect_error = None;
                    return vec![AppCommand::Connect {
                        name: entry.name,
                        path: entry.path,
                    }];
                }
                Vec::new()
            }
            View::RemoteContainers if self.remote_shell.is_some() => {
                self.loading = true;
                vec![AppCommand::FetchRemoteContainers, AppCommand::FetchNodeFacts]
            }
            View::RemoteLogs if self.remote_shell.is_some() => {
                self.remote_logs.prepare_refresh();
                self.loading = true;
                self.remote_logs_error = None;
                self.fetch_remote_logs_tail()
            }
            View::Deployments if self.connected() => {
                self.loading = true;
                vec![AppCommand::FetchDeployments]
            }
            View::DeploymentDetail => match self.selected_deployment.clone() {
                Some(name) if self.connected() => {
                    self.loading = true;
                    vec![AppCommand::FetchDeploymentDetail { name }]
                }
                _ => Vec::new(),
            },
            View::Services if self.connected() => {
                self.loading = true;
                vec![AppCommand::FetchServices]
            }
            View::ServiceDetail => match self.selected_service.clone() {
                Some(name) if self.connected() => {
                    self.loading = true;
                    vec![AppCommand::FetchServiceDetail { name }]
                }
                _ => Vec::new(),
            },
            View::Events if self.connected() => {
                self.loading = true;
                let mut commands = vec![AppCommand::FetchEvents];
                commands.extend(self.schedule_event_refresh());
                commands
            }
            _ => Vec::new(),
        }
    }

    fn open_logs(&mut self) -> Vec<AppCommand> {
        let pod = match self.view {
            View::Pods => self.pods.selected().map(|pod| pod.name.clone()),
            View::PodDetail => self.selected_pod.clone(),
            _ => None,
        };
        let Some(pod) = pod else {
            return Vec::new();
        };
        self.selected_pod = Some(pod.clone());
        self.logs_origin = self.view;
        self.loading = true;
        vec![AppCommand::FetchContainers { pod }]
    }

    fn request_delete(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Pods | View::PodDetail => {
                if let Some(name) = self.current_pod_name() {
                    self.overlay = Some(Overlay::Confirm {
                        action: ConfirmAction::DeletePod,
                        target: name,
                        yes_selected: false,
                    });
                }
            }
            View::Deployments | View::DeploymentDetail => {
                if let Some(name) = self.current_deployment_name() {
                    self.overlay = Some(Overlay::Confirm {
                        action: ConfirmAction::DeleteDeployment,
                        target: name,
                        yes_selected: false,
                    });
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn request_restart(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Pods | View::PodDetail => {
                if let Some(name) = self.current_pod_name() {
                    self.overlay = Some(Overlay::Confirm {
                        action: ConfirmAction::RestartPod,
                        target: name,
                        yes_selected: false,
                    });
                }
            }
            View::Deployments | View::DeploymentDetail => {
                if let Some(name) = self.current_deployment_name() {
                    self.overlay = Some(Overlay::Confirm {
                        action: ConfirmAction::RestartDeployment,
                        target: name,
                        yes_selected: false,
                    });
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn request_scale(&mut self) -> Vec<AppCommand> {
        let deployment = match self.view {
            View::Deployments => self.deployments.selected().cloned(),
            View::DeploymentDetail => self
                .deployment_detail
                .as_ref()
                .and_then(|result| result.as_ref().ok())
                .cloned(),
            _ => None,
        };
        if let Some(deployment) = deployment {
            self.overlay = Some(Overlay::Scale {
                input: deployment.replicas.to_string(),
                deployment: deployment.name,
                current: deployment.replicas,
                error: None,
            });
        }
        Vec::new()
    }

    fn current_pod_name(&self) -> Option<String> {
        match self.view {
            View::Pods => self.pods.selected().map(|pod| pod.name.clone()),
            View::PodDetail => self.selected_pod.clone(),
            _ => None,
        }
    }

    fn current_deployment_name(&self) -> Option<String> {
        match self.view {
            View::Deployments => self
                .deployments
                .selected()
                .map(|deployment| deployment.name.clone()),
            View::DeploymentDetail => self.selected_deployment.clone(),
            _ => None,
        }
    }

    fn toggle_metrics(&mut self) -> Vec<AppCommand> {
        if self.view != View::Pods {
            return Vec::new();
        }
        if !self.metrics_available {
            return self.notify(
                NotificationKind::Warning,
                "Metrics not available (metrics-server not installed)",
            );
        }
        self.metrics_enabled = !self.metrics_enabled;
        if self.metrics_enabled && self.pod_metrics.is_empty() {
            return vec![AppCommand::FetchMetrics];
        }
        Vec::new()
    }

    fn toggle_follow(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Logs => {
                if self.pod_logs.following() {
                    // cancellation of a user-stopped stream is expected and
                    // never surfaces as an error
                    self.pod_logs.stop_stream();
                    Vec::new()
                } else if self.pod_logs.target().is_some() {
                    self.log_autoscroll = true;
                    self.start_pod_log_stream()
                } else {
                    Vec::new()
                }
            }
            View::RemoteLogs => {
                if self.remote_logs.following() {
                    self.remote_logs.stop_stream();
                    Vec::new()
                } else if self.remote_logs.target().is_some() {
                    self.remote_log_autoscroll = true;
                    self.start_remote_log_stream()
                } else {
                    Vec::new()
                }
            }
            View::Events => {
                self.events_follow = !self.events_follow;
                if self.events_follow {
                    let mut commands = vec![AppCommand::FetchEvents];
                    commands.extend(self.schedule_event_refresh());
                    commands
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn start_pod_log_stream(&mut self) -> Vec<AppCommand> {
        let Some(target) = self.pod_logs.target().cloned() else {
            return Vec::new();
        };
        let timestamps = self.pod_logs.timestamps();
        let ticket = self.pod_logs.begin_stream();
        vec![AppCommand::StartLogStream {
            pod: target.pod,
            container: target.container,
            timestamps,
            ticket,
        }]
    }

    fn start_remote_log_stream(&mut self) -> Vec<AppCommand> {
        let Some(target) = self.remote_logs.target().cloned() else {
            return Vec::new();
        };
        let timestamps = self.remote_logs.timestamps();
        let ticket = self.remote_logs.begin_stream();
        vec![AppCommand::StartRemoteLogStream {
            container_id: target.container_id,
            timestamps,
            ticket,
        }]
    }

    fn toggle_timestamps(&mut self) -> Vec<AppCommand> {
        match self.view {
            View::Logs if self.pod_logs.target().is_some() => {
                self.pod_logs.toggle_timestamps();
                self.pod_logs.prepare_refresh();
                self.loading = true;
                self.fetch_pod_logs_tail()
            }
            View::RemoteLogs if self.remote_logs.target().is_some() => {
                self.remote_logs.toggle_timestamps();
                self.remote_logs.prepare_refresh();
                self.loading = true;
                self.fetch_remote_logs_tail()
            }
            _ => Vec::new(),
        }
    }

    fn toggle_previous(&mut self) -> Vec<AppCommand> {
        if self.view != View::Logs || self.pod_logs.target().is_none() {
            return Vec::new();
        }
        self.logs_previous = !self.logs_previous;
        self.pod_logs.prepare_refresh();
        self.loading = true;
        self.fetch_pod_logs_tail()
    }

    fn open_container_picker(&mut self) -> Vec<AppCommand> {
        if self.view != View::Logs {
            return Vec::new();
        }
        let Some(target) = self.pod_logs.target() else {
            return Vec::new();
        };
        if target.containers.len() < 2 {
            return Vec::new();
        }
        let selected = target
            .container
            .as_deref()
            .and_then(|current| target.containers.iter().position(|name| name == current))
            .unwrap_or(0);
        self.overlay = Some(Overlay::ContainerPicker {
            containers: target.containers.clone(),
            selected,
        });
        Vec::new()
    }

    fn next_search_match(&mut self, forward: bool) {
        match self.view {
            View::Logs => {
                if self.pod_logs.search_query().is_empty() {
                    return;
                }
                if forward {
                    self.pod_logs.next_match();
                } else {
                    self.pod_logs.prev_match();
                }
                if let Some(line) = self.pod_logs.current_match_line() {
                    self.log_autoscroll = false;
                    self.log_scroll = line.min(u16::MAX as usize) as u16;
                }
            }
            View::RemoteLogs => {
                if self.remote_logs.search_query().is_empty() {
                    return;
                }
                if forward {
                    self.remote_logs.next_match();
                } else {
                    self.remote_logs.prev_match();
                }
                if let Some(line) = self.remote_logs.current_match_line() {
                    self.remote_log_autoscroll = false;
                    self.remote_log_scroll = line.min(u16::MAX as usize) as u16;
                }
            }
            _ => {}
        }
    }

    fn cycle_event_kind(&mut self) {
        let mut kinds: Vec<String> = self
            .events
            .iter()
            .map(|event| event.object_kind.clone())
            .collect();
        kinds.sort();
        kinds.dedup();
        if kinds.is_empty() {
            self.events_kind_filter = None;
            return;
        }
        self.events_kind_filter = match self.events_kind_filter.take() {
            None => Some(kinds[0].clone()),
            Some(current) => kinds
                .iter()
                .position(|kind| *kind == current)
                .and_then(|index| kinds.get(index + 1))
                .cloned(),
        };
    }

    fn goto(&mut self, view: View) -> Vec<AppCommand> {
        if !self.connected() || self.view == view {
            return Vec::new();
        }
        self.leave_log_views();
        self.view = view;
        self.loading = true;
        match view {
            View::Namespaces => vec![AppCommand::FetchNamespaces],
            View::Pods => {
                let mut commands = vec![AppCommand::FetchPods];
                commands.extend(self.schedule_pod_refresh());
                commands
            }
            View::Deployments => vec![AppCommand::FetchDeployments],
            View::Services => vec![AppCommand::FetchServices],
            View::Events => {
                let mut commands = vec![AppCommand::FetchEvents];
                commands.extend(self.schedule_event_refresh());
                commands
            }
            _ => Vec::new(),
        }
    }

    /// No stream may keep running silently after its view is gone.
    fn leave_log_views(&mut self) {
        if self.view == View::Logs {
            self.pod_logs.stop_stream();
            self.pod_logs.clear_target();
        }
        if self.view == View::RemoteLogs {
            self.remote_logs.stop_stream();
            self.remote_logs.clear_target();
        }
    }

    fn fetch_pod_logs_tail(&self) -> Vec<AppCommand> {
        let Some(target) = self.pod_logs.target() else {
            return Vec::new();
        };
        vec![AppCommand::FetchLogs {
            pod: target.pod.clone(),
            container: target.container.clone(),
            tail: self.pod_logs.tail_lines,
            timestamps: self.pod_logs.timestamps(),
            previous: self.logs_previous,
        }]
    }

    fn fetch_remote_logs_tail(&self) -> Vec<AppCommand> {
        let Some(target) = self.remote_logs.target() else {
            return Vec::new();
        };
        vec![AppCommand::FetchRemoteLogs {
            container_id: target.container_id.clone(),
            tail: self.remote_logs.tail_lines,
            timestamps: self.remote_logs.timestamps(),
        }]
    }

    fn schedule_pod_refresh(&mut self) -> Vec<AppCommand> {
        if self.pod_timer_pending {
            return Vec::new();
        }
        self.pod_timer_pending = true;
        vec![AppCommand::SchedulePodRefresh]
    }

    fn schedule_event_refresh(&mut self) -> Vec<AppCommand> {
        if self.event_timer_pending {
            return Vec::new();
        }
        self.event_timer_pending = true;
        vec![AppCommand::ScheduleEventRefresh]
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> Vec<AppCommand> {
        self.notification_seq += 1;
        let seq = self.notification_seq;
        self.notification = Some(Notification {
            message: message.into(),
            kind,
            seq,
        });
        vec![AppCommand::ScheduleNotificationExpiry { seq }]
    }

    pub fn apply_message(&mut self, msg: AppMsg) -> Vec<AppCommand> {
        match msg {
            AppMsg::Connected(Ok(gateway)) => {
                self.cluster_info = Some(gateway.info().clone());
                self.active_namespace = gateway.namespace().to_string();
                self.gateway = Some(gateway);
                self.status = ConnectionStatus::Connected;
                self.connect_error = None;
                self.view = View::Namespaces;
                self.loading = true;
                vec![AppCommand::FetchNamespaces, AppCommand::ProbeMetrics]
            }
            AppMsg::Connected(Err(error)) => {
                self.status = ConnectionStatus::Error;
                self.connect_error = Some(error);
                self.view = View::Main;
                Vec::new()
            }
            AppMsg::NamespacesLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.namespaces.replace(rows),
                    Err(error) => self.namespaces.set_error(error),
                }
                Vec::new()
            }
            AppMsg::PodsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.pods.replace(rows),
                    Err(error) => self.pods.set_error(error),
                }
                Vec::new()
            }
            AppMsg::PodDetailLoaded(result) => {
                self.loading = false;
                self.pod_detail = Some(result);
                Vec::new()
            }
            AppMsg::ContainersLoaded { pod, result } => {
                self.loading = false;
                match result {
                    Ok(containers) => {
                        self.pod_logs.set_target(PodLogTarget {
                            container: containers.first().cloned(),
                            containers,
                            pod: pod.clone(),
                            namespace: self.active_namespace.clone(),
                        });
                        self.logs_previous = false;
                        self.logs_error = None;
                        self.log_autoscroll = true;
                        self.view = View::Logs;
                        self.loading = true;
                        self.fetch_pod_logs_tail()
                    }
                    Err(error) => self.notify(
                        NotificationKind::Error,
                        format!("Failed to load containers for '{pod}': {error}"),
                    ),
                }
            }
            AppMsg::LogsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(content) => {
                        self.pod_logs.set_tail(&content);
                        self.logs_error = None;
                    }
                    Err(error) => self.logs_error = Some(error),
                }
                Vec::new()
            }
            AppMsg::PodLogEvent { generation, event } => {
                match self.pod_logs.apply_stream_event(generation, event) {
                    SessionOutcome::Reconnect if self.view == View::Logs => {
                        self.start_pod_log_stream()
                    }
                    SessionOutcome::Reconnect => {
                        self.pod_logs.stop_stream();
                        Vec::new()
                    }
                    SessionOutcome::Failed(message) => self.notify(
                        NotificationKind::Info,
                        format!("Log stream ended: {message}"),
                    ),
                    _ => Vec::new(),
                }
            }
            AppMsg::PodDeleted { name, result } => match result {
                Ok(()) => {
                    self.view = View::Pods;
                    self.selected_pod = None;
                    self.pods.clear_filter();
                    let mut commands = self.notify(
                        NotificationKind::Success,
                        format!("Pod '{name}' deleted"),
                    );
                    commands.push(AppCommand::FetchPods);
                    commands.extend(self.schedule_pod_refresh());
                    commands
                }
                Err(error) => self.notify(
                    NotificationKind::Error,
                    format!("Failed to delete pod '{name}': {error}"),
                ),
            },
            AppMsg::PodRestarted { name, result } => match result {
                Ok(()) => {
                    self.view = View::Pods;
                    self.selected_pod = None;
                    self.pods.clear_filter();
                    let mut commands = self.notify(
                        NotificationKind::Success,
                        format!("Pod '{name}' restarting..."),
                    );
                    commands.push(AppCommand::FetchPods);
                    commands.extend(self.schedule_pod_refresh());
                    commands
                }
                Err(error) => self.notify(
                    NotificationKind::Error,
                    format!("Failed to restart pod '{name}': {error}"),
                ),
            },
            AppMsg::DeploymentsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.deployments.replace(rows),
                    Err(error) => self.deployments.set_error(error),
                }
                Vec::new()
            }
            AppMsg::DeploymentDetailLoaded(result) => {
                self.loading = false;
                self.deployment_detail = Some(result);
                Vec::new()
            }
            AppMsg::DeploymentScaled {
                name,
                replicas,
                result,
            } => match result {
                Ok(()) => {
                    self.view = View::Deployments;
                    self.deployments.clear_filter();
                    let mut commands = self.notify(
                        NotificationKind::Success,
                        format!("Deployment '{name}' scaled to {replicas} replicas"),
                    );
                    commands.push(AppCommand::FetchDeployments);
                    commands
                }
                Err(error) => self.notify(
                    NotificationKind::Error,
                    format!("Failed to scale deployment '{name}': {error}"),
                ),
            },
            AppMsg::DeploymentRestarted { name, result } => match result {
                Ok(()) => {
                    self.view = View::Deployments;
                    self.selected_deployment = None;
                    self.deployments.clear_filter();
                    let mut commands = self.notify(
                        NotificationKind::Success,
                        format!("Deployment '{name}' restarting..."),
                    );
                    commands.push(AppCommand::FetchDeployments);
                    commands
                }
                Err(error) => self.notify(
                    NotificationKind::Error,
                    format!("Failed to restart deployment '{name}': {error}"),
                ),
            },
            AppMsg::DeploymentDeleted { name, result } => match result {
                Ok(()) => {
                    self.view = View::Deployments;
                    self.selected_deployment = None;
                    self.deployments.clear_filter();
                    let mut commands = self.notify(
                        NotificationKind::Success,
                        format!("Deployment '{name}' deleted"),
                    );
                    commands.push(AppCommand::FetchDeployments);
                    commands
                }
                Err(error) => self.notify(
                    NotificationKind::Error,
                    format!("Failed to delete deployment '{name}': {error}"),
                ),
            },
            AppMsg::ServicesLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.services.replace(rows),
                    Err(error) => self.services.set_error(error),
                }
                Vec::new()
            }
            AppMsg::ServiceDetailLoaded(result) => {
                self.loading = false;
                self.service_detail = Some(result);
                Vec::new()
            }
            AppMsg::EventsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => {
                        self.events = rows;
                        self.events_error = None;
                    }
                    Err(error) => self.events_error = Some(error),
                }
                Vec::new()
            }
            AppMsg::MetricsProbed(available) => {
                self.metrics_available = available;
                Vec::new()
            }
            AppMsg::MetricsLoaded(result) => {
                match result {
                    Ok(metrics) => self.pod_metrics = metrics,
                    // metrics are optional; losing them is silent
                    Err(_) => self.pod_metrics.clear(),
                }
                Vec::new()
            }
            AppMsg::RemoteConnected(result) => {
                self.loading = false;
                match *result {
                    Ok(shell) => {
                        if self.connecting_ssh_host.is_none() {
                            // user backed out while the connect was in flight
                            return vec![AppCommand::DisconnectRemote { shell }];
                        }
                        self.remote_shell = Some(shell);
                        self.remote_error = None;
                        self.view = View::RemoteContainers;
                        self.loading = true;
                        vec![AppCommand::FetchRemoteContainers, AppCommand::FetchNodeFacts]
                    }
                    Err(RemoteError::PassphraseRequired) => {
                        self.overlay = Some(Overlay::Passphrase {
                            input: String::new(),
                        });
                        self.view = View::SshConnecting;
                        Vec::new()
                    }
                    Err(error) => {
                        self.remote_error = Some(error.to_string());
                        self.connecting_ssh_host = None;
                        self.view = View::SshHosts;
                        Vec::new()
                    }
                }
            }
            AppMsg::RemoteContainersLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.remote_containers.replace(rows),
                    Err(error) => self.remote_containers.set_error(error),
                }
                Vec::new()
            }
            AppMsg::NodeFactsLoaded(result) => {
                if let Ok(facts) = result {
                    self.node_facts = Some(facts);
                }
                Vec::new()
            }
            AppMsg::RemoteLogsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(content) => {
                        self.remote_logs.set_tail(&content);
                        self.remote_logs_error = None;
                    }
                    Err(error) => self.remote_logs_error = Some(error),
                }
                Vec::new()
            }
            AppMsg::RemoteLogEvent { generation, event } => {
                match self.remote_logs.apply_stream_event(generation, event) {
                    SessionOutcome::Reconnect if self.view == View::RemoteLogs => {
                        self.start_remote_log_stream()
                    }
                    SessionOutcome::Reconnect => {
                        self.remote_logs.stop_stream();
                        Vec::new()
                    }
                    SessionOutcome::Failed(message) => self.notify(
                        NotificationKind::Info,
                        format!("Log stream ended: {message}"),
                    ),
                    _ => Vec::new(),
                }
            }
            AppMsg::PodRefreshTick => {
                self.pod_timer_pending = false;
                let guard = self.view == View::Pods
                    && self.connected()
                    && self.overlay.is_none()
                    && !self.pods.editing_filter();
                if guard {
                    let mut commands = vec![AppCommand::FetchPods];
                    commands.extend(self.schedule_pod_refresh());
                    return commands;
                }
                // reschedule while the view still owns the timer so the
                // guard can become true again without re-navigation
                if self.view == View::Pods && self.connected() {
                    return self.schedule_pod_refresh();
                }
                Vec::new()
            }
            AppMsg::EventRefreshTick => {
                self.event_timer_pending = false;
                let guard = self.view == View::Events
                    && self.connected()
                    && self.events_follow
                    && self.overlay.is_none();
                if guard {
                    let mut commands = vec![AppCommand::FetchEvents];
                    commands.extend(self.schedule_event_refresh());
                    return commands;
                }
                if self.view == View::Events && self.connected() {
                    return self.schedule_event_refresh();
                }
                Vec::new()
            }
            AppMsg::NotificationExpired { seq } => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|notification| notification.seq == seq)
                {
                    self.notification = None;
                }
                Vec::new()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn connect_for_tests(&mut self, namespace: &str) {
        self.status = ConnectionStatus::Connected;
        self.active_namespace = namespace.to_string();
        self.cluster_info = Some(ClusterInfo {
            name: "test".to_string(),
            context: "test".to_string(),
            server: "https://localhost:6443".to_string(),
            namespace: namespace.to_string(),
        });
    }
}

fn add_scroll(current: u16, delta: isize) -> u16 {
    if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs() as u16)
    } else {
        current.saturating_add(delta as u16)
    }
}

fn validate_replicas(input: &str) -> Result<i32, String> {
    let Ok(value) = input.trim().parse::<i32>() else {
        return Err("Invalid number".to_string());
    };
    if value < 0 {
        return Err("Must be >= 0".to_string());
    }
    if value > 1000 {
        return Err("Max is 1000".to_string());
    }
    Ok(value)
}

/// Filter editing over any resource list, type-erased so the reducer can
/// route keys without repeating itself per list.
trait FilterEdit {
    fn begin(&mut self);
    fn push_char(&mut self, c: char);
    fn pop_char(&mut self);
    fn end(&mut self, keep: bool);
}

impl<T: ListRow> FilterEdit for ResourceList<T> {
    fn begin(&mut self) {
        self.begin_filter();
    }

    fn push_char(&mut self, c: char) {
        self.push_filter_char(c);
    }

    fn pop_char(&mut self) {
        self.pop_filter_char();
    }

    fn end(&mut self, keep: bool) {
        self.end_filter(keep);
    }
}

trait SelectMove {
    fn first(&mut self);
    fn last(&mut self);
}

impl<T: ListRow> SelectMove for ResourceList<T> {
    fn first(&mut self) {
        self.select_first();
    }

    fn last(&mut self) {
        self.select_last();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        App, AppCommand, AppMsg, ConfirmAction, NotificationKind, Overlay, View, validate_replicas,
    };
    use crate::config::{AppConfig, KubeConfigEntry};
    use crate::input::Action;
    use crate::model::{NamespaceRow, PodRow};
    use crate::stream::{SessionState, StreamEnd, StreamEvent};

    fn two_config_app() -> App {
        App::new(AppConfig {
            kubeconfigs: vec![
                KubeConfigEntry {
                    name: "a".to_string(),
                    path: "/a".to_string(),
                    default: true,
                },
                KubeConfigEntry {
                    name: "b".to_string(),
                    path: "/b".to_string(),
                    default: false,
                },
            ],
            ssh_hosts: Vec::new(),
        })
    }

    fn namespace_rows() -> Vec<NamespaceRow> {
        ["default", "kube-system"]
            .iter()
            .map(|name| NamespaceRow {
                name: name.to_string(),
                status: "Active".to_string(),
                age: "1d".to_string(),
            })
            .collect()
    }

    fn pod_rows(names: &[&str]) -> Vec<PodRow> {
        names
            .iter()
            .map(|name| PodRow {
                name: name.to_string(),
                namespace: "default".to_string(),
                ready: "1/1".to_string(),
                status: "Running".to_string(),
                restarts: 0,
                age: "1h".to_string(),
                node: "node-1".to_string(),
                ip: "10.0.0.1".to_string(),
                containers: vec!["app".to_string()],
            })
            .collect()
    }

    #[test]
    fn single_kubeconfig_auto_connects() {
        let mut app = App::new(AppConfig {
            kubeconfigs: vec![KubeConfigEntry {
                name: "only".to_string(),
                path: "/only".to_string(),
                default: true,
            }],
            ssh_hosts: Vec::new(),
        });
        let commands = app.initial_commands();
        assert_eq!(app.view(), View::Connecting);
        assert!(matches!(&commands[..], [AppCommand::Connect { name, .. }] if name == "only"));
    }

    #[test]
    fn multiple_kubeconfigs_start_on_selection() {
        let mut app = two_config_app();
        assert!(app.initial_commands().is_empty());
        assert_eq!(app.view(), View::ConfigSelect);
    }

    #[test]
    fn selecting_a_namespace_fetches_pods_and_schedules_one_timer() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Namespaces;
        app.apply_message(AppMsg::NamespacesLoaded(Ok(namespace_rows())));

        let commands = app.apply_action(Action::Select);
        assert_eq!(app.view(), View::Pods);
        assert_eq!(app.active_namespace(), "default");
        let fetches = commands
            .iter()
            .filter(|command| matches!(command, AppCommand::FetchPods))
            .count();
        let timers = commands
            .iter()
            .filter(|command| matches!(command, AppCommand::SchedulePodRefresh))
            .count();
        assert_eq!(fetches, 1);
        assert_eq!(timers, 1);

        // a second schedule request is a no-op while the chain is pending
        assert!(app.schedule_pod_refresh().is_empty());
    }

    #[test]
    fn delete_requires_a_confirm_round_trip() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Pods;
        app.apply_message(AppMsg::PodsLoaded(Ok(pod_rows(&["web-1", "web-2"]))));

        let commands = app.apply_action(Action::Delete);
        assert!(commands.is_empty());
        match app.overlay() {
            Some(Overlay::Confirm { action, target, .. }) => {
                assert_eq!(*action, ConfirmAction::DeletePod);
                assert_eq!(target, "web-1");
            }
            other => panic!("expected confirm overlay, got {other:?}"),
        }

        // 'n' closes the dialog without dispatching anything
        let commands = app.apply_action(Action::ConfirmNo);
        assert!(commands.is_empty());
        assert!(app.overlay().is_none());
        assert_eq!(app.view(), View::Pods);

        // 'y' dispatches exactly one delete for the selected pod
        app.apply_action(Action::Delete);
        let commands = app.apply_action(Action::ConfirmYes);
        assert!(matches!(&commands[..], [AppCommand::DeletePod { name }] if name == "web-1"));
        assert!(app.overlay().is_none());
    }

    #[test]
    fn successful_delete_returns_to_pods_and_refetches() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::PodDetail;
        app.selected_pod = Some("web-1".to_string());

        let commands = app.apply_message(AppMsg::PodDeleted {
            name: "web-1".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.view(), View::Pods);
        assert!(commands
            .iter()
            .any(|command| matches!(command, AppCommand::FetchPods)));
        assert_eq!(
            app.notification().map(|n| n.kind),
            Some(NotificationKind::Success)
        );
    }

    #[test]
    fn failed_mutation_notifies_and_keeps_the_view() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::PodDetail;

        let commands = app.apply_message(AppMsg::PodDeleted {
            name: "web-1".to_string(),
            result: Err("forbidden".to_string()),
        });
        assert_eq!(app.view(), View::PodDetail);
        assert_eq!(
            app.notification().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
        assert!(matches!(
            &commands[..],
            [AppCommand::ScheduleNotificationExpiry { .. }]
        ));
    }

    #[test]
    fn scale_dialog_validates_before_dispatching() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Deployments;
        app.apply_message(AppMsg::DeploymentsLoaded(Ok(vec![
            crate::model::DeploymentRow {
                name: "api".to_string(),
                replicas: 3,
                ..Default::default()
            },
        ])));

        app.apply_action(Action::Scale);
        match app.overlay() {
            Some(Overlay::Scale { input, current, .. }) => {
                assert_eq!(input, "3");
                assert_eq!(*current, 3);
            }
            other => panic!("expected scale overlay, got {other:?}"),
        }

        // non-numeric input stays open with an inline error
        for _ in 0..2 {
            app.apply_action(Action::Backspace);
        }
        for c in "abc".chars() {
            app.apply_action(Action::InputChar(c));
        }
        let commands = app.apply_action(Action::SubmitInput);
        assert!(commands.is_empty());
        match app.overlay() {
            Some(Overlay::Scale { error, .. }) => assert!(error.is_some()),
            other => panic!("expected scale overlay, got {other:?}"),
        }

        // valid input dispatches exactly one scale command
        for _ in 0..4 {
            app.apply_action(Action::Backspace);
        }
        app.apply_action(Action::InputChar('5'));
        let commands = app.apply_action(Action::SubmitInput);
        assert!(matches!(
            &commands[..],
            [AppCommand::ScaleDeployment { name, replicas: 5 }] if name == "api"
        ));
        assert!(app.overlay().is_none());
    }

    #[test]
    fn replica_bounds_are_enforced() {
        assert!(validate_replicas("abc").is_err());
        assert!(validate_replicas("-1").is_err());
        assert!(validate_replicas("1001").is_err());
        assert_eq!(validate_replicas("0"), Ok(0));
        assert_eq!(validate_replicas("1000"), Ok(1000));
    }

    #[test]
    fn pod_tick_reschedules_without_fetch_when_guard_fails() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Pods;
        app.pod_timer_pending = true;
        app.overlay = Some(Overlay::Help);

        let commands = app.apply_message(AppMsg::PodRefreshTick);
        assert!(matches!(&commands[..], [AppCommand::SchedulePodRefresh]));

        // away from the pods view the chain is allowed to die
        app.pod_timer_pending = true;
        app.overlay = None;
        app.view = View::Services;
        assert!(app.apply_message(AppMsg::PodRefreshTick).is_empty());
    }

    #[test]
    fn stream_failure_reconnects_then_notifies() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Logs;
        app.pod_logs.set_target(super::PodLogTarget {
            pod: "web-1".to_string(),
            namespace: "default".to_string(),
            container: Some("app".to_string()),
            containers: vec!["app".to_string()],
        });

        let ticket_gen = {
            let commands = app.apply_action(Action::Follow);
            match &commands[..] {
                [AppCommand::StartLogStream { ticket, .. }] => ticket.generation,
                other => panic!("expected stream start, got {other:?}"),
            }
        };

        // first unexpected end: exactly one automatic reconnect
        let commands = app.apply_message(AppMsg::PodLogEvent {
            generation: ticket_gen,
            event: StreamEvent::Ended(StreamEnd::Failed("reset".to_string())),
        });
        let second_gen = match &commands[..] {
            [AppCommand::StartLogStream { ticket, .. }] => ticket.generation,
            other => panic!("expected reconnect, got {other:?}"),
        };

        // second failure surfaces a notification, no further attempts
        let commands = app.apply_message(AppMsg::PodLogEvent {
            generation: second_gen,
            event: StreamEvent::Ended(StreamEnd::Failed("reset".to_string())),
        });
        assert!(matches!(
            &commands[..],
            [AppCommand::ScheduleNotificationExpiry { .. }]
        ));
        assert!(!app.pod_logs().following());
    }

    #[test]
    fn follow_toggle_never_leaves_two_streams() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Logs;
        app.pod_logs.set_target(super::PodLogTarget {
            pod: "web-1".to_string(),
            namespace: "default".to_string(),
            container: None,
            containers: Vec::new(),
        });

        let first = match &app.apply_action(Action::Follow)[..] {
            [AppCommand::StartLogStream { ticket, .. }] => ticket.clone(),
            other => panic!("expected stream start, got {other:?}"),
        };
        assert!(app.apply_action(Action::Follow).is_empty()); // off
        assert!(first.cancel.is_cancelled());

        let second = match &app.apply_action(Action::Follow)[..] {
            [AppCommand::StartLogStream { ticket, .. }] => ticket.clone(),
            other => panic!("expected stream start, got {other:?}"),
        };
        assert!(second.generation > first.generation);
        assert!(app.pod_logs().has_live_stream());
    }

    #[test]
    fn escape_from_logs_returns_to_origin_and_clears() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Pods;
        app.apply_message(AppMsg::PodsLoaded(Ok(pod_rows(&["web-1"]))));
        app.apply_action(Action::OpenLogs);
        app.apply_message(AppMsg::ContainersLoaded {
            pod: "web-1".to_string(),
            result: Ok(vec!["app".to_string()]),
        });
        assert_eq!(app.view(), View::Logs);
        app.apply_message(AppMsg::LogsLoaded(Ok("line\n".to_string())));

        let commands = app.apply_action(Action::Back);
        assert_eq!(app.view(), View::Pods);
        assert!(app.pod_logs().lines().is_empty());
        assert_eq!(app.pod_logs().state(), SessionState::Idle);
        assert!(commands
            .iter()
            .any(|command| matches!(command, AppCommand::FetchPods)));
    }

    #[test]
    fn escape_follows_the_static_parent_tree() {
        let mut app = two_config_app();
        app.connect_for_tests("default");

        app.view = View::PodDetail;
        app.apply_action(Action::Back);
        assert_eq!(app.view(), View::Pods);

        app.apply_action(Action::Back);
        assert_eq!(app.view(), View::Namespaces);

        app.apply_action(Action::Back);
        assert_eq!(app.view(), View::ConfigSelect);
    }

    #[test]
    fn quit_tears_down_streams_and_remote_shell() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Logs;
        app.pod_logs.set_target(super::PodLogTarget {
            pod: "web-1".to_string(),
            namespace: "default".to_string(),
            container: None,
            containers: Vec::new(),
        });
        let ticket = app.pod_logs.begin_stream();

        let commands = app.apply_action(Action::Quit);
        assert!(!app.running());
        assert!(ticket.cancel.is_cancelled());
        assert!(commands.is_empty()); // no remote shell was open
    }

    #[test]
    fn notification_expiry_ignores_stale_sequence_numbers() {
        let mut app = two_config_app();
        app.notify(NotificationKind::Info, "first");
        app.notify(NotificationKind::Info, "second");

        app.apply_message(AppMsg::NotificationExpired { seq: 1 });
        assert!(app.notification().is_some(), "newer notification survives");
        app.apply_message(AppMsg::NotificationExpired { seq: 2 });
        assert!(app.notification().is_none());
    }

    #[test]
    fn overlay_never_changes_the_underlying_view() {
        let mut app = two_config_app();
        app.connect_for_tests("default");
        app.view = View::Pods;
        app.apply_message(AppMsg::PodsLoaded(Ok(pod_rows(&["web-1"]))));

        app.apply_action(Action::ToggleHelp);
        assert_eq!(app.view(), View::Pods);
        app.apply_action(Action::ToggleHelp);
        assert_eq!(app.view(), View::Pods);
        assert!(app.overlay().is_none());
    }
}
