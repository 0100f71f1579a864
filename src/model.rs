use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Cluster identity reported by a successful connect.
#[derive(Debug, Clone, Default)]
pub struct ClusterInfo {
    pub name: String,
    pub context: String,
    pub server: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamespaceRow {
    pub name: String,
    pub status: String,
    pub age: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PodRow {
    pub name: String,
    pub namespace: String,
    pub ready: String,
    pub status: String,
    pub restarts: u32,
    pub age: String,
    pub node: String,
    pub ip: String,
    pub containers: Vec<String>,
}

/// A single event attached to a pod, shown in the detail view.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PodEventRow {
    pub kind: String,
    pub reason: String,
    pub message: String,
    pub age: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DeploymentRow {
    pub name: String,
    pub namespace: String,
    pub ready: String,
    pub up_to_date: i32,
    pub available: i32,
    pub age: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub strategy: String,
    pub images: Vec<String>,
    pub conditions: Vec<DeploymentCondition>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeploymentCondition {
    pub kind: String,
    pub status: String,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ServiceRow {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub cluster_ip: String,
    pub external_ip: String,
    pub ports: String,
    pub age: String,
    pub selector: Vec<(String, String)>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EventRow {
    pub kind: String,
    pub object_kind: String,
    pub object_name: String,
    pub reason: String,
    pub message: String,
    pub count: i32,
    pub age: String,
}

impl EventRow {
    pub fn is_warning(&self) -> bool {
        self.kind.eq_ignore_ascii_case("warning")
    }
}

/// Per-pod resource usage from the metrics API.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct PodUsage {
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

impl PodUsage {
    pub fn cpu_label(&self) -> String {
        format!("{}m", self.cpu_millicores)
    }

    pub fn memory_label(&self) -> String {
        let mib = self.memory_bytes / (1024 * 1024);
        if mib >= 1024 {
            format!("{:.1}Gi", mib as f64 / 1024.0)
        } else {
            format!("{mib}Mi")
        }
    }
}

/// A container reported by the remote node's runtime CLI.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteContainer {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub pod_name: String,
    pub namespace: String,
    pub age: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemotePod {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub state: String,
    pub created: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteImage {
    pub id: String,
    pub tags: String,
    pub size: String,
}

/// Node facts collected over the remote shell, each field best-effort.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct NodeFacts {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime: String,
    pub memory: String,
    pub disk: String,
    pub load_avg: String,
}

/// Rows that can live in a [`ResourceList`]: stable identity plus filter text.
pub trait ListRow {
    fn key(&self) -> &str;
    fn filter_text(&self) -> String;
}

impl ListRow for NamespaceRow {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        self.name.clone()
    }
}

impl ListRow for PodRow {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        format!("{} {} {}", self.name, self.status, self.node)
    }
}

impl ListRow for DeploymentRow {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        self.name.clone()
    }
}

impl ListRow for ServiceRow {
    fn key(&self) -> &str {
        &self.name
    }

    fn filter_text(&self) -> String {
        format!("{} {}", self.name, self.kind)
    }
}

impl ListRow for RemoteContainer {
    fn key(&self) -> &str {
        &self.id
    }

    fn filter_text(&self) -> String {
        format!("{} {} {}", self.name, self.pod_name, self.namespace)
    }
}

/// List state for one resource collection: the latest pushed snapshot plus
/// local selection and filter. Replacing the snapshot keeps the selection
/// anchored to the same row key when it survives the refresh; while the user
/// is composing a filter the snapshot is parked and applied once filtering
/// ends.
#[derive(Debug, Clone, Default)]
pub struct ResourceList<T> {
    items: Vec<T>,
    selected: usize,
    filter: String,
    editing_filter: bool,
    pending: Option<Vec<T>>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl<T: ListRow> ResourceList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            filter: String::new(),
            editing_filter: false,
            pending: None,
            last_refreshed: None,
            error: None,
        }
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.last_refreshed = Some(Utc::now());
        self.error = None;
        if self.editing_filter {
            self.pending = Some(items);
            return;
        }
        self.apply_snapshot(items);
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_refreshed = Some(Utc::now());
        self.error = Some(error.into());
    }

    fn apply_snapshot(&mut self, items: Vec<T>) {
        let selected_key = self
            .visible()
            .get(self.selected)
            .map(|row| row.key().to_string());
        self.items = items;
        let visible = self.visible();
        self.selected = selected_key
            .and_then(|key| visible.iter().position(|row| row.key() == key))
            .unwrap_or_else(|| self.selected.min(visible.len().saturating_sub(1)));
    }

    pub fn visible(&self) -> Vec<&T> {
        let query = self.filter.trim().to_ascii_lowercase();
        self.items
            .iter()
            .filter(|row| {
                query.is_empty() || row.filter_text().to_ascii_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected.min(self.visible().len().saturating_sub(1))
    }

    pub fn selected(&self) -> Option<&T> {
        let visible = self.visible();
        if visible.is_empty() {
            return None;
        }
        visible.get(self.selected_index()).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let current = self.selected_index() as isize;
        self.selected = (current + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible().len().saturating_sub(1);
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn editing_filter(&self) -> bool {
        self.editing_filter
    }

    pub fn begin_filter(&mut self) {
        self.editing_filter = true;
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn end_filter(&mut self, keep: bool) {
        self.editing_filter = false;
        if !keep {
            self.filter.clear();
        }
        if let Some(parked) = self.pending.take() {
            self.apply_snapshot(parked);
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.editing_filter = false;
        if let Some(parked) = self.pending.take() {
            self.apply_snapshot(parked);
        }
    }
}

pub fn format_age(timestamp: Option<DateTime<Utc>>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    format_age_since(timestamp, Utc::now())
}

pub fn format_age_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h");
    }
    format!("{}d", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::{ListRow, NamespaceRow, ResourceList, format_age_since};
    use chrono::{Duration, Utc};

    fn rows(names: &[&str]) -> Vec<NamespaceRow> {
        names
            .iter()
            .map(|name| NamespaceRow {
                name: name.to_string(),
                status: "Active".to_string(),
                age: "1d".to_string(),
            })
            .collect()
    }

    #[test]
    fn replace_preserves_selection_by_key() {
        let mut list = ResourceList::new();
        list.replace(rows(&["alpha", "beta", "gamma"]));
        list.move_selection(1);
        assert_eq!(list.selected().map(|row| row.key()), Some("beta"));

        list.replace(rows(&["beta", "gamma"]));
        assert_eq!(list.selected().map(|row| row.key()), Some("beta"));
    }

    #[test]
    fn replace_clamps_when_selected_row_disappears() {
        let mut list = ResourceList::new();
        list.replace(rows(&["alpha", "beta", "gamma"]));
        list.select_last();
        list.replace(rows(&["alpha"]));
        assert_eq!(list.selected().map(|row| row.key()), Some("alpha"));
    }

    #[test]
    fn snapshot_is_deferred_while_filter_is_being_edited() {
        let mut list = ResourceList::new();
        list.replace(rows(&["alpha", "beta"]));
        list.begin_filter();
        list.push_filter_char('a');

        list.replace(rows(&["gamma"]));
        assert_eq!(list.len(), 2, "snapshot must not land mid-filter");

        list.end_filter(true);
        assert_eq!(list.len(), 1);
        assert_eq!(list.selected().map(|row| row.key()), Some("gamma"));
    }

    #[test]
    fn filter_narrows_visible_rows_case_insensitively() {
        let mut list = ResourceList::new();
        list.replace(rows(&["web-1", "web-2", "db-1"]));
        list.begin_filter();
        for c in "WEB".chars() {
            list.push_filter_char(c);
        }
        assert_eq!(list.visible().len(), 2);
        list.clear_filter();
        assert_eq!(list.visible().len(), 3);
    }

    #[test]
    fn move_selection_stays_in_bounds() {
        let mut list = ResourceList::new();
        list.replace(rows(&["a", "b"]));
        list.move_selection(-5);
        assert_eq!(list.selected_index(), 0);
        list.move_selection(9);
        assert_eq!(list.selected_index(), 1);
    }

    #[test]
    fn age_formatting_buckets() {
        let now = Utc::now();
        assert_eq!(format_age_since(now - Duration::seconds(30), now), "30s");
        assert_eq!(format_age_since(now - Duration::minutes(5), now), "5m");
        assert_eq!(format_age_since(now - Duration::hours(7), now), "7h");
        assert_eq!(format_age_since(now - Duration::days(3), now), "3d");
    }
}
