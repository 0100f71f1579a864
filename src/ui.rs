use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, NotificationKind, Overlay, View};
use crate::errors::{ErrorInfo, classify_error};
use crate::model::{ConnectionStatus, ListRow, ResourceList};

const BG: Color = Color::Rgb(12, 16, 26);
const PANEL: Color = Color::Rgb(20, 28, 44);
const ACCENT: Color = Color::Rgb(94, 189, 171);
const MUTED: Color = Color::Rgb(134, 148, 170);
const WARN: Color = Color::Rgb(250, 189, 47);
const ERROR: Color = Color::Rgb(247, 108, 108);
const OK: Color = Color::Rgb(121, 192, 115);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    match app.overlay() {
        Some(Overlay::Confirm {
            action,
            target,
            yes_selected,
        }) => render_confirm(frame, action.title(), &action.message(target), *yes_selected),
        Some(Overlay::Scale {
            deployment,
            current,
            input,
            error,
        }) => render_scale(frame, deployment, *current, input, error.as_deref()),
        Some(Overlay::ContainerPicker {
            containers,
            selected,
        }) => render_container_picker(frame, containers, *selected),
        Some(Overlay::Passphrase { input }) => render_passphrase(frame, app, input),
        Some(Overlay::Help) => render_help(frame),
        Some(Overlay::Search { .. }) | None => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            " beluga ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ];

    if let Some(info) = app.cluster_info() {
        spans.push(Span::styled(
            format!(" {} ", info.context),
            Style::default().fg(Color::White).bg(PANEL),
        ));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("ns:{}", info.namespace),
            Style::default().fg(MUTED),
        ));
    } else if let Some(entry) = app.selected_config() {
        spans.push(Span::styled(
            format!(" {} ", entry.name),
            Style::default().fg(Color::White).bg(PANEL),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    match app.view() {
        View::ConfigSelect => render_config_select(frame, area, app),
        View::Connecting => render_connecting(frame, area, app),
        View::Main => render_main(frame, area, app),
        View::Namespaces => render_namespaces(frame, area, app),
        View::Pods => render_pods(frame, area, app),
        View::PodDetail => render_pod_detail(frame, area, app),
        View::Logs => render_logs(frame, area, app),
        View::SshHosts => render_ssh_hosts(frame, area, app),
        View::SshConnecting => render_ssh_connecting(frame, area, app),
        View::RemoteContainers => render_remote_containers(frame, area, app),
        View::RemoteLogs => render_remote_logs(frame, area, app),
        View::Deployments => render_deployments(frame, area, app),
        View::DeploymentDetail => render_deployment_detail(frame, area, app),
        View::Services => render_services(frame, area, app),
        View::ServiceDetail => render_service_detail(frame, area, app),
        View::Events => render_events(frame, area, app),
    }
}

fn list_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PANEL))
        .title(Span::styled(
            title,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
}

fn filter_suffix<T: ListRow>(list: &ResourceList<T>) -> String {
    if list.editing_filter() {
        format!("  /{}_", list.filter())
    } else if !list.filter().is_empty() {
        format!("  /{}", list.filter())
    } else {
        String::new()
    }
}

fn render_table<T: ListRow>(
    frame: &mut Frame,
    area: Rect,
    list: &ResourceList<T>,
    title: String,
    header: Vec<&'static str>,
    widths: Vec<Constraint>,
    to_cells: impl Fn(&T) -> Vec<String>,
) {
    if let Some(error) = &list.error {
        render_error_panel(frame, area, error);
        return;
    }

    let rows = list
        .visible()
        .into_iter()
        .map(|row| Row::new(to_cells(row).into_iter().map(Cell::from).collect::<Vec<_>>()))
        .collect::<Vec<_>>();

    let header_row = Row::new(
        header
            .into_iter()
            .map(|name| Cell::from(Span::styled(name, Style::default().fg(MUTED))))
            .collect::<Vec<_>>(),
    )
    .height(1);

    let table = Table::new(rows, widths)
        .header(header_row)
        .block(list_block(format!("{title}{}", filter_suffix(list))))
        .row_highlight_style(
            Style::default()
                .bg(PANEL)
                .fg(ACCENT)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    state.select(if list.visible().is_empty() {
        None
    } else {
        Some(list.selected_index())
    });
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_config_select(frame: &mut Frame, area: Rect, app: &App) {
    render_table(
        frame,
        area,
        app.kubeconfig_list(),
        format!("Kubeconfigs ({})", app.kubeconfig_list().len()),
        vec!["NAME", "PATH", "DEFAULT"],
        vec![
            Constraint::Length(24),
            Constraint::Min(30),
            Constraint::Length(8),
        ],
        |entry| {
            vec![
                entry.name.clone(),
                entry.path.clone(),
                if entry.default { "yes" } else { "" }.to_string(),
            ]
        },
    );
}

fn render_connecting(frame: &mut Frame, area: Rect, app: &App) {
    let target = app
        .selected_config()
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| "cluster".to_string());
    frame.render_widget(
        Paragraph::new(format!("Connecting to {target}..."))
            .style(Style::default().fg(MUTED))
            .block(list_block("Connecting".to_string())),
        area,
    );
}

fn render_main(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(error) = app.connect_error() {
        render_error_panel(frame, area, error);
        return;
    }
    let text = match app.selected_config() {
        Some(entry) => format!(
            "Kubeconfig: {}\nPath: {}\nStatus: {}\n\nPress 'r' to retry the connection",
            entry.name,
            entry.path,
            app.status()
        ),
        None => "No kubeconfig selected".to_string(),
    };
    frame.render_widget(
        Paragraph::new(text).block(list_block("Cluster".to_string())),
        area,
    );
}

fn render_namespaces(frame: &mut Frame, area: Rect, app: &App) {
    render_table(
        frame,
        area,
        app.namespaces(),
        format!("Namespaces ({})", app.namespaces().len()),
        vec!["NAME", "STATUS", "AGE"],
        vec![
            Constraint::Min(40),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
        |namespace| {
            vec![
                namespace.name.clone(),
                namespace.status.clone(),
                namespace.age.clone(),
            ]
        },
    );
}

fn render_pods(frame: &mut Frame, area: Rect, app: &App) {
    let metrics = app.metrics_enabled();
    let title = if metrics {
        format!("Pods ({}) [metrics]", app.pods().len())
    } else {
        format!("Pods ({})", app.pods().len())
    };

    let usage = app.pod_metrics().clone();
    let (header, widths): (Vec<&'static str>, Vec<Constraint>) = if metrics {
        (
            vec!["NAME", "READY", "STATUS", "RESTARTS", "CPU", "MEMORY", "AGE"],
            vec![
                Constraint::Min(36),
                Constraint::Length(7),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(8),
                Constraint::Length(9),
                Constraint::Length(8),
            ],
        )
    } else {
        (
            vec!["NAME", "READY", "STATUS", "RESTARTS", "AGE"],
            vec![
                Constraint::Min(36),
                Constraint::Length(7),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(8),
            ],
        )
    };

    render_table(frame, area, app.pods(), title, header, widths, move |pod| {
        let mut cells = vec![
            pod.name.clone(),
            pod.ready.clone(),
            pod.status.clone(),
            pod.restarts.to_string(),
        ];
        if metrics {
            match usage.get(&pod.name) {
                Some(used) => {
                    cells.push(used.cpu_label());
                    cells.push(used.memory_label());
                }
                None => {
                    cells.push("-".to_string());
                    cells.push("-".to_string());
                }
            }
        }
        cells.push(pod.age.clone());
        cells
    });
}

fn render_pod_detail(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        "Pod: {}",
        app.pod_detail()
            .and_then(|result| result.as_ref().ok())
            .map(|(pod, _)| pod.name.as_str())
            .unwrap_or("-")
    );

    match app.pod_detail() {
        None => frame.render_widget(
            Paragraph::new("Loading pod details...")
                .style(Style::default().fg(MUTED))
                .block(list_block(title)),
            area,
        ),
        Some(Err(error)) => render_error_panel(frame, area, error),
        Some(Ok((pod, events))) => {
            let mut lines = vec![
                format!("Name:      {}", pod.name),
                format!("Namespace: {}", pod.namespace),
                format!("Status:    {}", pod.status),
                format!("Ready:     {}", pod.ready),
                format!("Restarts:  {}", pod.restarts),
                format!("Node:      {}", pod.node),
                format!("IP:        {}", pod.ip),
                format!("Age:       {}", pod.age),
                format!("Containers: {}", pod.containers.join(", ")),
            ];
            if !events.is_empty() {
                lines.push(String::new());
                lines.push("Events:".to_string());
                for event in events {
                    lines.push(format!(
                        "  [{}] {} {} ({})",
                        event.kind, event.reason, event.message, event.age
                    ));
                }
            }
            frame.render_widget(
                Paragraph::new(lines.join("\n"))
                    .wrap(Wrap { trim: false })
                    .scroll((clamp_scroll(app.detail_scroll(), lines.len(), area), 0))
                    .block(list_block(title)),
                area,
            );
        }
    }
}

fn log_header_line(
    target: String,
    following: bool,
    timestamps: bool,
    previous: bool,
    total: usize,
    query: &str,
    match_count: usize,
    current_match: usize,
    search_editing: bool,
) -> Line<'static> {
    let mut spans = vec![Span::styled(
        target,
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )];
    if following {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " FOLLOW ",
            Style::default().fg(Color::Black).bg(OK),
        ));
    }
    if timestamps {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " TS ",
            Style::default().fg(Color::Black).bg(ACCENT),
        ));
    }
    if previous {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " PREV ",
            Style::default().fg(Color::Black).bg(WARN),
        ));
    }
    spans.push(Span::styled(
        format!("  lines:{total}"),
        Style::default().fg(MUTED),
    ));
    if search_editing {
        spans.push(Span::styled(
            format!("  /{query}_"),
            Style::default().fg(WARN),
        ));
    }
    if !query.is_empty() {
        let label = if match_count == 0 {
            format!("  [no matches for '{query}']")
        } else {
            format!("  ['{query}' {current_match}/{match_count}]")
        };
        spans.push(Span::styled(label, Style::default().fg(MUTED)));
    }
    Line::from(spans)
}

fn render_log_lines(
    frame: &mut Frame,
    area: Rect,
    lines: &[String],
    query: &str,
    scroll: u16,
    autoscroll: bool,
) {
    let height = area.height.saturating_sub(2) as usize;
    let offset = if autoscroll {
        lines.len().saturating_sub(height)
    } else {
        (scroll as usize).min(lines.len().saturating_sub(1))
    };

    let query_lower = query.to_ascii_lowercase();
    let rendered = lines
        .iter()
        .skip(offset)
        .take(height.max(1))
        .map(|line| highlight_line(line, &query_lower))
        .collect::<Vec<_>>();

    frame.render_widget(
        Paragraph::new(rendered).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PANEL)),
        ),
        area,
    );
}

fn highlight_line(line: &str, query_lower: &str) -> Line<'static> {
    if query_lower.is_empty() {
        return Line::from(line.to_string());
    }
    let lower = line.to_ascii_lowercase();
    let Some(index) = lower.find(query_lower) else {
        return Line::from(line.to_string());
    };
    let end = index + query_lower.len();
    Line::from(vec![
        Span::raw(line[..index].to_string()),
        Span::styled(
            line[index..end].to_string(),
            Style::default().fg(Color::Black).bg(WARN),
        ),
        Span::raw(line[end..].to_string()),
    ])
}

fn render_logs(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(error) = app.logs_error() {
        render_error_panel(frame, area, error);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let session = app.pod_logs();
    let target = session
        .target()
        .map(|target| match &target.container {
            Some(container) => format!("Logs: {}/{}", target.pod, container),
            None => format!("Logs: {}", target.pod),
        })
        .unwrap_or_else(|| "Logs".to_string());

    let search_editing = matches!(app.overlay(), Some(Overlay::Search { .. }));
    frame.render_widget(
        Paragraph::new(log_header_line(
            target,
            session.following(),
            session.timestamps(),
            app.logs_previous(),
            session.lines().len(),
            session.search_query(),
            session.match_count(),
            session.current_match(),
            search_editing,
        )),
        chunks[0],
    );

    let (scroll, autoscroll) = app.log_scroll();
    render_log_lines(
        frame,
        chunks[1],
        session.lines(),
        session.search_query(),
        scroll,
        autoscroll,
    );
}

fn render_remote_logs(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(error) = app.remote_logs_error() {
        render_error_panel(frame, area, error);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let session = app.remote_logs();
    let target = session
        .target()
        .map(|target| format!("Logs: {}@{}", target.container_name, target.node))
        .unwrap_or_else(|| "Logs".to_string());

    let search_editing = matches!(app.overlay(), Some(Overlay::Search { .. }));
    frame.render_widget(
        Paragraph::new(log_header_line(
            target,
            session.following(),
            session.timestamps(),
            false,
            session.lines().len(),
            session.search_query(),
            session.match_count(),
            session.current_match(),
            search_editing,
        )),
        chunks[0],
    );

    let (scroll, autoscroll) = app.remote_log_scroll();
    render_log_lines(
        frame,
        chunks[1],
        session.lines(),
        session.search_query(),
        scroll,
        autoscroll,
    );
}

fn render_ssh_hosts(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(error) = app.remote_error() {
        render_error_panel(frame, area, error);
        return;
    }
    if app.ssh_hosts().is_empty() {
        frame.render_widget(
            Paragraph::new(
                "No SSH hosts configured.\n\nAdd hosts to ~/.beluga/config.yaml:\n\n\
                 ssh_hosts:\n  - name: \"my-node\"\n    host: \"192.168.1.100\"\n    \
                 user: \"admin\"\n    key_path: \"~/.ssh/id_ed25519\"\n    port: 22",
            )
            .block(list_block("SSH Hosts".to_string())),
            area,
        );
        return;
    }
    render_table(
        frame,
        area,
        app.ssh_hosts(),
        format!("SSH Hosts ({})", app.ssh_hosts().len()),
        vec!["NAME", "ADDRESS", "USER"],
        vec![
            Constraint::Length(24),
            Constraint::Min(24),
            Constraint::Length(16),
        ],
        |host| {
            vec![
                host.name.clone(),
                format!("{}:{}", host.host, host.port),
                host.user.clone(),
            ]
        },
    );
}

fn render_ssh_connecting(frame: &mut Frame, area: Rect, app: &App) {
    let target = app
        .connecting_ssh_host()
        .map(|host| format!("{}@{}", host.user, host.host))
        .unwrap_or_else(|| "host".to_string());
    frame.render_widget(
        Paragraph::new(format!("Connecting to {target}..."))
            .style(Style::default().fg(MUTED))
            .block(list_block("SSH".to_string())),
        area,
    );
}

fn render_remote_containers(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let facts_line = app
        .node_facts()
        .map(|facts| {
            let mut parts = Vec::new();
            for value in [&facts.hostname, &facts.os] {
                if !value.is_empty() {
                    parts.push(value.clone());
                }
            }
            if !facts.memory.is_empty() {
                parts.push(format!("mem {}", facts.memory));
            }
            if !facts.disk.is_empty() {
                parts.push(format!("disk {}", facts.disk));
            }
            if !facts.load_avg.is_empty() {
                parts.push(format!("load {}", facts.load_avg));
            }
            parts.join(" | ")
        })
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(facts_line).style(Style::default().fg(MUTED)),
        chunks[0],
    );

    render_table(
        frame,
        chunks[1],
        app.remote_containers(),
        format!("Containers ({})", app.remote_containers().len()),
        vec!["NAME", "POD", "NAMESPACE", "STATE", "AGE"],
        vec![
            Constraint::Min(24),
            Constraint::Min(24),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
        |container| {
            vec![
                container.name.clone(),
                container.pod_name.clone(),
                container.namespace.clone(),
                container.state.clone(),
                container.age.clone(),
            ]
        },
    );
}

fn render_deployments(frame: &mut Frame, area: Rect, app: &App) {
    render_table(
        frame,
        area,
        app.deployments(),
        format!("Deployments ({})", app.deployments().len()),
        vec!["NAME", "READY", "UP-TO-DATE", "AVAILABLE", "AGE"],
        vec![
            Constraint::Min(36),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
        |deployment| {
            vec![
                deployment.name.clone(),
                deployment.ready.clone(),
                deployment.up_to_date.to_string(),
                deployment.available.to_string(),
                deployment.age.clone(),
            ]
        },
    );
}

fn render_deployment_detail(frame: &mut Frame, area: Rect, app: &App) {
    match app.deployment_detail() {
        None => frame.render_widget(
            Paragraph::new("Loading deployment details...")
                .style(Style::default().fg(MUTED))
                .block(list_block("Deployment".to_string())),
            area,
        ),
        Some(Err(error)) => render_error_panel(frame, area, error),
        Some(Ok(deployment)) => {
            let mut lines = vec![
                format!("Name:      {}", deployment.name),
                format!("Namespace: {}", deployment.namespace),
                format!("Ready:     {}", deployment.ready),
                format!("Replicas:  {}", deployment.replicas),
                format!("Strategy:  {}", deployment.strategy),
                format!("Age:       {}", deployment.age),
                format!("Images:    {}", deployment.images.join(", ")),
            ];
            if !deployment.conditions.is_empty() {
                lines.push(String::new());
                lines.push("Conditions:".to_string());
                for condition in &deployment.conditions {
                    lines.push(format!(
                        "  {} = {} ({}) {}",
                        condition.kind, condition.status, condition.reason, condition.message
                    ));
                }
            }
            frame.render_widget(
                Paragraph::new(lines.join("\n"))
                    .wrap(Wrap { trim: false })
                    .scroll((clamp_scroll(app.detail_scroll(), lines.len(), area), 0))
                    .block(list_block(format!("Deployment: {}", deployment.name))),
                area,
            );
        }
    }
}

fn render_services(frame: &mut Frame, area: Rect, app: &App) {
    render_table(
        frame,
        area,
        app.services(),
        format!("Services ({})", app.services().len()),
        vec!["NAME", "TYPE", "CLUSTER-IP", "EXTERNAL-IP", "PORTS", "AGE"],
        vec![
            Constraint::Min(26),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Min(14),
            Constraint::Length(8),
        ],
        |service| {
            vec![
                service.name.clone(),
                service.kind.clone(),
                service.cluster_ip.clone(),
                service.external_ip.clone(),
                service.ports.clone(),
                service.age.clone(),
            ]
        },
    );
}

fn render_service_detail(frame: &mut Frame, area: Rect, app: &App) {
    match app.service_detail() {
        None => frame.render_widget(
            Paragraph::new("Loading service details...")
                .style(Style::default().fg(MUTED))
                .block(list_block("Service".to_string())),
            area,
        ),
        Some(Err(error)) => render_error_panel(frame, area, error),
        Some(Ok(service)) => {
            let mut lines = vec![
                format!("Name:        {}", service.name),
                format!("Namespace:   {}", service.namespace),
                format!("Type:        {}", service.kind),
                format!("Cluster IP:  {}", service.cluster_ip),
                format!("External IP: {}", service.external_ip),
                format!("Ports:       {}", service.ports),
                format!("Age:         {}", service.age),
            ];
            if !service.selector.is_empty() {
                lines.push(String::new());
                lines.push("Selector:".to_string());
                for (key, value) in &service.selector {
                    lines.push(format!("  {key}={value}"));
                }
            }
            frame.render_widget(
                Paragraph::new(lines.join("\n"))
                    .scroll((clamp_scroll(app.detail_scroll(), lines.len(), area), 0))
                    .block(list_block(format!("Service: {}", service.name))),
                area,
            );
        }
    }
}

fn render_events(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(error) = app.events_error() {
        render_error_panel(frame, area, error);
        return;
    }

    let events = app.events();
    let mut title = format!("Events ({})", events.len());
    if app.events_follow() {
        title.push_str(" [follow]");
    }
    if app.events_warnings_only() {
        title.push_str(" [warnings]");
    }
    if let Some(kind) = app.events_kind_filter() {
        title.push_str(&format!(" [kind:{kind}]"));
    }

    let lines = events
        .iter()
        .map(|event| {
            let style = if event.is_warning() {
                Style::default().fg(WARN)
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!(
                    "{:8} {:12} {}/{} x{} ({})  {}",
                    event.kind,
                    event.reason,
                    event.object_kind,
                    event.object_name,
                    event.count,
                    event.age,
                    event.message
                ),
                style,
            ))
        })
        .collect::<Vec<_>>();

    let height = area.height.saturating_sub(2) as usize;
    let offset = if app.events_follow() {
        lines.len().saturating_sub(height)
    } else {
        (app.events_scroll() as usize).min(lines.len().saturating_sub(1))
    };

    frame.render_widget(
        Paragraph::new(lines.into_iter().skip(offset).collect::<Vec<_>>())
            .block(list_block(title)),
        area,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(notification) = app.notification() {
        let (bg, icon) = match notification.kind {
            NotificationKind::Success => (OK, "+"),
            NotificationKind::Error => (ERROR, "x"),
            NotificationKind::Warning => (WARN, "!"),
            NotificationKind::Info => (ACCENT, "i"),
        };
        frame.render_widget(
            Paragraph::new(format!(" {icon} {} ", notification.message))
                .style(Style::default().fg(Color::Black).bg(bg)),
            area,
        );
        return;
    }

    let hints = footer_hints(app);
    let status = match app.status() {
        ConnectionStatus::Connected => Span::styled(
            format!(" {} ", app.active_namespace()),
            Style::default().fg(Color::Black).bg(OK),
        ),
        ConnectionStatus::Connecting => {
            Span::styled(" connecting ", Style::default().fg(Color::Black).bg(WARN))
        }
        ConnectionStatus::Error => {
            Span::styled(" error ", Style::default().fg(Color::White).bg(ERROR))
        }
        ConnectionStatus::Disconnected => {
            Span::styled(" offline ", Style::default().fg(MUTED).bg(PANEL))
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(14)])
        .split(area);
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(MUTED).bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Right),
        chunks[1],
    );
}

fn footer_hints(app: &App) -> String {
    let hints: &[&str] = match app.view() {
        View::ConfigSelect => &["enter: connect", "/: filter", "9: ssh", "q: quit"],
        View::Connecting | View::SshConnecting => &["ctrl+c: cancel"],
        View::Main => &["r: retry", "esc: back", "q: quit"],
        View::Namespaces => &["enter: select", "/: filter", "r: refresh", "q: quit"],
        View::Pods => &[
            "enter: details",
            "l: logs",
            "d: delete",
            "R: restart",
            "m: metrics",
            "/: filter",
            "r: refresh",
            "esc: back",
            "q: quit",
        ],
        View::PodDetail => &["l: logs", "d: delete", "R: restart", "r: refresh", "esc: back"],
        View::Logs => &[
            "f: follow",
            "t: timestamps",
            "p: previous",
            "c: container",
            "/: search",
            "n/N: match",
            "r: refresh",
            "esc: back",
        ],
        View::SshHosts => &["enter: connect", "/: filter", "esc: back", "q: quit"],
        View::RemoteContainers => &["enter: logs", "/: filter", "r: refresh", "esc: back"],
        View::RemoteLogs => &["f: follow", "t: timestamps", "/: search", "r: refresh", "esc: back"],
        View::Deployments => &[
            "enter: details",
            "s: scale",
            "R: restart",
            "d: delete",
            "/: filter",
            "r: refresh",
            "esc: back",
        ],
        View::DeploymentDetail => &["s: scale", "R: restart", "d: delete", "r: refresh", "esc: back"],
        View::Services => &["enter: details", "/: filter", "r: refresh", "esc: back"],
        View::ServiceDetail => &["r: refresh", "esc: back"],
        View::Events => &[
            "f: follow",
            "w: warnings",
            "k: kind",
            "r: refresh",
            "esc: back",
        ],
    };
    format!(" {}", hints.join(" | "))
}

fn render_error_panel(frame: &mut Frame, area: Rect, raw: &str) {
    let ErrorInfo {
        title,
        message,
        suggestion,
    } = classify_error(raw);

    let mut lines = vec![
        Line::from(Span::styled(
            title,
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw(message),
    ];
    if !suggestion.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "Suggestion:",
            Style::default().fg(WARN).add_modifier(Modifier::BOLD),
        )));
        for part in suggestion.lines() {
            lines.push(Line::from(Span::styled(
                part.to_string(),
                Style::default().fg(MUTED),
            )));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ERROR)),
        ),
        area,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn popup_block(title: &str, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(border).add_modifier(Modifier::BOLD),
        ))
}

fn render_confirm(frame: &mut Frame, title: &str, message: &str, yes_selected: bool) {
    let area = centered_rect(52, 8, frame.area());
    frame.render_widget(Clear, area);

    let yes = if yes_selected {
        Span::styled(
            " [Y]es ",
            Style::default().fg(Color::White).bg(ERROR).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(" [Y]es ", Style::default().fg(MUTED).bg(PANEL))
    };
    let no = if yes_selected {
        Span::styled(" [N]o ", Style::default().fg(MUTED).bg(PANEL))
    } else {
        Span::styled(
            " [N]o ",
            Style::default().fg(Color::Black).bg(ACCENT).add_modifier(Modifier::BOLD),
        )
    };

    let mut lines = message
        .lines()
        .map(|line| Line::raw(line.to_string()))
        .collect::<Vec<_>>();
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![yes, Span::raw("  "), no]));

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(popup_block(title, WARN)),
        area,
    );
}

fn render_scale(
    frame: &mut Frame,
    deployment: &str,
    current: i32,
    input: &str,
    error: Option<&str>,
) {
    let area = centered_rect(46, 8, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::raw(deployment.to_string()),
        Line::from(Span::styled(
            format!("Current replicas: {current}"),
            Style::default().fg(MUTED),
        )),
        Line::from(vec![
            Span::raw("New replicas: "),
            Span::styled(
                format!("{input}_"),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];
    match error {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(ERROR),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Enter to confirm, Esc to cancel",
            Style::default().fg(MUTED),
        ))),
    }

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(popup_block("Scale Deployment", ACCENT)),
        area,
    );
}

fn render_container_picker(frame: &mut Frame, containers: &[String], selected: usize) {
    let height = (containers.len() as u16 + 4).min(14);
    let area = centered_rect(40, height, frame.area());
    frame.render_widget(Clear, area);

    let lines = containers
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index == selected {
                Line::from(Span::styled(
                    format!("> {name}"),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::raw(format!("  {name}"))
            }
        })
        .collect::<Vec<_>>();

    frame.render_widget(
        Paragraph::new(lines).block(popup_block("Select Container", ACCENT)),
        area,
    );
}

fn render_passphrase(frame: &mut Frame, app: &App, input: &str) {
    let area = centered_rect(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let host = app
        .connecting_ssh_host()
        .map(|host| host.name.clone())
        .unwrap_or_default();
    let masked = "*".repeat(input.chars().count());

    frame.render_widget(
        Paragraph::new(vec![
            Line::raw(format!("Key passphrase for {host}")),
            Line::raw(""),
            Line::from(Span::styled(
                format!("{masked}_"),
                Style::default().fg(ACCENT),
            )),
            Line::from(Span::styled(
                "Enter to submit, Esc to cancel",
                Style::default().fg(MUTED),
            )),
        ])
        .alignment(Alignment::Center)
        .block(popup_block("Passphrase Required", WARN)),
        area,
    );
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(62, 20, frame.area());
    frame.render_widget(Clear, area);

    let entries: &[(&str, &str)] = &[
        ("enter", "open the selected item"),
        ("esc", "back to the parent view"),
        ("j/k, arrows", "move / scroll"),
        ("g / G", "jump to top / bottom"),
        ("/", "filter lists, search logs"),
        ("r", "refresh the current view"),
        ("l", "pod logs"),
        ("f", "follow logs / events"),
        ("t", "toggle log timestamps"),
        ("p", "previous container logs"),
        ("c", "switch container"),
        ("n / N", "next / previous search match"),
        ("d", "delete (with confirmation)"),
        ("R", "restart (with confirmation)"),
        ("s", "scale deployment"),
        ("m", "toggle pod metrics"),
        ("1-5", "namespaces/pods/deployments/services/events"),
        ("9", "ssh hosts"),
        ("q", "quit"),
    ];

    let mut lines = Vec::with_capacity(entries.len());
    for (key, description) in entries {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{key:>12}  "),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw(description.to_string()),
        ]));
    }

    frame.render_widget(
        Paragraph::new(lines).block(popup_block("Help", ACCENT)),
        area,
    );
}

fn clamp_scroll(scroll: u16, total_lines: usize, area: Rect) -> u16 {
    let visible = area.height.saturating_sub(2) as usize;
    let max = total_lines.saturating_sub(visible);
    scroll.min(max.min(u16::MAX as usize) as u16)
}
