mod app;
mod cli;
mod config;
mod errors;
mod input;
mod k8s;
mod model;
mod ssh;
mod stream;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppMsg, NOTIFICATION_SECS, REFRESH_INTERVAL_SECS};
use clap::Parser;
use cli::CliArgs;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use errors::compact_error;
use futures::StreamExt;
use k8s::KubeGateway;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ssh::RemoteShell;
use std::io::{self, Stdout};
use stream::{StreamEnd, StreamEvent, spawn_line_stream};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const MSG_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    if args.version {
        cli::print_version();
        return Ok(());
    }

    init_tracing()?;

    let config = config::load().context("failed to load configuration")?;
    let mut app = App::new(config);
    run(&mut app).await
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    // the terminal belongs to the dashboard, so log output goes nowhere
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(io::sink)
        .try_init();

    Ok(())
}

async fn run(app: &mut App) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(terminal: &mut TuiTerminal, app: &mut App) -> Result<()> {
    let (msg_tx, mut msg_rx) = mpsc::channel::<AppMsg>(MSG_CHANNEL_CAPACITY);

    let initial = app.initial_commands();
    dispatch(app, initial, &msg_tx);

    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.input_context(), key) {
                            debug!("action={action:?}");
                            let commands = app.apply_action(action);
                            dispatch(app, commands, &msg_tx);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!("terminal event error: {error}");
                    }
                    None => break,
                }
            }
            maybe_msg = msg_rx.recv() => {
                if let Some(msg) = maybe_msg {
                    let commands = app.apply_message(msg);
                    dispatch(app, commands, &msg_tx);
                }
            }
        }
    }

    Ok(())
}

fn dispatch(app: &App, commands: Vec<AppCommand>, tx: &mpsc::Sender<AppMsg>) {
    for command in commands {
        execute_command(app, command, tx.clone());
    }
}

fn send_soon(tx: mpsc::Sender<AppMsg>, msg: AppMsg) {
    tokio::spawn(async move {
        let _ = tx.send(msg).await;
    });
}

/// Cluster commands fail fast with a "not connected" result when no gateway
/// is present; they never block waiting for one.
fn cluster_gateway(app: &App) -> Option<KubeGateway> {
    app.gateway().cloned()
}

fn remote_gateway(app: &App) -> Option<RemoteShell> {
    app.remote_shell().cloned()
}

const NOT_CONNECTED: &str = "not connected to cluster";
const NOT_CONNECTED_SSH: &str = "not connected to host";

fn execute_command(app: &App, command: AppCommand, tx: mpsc::Sender<AppMsg>) {
    match command {
        AppCommand::Connect { name, path } => {
            tokio::spawn(async move {
                let result = KubeGateway::connect(&name, &path)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::Connected(result)).await;
            });
        }

        AppCommand::FetchNamespaces => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::NamespacesLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .list_namespaces()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::NamespacesLoaded(result)).await;
            });
        }

        AppCommand::FetchPods => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::PodsLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .list_pods()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::PodsLoaded(result)).await;
            });
        }

        AppCommand::FetchPodDetail { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::PodDetailLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = match gateway.get_pod(&name).await {
                    Ok(pod) => {
                        // events are best-effort decoration of the detail view
                        let events = gateway.pod_events(&name).await.unwrap_or_default();
                        Ok((pod, events))
                    }
                    Err(error) => Err(compact_error(&error)),
                };
                let _ = tx.send(AppMsg::PodDetailLoaded(result)).await;
            });
        }

        AppCommand::FetchContainers { pod } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::ContainersLoaded {
                        pod,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .pod_containers(&pod)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::ContainersLoaded { pod, result }).await;
            });
        }

        AppCommand::FetchLogs {
            pod,
            container,
            tail,
            timestamps,
            previous,
        } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::LogsLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .fetch_logs(&pod, container.as_deref(), tail, timestamps, previous)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::LogsLoaded(result)).await;
            });
        }

        AppCommand::StartLogStream {
            pod,
            container,
            timestamps,
            ticket,
        } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::PodLogEvent {
                        generation: ticket.generation,
                        event: StreamEvent::Ended(StreamEnd::Failed(NOT_CONNECTED.to_string())),
                    },
                );
            };
            tokio::spawn(async move {
                let generation = ticket.generation;
                match gateway
                    .log_stream(&pod, container.as_deref(), timestamps)
                    .await
                {
                    Ok(source) => {
                        let mut lines = spawn_line_stream(source, ticket.cancel.clone());
                        while let Some(event) = lines.recv().await {
                            if tx
                                .send(AppMsg::PodLogEvent { generation, event })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                    Err(error) => {
                        let event = StreamEvent::Ended(StreamEnd::Failed(compact_error(&error)));
                        let _ = tx.send(AppMsg::PodLogEvent { generation, event }).await;
                    }
                }
            });
        }

        AppCommand::DeletePod { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::PodDeleted {
                        name,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .delete_pod(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::PodDeleted { name, result }).await;
            });
        }

        AppCommand::RestartPod { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::PodRestarted {
                        name,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            // restarting a pod is deleting it; the controller recreates it
            tokio::spawn(async move {
                let result = gateway
                    .delete_pod(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::PodRestarted { name, result }).await;
            });
        }

        AppCommand::FetchDeployments => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::DeploymentsLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .list_deployments()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::DeploymentsLoaded(result)).await;
            });
        }

        AppCommand::FetchDeploymentDetail { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::DeploymentDetailLoaded(Err(NOT_CONNECTED.to_string())),
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .get_deployment(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::DeploymentDetailLoaded(result)).await;
            });
        }

        AppCommand::ScaleDeployment { name, replicas } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::DeploymentScaled {
                        name,
                        replicas,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .scale_deployment(&name, replicas)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx
                    .send(AppMsg::DeploymentScaled {
                        name,
                        replicas,
                        result,
                    })
                    .await;
            });
        }

        AppCommand::RestartDeployment { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::DeploymentRestarted {
                        name,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .restart_deployment(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::DeploymentRestarted { name, result }).await;
            });
        }

        AppCommand::DeleteDeployment { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::DeploymentDeleted {
                        name,
                        result: Err(NOT_CONNECTED.to_string()),
                    },
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .delete_deployment(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::DeploymentDeleted { name, result }).await;
            });
        }

        AppCommand::FetchServices => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::ServicesLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .list_services()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::ServicesLoaded(result)).await;
            });
        }

        AppCommand::FetchServiceDetail { name } => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::ServiceDetailLoaded(Err(NOT_CONNECTED.to_string())),
                );
            };
            tokio::spawn(async move {
                let result = gateway
                    .get_service(&name)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::ServiceDetailLoaded(result)).await;
            });
        }

        AppCommand::FetchEvents => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::EventsLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .list_events()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::EventsLoaded(result)).await;
            });
        }

        AppCommand::ProbeMetrics => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::MetricsProbed(false));
            };
            tokio::spawn(async move {
                let available = gateway.probe_metrics().await;
                let _ = tx.send(AppMsg::MetricsProbed(available)).await;
            });
        }

        AppCommand::FetchMetrics => {
            let Some(gateway) = cluster_gateway(app) else {
                return send_soon(tx, AppMsg::MetricsLoaded(Err(NOT_CONNECTED.to_string())));
            };
            tokio::spawn(async move {
                let result = gateway
                    .fetch_pod_metrics()
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMsg::MetricsLoaded(result)).await;
            });
        }

        AppCommand::RemoteConnect { host, passphrase } => {
            tokio::spawn(async move {
                let mut shell = RemoteShell::new(host);
                if let Some(passphrase) = passphrase {
                    shell.set_passphrase(passphrase);
                }
                let result = shell.connect().await.map(|()| shell);
                let _ = tx.send(AppMsg::RemoteConnected(Box::new(result))).await;
            });
        }

        AppCommand::DisconnectRemote { shell } => {
            tokio::spawn(async move {
                shell.close().await;
            });
        }

        AppCommand::FetchRemoteContainers => {
            let Some(shell) = remote_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::RemoteContainersLoaded(Err(NOT_CONNECTED_SSH.to_string())),
                );
            };
            tokio::spawn(async move {
                let result = shell
                    .list_containers()
                    .await
                    .map_err(|error| error.to_string());
                let _ = tx.send(AppMsg::RemoteContainersLoaded(result)).await;
            });
        }

        AppCommand::FetchNodeFacts => {
            let Some(shell) = remote_gateway(app) else {
                return send_soon(tx, AppMsg::NodeFactsLoaded(Err(NOT_CONNECTED_SSH.to_string())));
            };
            tokio::spawn(async move {
                let result = shell.node_facts().await.map_err(|error| error.to_string());
                let _ = tx.send(AppMsg::NodeFactsLoaded(result)).await;
            });
        }

        AppCommand::FetchRemoteLogs {
            container_id,
            tail,
            timestamps,
        } => {
            let Some(shell) = remote_gateway(app) else {
                return send_soon(tx, AppMsg::RemoteLogsLoaded(Err(NOT_CONNECTED_SSH.to_string())));
            };
            tokio::spawn(async move {
                let result = shell
                    .container_logs(&container_id, tail, timestamps)
                    .await
                    .map_err(|error| error.to_string());
                let _ = tx.send(AppMsg::RemoteLogsLoaded(result)).await;
            });
        }

        AppCommand::StartRemoteLogStream {
            container_id,
            timestamps,
            ticket,
        } => {
            let Some(shell) = remote_gateway(app) else {
                return send_soon(
                    tx,
                    AppMsg::RemoteLogEvent {
                        generation: ticket.generation,
                        event: StreamEvent::Ended(StreamEnd::Failed(
                            NOT_CONNECTED_SSH.to_string(),
                        )),
                    },
                );
            };
            tokio::spawn(async move {
                let generation = ticket.generation;
                match shell
                    .stream_container_logs(&container_id, timestamps)
                    .await
                {
                    Ok(source) => {
                        let mut lines = spawn_line_stream(source, ticket.cancel.clone());
                        while let Some(event) = lines.recv().await {
                            if tx
                                .send(AppMsg::RemoteLogEvent { generation, event })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                    Err(error) => {
                        let event = StreamEvent::Ended(StreamEnd::Failed(error.to_string()));
                        let _ = tx.send(AppMsg::RemoteLogEvent { generation, event }).await;
                    }
                }
            });
        }

        AppCommand::SchedulePodRefresh => {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(REFRESH_INTERVAL_SECS)).await;
                let _ = tx.send(AppMsg::PodRefreshTick).await;
            });
        }

        AppCommand::ScheduleEventRefresh => {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(REFRESH_INTERVAL_SECS)).await;
                let _ = tx.send(AppMsg::EventRefreshTick).await;
            });
        }

        AppCommand::ScheduleNotificationExpiry { seq } => {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(NOTIFICATION_SECS)).await;
                let _ = tx.send(AppMsg::NotificationExpired { seq }).await;
            });
        }
    }
}
