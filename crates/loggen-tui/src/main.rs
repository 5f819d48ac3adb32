#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

use std::io::{self, Stdout};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use loggen_core::types::GenKey;
use loggen_es::{ElasticConfig, ElasticSink};
use loggen_runtime::orchestrator::{Orchestrator, OrchestratorConfig};
use loggen_sources::builtin_catalog;

const MIN_RATE: f64 = 0.1;
const MAX_RATE: f64 = 100.0;
const RATE_STEP: f64 = 0.5;

#[derive(Debug, Parser, Clone)]
#[command(name = "loggen")]
#[command(about = "Synthetic log generator streaming into Elasticsearch data streams")]
struct Args {
    /// Elasticsearch base URL.
    #[arg(
        long,
        env = "ELASTICSEARCH_HOST",
        default_value = "http://elasticsearch-master:9200"
    )]
    es_host: String,
    #[arg(long, env = "ELASTICSEARCH_USERNAME", default_value = "elastic")]
    es_username: String,
    #[arg(long, env = "ELASTICSEARCH_PASSWORD", default_value = "elastic")]
    es_password: String,
    /// Verify TLS certificates when connecting over https.
    #[arg(long, env = "LOGGEN_VERIFY_TLS", default_value_t = false)]
    verify_tls: bool,
    /// Events per bulk request.
    #[arg(long, env = "LOGGEN_BATCH_SIZE", default_value_t = 10)]
    batch_size: usize,
    /// Per-task drain bound during shutdown, in milliseconds.
    #[arg(long, env = "LOGGEN_DRAIN_TIMEOUT_MS", default_value_t = 2_000)]
    drain_timeout_ms: u64,
    /// UI refresh interval in milliseconds.
    #[arg(long, env = "LOGGEN_TUI_TICK_MS", default_value_t = 250)]
    tick_ms: u64,
    /// Headless mode duration. >0 runs without a TTY and exits.
    #[arg(long, env = "LOGGEN_HEADLESS_SECS", default_value_t = 0)]
    headless_secs: u64,
    /// Datasets to start on launch, as source:dataset[@rate]. Repeatable.
    #[arg(long = "start")]
    start_specs: Vec<String>,
}

/// Parses `source:dataset[@rate]`; the rate defaults to 1.0 events/second.
fn parse_start_spec(spec: &str) -> Result<(GenKey, f64)> {
    let (pair, rate) = match spec.rsplit_once('@') {
        Some((pair, rate)) => {
            let rate: f64 = rate
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("bad rate in start spec {spec:?}"))?;
            (pair, rate)
        }
        None => (spec, 1.0),
    };
    let key = GenKey::from_str(pair)?;
    Ok((key, rate))
}

#[derive(Debug, Clone)]
struct CatalogRow {
    key: GenKey,
    description: &'static str,
    data_stream: &'static str,
}

struct App {
    orch: Arc<Orchestrator<ElasticSink>>,
    rows: Vec<CatalogRow>,
    selected: usize,
    rate: f64,
    sink_reachable: Option<bool>,
    status_line: String,
}

impl App {
    fn new(orch: Arc<Orchestrator<ElasticSink>>) -> Self {
        let rows = orch
            .catalog()
            .entries()
            .map(|(source, dataset)| CatalogRow {
                key: GenKey::new(source.source, dataset.dataset),
                description: dataset.description,
                data_stream: dataset.data_stream,
            })
            .collect();
        Self {
            orch,
            rows,
            selected: 0,
            rate: 1.0,
            sink_reachable: None,
            status_line: "ready".to_string(),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len() as isize;
        self.selected = (self.selected as isize + delta).clamp(0, len - 1) as usize;
    }

    fn adjust_rate(&mut self, delta: f64) {
        self.rate = (self.rate + delta).clamp(MIN_RATE, MAX_RATE);
    }

    fn selected_key(&self) -> Option<GenKey> {
        self.rows.get(self.selected).map(|r| r.key.clone())
    }
}

async fn handle_key(app: &mut App, key: crossterm::event::KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_rate(RATE_STEP),
        KeyCode::Char('-') => app.adjust_rate(-RATE_STEP),
        KeyCode::Enter => {
            if let Some(key) = app.selected_key() {
                let started = app.orch.start(&key.source, &key.dataset, app.rate).await;
                app.status_line = if started {
                    format!("started {key} at {:.1}/s", app.rate)
                } else {
                    format!("{key} is already running")
                };
            }
        }
        KeyCode::Char('x') => {
            if let Some(key) = app.selected_key() {
                let stopped = app.orch.stop(&key.source, &key.dataset).await;
                app.status_line = if stopped {
                    format!("stopping {key}")
                } else {
                    format!("{key} is not registered")
                };
            }
        }
        KeyCode::Char('e') => {
            if let Some(key) = app.selected_key() {
                let evicted = app.orch.evict(&key.source, &key.dataset).await;
                app.status_line = if evicted {
                    format!("evicted {key}")
                } else {
                    format!("{key} is absent or still running")
                };
            }
        }
        KeyCode::Char('s') => {
            let reachable = app.orch.ping_sink().await;
            app.sink_reachable = Some(reachable);
            app.status_line = if reachable {
                "sink reachable".to_string()
            } else {
                "sink unreachable".to_string()
            };
        }
        _ => {}
    }
    false
}

fn render(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App,
    status: &std::collections::BTreeMap<GenKey, loggen_core::types::TaskStatus>,
) -> Result<()> {
    terminal.draw(|f| {
        let root = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(9),
                Constraint::Length(10),
                Constraint::Length(3),
            ])
            .split(f.area());

        let catalog = {
            let mut lines = Vec::new();
            lines.push(format!(
                "rate={:.1}/s  keys[j k navigate, +/- rate, Enter start, x stop, e evict, s ping, q quit]",
                app.rate
            ));
            for (i, row) in app.rows.iter().enumerate() {
                let marker = if i == app.selected { ">" } else { " " };
                let state = status
                    .get(&row.key)
                    .map(|s| s.state.to_string())
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "{} {:<24} {:<10} {:<36} {}",
                    marker,
                    row.key.to_string(),
                    state,
                    row.data_stream,
                    row.description
                ));
            }
            lines.join("\n")
        };
        let catalog_widget = Paragraph::new(catalog).block(
            Block::default()
                .title("Catalog")
                .borders(Borders::ALL),
        );
        f.render_widget(catalog_widget, root[0]);

        let tasks = {
            let mut lines = Vec::new();
            if status.is_empty() {
                lines.push("no tasks registered".to_string());
            } else {
                lines.push(format!(
                    "{:<24} {:<10} {:>8} {:>12}",
                    "key", "state", "rate", "emitted"
                ));
                let mut total = 0u64;
                for (key, entry) in status {
                    total += entry.total_emitted;
                    lines.push(format!(
                        "{:<24} {:<10} {:>8.1} {:>12}",
                        key.to_string(),
                        entry.state.to_string(),
                        entry.rate_per_second,
                        entry.total_emitted
                    ));
                }
                lines.push(format!("total generated: {total}"));
            }
            lines.join("\n")
        };
        let tasks_widget = Paragraph::new(tasks).block(
            Block::default()
                .title("Tasks")
                .borders(Borders::ALL),
        );
        f.render_widget(tasks_widget, root[1]);

        let sink = match app.sink_reachable {
            Some(true) => "sink: reachable",
            Some(false) => "sink: unreachable",
            None => "sink: unknown (press s)",
        };
        let footer = format!("{sink}  |  {}", app.status_line);
        let style = if app.sink_reachable == Some(false) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let footer_widget = Paragraph::new(footer)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer_widget, root[2]);
    })?;
    Ok(())
}

async fn run_headless(args: &Args, orch: Arc<Orchestrator<ElasticSink>>) -> Result<()> {
    anyhow::ensure!(
        !args.start_specs.is_empty(),
        "headless mode needs at least one --start source:dataset[@rate]"
    );
    for spec in &args.start_specs {
        let (key, rate) = parse_start_spec(spec)?;
        anyhow::ensure!(
            orch.start(&key.source, &key.dataset, rate).await,
            "failed to start {key}: unknown pair or already running"
        );
    }

    let reachable = orch.ping_sink().await;
    tracing::info!(reachable, "sink connectivity probe");

    let deadline = tokio::time::sleep(Duration::from_secs(args.headless_secs));
    tokio::select! {
        _ = deadline => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; draining early");
        }
    }

    orch.stop_all().await;

    let status = orch.status().await;
    let mut total = 0u64;
    for (key, entry) in &status {
        total += entry.total_emitted;
        println!(
            "{key} state={} rate={:.1} emitted={}",
            entry.state, entry.rate_per_second, entry.total_emitted
        );
    }
    anyhow::ensure!(total > 0, "headless run generated no events");
    println!("loggen headless OK events={total}");
    Ok(())
}

async fn run_tui(args: &Args, orch: Arc<Orchestrator<ElasticSink>>) -> Result<()> {
    let mut app = App::new(Arc::clone(&orch));
    for spec in &args.start_specs {
        let (key, rate) = parse_start_spec(spec)?;
        if !orch.start(&key.source, &key.dataset, rate).await {
            app.status_line = format!("start spec {key} rejected");
        }
    }

    enable_raw_mode()?;
    let mut out = io::stdout();
    out.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let tick = Duration::from_millis(args.tick_ms.max(50));
    let mut quit = false;
    while !quit {
        let status = orch.status().await;
        render(&mut terminal, &app, &status)?;
        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                quit = handle_key(&mut app, key).await;
            }
        }
    }

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    orch.stop_all().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    loggen_observe::logging::init_tracing();
    let args = Args::parse();

    let sink = Arc::new(ElasticSink::new(ElasticConfig {
        host: args.es_host.clone(),
        username: args.es_username.clone(),
        password: args.es_password.clone(),
        verify_tls: args.verify_tls,
    })?);
    let config = OrchestratorConfig {
        batch_capacity: args.batch_size,
        drain_timeout: Duration::from_millis(args.drain_timeout_ms),
    };
    let orch = Arc::new(Orchestrator::new(builtin_catalog(), sink, config));

    if args.headless_secs > 0 {
        return run_headless(&args, orch).await;
    }
    run_tui(&args, orch).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_spec_parses_pair_and_rate() {
        let (key, rate) = parse_start_spec("nginx:access@5.5").unwrap();
        assert_eq!(key, GenKey::new("nginx", "access"));
        assert_eq!(rate, 5.5);
    }

    #[test]
    fn start_spec_rate_defaults_to_one() {
        let (key, rate) = parse_start_spec("cisco_asa:log").unwrap();
        assert_eq!(key, GenKey::new("cisco_asa", "log"));
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn start_spec_rejects_malformed_input() {
        assert!(parse_start_spec("nginx").is_err());
        assert!(parse_start_spec("nginx:access@fast").is_err());
        assert!(parse_start_spec(":access").is_err());
    }
}
