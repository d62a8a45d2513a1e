// src/main.rs

use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vanguard_recon::config::Config;
use vanguard_recon::core::export;
use vanguard_recon::core::models::Report;
use vanguard_recon::core::narrative::Narrator;
use vanguard_recon::core::orchestrator::Orchestrator;
use vanguard_recon::core::portscan::NmapScanner;
use vanguard_recon::core::probe::NetworkProber;
use vanguard_recon::core::service::ScanService;
use vanguard_recon::core::target::Target;
use vanguard_recon::logging::initialize_logging;

mod app;
mod ui;

use app::{App, AppState, ExportStatus};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    initialize_logging()?;

    let config = Config::from_env().wrap_err("invalid configuration")?;
    let service = Arc::new(build_service(&config)?);
    if let Some(api_key) = &config.api_key {
        service
            .set_summarizer_credential(api_key)
            .await
            .wrap_err("failed to configure the summarizer")?;
    }
    info!(ports = %config.ports, nmap = %config.nmap_path.display(), "Vanguard Recon started.");

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = run(&mut terminal, &service).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    result
}

fn build_service(config: &Config) -> Result<ScanService> {
    let scanner = NmapScanner::new(&config.nmap_path, config.scan_timeout).with_os_detection(config.os_detection);
    let prober = NetworkProber::new(config.probe_timeout).wrap_err("failed to build the HTTP client")?;
    let orchestrator = Orchestrator::new(Arc::new(scanner), Arc::new(prober))
        .with_ports(config.ports.clone())
        .with_check_timeout(config.probe_timeout)
        .with_max_concurrent_checks(config.max_concurrent_checks);
    Ok(ScanService::new(orchestrator, Narrator::new(config.summarizer_settings())))
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, service: &Arc<ScanService>) -> Result<()> {
    let mut app = App::new();
    let mut job: Option<JoinHandle<Arc<Report>>> = None;

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code, service, &mut job);
                }
            }
        }

        if let (AppState::Scanning, Some(target)) = (app.state, app.target.as_deref()) {
            app.phase = service.job_phase(target).or(app.phase);
        }

        if job.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = job.take() {
                match handle.await {
                    Ok(report) => app.finish(report, service.list_reports()),
                    Err(e) => {
                        error!(error = %e, "Scan job ended without a report.");
                        app.fail(format!("Scan job failed: {e}"));
                    }
                }
            }
        }

        app.on_tick();
    }
    Ok(())
}

fn handle_key(app: &mut App, key_code: KeyCode, service: &Arc<ScanService>, job: &mut Option<JoinHandle<Arc<Report>>>) {
    if app.show_disclaimer {
        match key_code {
            KeyCode::Enter => app.show_disclaimer = false,
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            _ => {}
        }
        return;
    }

    match app.state {
        AppState::Idle => handle_idle_input(app, key_code, service, job),
        AppState::Scanning => match key_code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Char('l') => app.toggle_logs(),
            _ => {}
        },
        AppState::Finished => handle_finished_input(app, key_code),
    }
}

/// Idle means typing a target, so only Esc quits here.
fn handle_idle_input(app: &mut App, key_code: KeyCode, service: &Arc<ScanService>, job: &mut Option<JoinHandle<Arc<Report>>>) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => {
            app.input.push(c);
            app.error_message = None;
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => match Target::parse(&app.input).and_then(|t| service.start_scan(t.as_str()).map(|h| (t, h))) {
            Ok((target, handle)) => {
                *job = Some(handle);
                app.begin_scan(target.to_string());
            }
            Err(e) => app.error_message = Some(e.to_string()),
        },
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => export_current(app),
        KeyCode::Char('l') => app.toggle_logs(),
        KeyCode::Tab => app.toggle_tab(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        _ => {}
    }
}

fn export_current(app: &mut App) {
    let Some(report) = &app.report else {
        return;
    };
    app.export_status = match export::write_report(report, &export::default_export_dir()) {
        Ok(path) => ExportStatus::Success(path.display().to_string()),
        Err(e) => {
            error!(error = %e, "Report export failed.");
            ExportStatus::Error(e.to_string())
        }
    };
}
