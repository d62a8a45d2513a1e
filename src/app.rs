// src/app.rs

use ratatui::widgets::{ListState, ScrollbarState};
use std::sync::Arc;
use vanguard_recon::core::models::{Report, ScanPhase};
use vanguard_recon::logging::log_file_path;

pub const SPINNER_CHARS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Lines of the log file kept for the log panel.
const LOG_TAIL_LINES: usize = 200;

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTab {
    Findings,
    Narrative,
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    /// Normalized target of the running or last finished job.
    pub target: Option<String>,
    pub phase: Option<ScanPhase>,
    pub report: Option<Arc<Report>>,
    pub stored_reports: Vec<Arc<Report>>,
    pub tab: ReportTab,
    pub analysis_list_state: ListState,
    pub narrative_scroll: u16,
    pub spinner_frame: usize,
    /// Gauge percentage, animated towards the report's risk score.
    pub displayed_score: u16,
    pub show_logs: bool,
    pub log_content: Vec<String>,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub export_status: ExportStatus,
    pub error_message: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            target: None,
            phase: None,
            report: None,
            stored_reports: Vec::new(),
            tab: ReportTab::Findings,
            analysis_list_state: ListState::default(),
            narrative_scroll: 0,
            spinner_frame: 0,
            displayed_score: 0,
            show_logs: false,
            log_content: Vec::new(),
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            export_status: ExportStatus::Idle,
            error_message: None,
        }
    }

    pub fn on_tick(&mut self) {
        if self.state == AppState::Scanning {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
        let target = self.target_score();
        if self.displayed_score < target {
            self.displayed_score = (self.displayed_score + 2).min(target);
        } else if self.displayed_score > target {
            self.displayed_score = target;
        }
        if self.show_logs {
            self.refresh_logs();
        }
    }

    /// Risk score of the current report as a gauge percentage.
    pub fn target_score(&self) -> u16 {
        self.report
            .as_ref()
            .map(|r| (r.risk_score * 10.0).round().clamp(0.0, 100.0) as u16)
            .unwrap_or(0)
    }

    pub fn begin_scan(&mut self, target: String) {
        self.state = AppState::Scanning;
        self.target = Some(target);
        self.phase = Some(ScanPhase::Pending);
        self.error_message = None;
        self.export_status = ExportStatus::Idle;
    }

    pub fn finish(&mut self, report: Arc<Report>, stored_reports: Vec<Arc<Report>>) {
        self.state = AppState::Finished;
        self.phase = Some(ScanPhase::Complete);
        self.analysis_list_state = ListState::default();
        if !report.vulnerabilities.is_empty() {
            self.analysis_list_state.select(Some(0));
        }
        self.report = Some(report);
        self.stored_reports = stored_reports;
        self.tab = ReportTab::Findings;
        self.narrative_scroll = 0;
        self.displayed_score = 0;
    }

    /// The job ended without a report (its task panicked).
    pub fn fail(&mut self, message: String) {
        self.state = AppState::Idle;
        self.phase = None;
        self.error_message = Some(message);
    }

    pub fn select_next(&mut self) {
        let len = self.report.as_ref().map_or(0, |r| r.vulnerabilities.len());
        if len == 0 {
            return;
        }
        let next = self.analysis_list_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.analysis_list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if let Some(i) = self.analysis_list_state.selected() {
            self.analysis_list_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn scroll_up(&mut self) {
        match self.tab {
            ReportTab::Findings => self.select_previous(),
            ReportTab::Narrative => self.narrative_scroll = self.narrative_scroll.saturating_sub(1),
        }
    }

    pub fn scroll_down(&mut self) {
        match self.tab {
            ReportTab::Findings => self.select_next(),
            ReportTab::Narrative => self.narrative_scroll = self.narrative_scroll.saturating_add(1),
        }
    }

    pub fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            ReportTab::Findings => ReportTab::Narrative,
            ReportTab::Narrative => ReportTab::Findings,
        };
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
        if self.show_logs {
            self.refresh_logs();
        }
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    fn refresh_logs(&mut self) {
        // The log file may not exist yet; an empty panel is fine then.
        let Ok(content) = std::fs::read_to_string(log_file_path()) else {
            return;
        };
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(LOG_TAIL_LINES);
        self.log_content = lines[start..].iter().map(|l| l.to_string()).collect();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.target = None;
        self.phase = None;
        self.report = None;
        self.tab = ReportTab::Findings;
        self.analysis_list_state = ListState::default();
        self.narrative_scroll = 0;
        self.displayed_score = 0;
        self.export_status = ExportStatus::Idle;
        self.error_message = None;
    }
}
