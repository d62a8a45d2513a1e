// src/ui/widgets/summary.rs

use super::analysis_view::severity_style;
use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
};
use strum::IntoEnumIterator;
use vanguard_recon::core::models::Severity;

/// Renders the summary panel: risk gauge, severity histogram, exposed
/// services and the reports kept from earlier scans in this session.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Risk score
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(6), // Severity histogram
            Constraint::Length(1), // Spacer
            Constraint::Min(3),    // Open ports
            Constraint::Length(6), // Stored reports
        ])
        .split(area);

    let Some(report) = app.report.as_ref().filter(|_| app.state == AppState::Finished) else {
        return;
    };

    // --- Risk Score ---
    let (level, color) = match report.risk_score {
        s if s > 7.0 => ("High", Color::Red),
        s if s > 4.0 => ("Medium", Color::Yellow),
        _ => ("Low", Color::Green),
    };
    let score_text = Text::from(vec![
        Line::from("Risk Score".bold()),
        Line::from(format!("{:.1}/10 ({level})", report.risk_score)).style(Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    let gauge = Gauge::default()
        .percent(app.displayed_score.min(100))
        .label("")
        .style(Style::default().fg(color));
    frame.render_widget(gauge, summary_chunks[1]);

    // --- Severity Histogram ---
    let bars: Vec<Bar> = Severity::iter()
        .map(|severity| {
            let label: String = severity.to_string().chars().take(4).collect();
            Bar::default()
                .value(report.severity_summary.count(severity) as u64)
                .label(Line::from(label))
                .style(severity_style(severity))
                .value_style(severity_style(severity).reversed())
        })
        .collect();
    let histogram = BarChart::default()
        .block(Block::default().title("FINDINGS BY SEVERITY".bold()))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1);
    frame.render_widget(histogram, summary_chunks[3]);

    // --- Open Ports ---
    let mut port_lines: Vec<Line> = report
        .open_ports
        .iter()
        .map(|port| {
            let service = report.services.get(port).map(String::as_str).unwrap_or("unknown");
            let mut spans = vec![
                Span::styled(format!("{port:>5}"), Style::default().fg(Color::Cyan)),
                Span::raw(format!("  {service}")),
            ];
            if let Some(version) = report.versions.get(port) {
                spans.push(Span::styled(format!("  {version}"), Style::default().fg(Color::DarkGray)));
            }
            Line::from(spans)
        })
        .collect();
    if port_lines.is_empty() {
        port_lines.push(Line::from("None found.".dark_gray()));
    }
    if let Some(os) = &report.os_guess {
        port_lines.push(Line::from(Span::styled(format!("OS: {os}"), Style::default().fg(Color::DarkGray))));
    }
    let ports = Paragraph::new(port_lines).block(Block::default().title("OPEN PORTS".bold()));
    frame.render_widget(ports, summary_chunks[5]);

    // --- Stored Reports ---
    let stored_lines: Vec<Line> = app
        .stored_reports
        .iter()
        .map(|r| {
            Line::from(vec![
                Span::raw(format!("{} ", r.target)),
                Span::styled(format!("{:.1}", r.risk_score), Style::default().fg(Color::DarkGray)),
                Span::styled(format!(" {}", r.scan_time.format("%H:%M:%S")), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let stored = Paragraph::new(stored_lines).block(Block::default().title("SESSION REPORTS".bold()));
    frame.render_widget(stored, summary_chunks[6]);
}
