// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use vanguard_recon::core::models::{Report, Severity};

pub fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Severity::High => Style::default().fg(Color::LightRed),
        Severity::Medium => Style::default().fg(Color::Yellow),
        Severity::Low => Style::default().fg(Color::Cyan),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (↑ ↓ to navigate, Tab for narrative)");

    let Some(report) = app.report.clone().filter(|_| app.state == AppState::Finished) else {
        let content = match app.state {
            AppState::Scanning => {
                let phase = app.phase.map(|p| p.to_string()).unwrap_or_else(|| "Pending".to_string());
                let target = app.target.as_deref().unwrap_or_default();
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("{phase} {target}... Please wait.")),
                ]))
            }
            _ => Paragraph::new("Scan results will appear here..."),
        };
        frame.render_widget(content.alignment(Alignment::Center).block(main_block), area);
        return;
    };

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = report
        .vulnerabilities
        .iter()
        .map(|v| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", v.severity.to_string().to_uppercase()), severity_style(v.severity)),
                Span::styled(format!("{}/{} ", v.port, v.service), Style::default().fg(Color::DarkGray)),
                Span::raw(v.issue.clone()),
            ]))
        })
        .collect();

    let findings_list = List::new(items).highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, chunks[0], &mut app.analysis_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app.analysis_list_state.selected().and_then(|i| report.vulnerabilities.get(i));
    match selected {
        Some(v) => {
            let mut text = vec![
                Line::from(vec![Span::styled(v.issue.clone(), severity_style(v.severity))]),
                Line::from(format!("Port {} ({}), risk score {:.1}", v.port, v.service, v.risk_score)),
            ];
            if let Some(cve) = &v.cve {
                text.push(Line::from(format!("CVE: {cve}")));
            }
            text.extend([
                Line::from(""),
                Line::from("WHAT IT IS:".yellow().bold()),
                Line::from(v.description.clone()),
                Line::from(""),
                Line::from("HOW TO FIX:".yellow().bold()),
                Line::from(v.remediation.clone()),
            ]);
            let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
        None => render_placeholder_details(frame, &report, detail_block, chunks[1]),
    }
}

fn render_placeholder_details(frame: &mut Frame, report: &Report, block: Block, area: Rect) {
    let placeholder_text = if let Some(reason) = &report.scan_error {
        Text::from(vec![
            Line::from(""),
            Line::from("✗ PORT SCAN FAILED".bold().fg(Color::Red)),
            Line::from(""),
            Line::from(reason.clone()),
            Line::from(""),
            Line::from("No checks could run, so an empty result says nothing about this host."),
        ])
    } else if report.vulnerabilities.is_empty() {
        Text::from(vec![
            Line::from(""),
            Line::from("✓ NO KNOWN ISSUES".bold().fg(Color::Green)),
            Line::from(""),
            Line::from(format!("{} open port(s) checked, nothing matched.", report.open_ports.len())),
        ])
    } else {
        Text::from("Select an item above to see details.")
    };

    let p = Paragraph::new(placeholder_text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(p, area);
}
