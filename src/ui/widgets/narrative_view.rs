// src/ui/widgets/narrative_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use vanguard_recon::core::models::NarrativeAnalysis;

fn heading(title: &'static str) -> Line<'static> {
    Line::from(title.yellow().bold())
}

fn bullets(items: &[String]) -> impl Iterator<Item = Line<'static>> + '_ {
    items.iter().map(|item| Line::from(format!("• {item}")))
}

/// Renders the narrative analysis of the current report.
pub fn render_narrative_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Narrative (↑ ↓ to scroll, Tab for findings)");

    let Some(report) = &app.report else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    match &report.narrative_analysis {
        NarrativeAnalysis::Sections(sections) => {
            lines.push(heading("EXECUTIVE SUMMARY"));
            lines.push(Line::from(sections.executive_summary.clone()));
            lines.push(Line::from(""));
            lines.push(heading("RISK ASSESSMENT"));
            lines.push(Line::from(sections.risk_assessment.clone()));
            lines.push(Line::from(""));
            lines.push(heading("PRIORITIES"));
            lines.extend(bullets(&sections.priority_recommendations));
            lines.push(Line::from(""));
            lines.push(heading("REMEDIATION STEPS"));
            if sections.remediation_steps.is_empty() {
                lines.push(Line::from("None required.".dark_gray()));
            }
            lines.extend(bullets(&sections.remediation_steps));
        }
        NarrativeAnalysis::Raw { analysis } => {
            lines.push(heading("ANALYSIS"));
            lines.extend(analysis.lines().map(|l| Line::from(l.to_string())));
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.narrative_scroll, 0));
    frame.render_widget(paragraph, area);
}
