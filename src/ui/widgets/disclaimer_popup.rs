// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

/// Renders the authorization notice as a modal over the rest of the UI.
///
/// The `Clear` widget wipes the popup area first so nothing underneath bleeds
/// through. The popup stays up until the user acknowledges it.
///
/// # Arguments
/// * `frame` - The `Frame` being drawn.
/// * `area` - The full terminal area; the popup is centered inside it.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("AUTHORIZED USE ONLY".bold().yellow()),
        Line::from(""),
        Line::from("Vanguard Recon runs a port scan with service and OS detection against the target, then connects to the exposed services to grab banners, HTTP headers and TLS certificates."),
        Line::from(""),
        Line::from("Scanning hosts you do not own or have explicit, written permission to test is illegal in many jurisdictions. Port scans are noisy and are routinely logged and reported."),
        Line::from(""),
        Line::from("Findings come from a small set of heuristic checks. An empty report is not proof that a host is secure."),
        Line::from(""),
        Line::from("When a summarizer credential is configured, the findings for each target are sent to the configured third-party endpoint."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to acknowledge and continue, ".bold() + "Q".bold().yellow() + " to quit".bold()),
    ]);

    let block = Block::default()
        .title("Before You Scan")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 70, area);

    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A `Rect` of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}