// src/ui/mod.rs

use crate::app::{App, AppState, ReportTab};
use ratatui::prelude::*;

mod layout;
mod widgets;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let layout = layout::create_layout(area, app.show_logs);

    widgets::input::render_input(frame, app, layout.input);

    match (app.state, app.tab) {
        (AppState::Finished, ReportTab::Narrative) => widgets::narrative_view::render_narrative_view(frame, app, layout.report),
        _ => widgets::analysis_view::render_analysis_view(frame, app, layout.report),
    }

    widgets::summary::render_summary(frame, app, layout.summary);
    if app.show_logs {
        widgets::log_view::render_log_view(frame, app, layout.log_panel);
    }
    widgets::footer::render_footer(frame, app, layout.footer);

    if app.show_disclaimer {
        widgets::disclaimer_popup::render_disclaimer_popup(frame, area);
    }
}
