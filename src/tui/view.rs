use crate::shared::{DisplayState, ParamPage};
use super::grid::draw_track_row;
use super::mode::TuiState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const HELP: &str = "space play/stop  arrows/hjkl move  enter/x toggle  a add  d delete  c clear  \
m mute  t triplet  p/P precision  tab page  [ ] knob A  - = knob B  q quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport + meter readout
            Constraint::Min(4),    // track grid
            Constraint::Length(if ts.show_help { 3 } else { 1 }), // status line
        ])
        .split(area);

    draw_header(frame, sections[0], state, ts);
    draw_tracks(frame, sections[1], state);
    draw_status(frame, sections[2], state, ts);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let (knob_a, knob_b) = ts.param_page.knob_labels();
    let transport = if state.playing {
        Span::styled(" ▶ PLAY ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        Span::styled(" ■ STOP ", Style::default().fg(Color::Black).bg(Color::DarkGray))
    };
    let line = Line::from(vec![
        transport,
        Span::raw(format!(
            "  {:.0} BPM  swing {:.0}%  {}/{}  x{}  ({} steps, {} triplet)",
            state.tempo,
            state.swing,
            state.beats_per_measure,
            state.beat_unit,
            state.step_precision,
            state.step_count,
            state.triplet_step_count,
        )),
        Span::styled(
            format!("   [{}] {} / {}", page_name(ts), knob_a, knob_b),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" loopbox ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn page_name(ts: &TuiState) -> &'static str {
    match ts.param_page {
        ParamPage::Transport => "transport",
        ParamPage::Meter => "meter",
        ParamPage::Mix => "mix",
    }
}

fn draw_tracks(frame: &mut Frame, area: Rect, state: &DisplayState) {
    if state.rows.is_empty() {
        let hint = Paragraph::new("no tracks. put .wav files in the project directory and press a")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, area);
        return;
    }

    // scroll so the cursor row stays visible
    let visible = area.height as usize;
    let first = state.cursor_row.saturating_sub(visible.saturating_sub(1));
    let beats = state.beats_per_measure.max(1) as usize;
    for (i, row) in state.rows.iter().enumerate().skip(first).take(visible) {
        let row_area = Rect { y: area.y + (i - first) as u16, height: 1, ..area };
        let cursor = (i == state.cursor_row).then_some(state.cursor_step);
        draw_track_row(frame, row_area, row, cursor, state.playhead, row.cells.len() / beats);
    }
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let mut lines = Vec::new();
    if ts.show_help {
        lines.push(Line::styled(HELP, Style::default().fg(Color::DarkGray)));
    }
    if state.status.is_empty() {
        lines.push(Line::styled("? for keys", Style::default().fg(Color::DarkGray)));
    } else {
        lines.push(Line::styled(
            state.status.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(Paragraph::new(lines).wrap(ratatui::widgets::Wrap { trim: true }), area);
}
