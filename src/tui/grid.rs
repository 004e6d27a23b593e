use crate::shared::TrackRow;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub const LABEL_WIDTH: u16 = 22;

// which cell of this row is under the playhead; rows on the triplet grid
// have a different length, so the measure fraction is mapped per row
fn playhead_cell(playhead: Option<f64>, len: usize) -> Option<usize> {
    playhead.map(|f| ((f * len as f64).floor() as usize).min(len.saturating_sub(1)))
}

fn row_label(row: &TrackRow) -> String {
    let flags = format!(
        "{}{}",
        if row.muted { "M" } else { " " },
        if row.triplet { "3" } else { " " },
    );
    let mut name = row.name.clone();
    name.truncate(10);
    format!("{:<10} {} {:>3.0}% {:+.1}", name, flags, row.volume * 100.0, row.pan)
}

pub fn draw_track_row(
    frame: &mut Frame,
    area: Rect,
    row: &TrackRow,
    cursor: Option<usize>,
    playhead: Option<f64>,
    beat_every: usize,
) {
    let head = playhead_cell(playhead, row.cells.len());
    let label_style = if cursor.is_some() {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if row.muted {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let mut spans = vec![Span::styled(format!("{:<w$}", row_label(row), w = LABEL_WIDTH as usize), label_style)];
    for (i, on) in row.cells.iter().enumerate() {
        if beat_every > 0 && i > 0 && i % beat_every == 0 {
            spans.push(Span::raw("│"));
        }
        let glyph = if *on { "●" } else { "·" };
        let mut style = if *on && !row.muted {
            Style::default().fg(Color::LightMagenta)
        } else if *on {
            Style::default().fg(Color::Magenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if head == Some(i) {
            style = style.bg(Color::Blue);
        }
        if cursor == Some(i) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(glyph, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playhead_maps_onto_row_length() {
        assert_eq!(playhead_cell(Some(0.0), 16), Some(0));
        assert_eq!(playhead_cell(Some(0.5), 16), Some(8));
        assert_eq!(playhead_cell(Some(0.5), 12), Some(6));
        assert_eq!(playhead_cell(Some(0.99), 12), Some(11));
        assert_eq!(playhead_cell(None, 16), None);
    }
}
