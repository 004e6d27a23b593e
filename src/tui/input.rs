use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crate::shared::{InputEvent, ParamPage};
use super::mode::TuiState;

const TEMPO_STEP: f64 = 1.0;
const SWING_STEP: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;
const PAN_STEP: f32 = 0.1;

// poll for a key press, resolve it against tui state into semantic input events
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        KeyCode::Up | KeyCode::Char('k') => vec![InputEvent::CursorUp],
        KeyCode::Down | KeyCode::Char('j') => vec![InputEvent::CursorDown],
        KeyCode::Left | KeyCode::Char('h') => vec![InputEvent::CursorLeft],
        KeyCode::Right | KeyCode::Char('l') => vec![InputEvent::CursorRight],
        KeyCode::Enter | KeyCode::Char('x') => vec![InputEvent::ToggleStep],

        KeyCode::Char('a') => vec![InputEvent::AddTrack],
        KeyCode::Char('d') => vec![InputEvent::RemoveTrack],
        KeyCode::Char('c') => vec![InputEvent::ClearTrack],
        KeyCode::Char('m') => vec![InputEvent::ToggleMute],
        KeyCode::Char('t') => vec![InputEvent::ToggleTriplet],

        // step precision, lowercase = down and shifted = up
        KeyCode::Char('p') => vec![InputEvent::AdjustStepPrecision(-1)],
        KeyCode::Char('P') => vec![InputEvent::AdjustStepPrecision(1)],

        KeyCode::Tab => { ts.param_page = ts.param_page.next(); vec![] }
        KeyCode::Char('?') => { ts.show_help = !ts.show_help; vec![] }

        // knobs
        KeyCode::Char('[') => resolve_knob_a(-1, ts),
        KeyCode::Char(']') => resolve_knob_a(1, ts),
        KeyCode::Char('-') => resolve_knob_b(-1, ts),
        KeyCode::Char('=') => resolve_knob_b(1, ts),

        _ => vec![],
    }
}

// knob a: tempo, beats per measure, or track volume
fn resolve_knob_a(dir: i32, ts: &TuiState) -> Vec<InputEvent> {
    match ts.param_page {
        ParamPage::Transport => vec![InputEvent::AdjustTempo(dir as f64 * TEMPO_STEP)],
        ParamPage::Meter => vec![InputEvent::AdjustBeatsPerMeasure(dir)],
        ParamPage::Mix => vec![InputEvent::AdjustVolume(dir as f32 * VOLUME_STEP)],
    }
}

// knob b: swing, beat unit, or track pan
fn resolve_knob_b(dir: i32, ts: &TuiState) -> Vec<InputEvent> {
    match ts.param_page {
        ParamPage::Transport => vec![InputEvent::AdjustSwing(dir as f64 * SWING_STEP)],
        ParamPage::Meter => vec![InputEvent::AdjustBeatUnit(dir)],
        ParamPage::Mix => vec![InputEvent::AdjustPan(dir as f32 * PAN_STEP)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knobs_follow_the_param_page() {
        let mut ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char(']'), &mut ts), vec![InputEvent::AdjustTempo(1.0)]);
        assert!(handle_key(KeyCode::Tab, &mut ts).is_empty());
        assert_eq!(handle_key(KeyCode::Char('-'), &mut ts), vec![InputEvent::AdjustBeatUnit(-1)]);
        handle_key(KeyCode::Tab, &mut ts);
        assert_eq!(handle_key(KeyCode::Char('='), &mut ts), vec![InputEvent::AdjustPan(0.1)]);
        handle_key(KeyCode::Tab, &mut ts);
        assert_eq!(ts.param_page, ParamPage::Transport);
    }

    #[test]
    fn vim_keys_move_the_cursor() {
        let mut ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char('j'), &mut ts), vec![InputEvent::CursorDown]);
        assert_eq!(handle_key(KeyCode::Left, &mut ts), vec![InputEvent::CursorLeft]);
        assert!(handle_key(KeyCode::Char('z'), &mut ts).is_empty());
    }
}
