// to be called on main startup and quit; saves state of app so we can reload it later
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pipeline::project::SavedState;

const LOOPBOX_DIR: &str = ".loopbox";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.loopbox
pub fn loopbox_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(LOOPBOX_DIR)
}

fn project_file_path(project_dir: &Path) -> PathBuf {
    loopbox_dir(project_dir).join(PROJECT_FILE)
}

// None when there is nothing saved yet; a file that exists but won't parse is an error
pub fn load_project(project_dir: &Path) -> anyhow::Result<Option<SavedState>> {
    let path = project_file_path(project_dir);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let saved = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(saved))
}

// Save the project state to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &SavedState) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .loopbox/ if needed
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{SequencerState, Track, TrackId};

    #[test]
    fn nothing_saved_yet() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_project(dir.path()).unwrap(), None);
    }

    #[test]
    fn saved_session_comes_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = SequencerState::default();
        state.tempo_change(93.0).unwrap();
        state.swing_change(40.0).unwrap();
        state
            .add_track(Track::new(TrackId::from("k"), "Kick", "kick").with_positions([0, 8]))
            .unwrap();
        save_project(dir.path(), &state.to_saved()).unwrap();

        let mut restored = SequencerState::default();
        restored.load_app_state(load_project(dir.path()).unwrap().unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(loopbox_dir(dir.path())).unwrap();
        std::fs::write(project_file_path(dir.path()), "{ nope").unwrap();
        assert!(load_project(dir.path()).is_err());
    }
}
