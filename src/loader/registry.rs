// Sample identifier -> engine sample. Identifiers are WAV file stems in the
// project directory ("kick.wav" is "kick").

use std::collections::HashMap;
use std::path::Path;

use crate::audio::{SampleBuffer, SampleId};

use super::sample_loader;

#[derive(Clone, Debug, Default)]
pub struct SampleRegistry {
    by_name: HashMap<String, SampleId>,
    names: Vec<String>, // load order
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: SampleId) {
        let name = name.into();
        if self.by_name.insert(name.clone(), id).is_none() {
            self.names.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<SampleId> {
        self.by_name.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Decodes every WAV in `dir` and hands each buffer to `register` (which
    /// forwards it to the engine). Files that fail to decode are skipped.
    pub fn load_dir(
        &mut self,
        dir: &Path,
        target_rate: u32,
        mut register: impl FnMut(SampleId, SampleBuffer),
    ) -> anyhow::Result<usize> {
        let mut loaded = 0;
        for path in sample_loader::index_wav_in_dir(dir)? {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            match sample_loader::load(&path, target_rate) {
                Ok((id, buffer)) => {
                    log::debug!(target: "loader", "loaded {} ({:.2} s)", name, buffer.duration_secs(target_rate));
                    register(id, buffer);
                    self.insert(name, id);
                    loaded += 1;
                }
                Err(e) => log::warn!(target: "loader", "skipping {}: {:#}", path.display(), e),
            }
        }
        Ok(loaded)
    }
}
