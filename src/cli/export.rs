use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use scenefs::Storage;

use crate::{codec::CodecTable, session::AuthoringSession, store};

use super::{default_project_name, resolve_path, scene_dir};

/// Compares an edited scene against its baseline and writes the differences
/// as a project document.
#[derive(Debug, Parser)]
pub struct ExportCommand {
    /// Path to the baseline scene file.
    pub baseline: PathBuf,

    /// Path to the edited copy of the baseline scene.
    pub live: PathBuf,

    /// Directory to write the project document into. Defaults to the
    /// directory holding the baseline.
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Name of the project. Defaults to the baseline's file name without its
    /// extension.
    #[clap(long, short)]
    pub name: Option<String>,
}

impl ExportCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let baseline_path = resolve_path(&self.baseline)?;
        let live_path = resolve_path(&self.live)?;

        let output_dir = match &self.output {
            Some(output) => resolve_path(output)?.into_owned(),
            None => scene_dir(&baseline_path),
        };
        let name = match self.name {
            Some(name) => name,
            None => default_project_name(&baseline_path)?,
        };

        let storage = Storage::new_default();
        let session = AuthoringSession::new(CodecTable::standard());

        log::trace!("Loading baseline {}", baseline_path.display());
        let baseline = store::load_scene_file(&storage, &baseline_path, session.codecs())
            .context("Could not load the baseline scene")?;
        session.load(baseline, None)?;

        log::trace!("Loading edited scene {}", live_path.display());
        let live = store::load_scene_file(&storage, &live_path, session.codecs())
            .context("Could not load the edited scene")?;

        let summary = session.apply_live_scene(live)?;
        log::info!(
            "{} added, {} modified, {} removed",
            summary.added,
            summary.modified,
            summary.removed
        );

        let project_path = store::project_path(&output_dir, &name);
        let document = session
            .save(&storage, &project_path)
            .with_context(|| format!("Could not export project '{}'", name))?;

        println!(
            "Wrote {} fragments to {}",
            document.fragment_count(),
            project_path.display()
        );

        Ok(())
    }
}
