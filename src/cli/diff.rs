use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use scenefs::Storage;

use crate::{codec::CodecTable, error::ErrorDisplay, session::AuthoringSession, store};

use super::resolve_path;

/// Prints the project document an export would write, without writing it.
#[derive(Debug, Parser)]
pub struct DiffCommand {
    /// Path to the baseline scene file.
    pub baseline: PathBuf,

    /// Path to the edited copy of the baseline scene.
    pub live: PathBuf,
}

impl DiffCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let baseline_path = resolve_path(&self.baseline)?;
        let live_path = resolve_path(&self.live)?;

        let storage = Storage::new_default();
        let session = AuthoringSession::new(CodecTable::standard());

        let baseline = store::load_scene_file(&storage, &baseline_path, session.codecs())
            .context("Could not load the baseline scene")?;
        session.load(baseline, None)?;

        let live = store::load_scene_file(&storage, &live_path, session.codecs())
            .context("Could not load the edited scene")?;
        session.apply_live_scene(live)?;

        let assembled = session.export()?;
        if let Some(failure) = &assembled.global_failure {
            log::warn!("{}", ErrorDisplay(failure));
        }
        for failure in &assembled.failures {
            log::warn!("{}", ErrorDisplay(failure));
        }

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &assembled.document)?;
        writeln!(handle)?;

        Ok(())
    }
}
