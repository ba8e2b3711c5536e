use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use scenefs::Storage;

use crate::{codec::CodecTable, session::AuthoringSession, store};

use super::{default_project_name, resolve_path, scene_dir};

/// Applies a project document to its baseline scene and writes out the
/// resulting scene.
#[derive(Debug, Parser)]
pub struct ImportCommand {
    /// Path to the baseline scene file.
    pub baseline: PathBuf,

    /// Path to the project document. Defaults to the project next to the
    /// baseline that shares its name.
    #[clap(long, short)]
    pub project: Option<PathBuf>,

    /// Where to write the reconciled scene file.
    #[clap(long, short)]
    pub output: PathBuf,

    /// Fail instead of warning when some fragments could not be applied.
    #[clap(long)]
    pub strict: bool,
}

impl ImportCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let baseline_path = resolve_path(&self.baseline)?;
        let output_path = resolve_path(&self.output)?;

        let project_path = match &self.project {
            Some(project) => resolve_path(project)?.into_owned(),
            None => store::project_path(
                &scene_dir(&baseline_path),
                &default_project_name(&baseline_path)?,
            ),
        };

        let storage = Storage::new_default();
        if !storage.exists(&project_path)? {
            bail!("No project document at {}", project_path.display());
        }

        let session = AuthoringSession::new(CodecTable::standard());
        let report = session
            .open(&storage, &baseline_path, &project_path)
            .with_context(|| format!("Could not import {}", project_path.display()))?;

        if let Some(message) = report.combined_message() {
            if self.strict {
                bail!("Some fragments could not be applied:\n{}", message);
            }

            log::warn!("Some fragments could not be applied:\n{}", message);
        }

        for reference in &report.unresolved {
            log::warn!(
                "Dropped reference {}.{} to missing entity {}",
                reference.source_id,
                reference.field,
                reference.target_id
            );
        }

        // Reattach the scene's own handlers before writing it out.
        session.toggle_interactions();
        store::save_scene_file(
            &storage,
            &output_path,
            &session.graph(),
            session.codecs(),
        )?;

        println!(
            "Applied {} fragments, wrote {}",
            report.applied,
            output_path.display()
        );

        Ok(())
    }
}
