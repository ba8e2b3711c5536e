//! Defines scenepatch's CLI through clap types.

mod diff;
mod export;
mod import;

use std::{
    borrow::Cow,
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use clap::Parser;
use thiserror::Error;

pub use self::diff::DiffCommand;
pub use self::export::ExportCommand;
pub use self::import::ImportCommand;

/// Command line options that scenepatch accepts, defined using the clap crate.
#[derive(Debug, Parser)]
#[clap(name = "scenepatch", version, about, author)]
pub struct Options {
    #[clap(flatten)]
    pub global: GlobalOptions,

    /// Subcommand to run in this invocation.
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

impl Options {
    pub fn run(self) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Export(subcommand) => subcommand.run(),
            Subcommand::Import(subcommand) => subcommand.run(),
            Subcommand::Diff(subcommand) => subcommand.run(),
        }
    }
}

#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Sets verbosity level. Can be specified multiple times.
    #[clap(long("verbose"), short, global(true), parse(from_occurrences))]
    pub verbosity: u8,

    /// Set color behavior. Valid values are auto, always, and never.
    #[clap(long("color"), global(true), default_value("auto"))]
    pub color: ColorChoice,
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl FromStr for ColorChoice {
    type Err = ColorChoiceParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        match source {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(ColorChoiceParseError {
                attempted: source.to_owned(),
            }),
        }
    }
}

impl From<ColorChoice> for env_logger::WriteStyle {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => env_logger::WriteStyle::Auto,
            ColorChoice::Always => env_logger::WriteStyle::Always,
            ColorChoice::Never => env_logger::WriteStyle::Never,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid color choice '{attempted}'. Valid values are: auto, always, never")]
pub struct ColorChoiceParseError {
    attempted: String,
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    Export(ExportCommand),
    Import(ImportCommand),
    Diff(DiffCommand),
}

pub(super) fn resolve_path(path: &Path) -> anyhow::Result<Cow<'_, Path>> {
    if path.is_absolute() {
        Ok(Cow::Borrowed(path))
    } else {
        let current_dir = env::current_dir().context("Could not read the current directory")?;
        Ok(Cow::Owned(current_dir.join(path)))
    }
}

/// The project name used when none is given: the scene file's stem.
pub(super) fn default_project_name(scene: &Path) -> anyhow::Result<String> {
    scene
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
        .with_context(|| format!("Could not derive a project name from {}", scene.display()))
}

/// Where the project for `scene` lives when no directory is given: next to
/// the scene file.
pub(super) fn scene_dir(scene: &Path) -> PathBuf {
    scene
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_choice_parses() {
        assert!(matches!("never".parse(), Ok(ColorChoice::Never)));

        let err = "sometimes".parse::<ColorChoice>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid color choice 'sometimes'. Valid values are: auto, always, never"
        );
    }

    #[test]
    fn project_name_comes_from_scene() {
        let scene = Path::new("/work/level1.scene.json");

        assert_eq!(default_project_name(scene).unwrap(), "level1.scene");
        assert_eq!(scene_dir(scene), PathBuf::from("/work"));
    }

    #[test]
    fn export_arguments_parse() {
        let options = Options::try_parse_from([
            "scenepatch",
            "-vv",
            "export",
            "base.json",
            "live.json",
            "--output",
            "out",
        ])
        .unwrap();

        assert_eq!(options.global.verbosity, 2);
        match options.subcommand {
            Subcommand::Export(command) => {
                assert_eq!(command.baseline, PathBuf::from("base.json"));
                assert_eq!(command.output, Some(PathBuf::from("out")));
                assert_eq!(command.name, None);
            }
            other => panic!("unexpected subcommand {:?}", other),
        }
    }
}
