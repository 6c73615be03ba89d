//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `genrify` binary.
//!
//! ## Commands
//!
//! - `import`: Cache an enriched track library for a user
//! - `analyze`: Print the user's favourite genres
//! - `organize`: Cut the library into playlists and publish them
//! - `playlists`: List the user's stored playlists
//! - `delete`: Remove every generated playlist
//! - `forget`: Drop the user's cached library
//!
//! ## Examples
//!
//! ```bash
//! genrify import library.json --user alice
//! genrify organize --user alice --strategy decade
//! genrify organize --user alice --seed 7 --dry-run
//! ```

use crate::organize::Strategy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
#[command(name = "genrify")]
#[command(about = "Genrify: organize a saved-track library into named, genre-coherent playlists")]
#[command(version)]
pub struct Args {
    /// Directory holding the database and settings.json
    #[arg(long, global = true, env = "GENRIFY_DATA_DIR", value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cache an enriched track library for a user
    ///
    /// The file is a JSON array of tracks carrying genre tags and audio
    /// features. Importing replaces any library already cached for the
    /// user and invalidates the cached taste summary.
    Import {
        /// JSON file with the enriched tracks
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Library owner
        #[arg(short, long)]
        user: String,
    },

    /// Print the user's three favourite genres
    Analyze {
        #[arg(short, long)]
        user: String,

        /// Read tracks from this file instead of the cache
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
    },

    /// Organize the library into playlists
    ///
    /// Runs in the background job pool. Playlists are created first, then
    /// filled in batches of at most 50 tracks.
    Organize {
        #[arg(short, long)]
        user: String,

        /// Read tracks from this file instead of the cache
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,

        /// How tracks are grouped
        #[arg(short, long, value_enum, default_value_t = Strategy::Cluster)]
        strategy: Strategy,

        /// Seed for k-means initialization (cluster strategy only)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the planned playlists as JSON without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// List the user's stored playlists
    Playlists {
        #[arg(short, long)]
        user: String,
    },

    /// Delete every generated playlist of the user
    Delete {
        #[arg(short, long)]
        user: String,
    },

    /// Drop everything cached for the user
    Forget {
        #[arg(short, long)]
        user: String,
    },

    /// Generate shell completions
    ///
    /// Usage: genrify completion bash > ~/.local/share/bash-completion/completions/genrify
    Completion {
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_organize() {
        let args = Args::try_parse_from([
            "genrify",
            "organize",
            "--user",
            "alice",
            "--strategy",
            "decade",
            "--seed",
            "3",
            "--dry-run",
        ])
        .unwrap();
        match args.command {
            Command::Organize { user, input, strategy, seed, dry_run } => {
                assert_eq!(user, "alice");
                assert_eq!(input, None);
                assert_eq!(strategy, Strategy::Decade);
                assert_eq!(seed, Some(3));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_data_dir_is_global() {
        let args =
            Args::try_parse_from(["genrify", "playlists", "-u", "bob", "--data-dir", "/tmp/g"])
                .unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/g")));
    }

    #[test]
    fn test_user_is_required() {
        assert!(Args::try_parse_from(["genrify", "delete"]).is_err());
    }
}
