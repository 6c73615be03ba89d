//! Shell completion scripts.
//!
//! ```bash
//! genrify completion bash > ~/.local/share/bash-completion/completions/genrify
//! genrify completion zsh > ~/.config/zsh/completions/_genrify
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::Write;

/// Write the completion script for `cmd` to `out`.
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(Shell::PowerShell), CompletionShell::PowerShell);
    }

    #[test]
    fn test_bash_script_mentions_subcommands() {
        let mut out = Vec::new();
        write_completions(CompletionShell::Bash, &mut Args::command(), &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("genrify"));
        assert!(script.contains("organize"));
        assert!(script.contains("playlists"));
    }
}
