//! Shell completions generation command
//!
//! Usage: `mycare completions bash > ~/.local/share/bash-completion/completions/mycare`

use std::io::{self, Write};

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::output::OutputFormat;

/// Arguments for the completions subcommand
#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    /// Execute the completions command, printing completions to stdout
    pub async fn execute(&self, _format: OutputFormat) -> Result<()> {
        write_completions(self.shell, &mut io::stdout());
        Ok(())
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = crate::Cli::command();
    clap_complete::generate(shell, &mut cmd, "mycare", out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_cover_share_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("mycare"));
        assert!(script.contains("open"));
        assert!(script.contains("--no-download"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        crate::Cli::command().debug_assert();
    }
}
