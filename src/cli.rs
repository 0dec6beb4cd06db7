use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Turn EPUB and PDF documents into tagged audiobooks.
#[derive(Parser, Debug)]
#[command(name = "narrate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (defaults to ./narrate.toml, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging (-v: debug, -vv: trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Narrate a document, reusing whatever earlier runs already produced
    Run {
        /// EPUB or PDF document
        document: Option<PathBuf>,

        /// Narrate a summary instead of the full text
        #[arg(long)]
        summarize: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["narrate"], None, false)]
    #[case(&["narrate", "run"], None, false)]
    #[case(&["narrate", "run", "Dune.epub"], Some("Dune.epub"), false)]
    #[case(&["narrate", "-vv", "run", "--summarize", "Dune.epub"], Some("Dune.epub"), true)]
    fn test_parse(#[case] args: &[&str], #[case] document: Option<&str>, #[case] summarize: bool) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        match cli.command {
            Some(Command::Run { document: parsed, summarize: flag }) => {
                assert_eq!(parsed, document.map(PathBuf::from));
                assert_eq!(flag, summarize);
            },
            None => assert!(document.is_none() && !summarize),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["narrate", "run", "Dune.epub", "--config", "alt.toml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert_eq!(cli.verbose, 1);
    }
}
