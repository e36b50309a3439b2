use clap::{Parser, Subcommand, ValueEnum};
use reagent_utils::LogFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reagent")]
#[command(about = "Run ReAct agents and agent teams from the command line", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the team described by a settings file
    Run {
        /// Settings file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Task text; read from stdin when omitted
        #[arg(short, long)]
        task: Option<String>,

        /// Prior context handed to the first agent
        #[arg(long)]
        context: Option<String>,

        /// Replay model replies from a JSON file instead of calling the API
        #[arg(long)]
        script: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in tools
    Tools,

    /// Invoke one built-in tool directly
    Invoke {
        /// Tool name
        name: String,

        /// Arguments as JSON (an object, or a single value)
        args: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "reagent", "run", "--config", "team.json", "--task", "hi", "--json",
        ]);
        match cli.command {
            Commands::Run { config, task, json, script, .. } => {
                assert_eq!(config, PathBuf::from("team.json"));
                assert_eq!(task.as_deref(), Some("hi"));
                assert!(json);
                assert!(script.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_invoke() {
        let cli = Cli::parse_from(["reagent", "--log-format", "json", "invoke", "calculate", "\"1+1\""]);
        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert!(matches!(
            cli.command,
            Commands::Invoke { ref name, args: Some(ref a) } if name == "calculate" && a == "\"1+1\""
        ));
    }
}
