//! Parsing Options.
//! `pn-synth word <LABELS>...` or `pn-synth ts <FILE>`, plus synthesis flags.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::{OutputFormat, SynthConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Word(Vec<String>),
    TransitionSystem(PathBuf),
}

fn make_options_parser() -> clap::Command {
    Command::new("pn-synth")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Synthesizes Petri nets from transition systems and words")
        .subcommand_required(true)
        .subcommand(
            Command::new("word")
                .about("Synthesize a net from a word")
                .arg(
                    Arg::new("labels")
                        .value_name("LABELS")
                        .num_args(1..)
                        .required(true)
                        .help("Event labels, separated by blanks or commas"),
                ),
        )
        .subcommand(
            Command::new("ts")
                .about("Synthesize a net from a transition system file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .arg(
            Arg::new("properties")
                .short('p')
                .long("properties")
                .global(true)
                .help("Target properties, e.g. \"pure, safe\" or \"3-bounded\""),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Solve separation problems on a worker pool"),
        )
        .arg(
            Arg::new("threads")
                .short('j')
                .long("threads")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Worker threads for --parallel"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value("pn-synth.toml"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .global(true)
                .value_parser(["text", "dot", "json", "ron"]),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to file where the result will be stored"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Check the reachability graph of the result against the input"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub input: Input,
    pub config: PathBuf,
    pub properties: Option<String>,
    pub parallel: bool,
    pub threads: Option<usize>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub verify: bool,
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self> {
        let matches = make_options_parser().try_get_matches_from(flags.iter())?;
        let input = match matches.subcommand() {
            Some(("word", sub)) => Input::Word(
                sub.get_many::<String>("labels")
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect(),
            ),
            Some(("ts", sub)) => Input::TransitionSystem(
                sub.get_one::<PathBuf>("file")
                    .cloned()
                    .ok_or_else(|| anyhow!("missing transition system file"))?,
            ),
            _ => return Err(anyhow!("expected `word` or `ts`")),
        };

        let format = global::<String>(&matches, "format")
            .map(|format| format.parse())
            .transpose()?;

        Ok(Options {
            input,
            config: global::<PathBuf>(&matches, "config")
                .unwrap_or_else(|| PathBuf::from("pn-synth.toml")),
            properties: global(&matches, "properties"),
            parallel: flag(&matches, "parallel"),
            threads: global(&matches, "threads"),
            format,
            output: global(&matches, "output"),
            verify: flag(&matches, "verify"),
        })
    }

    /// Command line values take precedence over the configuration file.
    pub fn apply(&self, config: &mut SynthConfig) {
        if let Some(properties) = &self.properties {
            config.properties = properties.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
            config.parallel = true;
        }
        config.parallel |= self.parallel;
        config.verify |= self.verify;
        if let Some(format) = self.format {
            config.format = format;
        }
    }
}

/// Globals may be given before or after the subcommand.
fn global<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<T>(id).cloned())
        .or_else(|| matches.get_one::<T>(id).cloned())
}

fn flag(matches: &ArgMatches, id: &str) -> bool {
    global::<bool>(matches, id).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn test_parse_word() {
        let options = Options::parse_from_args(&args("word a b a -p pure --parallel -j 2")).unwrap();
        assert_eq!(
            options.input,
            Input::Word(vec!["a".into(), "b".into(), "a".into()])
        );
        assert_eq!(options.properties.as_deref(), Some("pure"));
        assert!(options.parallel);
        assert_eq!(options.threads, Some(2));
        assert!(!options.verify);
    }

    #[test]
    fn test_parse_ts_with_leading_flags() {
        let options =
            Options::parse_from_args(&args("--verify -f dot ts model.lts -o out.dot")).unwrap();
        assert_eq!(
            options.input,
            Input::TransitionSystem(PathBuf::from("model.lts"))
        );
        assert!(options.verify);
        assert_eq!(options.format, Some(OutputFormat::Dot));
        assert_eq!(options.output, Some(PathBuf::from("out.dot")));
    }

    #[test]
    fn test_parse_from_args_err() {
        assert!(Options::parse_from_args(&args("word")).is_err());
        assert!(Options::parse_from_args(&args("ts a.lts -f svg")).is_err());
        assert!(Options::parse_from_args(&args("net a.pnml")).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let options = Options::parse_from_args(&args("word a -p safe -j 3")).unwrap();
        let mut config = SynthConfig::default();
        options.apply(&mut config);
        assert_eq!(config.properties, "safe");
        assert!(config.parallel);
        assert_eq!(config.threads, 3);
        assert_eq!(config.format, OutputFormat::Text);
    }
}
