use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use RustPNS::analysis::{is_isomorphic, reachability_lts};
use RustPNS::config::{OutputFormat, SynthConfig};
use RustPNS::net::io::{to_json_string, to_ron_string};
use RustPNS::options::{Input, Options};
use RustPNS::report::{SynthesisReport, separation_failure_points};
use RustPNS::synthesis::{SynthesisOptions, SynthesizePN};
use RustPNS::ts::{TransitionSystem, Word, WordSystem, read_ts};

fn main() -> Result<ExitCode> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => match err.downcast::<clap::Error>() {
            Ok(clap_err) => clap_err.exit(),
            Err(err) => return Err(err),
        },
    };
    debug!("PN options: {:?}", options);

    let mut config = SynthConfig::load_from_file(&options.config)?;
    options.apply(&mut config);
    let properties = config.properties()?;

    let (words, ts) = match &options.input {
        Input::Word(labels) => {
            let Ok(word) = labels.join(" ").parse::<Word>();
            let words = WordSystem::new(&word);
            let ts = words.ts().clone();
            (Some(words), ts)
        }
        Input::TransitionSystem(path) => {
            let ts = read_ts(path)
                .with_context(|| format!("Failed to read transition system: {:?}", path))?;
            (None, ts)
        }
    };
    info!(
        "input: {} states, {} arcs, {} events",
        ts.state_count(),
        ts.arc_count(),
        ts.alphabet().len()
    );

    let synth = SynthesizePN::with_options(
        &ts,
        properties,
        SynthesisOptions {
            mode: config.execution_mode(),
            ..SynthesisOptions::default()
        },
    )?;

    let points = words
        .as_ref()
        .and_then(|words| separation_failure_points(words, &synth));
    let report = SynthesisReport::new(&synth, |state| ts.state_name(state).to_string())
        .with_failure_points(points);

    let rendered = match config.format {
        OutputFormat::Text => format!("{report}{}", report.net),
        OutputFormat::Dot => report.net.to_dot(),
        OutputFormat::Json => to_json_string(&report)?,
        OutputFormat::Ron => to_ron_string(&report)?,
    };
    match &options.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write result: {:?}", path))?;
            info!("result written to {:?}", path);
        }
        None => print!("{rendered}"),
    }

    if config.verify
        && synth.was_successfully_separated()
        && !verify(&ts, &report, config.state_limit)
    {
        return Ok(ExitCode::from(2));
    }

    Ok(if synth.was_successfully_separated() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn verify(ts: &TransitionSystem, report: &SynthesisReport, state_limit: usize) -> bool {
    let (reachable, truncated) = reachability_lts(&report.net, Some(state_limit));
    if truncated {
        warn!("reachability graph exceeds {state_limit} states");
        return false;
    }
    let same = is_isomorphic(ts, &reachable);
    if same {
        info!("reachability graph is isomorphic to the input");
    } else {
        warn!(
            "reachability graph ({} states) differs from the input",
            reachable.state_count()
        );
    }
    same
}
