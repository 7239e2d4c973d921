//! 文本格式 LTS 解析 (`.states` / `.labels` / `.arcs` / `.locations` 分节).
//!
//! ```text
//! .name "example"
//! .type LTS
//! .states
//! s0[initial] s1
//! .labels
//! a
//! .arcs
//! s0 a s1   // comment
//! ```
use std::fs;
use std::path::Path;

use nom::branch::alt;
use nom::bytes::complete::{take_till, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, opt};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};

use crate::net::io::IoError;
use crate::ts::system::{TransitionSystem, TsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    States,
    Labels,
    Arcs,
    Locations,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '\'' | '#' | '.')).parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

/// `.keyword` optionally followed by a value.
fn header(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    (
        preceded(char('.'), identifier),
        opt(preceded(space1, alt((quoted, identifier)))),
    )
        .parse(input)
}

/// `s0` or `s0[initial]`.
fn state_decl(input: &str) -> IResult<&str, (&str, Option<Vec<&str>>)> {
    (
        identifier,
        opt(delimited(
            char('['),
            separated_list1((space0, char(','), space0), identifier),
            char(']'),
        )),
    )
        .parse(input)
}

fn arc(input: &str) -> IResult<&str, (&str, &str, &str)> {
    (identifier, preceded(space1, identifier), preceded(space1, identifier)).parse(input)
}

fn pair(input: &str) -> IResult<&str, (&str, &str)> {
    (identifier, preceded(space1, identifier)).parse(input)
}

fn parse_line<'a, O>(
    line_no: usize,
    line: &'a str,
    parser: impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
) -> Result<O, TsError> {
    all_consuming(parser)
        .parse(line)
        .map(|(_, output)| output)
        .map_err(|err| TsError::Parse {
            line: line_no,
            message: err.to_string(),
        })
}

pub fn parse_ts(input: &str) -> Result<TransitionSystem, TsError> {
    let mut ts = TransitionSystem::new();
    let mut labels: Vec<String> = Vec::new();
    let mut section = Section::Preamble;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            let (keyword, value) = parse_line(line_no, line, header)?;
            section = match keyword {
                "name" => {
                    if let Some(name) = value {
                        ts.set_name(name);
                    }
                    Section::Preamble
                }
                "type" => {
                    if value != Some("LTS") {
                        return Err(TsError::Parse {
                            line: line_no,
                            message: format!("unsupported type {:?}", value.unwrap_or("")),
                        });
                    }
                    Section::Preamble
                }
                "description" => Section::Preamble,
                "states" => Section::States,
                "labels" => Section::Labels,
                "arcs" => Section::Arcs,
                "locations" => Section::Locations,
                other => {
                    return Err(TsError::Parse {
                        line: line_no,
                        message: format!("unknown section .{other}"),
                    });
                }
            };
            continue;
        }

        match section {
            Section::Preamble => {
                return Err(TsError::Parse {
                    line: line_no,
                    message: "content outside of a section".to_string(),
                });
            }
            Section::States => {
                let decls = parse_line(line_no, line, separated_list1(space1, state_decl))?;
                for (name, options) in decls {
                    let id = ts.add_state(name)?;
                    let options = options.unwrap_or_default();
                    if let Some(unknown) = options.iter().find(|opt| **opt != "initial") {
                        return Err(TsError::Parse {
                            line: line_no,
                            message: format!("unknown state option `{unknown}`"),
                        });
                    }
                    if options.contains(&"initial") {
                        ts.set_initial(id);
                    }
                }
            }
            Section::Labels => {
                let names = parse_line(line_no, line, separated_list1(space1, identifier))?;
                labels.extend(names.into_iter().map(str::to_string));
            }
            Section::Arcs => {
                let (from, label, to) = parse_line(line_no, line, arc)?;
                if !labels.is_empty() && !labels.iter().any(|l| l == label) {
                    return Err(TsError::UnknownLabel(label.to_string()));
                }
                let from = ts
                    .state_by_name(from)
                    .ok_or_else(|| TsError::UnknownState(from.to_string()))?;
                let to = ts
                    .state_by_name(to)
                    .ok_or_else(|| TsError::UnknownState(to.to_string()))?;
                ts.add_arc(from, to, label);
            }
            Section::Locations => {
                let (event, location) = parse_line(line_no, line, pair)?;
                ts.set_location(event, location);
            }
        }
    }

    Ok(ts)
}

/// Reads a transition system, picking the format from the file extension
/// (`.json`, `.ron`, anything else is the text format).
pub fn read_ts<P: AsRef<Path>>(path: P) -> Result<TransitionSystem, TsError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(IoError::from)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => crate::net::io::from_json_str::<crate::ts::TsSpec>(&content)?.try_into(),
        Some("ron") => crate::net::io::from_ron_str::<crate::ts::TsSpec>(&content)?.try_into(),
        _ => parse_ts(&content),
    }
}
