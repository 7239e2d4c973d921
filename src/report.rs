//! 综合结果报告：可序列化的结果摘要与单词综合的失败位置标注。
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::net::Net;
use crate::synthesis::SynthesizePN;
use crate::ts::{StateId, Word, WordSystem};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFailure {
    pub event: String,
    pub state: String,
}

/// Outcome of one synthesis run, with states referred to by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub success: bool,
    pub properties: String,
    pub regions: Vec<String>,
    pub failed_state_separation: Vec<Vec<String>>,
    pub failed_event_separation: Vec<EventFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_points: Option<String>,
    pub net: Net,
}

impl SynthesisReport {
    pub fn new(synth: &SynthesizePN, state_name: impl Fn(StateId) -> String) -> Self {
        Self {
            success: synth.was_successfully_separated(),
            properties: synth.properties().to_string(),
            regions: synth
                .separating_regions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            failed_state_separation: synth
                .failed_state_separation_problems()
                .iter()
                .map(|group| group.iter().map(|state| state_name(*state)).collect())
                .collect(),
            failed_event_separation: synth
                .failed_event_state_separation_problems()
                .iter()
                .map(|(event, state)| EventFailure {
                    event: event.clone(),
                    state: state_name(*state),
                })
                .collect(),
            failure_points: None,
            net: synth.petri_net(),
        }
    }

    pub fn with_failure_points(mut self, points: Option<String>) -> Self {
        self.failure_points = points;
        self
    }
}

/// Plain text summary. Each region line is one place of the net.
impl fmt::Display for SynthesisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "success: {}", self.success)?;
        writeln!(f, "properties: {}", self.properties)?;
        writeln!(f, "regions: {}", self.regions.len())?;
        for (idx, region) in self.regions.iter().enumerate() {
            writeln!(f, "  p{idx} = {region}")?;
        }
        for group in &self.failed_state_separation {
            writeln!(f, "cannot separate states {{{}}}", group.join(", "))?;
        }
        for failure in &self.failed_event_separation {
            writeln!(
                f,
                "cannot prevent `{}` in state {}",
                failure.event, failure.state
            )?;
        }
        if let Some(points) = &self.failure_points {
            writeln!(f, "failure points: {points}")?;
        }
        Ok(())
    }
}

/// Marks, for a synthesized word, which events could not be disabled at
/// which position, e.g. `"[a] a, b"` when `a` is not prevented before the
/// first letter. `None` when the run succeeded.
///
/// States of a word are always separable unless the net is k-bounded. Pairs
/// of positions that stay unseparated are appended, as in
/// `"a, a [a]; unseparated {0, 1} {0, 2} {1, 2}"`.
pub fn separation_failure_points(words: &WordSystem, synth: &SynthesizePN) -> Option<String> {
    if synth.was_successfully_separated() {
        return None;
    }
    debug_assert!(
        synth.properties().k_bounded_bound().is_some()
            || synth.failed_state_separation_problems().is_empty(),
        "word states are separable without a token bound"
    );

    let word = words.word();
    let utility = synth.utility();
    let mut groups: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); word.len() + 1];
    for (event, state) in synth.failed_event_state_separation_problems() {
        let position = words.position(*state);
        let index = utility.event_index(event);
        if let (Some(position), Some(index)) = (position, index) {
            groups[position].insert(index);
        }
    }

    let labels: Vec<Vec<&str>> = groups
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|&index| utility.event_label(index))
                .collect()
        })
        .collect();
    let mut out = render_failure_points(word, &labels);

    let mut pairs: Vec<Vec<usize>> = synth
        .failed_state_separation_problems()
        .iter()
        .map(|group| group.iter().filter_map(|&state| words.position(state)).collect())
        .collect();
    pairs.sort();
    if !pairs.is_empty() {
        let rendered: Vec<String> = pairs
            .iter()
            .map(|pair| format!("{{{}}}", pair.iter().join(", ")))
            .collect();
        out.push_str("; unseparated ");
        out.push_str(&rendered.join(" "));
    }
    Some(out)
}

fn render_failure_points(word: &Word, groups: &[Vec<&str>]) -> String {
    fn push_group(out: &mut String, group: Option<&Vec<&str>>) {
        let Some(group) = group.filter(|group| !group.is_empty()) else {
            return;
        };
        if !out.is_empty() {
            out.push(' ');
        }
        out.push('[');
        out.push_str(&group.join(","));
        out.push(']');
    }

    let mut out = String::new();
    for (position, label) in word.iter().enumerate() {
        if position != 0 {
            out.push(',');
        }
        push_group(&mut out, groups.get(position));
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(label);
    }
    push_group(&mut out, groups.get(word.len()));
    out
}
