//! Cumulative centralization over subfields and years.

use std::path::Path;

use hashbrown::HashMap;
use tqdm::Iter;
use tracing::{debug, error, warn};

use crate::centralization::betweenness_centralization;
use crate::common::{get_writer, Stowage};
use crate::error::{Error, Result};
use crate::graph_io::load_graph;
use crate::merge::MergePolicy;
use crate::network::{build_network, Graph};
use crate::records::PublicationRecord;

pub const AVERAGE: &str = "Average";

/// Where the single-year graph of a (subfield, year) slice comes from.
pub trait SliceSource {
    fn slice(&mut self, subfield: &str, year: i32) -> Result<Graph>;
}

/// Slices previously written by the network build stage.
pub struct StoredSlices<'a> {
    stowage: &'a Stowage,
}

/// Slices built on demand from parsed records.
pub struct RecordSlices<'a> {
    records: &'a [PublicationRecord],
    by_slice: HashMap<(String, i32), Vec<usize>>,
}

pub struct SubfieldRun {
    pub subfield: String,
    pub scores: Vec<Option<f64>>,
    pub cumulative: Graph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CentralizationTable {
    years: Vec<i32>,
    rows: Vec<(String, Vec<Option<f64>>)>,
}

impl<'a> StoredSlices<'a> {
    pub fn new(stowage: &'a Stowage) -> Self {
        Self { stowage }
    }
}

impl SliceSource for StoredSlices<'_> {
    fn slice(&mut self, subfield: &str, year: i32) -> Result<Graph> {
        load_graph(&self.stowage.year_graph(subfield, year))
    }
}

impl<'a> RecordSlices<'a> {
    pub fn new(records: &'a [PublicationRecord]) -> Self {
        let mut by_slice: HashMap<(String, i32), Vec<usize>> = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            by_slice
                .entry((r.subfield.clone(), r.publication_year))
                .or_default()
                .push(i);
        }
        Self { records, by_slice }
    }
}

impl SliceSource for RecordSlices<'_> {
    fn slice(&mut self, subfield: &str, year: i32) -> Result<Graph> {
        let ids = self
            .by_slice
            .get(&(subfield.to_string(), year))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(build_network(ids.iter().map(|&i| &self.records[i])))
    }
}

/// Merges one slice into `cumulative`. A slice that cannot be read is
/// logged and leaves `cumulative` unchanged.
pub fn merge_slice<S>(
    source: &mut S,
    subfield: &str,
    year: i32,
    cumulative: &mut Graph,
    policy: MergePolicy,
) -> bool
where
    S: SliceSource + ?Sized,
{
    match source.slice(subfield, year) {
        Ok(graph) => {
            cumulative.merge(&graph, policy);
            debug!(subfield, year, nodes = cumulative.node_count(), "merged slice");
            true
        }
        Err(err) => {
            if err.is_recoverable() {
                warn!(subfield, year, %err, "no slice merged");
            } else {
                error!(subfield, year, %err, "no slice merged");
            }
            false
        }
    }
}

/// Union of all year slices of one subfield.
pub fn fold_slices<S>(source: &mut S, subfield: &str, years: &[i32], policy: MergePolicy) -> Graph
where
    S: SliceSource + ?Sized,
{
    let mut full = Graph::new();
    for &year in years {
        merge_slice(source, subfield, year, &mut full, policy);
    }
    full
}

/// Merges the year slices of one subfield in order, scoring the running
/// graph after every year. A year with an empty running graph scores `None`.
pub fn run_subfield<S>(source: &mut S, subfield: &str, years: &[i32], policy: MergePolicy) -> SubfieldRun
where
    S: SliceSource + ?Sized,
{
    let mut cumulative = Graph::new();
    let mut scores = Vec::with_capacity(years.len());
    for &year in years {
        merge_slice(source, subfield, year, &mut cumulative, policy);
        let score = if cumulative.is_empty() {
            None
        } else {
            Some(betweenness_centralization(&cumulative))
        };
        scores.push(score);
    }
    SubfieldRun {
        subfield: subfield.to_string(),
        scores,
        cumulative,
    }
}

/// Runs every subfield over the ascending `years`, handing each finished
/// run to `on_run` before its cumulative graph is dropped.
pub fn cumulative_centralization<S, F>(
    source: &mut S,
    subfields: &[String],
    years: &[i32],
    policy: MergePolicy,
    mut on_run: F,
) -> CentralizationTable
where
    S: SliceSource + ?Sized,
    F: FnMut(&SubfieldRun),
{
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();

    let mut table = CentralizationTable::new(&years);
    for subfield in subfields.iter().tqdm().desc(Some("subfields")) {
        let run = run_subfield(source, subfield, &years, policy);
        on_run(&run);
        table.push_row(&run.subfield, run.scores);
    }
    table
}

impl CentralizationTable {
    pub fn new(years: &[i32]) -> Self {
        Self {
            years: years.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, subfield: &str, scores: Vec<Option<f64>>) {
        self.rows.push((subfield.to_string(), scores));
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn subfields(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(s, _)| s.as_str())
    }

    pub fn get(&self, subfield: &str, year: i32) -> Option<f64> {
        let col = self.years.iter().position(|&y| y == year)?;
        let (_, scores) = self.rows.iter().find(|(s, _)| s == subfield)?;
        scores.get(col).copied().flatten()
    }

    /// Mean of the recorded cells of a row, skipping missing ones.
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self, subfield: &str) -> Option<f64> {
        let (_, scores) = self.rows.iter().find(|(s, _)| s == subfield)?;
        let present: Vec<f64> = scores.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }

    /// Subfields as rows, years as columns and a trailing `Average`.
    /// Missing cells are left empty.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = get_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(self.years.iter().map(|y| y.to_string()));
        header.push(AVERAGE.to_string());
        writer.write_record(&header)?;

        for (subfield, scores) in &self.rows {
            let mut record = vec![subfield.clone()];
            record.extend(scores.iter().map(|s| fmt_cell(*s)));
            record.push(fmt_cell(self.average(subfield)));
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }
}

/// Shortest round-trip text, keeping `.0` on whole numbers.
fn fmt_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:?}", v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_skips_missing_cells() {
        let mut t = CentralizationTable::new(&[2015, 2016, 2017]);
        t.push_row("Software", vec![None, Some(0.5), Some(1.0)]);
        t.push_row("HCI", vec![None, None, None]);
        assert_eq!(t.average("Software"), Some(0.75));
        assert_eq!(t.average("HCI"), None);
        assert_eq!(t.get("Software", 2016), Some(0.5));
        assert_eq!(t.get("Software", 2015), None);
        assert_eq!(t.get("Software", 1999), None);
    }

    #[test]
    fn whole_scores_keep_their_decimal_point() {
        assert_eq!(fmt_cell(Some(0.0)), "0.0");
        assert_eq!(fmt_cell(Some(1.0)), "1.0");
        assert_eq!(fmt_cell(Some(0.21652892561983472)), "0.21652892561983472");
        assert_eq!(fmt_cell(None), "");
    }
}
