//! Tabular reshaping of count and publication tables.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use csv::StringRecord;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::{get_reader, get_writer};
use crate::error::{Error, Result};
use crate::openalex::WorkCounts;
use crate::records::PublicationRow;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CountrySummary {
    pub rank: usize,
    pub country_code: String,
    pub country: String,
    pub total_publications: u64,
    pub citation_count: u64,
    pub ratio: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SubfieldCount {
    pub publication_year: i32,
    pub subfield_id: String,
    pub subfield_display_name: String,
    pub count: u64,
    pub citation_count: u64,
    pub country_code: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubfieldShare {
    pub publication_year: i32,
    pub subfield_id: String,
    pub subfield_display_name: String,
    pub count: u64,
    pub citation_count: u64,
    pub country_code: String,
    pub total: u64,
    pub percentage: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InternationalSummary {
    pub subfield_display: String,
    pub domestic_publications: u64,
    pub international_publications: u64,
    pub total_publications: u64,
    pub domestic_percentage: f64,
    pub international_percentage: f64,
}

/// Orders countries by publication total (ties keep input order) and ranks
/// them from 1.
pub fn rank_countries(counts: Vec<(String, String, WorkCounts)>) -> Vec<CountrySummary> {
    let mut rows: Vec<CountrySummary> = counts
        .into_iter()
        .map(|(country_code, country, c)| CountrySummary {
            rank: 0,
            country_code,
            country,
            total_publications: c.count,
            citation_count: c.cited_by_count_sum,
            ratio: citation_ratio(c),
        })
        .collect();
    rows.sort_by(|a, b| b.total_publications.cmp(&a.total_publications));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

/// Citations per publication, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn citation_ratio(c: WorkCounts) -> f64 {
    if c.count == 0 {
        return 0.0;
    }
    (c.cited_by_count_sum as f64 / c.count as f64 * 100.0).round() / 100.0
}

/// Adds each row's share of its (country, year) total.
#[allow(clippy::cast_precision_loss)]
pub fn subfield_percentages(rows: &[SubfieldCount]) -> Vec<SubfieldShare> {
    let mut totals: HashMap<(&str, i32), u64> = HashMap::new();
    for r in rows {
        *totals
            .entry((r.country_code.as_str(), r.publication_year))
            .or_default() += r.count;
    }
    rows.iter()
        .map(|r| {
            let total = totals[&(r.country_code.as_str(), r.publication_year)];
            SubfieldShare {
                publication_year: r.publication_year,
                subfield_id: r.subfield_id.clone(),
                subfield_display_name: r.subfield_display_name.clone(),
                count: r.count,
                citation_count: r.citation_count,
                country_code: r.country_code.clone(),
                total,
                percentage: (total > 0).then(|| r.count as f64 / total as f64 * 100.0),
            }
        })
        .collect()
}

/// A publication is domestic when every affiliation country of every author
/// is `home`. Unreadable author lists count as international.
pub fn is_domestic(row: &PublicationRow, home: &str) -> bool {
    match row.parse_authorships() {
        Ok(authorships) => authorships
            .iter()
            .all(|a| a.countries.iter().all(|c| c == home)),
        Err(_) => false,
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn international_summary(rows: &[PublicationRow], home: &str) -> Vec<InternationalSummary> {
    let mut groups: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let Some(subfield) = row.subfield_name() else {
            continue;
        };
        let entry = groups.entry(subfield).or_default();
        if is_domestic(row, home) {
            entry.0 += 1;
        }
        entry.1 += 1;
    }

    let mut out: Vec<InternationalSummary> = groups
        .into_iter()
        .map(|(subfield_display, (domestic, total))| {
            let international = total - domestic;
            InternationalSummary {
                subfield_display,
                domestic_publications: domestic,
                international_publications: international,
                total_publications: total,
                domestic_percentage: domestic as f64 / total as f64 * 100.0,
                international_percentage: international as f64 / total as f64 * 100.0,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        a.domestic_percentage
            .partial_cmp(&b.domestic_percentage)
            .unwrap_or(Ordering::Equal)
            .then(
                a.international_percentage
                    .partial_cmp(&b.international_percentage)
                    .unwrap_or(Ordering::Equal),
            )
    });
    out
}

/// Stacks CSV files row-wise under the union of their columns (first-seen
/// order); cells a file lacks are left empty. Missing inputs are skipped.
/// Returns the number of data rows written.
pub fn concat_csv(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    let mut columns: Vec<String> = Vec::new();
    let mut tables: Vec<(Vec<usize>, Vec<StringRecord>)> = Vec::new();

    for path in inputs {
        let mut reader = match get_reader(path) {
            Ok(r) => r,
            Err(err @ Error::MissingInput(_)) => {
                warn!(%err, "skipping input");
                continue;
            }
            Err(err) => return Err(err),
        };
        let mut positions = Vec::new();
        for name in reader.headers()?.iter() {
            let pos = match columns.iter().position(|c| c == name) {
                Some(p) => p,
                None => {
                    columns.push(name.to_string());
                    columns.len() - 1
                }
            };
            positions.push(pos);
        }
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        info!(path = %path.display(), rows = records.len(), "read table");
        tables.push((positions, records));
    }

    if tables.is_empty() {
        let first = inputs.first().cloned().unwrap_or_default();
        return Err(Error::MissingInput(first));
    }

    let mut writer = get_writer(output)?;
    writer.write_record(&columns)?;
    let mut written = 0;
    for (positions, records) in &tables {
        for record in records {
            let mut row = vec![""; columns.len()];
            for (value, &pos) in record.iter().zip(positions) {
                row[pos] = value;
            }
            writer.write_record(&row)?;
            written += 1;
        }
    }
    writer.flush().map_err(|e| Error::io(output, e))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(count: u64, cited: u64) -> WorkCounts {
        WorkCounts {
            count,
            cited_by_count_sum: cited,
        }
    }

    #[test]
    fn countries_rank_by_total() {
        let ranked = rank_countries(vec![
            ("BR".into(), "Brazil".into(), counts(10, 25)),
            ("CN".into(), "China".into(), counts(30, 10)),
            ("XX".into(), "Nowhere".into(), counts(0, 0)),
            ("IN".into(), "India".into(), counts(10, 3)),
        ]);
        let codes: Vec<_> = ranked.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(codes, ["CN", "BR", "IN", "XX"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].ratio, 2.5);
        assert_eq!(ranked[0].ratio, 0.33);
        assert_eq!(ranked[3].ratio, 0.0);
    }

    #[test]
    fn domestic_needs_every_country_at_home() {
        let row = |auths: &str| PublicationRow {
            authorships: Some(auths.to_string()),
            ..Default::default()
        };
        assert!(is_domestic(&row(r#"[{"id": "A", "countries": ["BR"]}, {"id": "B", "countries": []}]"#), "BR"));
        assert!(!is_domestic(&row(r#"[{"id": "A", "countries": ["BR", "PT"]}]"#), "BR"));
        assert!(!is_domestic(&row("not json"), "BR"));
    }
}
