//! The pipeline steps, each reading and writing under one [`Stowage`].

use std::{path::PathBuf, time::Duration};

use tqdm::Iter;
use tracing::{error, info, warn};

use crate::batch::{cumulative_centralization, fold_slices, RecordSlices, SliceSource, StoredSlices};
use crate::common::{
    read_rows, write_rows, Stowage, CENTRALIZATION, COMBINED_COUNTS, COUNTRY_SUMMARY,
    INTERNATIONAL, SUBFIELD_PERCENTAGES,
};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::graph_io::save_graph;
use crate::mappings::{country_name, short_subfield_name, TOP_COUNTRIES};
use crate::openalex::{country_filter, subfield_filter, OpenAlex, WorkCounts};
use crate::records::{load_records, load_rows};
use crate::tables::{
    concat_csv, international_summary, rank_countries, subfield_percentages, SubfieldCount,
};

/// Where the centralization stage takes its year slices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SliceOrigin {
    /// Graph files written by `build-networks`.
    Stored,
    /// Graphs built in memory from the publication meta table.
    Records,
}

/// Contact address if one is configured; requests go out without it
/// otherwise.
fn optional_mailto(settings: &Settings) -> Option<String> {
    match settings.mailto() {
        Ok(mailto) => Some(mailto),
        Err(err) => {
            warn!(%err, "sending requests without a contact address");
            None
        }
    }
}

pub fn country_summary(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let client = OpenAlex::new(
        &settings.api_base,
        optional_mailto(settings),
        Duration::from_millis(settings.summary_delay_ms),
    )?;
    let span = settings.summary_years;
    let mut counts = Vec::with_capacity(TOP_COUNTRIES.len());
    for (code, name) in TOP_COUNTRIES.iter().tqdm().desc(Some("countries")) {
        info!("getting publication summary for {}", name);
        let filter = country_filter(settings.field_id, span.start, span.end, code);
        let c = client.work_counts(&filter).unwrap_or_else(|err| {
            error!(country = code, %err, "count request failed");
            WorkCounts::default()
        });
        counts.push((code.to_string(), name.to_string(), c));
        client.pause();
    }
    let out = stowage.processed.join(COUNTRY_SUMMARY);
    write_rows(&out, &rank_countries(counts))?;
    info!(path = %out.display(), "wrote country summary");
    Ok(())
}

pub fn subfield_counts(stowage: &Stowage, settings: &Settings, country_code: &str) -> Result<()> {
    let mailto = settings.mailto()?;
    info!("read contact address for the polite pool");
    let catalog = settings.catalog()?;
    if let Some(e) = catalog.entries().iter().find(|e| e.subfield_id.is_none()) {
        return Err(Error::Catalog(format!(
            "{} has no subfield_id",
            e.subfield_display_name
        )));
    }
    let client = OpenAlex::new(
        &settings.api_base,
        Some(mailto),
        Duration::from_millis(settings.request_delay_ms),
    )?;
    info!(
        "counting subfield publications for {}",
        country_name(country_code).unwrap_or(country_code)
    );

    let mut rows = Vec::new();
    for year in settings.years.years().into_iter().rev() {
        for entry in catalog.entries().iter().tqdm().desc(Some(year.to_string())) {
            let subfield_id = entry.subfield_id.as_deref().unwrap_or_default();
            let filter = subfield_filter(country_code, settings.field_id, subfield_id, year);
            match client.work_counts(&filter) {
                Ok(c) => {
                    info!(
                        "year {}, {} ({}): count = {}, citation_count = {}",
                        year, subfield_id, entry.subfield_display_name, c.count, c.cited_by_count_sum
                    );
                    rows.push(SubfieldCount {
                        publication_year: year,
                        subfield_id: subfield_id.to_string(),
                        subfield_display_name: entry.subfield_display_name.clone(),
                        count: c.count,
                        citation_count: c.cited_by_count_sum,
                        country_code: country_code.to_string(),
                    });
                    client.pause();
                }
                Err(err) => error!(year, subfield_id, %err, "count request failed"),
            }
        }
    }
    let out = stowage.country_counts(country_code);
    write_rows(&out, &rows)?;
    info!(path = %out.display(), rows = rows.len(), "saved publication counts");
    Ok(())
}

pub fn concat_counts(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let inputs: Vec<PathBuf> = settings
        .countries
        .iter()
        .map(|c| stowage.country_counts(c))
        .collect();
    let out = stowage.raw_counts.join(COMBINED_COUNTS);
    let n = concat_csv(&inputs, &out)?;
    info!(path = %out.display(), rows = n, "combined dataset saved");
    Ok(())
}

pub fn write_subfield_percentages(stowage: &Stowage) -> Result<()> {
    let counts: Vec<SubfieldCount> = read_rows(&stowage.raw_counts.join(COMBINED_COUNTS))?;
    let out = stowage.processed.join(SUBFIELD_PERCENTAGES);
    write_rows(&out, &subfield_percentages(&counts))?;
    info!(path = %out.display(), "wrote subfield percentages");
    Ok(())
}

pub fn concat_meta(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let inputs: Vec<PathBuf> = settings
        .years
        .years()
        .into_iter()
        .rev()
        .map(|y| stowage.yearly_meta(y))
        .collect();
    let out = stowage.publication_meta(&settings.home_country);
    let n = concat_csv(&inputs, &out)?;
    info!(path = %out.display(), rows = n, "combined dataset saved");
    Ok(())
}

/// Writes one graph per (subfield, year). A graph that cannot be written is
/// logged and the loop moves on.
pub fn build_networks(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let catalog = settings.catalog()?;
    let years = settings.years.years();
    let loaded = load_records(&stowage.publication_meta(&settings.home_country))?;
    let mut slices = RecordSlices::new(&loaded.records);

    let mut failed = 0;
    for subfield in catalog.names().iter().tqdm().desc(Some("networks")) {
        for &year in &years {
            let graph = slices.slice(subfield, year)?;
            let stem = stowage.year_graph(subfield, year);
            match save_graph(&stem, &graph) {
                Ok(()) => info!(
                    path = %stem.display(),
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    "graph written"
                ),
                Err(err) => {
                    failed += 1;
                    error!(%err, "graph not written");
                }
            }
        }
    }
    if failed > 0 {
        error!(failed, "some graphs were not written");
    }
    Ok(())
}

pub fn combine_networks(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let catalog = settings.catalog()?;
    let years = settings.years.years();
    let mut slices = StoredSlices::new(stowage);
    for subfield in catalog.names() {
        info!(
            "processing subfield {}",
            short_subfield_name(&subfield).unwrap_or(subfield.as_str())
        );
        let full = fold_slices(&mut slices, &subfield, &years, settings.merge_policy);
        let stem = stowage.full_graph(&subfield);
        match save_graph(&stem, &full) {
            Ok(()) => info!(path = %stem.display(), nodes = full.node_count(), "created full graph"),
            Err(err) => error!(%err, "full graph not written"),
        }
    }
    Ok(())
}

pub fn write_international(stowage: &Stowage, settings: &Settings) -> Result<()> {
    let rows = load_rows(&stowage.publication_meta(&settings.home_country))?;
    info!(rows = rows.len(), "read publications");
    let summary = international_summary(&rows, &settings.home_country);
    let out = stowage.processed.join(INTERNATIONAL);
    write_rows(&out, &summary)?;
    info!(path = %out.display(), "summary saved");
    Ok(())
}

/// Cumulative centralization table; with `write_full` the final cumulative
/// graph of every subfield is stored as its full graph too.
pub fn centralization(
    stowage: &Stowage,
    settings: &Settings,
    origin: SliceOrigin,
    write_full: bool,
) -> Result<()> {
    let subfields = settings.catalog()?.names();
    let years = settings.years.years();
    let on_run = |run: &crate::batch::SubfieldRun| {
        if !write_full {
            return;
        }
        if let Err(err) = save_graph(&stowage.full_graph(&run.subfield), &run.cumulative) {
            error!(%err, "full graph not written");
        }
    };

    let table = match origin {
        SliceOrigin::Stored => {
            let mut slices = StoredSlices::new(stowage);
            cumulative_centralization(&mut slices, &subfields, &years, settings.merge_policy, on_run)
        }
        SliceOrigin::Records => {
            let loaded = load_records(&stowage.publication_meta(&settings.home_country))?;
            let mut slices = RecordSlices::new(&loaded.records);
            cumulative_centralization(&mut slices, &subfields, &years, settings.merge_policy, on_run)
        }
    };
    let out = stowage.processed.join(CENTRALIZATION);
    table.write_csv(&out)?;
    info!(path = %out.display(), "centralization table saved");
    Ok(())
}
