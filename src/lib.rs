//gen
pub mod common;
pub mod config;
pub mod error;
pub mod logging;
//pipeline
pub mod batch;
pub mod centralization;
pub mod graph_io;
pub mod mappings;
pub mod merge;
pub mod network;
pub mod openalex;
pub mod records;
pub mod stages;
pub mod tables;

use clap::Subcommand;
use tracing::info;

pub use batch::{cumulative_centralization, CentralizationTable, RecordSlices, SliceSource, StoredSlices};
pub use centralization::{betweenness_centrality, betweenness_centralization};
pub use common::Stowage;
pub use config::Settings;
pub use error::{Error, Result};
pub use merge::{merge, MergePolicy};
pub use network::{build_network, Graph};
pub use records::{load_records, PublicationRecord};
use stages::SliceOrigin;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rank the top publishing countries of the field.
    CountrySummary,
    /// Count publications per subfield and year for one country.
    SubfieldCounts {
        #[arg(long)]
        country: String,
    },
    /// Stack the per-country count tables.
    ConcatCounts,
    /// Share of each subfield in its country-year total.
    SubfieldPercentages,
    /// Stack the yearly publication meta exports.
    ConcatMeta,
    /// Write one co-authorship graph per subfield and year.
    BuildNetworks,
    /// Merge the yearly graphs of each subfield into one.
    CombineNetworks,
    /// Domestic vs international publication shares per subfield.
    International,
    /// Cumulative betweenness centralization per subfield and year.
    Centralization {
        #[arg(long, value_enum, default_value_t = SliceOrigin::Stored)]
        from: SliceOrigin,
        /// Also store each final cumulative graph as the subfield's full graph.
        #[arg(long)]
        write_full: bool,
    },
}

pub fn runner(command: &Command, stowage: &Stowage, settings: &Settings) -> Result<()> {
    info!(?command, root = %settings.data_root.display(), "starting");
    match command {
        Command::CountrySummary => stages::country_summary(stowage, settings),
        Command::SubfieldCounts { country } => stages::subfield_counts(stowage, settings, country),
        Command::ConcatCounts => stages::concat_counts(stowage, settings),
        Command::SubfieldPercentages => stages::write_subfield_percentages(stowage),
        Command::ConcatMeta => stages::concat_meta(stowage, settings),
        Command::BuildNetworks => stages::build_networks(stowage, settings),
        Command::CombineNetworks => stages::combine_networks(stowage, settings),
        Command::International => stages::write_international(stowage, settings),
        Command::Centralization { from, write_full } => {
            stages::centralization(stowage, settings, *from, *write_full)
        }
    }
}
