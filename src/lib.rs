pub mod cleaner;
pub mod config;
pub mod error;
pub mod line_source;
pub mod pipeline;
pub mod resequencer;
pub mod running_median;
pub mod running_median_histogram;
pub mod running_median_transforming;
pub mod running_median_two_heap;
pub mod sequenced;
pub mod sorted_words;
pub mod splitter;
pub mod word_table;
pub mod worker_pool;

pub use cleaner::WordCleaner;
pub use config::{MedianStrategy, StatsConfig};
pub use error::*;
pub use line_source::{InputSource, LineSource};
pub use pipeline::{Pipeline, PipelineSummary};
pub use resequencer::{DrainOutcome, Resequencer, ResequencerReport};
pub use running_median::{BoxedMedian, MedianValue, RunningMedian, build_median};
pub use running_median_histogram::HistogramMedian;
pub use running_median_transforming::TransformingMedian;
pub use running_median_two_heap::TwoHeapMedian;
pub use sequenced::SequencedCount;
pub use worker_pool::MessageWorkerPool;

use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber. Logs go to stderr so they
/// never mix with output written to stdout. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_tracing(service: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service, "[tracing] subscriber installed");
    }
}
