use clap::{Args, Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tweetstats::pipeline::median_words_per_line;
use tweetstats::{LineSource, MedianStrategy, Pipeline, StatsConfig, StatsError, WordCleaner, build_median};

const WORD_COUNT_FILE: &str = "ft1.txt";
const MEDIAN_FILE: &str = "ft2.txt";

#[derive(Parser)]
#[command(name = "tweetstats")]
#[command(about = "Word frequencies and running median of unique words per message", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count words and write the running median of unique words per message
    Stats(CommonArgs),
    /// Only write the word frequency table
    Count(CommonArgs),
    /// Running median of cleaned words per line, computed sequentially
    Median(CommonArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Input file or directory, may be repeated
    #[arg(short = 'i', long = "input")]
    input: Vec<PathBuf>,
    /// More inputs; stdin is read when there are none
    paths: Vec<PathBuf>,
    /// Output directory for ft1.txt and ft2.txt (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Stop words file; implies --clean
    #[arg(short = 's', long = "stop-words")]
    stop_words: Option<PathBuf>,
    /// Use the unconstrained two-heap median instead of the histogram
    #[arg(short, long)]
    unconstrained: bool,
    /// Lowercase words and drop punctuation and numbers before counting
    #[arg(long)]
    clean: bool,
    #[arg(long)]
    workers: Option<usize>,
    /// JSON configuration file; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl CommonArgs {
    fn stats_config(&self) -> Result<StatsConfig, StatsError> {
        let mut config = match &self.config {
            Some(path) => StatsConfig::from_json_file(path)?,
            None => StatsConfig::default(),
        };
        if self.unconstrained {
            config.median = MedianStrategy::TwoHeap;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.stop_words.is_some() {
            config.stop_words = self.stop_words.clone();
        }
        config.clean |= self.clean;
        config.validate()?;
        Ok(config)
    }

    fn line_source(&self) -> Result<LineSource, StatsError> {
        let inputs: Vec<&PathBuf> = self.input.iter().chain(&self.paths).collect();
        LineSource::from_inputs(&inputs)
    }

    /// A buffered writer for `name` inside the output directory, or stdout.
    fn sink(&self, name: &str) -> Result<Box<dyn Write + Send>, StatsError> {
        let Some(dir) = output_dir(self.output.as_deref()) else {
            return Ok(Box::new(io::stdout()));
        };
        let path = dir.join(name);
        let file = File::create(&path)?;
        info!(path = %path.display(), "[tweetstats] writing");
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// The output directory, created if needed. Falls back to stdout when it
/// can't be used.
fn output_dir(output: Option<&Path>) -> Option<&Path> {
    let dir = output?;
    if let Err(e) = fs::create_dir_all(dir) {
        error!(dir = %dir.display(), error = %e, "[tweetstats] output directory unusable, writing to stdout");
        return None;
    }
    Some(dir)
}

fn run_stats(args: &CommonArgs) -> Result<(), StatsError> {
    let pipeline = Pipeline::new(args.stats_config()?)?;
    let lines = args.line_source()?;
    let words = args.sink(WORD_COUNT_FILE)?;
    let medians = args.sink(MEDIAN_FILE)?;
    let (summary, _) = pipeline.run(lines, words, medians)?;
    info!(
        messages = summary.messages,
        distinct_words = summary.distinct_words,
        total_words = summary.total_words,
        "[tweetstats] stats complete"
    );
    summary.drain.into_result()?;
    Ok(())
}

fn run_count(args: &CommonArgs) -> Result<(), StatsError> {
    let pipeline = Pipeline::new(args.stats_config()?)?;
    let lines = args.line_source()?;
    let summary = pipeline.count_words(lines, args.sink(WORD_COUNT_FILE)?)?;
    info!(
        messages = summary.messages,
        distinct_words = summary.distinct_words,
        "[tweetstats] count complete"
    );
    summary.drain.into_result()?;
    Ok(())
}

fn run_median(args: &CommonArgs) -> Result<(), StatsError> {
    let config = args.stats_config()?;
    let cleaner = match &config.stop_words {
        Some(path) => WordCleaner::from_stop_words_file(path)?,
        None => WordCleaner::new(),
    };
    let median = build_median::<usize>(&config.median)?;
    let lines = args.line_source()?;
    let written = median_words_per_line(lines, &cleaner, median, args.sink(MEDIAN_FILE)?)?;
    info!(lines = written, "[tweetstats] median complete");
    Ok(())
}

fn main() -> Result<(), StatsError> {
    tweetstats::init_tracing("tweetstats");
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Stats(args) => run_stats(args),
        Commands::Count(args) => run_count(args),
        Commands::Median(args) => run_median(args),
    };
    if let Err(e) = &result {
        error!(error = %e, "[tweetstats] failed");
    }
    result
}
