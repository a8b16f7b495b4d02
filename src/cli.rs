//! CLI interface for pixel-trend.
//!
//! Each subcommand is non-interactive: a point and a period in, JSON out.
//! JSON goes to `--out` when given, with a one-line summary on stderr, and
//! to stdout otherwise. Ctrl-C cancels the run in flight.

mod format;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use pixel_trend::catalog::FieldNames;
use pixel_trend::config::Config;
use pixel_trend::error::ProfileError;
use pixel_trend::index::{RadarIndex, SpectralIndex, TrendValue, trend};
use pixel_trend::model::{Location, TemporalProfilePoint, TrendQuery};
use pixel_trend::orchestrator::Orchestrator;
use pixel_trend::sampler::BatchSampler;
use pixel_trend::service::ImageServer;
use pixel_trend::source::{
    ImagerySource, Landsat, OrbitDirection, Sentinel1, Source, landsat, sentinel1,
};

use format::{describe_scenes, describe_spectral, describe_trend};

/// pixel-trend: sample satellite imagery at a point over time.
#[derive(Debug, Parser)]
#[command(name = "pixel-trend", version)]
pub struct Cli {
    /// Imagery source to sample.
    #[arg(long, value_enum, global = true, default_value_t = SourceArg::Landsat)]
    pub source: SourceArg,

    /// Config file (defaults to `$PIXEL_TREND_CONFIG`, then `~/.pixel-trend/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more to stderr. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a temporal profile: one clear sample per year or per month.
    Trend {
        #[command(flatten)]
        point: PointArgs,

        #[command(flatten)]
        period: PeriodArgs,

        /// Landsat mission number to leave out. Can be specified multiple times.
        #[arg(long = "exclude-mission")]
        exclude_missions: Vec<u8>,

        /// Only use Sentinel-1 passes in this direction.
        #[arg(long, value_enum)]
        orbit: Option<OrbitArg>,

        /// Reduce each point to this index and include the trend line.
        #[arg(long, value_enum)]
        index: Option<IndexArg>,

        /// Write the JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Read every band at a point in one scene.
    ///
    /// Without `--scene`, the service picks the scene.
    Spectral {
        #[command(flatten)]
        point: PointArgs,

        /// Object id of the scene to read.
        #[arg(long)]
        scene: Option<i64>,

        /// Write the JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the scenes a trend would choose from, without sampling.
    Scenes {
        #[command(flatten)]
        point: PointArgs,

        #[command(flatten)]
        period: PeriodArgs,

        /// Write the JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// A WGS84 point.
#[derive(Debug, Clone, Args)]
pub struct PointArgs {
    /// Longitude.
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    /// Latitude.
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,
}

impl PointArgs {
    fn to_domain(&self) -> Location {
        Location::new(self.x, self.y)
    }
}

/// Exactly one of `--month` (year-to-year) or `--year` (month-to-month).
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct PeriodArgs {
    /// Year-to-year trend for this calendar month (1-12).
    #[arg(long, value_parser = clap::value_parser!(i8).range(1..=12))]
    pub month: Option<i8>,

    /// Month-to-month trend within this year.
    #[arg(long)]
    pub year: Option<i16>,
}

impl PeriodArgs {
    fn to_domain(&self, location: Location) -> Result<TrendQuery, String> {
        match (self.month, self.year) {
            (Some(month), None) => Ok(TrendQuery::year_to_year(location, month)),
            (None, Some(year)) => Ok(TrendQuery::month_to_month(location, year)),
            _ => Err("specify exactly one of --month or --year".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Landsat Collection 2 Level-2.
    Landsat,
    /// Sentinel-1 RTC.
    Sentinel1,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrbitArg {
    Ascending,
    Descending,
}

impl OrbitArg {
    fn to_domain(self) -> OrbitDirection {
        match self {
            Self::Ascending => OrbitDirection::Ascending,
            Self::Descending => OrbitDirection::Descending,
        }
    }
}

/// CLI-facing index name; which indices exist depends on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexArg {
    /// Landsat NDVI.
    Vegetation,
    /// Landsat MNDWI, or the Sentinel-1 water index.
    Water,
    /// Landsat NDMI.
    Moisture,
    /// Sentinel-1 water anomaly index.
    WaterAnomaly,
}

impl IndexArg {
    fn to_spectral(self) -> Result<SpectralIndex, String> {
        match self {
            Self::Vegetation => Ok(SpectralIndex::Vegetation),
            Self::Water => Ok(SpectralIndex::Water),
            Self::Moisture => Ok(SpectralIndex::Moisture),
            Self::WaterAnomaly => Err("water-anomaly is a sentinel1 index".to_string()),
        }
    }

    fn to_radar(self) -> Result<RadarIndex, String> {
        match self {
            Self::Water => Ok(RadarIndex::Water),
            Self::WaterAnomaly => Ok(RadarIndex::WaterAnomaly),
            Self::Vegetation => Err("vegetation is a landsat index".to_string()),
            Self::Moisture => Err("moisture is a landsat index".to_string()),
        }
    }
}

/// How a command ended short of success.
#[derive(Debug)]
pub enum Exit {
    /// Interrupted before it finished; nothing was written.
    Cancelled,
    Failed(String),
}

impl From<String> for Exit {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<ProfileError> for Exit {
    fn from(e: ProfileError) -> Self {
        if e.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Failed(e.to_string())
        }
    }
}

/// JSON written by `trend`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendReport<'a> {
    source: &'static str,
    query: &'a TrendQuery,
    points: &'a [TemporalProfilePoint],

    #[serde(skip_serializing_if = "Option::is_none")]
    trend: Option<Vec<TrendValue>>,
}

/// Run the parsed command against the configured service.
pub async fn run(cli: Cli, config: &Config) -> Result<(), Exit> {
    match cli.source {
        SourceArg::Landsat => {
            if let Command::Trend { orbit: Some(_), .. } = cli.command {
                return Err(Exit::Failed("--orbit only applies to sentinel1".to_string()));
            }
            let source = build_landsat(config)?;
            let index = trend_index(&cli.command, IndexArg::to_spectral)?
                .map(|i| move |values: &[Option<f64>]| i.compute(values));
            execute(source, cli.command, index).await
        }
        SourceArg::Sentinel1 => {
            let orbit = match &cli.command {
                Command::Trend { orbit, .. } => orbit.map(OrbitArg::to_domain),
                _ => None,
            };
            let source = build_sentinel1(config, orbit)?;
            let index = trend_index(&cli.command, IndexArg::to_radar)?
                .map(|i| move |values: &[Option<f64>]| i.compute(values));
            execute(source, cli.command, index).await
        }
    }
}

/// The index a `trend` command asked for, resolved for one source.
fn trend_index<T>(
    command: &Command,
    resolve: impl Fn(IndexArg) -> Result<T, String>,
) -> Result<Option<T>, String> {
    match command {
        Command::Trend {
            index: Some(index), ..
        } => resolve(*index).map(Some),
        _ => Ok(None),
    }
}

fn image_server(
    config: &Config,
    url: &str,
    fields: FieldNames,
    default_mosaic_rule: serde_json::Value,
) -> Result<ImageServer, String> {
    let server = ImageServer::new(url, fields, default_mosaic_rule, config.request_timeout())
        .map_err(|e| format!("failed to create HTTP client: {e}"))?;

    Ok(server
        .with_page_size(config.sampling.page_size)
        .with_cloudy_threshold(config.sampling.cloudy_threshold))
}

/// Image servers are one endpoint for both catalog and sampler.
type ServerSource<K> = Source<K, ImageServer, ImageServer>;

fn build_landsat(config: &Config) -> Result<ServerSource<Landsat>, String> {
    let server = image_server(
        config,
        &config.landsat.service_url,
        landsat::FIELDS,
        landsat::default_mosaic_rule(),
    )?;

    let profile = Landsat::default()
        .with_cloud_cover_max(config.landsat.cloud_cover_max)
        .with_min_year_spacing(config.sampling.min_year_spacing);

    Ok(Source::new(
        profile,
        server.clone(),
        BatchSampler::new(server, config.sampling.batch_size),
    ))
}

fn build_sentinel1(
    config: &Config,
    orbit: Option<OrbitDirection>,
) -> Result<ServerSource<Sentinel1>, String> {
    let server = image_server(
        config,
        &config.sentinel1.service_url,
        sentinel1::FIELDS,
        sentinel1::default_mosaic_rule(),
    )?;

    Ok(Source::new(
        Sentinel1::default().with_orbit_direction(orbit),
        server.clone(),
        BatchSampler::new(server, config.sampling.batch_size),
    ))
}

async fn execute<S, F>(source: S, command: Command, index: Option<F>) -> Result<(), Exit>
where
    S: ImagerySource + 'static,
    F: Fn(&[Option<f64>]) -> Option<f64>,
{
    let orchestrator = Arc::new(Orchestrator::new(source));
    let interrupt = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel();
            }
        })
    };

    let outcome = dispatch(&orchestrator, command, index.as_ref()).await;
    interrupt.abort();
    outcome
}

async fn dispatch<S, F>(
    orchestrator: &Orchestrator<S>,
    command: Command,
    index: Option<&F>,
) -> Result<(), Exit>
where
    S: ImagerySource,
    F: Fn(&[Option<f64>]) -> Option<f64>,
{
    let source = orchestrator.source().name();

    match command {
        Command::Trend {
            point,
            period,
            exclude_missions,
            out,
            ..
        } => {
            let query = period
                .to_domain(point.to_domain())?
                .excluding(exclude_missions);
            let points = orchestrator.temporal_profile(&query).await?;

            let report = TrendReport {
                source,
                query: &query,
                points: &points,
                trend: index.map(|index| trend(&points, index)),
            };
            emit(&report, out, || describe_trend(source, &query, &points))
        }
        Command::Spectral { point, scene, out } => {
            let values = orchestrator
                .spectral_profile(point.to_domain(), scene)
                .await?;
            emit(&values, out, || describe_spectral(source, scene, &values))
        }
        Command::Scenes { point, period, out } => {
            let query = period.to_domain(point.to_domain())?;
            let scenes = orchestrator.scenes(&query).await?;
            emit(&scenes, out, || describe_scenes(source, &query, &scenes))
        }
    }
}

/// Write `value` as JSON to `out`, or to stdout.
fn emit<T: Serialize>(
    value: &T,
    out: Option<PathBuf>,
    summary: impl FnOnce() -> String,
) -> Result<(), Exit> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;

    match out {
        Some(path) => {
            fs::write(&path, &json)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!("{} → {}", summary(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
