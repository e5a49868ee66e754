mod error;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use env_logger::{Builder, Target};
use log::LevelFilter;
use serde::Serialize;

use dem_raster::open_raster;
use pcd_exporter::writer::las::LasPointWriter;
use pcd_parser::reader::{las::LasPointReader, PointReader};
use pcd_transformer::{
    run, CancellationToken, ElevationNormalizerBuilder, MissingGroundPolicy, NormalizeOptions,
    NormalizeStats,
};

use crate::error::{error_chain, AppError};

#[derive(Parser, Debug)]
#[command(
    name = "lasnorm",
    about = "Replaces LiDAR point elevations with their height above a DEM",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    /// DEM raster (.tif, .tiff or .asc)
    #[arg(value_name = "DEM")]
    dem_path: Option<PathBuf>,

    /// Input point cloud (.las or .laz)
    #[arg(value_name = "INPUT")]
    input_path: Option<PathBuf>,

    /// Output point cloud, LAZ compressed when it ends with .laz
    #[arg(value_name = "OUTPUT")]
    output_path: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE")]
    dem: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print progress and statistics to stdout
    #[arg(short, long)]
    verbose: bool,

    /// DEM band holding the ground elevation, starting at 1
    #[arg(long, default_value_t = 1)]
    band: usize,

    /// Policy for points outside the DEM: skip, pass-through or fail
    #[arg(long, default_value_t = MissingGroundPolicy::Skip)]
    out_of_bounds: MissingGroundPolicy,

    /// Policy for points above nodata cells: skip, pass-through or fail
    #[arg(long, default_value_t = MissingGroundPolicy::Skip)]
    nodata: MissingGroundPolicy,

    /// Log progress every N points, 0 disables it
    #[arg(long, default_value_t = 1_000_000)]
    progress_interval: u64,

    /// Write run statistics as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Debug)]
struct RunPaths {
    dem: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, PartialEq)]
enum PathsError {
    Missing,
    Unused(PathBuf),
}

impl PathsError {
    fn exit(&self) -> ! {
        let (kind, message) = match self {
            PathsError::Missing => (
                ErrorKind::MissingRequiredArgument,
                "DEM, input and output paths are all required".to_string(),
            ),
            PathsError::Unused(path) => (
                ErrorKind::UnknownArgument,
                format!("unexpected argument {:?}, its path is already given as a flag", path),
            ),
        };
        Cli::command().error(kind, message).exit()
    }
}

impl Cli {
    /// Flagged paths win; positionals fill the remaining ones in order.
    /// A positional left over once all three paths are set is an error.
    fn paths(&self) -> Result<RunPaths, PathsError> {
        let mut positionals = [&self.dem_path, &self.input_path, &self.output_path]
            .into_iter()
            .flatten()
            .cloned();
        let mut pick = |flag: &Option<PathBuf>| {
            flag.clone()
                .or_else(|| positionals.next())
                .ok_or(PathsError::Missing)
        };
        let paths = RunPaths {
            dem: pick(&self.dem)?,
            input: pick(&self.input)?,
            output: pick(&self.output)?,
        };
        match positionals.next() {
            Some(unused) => Err(PathsError::Unused(unused)),
            None => Ok(paths),
        }
    }

    fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            band: self.band,
            out_of_bounds: self.out_of_bounds,
            nodata: self.nodata,
            progress_interval: self.progress_interval,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    dem: &'a Path,
    input: &'a Path,
    output: &'a Path,
    options: NormalizeOptions,
    stats: &'a NormalizeStats,
}

fn init_logger(verbose: bool) {
    let (level, target) = if verbose {
        (LevelFilter::Info, Target::Stdout)
    } else {
        (LevelFilter::Warn, Target::Stderr)
    };
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(target)
        .filter(None, level)
        .parse_default_env()
        .init();
}

fn check_exists(path: &Path, what: &str) -> Result<(), AppError> {
    if !path.is_file() {
        return Err(AppError::Config(format!("cannot find {} {:?}", what, path)));
    }
    Ok(())
}

fn write_report(path: &Path, report: &Report) -> Result<(), AppError> {
    let file = File::create(path).map_err(|source| AppError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|source| AppError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Counts every point read, written or not.
fn total_summary(stats: &NormalizeStats) -> String {
    format!(
        "total time: {:.3} sec {} bytes for {} points",
        stats.elapsed_seconds, stats.bytes_written, stats.points_read
    )
}

fn normalize(paths: &RunPaths, options: NormalizeOptions) -> Result<NormalizeStats, AppError> {
    check_exists(&paths.dem, "DEM")?;
    check_exists(&paths.input, "input")?;

    log::info!("opening DEM {:?}", paths.dem);
    let raster = open_raster(&paths.dem)?;
    let mut normalizer = ElevationNormalizerBuilder::new(raster)
        .options(options)
        .build()?;

    let mut reader = LasPointReader::open(&paths.input)?;
    log::info!(
        "reading {} points from {:?} and writing them modified to {:?}",
        reader.metadata().point_count,
        paths.input,
        paths.output
    );
    let mut writer = LasPointWriter::create(&paths.output, reader.header())?;

    let cancel = CancellationToken::new();
    let stats = run(&mut reader, &mut normalizer, &mut writer, &cancel)?;

    log::info!("{}", total_summary(&stats));
    log::info!(
        "wrote {} points, skipped {}, passed through {}",
        stats.points_written,
        stats.points_skipped,
        stats.points_passed_through
    );
    if let (Some(min), Some(max)) = (stats.min_height, stats.max_height) {
        log::info!("height above ground ranges from {} to {}", min, max);
    }
    Ok(stats)
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_logger(args.verbose);

    let paths = match args.paths() {
        Ok(paths) => paths,
        Err(error) => error.exit(),
    };
    let options = args.options();

    let result = normalize(&paths, options).and_then(|stats| match &args.report {
        Some(report_path) => write_report(
            report_path,
            &Report {
                dem: &paths.dem,
                input: &paths.input,
                output: &paths.output,
                options,
                stats: &stats,
            },
        ),
        None => Ok(()),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::debug!("{:?}", error);
            eprintln!("ERROR: {}", error_chain(&error));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_paths() {
        let cli = Cli::try_parse_from(["lasnorm", "dem.tif", "in.las", "out.laz"]).unwrap();
        let paths = cli.paths().unwrap();
        assert_eq!(paths.dem, PathBuf::from("dem.tif"));
        assert_eq!(paths.input, PathBuf::from("in.las"));
        assert_eq!(paths.output, PathBuf::from("out.laz"));
        assert_eq!(cli.options(), NormalizeOptions::default());
    }

    #[test]
    fn flagged_paths_and_options() {
        let cli = Cli::try_parse_from([
            "lasnorm",
            "-d",
            "dem.asc",
            "-i",
            "in.laz",
            "-o",
            "out.las",
            "-v",
            "--band",
            "2",
            "--out-of-bounds",
            "pass-through",
            "--nodata",
            "fail",
            "--progress-interval",
            "0",
        ])
        .unwrap();
        assert!(cli.verbose);
        let paths = cli.paths().unwrap();
        assert_eq!(paths.dem, PathBuf::from("dem.asc"));
        assert_eq!(paths.output, PathBuf::from("out.las"));

        let options = cli.options();
        assert_eq!(options.band, 2);
        assert_eq!(options.out_of_bounds, MissingGroundPolicy::PassThrough);
        assert_eq!(options.nodata, MissingGroundPolicy::Fail);
        assert_eq!(options.progress_interval, 0);
    }

    #[test]
    fn positionals_fill_paths_not_given_as_flags() {
        let cli = Cli::try_parse_from(["lasnorm", "-d", "dem.tif", "in.las", "out.las"]).unwrap();
        let paths = cli.paths().unwrap();
        assert_eq!(paths.dem, PathBuf::from("dem.tif"));
        assert_eq!(paths.input, PathBuf::from("in.las"));
        assert_eq!(paths.output, PathBuf::from("out.las"));
    }

    #[test]
    fn missing_output_is_detected() {
        let cli = Cli::try_parse_from(["lasnorm", "-d", "dem.tif", "-i", "in.las"]).unwrap();
        assert_eq!(cli.paths().unwrap_err(), PathsError::Missing);
    }

    #[test]
    fn leftover_positional_is_rejected() {
        let cli = Cli::try_parse_from([
            "lasnorm", "-d", "dem.tif", "-i", "in.las", "-o", "out.las", "stray.las",
        ])
        .unwrap();
        assert_eq!(
            cli.paths().unwrap_err(),
            PathsError::Unused(PathBuf::from("stray.las"))
        );

        let cli = Cli::try_parse_from(["lasnorm", "-o", "out.las", "dem.tif", "in.las", "x"])
            .unwrap();
        assert_eq!(
            cli.paths().unwrap_err(),
            PathsError::Unused(PathBuf::from("x"))
        );
    }

    #[test]
    fn summary_counts_points_read() {
        let stats = NormalizeStats {
            points_read: 10,
            points_written: 7,
            points_skipped: 3,
            bytes_written: 500,
            elapsed_seconds: 1.5,
            ..Default::default()
        };
        assert_eq!(
            total_summary(&stats),
            "total time: 1.500 sec 500 bytes for 10 points"
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["lasnorm", "--nodata", "ignore"]).is_err());
    }

    #[test]
    fn nonexistent_input_is_a_config_error() {
        let paths = RunPaths {
            dem: PathBuf::from("/nonexistent/dem.tif"),
            input: PathBuf::from("/nonexistent/in.las"),
            output: PathBuf::from("/nonexistent/out.las"),
        };
        assert!(matches!(
            normalize(&paths, NormalizeOptions::default()),
            Err(AppError::Config(_))
        ));
    }
}
