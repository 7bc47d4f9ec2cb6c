// src/main.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stride_phase::annotate::SkeletonAnnotator;
use stride_phase::compare::{detect_phases, extract_angles, ComparisonOrchestrator};
use stride_phase::config::AnalysisConfig;
use stride_phase::data::{write_angle_table, AnalysisSummary};
use stride_phase::phase::Phase;
use stride_phase::pose_bridge::LandmarkFileBackend;
use stride_phase::storage::VideoLibrary;
use stride_phase::tracking::LandmarkFrameSource;
use stride_phase::video::{sample_frames, FfmpegDecoder};

#[derive(Parser)]
#[command(name = "stride_analyzer", about = "Find landing and push-off frames in running videos")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect stride phases in one video and export its knee-angle table
    Analyze {
        video: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render key frames of a user video next to an ideal video
    Compare {
        user: PathBuf,
        ideal: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save every Nth frame for manual inspection
    Sample {
        video: PathBuf,
        #[arg(long)]
        every: Option<usize>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Manage stored videos
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Write the default configuration to a file
    InitConfig { path: PathBuf },
}

#[derive(Subcommand)]
enum LibraryAction {
    List,
    Save {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    Delete { name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let decoder = FfmpegDecoder::new(&config.ffmpeg_path, &config.ffprobe_path);
    let poses = LandmarkFileBackend::new(&config.landmarks_extension);

    match cli.command {
        Command::Analyze { video, out } => {
            let out = out.unwrap_or_else(|| session_dir(&config, &video));
            analyze(&config, &decoder, &poses, &video, &out)
        }
        Command::Compare { user, ideal, out } => {
            let out = out.unwrap_or_else(|| config.output_dir.join(session_name("comparison")));
            let annotator = SkeletonAnnotator::default();
            let orchestrator = ComparisonOrchestrator::new(&decoder, &poses, &annotator, &config);
            let report = orchestrator
                .compare(&user, &ideal, &out)
                .context("Comparison failed")?;

            for (label, outcome) in report.videos() {
                match outcome {
                    Ok(video) => {
                        println!("[{}] {}", label, video.video.display());
                        for renders in &video.renders {
                            match &renders.outcome {
                                Ok(frames) => {
                                    for frame in frames {
                                        println!("  {} frame {}: {}", renders.phase, frame.frame_index, frame.path.display());
                                    }
                                }
                                Err(e) => println!("  {}", e),
                            }
                        }
                    }
                    Err(e) => println!("[{}] analysis failed: {}", label, e),
                }
            }
            Ok(())
        }
        Command::Sample { video, every, out } => {
            let every = every.unwrap_or(config.sample_every);
            let out = out.unwrap_or_else(|| session_dir(&config, &video).join("frames"));
            let saved = sample_frames(&decoder, &video, every, &out)?;
            println!("Saved {} frame images to {}", saved, out.display());
            Ok(())
        }
        Command::Library { action } => {
            let library = VideoLibrary::new(&config.videos_dir, &config.landmarks_extension);
            match action {
                LibraryAction::List => {
                    for entry in library.list()? {
                        println!(
                            "{:<40} {:>10} bytes  {}  {}",
                            entry.name,
                            entry.size_bytes,
                            entry.modified.format("%Y-%m-%d %H:%M"),
                            if entry.has_landmarks { "landmarks" } else { "no landmarks" }
                        );
                    }
                }
                LibraryAction::Save { file, name } => {
                    let saved = library.save(&file, name.as_deref())?;
                    println!("Saved {}", saved.display());
                }
                LibraryAction::Delete { name } => {
                    library.delete(&name)?;
                    println!("Deleted {}", name);
                }
            }
            Ok(())
        }
        Command::InitConfig { path } => {
            AnalysisConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn analyze(
    config: &AnalysisConfig,
    decoder: &FfmpegDecoder,
    poses: &LandmarkFileBackend,
    video: &Path,
    out: &Path,
) -> Result<()> {
    let source = LandmarkFrameSource::new(decoder, poses, config.tracked_side);

    let phases = detect_phases(&source, video, config.heel_y_limit)
        .with_context(|| format!("Phase detection failed for {}", video.display()))?;
    let samples = extract_angles(&source, video)
        .with_context(|| format!("Angle extraction failed for {}", video.display()))?;

    let table = out.join("angles.csv");
    write_angle_table(&table, &samples)?;
    let summary = out.join("summary.json");
    AnalysisSummary::new(video, config.tracked_side, &phases).save(&summary)?;

    for phase in Phase::ALL {
        match phases.require(phase, &video.display().to_string()) {
            Ok(frame) => println!("{}: frame {}", phase, frame),
            Err(e) => println!("{}", e),
        }
    }
    println!("Angle table: {}", table.display());
    println!("Summary: {}", summary.display());
    Ok(())
}

fn session_name(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

fn session_dir(config: &AnalysisConfig, video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    config.output_dir.join(session_name(&stem))
}
