use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use windrive_core::cache::Prefetch;
use windrive_core::geometry::{Detection, PartitionStyle};
use windrive_core::{
    DeviceGeometry, DevicePerformance, DiskCacheInformation, DiskInfoProvider, DriveInspector,
    DriveReport, InspectorConfig, LogicalDrive, QueryOutcome,
};
use windrive_platform::PlatformBackend;

#[derive(Parser)]
#[command(name = "windrive")]
#[command(about = "Windows drive, DOS device and disk metadata inspector", long_about = None)]
struct Cli {
    /// Print results as pretty JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log every OS call to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to <config dir>/windrive/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of OS queries in flight
    #[arg(long, global = true)]
    max_concurrent: Option<usize>,

    /// Per-query timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List logical drives with type and cluster usage
    Drives,
    /// List DOS device names and their targets
    DosDevices {
        /// Only show names containing this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show I/O counters for a drive (e.g. C: or PhysicalDrive0)
    Performance { drive: String },
    /// Show geometry, partition style and BIOS detection data for a drive
    Geometry { drive: String },
    /// Show the disk cache configuration for a drive
    Cache { drive: String },
    /// Query every logical drive
    Survey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = InspectorConfig::load(cli.config.as_deref())?;
    if let Some(max) = cli.max_concurrent {
        config.max_concurrent_queries = max;
    }
    if let Some(timeout) = cli.timeout_ms {
        config.query_timeout_ms = Some(timeout);
    }
    config.validate()?;
    tracing::debug!(?config, "effective configuration");

    let inspector = DriveInspector::with_config(PlatformBackend::new(), &config);

    match cli.command {
        Commands::Drives => {
            let drives = inspector.logical_drives().await?;
            if cli.json {
                return print_json(&drives);
            }
            if drives.is_empty() {
                println!("No logical drives found.");
            }
            for drive in &drives {
                print_drive(drive);
            }
        }
        Commands::DosDevices { filter } => {
            let mut devices = inspector.dos_devices().await?;
            if let Some(filter) = filter {
                let needle = filter.to_lowercase();
                devices.retain(|name, _| name.to_lowercase().contains(&needle));
            }
            if cli.json {
                return print_json(&devices);
            }
            let width = devices.keys().map(|name| name.len()).max().unwrap_or(0);
            for (name, target) in &devices {
                println!("{:width$}  {}", name, target, width = width);
            }
        }
        Commands::Performance { drive } => {
            let perf = inspector.device_performance(&drive).await?;
            if cli.json {
                return print_json(&perf);
            }
            print_performance(&drive, &perf);
        }
        Commands::Geometry { drive } => {
            let geometry = inspector.device_geometry(&drive).await?;
            if cli.json {
                return print_json(&geometry);
            }
            print_geometry(&drive, &geometry);
        }
        Commands::Cache { drive } => {
            let cache = inspector.disk_cache_information(&drive).await?;
            if cli.json {
                return print_json(&cache);
            }
            print_cache(&drive, &cache);
        }
        Commands::Survey => {
            let reports = inspector.survey().await?;
            if cli.json {
                return print_json(&reports);
            }
            for report in &reports {
                print_report(report);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / 1_073_741_824.0
}

fn print_drive(drive: &LogicalDrive) {
    println!("Drive: {}", drive.name);
    println!("  Type: {}", drive.drive_type().as_str());
    if let Some(stats) = drive.clusters() {
        println!(
            "  Clusters: {} free of {} ({} bytes each)",
            stats.free_clusters,
            stats.total_clusters,
            stats.cluster_size()
        );
        println!(
            "  Size: {:.2} GB, {:.2} GB free ({:.1}% used)",
            gib(stats.total_bytes()),
            gib(stats.free_bytes()),
            stats.used_cluster_percent
        );
    }
    println!();
}

fn print_performance(drive: &str, perf: &DevicePerformance) {
    println!("Performance: {} ({})", drive, perf.storage_manager_name);
    println!("  Device number: {}", perf.storage_device_number);
    println!("  Read:  {} bytes in {} requests", perf.bytes_read, perf.read_count);
    println!("  Write: {} bytes in {} requests", perf.bytes_written, perf.write_count);
    println!("  Queue depth: {}, split I/Os: {}", perf.queue_depth, perf.split_count);
    println!(
        "  Time (100ns): read {}, write {}, idle {}",
        perf.read_time, perf.write_time, perf.idle_time
    );
    println!("  Captured at: {}", perf.captured_at.to_rfc3339());
}

fn print_geometry(drive: &str, geometry: &DeviceGeometry) {
    println!("Geometry: {}", drive);
    println!("  Size: {} bytes ({:.2} GB)", geometry.disk_size, gib(geometry.disk_size));
    println!("  Media type: {}", geometry.media_type.raw());
    println!(
        "  C/H/S: {}/{}/{}, {} bytes per sector",
        geometry.cylinders,
        geometry.tracks_per_cylinder,
        geometry.sectors_per_track,
        geometry.bytes_per_sector
    );

    if let Some(partition) = &geometry.partition {
        match &partition.style {
            PartitionStyle::Mbr { signature, checksum } => {
                println!("  Partition style: MBR (signature {:08X}, checksum {:08X})", signature, checksum)
            }
            PartitionStyle::Gpt { disk_id } => println!("  Partition style: GPT (disk {})", disk_id),
            PartitionStyle::Raw => println!("  Partition style: RAW"),
        }
    }

    if let Some(detection) = &geometry.detection {
        match &detection.detection {
            Detection::None => println!("  BIOS detection: none"),
            Detection::Int13(int13) => println!(
                "  BIOS detection: INT 13 drive {:#04X}, {} cylinders, {} heads",
                int13.drive_select, int13.max_cylinders, int13.max_heads
            ),
            Detection::ExInt13 { int13, ex } => println!(
                "  BIOS detection: extended INT 13 drive {:#04X}, {} sectors of {} bytes",
                int13.drive_select, ex.ex_sectors_per_drive, ex.ex_sector_size
            ),
        }
    }
}

fn print_cache(drive: &str, cache: &DiskCacheInformation) {
    let on_off = |flag: bool| if flag { "enabled" } else { "disabled" };

    println!("Cache: {}", drive);
    println!("  Read cache: {} ({:?})", on_off(cache.read_cache_enabled), cache.read_retention_priority);
    println!("  Write cache: {} ({:?})", on_off(cache.write_cache_enabled), cache.write_retention_priority);
    println!("  Parameters savable: {}", if cache.parameters_savable { "Yes" } else { "No" });
    println!("  Prefetch disabled above: {} blocks", cache.disable_prefetch_transfer_length);
    match &cache.prefetch {
        Prefetch::ScalarPrefetch {
            minimum,
            maximum,
            maximum_blocks,
        } => println!(
            "  Prefetch (scalar): min {}, max {}, max blocks {}",
            minimum, maximum, maximum_blocks
        ),
        Prefetch::BlockPrefetch { minimum, maximum } => {
            println!("  Prefetch (blocks): min {}, max {}", minimum, maximum)
        }
    }
}

fn print_report(report: &DriveReport) {
    print_drive(&report.drive);
    let name = report.drive.name.as_str();

    match &report.performance {
        QueryOutcome::Ok(perf) => print_performance(name, perf),
        QueryOutcome::Error { message, .. } => println!("Performance: {}", message),
    }
    match &report.geometry {
        QueryOutcome::Ok(geometry) => print_geometry(name, geometry),
        QueryOutcome::Error { message, .. } => println!("Geometry: {}", message),
    }
    match &report.cache {
        QueryOutcome::Ok(cache) => print_cache(name, cache),
        QueryOutcome::Error { message, .. } => println!("Cache: {}", message),
    }
    println!();
}
