//! mdstatd - Software-RAID metrics collector daemon.
//!
//! Periodically reads /proc/mdstat and publishes md device gauges, either on
//! stdout or as a file that is atomically replaced on every pass (suitable
//! for a textfile collector).

use std::error::Error;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mdstat_collector::collector::FileSystem;
#[cfg(target_os = "linux")]
use mdstat_collector::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use mdstat_collector::collector::mock::MockFs;
use mdstat_collector::collector::{CollectError, MdadmCollector};
use mdstat_collector::config::{DEFAULT_NAMESPACE, MdstatConfig};
use mdstat_collector::metrics::{Sample, render_text};

/// Mode of the published output file.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Output encoding of a collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Prometheus text exposition format.
    Text,
    /// JSON array of samples.
    Json,
}

/// Software-RAID metrics collector daemon.
#[derive(Parser)]
#[command(name = "mdstatd", about = "Software-RAID metrics collector daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "15", env = "MDSTATD_INTERVAL")]
    interval: u64,

    /// Path to /proc filesystem (for testing or containers).
    #[arg(long, default_value = "/proc", env = "MDSTATD_PROC_PATH")]
    proc_path: String,

    /// Explicit path of the status report. Overrides --proc-path.
    #[arg(long, value_name = "PATH", env = "MDSTATD_MDSTAT_PATH")]
    mdstat_path: Option<PathBuf>,

    /// Metric namespace prefix (empty for none).
    #[arg(long, default_value = DEFAULT_NAMESPACE, env = "MDSTATD_NAMESPACE")]
    namespace: String,

    /// Run a single collection pass and exit.
    #[arg(long)]
    once: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Write each pass to this file instead of stdout.
    #[arg(short, long, value_name = "PATH", env = "MDSTATD_OUTPUT")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn collector_config(&self) -> MdstatConfig {
        let config = MdstatConfig::default()
            .with_proc_root(&self.proc_path)
            .with_namespace(self.namespace.clone());
        match &self.mdstat_path {
            Some(path) => config.with_path(path.clone()),
            None => config,
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["mdstatd", "mdstat_collector"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    // Logs go to stderr, stdout carries the metrics.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one collection pass and returns the samples and device count.
fn collect<F: FileSystem>(
    fs: &F,
    config: &MdstatConfig,
) -> Result<(Vec<Sample>, usize), CollectError> {
    let mut samples: Vec<Sample> = Vec::new();
    let devices = MdadmCollector::new().update(fs, config, &mut samples)?;
    Ok((samples, devices))
}

fn encode(samples: &[Sample], format: Format) -> Result<String, Box<dyn Error>> {
    match format {
        Format::Text => Ok(render_text(samples)?),
        Format::Json => Ok(serde_json::to_string_pretty(samples)? + "\n"),
    }
}

/// Replaces `path` with `content` so readers never observe a partial file.
///
/// The file is published world-readable (0644) for textfile scrapers running
/// under another user.
fn write_atomically(path: &Path, content: &str) -> Result<(), Box<dyn Error>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))?;
    tmp.persist(path)?;
    Ok(())
}

fn publish(output: Option<&Path>, content: &str) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) => write_atomically(path, content),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Collects and publishes once. Returns false if the pass failed.
fn run_pass<F: FileSystem>(fs: &F, args: &Args, config: &MdstatConfig, pass: u64) -> bool {
    let (samples, devices) = match collect(fs, config) {
        Ok(collected) => collected,
        Err(e) => {
            error!("Collector {} failed: {}", MdadmCollector::NAME, e);
            return false;
        }
    };
    debug!("Pass #{}: {} md devices", pass, devices);

    let content = match encode(&samples, args.format) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to encode metrics as {:?}: {}", args.format, e);
            return false;
        }
    };

    match publish(args.output.as_deref(), &content) {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to publish metrics: {}", e);
            false
        }
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = args.collector_config();

    info!("mdstatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, source={}, namespace={:?}, format={:?}",
        args.interval,
        config.path.display(),
        config.namespace,
        args.format
    );
    match &args.output {
        Some(path) => info!("Publishing to {}", path.display()),
        None => debug!("Publishing to stdout"),
    }

    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = {
        warn!("Not running on Linux, no md devices will be reported");
        MockFs::new()
    };

    if args.once {
        let ok = run_pass(&fs, &args, &config, 1);
        std::process::exit(if ok { 0 } else { 1 });
    }

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut pass: u64 = 0;
    let mut failures: u64 = 0;
    while running.load(Ordering::SeqCst) {
        pass += 1;
        if !run_pass(&fs, &args, &config, pass) {
            failures += 1;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!(
        "Shutdown complete after {} passes ({} failed)",
        pass, failures
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdstat_collector::collector::MockFs;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["mdstatd"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn collector_config_from_args() {
        let config = args(&["--proc-path", "/host/proc", "--namespace", "host"]).collector_config();
        assert_eq!(config.path, PathBuf::from("/host/proc/mdstat"));
        assert_eq!(config.namespace, "host");

        let config = args(&["--proc-path", "/host/proc", "--mdstat-path", "/tmp/mdstat"])
            .collector_config();
        assert_eq!(config.path, PathBuf::from("/tmp/mdstat"));
    }

    #[test]
    fn collect_renders_text() {
        let fs = MockFs::healthy_mirror();
        let (samples, devices) = collect(&fs, &MdstatConfig::default()).unwrap();
        let text = encode(&samples, Format::Text).unwrap();

        assert_eq!(devices, 1);
        assert!(text.contains("# TYPE node_md_blocks_synced gauge\n"));
        assert!(text.contains("node_md_disks{device=\"md0\"} 2\n"));
    }

    #[test]
    fn collect_renders_json() {
        let fs = MockFs::recovering_mirror();
        let (samples, _) = collect(&fs, &MdstatConfig::default()).unwrap();
        let json = encode(&samples, Format::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let samples = parsed.as_array().unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[4]["name"], "node_md_blocks_synced");
        assert_eq!(samples[4]["value"], 878780416.0);
    }

    #[test]
    fn collect_without_mdstat_is_empty() {
        let fs = MockFs::without_mdstat();
        let (samples, devices) = collect(&fs, &MdstatConfig::default()).unwrap();
        assert_eq!(devices, 0);
        let text = encode(&samples, Format::Text).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md.prom");

        write_atomically(&path, "first\n").unwrap();
        write_atomically(&path, "second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");
        // Only the target remains, no temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomically_publishes_world_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md.prom");

        write_atomically(&path, "node_md_disks{device=\"md0\"} 2\n").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn failed_pass_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md.prom");
        std::fs::write(&path, "previous\n").unwrap();

        let mut fs = MockFs::new();
        fs.add_file("/proc/mdstat", "md0 :\n");
        let args = args(&["--output", path.to_str().unwrap()]);

        assert!(!run_pass(&fs, &args, &args.collector_config(), 1));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous\n");
    }

    #[test]
    fn failed_encode_fails_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md.prom");
        std::fs::write(&path, "previous\n").unwrap();

        // Parses fine, but the namespace is not a valid metric name prefix
        let fs = MockFs::healthy_mirror();
        let args = args(&["--namespace", "bad-namespace", "--output", path.to_str().unwrap()]);

        assert!(!run_pass(&fs, &args, &args.collector_config(), 1));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous\n");
    }

    #[test]
    fn encode_rejects_invalid_metric_names() {
        let fs = MockFs::healthy_mirror();
        let config = MdstatConfig::default().with_namespace("bad-namespace");
        let (samples, _) = collect(&fs, &config).unwrap();

        assert!(encode(&samples, Format::Text).is_err());
        assert!(encode(&samples, Format::Json).is_ok());
    }
}
