//! Durable record sinks
//!
//! [`RunDirectory`] is the on-disk layout of a run:
//!
//! - `run.yaml`: copy of the manifest, for traceability
//! - `udp_packets.csv`: one row per parsed packet
//! - `collector.log`: `key=value` run log with parse diagnostics and totals
//! - `summary.yaml`: the serialized [`RunSummary`]
//!
//! Every write error is surfaced as [`GatewayError::Output`]. A dataset that
//! silently lost rows is worse than a failed run.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{RunConfig, RunManifest};
use crate::error::ParseError;
use crate::summary::RunSummary;
use crate::types::{Classification, Datagram, PacketRecord, SENTINEL};
use crate::{GatewayError, Result};

/// Column order of `udp_packets.csv`.
pub const CSV_COLUMNS: [&str; 15] = [
    "run_id",
    "scenario_id",
    "ts_gateway",
    "node_id",
    "boot_id",
    "seq",
    "msg_type",
    "payload_len",
    "iat",
    "seq_gap",
    "seq_reset_flag",
    "dup_seq_flag",
    "out_of_order_flag",
    "first_packet_flag",
    "boot_change_flag",
];

/// Default number of rows between CSV flush+fsync.
pub const DEFAULT_FLUSH_EVERY: usize = 50;

/// Destination for classified records and run bookkeeping.
pub trait RecordSink: Send {
    /// Persist one classified packet.
    fn write_record(&mut self, packet: &PacketRecord, classification: &Classification)
    -> Result<()>;

    /// Record a diagnostic for a rejected datagram.
    fn record_parse_error(&mut self, datagram: &Datagram, error: &ParseError) -> Result<()>;

    /// Flush everything durably and store the final summary.
    fn finish(&mut self, summary: &RunSummary) -> Result<()>;
}

/// One CSV row, in [`CSV_COLUMNS`] order.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    run_id: u32,
    scenario_id: &'a str,
    ts_gateway: String,
    node_id: &'a str,
    boot_id: u16,
    seq: u32,
    msg_type: &'a str,
    payload_len: usize,
    iat: String,
    seq_gap: i64,
    seq_reset_flag: u8,
    dup_seq_flag: u8,
    out_of_order_flag: u8,
    first_packet_flag: u8,
    boot_change_flag: u8,
}

impl<'a> CsvRow<'a> {
    fn new(
        run_id: u32,
        scenario_id: &'a str,
        packet: &'a PacketRecord,
        classification: &Classification,
    ) -> Self {
        let flags = classification.flags;
        Self {
            run_id,
            scenario_id,
            ts_gateway: format!("{:.6}", packet.arrival),
            node_id: &packet.node_id,
            boot_id: packet.session_id,
            seq: packet.seq,
            msg_type: &packet.msg_type,
            payload_len: packet.payload_len,
            iat: match classification.inter_arrival {
                Some(iat) => format!("{iat:.6}"),
                None => SENTINEL.to_string(),
            },
            seq_gap: classification.seq_delta_or_sentinel(),
            seq_reset_flag: flags.sequence_reset().into(),
            dup_seq_flag: flags.duplicate_sequence().into(),
            out_of_order_flag: flags.out_of_order().into(),
            first_packet_flag: flags.first_packet().into(),
            boot_change_flag: flags.session_change().into(),
        }
    }
}

/// Output directory of one collector run.
pub struct RunDirectory {
    dir: PathBuf,
    run_id: u32,
    scenario_id: String,
    csv: csv::Writer<File>,
    log: BufWriter<File>,
    flush_every: usize,
    rows_since_flush: usize,
}

impl RunDirectory {
    /// Create the run directory and open its files.
    ///
    /// Fails with [`GatewayError::OutputExists`] if the directory is already
    /// there, unless `force` is set, in which case it is removed first.
    pub fn create(config: &RunConfig, manifest: &RunManifest, force: bool) -> Result<Self> {
        let dir = config.output_dir();
        if dir.exists() {
            if !force {
                return Err(GatewayError::OutputExists { path: dir });
            }
            info!("Removing previous run output {}", dir.display());
            fs::remove_dir_all(&dir).map_err(|e| GatewayError::file_error(&dir, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| GatewayError::file_error(&dir, e))?;

        let manifest_yaml = serde_yaml_ng::to_string(manifest)
            .map_err(|e| GatewayError::output("serialize manifest copy", e))?;
        write_file(&dir.join("run.yaml"), manifest_yaml.as_bytes())?;

        let csv_path = dir.join("udp_packets.csv");
        let csv_file = File::create(&csv_path).map_err(|e| GatewayError::file_error(&csv_path, e))?;
        let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(csv_file);
        csv.write_record(CSV_COLUMNS)?;

        let log_path = dir.join("collector.log");
        let log = BufWriter::new(
            File::create(&log_path).map_err(|e| GatewayError::file_error(&log_path, e))?,
        );

        debug!("Created run directory {}", dir.display());

        Ok(Self {
            dir,
            run_id: config.run_id,
            scenario_id: config.scenario_id.clone(),
            csv,
            log,
            flush_every: DEFAULT_FLUSH_EVERY,
            rows_since_flush: 0,
        })
    }

    /// Flush and fsync the CSV every `rows` rows (minimum 1).
    pub fn with_flush_every(mut self, rows: usize) -> Self {
        self.flush_every = rows.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join("udp_packets.csv")
    }

    /// Write the run header to the run log.
    pub fn write_header(&mut self, config: &RunConfig, source: &str, started_at: f64) -> Result<()> {
        let lines = [
            format!("run_id={}", config.run_id),
            format!("scenario_id={}", config.scenario_id),
            format!("listen={}", source),
            format!("duration_s={}", config.duration.as_secs()),
            format!("started_at={started_at:.6}"),
        ];
        self.log_lines(&lines)
    }

    fn log_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            writeln!(self.log, "{line}").map_err(|e| GatewayError::output("run log write", e))?;
        }
        Ok(())
    }

    fn sync_csv(&mut self) -> Result<()> {
        self.csv.flush().map_err(|e| GatewayError::output("CSV flush", e))?;
        self.csv.get_ref().sync_all().map_err(|e| GatewayError::output("CSV fsync", e))?;
        self.rows_since_flush = 0;
        Ok(())
    }
}

impl RecordSink for RunDirectory {
    fn write_record(
        &mut self,
        packet: &PacketRecord,
        classification: &Classification,
    ) -> Result<()> {
        self.csv.serialize(CsvRow::new(self.run_id, &self.scenario_id, packet, classification))?;
        self.rows_since_flush += 1;
        if self.rows_since_flush >= self.flush_every {
            self.sync_csv()?;
        }
        Ok(())
    }

    fn record_parse_error(&mut self, datagram: &Datagram, error: &ParseError) -> Result<()> {
        let from = datagram.peer.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let line = format!(
            "[PARSE_ERROR] ts={:.6} from={} len={} reason={}",
            datagram.arrival,
            from,
            datagram.len(),
            error.kind()
        );
        self.log_lines(&[line])
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.sync_csv()?;

        let mut lines = vec![format!("ended_at={:.6}", crate::types::unix_now())];
        lines.extend(summary.log_lines());
        self.log_lines(&lines)?;
        self.log.flush().map_err(|e| GatewayError::output("run log flush", e))?;

        let yaml = serde_yaml_ng::to_string(summary)
            .map_err(|e| GatewayError::output("serialize run summary", e))?;
        write_file(&self.dir.join("summary.yaml"), yaml.as_bytes())?;

        info!("Run output finalized in {}", self.dir.display());
        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| GatewayError::file_error(path, e))
}

/// In-memory sink, for tests and offline analysis.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<(PacketRecord, Classification)>,
    pub parse_errors: Vec<ParseError>,
    pub summary: Option<RunSummary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn write_record(
        &mut self,
        packet: &PacketRecord,
        classification: &Classification,
    ) -> Result<()> {
        self.records.push((packet.clone(), *classification));
        Ok(())
    }

    fn record_parse_error(&mut self, _datagram: &Datagram, error: &ParseError) -> Result<()> {
        self.parse_errors.push(error.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}
