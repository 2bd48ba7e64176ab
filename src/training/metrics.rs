use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{FsrcnnError, Result};
use crate::utils::{file_io, IoErrorMapper};

/// Per-epoch summary of a training run. Non-finite PSNRs serialise as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
	pub epoch: usize,
	pub avg_loss: f32,
	pub bicubic_psnr: f32,
	pub recon_psnr: f32,
}

/// Append-only list of [`EpochRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
	records: Vec<EpochRecord>,
}

impl MetricsHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, record: EpochRecord) {
		self.records.push(record);
	}

	pub fn records(&self) -> &[EpochRecord] {
		&self.records
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn last(&self) -> Option<&EpochRecord> {
		self.records.last()
	}

	pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let json = serde_json::to_string_pretty(self)
			.map_err(|e| FsrcnnError::Serialization(format!("metrics encoding failed: {}", e)))?;
		file_io::write_file_atomic(path, json.as_bytes())
	}
}

#[derive(Serialize)]
struct ScalarEntry<'a> {
	tag: &'a str,
	value: f32,
	step: usize,
	timestamp: String,
}

/// Writes `{tag, value, step, timestamp}` lines to a JSON-lines file.
pub struct ScalarLogger {
	path: PathBuf,
	writer: BufWriter<File>,
}

impl ScalarLogger {
	/// Opens `path` for appending, creating it and its directory.
	pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		if let Some(dir) = path.parent() {
			file_io::create_dir_all(dir)?;
		}
		let file = OpenOptions::new().create(true).append(true).open(&path).map_io_err()?;
		Ok(ScalarLogger {
			path,
			writer: BufWriter::new(file),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
		let entry = ScalarEntry {
			tag,
			value,
			step,
			timestamp: Local::now().to_rfc3339(),
		};
		serde_json::to_writer(&mut self.writer, &entry)
			.map_err(|e| FsrcnnError::Serialization(format!("scalar encoding failed: {}", e)))?;
		self.writer.write_all(b"\n").map_io_err()?;
		self.writer.flush().map_io_err()
	}
}
