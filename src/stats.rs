//! Per-frame metric recording and replay.
//!
//! A stats file stores every [`MetricRow`] of a pass so a later pass with
//! different detector settings can skip decoding and metric extraction. The
//! format is comma-delimited text:
//!
//! ```text
//! Detector,content,Frame Rate,25.000000,Sampling,full
//! Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum
//! 0,00:00:00.000,0,0,0,0
//! 1,00:00:00.040,1.25,0.5,2,1.25
//! ```
//!
//! The first line identifies what the values depend on. Replay only happens
//! when the detector mode, frame rate and sampling signature all match the
//! pass being run.
//!
//! The `Timecode` column is written for people reading the file. It is
//! derived from the frame number and frame rate, so it is not read back.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Terminator, Trim, WriterBuilder};

use crate::config::{DetectionMode, DetectorConfig};
use crate::error::{Result, SceneCutError};
use crate::metrics::{self, MetricRow};
use crate::timecode::FrameTimecode;

/// Frame rates closer than this are considered equal.
const FRAME_RATE_TOLERANCE: f64 = 1e-3;

/// Identity line plus column names of a stats file.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsHeader {
    mode: DetectionMode,
    frames_per_second: f64,
    sampling: String,
    metric_keys: Vec<String>,
}

impl StatsHeader {
    /// The header a pass with `config` at `frames_per_second` records.
    pub fn for_config(config: &DetectorConfig, frames_per_second: f64) -> Self {
        Self {
            mode: config.mode,
            frames_per_second,
            sampling: sampling_signature(config),
            metric_keys: metrics::metric_keys(config.mode)
                .iter()
                .map(|key| key.to_string())
                .collect(),
        }
    }

    /// Detector mode that produced the values.
    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// Frame rate of the recorded stream.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Sampling parameters the values depend on.
    pub fn sampling(&self) -> &str {
        &self.sampling
    }

    /// Metric column names, in file order.
    pub fn metric_keys(&self) -> &[String] {
        &self.metric_keys
    }

    /// Column index in this file of every key of `expected`.
    fn column_map(&self, expected: &StatsHeader) -> Result<Vec<usize>> {
        if self.mode != expected.mode {
            return Err(SceneCutError::StatsReplayMismatch(format!(
                "recorded by the {} detector, {} requested",
                self.mode, expected.mode
            )));
        }
        if (self.frames_per_second - expected.frames_per_second).abs() > FRAME_RATE_TOLERANCE {
            return Err(SceneCutError::StatsReplayMismatch(format!(
                "recorded at {:.6} fps, video runs at {:.6} fps",
                self.frames_per_second, expected.frames_per_second
            )));
        }
        if self.sampling != expected.sampling {
            return Err(SceneCutError::StatsReplayMismatch(format!(
                "sampled with `{}`, `{}` requested",
                self.sampling, expected.sampling
            )));
        }

        expected
            .metric_keys
            .iter()
            .map(|key| {
                self.metric_keys
                    .iter()
                    .position(|candidate| candidate == key)
                    .ok_or_else(|| {
                        SceneCutError::StatsReplayMismatch(format!("missing metric column `{key}`"))
                    })
            })
            .collect()
    }
}

/// The parameters stored metric values depend on, besides the mode.
///
/// `dark_fraction` counts pixels at or below the intensity threshold, so in
/// threshold mode both the sampling stride and the threshold are part of
/// the signature. Content metrics depend on neither.
pub fn sampling_signature(config: &DetectorConfig) -> String {
    match config.mode {
        DetectionMode::Threshold => format!("b={};t={}", config.block_size, config.threshold),
        DetectionMode::Content => "full".to_string(),
    }
}

/// One recorded frame.
///
/// Replayed rows get their timestamp from `frame` and the file's frame
/// rate, the same way the `Timecode` column is written.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    /// Frame index.
    pub frame: u64,
    /// Values in the column order of the file's header.
    pub values: Vec<f64>,
}

/// An in-memory stats file.
///
/// Used both as the recorder of a running pass and as the result of
/// [`load`](StatsFile::load).
#[derive(Debug, Clone, PartialEq)]
pub struct StatsFile {
    header: StatsHeader,
    rows: Vec<StatsRow>,
}

impl StatsFile {
    /// An empty file that will record rows matching `header`.
    pub fn new(header: StatsHeader) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// The header.
    pub fn header(&self) -> &StatsHeader {
        &self.header
    }

    /// Recorded rows in file order.
    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    /// Number of recorded rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when no rows are recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append `row`. Its values are stored in the header's column order;
    /// keys the row does not carry are recorded as 0.
    pub fn record(&mut self, row: &MetricRow) {
        let values = self
            .header
            .metric_keys
            .iter()
            .map(|key| row.get(key).unwrap_or(0.0))
            .collect();
        self.rows.push(StatsRow {
            frame: row.frame(),
            values,
        });
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// I/O failures are returned as [`SceneCutError::IoError`]; anything
    /// that does not parse is [`SceneCutError::StatsFileCorrupt`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::read(file)
    }

    /// Parse a stats file from `reader`.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        // The identity line and the column line differ in width.
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader)
            .into_records();

        let identity = next_record(&mut records)?
            .ok_or_else(|| SceneCutError::StatsFileCorrupt("file is empty".to_string()))?;
        let (mode, frames_per_second, sampling) = parse_identity(&identity)?;

        let columns = next_record(&mut records)?.ok_or_else(|| {
            SceneCutError::StatsFileCorrupt("missing column header line".to_string())
        })?;
        let metric_keys = parse_columns(&columns)?;

        let header = StatsHeader {
            mode,
            frames_per_second,
            sampling,
            metric_keys,
        };

        let mut rows = Vec::new();
        while let Some(record) = next_record(&mut records)? {
            rows.push(parse_row(&record, header.metric_keys.len())?);
        }

        log::debug!(
            "Loaded stats file: {} detector, {} rows, sampling `{}`",
            header.mode,
            rows.len(),
            header.sampling
        );

        Ok(Self { header, rows })
    }

    /// Write the file to `writer`.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        let frame_rate = format!("{:.6}", self.header.frames_per_second);
        writer.write_record([
            "Detector",
            self.header.mode.as_str(),
            "Frame Rate",
            frame_rate.as_str(),
            "Sampling",
            self.header.sampling.as_str(),
        ])?;
        writer.write_record(
            ["Frame Number", "Timecode"]
                .into_iter()
                .chain(self.header.metric_keys.iter().map(String::as_str)),
        )?;

        for row in &self.rows {
            let timecode = FrameTimecode::new(row.frame, self.header.frames_per_second);
            writer.write_record(
                [row.frame.to_string(), timecode.to_string()]
                    .into_iter()
                    .chain(row.values.iter().map(|value| value.to_string())),
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write the file to `path`, replacing whatever is there.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write(BufWriter::new(file))?;
        log::debug!(
            "Wrote {} stats rows to {}",
            self.rows.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// The rows a pass described by `expected` can replay.
    ///
    /// Returns the longest run of consecutive frames starting at frame 0,
    /// as rows keyed for the expected mode. The pass stops using them where
    /// its frame source ends.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::StatsReplayMismatch`] if the mode, frame
    /// rate or sampling signature differ, or a required metric column is
    /// missing.
    pub fn replay_plan(&self, expected: &StatsHeader) -> Result<Vec<MetricRow>> {
        let columns = self.header.column_map(expected)?;
        let keys = metrics::metric_keys(expected.mode);
        let frames_per_second = self.header.frames_per_second;

        let rows = self
            .rows
            .iter()
            .zip(0u64..)
            .take_while(|(row, expected_frame)| row.frame == *expected_frame)
            .map(|(row, _)| {
                let values = columns.iter().map(|&column| row.values[column]).collect();
                let timestamp = FrameTimecode::new(row.frame, frames_per_second).duration();
                MetricRow::new(row.frame, timestamp, keys, values)
            })
            .collect();

        Ok(rows)
    }
}

/// Next record with at least one non-empty field.
fn next_record<R: Read>(records: &mut StringRecordsIntoIter<R>) -> Result<Option<StringRecord>> {
    for record in records.by_ref() {
        let record = record?;
        if record.iter().any(|field| !field.is_empty()) {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

fn parse_identity(record: &StringRecord) -> Result<(DetectionMode, f64, String)> {
    let fields: Vec<&str> = record.iter().collect();
    match fields.as_slice() {
        ["Detector", mode, "Frame Rate", fps, "Sampling", sampling] => {
            let mode = mode.parse::<DetectionMode>().map_err(|_| {
                SceneCutError::StatsFileCorrupt(format!("unknown detector `{mode}`"))
            })?;
            let frames_per_second = fps
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value > 0.0)
                .ok_or_else(|| {
                    SceneCutError::StatsFileCorrupt(format!("invalid frame rate `{fps}`"))
                })?;
            Ok((mode, frames_per_second, sampling.to_string()))
        }
        _ => Err(SceneCutError::StatsFileCorrupt(format!(
            "unrecognized identity line `{}`",
            fields.join(",")
        ))),
    }
}

fn parse_columns(record: &StringRecord) -> Result<Vec<String>> {
    let fields: Vec<&str> = record.iter().collect();
    match fields.as_slice() {
        ["Frame Number", "Timecode", keys @ ..] => Ok(keys.iter().map(|key| key.to_string()).collect()),
        _ => Err(SceneCutError::StatsFileCorrupt(format!(
            "unrecognized column header `{}`",
            fields.join(",")
        ))),
    }
}

fn parse_row(record: &StringRecord, metric_count: usize) -> Result<StatsRow> {
    let line = line_of(record);
    if record.len() != metric_count + 2 {
        return Err(SceneCutError::StatsFileCorrupt(format!(
            "line {line}: expected {} fields, found {}",
            metric_count + 2,
            record.len()
        )));
    }

    let frame = record[0].parse::<u64>().map_err(|_| {
        SceneCutError::StatsFileCorrupt(format!(
            "line {line}: invalid frame number `{}`",
            &record[0]
        ))
    })?;

    // Field 1 is the timecode, see the module docs.
    let values = record
        .iter()
        .skip(2)
        .map(|field| {
            field.parse::<f64>().map_err(|_| {
                SceneCutError::StatsFileCorrupt(format!(
                    "line {line}: invalid metric value `{field}`"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StatsRow { frame, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_signature_tracks_block_size_and_threshold() {
        let config = DetectorConfig::threshold_mode();
        assert_eq!(sampling_signature(&config), "b=8;t=12");
        assert_eq!(
            sampling_signature(&config.clone().with_threshold(20.5).with_block_size(4)),
            "b=4;t=20.5"
        );
        assert_eq!(sampling_signature(&DetectorConfig::content_mode()), "full");
    }

    #[test]
    fn extra_columns_are_ignored_and_reordered() {
        let text = "Detector,threshold,Frame Rate,25.000000,Sampling,b=8;t=12\n\
                    Frame Number,Timecode,dark_fraction,extra,avg_intensity\n\
                    0,00:00:00.000,0.5,9,100\n\
                    1,00:00:00.040,1,9,3\n";
        let file = StatsFile::read(text.as_bytes()).unwrap();
        let expected = StatsHeader::for_config(&DetectorConfig::threshold_mode(), 25.0);
        let rows = file.replay_plan(&expected).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].values(), &[3.0, 1.0]);
    }

    #[test]
    fn gap_ends_the_usable_prefix() {
        let text = "Detector,content,Frame Rate,25.000000,Sampling,full\n\
                    Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum\n\
                    0,00:00:00.000,0,0,0,0\n\
                    1,00:00:00.040,1,1,1,1\n\
                    3,00:00:00.120,1,1,1,1\n";
        let file = StatsFile::read(text.as_bytes()).unwrap();
        let expected = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);

        assert_eq!(file.replay_plan(&expected).unwrap().len(), 2);
    }

    #[test]
    fn short_row_is_corrupt() {
        let text = "Detector,content,Frame Rate,25.000000,Sampling,full\n\
                    Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum\n\
                    0,00:00:00.000,0,0\n";
        let error = StatsFile::read(text.as_bytes()).unwrap_err();
        assert!(matches!(error, SceneCutError::StatsFileCorrupt(_)));
    }
}
