//! ## cyclex-core::report
//! **Run report and output sinks**
//!
//! The same text goes to every sink, so the console copy and the file copy of
//! a run are byte-identical.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ReportError;
use crate::stats::JitterSnapshot;
use crate::time::Timestamp;

/// Everything a terminated run hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub statistics: JitterSnapshot,
    pub cycles_executed: u64,
    /// Present only for bounded runs.
    pub timestamps: Option<Vec<Timestamp>>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statistics)?;
        if let Some(timestamps) = &self.timestamps {
            writeln!(f)?;
            writeln!(f, "# Timestamps #")?;
            for ts in timestamps {
                writeln!(f, "{:.5}", ts.as_secs_f64())?;
            }
        }
        Ok(())
    }
}

/// Destination for a finished report.
pub trait ReportSink {
    fn write_report(&mut self, report: &RunReport) -> Result<(), ReportError>;
}

/// Writes into any `io::Write`, e.g. stdout or an in-memory buffer.
pub struct WriterSink<W> {
    target: String,
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(target: impl Into<String>, writer: W) -> Self {
        Self {
            target: target.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn write_report(&mut self, report: &RunReport) -> Result<(), ReportError> {
        write!(self.writer, "{report}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| ReportError::Write {
                target: self.target.clone(),
                source,
            })
    }
}

/// Creates (or truncates) `path` and writes the report into it.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn write_report(&mut self, report: &RunReport) -> Result<(), ReportError> {
        let write = || -> io::Result<()> {
            let mut out = BufWriter::new(File::create(&self.path)?);
            write!(out, "{report}")?;
            out.flush()
        };
        write().map_err(|source| ReportError::Write {
            target: self.path.display().to_string(),
            source,
        })
    }
}

/// Hands the report to every sink in order, stopping at the first failure.
pub fn publish(report: &RunReport, sinks: &mut [Box<dyn ReportSink>]) -> Result<(), ReportError> {
    sinks.iter_mut().try_for_each(|sink| sink.write_report(report))
}
