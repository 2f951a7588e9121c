//! Per-session pipeline: dumps in, aggregated report out
//!
//! Each dump runs through parse → correlate → categorize → CPU inference →
//! classification on its own, so files are processed in parallel. Results
//! are collected back in input order before aggregation. A failure in one
//! file becomes one error string and never aborts the session.
//!
//! ```text
//! dump[i] ─┬─ parse_dump ─ correlate(usage[i]?) ─ categorize ─ infer ─ classify ─┐
//! dump[j] ─┘                                                                       ├─ aggregate ─ report
//!   ...                                                                           ─┘
//! ```

use crate::aggregator::{aggregate_threads, ParsedFile};
use crate::classify::{classify_all, ClassifyError, GlobalStats, ThreadClassifier};
use crate::correlate::{correlate, infer_cpu_percentage};
use crate::dump_parser::{parse_dump, ParseError};
use crate::pools::PoolRegistry;
use crate::report::AnalysisReport;
use crate::thread::ThreadUsage;
use crate::usage_parser::parse_usage;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One uploaded stream
#[derive(Debug, Clone, PartialEq)]
pub enum InputFile {
    Path(PathBuf),
    Memory { name: String, data: Vec<u8> },
}

impl InputFile {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        InputFile::Path(path.into())
    }

    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        InputFile::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Name used in snapshots and error messages
    pub fn name(&self) -> String {
        match self {
            InputFile::Path(path) => display_name(path),
            InputFile::Memory { name, .. } => name.clone(),
        }
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + '_>> {
        match self {
            InputFile::Path(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            InputFile::Memory { data, .. } => Ok(Box::new(Cursor::new(data.as_slice()))),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A failure in one file's pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to open dump {name}: {source}")]
    OpenDump { name: String, source: io::Error },

    #[error("Failed to read usage {name}: {source}")]
    Usage { name: String, source: ParseError },

    #[error("Failed to parse {name}: {source}")]
    Parse { name: String, source: ParseError },

    #[error("Rule analysis failed for {name}: {source}")]
    Classify { name: String, source: ClassifyError },
}

/// Outcome of one dump's pipeline
#[derive(Debug)]
pub struct FileResult {
    /// Threads to aggregate; `None` when the dump itself could not be read
    pub parsed: Option<ParsedFile>,
    pub errors: Vec<PipelineError>,
}

/// Runs the per-file pipeline and aggregation with fixed configuration
pub struct AnalysisSession<'a> {
    pools: &'a PoolRegistry,
    classifier: &'a dyn ThreadClassifier,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(pools: &'a PoolRegistry, classifier: &'a dyn ThreadClassifier) -> Self {
        Self { pools, classifier }
    }

    /// Analyze dumps with usage files paired by position
    ///
    /// Extra usage files beyond the number of dumps are ignored.
    pub fn analyze(&self, dumps: &[InputFile], usages: &[InputFile]) -> AnalysisReport {
        let results: Vec<FileResult> = dumps
            .par_iter()
            .enumerate()
            .map(|(i, dump)| self.process_file(dump, usages.get(i)))
            .collect();

        let mut parsed_files = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            errors.extend(result.errors.iter().map(ToString::to_string));
            parsed_files.extend(result.parsed);
        }

        let threads = aggregate_threads(&parsed_files);
        AnalysisReport::new(threads, errors)
    }

    /// Run one dump (and its optional usage file) through the pipeline
    pub fn process_file(&self, dump: &InputFile, usage: Option<&InputFile>) -> FileResult {
        let name = dump.name();
        let mut errors = Vec::new();

        let reader = match dump.open() {
            Ok(reader) => reader,
            Err(source) => {
                return FileResult::failed(PipelineError::OpenDump { name, source });
            }
        };

        let usages = usage.and_then(|file| match read_usage(file) {
            Ok(usages) => Some(usages),
            Err(source) => {
                errors.push(PipelineError::Usage {
                    name: file.name(),
                    source,
                });
                None
            }
        });

        let mut threads = match parse_dump(reader) {
            Ok(threads) => threads,
            Err(source) => {
                errors.push(PipelineError::Parse { name, source });
                log_errors(&errors);
                return FileResult {
                    parsed: None,
                    errors,
                };
            }
        };

        let usage_data_provided = usages.is_some();
        if let Some(usages) = &usages {
            correlate(&mut threads, usages);
        }

        self.pools.categorize(&mut threads);

        if !usage_data_provided {
            infer_cpu_percentage(&mut threads);
        }

        let stats = GlobalStats::from_threads(&threads, usage_data_provided);
        if let Err(source) = classify_all(self.classifier, &mut threads, &stats) {
            errors.push(PipelineError::Classify {
                name: name.clone(),
                source,
            });
        }

        log_errors(&errors);
        FileResult {
            parsed: Some(ParsedFile::new(name, threads)),
            errors,
        }
    }
}

impl FileResult {
    fn failed(error: PipelineError) -> Self {
        let errors = vec![error];
        log_errors(&errors);
        Self {
            parsed: None,
            errors,
        }
    }
}

fn read_usage(file: &InputFile) -> Result<Vec<ThreadUsage>, ParseError> {
    parse_usage(file.open()?)
}

fn log_errors(errors: &[PipelineError]) {
    for error in errors {
        tracing::warn!("{}", error);
    }
}
