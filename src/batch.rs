use indicatif::ProgressBar;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

use crate::translator::{self, Dialect, TranslateOptions, Translation, TranslationFailure};

/// One file to translate
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub path: PathBuf,
    pub dialect: Dialect,
    /// Where the translation will be written
    pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read: {0}")]
    Read(#[from] io::Error),
    #[error(transparent)]
    Translate(#[from] TranslationFailure),
    #[error("{} would also be written from {}", output.display(), first.display())]
    OutputCollision { output: PathBuf, first: PathBuf },
}

#[derive(Debug)]
pub enum FileOutcome {
    Translated(Translation),
    Failed(FileError),
    /// Cancelled before the file started
    Skipped,
}

/// Results of a batch, ordered by path
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: BTreeMap<PathBuf, FileOutcome>,
}

impl BatchReport {
    /// Files translated without warnings
    pub fn succeeded(&self) -> Vec<&Path> {
        self.select(|o| matches!(o, FileOutcome::Translated(t) if t.warnings.is_empty()))
    }

    pub fn with_warnings(&self) -> Vec<(&Path, &Translation)> {
        self.results
            .iter()
            .filter_map(|(path, outcome)| match outcome {
                FileOutcome::Translated(t) if !t.warnings.is_empty() => Some((path.as_path(), t)),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<(&Path, &FileError)> {
        self.results
            .iter()
            .filter_map(|(path, outcome)| match outcome {
                FileOutcome::Failed(e) => Some((path.as_path(), e)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&Path> {
        self.select(|o| matches!(o, FileOutcome::Skipped))
    }

    fn select(&self, pred: impl Fn(&FileOutcome) -> bool) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(path, _)| path.as_path())
            .collect()
    }
}

/// Batch settings shared by every file
pub struct Batch<'a> {
    /// Options applied to each file; `source` is replaced by the file's dialect
    pub options: TranslateOptions,
    /// Worker threads; 0 uses the global rayon pool
    pub jobs: usize,
    pub cancel: &'a AtomicBool,
    pub progress: Option<&'a ProgressBar>,
}

impl<'a> Batch<'a> {
    /// Translate every job, reading sources through `read`.
    ///
    /// Files run in parallel and never affect each other; a failed read or
    /// translation is recorded against its path. A job whose output path an
    /// earlier job already claimed fails without being read. Once `cancel`
    /// is set, files that have not started are reported as skipped.
    pub fn run<R>(&self, jobs: &[BatchJob], read: R) -> BatchReport
    where
        R: Fn(&Path) -> io::Result<String> + Sync,
    {
        let (runnable, collisions) = claim_outputs(jobs);
        if let Some(pb) = self.progress {
            pb.inc(collisions.len() as u64);
        }

        let results = Mutex::new(collisions);
        let work = || {
            runnable.par_iter().for_each(|job| {
                let outcome = self.run_one(job, &read);
                if let Some(pb) = self.progress {
                    pb.inc(1);
                }
                results.lock().insert(job.path.clone(), outcome);
            })
        };

        match self.pool() {
            Some(pool) => pool.install(work),
            None => work(),
        }

        BatchReport {
            results: results.into_inner(),
        }
    }

    fn run_one<R>(&self, job: &BatchJob, read: &R) -> FileOutcome
    where
        R: Fn(&Path) -> io::Result<String>,
    {
        if self.cancel.load(Ordering::SeqCst) {
            return FileOutcome::Skipped;
        }
        debug!(path = %job.path.display(), dialect = %job.dialect, "starting file");

        let source = match read(&job.path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %job.path.display(), error = %e, "read failed");
                return FileOutcome::Failed(e.into());
            }
        };
        let options = TranslateOptions {
            source: job.dialect,
            ..self.options.clone()
        };
        match translator::translate(&source, &options) {
            Ok(translation) => FileOutcome::Translated(translation),
            Err(failure) => {
                warn!(path = %job.path.display(), error = %failure, "translation failed");
                FileOutcome::Failed(failure.into())
            }
        }
    }

    fn pool(&self) -> Option<rayon::ThreadPool> {
        if self.jobs == 0 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "could not build thread pool, using the global one");
                None
            }
        }
    }
}

/// Split `jobs` into those that own their output path and failures for the
/// ones that would overwrite an earlier job's output
fn claim_outputs(jobs: &[BatchJob]) -> (Vec<&BatchJob>, BTreeMap<PathBuf, FileOutcome>) {
    let mut owners: HashMap<&Path, &Path> = HashMap::new();
    let mut runnable = Vec::with_capacity(jobs.len());
    let mut collisions = BTreeMap::new();

    for job in jobs {
        match owners.entry(job.output.as_path()) {
            Entry::Vacant(slot) => {
                slot.insert(job.path.as_path());
                runnable.push(job);
            }
            Entry::Occupied(owner) => {
                warn!(
                    path = %job.path.display(),
                    output = %job.output.display(),
                    first = %owner.get().display(),
                    "output path collides"
                );
                let error = FileError::OutputCollision {
                    output: job.output.clone(),
                    first: owner.get().to_path_buf(),
                };
                collisions.insert(job.path.clone(), FileOutcome::Failed(error));
            }
        }
    }
    (runnable, collisions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(path: &str, dialect: Dialect) -> BatchJob {
        BatchJob {
            path: PathBuf::from(path),
            dialect,
            output: Path::new("out").join(path).with_extension("py"),
        }
    }

    fn run(jobs: &[BatchJob], files: &HashMap<&str, &str>, cancel: bool) -> BatchReport {
        let cancel = AtomicBool::new(cancel);
        let batch = Batch {
            options: TranslateOptions::new(Dialect::CSharp, Dialect::Python),
            jobs: 2,
            cancel: &cancel,
            progress: None,
        };
        batch.run(jobs, |path| {
            files
                .get(path.to_str().unwrap_or(""))
                .map(|s| s.to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        })
    }

    #[test]
    fn test_one_failure_does_not_stop_siblings() {
        let files = HashMap::from([
            ("a.cs", "Console.WriteLine(1);"),
            ("b.cs", "}"),
            ("c.vb", "Console.WriteLine(2)"),
            ("d.cs", "class D {\n"),
        ]);
        let jobs = vec![
            job("a.cs", Dialect::CSharp),
            job("b.cs", Dialect::CSharp),
            job("c.vb", Dialect::VBNet),
            job("d.cs", Dialect::CSharp),
            job("missing.cs", Dialect::CSharp),
        ];
        let report = run(&jobs, &files, false);

        assert_eq!(report.results.len(), 5);
        assert_eq!(report.succeeded(), vec![Path::new("a.cs"), Path::new("c.vb")]);
        assert_eq!(report.with_warnings().len(), 1);
        assert_eq!(report.with_warnings()[0].0, Path::new("d.cs"));

        let failed = report.failed();
        assert_eq!(failed.len(), 2);
        assert!(matches!(failed[0].1, FileError::Translate(_)));
        assert!(matches!(failed[1].1, FileError::Read(_)));
        assert!(report.skipped().is_empty());
    }

    #[test]
    fn test_source_dialect_comes_from_the_job() {
        let files = HashMap::from([("c.vb", "Console.WriteLine(\"x\")")]);
        let report = run(&[job("c.vb", Dialect::VBNet)], &files, false);
        match &report.results[Path::new("c.vb")] {
            FileOutcome::Translated(t) => assert_eq!(t.output, "print(\"x\")\n"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_colliding_output_fails_the_later_file() {
        let files = HashMap::from([
            ("Foo.cs", "Console.WriteLine(1);"),
            ("Foo.vb", "Console.WriteLine(2)"),
            ("Bar.vb", "Console.WriteLine(3)"),
        ]);
        let jobs = vec![
            job("Bar.vb", Dialect::VBNet),
            job("Foo.cs", Dialect::CSharp),
            job("Foo.vb", Dialect::VBNet),
        ];
        let report = run(&jobs, &files, false);

        assert_eq!(report.succeeded(), vec![Path::new("Bar.vb"), Path::new("Foo.cs")]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, Path::new("Foo.vb"));
        match failed[0].1 {
            FileError::OutputCollision { output, first } => {
                assert_eq!(output, &PathBuf::from("out/Foo.py"));
                assert_eq!(first, &PathBuf::from("Foo.cs"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_batch_skips_files() {
        let files = HashMap::from([("a.cs", "Console.WriteLine(1);")]);
        let report = run(&[job("a.cs", Dialect::CSharp)], &files, true);
        assert_eq!(report.skipped(), vec![Path::new("a.cs")]);
        assert!(report.succeeded().is_empty());
    }
}
