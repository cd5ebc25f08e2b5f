//! On-disk run store: one directory per run id holding `manifest.json` and
//! `timeseries.jsonl` (one mission point per line).

use crate::types::{MissionPointRecord, RunManifest};
use crate::{ResultsError, ResultsResult};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const MANIFEST: &str = "manifest.json";
const TIMESERIES: &str = "timeseries.jsonl";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store under `<project dir>/.flightmission/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: format!("{} has no parent directory", project_path.display()),
            })?;
        Self::new(project_dir.join(".flightmission").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn file(&self, run_id: &str, name: &str) -> PathBuf {
        self.root_dir.join(run_id).join(name)
    }

    fn existing(&self, run_id: &str, name: &str) -> ResultsResult<PathBuf> {
        let path = self.file(run_id, name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            })
        }
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.file(run_id, MANIFEST).is_file()
    }

    /// Write the points, then the manifest. A run directory without a
    /// manifest is never listed or reused.
    pub fn save_run(
        &self,
        manifest: &RunManifest,
        records: &[MissionPointRecord],
    ) -> ResultsResult<()> {
        fs::create_dir_all(self.root_dir.join(&manifest.run_id))?;

        let mut out = BufWriter::new(File::create(self.file(&manifest.run_id, TIMESERIES))?);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        let mut out = BufWriter::new(File::create(self.file(&manifest.run_id, MANIFEST))?);
        serde_json::to_writer_pretty(&mut out, manifest)?;
        out.flush()?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let file = File::open(self.existing(run_id, MANIFEST)?)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<MissionPointRecord>> {
        let file = File::open(self.existing(run_id, TIMESERIES)?)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }

    /// Every readable run, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().into_owned();
            if let Ok(manifest) = self.load_manifest(&run_id) {
                runs.push(manifest);
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let dir = self.root_dir.join(run_id);
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
