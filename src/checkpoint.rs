use std::{
    fs,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ConfigErr, Result};

const EXTENSION: &str = "json";

/// Persists a single serializable value across runs as a JSON file.
///
/// Files are named `<name>[_<count>][_<unix secs>].json` inside the checkpointer's directory. When counting or
/// timestamping is enabled, `load` picks the most recent file for the name.
#[derive(Debug, Clone)]
pub struct Checkpointer<T> {
    name: String,
    directory: PathBuf,
    overwrite: bool,
    timestamp: bool,
    add_count: bool,
    count: Option<u64>,
    last: Option<PathBuf>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Checkpointer<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a new `Checkpointer` that keeps every file it writes, without counts or timestamps.
    ///
    /// # Arguments
    /// * `name` - The label of the checkpoint files.
    /// * `directory` - Where the files are written, created on the first save if missing.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            overwrite: false,
            timestamp: false,
            add_count: false,
            count: None,
            last: None,
            _value: PhantomData,
        }
    }

    /// Remove the previously written file after each save.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Append the save time, in seconds since the unix epoch, to the file name.
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append an increasing save counter to the file name.
    pub fn add_count(mut self, add_count: bool) -> Self {
        self.add_count = add_count;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The last file written or loaded by this checkpointer.
    pub fn path(&self) -> Option<&Path> {
        self.last.as_deref()
    }

    /// Writes `value` to a new checkpoint file.
    ///
    /// # Returns
    /// The path of the written file.
    ///
    /// # Errors
    /// An io error if the directory or file can't be written, `Checkpoint` if `value` can't be serialized.
    pub fn save(&mut self, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;

        let bytes = serde_json::to_vec_pretty(value).map_err(|source| ConfigErr::Checkpoint {
            name: self.name.clone(),
            source,
        })?;

        if self.add_count && self.count.is_none() {
            self.count = Some(self.latest()?.map_or(0, |(suffix, _)| first_or_zero(&suffix)));
        }
        let count = self.count.map(|c| c + 1);

        let path = self.file_path(count, self.timestamp.then(unix_secs));
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!("saved checkpoint {}", path.display());

        let previous = self.last.replace(path.clone());
        self.count = count;

        if self.overwrite {
            if let Some(previous) = previous.filter(|p| *p != path) {
                match fs::remove_file(&previous) {
                    Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                    _ => debug!("removed checkpoint {}", previous.display()),
                }
            }
        }

        Ok(path)
    }

    /// Reads the most recent checkpoint for this name.
    ///
    /// # Returns
    /// `None` if no checkpoint was ever saved.
    ///
    /// # Errors
    /// An io error if the file can't be read, `Checkpoint` if its content can't be decoded.
    pub fn load(&mut self) -> Result<Option<T>> {
        let Some((suffix, path)) = self.latest()? else {
            return Ok(None);
        };

        let bytes = fs::read(&path)?;
        let value = serde_json::from_slice(&bytes).map_err(|source| ConfigErr::Checkpoint {
            name: self.name.clone(),
            source,
        })?;
        debug!("loaded checkpoint {}", path.display());

        if self.add_count {
            self.count = Some(first_or_zero(&suffix));
        }
        self.last = Some(path);
        Ok(Some(value))
    }

    fn file_path(&self, count: Option<u64>, secs: Option<u64>) -> PathBuf {
        let mut file = self.name.clone();
        for n in count.into_iter().chain(secs) {
            file.push_str(&format!("_{n}"));
        }
        self.directory.join(format!("{file}.{EXTENSION}"))
    }

    /// Finds the most recent checkpoint file together with the numeric suffixes of its name.
    fn latest(&self) -> Result<Option<(Vec<u64>, PathBuf)>> {
        if !self.add_count && !self.timestamp {
            let path = self.file_path(None, None);
            return Ok(path.is_file().then(|| (Vec::new(), path)));
        }

        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let expected = usize::from(self.add_count) + usize::from(self.timestamp);
        let mut latest: Option<(Vec<u64>, PathBuf)> = None;

        for entry in entries {
            let path = entry?.path();
            let Some(suffix) = self.parse_suffix(&path) else {
                continue;
            };
            if suffix.len() != expected {
                continue;
            }
            if latest.as_ref().map_or(true, |(best, _)| suffix > *best) {
                latest = Some((suffix, path));
            }
        }

        Ok(latest)
    }

    /// Parses `<name>_<n>[_<m>].json` into `[n, m]`.
    fn parse_suffix(&self, path: &Path) -> Option<Vec<u64>> {
        if path.extension()? != EXTENSION {
            return None;
        }

        let stem = path.file_stem()?.to_str()?;
        let rest = stem.strip_prefix(&self.name)?;
        if rest.is_empty() {
            return Some(Vec::new());
        }

        rest.strip_prefix('_')?
            .split('_')
            .map(|n| n.parse().ok())
            .collect()
    }
}

fn first_or_zero(suffix: &[u64]) -> u64 {
    suffix.first().copied().unwrap_or_default()
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
