use crate::error::StatsError;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

/// Ordered lines from a set of input files and directories, or stdin.
#[derive(Debug, Clone)]
pub struct LineSource {
    sources: Vec<InputSource>,
}

impl LineSource {
    pub fn stdin() -> Self {
        LineSource {
            sources: vec![InputSource::Stdin],
        }
    }

    /// Resolve `inputs` into files, in argument order. Directories contribute
    /// their files (not subdirectories) in sorted path order. Inputs that are
    /// missing or unreadable are logged and skipped; with no inputs at all
    /// stdin is read.
    pub fn from_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Self, StatsError> {
        if inputs.is_empty() {
            return Ok(Self::stdin());
        }
        let mut sources = Vec::new();
        for input in inputs {
            let path = input.as_ref();
            if path.is_file() {
                sources.push(InputSource::File(path.to_path_buf()));
            } else if path.is_dir() {
                match directory_files(path) {
                    Ok(files) => {
                        debug!(dir = %path.display(), files = files.len(), "[input] directory listed");
                        sources.extend(files.into_iter().map(InputSource::File));
                    }
                    Err(e) => error!(dir = %path.display(), error = %e, "[input] directory could not be opened"),
                }
            } else {
                error!(path = %path.display(), "[input] not a file or directory");
            }
        }
        if sources.is_empty() {
            return Err(StatsError::NoInput);
        }
        Ok(LineSource { sources })
    }

    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    pub fn lines(self) -> Lines {
        Lines {
            pending: self.sources.into(),
            current: None,
        }
    }
}

impl IntoIterator for LineSource {
    type Item = String;
    type IntoIter = Lines;

    fn into_iter(self) -> Lines {
        self.lines()
    }
}

fn directory_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

type LineReader = io::Lines<Box<dyn BufRead + Send>>;

/// Lazily reads every line of every source in order.
pub struct Lines {
    pending: VecDeque<InputSource>,
    current: Option<(InputSource, LineReader)>,
}

impl Lines {
    fn open_next(&mut self) -> bool {
        while let Some(source) = self.pending.pop_front() {
            let reader: Box<dyn BufRead + Send> = match &source {
                InputSource::Stdin => Box::new(BufReader::new(io::stdin())),
                InputSource::File(path) => match File::open(path) {
                    Ok(file) => Box::new(BufReader::new(file)),
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "[input] file could not be opened");
                        continue;
                    }
                },
            };
            self.current = Some((source, reader.lines()));
            return true;
        }
        false
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if self.current.is_none() && !self.open_next() {
                return None;
            }
            let (source, reader) = self.current.as_mut()?;
            match reader.next() {
                Some(Ok(line)) => return Some(line),
                Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(source = ?source, "[input] skipping line that is not valid UTF-8");
                }
                Some(Err(e)) => {
                    error!(source = ?source, error = %e, "[input] read failed, skipping rest of source");
                    self.current = None;
                }
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_mean_stdin() {
        let source = LineSource::from_inputs::<PathBuf>(&[]).unwrap();
        assert_eq!(source.sources(), &[InputSource::Stdin]);
    }

    #[test]
    fn test_single_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.txt");
        fs::write(&path, "first line\nsecond line\n\nlast").unwrap();
        let lines: Vec<String> = LineSource::from_inputs(&[&path]).unwrap().into_iter().collect();
        assert_eq!(lines, vec!["first line", "second line", "", "last"]);
    }

    #[test]
    fn test_directory_is_sorted_and_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b1\nb2\n").unwrap();
        fs::write(dir.path().join("a.txt"), "a1\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "c1\n").unwrap();
        let lines: Vec<String> = LineSource::from_inputs(&[dir.path()]).unwrap().into_iter().collect();
        assert_eq!(lines, vec!["a1", "b1", "b2"]);
    }

    #[test]
    fn test_missing_inputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "kept\n").unwrap();
        let missing = dir.path().join("missing.txt");
        let source = LineSource::from_inputs(&[missing.clone(), good.clone()]).unwrap();
        assert_eq!(source.sources(), &[InputSource::File(good)]);
    }

    #[test]
    fn test_only_missing_inputs_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = LineSource::from_inputs(&[dir.path().join("missing.txt")]).unwrap_err();
        assert!(matches!(err, StatsError::NoInput));
    }

    #[test]
    fn test_file_removed_before_reading_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.txt");
        let kept = dir.path().join("kept.txt");
        fs::write(&gone, "never read\n").unwrap();
        fs::write(&kept, "read\n").unwrap();
        let source = LineSource::from_inputs(&[&gone, &kept]).unwrap();
        fs::remove_file(&gone).unwrap();
        let lines: Vec<String> = source.into_iter().collect();
        assert_eq!(lines, vec!["read"]);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        fs::write(&path, b"ok\n\xff\xfe bad\nalso ok\n").unwrap();
        let lines: Vec<String> = LineSource::from_inputs(&[&path]).unwrap().into_iter().collect();
        assert_eq!(lines, vec!["ok", "also ok"]);
    }
}
