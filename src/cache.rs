use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A directory whose file paths are computed on first use and then reused for the
/// rest of the run.
#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
    paths: HashMap<String, PathBuf>,
}

impl CacheDir {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            paths: HashMap::new(),
        }
    }

    pub fn path(&mut self, name: &str) -> &Path {
        let dir = &self.dir;
        self.paths
            .entry(name.to_string())
            .or_insert_with(|| dir.join(name))
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::cache::CacheDir;

    #[test]
    pub fn test_join() {
        let mut cache = CacheDir::new("/tmp/scratch");
        assert_eq!(
            cache.path("20240301100000-NHK1.mp3"),
            Path::new("/tmp/scratch/20240301100000-NHK1.mp3")
        );
    }

    #[test]
    pub fn test_memoized() {
        let mut cache = CacheDir::new("/tmp/scratch");
        let first = cache.path("a.mp3").to_path_buf();
        let second = cache.path("a.mp3").to_path_buf();
        assert_eq!(first, second);
        assert_eq!(cache.paths.len(), 1);

        cache.path("b.mp3");
        assert_eq!(cache.paths.len(), 2);
    }
}
