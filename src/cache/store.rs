//! The on-disk image cache (§4.E): an LRU index over content files keyed
//! by the agent's chosen key, with `bytes_used ≤ bytes_max` and
//! `index_len ≤ index_cap` invariants.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use lru::LruCache;

use super::CacheError;

const INDEX_GROWTH_STEP: usize = 64;

struct Entry {
    path: PathBuf,
    size: u64,
}

pub struct ImageCache {
    dir: PathBuf,
    bytes_used: u64,
    bytes_max: u64,
    configured_max: u64,
    index: LruCache<String, Entry>,
    index_cap: usize,
}

impl ImageCache {
    /// Opens (creating if absent) the cache directory and indexes any
    /// files already present, per §4.E "Indexing existing files".
    pub fn open(dir: impl Into<PathBuf>, bytes_max: u64) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut cache = Self {
            dir,
            bytes_used: 0,
            bytes_max,
            configured_max: bytes_max,
            index: LruCache::new(NonZeroUsize::new(INDEX_GROWTH_STEP).unwrap()),
            index_cap: INDEX_GROWTH_STEP,
        };

        for entry in fs::read_dir(&cache.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let size = metadata.len();
            let key = entry.file_name().to_string_lossy().into_owned();
            cache.grow_index_if_needed();
            cache.index.put(key, Entry { path: entry.path(), size });
            cache.bytes_used += size;
            if cache.bytes_used > cache.bytes_max {
                cache.bytes_max = cache.bytes_used;
            }
        }

        Ok(cache)
    }

    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    pub fn bytes_max(&self) -> u64 {
        self.bytes_max
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// `Get(key)`: promotes `key` to MRU and returns its path.
    pub fn get(&mut self, key: &str) -> Option<PathBuf> {
        self.index.get(key).map(|entry| entry.path.clone())
    }

    /// Doubles the index capacity by a fixed step; never shrinks
    /// (Design Note: entries are small, shrinking risks repeated churn).
    fn grow_index_if_needed(&mut self) {
        if self.index.len() >= self.index_cap {
            self.index_cap += INDEX_GROWTH_STEP;
            self.index.resize(NonZeroUsize::new(self.index_cap).unwrap());
        }
    }

    /// `Set(key, reader, size, reset)` per §4.E's insert algorithm.
    pub fn set<R: Read + Seek>(
        &mut self,
        key: &str,
        mut reader: R,
        size: u64,
        reset: bool,
    ) -> Result<File, CacheError> {
        if self.bytes_used + size > self.bytes_max {
            if size > self.bytes_max {
                self.bytes_max = size;
                self.evict_all()?;
            } else {
                while self.bytes_used + size > self.bytes_max {
                    if !self.evict_one()? {
                        break;
                    }
                }
            }
        }

        let path = self.dir.join(key);
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    CacheError::EntryExists
                } else {
                    CacheError::Io(err)
                }
            })?;

        std::io::copy(&mut reader, &mut file)?;
        file.sync_all()?;

        self.bytes_used += size;

        self.grow_index_if_needed();
        let overflowed = self.index.len() >= self.index_cap;
        self.index.put(
            key.to_string(),
            Entry {
                path: path.clone(),
                size,
            },
        );

        if reset {
            reader.seek(SeekFrom::Start(0)).map_err(CacheError::Io)?;
        }

        file.seek(SeekFrom::Start(0))?;

        if overflowed {
            return Err(CacheError::IndexSizeExceeded);
        }
        Ok(file)
    }

    /// Evicts the single LRU entry. Returns `false` if the index is empty.
    fn evict_one(&mut self) -> Result<bool, CacheError> {
        let Some((_, entry)) = self.index.pop_lru() else {
            return Ok(false);
        };
        if entry.path.exists() {
            fs::remove_file(&entry.path)?;
        }
        self.bytes_used = self.bytes_used.saturating_sub(entry.size);
        if self.bytes_used <= self.configured_max {
            self.bytes_max = self.configured_max;
        }
        Ok(true)
    }

    /// Evicts every entry, then restores `bytes_max` to its configured
    /// value.
    fn evict_all(&mut self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.metadata()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        self.index.clear();
        self.bytes_used = 0;
        self.bytes_max = self.configured_max;
        Ok(())
    }
}
