use crate::Error;
use fnv::FnvHashMap;
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
	sync::{Arc, Mutex, MutexGuard},
};
use tripfit_dataframe::{ColumnType, DataFrame, FromCsvOptions};

/**
A `DatasetCache` loads each distinct dataset path at most once per set of column types and hands out shared, read only references to the loaded `DataFrame` afterwards. Entries are never evicted, because the source files are not expected to change while the process runs.

The cache is owned by whoever owns the application context and passed by reference into the pipeline. It can be shared between sessions running on different threads.
*/
#[derive(Debug, Default)]
pub struct DatasetCache {
	entries: Mutex<FnvHashMap<PathBuf, Vec<CacheEntry>>>,
}

/// One load of a path. The same file loaded with different column types is a different dataset.
#[derive(Debug)]
struct CacheEntry {
	column_types: Option<BTreeMap<String, ColumnType>>,
	dataframe: Arc<DataFrame>,
}

impl DatasetCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the dataset at `path` with every column type inferred. See [`load_with_column_types`](#method.load_with_column_types).
	pub fn load(&self, path: &Path) -> Result<Arc<DataFrame>, Error> {
		self.load_with_column_types(path, None)
	}

	/**
	Return the dataset at `path`, reading it from disk only if this is the first successful load of `path` with these `column_types`. Columns named in `column_types` get that type instead of an inferred one. A failed load caches nothing, so a later call will try to read the file again.
	*/
	pub fn load_with_column_types(
		&self,
		path: &Path,
		column_types: Option<&BTreeMap<String, ColumnType>>,
	) -> Result<Arc<DataFrame>, Error> {
		// The lock is held while reading so that concurrent first loads of the same path read the file once.
		let mut entries = self.entries();
		let path_entries = entries.entry(path.to_owned()).or_insert_with(Vec::new);
		if let Some(entry) = path_entries
			.iter()
			.find(|entry| entry.column_types.as_ref() == column_types)
		{
			log::debug!("dataset cache hit for {}", path.display());
			return Ok(entry.dataframe.clone());
		}
		let options = FromCsvOptions {
			column_types: column_types.cloned(),
			..Default::default()
		};
		let dataframe = match DataFrame::from_path(path, options, |_| {}) {
			Ok(dataframe) => dataframe,
			Err(source) => {
				if path_entries.is_empty() {
					entries.remove(path);
				}
				return Err(Error::FileAccess {
					path: path.to_owned(),
					source,
				});
			}
		};
		log::info!(
			"loaded dataset {} with {} rows and {} columns",
			path.display(),
			dataframe.nrows(),
			dataframe.ncols(),
		);
		let dataframe = Arc::new(dataframe);
		path_entries.push(CacheEntry {
			column_types: column_types.cloned(),
			dataframe: dataframe.clone(),
		});
		Ok(dataframe)
	}

	pub fn contains(&self, path: &Path) -> bool {
		self.entries().contains_key(path)
	}

	/// The number of loaded datasets, counting each set of column types of a path separately.
	pub fn len(&self) -> usize {
		self.entries().values().map(|entries| entries.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	// The map is only modified after a load succeeds, so it is consistent even if a thread panicked while holding the lock.
	fn entries(&self) -> MutexGuard<FnvHashMap<PathBuf, Vec<CacheEntry>>> {
		self.entries.lock().unwrap_or_else(|error| error.into_inner())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	fn write_csv(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file.flush().unwrap();
		file
	}

	#[test]
	fn test_second_load_is_served_from_the_cache() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n1,3.0\n2,1.0\n3,4.0\n");
		let path = file.path().to_owned();
		let cache = DatasetCache::new();
		let first = cache.load(&path).unwrap();
		assert!(cache.contains(&path));
		// Deleting the file proves the second load does not touch the filesystem.
		file.close().unwrap();
		assert!(!path.exists());
		let second = cache.load(&path).unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(*first, *second);
		assert_eq!(second.nrows(), 4);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn test_missing_file_is_a_file_access_error() {
		let cache = DatasetCache::new();
		let path = Path::new("/nonexistent/trips.csv");
		let error = cache.load(path).unwrap_err();
		match error {
			Error::FileAccess { path: error_path, .. } => assert_eq!(error_path, path),
			error => panic!("unexpected error {:?}", error),
		}
		assert!(cache.is_empty());
	}

	#[test]
	fn test_failed_load_is_retried() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("trips.csv");
		let cache = DatasetCache::new();
		assert!(cache.load(&path).is_err());
		std::fs::write(&path, "PULocationID,trip_distance\n1,2.0\n").unwrap();
		assert_eq!(cache.load(&path).unwrap().nrows(), 1);
	}

	#[test]
	fn test_column_types_are_used() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n2,3.0\n");
		let mut column_types = BTreeMap::new();
		column_types.insert("PULocationID".to_owned(), ColumnType::Text);
		let cache = DatasetCache::new();
		let overridden = cache
			.load_with_column_types(file.path(), Some(&column_types))
			.unwrap();
		assert!(overridden.column("PULocationID").unwrap().as_text().is_some());
		assert!(overridden.column("trip_distance").unwrap().as_number().is_some());
		let inferred = cache.load(file.path()).unwrap();
		assert!(inferred.column("PULocationID").unwrap().as_number().is_some());
		assert_eq!(cache.len(), 2);
		let again = cache
			.load_with_column_types(file.path(), Some(&column_types))
			.unwrap();
		assert!(Arc::ptr_eq(&overridden, &again));
		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn test_poisoned_lock_keeps_entries() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n");
		let cache = Arc::new(DatasetCache::new());
		let first = cache.load(file.path()).unwrap();
		let panicking_cache = cache.clone();
		let result = std::thread::spawn(move || {
			let _entries = panicking_cache.entries.lock().unwrap();
			panic!("panic while holding the cache lock");
		})
		.join();
		assert!(result.is_err());
		assert!(cache.entries.is_poisoned());
		assert_eq!(cache.len(), 1);
		assert!(cache.contains(file.path()));
		assert!(Arc::ptr_eq(&first, &cache.load(file.path()).unwrap()));
	}

	#[test]
	fn test_cache_is_shared_between_threads() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n");
		let cache = Arc::new(DatasetCache::new());
		let handles: Vec<_> = (0..4)
			.map(|_| {
				let cache = cache.clone();
				let path = file.path().to_owned();
				std::thread::spawn(move || cache.load(&path).unwrap())
			})
			.collect();
		let dataframes: Vec<Arc<DataFrame>> = handles
			.into_iter()
			.map(|handle| handle.join().unwrap())
			.collect();
		assert!(dataframes
			.windows(2)
			.all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
	}
}
