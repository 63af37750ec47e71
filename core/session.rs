/*!
A `Session` runs the whole pipeline for one user request: load the dataset through the cache, select the columns, configure a regressor, fit it, and score it. Nothing is kept between requests except what the cache holds, so concurrent sessions sharing a cache are independent.
*/

use crate::{
	cache::DatasetCache,
	config::Config,
	configure::{
		configure, Hyperparameters, TreeCount, DEFAULT_FEATURE_NAME, DEFAULT_MAX_DEPTH,
		DEFAULT_TREE_COUNT,
	},
	evaluate::{train_and_evaluate, MetricReport},
	overview::{overview, Overview},
	select::select,
	Error,
};
use std::{collections::BTreeMap, sync::Arc};
use tripfit_dataframe::{ColumnType, DataFrame};

/// The choices a user makes before each evaluation.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationRequest {
	pub feature_name: String,
	pub max_depth: usize,
	pub tree_count: TreeCount,
}

impl Default for EvaluationRequest {
	fn default() -> Self {
		Self {
			feature_name: DEFAULT_FEATURE_NAME.to_owned(),
			max_depth: DEFAULT_MAX_DEPTH,
			tree_count: DEFAULT_TREE_COUNT,
		}
	}
}

pub struct Session<'a> {
	cache: &'a DatasetCache,
	config: Config,
	column_types: Option<BTreeMap<String, ColumnType>>,
}

impl<'a> Session<'a> {
	pub fn new(cache: &'a DatasetCache, config: Config) -> Self {
		let column_types = config.dataframe_column_types();
		Self {
			cache,
			config,
			column_types,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The configured dataset with the configured column types, loaded through the cache.
	pub fn dataset(&self) -> Result<Arc<DataFrame>, Error> {
		self.cache
			.load_with_column_types(&self.config.dataset_path, self.column_types.as_ref())
	}

	/// The names of the columns a user can pick as the feature.
	pub fn column_names(&self) -> Result<Vec<String>, Error> {
		let dataset = self.dataset()?;
		Ok(dataset
			.column_names()
			.into_iter()
			.map(ToOwned::to_owned)
			.collect())
	}

	pub fn overview(&self, column_name: &str) -> Result<Overview, Error> {
		let dataset = self.dataset()?;
		overview(
			&dataset,
			column_name,
			self.config.overview_rows,
			self.config.value_counts_limit,
		)
	}

	/**
	Train a fresh regressor for `request` and return its metrics. The hyperparameters are validated before the dataset is loaded, so an invalid request never touches the filesystem.
	*/
	pub fn evaluate(&self, request: &EvaluationRequest) -> Result<MetricReport, Error> {
		let hyperparameters = Hyperparameters::new(request.max_depth, request.tree_count)?;
		let dataset = self.dataset()?;
		let pair = select(&dataset, &request.feature_name, &self.config.target_column)?;
		let model = configure(hyperparameters, self.config.seed);
		train_and_evaluate(model, &pair, self.config.evaluation_mode)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		config::ColumnType as ConfigColumnType, error::InvalidHyperparameter,
		evaluate::EvaluationMode,
	};
	use std::io::Write;
	use tripfit_tree::TrainError;

	fn write_csv(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file.flush().unwrap();
		file
	}

	fn config(file: &tempfile::NamedTempFile) -> Config {
		Config {
			dataset_path: file.path().to_owned(),
			..Default::default()
		}
	}

	#[test]
	fn test_parse_request() {
		let request: EvaluationRequest = serde_json::from_str(
			r#"{ "feature_name": "DOLocationID", "max_depth": 5, "tree_count": "unbounded" }"#,
		)
		.unwrap();
		assert_eq!(request.feature_name, "DOLocationID");
		assert_eq!(request.max_depth, 5);
		assert_eq!(request.tree_count, TreeCount::Unbounded);
		let request: EvaluationRequest = serde_json::from_str(r#"{ "tree_count": 200 }"#).unwrap();
		assert_eq!(request.feature_name, "PULocationID");
		assert_eq!(request.max_depth, 20);
		assert_eq!(request.tree_count, TreeCount::Bounded(200));
	}

	#[test]
	fn test_invalid_request_does_not_load_the_dataset() {
		let cache = DatasetCache::new();
		let session = Session::new(&cache, Config::default());
		let request = EvaluationRequest {
			max_depth: 0,
			..Default::default()
		};
		assert!(matches!(
			session.evaluate(&request),
			Err(Error::InvalidHyperparameter(InvalidHyperparameter::MaxDepth { .. }))
		));
		assert!(cache.is_empty());
	}

	#[test]
	fn test_sessions_share_the_cache() {
		let file = write_csv("PULocationID,DOLocationID,trip_distance\n1,4,2.0\n1,5,3.0\n2,4,1.0\n3,6,4.0\n");
		let cache = DatasetCache::new();
		let target_as_feature = Session::new(&cache, config(&file));
		let feature = Session::new(
			&cache,
			Config {
				evaluation_mode: EvaluationMode::Feature,
				..config(&file)
			},
		);
		let request = EvaluationRequest {
			max_depth: 10,
			..Default::default()
		};
		let a = target_as_feature.evaluate(&request).unwrap();
		let b = feature.evaluate(&request).unwrap();
		assert_eq!(cache.len(), 1);
		assert!(a.r2_score.is_finite());
		assert!(b.r2_score.is_finite());
		assert_eq!(
			feature.column_names().unwrap(),
			vec!["PULocationID", "DOLocationID", "trip_distance"]
		);
	}

	#[test]
	fn test_overview_uses_the_configured_limits() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n1,3.0\n2,1.0\n3,4.0\n");
		let cache = DatasetCache::new();
		let session = Session::new(
			&cache,
			Config {
				overview_rows: 2,
				value_counts_limit: 1,
				..config(&file)
			},
		);
		let overview = session.overview("PULocationID").unwrap();
		assert_eq!(overview.head, vec![vec!["1", "2"], vec!["1", "3"]]);
		assert_eq!(overview.value_counts.len(), 1);
		assert_eq!(overview.value_counts[0].value, "1");
		assert_eq!(overview.value_counts[0].count, 2);
	}

	#[test]
	fn test_configured_column_types_are_used() {
		let file = write_csv("PULocationID,trip_distance\n1,2.0\n1,3.0\n2,1.0\n3,4.0\n");
		let cache = DatasetCache::new();
		let mut column_types = BTreeMap::new();
		column_types.insert("PULocationID".to_owned(), ConfigColumnType::Text);
		let session = Session::new(
			&cache,
			Config {
				column_types: Some(column_types),
				..config(&file)
			},
		);
		let dataset = session.dataset().unwrap();
		assert!(dataset.column("PULocationID").unwrap().as_text().is_some());
		assert!(dataset.column("trip_distance").unwrap().as_number().is_some());
		assert!(matches!(
			session.evaluate(&EvaluationRequest {
				max_depth: 10,
				..Default::default()
			}),
			Err(Error::Training(TrainError::NonNumericFeature { column_name })) if column_name == "PULocationID"
		));
		// A session without overrides on the same cache still sees the inferred types.
		let inferred = Session::new(&cache, config(&file)).dataset().unwrap();
		assert!(inferred.column("PULocationID").unwrap().as_number().is_some());
	}
}
