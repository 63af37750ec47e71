/*!
This module defines the `Config` struct, which controls where the dataset is loaded from and how models are trained and evaluated. A config is read from a yaml file with [`Config::from_path`](struct.Config.html#method.from_path). Every field is optional.
*/

use crate::{evaluate::EvaluationMode, select::TARGET_COLUMN_NAME, Error};
use anyhow::Context;
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

pub const DEFAULT_DATASET_PATH: &str = "input/trips.csv";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_OVERVIEW_ROWS: usize = 5;
pub const DEFAULT_VALUE_COUNTS_LIMIT: usize = 50;

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub dataset_path: PathBuf,
	pub target_column: String,
	pub seed: u64,
	pub evaluation_mode: EvaluationMode,
	pub overview_rows: usize,
	pub value_counts_limit: usize,
	pub column_types: Option<BTreeMap<String, ColumnType>>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ColumnType {
	#[serde(rename = "unknown")]
	Unknown,
	#[serde(rename = "number")]
	Number,
	#[serde(rename = "enum")]
	Enum { options: Vec<String> },
	#[serde(rename = "text")]
	Text,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
			target_column: TARGET_COLUMN_NAME.to_owned(),
			seed: DEFAULT_SEED,
			evaluation_mode: EvaluationMode::default(),
			overview_rows: DEFAULT_OVERVIEW_ROWS,
			value_counts_limit: DEFAULT_VALUE_COUNTS_LIMIT,
			column_types: None,
		}
	}
}

impl Config {
	pub fn from_path(path: &Path) -> Result<Config, Error> {
		let load = || -> anyhow::Result<Config> {
			let config = std::fs::read_to_string(path)
				.with_context(|| format!("failed to read config file {}", path.display()))?;
			let config = serde_yaml::from_str(&config)
				.with_context(|| format!("failed to parse config file {}", path.display()))?;
			Ok(config)
		};
		load().map_err(|source| Error::Config {
			path: path.to_owned(),
			source,
		})
	}

	/// The column types to pass to the csv loader, if any were configured.
	pub fn dataframe_column_types(
		&self,
	) -> Option<BTreeMap<String, tripfit_dataframe::ColumnType>> {
		self.column_types.as_ref().map(|column_types| {
			column_types
				.iter()
				.map(|(column_name, column_type)| {
					let column_type = match column_type {
						ColumnType::Unknown => tripfit_dataframe::ColumnType::Unknown,
						ColumnType::Number => tripfit_dataframe::ColumnType::Number,
						ColumnType::Enum { options } => tripfit_dataframe::ColumnType::Enum {
							options: options.clone(),
						},
						ColumnType::Text => tripfit_dataframe::ColumnType::Text,
					};
					(column_name.clone(), column_type)
				})
				.collect()
		})
	}
}

#[test]
fn test_parse_config() {
	let config: Config = serde_yaml::from_str(
		r#"
dataset_path: data/yellow_tripdata_2023-01.csv
seed: 7
evaluation_mode: feature
column_types:
  store_and_fwd_flag:
    type: enum
    options: ["N", "Y"]
  PULocationID:
    type: number
"#,
	)
	.unwrap();
	assert_eq!(
		config.dataset_path,
		PathBuf::from("data/yellow_tripdata_2023-01.csv")
	);
	assert_eq!(config.seed, 7);
	assert_eq!(config.evaluation_mode, EvaluationMode::Feature);
	assert_eq!(config.target_column, "trip_distance");
	assert_eq!(config.overview_rows, DEFAULT_OVERVIEW_ROWS);
	let column_types = config.dataframe_column_types().unwrap();
	assert_eq!(
		column_types.get("store_and_fwd_flag"),
		Some(&tripfit_dataframe::ColumnType::Enum {
			options: vec!["N".to_owned(), "Y".to_owned()]
		})
	);
	assert_eq!(
		column_types.get("PULocationID"),
		Some(&tripfit_dataframe::ColumnType::Number)
	);
}

#[test]
fn test_empty_config_is_default() {
	let config: Config = serde_yaml::from_str("{}").unwrap();
	assert_eq!(config, Config::default());
	assert_eq!(config.evaluation_mode, EvaluationMode::TargetAsFeature);
}

#[test]
fn test_unknown_fields_are_rejected() {
	assert!(serde_yaml::from_str::<Config>("max_depth: 10").is_err());
}

#[test]
fn test_missing_config_file() {
	let error = Config::from_path(Path::new("/nonexistent/tripfit.yaml")).unwrap_err();
	assert!(matches!(error, Error::Config { .. }));
}
