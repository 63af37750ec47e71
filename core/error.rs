use std::path::PathBuf;
use thiserror::Error;

/// The errors the training and evaluation pipeline can produce. None of them are transient, so callers should show them rather than retry.
#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to read the dataset at {}", .path.display())]
	FileAccess {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},
	#[error("there is no column named \"{0}\"")]
	ColumnNotFound(String),
	#[error(transparent)]
	InvalidHyperparameter(#[from] InvalidHyperparameter),
	#[error("failed to train the model")]
	Training(#[from] tripfit_tree::TrainError),
	#[error("the r2 score is undefined because the target column has zero variance")]
	DegenerateMetric,
	#[error("failed to load the config at {}", .path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidHyperparameter {
	#[error("max_depth must be between {min} and {max} but it was {value}")]
	MaxDepth {
		value: usize,
		min: usize,
		max: usize,
	},
	#[error("the tree count must be one of {allowed:?} or unbounded but it was {value}")]
	TreeCount {
		value: usize,
		allowed: &'static [usize],
	},
	#[error("\"{0}\" is neither a tree count nor \"unbounded\"")]
	UnparsableTreeCount(String),
}
