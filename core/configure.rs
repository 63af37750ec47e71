use crate::{error::InvalidHyperparameter, Error};
use std::{fmt, str::FromStr};
use tripfit_tree::TrainOptions;

pub const MIN_MAX_DEPTH: usize = 1;
pub const MAX_MAX_DEPTH: usize = 100;
pub const ALLOWED_TREE_COUNTS: &[usize] = &[10, 50, 100, 200, 300];

pub const DEFAULT_MAX_DEPTH: usize = 20;
pub const DEFAULT_TREE_COUNT: TreeCount = TreeCount::Bounded(10);
pub const DEFAULT_FEATURE_NAME: &str = "PULocationID";

/// The number of trees in the forest. `Unbounded` leaves the choice to the forest's default. It is written as either a number or the string `"unbounded"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "TreeCountValue", into = "TreeCountValue")]
pub enum TreeCount {
	Bounded(usize),
	Unbounded,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum TreeCountValue {
	Number(usize),
	Sentinel(Sentinel),
}

#[derive(serde::Serialize, serde::Deserialize)]
enum Sentinel {
	#[serde(rename = "unbounded")]
	Unbounded,
}

impl From<TreeCountValue> for TreeCount {
	fn from(value: TreeCountValue) -> Self {
		match value {
			TreeCountValue::Number(n_trees) => TreeCount::Bounded(n_trees),
			TreeCountValue::Sentinel(Sentinel::Unbounded) => TreeCount::Unbounded,
		}
	}
}

impl From<TreeCount> for TreeCountValue {
	fn from(value: TreeCount) -> Self {
		match value {
			TreeCount::Bounded(n_trees) => TreeCountValue::Number(n_trees),
			TreeCount::Unbounded => TreeCountValue::Sentinel(Sentinel::Unbounded),
		}
	}
}

impl FromStr for TreeCount {
	type Err = InvalidHyperparameter;
	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim() {
			"unbounded" | "No limit" => Ok(TreeCount::Unbounded),
			trimmed => trimmed
				.parse()
				.map(TreeCount::Bounded)
				.map_err(|_| InvalidHyperparameter::UnparsableTreeCount(value.to_owned())),
		}
	}
}

impl fmt::Display for TreeCount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TreeCount::Bounded(n_trees) => write!(f, "{}", n_trees),
			TreeCount::Unbounded => write!(f, "unbounded"),
		}
	}
}

/// A validated set of hyperparameters. The only way to build one is `Hyperparameters::new`, so every value of this type satisfies the bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hyperparameters {
	max_depth: usize,
	tree_count: TreeCount,
}

impl Hyperparameters {
	pub fn new(max_depth: usize, tree_count: TreeCount) -> Result<Self, Error> {
		if !(MIN_MAX_DEPTH..=MAX_MAX_DEPTH).contains(&max_depth) {
			return Err(InvalidHyperparameter::MaxDepth {
				value: max_depth,
				min: MIN_MAX_DEPTH,
				max: MAX_MAX_DEPTH,
			}
			.into());
		}
		if let TreeCount::Bounded(n_trees) = tree_count {
			if !ALLOWED_TREE_COUNTS.contains(&n_trees) {
				return Err(InvalidHyperparameter::TreeCount {
					value: n_trees,
					allowed: ALLOWED_TREE_COUNTS,
				}
				.into());
			}
		}
		Ok(Self {
			max_depth,
			tree_count,
		})
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	pub fn tree_count(&self) -> TreeCount {
		self.tree_count
	}
}

impl Default for Hyperparameters {
	fn default() -> Self {
		Self {
			max_depth: DEFAULT_MAX_DEPTH,
			tree_count: DEFAULT_TREE_COUNT,
		}
	}
}

/// A regressor that has been configured but not yet trained. Training consumes it, so each configured regressor is fit exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct UnfittedRegressor {
	pub hyperparameters: Hyperparameters,
	pub train_options: TrainOptions,
}

/// Build an unfitted regressor from `hyperparameters`. A bounded tree count sets the number of trees, and an unbounded one keeps the forest's default.
pub fn configure(hyperparameters: Hyperparameters, seed: u64) -> UnfittedRegressor {
	let defaults = TrainOptions::default();
	let n_trees = match hyperparameters.tree_count {
		TreeCount::Bounded(n_trees) => n_trees,
		TreeCount::Unbounded => defaults.n_trees,
	};
	let train_options = TrainOptions {
		n_trees,
		max_depth: Some(hyperparameters.max_depth),
		seed,
		..defaults
	};
	UnfittedRegressor {
		hyperparameters,
		train_options,
	}
}

#[test]
fn test_max_depth_bounds() {
	for max_depth in [1, 10, 20, 100].iter() {
		assert!(Hyperparameters::new(*max_depth, TreeCount::Bounded(10)).is_ok());
	}
	for max_depth in [0, 101, 1000].iter() {
		assert!(matches!(
			Hyperparameters::new(*max_depth, TreeCount::Bounded(10)),
			Err(Error::InvalidHyperparameter(InvalidHyperparameter::MaxDepth { .. }))
		));
	}
}

#[test]
fn test_tree_count_must_be_allowed() {
	for n_trees in ALLOWED_TREE_COUNTS {
		assert!(Hyperparameters::new(10, TreeCount::Bounded(*n_trees)).is_ok());
	}
	for n_trees in [0, 1, 20, 301].iter() {
		assert!(matches!(
			Hyperparameters::new(10, TreeCount::Bounded(*n_trees)),
			Err(Error::InvalidHyperparameter(InvalidHyperparameter::TreeCount { .. }))
		));
	}
	assert!(Hyperparameters::new(10, TreeCount::Unbounded).is_ok());
}

#[test]
fn test_configure() {
	let bounded = configure(Hyperparameters::new(30, TreeCount::Bounded(50)).unwrap(), 7);
	assert_eq!(bounded.train_options.n_trees, 50);
	assert_eq!(bounded.train_options.max_depth, Some(30));
	assert_eq!(bounded.train_options.seed, 7);
	let unbounded = configure(Hyperparameters::new(30, TreeCount::Unbounded).unwrap(), 7);
	assert_eq!(unbounded.train_options.n_trees, TrainOptions::default().n_trees);
	assert_eq!(unbounded.train_options.max_depth, Some(30));
}

#[test]
fn test_parse_tree_count() {
	assert_eq!("200".parse::<TreeCount>(), Ok(TreeCount::Bounded(200)));
	assert_eq!("unbounded".parse::<TreeCount>(), Ok(TreeCount::Unbounded));
	assert_eq!("No limit".parse::<TreeCount>(), Ok(TreeCount::Unbounded));
	assert_eq!(
		"many".parse::<TreeCount>(),
		Err(InvalidHyperparameter::UnparsableTreeCount("many".to_owned()))
	);
	assert_eq!(TreeCount::Unbounded.to_string(), "unbounded");
	assert_eq!(TreeCount::Bounded(10).to_string(), "10");
}
