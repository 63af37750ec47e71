use crate::{
	train::{train_tree, TrainTreeOutput},
	TrainError, TrainOptions, TrainProgress, Tree,
};
use ndarray::{prelude::*, Zip};
use num_traits::ToPrimitive;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use tripfit_dataframe::{ColumnView, DataFrameView};
use tripfit_util::progress_counter::ProgressCounter;

/// `Regressor`s predict continuous target values, for example the distance of a taxi trip.
#[derive(Clone, Debug, PartialEq)]
pub struct Regressor {
	/// The number of features the model was trained on. The features passed to `predict` must have this many columns.
	pub n_features: usize,
	/// The trees for this model.
	pub trees: Vec<Tree>,
	/// The importance of each feature as measured by the decrease in the sum of squared errors of the splits that used it, normalized to sum to one.
	pub feature_importances: Vec<f32>,
}

impl Regressor {
	/// Train a regressor.
	pub fn train(
		features: DataFrameView,
		labels: ColumnView,
		train_options: &TrainOptions,
		update_progress: &mut dyn FnMut(TrainProgress),
	) -> Result<Regressor, TrainError> {
		update_progress(TrainProgress::Initializing);
		check_options(train_options)?;
		let labels_column_name = labels.name();
		let labels = labels
			.as_number()
			.ok_or_else(|| TrainError::NonNumericLabels {
				column_name: labels_column_name.to_owned(),
			})?
			.data;
		if features.ncols() == 0 {
			return Err(TrainError::NoFeatures);
		}
		if let Some(column) = features
			.columns
			.iter()
			.find(|column| column.as_number().is_none())
		{
			return Err(TrainError::NonNumericFeature {
				column_name: column.name().to_owned(),
			});
		}
		let n_rows = features.nrows();
		if n_rows != labels.len() {
			return Err(TrainError::LengthMismatch {
				n_rows,
				n_labels: labels.len(),
			});
		}
		if n_rows == 0 {
			return Err(TrainError::NoExamples);
		}
		for column in features.columns.iter() {
			if let Some(column) = column.as_number() {
				if let Some(row) = column.data.iter().position(|value| !value.is_finite()) {
					return Err(TrainError::InvalidFeatureValue {
						column_name: column.name.to_owned(),
						row,
					});
				}
			}
		}
		if let Some(row) = labels.iter().position(|value| !value.is_finite()) {
			return Err(TrainError::InvalidLabel {
				column_name: labels_column_name.to_owned(),
				row,
			});
		}
		let features = features.to_rows_f32().ok_or(TrainError::NoFeatures)?;
		let labels = ArrayView1::from(labels);
		Ok(Self::train_array(
			features.view(),
			labels,
			train_options,
			update_progress,
		))
	}

	/// Train trees in parallel. Each tree draws its bootstrap resample from its own random number generator seeded with the forest's seed and the tree's index, so the result does not depend on how the trees are scheduled.
	fn train_array(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		train_options: &TrainOptions,
		update_progress: &mut dyn FnMut(TrainProgress),
	) -> Regressor {
		let n_examples = features.nrows();
		let n_features = features.ncols();
		let progress_counter = ProgressCounter::new(train_options.n_trees.to_u64().unwrap_or(0));
		update_progress(TrainProgress::Training(progress_counter.clone()));
		let outputs: Vec<TrainTreeOutput> = (0..train_options.n_trees)
			.into_par_iter()
			.map(|tree_index| {
				let examples_index = if train_options.bootstrap {
					let seed = train_options
						.seed
						.wrapping_add(tree_index.to_u64().unwrap_or(0));
					let mut rng = Xoshiro256Plus::seed_from_u64(seed);
					(0..n_examples)
						.map(|_| rng.gen_range(0, n_examples))
						.collect()
				} else {
					(0..n_examples).collect()
				};
				let output = train_tree(features, labels, examples_index, train_options);
				progress_counter.inc(1);
				output
			})
			.collect();
		let mut feature_importances = vec![0.0f64; n_features];
		let mut trees = Vec::with_capacity(outputs.len());
		for output in outputs {
			for (total, importance) in feature_importances
				.iter_mut()
				.zip(output.feature_importances.iter())
			{
				*total += importance;
			}
			trees.push(output.tree);
		}
		let total_importance: f64 = feature_importances.iter().sum();
		let feature_importances = feature_importances
			.into_iter()
			.map(|importance| {
				if total_importance > 0.0 {
					(importance / total_importance) as f32
				} else {
					0.0
				}
			})
			.collect();
		Regressor {
			n_features,
			trees,
			feature_importances,
		}
	}

	/// Make predictions. Each prediction is the mean of the trees' outputs for that row of `features`.
	pub fn predict(&self, features: ArrayView2<f32>, mut predictions: ArrayViewMut1<f32>) {
		let n_trees = self.trees.len().to_f32().unwrap_or(1.0);
		Zip::from(&mut predictions)
			.and(features.genrows())
			.par_apply(|prediction, features| {
				let sum: f32 = self.trees.iter().map(|tree| tree.predict(features)).sum();
				*prediction = sum / n_trees;
			});
	}
}

fn check_options(train_options: &TrainOptions) -> Result<(), TrainError> {
	if train_options.n_trees == 0 {
		return Err(TrainError::InvalidOptions("n_trees must be positive"));
	}
	if train_options.max_depth == Some(0) {
		return Err(TrainError::InvalidOptions("max_depth must be positive"));
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use tripfit_dataframe::{Column, DataFrame, NumberColumn, TextColumn};

	fn dataframe(feature: Vec<f32>, labels: Vec<f32>) -> DataFrame {
		DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "PULocationID".to_owned(),
					data: feature,
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: labels,
				}),
			],
		}
	}

	fn train(dataframe: &DataFrame, options: &TrainOptions) -> Result<Regressor, TrainError> {
		let view = dataframe.view();
		let features = DataFrameView {
			columns: vec![view.columns[0].clone()],
		};
		Regressor::train(features, view.columns[1].clone(), options, &mut |_| {})
	}

	#[test]
	fn test_same_seed_same_forest() {
		let dataframe = dataframe(
			vec![1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
			vec![2.0, 3.0, 1.0, 4.0, 2.5, 7.0, 1.0, 3.5],
		);
		let options = TrainOptions {
			n_trees: 10,
			max_depth: Some(10),
			seed: 42,
			..Default::default()
		};
		let a = train(&dataframe, &options).unwrap();
		let b = train(&dataframe, &options).unwrap();
		assert_eq!(a, b);
		assert_eq!(a.trees.len(), 10);
	}

	#[test]
	fn test_without_bootstrap_fits_training_data() {
		let dataframe = dataframe(vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 3.0, 1.0, 4.0]);
		let options = TrainOptions {
			n_trees: 3,
			bootstrap: false,
			..Default::default()
		};
		let model = train(&dataframe, &options).unwrap();
		let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
		let mut predictions = Array1::zeros(4);
		model.predict(features.view(), predictions.view_mut());
		assert_eq!(predictions, arr1(&[2.0, 3.0, 1.0, 4.0]));
		assert_eq!(model.feature_importances, vec![1.0]);
	}

	#[test]
	fn test_progress_is_reported() {
		let dataframe = dataframe(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]);
		let options = TrainOptions {
			n_trees: 5,
			..Default::default()
		};
		let mut counter = None;
		let view = dataframe.view();
		let features = DataFrameView {
			columns: vec![view.columns[0].clone()],
		};
		Regressor::train(features, view.columns[1].clone(), &options, &mut |progress| {
			if let TrainProgress::Training(progress_counter) = progress {
				counter = Some(progress_counter);
			}
		})
		.unwrap();
		let counter = counter.unwrap();
		assert_eq!(counter.get(), 5);
		assert_eq!(counter.total(), 5);
	}

	#[test]
	fn test_text_feature_is_rejected() {
		let dataframe = DataFrame {
			columns: vec![
				Column::Text(TextColumn {
					name: "zone".to_owned(),
					data: vec!["JFK".to_owned(), "LGA".to_owned()],
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: vec![1.0, 2.0],
				}),
			],
		};
		assert_eq!(
			train(&dataframe, &TrainOptions::default()),
			Err(TrainError::NonNumericFeature {
				column_name: "zone".to_owned()
			})
		);
	}

	#[test]
	fn test_invalid_input_is_rejected() {
		let dataframe_with_nan = dataframe(vec![1.0, f32::NAN], vec![1.0, 2.0]);
		assert_eq!(
			train(&dataframe_with_nan, &TrainOptions::default()),
			Err(TrainError::InvalidFeatureValue {
				column_name: "PULocationID".to_owned(),
				row: 1
			})
		);
		let label_with_nan = dataframe(vec![1.0, 2.0], vec![f32::NAN, 2.0]);
		assert_eq!(
			train(&label_with_nan, &TrainOptions::default()),
			Err(TrainError::InvalidLabel {
				column_name: "trip_distance".to_owned(),
				row: 0
			})
		);
		let empty = dataframe(vec![], vec![]);
		assert_eq!(
			train(&empty, &TrainOptions::default()),
			Err(TrainError::NoExamples)
		);
		let options = TrainOptions {
			n_trees: 0,
			..Default::default()
		};
		assert!(matches!(
			train(&dataframe(vec![1.0], vec![1.0]), &options),
			Err(TrainError::InvalidOptions(_))
		));
	}
}
