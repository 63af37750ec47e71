use crate::{configure::UnfittedRegressor, select::FeatureTargetPair, Error};
use ndarray::prelude::*;
use tripfit_dataframe::{ColumnView, DataFrameView};
use tripfit_metrics::{RegressionMetrics, RegressionMetricsInput, StreamingMetric};
use tripfit_tree::{Regressor, TrainError, TrainProgress};

/**
Which values are fed to the fitted model to produce the predictions that are scored.

`TargetAsFeature` is the default. It predicts on the target column as if it were the feature column, which is how the taxi dashboard has always computed its metrics. The resulting metrics do not measure how well the feature predicts the target. `Feature` predicts on the feature column, which is the usual in-sample evaluation.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
	TargetAsFeature,
	Feature,
}

impl Default for EvaluationMode {
	fn default() -> Self {
		EvaluationMode::TargetAsFeature
	}
}

/// The metrics shown after each evaluation. They are computed on the same rows the model was fit on.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct MetricReport {
	pub mean_absolute_error: f64,
	pub mean_squared_error: f64,
	pub r2_score: f64,
}

/// Fit `model` on the pair's feature column against its target column.
pub fn fit(model: UnfittedRegressor, pair: &FeatureTargetPair) -> Result<Regressor, Error> {
	let UnfittedRegressor {
		hyperparameters,
		train_options,
	} = model;
	log::info!(
		"training a random forest on \"{}\" with max_depth {} and {} trees",
		pair.x.name(),
		hyperparameters.max_depth(),
		train_options.n_trees,
	);
	let features = DataFrameView {
		columns: vec![pair.x.clone()],
	};
	let regressor = Regressor::train(
		features,
		pair.y.clone(),
		&train_options,
		&mut |progress| {
			if let TrainProgress::Training(progress_counter) = progress {
				log::debug!("training {} trees", progress_counter.total());
			}
		},
	)?;
	Ok(regressor)
}

/**
Score `model` against the pair's target column. The predictions are made on the column `mode` selects. This does not modify the model, so calling it twice with the same arguments produces the same report.
*/
pub fn evaluate(
	model: &Regressor,
	pair: &FeatureTargetPair,
	mode: EvaluationMode,
) -> Result<MetricReport, Error> {
	let input_column = match mode {
		EvaluationMode::TargetAsFeature => &pair.y,
		EvaluationMode::Feature => &pair.x,
	};
	let labels = number_data(&pair.y).ok_or_else(|| TrainError::NonNumericLabels {
		column_name: pair.y.name().to_owned(),
	})?;
	let input = number_data(input_column).ok_or_else(|| TrainError::NonNumericFeature {
		column_name: input_column.name().to_owned(),
	})?;
	let length_mismatch = || TrainError::LengthMismatch {
		n_rows: input.len(),
		n_labels: labels.len(),
	};
	if input.len() != labels.len() {
		return Err(length_mismatch().into());
	}
	let features =
		ArrayView2::from_shape((input.len(), 1), input).map_err(|_| length_mismatch())?;
	let mut predictions = vec![0.0; labels.len()];
	model.predict(features, ArrayViewMut1::from(predictions.as_mut_slice()));
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &predictions,
		labels,
	});
	let metrics = metrics.finalize();
	let r2_score = match metrics.r2 {
		Some(r2) => r2,
		None => {
			log::warn!(
				"the target column \"{}\" has zero variance, so the r2 score is undefined",
				pair.y.name()
			);
			return Err(Error::DegenerateMetric);
		}
	};
	let report = MetricReport {
		mean_absolute_error: metrics.mae,
		mean_squared_error: metrics.mse,
		r2_score,
	};
	log::info!(
		"mean absolute error {}, mean squared error {}, r2 score {}",
		report.mean_absolute_error,
		report.mean_squared_error,
		report.r2_score,
	);
	Ok(report)
}

/// Fit `model` on `pair` and score it. The fitted model is dropped once the report is computed.
pub fn train_and_evaluate(
	model: UnfittedRegressor,
	pair: &FeatureTargetPair,
	mode: EvaluationMode,
) -> Result<MetricReport, Error> {
	let regressor = fit(model, pair)?;
	evaluate(&regressor, pair, mode)
}

fn number_data<'a>(column: &ColumnView<'a>) -> Option<&'a [f32]> {
	column.as_number().map(|column| column.data)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		configure::{configure, Hyperparameters, TreeCount},
		select::{select, TARGET_COLUMN_NAME},
	};
	use tripfit_dataframe::{Column, DataFrame, NumberColumn, TextColumn};

	fn dataset(feature: Vec<f32>, target: Vec<f32>) -> DataFrame {
		DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "PULocationID".to_owned(),
					data: feature,
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: target,
				}),
			],
		}
	}

	fn model(max_depth: usize, tree_count: TreeCount) -> UnfittedRegressor {
		configure(Hyperparameters::new(max_depth, tree_count).unwrap(), 42)
	}

	#[test]
	fn test_evaluate_is_repeatable() {
		let dataset = dataset(vec![1.0, 1.0, 2.0, 3.0], vec![2.0, 3.0, 1.0, 4.0]);
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		let regressor = fit(model(10, TreeCount::Bounded(10)), &pair).unwrap();
		for mode in [EvaluationMode::TargetAsFeature, EvaluationMode::Feature].iter() {
			let a = evaluate(&regressor, &pair, *mode).unwrap();
			let b = evaluate(&regressor, &pair, *mode).unwrap();
			assert_eq!(a, b);
			assert!(a.mean_absolute_error.is_finite());
			assert!(a.mean_squared_error.is_finite());
			assert!(a.r2_score.is_finite());
		}
	}

	#[test]
	fn test_same_seed_same_report() {
		let dataset = dataset(
			vec![1.0, 1.0, 2.0, 3.0, 5.0, 8.0],
			vec![2.0, 3.0, 1.0, 4.0, 9.0, 0.5],
		);
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		let a = train_and_evaluate(model(20, TreeCount::Bounded(50)), &pair, EvaluationMode::Feature)
			.unwrap();
		let b = train_and_evaluate(model(20, TreeCount::Bounded(50)), &pair, EvaluationMode::Feature)
			.unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_feature_mode_fits_a_separable_dataset() {
		// Every feature value maps to exactly one target value, so each tree reproduces the target for every value it saw.
		let feature: Vec<f32> = (0..40).map(|i| (i % 4) as f32).collect();
		let target: Vec<f32> = feature.iter().map(|value| value * 2.0 + 1.0).collect();
		let dataset = dataset(feature, target);
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		let report = train_and_evaluate(
			model(100, TreeCount::Bounded(100)),
			&pair,
			EvaluationMode::Feature,
		)
		.unwrap();
		assert!(report.r2_score > 0.95);
		assert!(report.mean_absolute_error < 0.5);
	}

	#[test]
	fn test_target_as_feature_predicts_on_the_target() {
		// With one tree grown on every example, predicting on the target column is the same as predicting with the target values as feature values.
		let dataset = dataset(vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 3.0, 2.0, 1.0]);
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		let mut model = model(10, TreeCount::Bounded(10));
		model.train_options.n_trees = 1;
		model.train_options.bootstrap = false;
		let regressor = fit(model, &pair).unwrap();
		let feature_report = evaluate(&regressor, &pair, EvaluationMode::Feature).unwrap();
		assert_eq!(feature_report.mean_squared_error, 0.0);
		assert_eq!(feature_report.r2_score, 1.0);
		// The model maps 1 -> 4, 2 -> 3, 3 -> 2, 4 -> 1, so feeding it the targets 4, 3, 2, 1 reproduces 1, 2, 3, 4.
		let target_report = evaluate(&regressor, &pair, EvaluationMode::TargetAsFeature).unwrap();
		assert_eq!(target_report.mean_absolute_error, 2.0);
		assert_eq!(target_report.mean_squared_error, 5.0);
		assert!((target_report.r2_score - -3.0).abs() < 1e-9);
	}

	#[test]
	fn test_constant_target_is_degenerate() {
		let dataset = dataset(vec![1.0, 2.0, 3.0], vec![2.5, 2.5, 2.5]);
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		let result = train_and_evaluate(
			model(10, TreeCount::Bounded(10)),
			&pair,
			EvaluationMode::TargetAsFeature,
		);
		assert!(matches!(result, Err(Error::DegenerateMetric)));
	}

	#[test]
	fn test_text_feature_fails_to_train() {
		let dataset = DataFrame {
			columns: vec![
				Column::Text(TextColumn {
					name: "tpep_pickup_datetime".to_owned(),
					data: vec!["2023-01-01 00:32:10".to_owned(), "2023-01-01 00:55:08".to_owned()],
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: vec![0.97, 1.1],
				}),
			],
		};
		let pair = select(&dataset, "tpep_pickup_datetime", TARGET_COLUMN_NAME).unwrap();
		let result = train_and_evaluate(
			model(10, TreeCount::Bounded(10)),
			&pair,
			EvaluationMode::TargetAsFeature,
		);
		assert!(matches!(
			result,
			Err(Error::Training(TrainError::NonNumericFeature { .. }))
		));
	}

	#[test]
	fn test_report_serializes() {
		let report = MetricReport {
			mean_absolute_error: 0.5,
			mean_squared_error: 0.25,
			r2_score: 0.75,
		};
		insta::assert_snapshot!(serde_json::to_string(&report).unwrap(), @r###"{"mean_absolute_error":0.5,"mean_squared_error":0.25,"r2_score":0.75}"###);
	}
}
