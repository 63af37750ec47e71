use super::{mean_variance::merge_mean_m2, StreamingMetric};
use num_traits::ToPrimitive;

/// `RegressionMetrics` computes metrics used to evaluate regressors.
#[derive(Debug, Clone, Default)]
pub struct RegressionMetrics {
	mean_variance: Option<MeanVariance>,
	absolute_error: f64,
	squared_error: f64,
}

#[derive(Debug, Clone)]
struct MeanVariance {
	n: u64,
	m2: f64,
	mean: f64,
}

/// The input to [`RegressionMetrics`](struct.RegressionMetrics.html).
pub struct RegressionMetricsInput<'a> {
	pub predictions: &'a [f32],
	pub labels: &'a [f32],
}

/// The output from [`RegressionMetrics`](struct.RegressionMetrics.html).
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetricsOutput {
	/// The number of examples the metrics were computed over.
	pub n: u64,
	/// The mean absolute error is equal to the mean of the absolute value of the difference between the label and the prediction.
	pub mae: f64,
	/// The mean squared error is equal to the mean of the squared differences between the label and the prediction.
	pub mse: f64,
	/// The root mean squared error is equal to the square root of the mean squared error.
	pub rmse: f64,
	/// The r-squared value. It is `None` when the labels have zero variance, because the ratio of residual to total sum of squares is then undefined.
	pub r2: Option<f64>,
	/// The baseline mean squared error is the mean squared error if the prediction was always the mean of the labels.
	pub baseline_mse: f64,
	/// The baseline root mean squared error is the square root of the baseline mean squared error.
	pub baseline_rmse: f64,
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = RegressionMetricsOutput;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			let label = *label as f64;
			let prediction = *prediction as f64;
			match &mut self.mean_variance {
				Some(mean_variance) => {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						1,
						label,
						0.0,
					);
					mean_variance.n += 1;
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
				}
				None => {
					self.mean_variance = Some(MeanVariance {
						n: 1,
						mean: label,
						m2: 0.0,
					})
				}
			}
			let error = prediction - label;
			self.absolute_error += error.abs();
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		match &mut self.mean_variance {
			Some(mean_variance) => {
				if let Some(other) = other.mean_variance {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						other.n,
						other.mean,
						other.m2,
					);
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
					mean_variance.n += other.n;
				}
			}
			None => {
				self.mean_variance = other.mean_variance;
			}
		}
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let (n, m2) = match self.mean_variance {
			Some(m) => (m.n, m.m2),
			None => (0, f64::NAN),
		};
		let n_f64 = n.to_f64().unwrap_or(0.0);
		let mae = self.absolute_error / n_f64;
		let mse = self.squared_error / n_f64;
		let rmse = mse.sqrt();
		let r2 = if n > 0 && m2 > 0.0 {
			Some(1.0 - self.squared_error / m2)
		} else {
			None
		};
		let baseline_mse = m2 / n_f64;
		let baseline_rmse = baseline_mse.sqrt();
		RegressionMetricsOutput {
			n,
			mae,
			mse,
			rmse,
			r2,
			baseline_mse,
			baseline_rmse,
		}
	}
}

#[test]
fn test_regression_metrics() {
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &[2.5, 0.0, 2.0, 8.0],
		labels: &[3.0, -0.5, 2.0, 7.0],
	});
	let output = metrics.finalize();
	assert_eq!(output.n, 4);
	assert!((output.mae - 0.5).abs() < 1e-9);
	assert!((output.mse - 0.375).abs() < 1e-9);
	assert!((output.rmse - 0.375f64.sqrt()).abs() < 1e-9);
	assert!((output.r2.unwrap() - (1.0 - 1.5 / 29.1875)).abs() < 1e-9);
	assert!((output.baseline_mse - 7.296875).abs() < 1e-9);
}

#[test]
fn test_merge_matches_single_update() {
	let predictions = [1.0, 2.0, 3.0, 4.5, 5.0];
	let labels = [1.5, 2.0, 2.0, 4.0, 6.0];
	let mut single = RegressionMetrics::default();
	single.update(RegressionMetricsInput {
		predictions: &predictions,
		labels: &labels,
	});
	let mut left = RegressionMetrics::default();
	left.update(RegressionMetricsInput {
		predictions: &predictions[..2],
		labels: &labels[..2],
	});
	let mut right = RegressionMetrics::default();
	right.update(RegressionMetricsInput {
		predictions: &predictions[2..],
		labels: &labels[2..],
	});
	left.merge(right);
	let single = single.finalize();
	let merged = left.finalize();
	assert_eq!(single.n, merged.n);
	assert!((single.mae - merged.mae).abs() < 1e-12);
	assert!((single.mse - merged.mse).abs() < 1e-12);
	assert!((single.r2.unwrap() - merged.r2.unwrap()).abs() < 1e-12);
}

#[test]
fn test_constant_labels_have_no_r2() {
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &[1.0, 2.0, 3.0],
		labels: &[2.0, 2.0, 2.0],
	});
	let output = metrics.finalize();
	assert_eq!(output.r2, None);
	assert!((output.mae - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_empty_input() {
	let output = RegressionMetrics::default().finalize();
	assert_eq!(output.n, 0);
	assert_eq!(output.r2, None);
	assert!(output.mse.is_nan());
}
