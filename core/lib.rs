/*!
This crate trains random forest regressors that predict the distance of a taxi trip from a single column of the trip record dataset, and reports how well they fit.

The pipeline runs in four steps, each in its own module:

1. [`cache`](cache/index.html) loads the dataset once per path and shares it afterwards.
2. [`select`](select/index.html) picks the feature column and the target column.
3. [`configure`](configure/index.html) validates the hyperparameters and builds an unfitted regressor.
4. [`evaluate`](evaluate/index.html) fits the regressor and computes its mean absolute error, mean squared error, and r2 score.

[`Session`](session/struct.Session.html) runs all four for one request.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod cache;
pub mod config;
pub mod configure;
mod error;
pub mod evaluate;
pub mod overview;
pub mod select;
pub mod session;

pub use self::{
	cache::DatasetCache,
	config::Config,
	configure::{configure, Hyperparameters, TreeCount, UnfittedRegressor},
	error::{Error, InvalidHyperparameter},
	evaluate::{evaluate, fit, train_and_evaluate, EvaluationMode, MetricReport},
	overview::{overview, Overview},
	select::{select, FeatureTargetPair},
	session::{EvaluationRequest, Session},
};
