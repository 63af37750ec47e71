/*!
This crate implements a random forest regressor: an ensemble of regression trees, each trained on a bootstrap resample of the training examples, whose outputs are averaged to make a prediction. Splits are chosen to minimize the variance of the labels within each child.
*/

#![allow(clippy::tabs_in_doc_comments)]

use ndarray::prelude::*;
use thiserror::Error;
use tripfit_util::progress_counter::ProgressCounter;

mod regressor;
mod train;

pub use regressor::Regressor;

/// These are the options passed to `Regressor::train`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainOptions {
	/// The number of trees in the forest.
	pub n_trees: usize,
	/// The depth of a single tree will never exceed this value. If it is `None`, trees are grown until their leaves are pure or too small to split.
	pub max_depth: Option<usize>,
	/// A node will only be split if it holds at least this many training examples.
	pub min_examples_per_split: usize,
	/// A split will only be considered valid if the number of training examples sent to each of the resulting children is at least this value.
	pub min_examples_per_leaf: usize,
	/// If true, each tree is trained on a bootstrap resample of the training examples. If false, every tree sees every example.
	pub bootstrap: bool,
	/// The seed for the random number generators used to draw bootstrap resamples. Training with the same seed on the same data always produces the same forest.
	pub seed: u64,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			n_trees: 100,
			max_depth: None,
			min_examples_per_split: 2,
			min_examples_per_leaf: 1,
			bootstrap: true,
			seed: 0,
		}
	}
}

/// This enum reports the training progress.
#[derive(Debug)]
pub enum TrainProgress {
	Initializing,
	Training(ProgressCounter),
}

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
	#[error("there are no examples to train on")]
	NoExamples,
	#[error("there are no features to train on")]
	NoFeatures,
	#[error("the features have {n_rows} rows but there are {n_labels} labels")]
	LengthMismatch { n_rows: usize, n_labels: usize },
	#[error("the feature column \"{column_name}\" is not a number column")]
	NonNumericFeature { column_name: String },
	#[error("the label column \"{column_name}\" is not a number column")]
	NonNumericLabels { column_name: String },
	#[error("the feature column \"{column_name}\" has an invalid value in row {row}")]
	InvalidFeatureValue { column_name: String, row: usize },
	#[error("the label column \"{column_name}\" has an invalid value in row {row}")]
	InvalidLabel { column_name: String, row: usize },
	#[error("invalid train options: {0}")]
	InvalidOptions(&'static str),
}

/// Trees are stored as a `Vec` of `Node`s. Each branch in the tree has two indexes into the `Vec`, one for each of its children. The root is always the first node.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example.
	pub fn predict(&self, features: ArrayView1<f32>) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split: BranchSplit {
						feature_index,
						split_value,
					},
					..
				}) => {
					node_index = if features[*feature_index] <= *split_value {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				// We made it to a leaf! The prediction is the leaf's value.
				Node::Leaf(LeafNode { value, .. }) => return *value,
			}
		}
	}

	pub fn depth(&self) -> usize {
		fn depth(nodes: &[Node], index: usize) -> usize {
			match &nodes[index] {
				Node::Branch(branch) => {
					1 + depth(nodes, branch.left_child_index)
						.max(depth(nodes, branch.right_child_index))
				}
				Node::Leaf(_) => 0,
			}
		}
		depth(&self.nodes, 0)
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn examples_fraction(&self) -> f32 {
		match self {
			Self::Leaf(LeafNode {
				examples_fraction, ..
			}) => *examples_fraction,
			Self::Branch(BranchNode {
				examples_fraction, ..
			}) => *examples_fraction,
		}
	}

	pub fn as_leaf(&self) -> Option<&LeafNode> {
		match self {
			Self::Leaf(leaf) => Some(leaf),
			_ => None,
		}
	}
}

/// A `BranchNode` is a branch in a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// When making predictions, an example will be sent either to the right or left child. The `split` contains the information necessary to determine which way it will go.
	pub split: BranchSplit,
	/// The fraction of the tree's training examples that passed through this node.
	pub examples_fraction: f32,
}

/// A branch split takes the value of a single feature and compares it with `split_value`. If the value is <= `split_value`, the example is sent left, otherwise it is sent right. `NaN` values are sent right.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchSplit {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split.
	pub split_value: f32,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// This is the mean of the labels of the training examples sent to this leaf.
	pub value: f32,
	/// The fraction of the tree's training examples that were sent to this leaf.
	pub examples_fraction: f32,
}

#[test]
fn test_tree_predict() {
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit {
					feature_index: 0,
					split_value: 1.5,
				},
				examples_fraction: 1.0,
			}),
			Node::Leaf(LeafNode {
				value: 1.0,
				examples_fraction: 0.5,
			}),
			Node::Leaf(LeafNode {
				value: 3.0,
				examples_fraction: 0.5,
			}),
		],
	};
	assert_eq!(tree.predict(arr1(&[1.0]).view()), 1.0);
	assert_eq!(tree.predict(arr1(&[1.5]).view()), 1.0);
	assert_eq!(tree.predict(arr1(&[2.0]).view()), 3.0);
	assert_eq!(tree.predict(arr1(&[f32::NAN]).view()), 3.0);
	assert_eq!(tree.depth(), 1);
}
