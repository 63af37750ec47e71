use crate::{BranchNode, BranchSplit, LeafNode, Node, TrainOptions, Tree};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::{cmp::Ordering, ops::Range};

/// The output of training a single tree.
pub struct TrainTreeOutput {
	pub tree: Tree,
	/// For each feature, the total decrease in the sum of squared errors from the splits that used it.
	pub feature_importances: Vec<f64>,
}

struct QueueItem {
	node_index: usize,
	examples_range: Range<usize>,
	depth: usize,
}

struct SplitCandidate {
	feature_index: usize,
	split_value: f32,
	/// The decrease in the sum of squared errors achieved by the split.
	gain: f64,
}

/**
Train a single regression tree on the examples in `examples_index`. The same example may appear more than once in `examples_index` when it was drawn from a bootstrap resample.

Nodes are expanded depth first. A node becomes a leaf when it reaches `max_depth`, holds fewer than `min_examples_per_split` examples, has labels that are all equal, or has no split that sends at least `min_examples_per_leaf` examples to each child and reduces the sum of squared errors.
*/
pub fn train_tree(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	mut examples_index: Vec<usize>,
	options: &TrainOptions,
) -> TrainTreeOutput {
	let n_examples = examples_index.len();
	let n_examples_f32 = n_examples.to_f32().unwrap_or(1.0);
	let mut feature_importances = vec![0.0; features.ncols()];
	let mut nodes = vec![placeholder_node()];
	let mut queue = vec![QueueItem {
		node_index: 0,
		examples_range: 0..n_examples,
		depth: 0,
	}];
	// Scratch space reused when sorting the examples in a node by a feature's value.
	let mut sorted: Vec<(f32, f32)> = Vec::with_capacity(n_examples);
	while let Some(QueueItem {
		node_index,
		examples_range,
		depth,
	}) = queue.pop()
	{
		let node_examples = &examples_index[examples_range.clone()];
		let examples_fraction = node_examples.len().to_f32().unwrap_or(0.0) / n_examples_f32;
		let sum: f64 = node_examples
			.iter()
			.map(|index| labels[*index] as f64)
			.sum();
		let n = node_examples.len().to_f64().unwrap_or(0.0);
		let mean = sum / n;
		let leaf = Node::Leaf(LeafNode {
			value: mean as f32,
			examples_fraction,
		});
		let reached_max_depth = options
			.max_depth
			.map(|max_depth| depth >= max_depth)
			.unwrap_or(false);
		let too_small = node_examples.len() < options.min_examples_per_split.max(2);
		let first_label = labels[node_examples[0]];
		let pure = node_examples
			.iter()
			.all(|index| labels[*index] == first_label);
		if reached_max_depth || too_small || pure {
			nodes[node_index] = leaf;
			continue;
		}
		let parent_score = sum * sum / n;
		let best_split = choose_best_split(
			features,
			labels,
			node_examples,
			parent_score,
			options.min_examples_per_leaf.max(1),
			&mut sorted,
		);
		let SplitCandidate {
			feature_index,
			split_value,
			gain,
		} = match best_split {
			Some(split) => split,
			None => {
				nodes[node_index] = leaf;
				continue;
			}
		};
		feature_importances[feature_index] += gain;
		let split_index = partition_examples(
			features.column(feature_index),
			&mut examples_index[examples_range.clone()],
			split_value,
		);
		let left_child_index = nodes.len();
		let right_child_index = left_child_index + 1;
		nodes.push(placeholder_node());
		nodes.push(placeholder_node());
		nodes[node_index] = Node::Branch(BranchNode {
			left_child_index,
			right_child_index,
			split: BranchSplit {
				feature_index,
				split_value,
			},
			examples_fraction,
		});
		let split_index = examples_range.start + split_index;
		// Push the right child first so the left child is expanded next.
		queue.push(QueueItem {
			node_index: right_child_index,
			examples_range: split_index..examples_range.end,
			depth: depth + 1,
		});
		queue.push(QueueItem {
			node_index: left_child_index,
			examples_range: examples_range.start..split_index,
			depth: depth + 1,
		});
	}
	TrainTreeOutput {
		tree: Tree { nodes },
		feature_importances,
	}
}

fn placeholder_node() -> Node {
	Node::Leaf(LeafNode {
		value: 0.0,
		examples_fraction: 0.0,
	})
}

/**
Find the split over all features that maximizes the decrease in the sum of squared errors. Minimizing the children's sum of squared errors is equivalent to maximizing `sum_left^2 / n_left + sum_right^2 / n_right`, so that is the score compared against the parent's `sum^2 / n`. Candidate thresholds are the midpoints between consecutive distinct values. When two candidates have equal gain, the first one found wins.
*/
fn choose_best_split(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	node_examples: &[usize],
	parent_score: f64,
	min_examples_per_leaf: usize,
	sorted: &mut Vec<(f32, f32)>,
) -> Option<SplitCandidate> {
	let n_examples = node_examples.len();
	let mut best: Option<SplitCandidate> = None;
	for (feature_index, feature) in features.gencolumns().into_iter().enumerate() {
		sorted.clear();
		sorted.extend(
			node_examples
				.iter()
				.map(|index| (feature[*index], labels[*index])),
		);
		sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
		let total: f64 = sorted.iter().map(|(_, label)| *label as f64).sum();
		let mut left_sum = 0.0;
		for (left_count, window) in (1..n_examples).zip(sorted.windows(2)) {
			let (value, label) = window[0];
			let next_value = window[1].0;
			left_sum += label as f64;
			// Examples with equal values cannot be separated.
			if value >= next_value {
				continue;
			}
			let right_count = n_examples - left_count;
			if left_count < min_examples_per_leaf || right_count < min_examples_per_leaf {
				continue;
			}
			let right_sum = total - left_sum;
			let left_count_f64 = left_count.to_f64().unwrap_or(0.0);
			let right_count_f64 = right_count.to_f64().unwrap_or(0.0);
			let score = left_sum * left_sum / left_count_f64 + right_sum * right_sum / right_count_f64;
			let gain = score - parent_score;
			let is_better = match &best {
				Some(best) => gain > best.gain,
				None => gain > 0.0,
			};
			if is_better {
				best = Some(SplitCandidate {
					feature_index,
					split_value: midpoint(value, next_value),
					gain,
				});
			}
		}
	}
	best
}

/// The midpoint of `a` and `b` may round up to `b`, in which case `a` is used so that `b` is still sent right.
fn midpoint(a: f32, b: f32) -> f32 {
	let midpoint = a + (b - a) / 2.0;
	if midpoint >= b || !midpoint.is_finite() {
		a
	} else {
		midpoint
	}
}

/// Rearrange `examples_index` so that the examples sent left come first, preserving their relative order, and return the number sent left.
fn partition_examples(
	feature: ArrayView1<f32>,
	examples_index: &mut [usize],
	split_value: f32,
) -> usize {
	let (left, right): (Vec<usize>, Vec<usize>) = examples_index
		.iter()
		.partition(|index| feature[**index] <= split_value);
	let n_left = left.len();
	for (slot, index) in examples_index.iter_mut().zip(left.into_iter().chain(right)) {
		*slot = index;
	}
	n_left
}

#[test]
fn test_train_tree_separates_two_groups() {
	let features = arr2(&[[1.0], [1.0], [2.0], [3.0]]);
	let labels = arr1(&[2.0, 2.0, 6.0, 6.0]);
	let output = train_tree(
		features.view(),
		labels.view(),
		vec![0, 1, 2, 3],
		&TrainOptions::default(),
	);
	let tree = output.tree;
	assert_eq!(tree.nodes.len(), 3);
	match &tree.nodes[0] {
		Node::Branch(branch) => assert_eq!(branch.split.split_value, 1.5),
		_ => panic!("expected a branch"),
	}
	assert_eq!(tree.predict(arr1(&[1.0]).view()), 2.0);
	assert_eq!(tree.predict(arr1(&[2.5]).view()), 6.0);
	assert!((output.feature_importances[0] - 16.0).abs() < 1e-9);
}

#[test]
fn test_train_tree_respects_max_depth() {
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]]);
	let labels = arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
	let options = TrainOptions {
		max_depth: Some(2),
		..Default::default()
	};
	let output = train_tree(features.view(), labels.view(), (0..8).collect(), &options);
	assert_eq!(output.tree.depth(), 2);
	let unbounded = train_tree(
		features.view(),
		labels.view(),
		(0..8).collect(),
		&TrainOptions::default(),
	);
	assert_eq!(unbounded.tree.depth(), 3);
	for (value, label) in features.column(0).iter().zip(labels.iter()) {
		assert_eq!(unbounded.tree.predict(arr1(&[*value]).view()), *label);
	}
}

#[test]
fn test_train_tree_with_duplicated_examples() {
	let features = arr2(&[[1.0], [2.0], [3.0]]);
	let labels = arr1(&[1.0, 1.0, 4.0]);
	let output = train_tree(
		features.view(),
		labels.view(),
		vec![2, 0, 2, 0],
		&TrainOptions::default(),
	);
	let leaves: Vec<f32> = output
		.tree
		.nodes
		.iter()
		.filter_map(|node| node.as_leaf().map(|leaf| leaf.value))
		.collect();
	assert_eq!(leaves, vec![1.0, 4.0]);
	// The split lies between the only two values present in the resample.
	assert_eq!(output.tree.predict(arr1(&[2.0]).view()), 1.0);
}

#[test]
fn test_train_tree_constant_labels_is_a_leaf() {
	let features = arr2(&[[1.0], [2.0], [3.0]]);
	let labels = arr1(&[5.0, 5.0, 5.0]);
	let output = train_tree(
		features.view(),
		labels.view(),
		vec![0, 1, 2],
		&TrainOptions::default(),
	);
	assert_eq!(output.tree.nodes.len(), 1);
	assert_eq!(output.tree.predict(arr1(&[10.0]).view()), 5.0);
}

#[test]
fn test_midpoint() {
	assert_eq!(midpoint(1.0, 2.0), 1.5);
	let a = 1.0f32;
	let b = f32::from_bits(a.to_bits() + 1);
	assert_eq!(midpoint(a, b), a);
}
