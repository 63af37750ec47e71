use super::*;
use fnv::FnvHashMap;
use std::cmp::Reverse;
use tripfit_util::finite::{Finite, ToFinite};

/// The number of rows that hold a particular value in a column.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueCount {
	pub value: String,
	pub count: usize,
}

impl<'a> ColumnView<'a> {
	/**
	Count the occurrences of each distinct valid value in this column. The counts are sorted from most to least frequent. Values with equal counts are ordered by value: numerically for number columns, by option order for enum columns, and lexicographically for text columns. Invalid values are not counted.
	*/
	pub fn value_counts(&self) -> Vec<ValueCount> {
		match self {
			ColumnView::Unknown(_) => Vec::new(),
			ColumnView::Number(column) => {
				let mut counts: FnvHashMap<Finite<f32>, usize> = FnvHashMap::default();
				for value in column.data.iter() {
					if let Ok(value) = value.to_finite() {
						*counts.entry(value).or_insert(0) += 1;
					}
				}
				let mut counts: Vec<(Finite<f32>, usize)> = counts.into_iter().collect();
				counts.sort_by_key(|(value, count)| (Reverse(*count), *value));
				counts
					.into_iter()
					.map(|(value, count)| ValueCount {
						value: value.to_string(),
						count,
					})
					.collect()
			}
			ColumnView::Enum(column) => {
				let mut counts = vec![0; column.options.len()];
				for value in column.data.iter().flatten() {
					if let Some(count) = counts.get_mut(value.get() - 1) {
						*count += 1;
					}
				}
				let mut counts: Vec<(usize, usize)> = counts
					.into_iter()
					.enumerate()
					.filter(|(_, count)| *count > 0)
					.collect();
				counts.sort_by_key(|(index, count)| (Reverse(*count), *index));
				counts
					.into_iter()
					.map(|(index, count)| ValueCount {
						value: column.options[index].clone(),
						count,
					})
					.collect()
			}
			ColumnView::Text(column) => {
				let mut counts: FnvHashMap<&str, usize> = FnvHashMap::default();
				for value in column.data.iter() {
					*counts.entry(value.as_str()).or_insert(0) += 1;
				}
				let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
				counts.sort_by_key(|(value, count)| (Reverse(*count), *value));
				counts
					.into_iter()
					.map(|(value, count)| ValueCount {
						value: value.to_owned(),
						count,
					})
					.collect()
			}
		}
	}
}

#[test]
fn test_number_value_counts() {
	let data = [132.0, 138.0, 132.0, f32::NAN, 161.0, 138.0, 132.0, 4.0];
	let column = ColumnView::Number(NumberColumnView {
		name: "PULocationID",
		data: &data,
	});
	let counts = column.value_counts();
	insta::assert_debug_snapshot!(counts, @r###"
 [
     ValueCount {
         value: "132",
         count: 3,
     },
     ValueCount {
         value: "138",
         count: 2,
     },
     ValueCount {
         value: "4",
         count: 1,
     },
     ValueCount {
         value: "161",
         count: 1,
     },
 ]
 "###);
}

#[test]
fn test_enum_value_counts() {
	let options = vec!["N".to_owned(), "Y".to_owned()];
	let data = [
		NonZeroUsize::new(2),
		None,
		NonZeroUsize::new(1),
		NonZeroUsize::new(2),
	];
	let column = ColumnView::Enum(EnumColumnView {
		name: "store_and_fwd_flag",
		options: &options,
		data: &data,
	});
	assert_eq!(
		column.value_counts(),
		vec![
			ValueCount {
				value: "Y".to_owned(),
				count: 2
			},
			ValueCount {
				value: "N".to_owned(),
				count: 1
			},
		]
	);
}

#[test]
fn test_text_value_counts_break_ties_by_value() {
	let data = vec!["b".to_owned(), "a".to_owned(), "c".to_owned(), "c".to_owned()];
	let column = ColumnView::Text(TextColumnView {
		name: "zone",
		data: &data,
	});
	let values: Vec<String> = column
		.value_counts()
		.into_iter()
		.map(|value_count| value_count.value)
		.collect();
	assert_eq!(values, vec!["c", "a", "b"]);
}
