use crate::Error;
use tripfit_dataframe::{DataFrame, ValueCount};

/// The column whose value counts are shown when no other column is chosen.
pub const PICKUP_LOCATION_COLUMN_NAME: &str = "PULocationID";

/// A summary of a dataset shown before any model is trained.
#[derive(Clone, Debug, PartialEq)]
pub struct Overview {
	pub column_names: Vec<String>,
	/// The first rows of the dataset, rendered as strings, one inner `Vec` per row.
	pub head: Vec<Vec<String>>,
	/// The most frequent values of the chosen column, most frequent first.
	pub value_counts: Vec<ValueCount>,
}

/**
Summarize `dataset`: its column names, its first `n_rows` rows, and the `value_counts_limit` most frequent values of the column named `column_name`.
*/
pub fn overview(
	dataset: &DataFrame,
	column_name: &str,
	n_rows: usize,
	value_counts_limit: usize,
) -> Result<Overview, Error> {
	let column = dataset
		.column(column_name)
		.ok_or_else(|| Error::ColumnNotFound(column_name.to_owned()))?;
	let column_names = dataset
		.column_names()
		.into_iter()
		.map(ToOwned::to_owned)
		.collect();
	let view = dataset.view();
	let head_view = view.head(n_rows);
	let head = (0..head_view.nrows())
		.map(|row_index| {
			head_view
				.columns
				.iter()
				.map(|column| column.value_string(row_index).unwrap_or_default())
				.collect()
		})
		.collect();
	let mut value_counts = column.view().value_counts();
	value_counts.truncate(value_counts_limit);
	Ok(Overview {
		column_names,
		head,
		value_counts,
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use tripfit_dataframe::{Column, EnumColumn, NumberColumn};

	fn dataset() -> DataFrame {
		DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "PULocationID".to_owned(),
					data: vec![132.0, 161.0, 132.0, 237.0, 161.0, 132.0, 48.0],
				}),
				Column::Enum(EnumColumn {
					name: "store_and_fwd_flag".to_owned(),
					options: vec!["N".to_owned(), "Y".to_owned()],
					data: vec![
						std::num::NonZeroUsize::new(1),
						std::num::NonZeroUsize::new(1),
						std::num::NonZeroUsize::new(2),
						None,
						std::num::NonZeroUsize::new(1),
						std::num::NonZeroUsize::new(1),
						std::num::NonZeroUsize::new(1),
					],
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: vec![0.97, 1.1, 2.51, 1.9, 1.43, 1.84, 1.66],
				}),
			],
		}
	}

	#[test]
	fn test_overview() {
		let summary = overview(&dataset(), PICKUP_LOCATION_COLUMN_NAME, 3, 50).unwrap();
		assert_eq!(
			summary.column_names,
			vec!["PULocationID", "store_and_fwd_flag", "trip_distance"]
		);
		insta::assert_debug_snapshot!(summary.head, @r###"
  [
      [
          "132",
          "N",
          "0.97",
      ],
      [
          "161",
          "N",
          "1.1",
      ],
      [
          "132",
          "Y",
          "2.51",
      ],
  ]
  "###);
		let value_counts: Vec<(&str, usize)> = summary
			.value_counts
			.iter()
			.map(|value_count| (value_count.value.as_str(), value_count.count))
			.collect();
		assert_eq!(
			value_counts,
			vec![("132", 3), ("161", 2), ("48", 1), ("237", 1)]
		);
	}

	#[test]
	fn test_overview_limits() {
		let dataset = dataset();
		let all_rows = overview(&dataset, PICKUP_LOCATION_COLUMN_NAME, 100, 2).unwrap();
		assert_eq!(all_rows.head.len(), 7);
		assert_eq!(all_rows.value_counts.len(), 2);
		let flags = overview(&dataset, "store_and_fwd_flag", 0, 50).unwrap();
		assert!(flags.head.is_empty());
		assert_eq!(flags.value_counts.len(), 2);
		assert_eq!(flags.value_counts[0].value, "N");
		assert_eq!(flags.value_counts[0].count, 5);
		assert_eq!(flags.value_counts[1].value, "Y");
		assert_eq!(flags.value_counts[1].count, 1);
	}

	#[test]
	fn test_overview_of_unknown_column() {
		assert!(matches!(
			overview(&dataset(), "DOLocationID", 5, 50),
			Err(Error::ColumnNotFound(name)) if name == "DOLocationID"
		));
	}
}
