use crate::Error;
use tripfit_dataframe::{ColumnView, DataFrame};

/// The column every model is trained to predict.
pub const TARGET_COLUMN_NAME: &str = "trip_distance";

/// The feature column and the target column of a dataset, aligned row by row.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTargetPair<'a> {
	pub x: ColumnView<'a>,
	pub y: ColumnView<'a>,
}

impl<'a> FeatureTargetPair<'a> {
	pub fn len(&self) -> usize {
		self.y.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/**
Select the feature column named `feature_name` and the target column named `target_name` from `dataset`. Names must match exactly. The column types are not checked here, a non-numeric column is reported when the model is trained.
*/
pub fn select<'a>(
	dataset: &'a DataFrame,
	feature_name: &str,
	target_name: &str,
) -> Result<FeatureTargetPair<'a>, Error> {
	let column = |name: &str| {
		dataset
			.column(name)
			.map(|column| column.view())
			.ok_or_else(|| Error::ColumnNotFound(name.to_owned()))
	};
	let x = column(feature_name)?;
	let y = column(target_name)?;
	Ok(FeatureTargetPair { x, y })
}

#[cfg(test)]
mod test {
	use super::*;
	use tripfit_dataframe::{Column, NumberColumn};

	fn dataset() -> DataFrame {
		DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "PULocationID".to_owned(),
					data: vec![1.0, 1.0, 2.0, 3.0],
				}),
				Column::Number(NumberColumn {
					name: "trip_distance".to_owned(),
					data: vec![2.0, 3.0, 1.0, 4.0],
				}),
			],
		}
	}

	#[test]
	fn test_select() {
		let dataset = dataset();
		let pair = select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap();
		assert_eq!(pair.len(), 4);
		assert_eq!(pair.x.name(), "PULocationID");
		assert_eq!(pair.x.as_number().unwrap().data, &[1.0, 1.0, 2.0, 3.0]);
		assert_eq!(pair.y.as_number().unwrap().data, &[2.0, 3.0, 1.0, 4.0]);
		assert_eq!(
			pair,
			select(&dataset, "PULocationID", TARGET_COLUMN_NAME).unwrap()
		);
	}

	#[test]
	fn test_unknown_feature() {
		let dataset = dataset();
		match select(&dataset, "nonexistent_column", TARGET_COLUMN_NAME) {
			Err(Error::ColumnNotFound(name)) => assert_eq!(name, "nonexistent_column"),
			result => panic!("unexpected result {:?}", result),
		}
		assert!(matches!(
			select(&dataset, "pulocationid", TARGET_COLUMN_NAME),
			Err(Error::ColumnNotFound(_))
		));
		assert!(matches!(
			select(&dataset, " PULocationID", TARGET_COLUMN_NAME),
			Err(Error::ColumnNotFound(_))
		));
	}

	#[test]
	fn test_unknown_target() {
		let dataset = dataset();
		assert!(matches!(
			select(&dataset, "PULocationID", "fare_amount"),
			Err(Error::ColumnNotFound(name)) if name == "fare_amount"
		));
	}

	#[test]
	fn test_target_as_feature() {
		let dataset = dataset();
		let pair = select(&dataset, TARGET_COLUMN_NAME, TARGET_COLUMN_NAME).unwrap();
		assert_eq!(pair.x, pair.y);
	}
}
