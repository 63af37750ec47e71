/*!
This crate provides a basic implementation of dataframes, which are two dimensional arrays of data where each column can have a different data type, like a spreadsheet. It only implements what tripfit needs: loading a csv file once, looking up columns by name, and reading rows and value frequencies for display.
*/

#![allow(clippy::tabs_in_doc_comments)]

use itertools::izip;
use ndarray::prelude::*;
use std::num::NonZeroUsize;

mod load;
mod value_counts;

pub use self::load::*;
pub use self::value_counts::ValueCount;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrameView<'a> {
	pub columns: Vec<ColumnView<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Unknown(UnknownColumn),
	Number(NumberColumn),
	Enum(EnumColumn),
	Text(TextColumn),
}

/// An `UnknownColumn` has no valid values, so only its length is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumn {
	pub name: String,
	pub len: usize,
}

/// Invalid values in a `NumberColumn` are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

/// Each value in an `EnumColumn` is the one-based index of its option, or `None` if the value is not one of the options.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumn {
	pub name: String,
	pub options: Vec<String>,
	pub data: Vec<Option<NonZeroUsize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
	pub name: String,
	pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnView<'a> {
	Unknown(UnknownColumnView<'a>),
	Number(NumberColumnView<'a>),
	Enum(EnumColumnView<'a>),
	Text(TextColumnView<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumnView<'a> {
	pub name: &'a str,
	pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumnView<'a> {
	pub name: &'a str,
	pub data: &'a [f32],
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumnView<'a> {
	pub name: &'a str,
	pub options: &'a [String],
	pub data: &'a [Option<NonZeroUsize>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextColumnView<'a> {
	pub name: &'a str,
	pub data: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
	Unknown,
	Number,
	Enum { options: Vec<String> },
	Text,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
	Unknown,
	Number(f32),
	Enum(Option<NonZeroUsize>),
	Text(&'a str),
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(column_name, column_type)| match column_type {
				ColumnType::Unknown => Column::Unknown(UnknownColumn::new(column_name)),
				ColumnType::Number => Column::Number(NumberColumn::new(column_name)),
				ColumnType::Enum { options } => Column::Enum(EnumColumn::new(column_name, options)),
				ColumnType::Text => Column::Text(TextColumn::new(column_name)),
			})
			.collect();
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(|column| column.name()).collect()
	}

	/// Find the column with the name `name`.
	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.name() == name)
	}

	pub fn view(&self) -> DataFrameView {
		let columns = self.columns.iter().map(|column| column.view()).collect();
		DataFrameView { columns }
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
			Self::Text(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Unknown(s) => s.name.as_str(),
			Self::Number(s) => s.name.as_str(),
			Self::Enum(s) => s.name.as_str(),
			Self::Text(s) => s.name.as_str(),
		}
	}

	pub fn column_type(&self) -> ColumnType {
		match self {
			Self::Unknown(_) => ColumnType::Unknown,
			Self::Number(_) => ColumnType::Number,
			Self::Enum(s) => ColumnType::Enum {
				options: s.options.clone(),
			},
			Self::Text(_) => ColumnType::Text,
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumColumn> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&TextColumn> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn view(&self) -> ColumnView {
		match self {
			Self::Unknown(column) => ColumnView::Unknown(column.view()),
			Self::Number(column) => ColumnView::Number(column.view()),
			Self::Enum(column) => ColumnView::Enum(column.view()),
			Self::Text(column) => ColumnView::Text(column.view()),
		}
	}
}

impl UnknownColumn {
	pub fn new(name: String) -> Self {
		Self { name, len: 0 }
	}

	pub fn view(&self) -> UnknownColumnView {
		UnknownColumnView {
			name: &self.name,
			len: self.len,
		}
	}
}

impl NumberColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}

	pub fn view(&self) -> NumberColumnView {
		NumberColumnView {
			name: &self.name,
			data: &self.data,
		}
	}
}

impl EnumColumn {
	pub fn new(name: String, options: Vec<String>) -> Self {
		Self {
			name,
			options,
			data: Vec::new(),
		}
	}

	pub fn view(&self) -> EnumColumnView {
		EnumColumnView {
			name: &self.name,
			data: &self.data,
			options: &self.options,
		}
	}
}

impl TextColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}

	pub fn view(&self) -> TextColumnView {
		TextColumnView {
			name: &self.name,
			data: &self.data,
		}
	}
}

impl<'a> DataFrameView<'a> {
	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn view(&self) -> Self {
		self.clone()
	}

	pub fn column(&self, name: &str) -> Option<&ColumnView<'a>> {
		self.columns.iter().find(|column| column.name() == name)
	}

	pub fn read_row(&self, index: usize, row: &mut [Value<'a>]) {
		for (value, column) in row.iter_mut().zip(self.columns.iter()) {
			*value = column.get(index).unwrap_or(Value::Unknown);
		}
	}

	pub fn split_at_row(&self, index: usize) -> (Self, Self) {
		let iter = self.columns.iter().map(|column| column.split_at_row(index));
		let mut columns_a = Vec::with_capacity(self.columns.len());
		let mut columns_b = Vec::with_capacity(self.columns.len());
		for (column_a, column_b) in iter {
			columns_a.push(column_a);
			columns_b.push(column_b);
		}
		(Self { columns: columns_a }, Self { columns: columns_b })
	}

	/// Return a view of the first `n` rows, or all of them if there are fewer than `n`.
	pub fn head(&self, n: usize) -> Self {
		let n = n.min(self.nrows());
		self.split_at_row(n).0
	}

	/// Copy the values of this view into a row major array. This returns `None` if any column is not a number column.
	pub fn to_rows_f32(&self) -> Option<Array2<f32>> {
		let mut rows = Array::zeros((self.nrows(), self.ncols()));
		for (mut ndarray_column, dataframe_column) in
			izip!(rows.gencolumns_mut(), self.columns.iter())
		{
			match dataframe_column {
				ColumnView::Number(column) => {
					for (a, b) in izip!(ndarray_column.iter_mut(), column.data) {
						*a = *b;
					}
				}
				_ => return None,
			}
		}
		Some(rows)
	}

	pub fn to_rows(&self) -> Array2<Value<'a>> {
		let mut rows = Array::from_elem((self.nrows(), self.ncols()), Value::Unknown);
		for (mut ndarray_column, column) in izip!(rows.gencolumns_mut(), self.columns.iter()) {
			for (index, value) in ndarray_column.iter_mut().enumerate() {
				*value = column.get(index).unwrap_or(Value::Unknown);
			}
		}
		rows
	}
}

impl<'a> ColumnView<'a> {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
			Self::Text(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &'a str {
		match self {
			Self::Unknown(s) => s.name,
			Self::Number(s) => s.name,
			Self::Enum(s) => s.name,
			Self::Text(s) => s.name,
		}
	}

	pub fn as_number(&self) -> Option<NumberColumnView<'a>> {
		match self {
			Self::Number(s) => Some(s.clone()),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<EnumColumnView<'a>> {
		match self {
			Self::Enum(s) => Some(s.clone()),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<TextColumnView<'a>> {
		match self {
			Self::Text(s) => Some(s.clone()),
			_ => None,
		}
	}

	/// Get the value at row `index`, or `None` if `index` is out of bounds.
	pub fn get(&self, index: usize) -> Option<Value<'a>> {
		if index >= self.len() {
			return None;
		}
		let value = match self {
			Self::Unknown(_) => Value::Unknown,
			Self::Number(column) => Value::Number(column.data[index]),
			Self::Enum(column) => Value::Enum(column.data[index]),
			Self::Text(column) => Value::Text(&column.data[index]),
		};
		Some(value)
	}

	/// Render the value at row `index` for display. Invalid values render as the empty string.
	pub fn value_string(&self, index: usize) -> Option<String> {
		let value = self.get(index)?;
		let value = match (self, value) {
			(Self::Number(_), Value::Number(value)) if value.is_finite() => value.to_string(),
			(Self::Enum(column), Value::Enum(Some(option_index))) => column
				.options
				.get(option_index.get() - 1)
				.cloned()
				.unwrap_or_default(),
			(Self::Text(_), Value::Text(value)) => value.to_owned(),
			_ => String::new(),
		};
		Some(value)
	}

	pub fn split_at_row(&self, index: usize) -> (Self, Self) {
		match self {
			ColumnView::Unknown(column) => (
				ColumnView::Unknown(UnknownColumnView {
					name: column.name,
					len: index,
				}),
				ColumnView::Unknown(UnknownColumnView {
					name: column.name,
					len: column.len - index,
				}),
			),
			ColumnView::Number(column) => {
				let (data_a, data_b) = column.data.split_at(index);
				(
					ColumnView::Number(NumberColumnView {
						name: column.name,
						data: data_a,
					}),
					ColumnView::Number(NumberColumnView {
						name: column.name,
						data: data_b,
					}),
				)
			}
			ColumnView::Enum(column) => {
				let (data_a, data_b) = column.data.split_at(index);
				(
					ColumnView::Enum(EnumColumnView {
						name: column.name,
						options: column.options,
						data: data_a,
					}),
					ColumnView::Enum(EnumColumnView {
						name: column.name,
						options: column.options,
						data: data_b,
					}),
				)
			}
			ColumnView::Text(column) => {
				let (data_a, data_b) = column.data.split_at(index);
				(
					ColumnView::Text(TextColumnView {
						name: column.name,
						data: data_a,
					}),
					ColumnView::Text(TextColumnView {
						name: column.name,
						data: data_b,
					}),
				)
			}
		}
	}
}

impl<'a> Value<'a> {
	pub fn as_number(&self) -> Option<&f32> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&Option<NonZeroUsize>> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}
}

#[cfg(test)]
fn test_dataframe() -> DataFrame {
	DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "PULocationID".to_owned(),
				data: vec![1.0, 1.0, 2.0, 3.0],
			}),
			Column::Enum(EnumColumn {
				name: "store_and_fwd_flag".to_owned(),
				options: vec!["N".to_owned(), "Y".to_owned()],
				data: vec![NonZeroUsize::new(1), NonZeroUsize::new(2), None, NonZeroUsize::new(1)],
			}),
			Column::Number(NumberColumn {
				name: "trip_distance".to_owned(),
				data: vec![2.0, 3.0, f32::NAN, 4.0],
			}),
		],
	}
}

#[test]
fn test_column_lookup() {
	let dataframe = test_dataframe();
	assert_eq!(dataframe.nrows(), 4);
	assert_eq!(
		dataframe.column_names(),
		vec!["PULocationID", "store_and_fwd_flag", "trip_distance"]
	);
	assert!(dataframe.column("trip_distance").unwrap().as_number().is_some());
	assert!(dataframe.column("Trip_Distance").is_none());
	assert!(dataframe.view().column("store_and_fwd_flag").is_some());
}

#[test]
fn test_head() {
	let dataframe = test_dataframe();
	let view = dataframe.view();
	assert_eq!(view.head(2).nrows(), 2);
	assert_eq!(view.head(10).nrows(), 4);
	let head = view.head(2);
	let strings: Vec<Vec<String>> = (0..head.nrows())
		.map(|index| {
			head.columns
				.iter()
				.map(|column| column.value_string(index).unwrap())
				.collect()
		})
		.collect();
	assert_eq!(
		strings,
		vec![vec!["1", "N", "2"], vec!["1", "Y", "3"]]
	);
}

#[test]
fn test_value_string_renders_invalid_values_empty() {
	let dataframe = test_dataframe();
	let view = dataframe.view();
	assert_eq!(view.columns[1].value_string(2).unwrap(), "");
	assert_eq!(view.columns[2].value_string(2).unwrap(), "");
	assert_eq!(view.columns[2].value_string(4), None);
}

#[test]
fn test_to_rows_f32() {
	let dataframe = test_dataframe();
	let view = dataframe.view();
	assert!(view.to_rows_f32().is_none());
	let numbers = DataFrameView {
		columns: vec![view.columns[0].clone()],
	};
	let rows = numbers.to_rows_f32().unwrap();
	assert_eq!(rows, arr2(&[[1.0], [1.0], [2.0], [3.0]]));
}

#[test]
fn test_to_rows() {
	let dataframe = test_dataframe();
	let rows = dataframe.view().to_rows();
	assert_eq!(rows.dim(), (4, 3));
	assert_eq!(rows[(3, 0)], Value::Number(3.0));
	assert_eq!(rows[(2, 1)], Value::Enum(None));
}
