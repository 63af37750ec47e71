use super::*;
use anyhow::{bail, Result};
use fnv::{FnvHashMap, FnvHashSet};
use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub infer_options: InferOptions,
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			column_types: None,
			infer_options: InferOptions::default(),
			invalid_values: DEFAULT_INVALID_VALUES,
		}
	}
}

#[derive(Clone, Debug)]
pub struct InferOptions {
	pub enum_max_unique_values: usize,
}

impl Default for InferOptions {
	fn default() -> Self {
		Self {
			enum_max_unique_values: 100,
		}
	}
}

/// These values are the default values that are considered invalid.
pub const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions, progress: impl Fn(u64)) -> Result<Self> {
		// Rows with the wrong number of fields are reported by `from_csv`, so the reader must not reject them first.
		let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
		Self::from_csv(&mut reader, options, progress)
	}

	pub fn from_csv<R>(
		reader: &mut csv::Reader<R>,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let mut seen_column_names = FnvHashSet::default();
		for column_name in column_names.iter() {
			if !seen_column_names.insert(column_name.as_str()) {
				bail!("duplicate column name \"{}\"", column_name);
			}
		}
		let n_columns = column_names.len();
		let start_position = reader.position().clone();
		let infer_options = &options.infer_options;
		let invalid_values = options.invalid_values;
		let mut n_rows = None;

		#[derive(Clone, Debug)]
		enum ColumnTypeOrInferStats<'a> {
			ColumnType(ColumnType),
			InferStats(InferStats<'a>),
		}

		// Retrieve any column types present in the options.
		let mut column_types: Vec<ColumnTypeOrInferStats> = match options.column_types {
			Some(column_types) => column_names
				.iter()
				.map(|column_name| {
					column_types
						.get(column_name)
						.map(|column_type| ColumnTypeOrInferStats::ColumnType(column_type.clone()))
						.unwrap_or_else(|| {
							ColumnTypeOrInferStats::InferStats(InferStats::new(
								infer_options,
								invalid_values,
							))
						})
				})
				.collect(),
			None => vec![
				ColumnTypeOrInferStats::InferStats(InferStats::new(
					infer_options,
					invalid_values
				));
				n_columns
			],
		};

		// Passing over the csv to infer column types is only necessary if one or more columns did not have its type specified.
		let needs_infer = column_types
			.iter()
			.any(|column_type| matches!(column_type, ColumnTypeOrInferStats::InferStats(_)));

		let column_types: Vec<ColumnType> = if needs_infer {
			let mut infer_stats: Vec<(usize, &mut InferStats)> = column_types
				.iter_mut()
				.enumerate()
				.filter_map(|(index, column_type)| match column_type {
					ColumnTypeOrInferStats::ColumnType(_) => None,
					ColumnTypeOrInferStats::InferStats(infer_stats) => Some((index, infer_stats)),
				})
				.collect();
			let mut record = csv::StringRecord::new();
			let mut n_rows_computed = 0;
			while reader.read_record(&mut record)? {
				check_record_len(
					n_columns,
					record.len(),
					record.position().map(|p| p.line()),
				)?;
				n_rows_computed += 1;
				for (index, infer_stats) in infer_stats.iter_mut() {
					infer_stats.update(&record[*index]);
				}
			}
			n_rows = Some(n_rows_computed);
			let column_types = column_types
				.into_iter()
				.map(|column_type| match column_type {
					ColumnTypeOrInferStats::ColumnType(column_type) => column_type,
					ColumnTypeOrInferStats::InferStats(infer_stats) => infer_stats.finalize(),
				})
				.collect();
			// After inference, return back to the beginning of the csv to load the values.
			reader.seek(start_position)?;
			column_types
		} else {
			column_types
				.into_iter()
				.filter_map(|column_type| match column_type {
					ColumnTypeOrInferStats::ColumnType(column_type) => Some(column_type),
					ColumnTypeOrInferStats::InferStats(_) => None,
				})
				.collect()
		};

		let mut dataframe = Self::new(column_names, column_types);
		// If an inference pass was done, reserve storage for the values because we know how many rows are in the csv.
		if let Some(n_rows) = n_rows {
			for column in dataframe.columns.iter_mut() {
				match column {
					Column::Unknown(_) => {}
					Column::Number(column) => column.data.reserve_exact(n_rows),
					Column::Enum(column) => column.data.reserve_exact(n_rows),
					Column::Text(column) => column.data.reserve_exact(n_rows),
				}
			}
		}
		// Enum values are looked up by option name for every row, so index the options once up front.
		let enum_option_indexes: Vec<Option<FnvHashMap<String, NonZeroUsize>>> = dataframe
			.columns
			.iter()
			.map(|column| {
				column.as_enum().map(|column| {
					column
						.options
						.iter()
						.enumerate()
						.filter_map(|(index, option)| {
							NonZeroUsize::new(index + 1).map(|index| (option.clone(), index))
						})
						.collect()
				})
			})
			.collect();
		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			if let Some(position) = record.position() {
				progress(position.byte());
			}
			check_record_len(
				n_columns,
				record.len(),
				record.position().map(|p| p.line()),
			)?;
			for (column, enum_option_index, value) in izip!(
				dataframe.columns.iter_mut(),
				enum_option_indexes.iter(),
				record.iter()
			) {
				match column {
					Column::Unknown(column) => {
						column.len += 1;
					}
					Column::Number(column) => {
						let value = match lexical::parse::<f32, &[u8]>(value) {
							Ok(value) if value.is_finite() => value,
							_ => std::f32::NAN,
						};
						column.data.push(value);
					}
					Column::Enum(column) => {
						let value = std::str::from_utf8(value).ok().and_then(|value| {
							enum_option_index
								.as_ref()
								.and_then(|options| options.get(value).cloned())
						});
						column.data.push(value);
					}
					Column::Text(column) => {
						column.data.push(std::str::from_utf8(value)?.to_owned())
					}
				}
			}
		}
		Ok(dataframe)
	}
}

fn check_record_len(n_columns: usize, n_fields: usize, line: Option<u64>) -> Result<()> {
	if n_fields != n_columns {
		bail!(
			"expected {} fields but found {} on line {}",
			n_columns,
			n_fields,
			line.unwrap_or(0),
		);
	}
	Ok(())
}

#[derive(Clone, Debug)]
pub struct InferStats<'a> {
	infer_options: &'a InferOptions,
	invalid_values: &'a [&'a str],
	column_type: InferColumnType,
	unique_values: Option<BTreeSet<String>>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum InferColumnType {
	Unknown,
	Number,
	Enum,
	Text,
}

impl<'a> InferStats<'a> {
	pub fn new(infer_options: &'a InferOptions, invalid_values: &'a [&'a str]) -> Self {
		Self {
			infer_options,
			invalid_values,
			column_type: InferColumnType::Unknown,
			unique_values: Some(BTreeSet::new()),
		}
	}

	pub fn update(&mut self, value: &str) {
		if self.invalid_values.contains(&value) {
			return;
		}
		if let Some(unique_values) = self.unique_values.as_mut() {
			if !unique_values.contains(value) {
				unique_values.insert(value.to_owned());
			}
			if unique_values.len() > self.infer_options.enum_max_unique_values {
				self.unique_values = None;
			}
		}
		match self.column_type {
			InferColumnType::Unknown | InferColumnType::Number => {
				if lexical::parse::<f32, &str>(value)
					.map(|v| v.is_finite())
					.unwrap_or(false)
				{
					self.column_type = InferColumnType::Number;
				} else if self.unique_values.is_some() {
					self.column_type = InferColumnType::Enum;
				} else {
					self.column_type = InferColumnType::Text;
				}
			}
			InferColumnType::Enum => {
				if self.unique_values.is_none() {
					self.column_type = InferColumnType::Text;
				}
			}
			InferColumnType::Text => {}
		}
	}

	pub fn finalize(self) -> ColumnType {
		match (self.column_type, self.unique_values) {
			(InferColumnType::Unknown, _) => ColumnType::Unknown,
			(InferColumnType::Number, _) => ColumnType::Number,
			(InferColumnType::Enum, Some(unique_values)) => ColumnType::Enum {
				options: unique_values.into_iter().collect(),
			},
			(InferColumnType::Enum, None) | (InferColumnType::Text, _) => ColumnType::Text,
		}
	}
}

#[test]
fn test_infer() {
	let csv = r#"number,enum,text
1,test,hello
2,test,world
"#;
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: None,
			infer_options: InferOptions {
				enum_max_unique_values: 1,
			},
			..Default::default()
		},
		|_| {},
	)
	.unwrap();
	insta::assert_debug_snapshot!(df, @r###"
 DataFrame {
     columns: [
         Number(
             NumberColumn {
                 name: "number",
                 data: [
                     1.0,
                     2.0,
                 ],
             },
         ),
         Enum(
             EnumColumn {
                 name: "enum",
                 options: [
                     "test",
                 ],
                 data: [
                     Some(
                         1,
                     ),
                     Some(
                         1,
                     ),
                 ],
             },
         ),
         Text(
             TextColumn {
                 name: "text",
                 data: [
                     "hello",
                     "world",
                 ],
             },
         ),
     ],
 }
 "###);
}

#[test]
fn test_column_types() {
	let csv = r#"PULocationID,store_and_fwd_flag,trip_distance
132,N,1.5
138,Y,
"#;
	let mut column_types = BTreeMap::new();
	column_types.insert("PULocationID".to_owned(), ColumnType::Number);
	column_types.insert(
		"store_and_fwd_flag".to_owned(),
		ColumnType::Enum {
			options: vec!["N".to_owned(), "Y".to_owned()],
		},
	);
	column_types.insert("trip_distance".to_owned(), ColumnType::Number);
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
		|_| {},
	)
	.unwrap();
	assert_eq!(df.nrows(), 2);
	assert_eq!(
		df.column("store_and_fwd_flag").unwrap().as_enum().unwrap().data,
		vec![NonZeroUsize::new(1), NonZeroUsize::new(2)]
	);
	let trip_distance = &df.column("trip_distance").unwrap().as_number().unwrap().data;
	assert_eq!(trip_distance[0], 1.5);
	assert!(trip_distance[1].is_nan());
}

#[test]
fn test_invalid_values_do_not_affect_inference() {
	let csv = "fare,note\n5.5,\nNaN,?\n7,\n";
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	assert_eq!(df.column("fare").unwrap().column_type(), ColumnType::Number);
	assert_eq!(df.column("note").unwrap().column_type(), ColumnType::Unknown);
	assert_eq!(df.column("note").unwrap().len(), 3);
}

#[test]
fn test_duplicate_column_names_are_rejected() {
	let csv = "a,a\n1,2\n";
	let result = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	);
	assert!(result.is_err());
}

#[test]
fn test_missing_file() {
	let result = DataFrame::from_path(
		Path::new("/nonexistent/trips.csv"),
		FromCsvOptions::default(),
		|_| {},
	);
	assert!(result.is_err());
}

#[test]
fn test_rows_with_the_wrong_number_of_fields_are_rejected() {
	let csv = "PULocationID,trip_distance\n1,2.0\n2,3.0,4.0\n";
	let error = DataFrame::from_csv(
		&mut csv::ReaderBuilder::new()
			.flexible(true)
			.from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap_err();
	assert_eq!(error.to_string(), "expected 2 fields but found 3 on line 3");
	let mut column_types = BTreeMap::new();
	column_types.insert("PULocationID".to_owned(), ColumnType::Number);
	column_types.insert("trip_distance".to_owned(), ColumnType::Number);
	let csv = "PULocationID,trip_distance\n1\n";
	let error = DataFrame::from_csv(
		&mut csv::ReaderBuilder::new()
			.flexible(true)
			.from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
		|_| {},
	)
	.unwrap_err();
	assert_eq!(error.to_string(), "expected 2 fields but found 1 on line 2");
}
