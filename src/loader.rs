use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::SVError;
use crate::value::Value;

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

/// Header metadata of one column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    /// Widest display string in this column, in chars.
    pub max_width: usize,
}

/// One record, field-indexed: what the UI shows and what the sorter compares.
#[derive(Debug, Clone)]
pub struct Row {
    pub display: Vec<String>,
    pub values: Vec<Value>,
}

#[derive(Debug)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
}

struct LoadedColumn {
    meta: ColumnMeta,
    display: Vec<String>,
    values: Vec<Value>,
}

pub fn load(path: PathBuf) -> Result<TableData, SVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SVError::FileNotFound,
        ErrorKind::PermissionDenied => SVError::PermissionDenied,
        _ => SVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(SVError::LoadingFailed("Not a file!".into()));
    }

    let frame = match detect_file_type(&path)? {
        FileType::CSV => load_csv(&path)?,
        FileType::PARQUET => load_parquet(&path)?,
        FileType::ARROW => load_arrow(&path)?,
    };

    // Materialize every column in its own thread. Each column comes out
    // twice, as display strings and as comparable values.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let nrows = df.height();

    let c_: Result<Vec<LoadedColumn>, _> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let loaded = c_?;

    let data_loading_duration = start_time.elapsed().as_millis();
    info!("Loading data took {data_loading_duration}ms ...");
    for c in loaded.iter() {
        debug!(
            "Column \"{}\": width_max {}, # rows {}",
            c.meta.name,
            c.meta.max_width,
            c.display.len()
        );
    }

    // Pivot column major loading output into row major records.
    let mut rows = Vec::with_capacity(nrows);
    for ridx in 0..nrows {
        let mut display = Vec::with_capacity(loaded.len());
        let mut values = Vec::with_capacity(loaded.len());
        for c in loaded.iter() {
            display.push(c.display[ridx].clone());
            values.push(c.values[ridx].clone());
        }
        rows.push(Row { display, values });
    }

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    Ok(TableData {
        name,
        columns: loaded.into_iter().map(|c| c.meta).collect(),
        rows,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, SVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(SVError::UnknownFileType),
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_temporal_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Date | DataType::Datetime(_, _) | DataType::Time
    )
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let col = df.column(col_name)?;
    let values = typed_values(col)?;

    let strings = col.cast(&DataType::String)?;
    let series = strings.str()?;
    let mut display = Vec::with_capacity(series.len());
    let mut max_width = 0;
    for value in series.into_iter() {
        let ss = match value {
            Some(s) => s.to_string().replace("\r\n", " ↵ ").replace("\n", " ↵ "),
            None => String::from("∅"),
        };
        if ss.chars().count() > max_width {
            max_width = ss.chars().count();
        }
        display.push(ss);
    }

    Ok(LoadedColumn {
        meta: ColumnMeta {
            name: col_name.to_string(),
            max_width,
        },
        display,
        values,
    })
}

fn typed_values(col: &Column) -> Result<Vec<Value>, PolarsError> {
    if is_numeric_type(col.dtype()) {
        let cast = col.cast(&DataType::Float64)?;
        let ca = cast.f64()?;
        Ok(ca
            .into_iter()
            .map(|v| v.map(Value::Number).unwrap_or(Value::Absent))
            .collect())
    } else if is_temporal_type(col.dtype()) {
        // Date and datetime columns both cast to their linear representation.
        let cast = col.cast(&DataType::Int64)?;
        let ca = cast.i64()?;
        Ok(ca
            .into_iter()
            .map(|v| v.map(Value::Instant).unwrap_or(Value::Absent))
            .collect())
    } else {
        let cast = col.cast(&DataType::String)?;
        let ca = cast.str()?;
        Ok(ca
            .into_iter()
            .map(|v| {
                v.map(|s| Value::Text(s.to_string()))
                    .unwrap_or(Value::Absent)
            })
            .collect())
    }
}

fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.as_path().into()))
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()
}

fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(
        PlPath::Local(path.as_path().into()),
        ScanArgsParquet::default(),
    )
}

fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.as_path().into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
