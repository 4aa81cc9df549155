use crate::error::{IoError, IoResult};

use homeval_data::{Column, Frame};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Field values read as missing, in addition to the empty string.
pub const MISSING_MARKERS: &[&str] = &["NA", "NaN", "nan", "NULL", "null", "None"];

pub fn is_missing(field: &str) -> bool {
    field.is_empty() || MISSING_MARKERS.contains(&field)
}

fn open(path: &Path) -> IoResult<File> {
    File::open(path).map_err(|source| IoError::File {
        path: path.display().to_string(),
        source,
    })
}

/// Read a CSV file with a header row into a typed [`Frame`].
pub fn read_csv(path: impl AsRef<Path>) -> IoResult<Frame> {
    let path = path.as_ref();
    let frame = read_csv_from(open(path)?)?;
    info!(
        path = %path.display(),
        rows = frame.n_rows(),
        cols = frame.n_cols(),
        "loaded dataset"
    );
    Ok(frame)
}

/// Read CSV text from any reader.
///
/// A column is numeric when every non-missing field parses as `f64`;
/// otherwise all of its fields are kept as strings.
pub fn read_csv_from<R: Read>(reader: R) -> IoResult<Frame> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(IoError::MissingHeader);
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        for (column, field) in raw.iter_mut().zip(record.iter()) {
            column.push((!is_missing(field)).then(|| field.to_string()));
        }
    }

    let columns = raw.into_iter().map(infer_column).collect();
    let frame = Frame::new(headers, columns)?;
    debug!(
        numeric = frame.iter().filter(|(_, c)| c.as_numeric().is_some()).count(),
        "inferred column types"
    );
    Ok(frame)
}

fn infer_column(fields: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = fields
        .iter()
        .map(|f| match f {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().map(Some),
        })
        .collect();
    match parsed {
        Some(values) => Column::Numeric(values),
        None => Column::Categorical(fields),
    }
}

/// Write serializable rows as CSV; the header comes from the field names.
pub fn write_csv_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> IoResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IoError::File {
        path: path.display().to_string(),
        source,
    })?;
    let mut wtr = csv::Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|source| IoError::File {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Id,LotArea,MSZoning,Alley,SalePrice
1,8450,RL,NA,208500
2,9600,RL,,181500
3,NA,RM,Grvl,223500
4,11250,C (all),NA,140000
";

    #[test]
    fn test_type_inference_and_missing_markers() {
        let frame = read_csv_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(frame.n_rows(), 4);
        assert_eq!(frame.n_cols(), 5);

        let lot = frame.column("LotArea").unwrap().as_numeric().unwrap();
        assert_eq!(lot, &[Some(8450.0), Some(9600.0), None, Some(11250.0)]);

        let zoning = frame.column("MSZoning").unwrap().as_categorical().unwrap();
        assert_eq!(zoning[3].as_deref(), Some("C (all)"));

        let alley = frame.column("Alley").unwrap();
        assert_eq!(alley.missing_count(), 3);
        assert!(alley.as_categorical().is_some());
    }

    #[test]
    fn test_read_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let frame = read_csv(file.path()).unwrap();
        assert!(frame.contains("SalePrice"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = read_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, IoError::File { .. }));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = read_csv_from("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IoError::Csv(_)));
    }

    #[derive(Serialize)]
    struct Row {
        actual: f64,
        predicted: f64,
    }

    #[test]
    fn test_write_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.csv");
        write_csv_rows(
            &path,
            &[
                Row {
                    actual: 1.5,
                    predicted: 2.0,
                },
                Row {
                    actual: 3.0,
                    predicted: 2.5,
                },
            ],
        )
        .unwrap();

        let frame = read_csv(&path).unwrap();
        assert_eq!(frame.names(), &["actual".to_string(), "predicted".to_string()]);
        assert_eq!(
            frame.column("predicted").unwrap().as_numeric().unwrap(),
            &[Some(2.0), Some(2.5)]
        );
    }
}
