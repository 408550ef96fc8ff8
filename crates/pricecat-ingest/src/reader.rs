//! Row extraction from a supplier CSV according to its descriptor.

use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim};
use pricecat_core::{CatalogError, CatalogResult, ColumnMap, SupplierDescriptor};
use thiserror::Error;

/// String fields of one data row, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source file.
    pub line: u64,
    pub brand: String,
    pub articul: String,
    /// Name columns trimmed and joined with single spaces.
    pub name: String,
    pub partnum: String,
    pub price: String,
    /// `None` when the descriptor maps no quantity column.
    pub quantity: Option<String>,
    pub rest: String,
}

/// A row that could not be extracted, with its 1-based line (0 if unknown).
#[derive(Debug, Error)]
#[error("line {line}: {error}")]
pub struct RowError {
    pub line: u64,
    #[source]
    pub error: CatalogError,
}

/// Iterator over the data rows of one price file.
///
/// Rows are yielded as `Err` when they are too short or contain invalid
/// UTF-8; iteration continues with the next row. An I/O error ends the
/// iteration after it is yielded.
pub struct PriceFileReader {
    reader: csv::Reader<File>,
    columns: ColumnMap,
    header_rows: usize,
    record: ByteRecord,
    done: bool,
}

impl PriceFileReader {
    /// # Errors
    ///
    /// Returns `csv::Error` if the file cannot be opened.
    pub fn open(path: &Path, descriptor: &SupplierDescriptor) -> Result<Self, csv::Error> {
        let reader = ReaderBuilder::new()
            .delimiter(descriptor.delimiter_byte())
            .quoting(descriptor.quoted)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;
        Ok(Self {
            reader,
            columns: descriptor.columns.clone(),
            header_rows: descriptor.header_rows,
            record: ByteRecord::new(),
            done: false,
        })
    }

    fn extract(&self, line: u64) -> CatalogResult<RawRow> {
        let record = &self.record;
        if record.len() <= self.columns.max_index() {
            return Err(CatalogError::malformed(
                "row",
                format!("{} columns, need {}", record.len(), self.columns.max_index() + 1),
            ));
        }

        let field = |idx: usize| -> CatalogResult<String> {
            let bytes = record.get(idx).unwrap_or_default();
            std::str::from_utf8(bytes)
                .map(|s| s.trim_start_matches('\u{feff}').trim().to_string())
                .map_err(|_| CatalogError::malformed("encoding", String::from_utf8_lossy(bytes)))
        };

        let mut name_parts = Vec::with_capacity(self.columns.name.indices().len());
        for &idx in self.columns.name.indices() {
            let part = field(idx)?;
            if !part.is_empty() {
                name_parts.push(part);
            }
        }

        Ok(RawRow {
            line,
            brand: field(self.columns.brand)?,
            articul: field(self.columns.articul)?,
            name: name_parts.join(" "),
            partnum: self.columns.partnum.map(field).transpose()?.unwrap_or_default(),
            price: field(self.columns.price)?,
            quantity: self.columns.quantity.map(field).transpose()?,
            rest: field(self.columns.rest)?,
        })
    }
}

impl Iterator for PriceFileReader {
    type Item = Result<RawRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            match self.reader.read_byte_record(&mut self.record) {
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Ok(true) => {}
                Err(e) => {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        self.done = true;
                    }
                    return Some(Err(RowError {
                        line: e.position().map_or(0, csv::Position::line),
                        error: CatalogError::malformed("record", e.to_string()),
                    }));
                }
            }

            let line = self.record.position().map_or(0, csv::Position::line);
            if self.header_rows > 0 {
                self.header_rows -= 1;
                continue;
            }
            if self.record.iter().all(<[u8]>::is_empty) {
                continue;
            }
            return Some(self.extract(line).map_err(|error| RowError { line, error }));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pricecat_core::{FilenamePattern, NameColumns};

    use super::*;

    fn descriptor(header_rows: usize, quantity: Option<usize>) -> SupplierDescriptor {
        SupplierDescriptor {
            name: "Test".into(),
            email: None,
            filename: FilenamePattern {
                prefix: "test".into(),
                suffix: String::new(),
            },
            delimiter: ";".into(),
            quoted: true,
            header_rows,
            columns: ColumnMap {
                brand: 0,
                articul: 1,
                name: NameColumns::Many(vec![2, 3]),
                partnum: None,
                price: 4,
                quantity,
                rest: 5,
            },
            charset: None,
        }
    }

    fn write_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn skips_header_rows_and_joins_name_columns() {
        let file = write_file(
            "Brand;Art;Name;Extra;Price;Rest\n\
             Bosch; 0 986 452 041 ;Фильтр масляный; ВАЗ ;350,00;>10\n"
                .as_bytes(),
        );
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(1, None))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.line, 2);
        assert_eq!(row.brand, "Bosch");
        assert_eq!(row.articul, "0 986 452 041");
        assert_eq!(row.name, "Фильтр масляный ВАЗ");
        assert_eq!(row.price, "350,00");
        assert_eq!(row.quantity, None);
        assert_eq!(row.rest, ">10");
    }

    #[test]
    fn short_row_is_malformed_but_iteration_continues() {
        let file = write_file(b"a;b;c\nTRW;DF4000;Disc;;1200;4\n");
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(0, None))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 2);
        let err = rows[0].as_ref().unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.error, CatalogError::Malformed { field: "row", .. }));
        assert_eq!(rows[1].as_ref().unwrap().name, "Disc");
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut bytes = b"TRW;DF4000;".to_vec();
        bytes.extend_from_slice(&[0xc4, 0xe8, 0xf1, 0xea]); // cp1251
        bytes.extend_from_slice(b";;1200;4\n");
        let file = write_file(&bytes);
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(0, None))
            .unwrap()
            .collect();
        assert!(matches!(
            rows[0],
            Err(RowError {
                line: 1,
                error: CatalogError::Malformed { field: "encoding", .. }
            })
        ));
    }

    #[test]
    fn row_errors_report_their_line_after_headers() {
        let file = write_file(b"Brand;Art;Name;Extra;Price;Rest\nTRW;DF4000;Disc;;1200;4\nshort;row\n");
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(1, None))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_ref().unwrap().line, 2);
        let err = rows[1].as_ref().unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.to_string(), "line 3: malformed row: \"2 columns, need 6\"");
    }

    #[test]
    fn maps_quantity_column_when_present() {
        let file = write_file(b"TRW;DF4000;Disc;;1200;4;7\n");
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(0, Some(6)))
            .unwrap()
            .collect();
        assert_eq!(rows[0].as_ref().unwrap().quantity.as_deref(), Some("7"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let file = write_file(b"TRW;DF4000;Disc;;1200;4\n;;;;;\n");
        let rows: Vec<_> = PriceFileReader::open(file.path(), &descriptor(0, None))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 1);
    }
}
