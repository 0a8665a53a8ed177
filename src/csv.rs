// src/csv.rs
use std::io::{self, Write};

use crate::record::{MonitoringRecord, HEADERS};

/// Excel needs this to read the file as UTF-8.
pub const UTF8_BOM: &str = "\u{feff}";

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first { write!(w, "{}", sep)?; } else { first = false; }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Header line plus one line per record, BOM first when `bom` is set.
pub fn write_records<W: Write>(mut w: W, records: &[MonitoringRecord], bom: bool) -> io::Result<()> {
    if bom {
        w.write_all(UTF8_BOM.as_bytes())?;
    }
    write_row(&mut w, &HEADERS, ',')?;
    for r in records {
        write_row(&mut w, &r.to_row(), ',')?;
    }
    w.flush()
}

/// Same layout as `write_records`, as a string and without BOM.
pub fn records_to_string(records: &[MonitoringRecord]) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    write_records(&mut buf, records, false)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["a", "b,c", "say \"hi\""], ',').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,\"b,c\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn header_then_rows() {
        let recs = vec![MonitoringRecord::new("北京 (东城)", "80.1 nGy/h", "2024-05-01")];
        let out = records_to_string(&recs).unwrap();
        assert_eq!(out, "省份,监测点,辐射值,更新时间\n北京,北京 (东城),80.1 nGy/h,2024-05-01\n");
    }

    #[test]
    fn bom_is_first() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[], true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(UTF8_BOM));
        assert!(text.ends_with("更新时间\n"));
    }

    #[test]
    fn no_records_is_just_the_header() {
        assert_eq!(records_to_string(&[]).unwrap(), "省份,监测点,辐射值,更新时间\n");
    }
}
