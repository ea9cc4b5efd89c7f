//! Report rows and the sinks that write them.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AuditError;
use crate::inventory::RegionInstances;

/// Header row of the CSV report.
pub const CSV_HEADER: [&str; 3] = ["region", "instance-id", "imdsv1 calls"];

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub region: String,
    pub instance_id: String,
    /// Counter formatted with two decimal places.
    pub imdsv1_calls: String,
}

impl ReportRow {
    pub fn new(region: &str, instance_id: &str, calls: f64) -> Self {
        Self {
            region: region.to_string(),
            instance_id: instance_id.to_string(),
            imdsv1_calls: format!("{:.2}", calls),
        }
    }
}

/// Build the rows for every instance of a region, in collection order.
pub fn rows_for(region: &RegionInstances) -> impl Iterator<Item = ReportRow> + '_ {
    region
        .instances()
        .iter()
        .map(move |i| ReportRow::new(region.region(), i.instance_id(), i.no_token_calls()))
}

/// Destination for report rows.
pub trait ReportSink {
    /// Write one row.
    fn write_row(&mut self, row: &ReportRow) -> Result<(), AuditError>;

    /// Push buffered rows to the underlying writer.
    fn flush(&mut self) -> Result<(), AuditError>;
}

impl ReportSink for Vec<ReportRow> {
    fn write_row(&mut self, row: &ReportRow) -> Result<(), AuditError> {
        self.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Csv,
    /// One JSON object per line.
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("unknown format: {} (expected csv or json)", s)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Writes rows as CSV, header first.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self, AuditError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, AuditError> {
        self.writer
            .into_inner()
            .map_err(|e| AuditError::Io(e.into_error()))
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn write_row(&mut self, row: &ReportRow) -> Result<(), AuditError> {
        self.writer
            .write_record([&row.region, &row.instance_id, &row.imdsv1_calls])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AuditError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes rows as newline-delimited JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn write_row(&mut self, row: &ReportRow) -> Result<(), AuditError> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AuditError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Create the sink for `format` on top of `writer`.
pub fn open_sink<'a, W: Write + 'a>(
    format: ReportFormat,
    writer: W,
) -> Result<Box<dyn ReportSink + 'a>, AuditError> {
    Ok(match format {
        ReportFormat::Csv => Box::new(CsvSink::new(writer)?),
        ReportFormat::Json => Box::new(JsonLinesSink::new(writer)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InstanceRecord;

    #[test]
    fn test_row_formats_two_decimals() {
        assert_eq!(ReportRow::new("r", "i", 2.0).imdsv1_calls, "2.00");
        assert_eq!(ReportRow::new("r", "i", 0.0).imdsv1_calls, "0.00");
        assert_eq!(ReportRow::new("r", "i", 1234.567).imdsv1_calls, "1234.57");
    }

    #[test]
    fn test_rows_for_region() {
        let mut ri = RegionInstances::new("us-west-2");
        ri.add_instance(InstanceRecord::new("123"));
        ri.add_instance(InstanceRecord::new("234"));
        ri.instances_mut()[0].add_calls(2.0);

        let rows: Vec<ReportRow> = rows_for(&ri).collect();
        assert_eq!(
            rows,
            vec![
                ReportRow::new("us-west-2", "123", 2.0),
                ReportRow::new("us-west-2", "234", 0.0),
            ]
        );
    }

    #[test]
    fn test_csv_sink() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.write_row(&ReportRow::new("us-west-2", "i-1", 3.0)).unwrap();
        sink.write_row(&ReportRow::new("us-west-2", "i-2", 0.0)).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();

        assert_eq!(
            out,
            "region,instance-id,imdsv1 calls\nus-west-2,i-1,3.00\nus-west-2,i-2,0.00\n"
        );
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write_row(&ReportRow::new("eu-west-1", "i-9", 1.5)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        assert_eq!(
            out,
            "{\"region\":\"eu-west-1\",\"instance_id\":\"i-9\",\"imdsv1_calls\":\"1.50\"}\n"
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("csv".parse::<ReportFormat>(), Ok(ReportFormat::Csv));
        assert_eq!("JSON".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert!("xml".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }
}
