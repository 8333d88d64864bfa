use crate::error::Result;
use crate::types::{Charset, CsvConfig};
use csv::{QuoteStyle, WriterBuilder};
use std::io::{self, Write};
use tracing::trace;

/// Receives the header and then the data records of one table
pub trait RecordSink {
    /// Write one record. An empty record is not written.
    fn write_record(&mut self, values: &[String]) -> Result<()>;

    fn write_header(&mut self, names: &[String]) -> Result<()> {
        self.write_record(names)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes records as delimited text in the configured charset.
///
/// The `csv` writer lays out each record as UTF-8 into a scratch buffer, and
/// the buffer is then re-encoded into the target charset.
pub struct CsvWriter<W: Write> {
    writer: W,
    encoding: Charset,
    csv: csv::Writer<Vec<u8>>,
    bytes: Vec<u8>,
    records_written: usize,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W, config: CsvConfig) -> Result<Self> {
        config.validate()?;

        let csv = WriterBuilder::new()
            .delimiter(config.delimiter_byte()?)
            .quote(config.quote_byte()?)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .terminator(config.terminator()?)
            .flexible(true)
            .from_writer(Vec::new());

        Ok(CsvWriter {
            writer,
            encoding: config.encoding,
            csv,
            bytes: Vec::new(),
            records_written: 0,
        })
    }

    /// Records written so far, header included
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for CsvWriter<W> {
    fn write_record(&mut self, values: &[String]) -> Result<()> {
        if values.is_empty() {
            trace!("Empty record is not written");
            return Ok(());
        }

        self.csv.write_record(values)?;
        self.csv.flush()?;

        let line = self.csv.get_mut();
        let text = std::str::from_utf8(line)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.bytes.clear();
        self.encoding.encode_into(text, &mut self.bytes)?;
        line.clear();

        self.writer.write_all(&self.bytes)?;
        self.records_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects records in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub header: Option<Vec<String>>,
    pub records: Vec<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, values: &[String]) -> Result<()> {
        if !values.is_empty() {
            self.records.push(values.to_vec());
        }
        Ok(())
    }

    fn write_header(&mut self, names: &[String]) -> Result<()> {
        self.header = Some(names.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_csv_writer_defaults() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfig::default()).unwrap();
        writer.write_header(&strings(&["NAME", "EMAIL"])).unwrap();
        writer.write_record(&strings(&["Alice", "a@x"])).unwrap();
        writer.write_record(&strings(&["", ""])).unwrap();
        assert_eq!(writer.records_written(), 3);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "NAME;EMAIL\r\nAlice;a@x\r\n;\r\n");
    }

    #[test]
    fn test_csv_writer_quotes_when_needed() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfig::default()).unwrap();
        writer
            .write_record(&strings(&["a;b", "say \"hi\"", "two\nlines", "plain, text"]))
            .unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            output,
            "\"a;b\";\"say \"\"hi\"\"\";\"two\nlines\";plain, text\r\n"
        );
    }

    #[test]
    fn test_empty_record_is_skipped() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfig::default()).unwrap();
        writer.write_record(&[]).unwrap();
        assert_eq!(writer.records_written(), 0);
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_custom_format_and_charset() {
        let config = CsvConfig {
            encoding: Charset::Latin1,
            column_delimiter: ',',
            text_encapsulator: '\'',
            record_delimiter: "\n".to_string(),
            append: false,
        };
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer.write_record(&strings(&["café", "it's"])).unwrap();

        let mut expected = b"caf".to_vec();
        expected.push(0xE9);
        expected.extend_from_slice(b",'it''s'\n");
        assert_eq!(writer.into_inner(), expected);
    }

    #[test]
    fn test_unencodable_value_fails() {
        let config = CsvConfig {
            encoding: Charset::Ascii,
            ..CsvConfig::default()
        };
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        let err = writer.write_record(&strings(&["naïve"])).unwrap_err();
        assert!(matches!(err, ConvertError::Unencodable { ch: 'ï', .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CsvConfig {
            text_encapsulator: ';',
            ..CsvConfig::default()
        };
        assert!(CsvWriter::new(Vec::new(), config).is_err());
    }

    #[test]
    fn test_single_byte_terminator() {
        let config = CsvConfig {
            column_delimiter: '\t',
            record_delimiter: "|".to_string(),
            ..CsvConfig::default()
        };
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer.write_record(&strings(&["a", "b|c"])).unwrap();
        writer.write_record(&strings(&["d", "e"])).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "a\t\"b|c\"|d\te|");
    }

    #[test]
    fn test_records_of_different_widths() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfig::default()).unwrap();
        writer.write_record(&strings(&["A", "B"])).unwrap();
        writer.write_record(&strings(&["1", "1", "2"])).unwrap();
        writer.write_record(&strings(&["x"])).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "A;B\r\n1;1;2\r\nx\r\n");
    }

    #[test]
    fn test_utf16_output() {
        let config = CsvConfig {
            encoding: Charset::Utf16Le,
            record_delimiter: "\n".to_string(),
            ..CsvConfig::default()
        };
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer.write_record(&strings(&["A", "B"])).unwrap();

        assert_eq!(
            writer.into_inner(),
            vec![b'A', 0, b';', 0, b'B', 0, b'\n', 0]
        );
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_header(&strings(&["A"])).unwrap();
        sink.write_record(&strings(&["1"])).unwrap();
        sink.write_record(&[]).unwrap();

        assert_eq!(sink.header, Some(strings(&["A"])));
        assert_eq!(sink.records, vec![strings(&["1"])]);
    }
}
