use crate::error::{ConvertError, Result};
use csv::Terminator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Path value that marks a column as always empty in definition files
pub const OMITTED_PATH: &str = "EMPTY_JSON_PATH";

/// Where a column takes its value from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldPath {
    /// Path into the document, possibly with `[*]` wildcards
    Real(String),
    /// Column with no document lookup; contributes no value to a row
    Omitted,
}

impl FieldPath {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldPath::Real(path) => Some(path),
            FieldPath::Omitted => None,
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, FieldPath::Omitted)
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        if raw.is_empty() || raw.eq_ignore_ascii_case(OMITTED_PATH) {
            FieldPath::Omitted
        } else {
            FieldPath::Real(raw)
        }
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        FieldPath::from(raw.to_string())
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        match path {
            FieldPath::Real(path) => path,
            FieldPath::Omitted => OMITTED_PATH.to_string(),
        }
    }
}

/// Converts the raw value of a field into zero or more output cells
pub trait ValueMapper: Send + Sync {
    fn map(&self, field: &FieldSpec, value: Option<&str>) -> Vec<String>;
}

impl<F> ValueMapper for F
where
    F: Fn(&FieldSpec, Option<&str>) -> Vec<String> + Send + Sync,
{
    fn map(&self, field: &FieldSpec, value: Option<&str>) -> Vec<String> {
        self(field, value)
    }
}

/// One output column: its header name, source path and value policy
#[derive(Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name written to the header
    pub name: String,

    /// Source of the column value
    pub path: FieldPath,

    /// Drop the whole row when this field resolves to nothing
    #[serde(default)]
    pub required: bool,

    /// Optional custom conversion of the raw value
    #[serde(skip)]
    pub mapper: Option<Arc<dyn ValueMapper>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, path: impl Into<FieldPath>) -> Self {
        FieldSpec {
            name: name.into(),
            path: path.into(),
            required: false,
            mapper: None,
        }
    }

    /// A column that is always empty
    pub fn omitted(name: impl Into<String>) -> Self {
        Self::new(name, FieldPath::Omitted)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn ValueMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn map_with<F>(self, mapper: F) -> Self
    where
        F: Fn(&FieldSpec, Option<&str>) -> Vec<String> + Send + Sync + 'static,
    {
        self.with_mapper(Arc::new(mapper))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("required", &self.required)
            .field("mapper", &self.mapper.is_some())
            .finish()
    }
}

/// Character encodings the CSV writer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Append `text` encoded in this charset to `out`
    pub fn encode_into(self, text: &str, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Charset::Utf8 => out.extend_from_slice(text.as_bytes()),
            Charset::Utf16Le => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            Charset::Utf16Be => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Charset::Latin1 => self.encode_single_byte(text, 0xFF, out)?,
            Charset::Ascii => self.encode_single_byte(text, 0x7F, out)?,
        }
        Ok(())
    }

    fn encode_single_byte(self, text: &str, max: u32, out: &mut Vec<u8>) -> Result<()> {
        for ch in text.chars() {
            let code = ch as u32;
            if code > max {
                return Err(ConvertError::Unencodable {
                    charset: self.name().to_string(),
                    ch,
                });
            }
            out.push(code as u8);
        }
        Ok(())
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "UTF8" => Ok(Charset::Utf8),
            "UTF16LE" => Ok(Charset::Utf16Le),
            "UTF16BE" => Ok(Charset::Utf16Be),
            "ISO88591" | "LATIN1" => Ok(Charset::Latin1),
            "ASCII" | "USASCII" => Ok(Charset::Ascii),
            _ => Err(ConvertError::UnsupportedCharset(s.to_string())),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.name().to_string()
    }
}

/// Output format of the CSV sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Encoding of the bytes written
    pub encoding: Charset,

    /// Separator between cells of a record
    pub column_delimiter: char,

    /// Quote character wrapped around cells that need it
    pub text_encapsulator: char,

    /// Terminator written after every record
    pub record_delimiter: String,

    /// Append to an existing target file instead of truncating it
    pub append: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            encoding: Charset::Utf8,
            column_delimiter: ';',
            text_encapsulator: '"',
            record_delimiter: String::from("\r\n"),
            append: false,
        }
    }
}

impl CsvConfig {
    pub fn validate(&self) -> Result<()> {
        let delimiter = single_byte(self.column_delimiter, "column delimiter")?;
        let quote = single_byte(self.text_encapsulator, "text encapsulator")?;
        if delimiter == quote {
            return Err(ConvertError::InvalidConfig(format!(
                "column delimiter and text encapsulator are both {:?}",
                self.column_delimiter
            )));
        }
        self.terminator()?;
        Ok(())
    }

    /// Column delimiter as the single byte the CSV writer takes
    pub fn delimiter_byte(&self) -> Result<u8> {
        single_byte(self.column_delimiter, "column delimiter")
    }

    pub fn quote_byte(&self) -> Result<u8> {
        single_byte(self.text_encapsulator, "text encapsulator")
    }

    /// Record delimiter: `\r\n` or a single ASCII character
    pub fn terminator(&self) -> Result<Terminator> {
        if self.record_delimiter == "\r\n" {
            return Ok(Terminator::CRLF);
        }

        let mut chars = self.record_delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii() => Ok(Terminator::Any(ch as u8)),
            _ => Err(ConvertError::InvalidConfig(format!(
                "record delimiter must be \\r\\n or a single ASCII character, got {:?}",
                self.record_delimiter
            ))),
        }
    }
}

fn single_byte(value: char, name: &str) -> Result<u8> {
    if !value.is_ascii() || value == '\r' || value == '\n' {
        return Err(ConvertError::InvalidConfig(format!(
            "{} must be a single ASCII character other than a line break, got {:?}",
            name, value
        )));
    }
    Ok(value as u8)
}

/// A named target table: its columns in output order and the CSV format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvDefinition {
    #[serde(default)]
    pub name: String,

    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub csv: CsvConfig,
}

impl CsvDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        CsvDefinition {
            name: name.into(),
            fields,
            csv: CsvConfig::default(),
        }
    }

    pub fn with_config(mut self, csv: CsvConfig) -> Self {
        self.csv = csv;
        self
    }

    /// Header record: one name per field, in declaration order
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Load a definition from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_path_sentinel() {
        assert_eq!(FieldPath::from("EMPTY_JSON_PATH"), FieldPath::Omitted);
        assert_eq!(FieldPath::from("empty_json_path"), FieldPath::Omitted);
        assert_eq!(FieldPath::from(""), FieldPath::Omitted);
        assert_eq!(
            FieldPath::from("name"),
            FieldPath::Real("name".to_string())
        );
        assert_eq!(FieldSpec::omitted("X").path.as_str(), None);
    }

    #[test]
    fn test_definition_from_json() {
        let definition = CsvDefinition::from_json_str(
            r#"{
                "name": "tenants",
                "fields": [
                    {"name": "NAME", "path": "name"},
                    {"name": "TENANT", "path": "tenants[*].id", "required": true},
                    {"name": "SPARE", "path": "EMPTY_JSON_PATH"}
                ],
                "csv": {"column_delimiter": ",", "encoding": "latin1"}
            }"#,
        )
        .unwrap();

        assert_eq!(definition.header(), vec!["NAME", "TENANT", "SPARE"]);
        assert!(definition.fields[1].required);
        assert!(definition.fields[2].path.is_omitted());
        assert_eq!(definition.csv.column_delimiter, ',');
        assert_eq!(definition.csv.text_encapsulator, '"');
        assert_eq!(definition.csv.encoding, Charset::Latin1);
        assert_eq!(definition.csv.record_delimiter, "\r\n");
    }

    #[test]
    fn test_unknown_charset_is_rejected() {
        assert!(matches!(
            "EBCDIC".parse::<Charset>(),
            Err(ConvertError::UnsupportedCharset(_))
        ));
        assert_eq!("utf-16le".parse::<Charset>().unwrap(), Charset::Utf16Le);
        assert_eq!("US-ASCII".parse::<Charset>().unwrap(), Charset::Ascii);
    }

    #[test]
    fn test_charset_encoding() {
        let mut out = Vec::new();
        Charset::Latin1.encode_into("é;", &mut out).unwrap();
        assert_eq!(out, vec![0xE9, b';']);

        let mut out = Vec::new();
        Charset::Utf16Be.encode_into("A", &mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x41]);

        let mut out = Vec::new();
        let err = Charset::Ascii.encode_into("é", &mut out).unwrap_err();
        assert!(matches!(err, ConvertError::Unencodable { ch: 'é', .. }));
    }

    #[test]
    fn test_config_validation() {
        assert!(CsvConfig::default().validate().is_ok());

        let clash = CsvConfig {
            column_delimiter: '"',
            ..CsvConfig::default()
        };
        assert!(matches!(clash.validate(), Err(ConvertError::InvalidConfig(_))));

        let no_terminator = CsvConfig {
            record_delimiter: String::new(),
            ..CsvConfig::default()
        };
        assert!(no_terminator.validate().is_err());

        let wide_terminator = CsvConfig {
            record_delimiter: "||".to_string(),
            ..CsvConfig::default()
        };
        assert!(wide_terminator.validate().is_err());

        let wide_delimiter = CsvConfig {
            column_delimiter: 'é',
            ..CsvConfig::default()
        };
        assert!(matches!(wide_delimiter.validate(), Err(ConvertError::InvalidConfig(_))));

        let line_break = CsvConfig {
            text_encapsulator: '\n',
            ..CsvConfig::default()
        };
        assert!(line_break.validate().is_err());
    }

    #[test]
    fn test_config_terminator() {
        assert_eq!(CsvConfig::default().terminator().unwrap(), Terminator::CRLF);

        let pipe = CsvConfig {
            record_delimiter: "|".to_string(),
            ..CsvConfig::default()
        };
        assert_eq!(pipe.terminator().unwrap(), Terminator::Any(b'|'));
        assert_eq!(pipe.delimiter_byte().unwrap(), b';');
        assert_eq!(pipe.quote_byte().unwrap(), b'"');
    }

    #[test]
    fn test_mapper_is_attached() {
        let field = FieldSpec::new("NAME", "name")
            .required()
            .map_with(|_field: &FieldSpec, value: Option<&str>| {
                vec![value.unwrap_or("-").to_uppercase()]
            });

        let mapper = field.mapper.clone().unwrap();
        assert_eq!(mapper.map(&field, Some("abc")), vec!["ABC"]);
        assert_eq!(mapper.map(&field, None), vec!["-"]);
        assert!(format!("{:?}", field).contains("mapper: true"));
    }
}
