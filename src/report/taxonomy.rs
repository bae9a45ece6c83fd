//! Catalog of validation error kinds
//!
//! Every [`ErrorType`] carries its severity, its message template, whether it
//! is structural, and the positional parameter layout its `build` step maps
//! onto named [`ErrorParameterKey`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReportError;

/// Line number recorded for errors that are not tied to a row
pub const NOT_APPLICABLE_LINE_NUMBER: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorLevel {
    FileLevel,
    RowLevel,
    CellLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorParameterKey {
    Expected,
    Value,
    Value2,
    OtherSchema,
    OtherFields,
    Min,
    Max,
    Schema,
    Files,
    Fields,
}

/// Positional parameter layout of an error type.
///
/// `arity` is the exact number of parameters `build` accepts, or `None` when
/// the count is unchecked. The first `keys.len()` parameters are mapped onto
/// `keys` in order; any remaining ones only feed the message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub arity: Option<usize>,
    pub keys: &'static [ErrorParameterKey],
}

impl ParameterSpec {
    const fn unchecked() -> Self {
        Self {
            arity: None,
            keys: &[],
        }
    }

    const fn exact(arity: usize, keys: &'static [ErrorParameterKey]) -> Self {
        Self {
            arity: Some(arity),
            keys,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // Row level, structural
    StructurallyInvalidRowError,
    LineTerminatorMissingError,
    InvalidCharsetRowError,

    // Cell level
    ForbiddenValueError,
    RelationValueError,
    RelationParentValueError,
    UniqueValueError,
    ValueTypeError,
    OutOfRangeError,
    MissingValueError,
    CodelistError,
    DiscreteValuesError,
    RegexError,
    ScriptError,

    // File level
    TooManyFilesError,
    RelationFileError,
    ReverseRelationFileError,
    UnsupportedCompressedFile,
    CompressionCodecError,
    DuplicateHeaderError,
    MissingRowsError,
    FileHeaderError,

    // Cross-file consistency
    ReferenceGenomeMismatchError,
    ReferenceGenomeInsertionError,
    TooManyConfidentialObservationsError,
    SampleTypeMismatch,
    ReferenceSampleTypeMismatch,
    PcawgSampleStudyMismatch,
    PcawgClinicalFieldRequired,
    PcawgClinicalRowRequired,
}

impl ErrorType {
    pub fn level(self) -> ErrorLevel {
        use ErrorType::*;

        match self {
            StructurallyInvalidRowError
            | LineTerminatorMissingError
            | InvalidCharsetRowError
            | PcawgClinicalRowRequired => ErrorLevel::RowLevel,
            TooManyFilesError
            | RelationFileError
            | ReverseRelationFileError
            | UnsupportedCompressedFile
            | CompressionCodecError
            | DuplicateHeaderError
            | MissingRowsError
            | FileHeaderError
            | TooManyConfidentialObservationsError => ErrorLevel::FileLevel,
            ForbiddenValueError
            | RelationValueError
            | RelationParentValueError
            | UniqueValueError
            | ValueTypeError
            | OutOfRangeError
            | MissingValueError
            | CodelistError
            | DiscreteValuesError
            | RegexError
            | ScriptError
            | ReferenceGenomeMismatchError
            | ReferenceGenomeInsertionError
            | SampleTypeMismatch
            | ReferenceSampleTypeMismatch
            | PcawgSampleStudyMismatch
            | PcawgClinicalFieldRequired => ErrorLevel::CellLevel,
        }
    }

    /// Structural errors exclude the offending row from further row and cell checks.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            ErrorType::StructurallyInvalidRowError
                | ErrorType::LineTerminatorMissingError
                | ErrorType::InvalidCharsetRowError
        )
    }

    pub fn message(self) -> &'static str {
        use ErrorType::*;

        match self {
            StructurallyInvalidRowError => {
                "Structurally invalid row: %s columns against %s declared in the header (row will be ignored by the rest of validation)"
            }
            LineTerminatorMissingError => "Row is missing line terminator. Expected \\n",
            InvalidCharsetRowError => "Row contains invalid charset",
            ForbiddenValueError => {
                "Invalid value (%s) for field %s. Cannot use forbidden value: %s"
            }
            RelationValueError => {
                "Invalid value(s) (%s) for field(s) %s.%s. Expected to match value(s) in: %s.%s"
            }
            RelationParentValueError => "No corresponding values in %s.%s for value(s) %s in %s.%s",
            UniqueValueError => "Invalid set of values (%s) for fields %s. Expected to be unique",
            ValueTypeError => "Invalid value (%s) for field %s. Expected type is: %s",
            OutOfRangeError => {
                "Number %d is out of range for field %s. Expected value between %d and %d"
            }
            MissingValueError => "Value missing for required field: %s",
            CodelistError => {
                "Invalid value %s for field %s. Expected code or value from CodeList %s"
            }
            DiscreteValuesError => {
                "Invalid value %s for field %s. Expected one of the following values: %s"
            }
            RegexError => "Invalid value %s for field %s. Expected to match regex: %s",
            ScriptError => "Invalid value %s for field %s. Expected to pass script: %s",
            TooManyFilesError => "More than one file matches the schema pattern",
            RelationFileError => "Relation to schema %s has no matching file",
            ReverseRelationFileError => {
                "Relation from schema %s has no matching file and this relation imposes that there be one"
            }
            UnsupportedCompressedFile => {
                "The compressed file should not be concatenated or the block header is corrupted"
            }
            CompressionCodecError => "File compression type does not match file extension",
            DuplicateHeaderError => "Duplicate header found: %s",
            MissingRowsError => "No rows found: %s",
            FileHeaderError => "File header error: %s",
            ReferenceGenomeMismatchError | ReferenceGenomeInsertionError => {
                "Found value %s for column %s, reference genome is %s"
            }
            TooManyConfidentialObservationsError => {
                "An unreasonably high number of sensitive observations have been detected."
            }
            SampleTypeMismatch => {
                "Inconsistent sample type between clinical and experimental meta files"
            }
            ReferenceSampleTypeMismatch => {
                "Inconsistent reference sample type between clinical and experimental meta files"
            }
            PcawgSampleStudyMismatch => {
                "Inconsistent sample study between ICGC DCC and pancancer.info"
            }
            PcawgClinicalFieldRequired => "Clinical field is required for PanCancer",
            PcawgClinicalRowRequired => "Clinical row is required for PanCancer",
        }
    }

    pub fn parameters(self) -> ParameterSpec {
        use ErrorParameterKey as Key;
        use ErrorType::*;

        match self {
            StructurallyInvalidRowError => ParameterSpec::exact(1, &[Key::Expected]),
            LineTerminatorMissingError => ParameterSpec::unchecked(),
            InvalidCharsetRowError => ParameterSpec::exact(1, &[Key::Expected]),
            ForbiddenValueError => ParameterSpec::exact(1, &[Key::Value]),
            RelationValueError | RelationParentValueError => {
                ParameterSpec::exact(2, &[Key::OtherSchema, Key::OtherFields])
            }
            UniqueValueError => ParameterSpec::unchecked(),
            ValueTypeError => ParameterSpec::exact(1, &[Key::Expected]),
            OutOfRangeError => ParameterSpec::exact(2, &[Key::Min, Key::Max]),
            MissingValueError | CodelistError | ScriptError => ParameterSpec::unchecked(),
            DiscreteValuesError | RegexError => ParameterSpec::exact(1, &[Key::Expected]),
            TooManyFilesError => ParameterSpec::exact(2, &[Key::Schema, Key::Files]),
            RelationFileError
            | ReverseRelationFileError
            | UnsupportedCompressedFile
            | CompressionCodecError => ParameterSpec::exact(1, &[Key::Schema]),
            DuplicateHeaderError => ParameterSpec::exact(1, &[Key::Fields]),
            MissingRowsError => ParameterSpec::unchecked(),
            FileHeaderError => ParameterSpec::exact(2, &[Key::Expected, Key::Value]),
            ReferenceGenomeMismatchError | ReferenceGenomeInsertionError => {
                ParameterSpec::exact(1, &[Key::Expected])
            }
            TooManyConfidentialObservationsError => {
                ParameterSpec::exact(3, &[Key::Value, Key::Value2, Key::Expected])
            }
            SampleTypeMismatch | ReferenceSampleTypeMismatch => {
                ParameterSpec::exact(3, &[Key::Value, Key::Expected])
            }
            PcawgSampleStudyMismatch => ParameterSpec::unchecked(),
            PcawgClinicalFieldRequired => ParameterSpec::exact(1, &[]),
            PcawgClinicalRowRequired => ParameterSpec::exact(3, &[Key::Value]),
        }
    }

    /// Maps positional parameters onto named keys for message rendering.
    pub fn build(self, params: &[Value]) -> Result<BTreeMap<ErrorParameterKey, Value>, ReportError> {
        let spec = self.parameters();
        if let Some(expected) = spec.arity
            && params.len() != expected
        {
            return Err(ReportError::ParameterCount {
                error_type: self,
                expected,
                actual: params.len(),
            });
        }

        Ok(spec
            .keys
            .iter()
            .zip(params.iter())
            .map(|(key, value)| (*key, value.clone()))
            .collect())
    }
}

/// One concrete validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub error_type: ErrorType,
    pub number: i32,
    pub file_name: String,
    pub field_names: Vec<String>,
    pub line_number: i64,
    pub value: Value,
    pub params: Vec<Value>,
}

impl ErrorRecord {
    pub fn new(error_type: ErrorType, file_name: impl Into<String>) -> Self {
        Self {
            error_type,
            number: 0,
            file_name: file_name.into(),
            field_names: Vec::new(),
            line_number: NOT_APPLICABLE_LINE_NUMBER,
            value: Value::Null,
            params: Vec::new(),
        }
    }

    pub fn with_number(mut self, number: i32) -> Self {
        self.number = number;
        self
    }

    pub fn with_fields<I, S>(mut self, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_names = field_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn at_line(mut self, line_number: i64) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn level(&self) -> ErrorLevel {
        self.error_type.level()
    }
}
