//! Hierarchical validation report
//!
//! A [`Report`] aggregates validation outcomes for one submission:
//!
//! ```text
//! Report
//! └── DataTypeReport      (one per data type)
//!     └── FileTypeReport  (one per file type)
//!         └── FileReport  (one per file name)
//!             └── ErrorReport (one per error type + number)
//!                 └── FieldErrorReport (one per field name tuple)
//! ```
//!
//! Every bulk read or write is a visitor walked post-order over the tree (see
//! [`visitor`]); the node types only know how to hold data. Maps are keyed by
//! the identity of their children, so each node is unique within its parent
//! and serialization order is deterministic.

mod keyed;
pub mod operations;
pub mod taxonomy;
pub mod visitor;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{DataType, FileType};
use crate::state::SubmissionState;

pub use keyed::Keyed;
pub use taxonomy::{
    ErrorLevel, ErrorParameterKey, ErrorRecord, ErrorType, NOT_APPLICABLE_LINE_NUMBER,
    ParameterSpec,
};
pub use visitor::{ReportVisitor, ReportVisitorMut, accept, accept_mut};

use operations::{
    AbortVisitor, AddErrorVisitor, AddFieldVisitor, AddFileVisitor, AddSummaryVisitor,
    ErrorCountVisitor, GetFileReportVisitor, GetFilesVisitor, InheritStateVisitor, IsValidVisitor,
    RefreshStateVisitor, RemoveFileVisitor, ResetVisitor,
};

/// Maximum number of offending line numbers and values kept per field error.
/// The count keeps growing past this bound.
pub const MAX_ERROR_SAMPLES: usize = 50;

/// Validation state of a report node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportState {
    #[default]
    NotValidated,
    Queued,
    Validating,
    Valid,
    Invalid,
    Error,
}

pub type DataTypeState = ReportState;
pub type FileTypeState = ReportState;
pub type FileState = ReportState;

impl From<SubmissionState> for ReportState {
    fn from(state: SubmissionState) -> Self {
        match state {
            SubmissionState::NotValidated => ReportState::NotValidated,
            SubmissionState::Queued => ReportState::Queued,
            SubmissionState::Validating => ReportState::Validating,
            SubmissionState::Valid | SubmissionState::SignedOff => ReportState::Valid,
            SubmissionState::Invalid => ReportState::Invalid,
            SubmissionState::Error => ReportState::Error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(with = "keyed")]
    data_type_reports: BTreeMap<DataType, DataTypeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeReport {
    data_type: DataType,
    data_type_state: DataTypeState,
    #[serde(with = "keyed")]
    file_type_reports: BTreeMap<FileType, FileTypeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTypeReport {
    file_type: FileType,
    file_type_state: FileTypeState,
    #[serde(with = "keyed")]
    file_reports: BTreeMap<String, FileReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    file_name: String,
    file_type: FileType,
    file_state: FileState,
    summary_reports: Vec<SummaryReport>,
    field_reports: Vec<FieldReport>,
    #[serde(with = "keyed")]
    error_reports: BTreeMap<(ErrorType, i32), ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    error_type: ErrorType,
    number: i32,
    description: String,
    #[serde(with = "keyed")]
    field_error_reports: BTreeMap<Vec<String>, FieldErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrorReport {
    field_names: Vec<String>,
    parameters: BTreeMap<ErrorParameterKey, Value>,
    count: u64,
    line_numbers: Vec<i64>,
    values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub name: String,
    pub value: String,
}

/// Per-field statistics gathered while a file is validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub name: String,
    pub nulls: u64,
    pub missing: u64,
    pub populated: u64,
    #[serde(default)]
    pub summary: BTreeMap<String, Value>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a report with one not-validated file entry per known file.
    pub fn from_files(files: &BTreeMap<String, FileType>) -> Self {
        let mut report = Self::new();
        report.refresh_files(files);
        report
    }

    pub fn data_type_reports(&self) -> impl Iterator<Item = &DataTypeReport> {
        self.data_type_reports.values()
    }

    pub fn data_type_report(&self, data_type: DataType) -> Option<&DataTypeReport> {
        self.data_type_reports.get(&data_type)
    }

    pub fn is_empty(&self) -> bool {
        self.data_type_reports.is_empty()
    }

    pub fn add_error(&mut self, error: ErrorRecord) {
        self.execute(AddErrorVisitor::new(error));
    }

    pub fn add_summary(&mut self, file_name: &str, name: &str, value: &str) {
        self.execute(AddSummaryVisitor::new(file_name, name, value));
    }

    pub fn add_field_report(&mut self, file_name: &str, field_report: FieldReport) {
        self.execute(AddFieldVisitor::new(file_name, field_report));
    }

    /// Current mapping of file name to file type
    pub fn files(&self) -> BTreeMap<String, FileType> {
        self.inspect(GetFilesVisitor::default()).into_files()
    }

    /// Synchronizes the file entries with `current_files`.
    ///
    /// Entries present only in `current_files` are added and entries present
    /// only in the report are removed. A file whose type changed counts as
    /// both, so it is re-created under its new type.
    pub fn refresh_files(&mut self, current_files: &BTreeMap<String, FileType>) {
        let previous_files = self.files();

        for (file_name, file_type) in &previous_files {
            if current_files.get(file_name) != Some(file_type) {
                self.remove_file(*file_type, file_name);
            }
        }
        for (file_name, file_type) in current_files {
            if previous_files.get(file_name) != Some(file_type) {
                self.add_file(*file_type, file_name);
            }
        }
    }

    pub fn add_file(&mut self, file_type: FileType, file_name: &str) {
        self.execute(AddFileVisitor::new(file_type, file_name));
    }

    /// Removes a file entry, pruning file-type and data-type nodes left empty.
    pub fn remove_file(&mut self, file_type: FileType, file_name: &str) {
        self.execute(RemoveFileVisitor::new(file_type, file_name));
    }

    pub fn file_report(&self, file_name: &str) -> Option<FileReport> {
        self.inspect(GetFileReportVisitor::new(file_name))
            .into_file_report()
    }

    /// Total number of recorded error occurrences
    pub fn error_count(&self) -> u64 {
        self.inspect(ErrorCountVisitor::default()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_valid(&self) -> bool {
        self.inspect(IsValidVisitor::default()).is_valid()
    }

    pub fn reset_all(&mut self) {
        self.reset_data_types(&DataType::ALL);
    }

    /// Clears recorded outcomes for `data_types` and returns them to not validated.
    pub fn reset_data_types(&mut self, data_types: &[DataType]) {
        self.execute(ResetVisitor::new(data_types));
    }

    /// Projects a submission state onto every node of `data_types`.
    pub fn inherit_state(&mut self, state: SubmissionState, data_types: &[DataType]) {
        self.execute(InheritStateVisitor::new(state.into(), data_types));
    }

    /// Returns queued or validating nodes of `data_types` to not validated.
    pub fn abort(&mut self, data_types: &[DataType]) {
        self.execute(AbortVisitor::new(data_types));
    }

    /// Re-derives valid and invalid states bottom-up from the recorded errors.
    pub fn refresh_state(&mut self) {
        self.execute(RefreshStateVisitor::default());
    }

    /// Carries forward `original`'s reports for data types outside `selected`.
    ///
    /// Data types in `selected` keep this report's freshly computed nodes.
    pub fn merge_report(&mut self, original: &Report, selected: &[DataType]) {
        for (data_type, original_report) in &original.data_type_reports {
            if selected.contains(data_type) {
                info!(data_type = %data_type, "Keeping new report");
            } else {
                info!(data_type = %data_type, "Merging in original data type report");
                self.data_type_reports
                    .insert(*data_type, original_report.clone());
            }
        }
    }

    fn execute<V: ReportVisitorMut>(&mut self, mut visitor: V) -> V {
        accept_mut(self, &mut visitor);
        visitor
    }

    fn inspect<V: ReportVisitor>(&self, mut visitor: V) -> V {
        accept(self, &mut visitor);
        visitor
    }
}

impl DataTypeReport {
    fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            data_type_state: ReportState::default(),
            file_type_reports: BTreeMap::new(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn state(&self) -> DataTypeState {
        self.data_type_state
    }

    pub fn file_type_reports(&self) -> impl Iterator<Item = &FileTypeReport> {
        self.file_type_reports.values()
    }

    pub fn file_type_report(&self, file_type: FileType) -> Option<&FileTypeReport> {
        self.file_type_reports.get(&file_type)
    }
}

impl FileTypeReport {
    fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            file_type_state: ReportState::default(),
            file_reports: BTreeMap::new(),
        }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn state(&self) -> FileTypeState {
        self.file_type_state
    }

    pub fn file_reports(&self) -> impl Iterator<Item = &FileReport> {
        self.file_reports.values()
    }
}

impl FileReport {
    fn new(file_type: FileType, file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_type,
            file_state: ReportState::default(),
            summary_reports: Vec::new(),
            field_reports: Vec::new(),
            error_reports: BTreeMap::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn state(&self) -> FileState {
        self.file_state
    }

    pub fn summary_reports(&self) -> &[SummaryReport] {
        &self.summary_reports
    }

    pub fn field_reports(&self) -> &[FieldReport] {
        &self.field_reports
    }

    pub fn error_reports(&self) -> impl Iterator<Item = &ErrorReport> {
        self.error_reports.values()
    }

    pub fn error_report(&self, error_type: ErrorType, number: i32) -> Option<&ErrorReport> {
        self.error_reports.get(&(error_type, number))
    }

    pub fn has_errors(&self) -> bool {
        !self.error_reports.is_empty()
    }

    fn add_error(&mut self, error: &ErrorRecord) {
        self.error_reports
            .entry((error.error_type, error.number))
            .or_insert_with(|| ErrorReport::new(error.error_type, error.number))
            .add_error(error);
    }

    fn clear(&mut self) {
        self.summary_reports.clear();
        self.field_reports.clear();
        self.error_reports.clear();
    }
}

impl ErrorReport {
    fn new(error_type: ErrorType, number: i32) -> Self {
        Self {
            error_type,
            number,
            description: error_type.message().to_string(),
            field_error_reports: BTreeMap::new(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn field_error_reports(&self) -> impl Iterator<Item = &FieldErrorReport> {
        self.field_error_reports.values()
    }

    /// Sum of the counts of every field error bucket
    pub fn count(&self) -> u64 {
        self.field_error_reports.values().map(|field| field.count).sum()
    }

    fn add_error(&mut self, error: &ErrorRecord) {
        self.field_error_reports
            .entry(error.field_names.clone())
            .or_insert_with(|| FieldErrorReport::new(error))
            .record(error.line_number, &error.value);
    }
}

impl FieldErrorReport {
    fn new(error: &ErrorRecord) -> Self {
        let parameters = error.error_type.build(&error.params).unwrap_or_else(|e| {
            warn!(file = %error.file_name, error = %e, "Dropping malformed error parameters");
            BTreeMap::new()
        });

        Self {
            field_names: error.field_names.clone(),
            parameters,
            count: 0,
            line_numbers: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn parameters(&self) -> &BTreeMap<ErrorParameterKey, Value> {
        &self.parameters
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn line_numbers(&self) -> &[i64] {
        &self.line_numbers
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn record(&mut self, line_number: i64, value: &Value) {
        self.count += 1;
        if self.line_numbers.len() < MAX_ERROR_SAMPLES {
            self.line_numbers.push(line_number);
        }
        if self.values.len() < MAX_ERROR_SAMPLES {
            self.values.push(value.clone());
        }
    }
}

impl Keyed for DataTypeReport {
    type Key = DataType;

    fn key(&self) -> DataType {
        self.data_type
    }
}

impl Keyed for FileTypeReport {
    type Key = FileType;

    fn key(&self) -> FileType {
        self.file_type
    }
}

impl Keyed for FileReport {
    type Key = String;

    fn key(&self) -> String {
        self.file_name.clone()
    }
}

impl Keyed for ErrorReport {
    type Key = (ErrorType, i32);

    fn key(&self) -> (ErrorType, i32) {
        (self.error_type, self.number)
    }
}

impl Keyed for FieldErrorReport {
    type Key = Vec<String>;

    fn key(&self) -> Vec<String> {
        self.field_names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files(entries: &[(&str, FileType)]) -> BTreeMap<String, FileType> {
        entries
            .iter()
            .map(|(name, file_type)| (name.to_string(), *file_type))
            .collect()
    }

    fn missing_donor_id(line: i64) -> ErrorRecord {
        ErrorRecord::new(ErrorType::MissingValueError, "donor.txt")
            .with_fields(["donor_id"])
            .at_line(line)
            .with_value("")
    }

    #[test]
    fn test_from_files_builds_hierarchy() {
        let report = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("ssm_m.txt", FileType::SsmM),
            ("ssm_p.txt", FileType::SsmP),
        ]));

        assert_eq!(report.data_type_reports().count(), 2);
        let ssm = report.data_type_report(DataType::Ssm).unwrap();
        assert_eq!(ssm.file_type_reports().count(), 2);
        assert_eq!(ssm.state(), ReportState::NotValidated);
        assert!(report.is_valid());
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_add_error_caps_samples_but_not_count() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));

        for line in 1..=(MAX_ERROR_SAMPLES as i64 + 25) {
            report.add_error(missing_donor_id(line));
        }

        let file = report.file_report("donor.txt").unwrap();
        let error = file.error_report(ErrorType::MissingValueError, 0).unwrap();
        let field = error.field_error_reports().next().unwrap();
        assert_eq!(field.count(), MAX_ERROR_SAMPLES as u64 + 25);
        assert_eq!(field.line_numbers().len(), MAX_ERROR_SAMPLES);
        assert_eq!(field.values().len(), MAX_ERROR_SAMPLES);
        assert_eq!(field.line_numbers()[0], 1);
        assert_eq!(report.error_count(), MAX_ERROR_SAMPLES as u64 + 25);
    }

    #[test]
    fn test_errors_bucket_by_type_number_and_fields() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.add_error(missing_donor_id(1));
        report.add_error(missing_donor_id(2));
        report.add_error(missing_donor_id(3).with_number(1));
        report.add_error(
            ErrorRecord::new(ErrorType::MissingValueError, "donor.txt")
                .with_fields(["donor_sex"])
                .at_line(4),
        );

        let file = report.file_report("donor.txt").unwrap();
        assert_eq!(file.error_reports().count(), 2);
        let first = file.error_report(ErrorType::MissingValueError, 0).unwrap();
        assert_eq!(first.field_error_reports().count(), 2);
        assert_eq!(first.count(), 3);
        assert_eq!(report.error_count(), 4);
    }

    #[test]
    fn test_error_for_unknown_file_is_dropped() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.add_error(ErrorRecord::new(ErrorType::MissingValueError, "other.txt"));

        assert!(report.is_valid());
        assert!(report.file_report("other.txt").is_none());
    }

    #[test]
    fn test_error_parameters_are_built() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.add_error(
            ErrorRecord::new(ErrorType::RegexError, "donor.txt")
                .with_fields(["donor_id"])
                .at_line(2)
                .with_value("x y")
                .with_params(vec![json!("^\\S+$")]),
        );

        let file = report.file_report("donor.txt").unwrap();
        let field = file
            .error_report(ErrorType::RegexError, 0)
            .unwrap()
            .field_error_reports()
            .next()
            .unwrap()
            .clone();
        assert_eq!(
            field.parameters().get(&ErrorParameterKey::Expected),
            Some(&json!("^\\S+$"))
        );
    }

    #[test]
    fn test_refresh_files_adds_removes_and_retypes() {
        let mut report = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("specimen.txt", FileType::Specimen),
        ]));
        report.add_error(missing_donor_id(1));

        report.refresh_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("sample.txt", FileType::Sample),
        ]));

        let current = report.files();
        assert_eq!(current.len(), 2);
        assert!(current.contains_key("sample.txt"));
        assert!(report.data_type_report(DataType::Specimen).is_none());
        // Unchanged files keep their errors
        assert!(report.has_errors());

        report.refresh_files(&files(&[
            ("donor.txt", FileType::Specimen),
            ("sample.txt", FileType::Sample),
        ]));
        assert_eq!(report.files().get("donor.txt"), Some(&FileType::Specimen));
        assert!(report.data_type_report(DataType::Donor).is_none());
        assert!(report.is_valid());
    }

    #[test]
    fn test_refresh_files_is_idempotent() {
        let current = files(&[
            ("donor.txt", FileType::Donor),
            ("ssm_p.txt", FileType::SsmP),
        ]);
        let mut report = Report::new();
        report.refresh_files(&current);
        report.add_error(missing_donor_id(7));
        let snapshot = report.clone();

        report.refresh_files(&current);
        assert_eq!(report, snapshot);
    }

    #[test]
    fn test_summary_and_field_reports() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.add_summary("donor.txt", "rows", "120");
        report.add_field_report(
            "donor.txt",
            FieldReport {
                name: "donor_id".to_string(),
                populated: 120,
                ..Default::default()
            },
        );

        let file = report.file_report("donor.txt").unwrap();
        assert_eq!(file.summary_reports()[0].value, "120");
        assert_eq!(file.field_reports()[0].populated, 120);
    }

    #[test]
    fn test_reset_and_inherit_scoped_to_data_types() {
        let mut report = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("specimen.txt", FileType::Specimen),
        ]));
        report.add_error(missing_donor_id(1));
        report.add_error(ErrorRecord::new(ErrorType::MissingRowsError, "specimen.txt"));

        report.inherit_state(SubmissionState::Queued, &[DataType::Donor]);
        assert_eq!(
            report.data_type_report(DataType::Donor).unwrap().state(),
            ReportState::Queued
        );
        assert_eq!(
            report.file_report("donor.txt").unwrap().state(),
            ReportState::Queued
        );
        assert_eq!(
            report.data_type_report(DataType::Specimen).unwrap().state(),
            ReportState::NotValidated
        );

        report.reset_data_types(&[DataType::Donor]);
        assert!(!report.file_report("donor.txt").unwrap().has_errors());
        assert!(report.file_report("specimen.txt").unwrap().has_errors());
        assert_eq!(
            report.file_report("donor.txt").unwrap().state(),
            ReportState::NotValidated
        );

        report.reset_all();
        assert!(report.is_valid());
        assert_eq!(report.files().len(), 2);
    }

    #[test]
    fn test_abort_only_touches_in_flight_nodes() {
        let mut report = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("specimen.txt", FileType::Specimen),
        ]));
        report.inherit_state(SubmissionState::Validating, &[DataType::Donor]);
        report.inherit_state(SubmissionState::Invalid, &[DataType::Specimen]);

        report.abort(&[DataType::Donor, DataType::Specimen]);

        assert_eq!(
            report.file_report("donor.txt").unwrap().state(),
            ReportState::NotValidated
        );
        assert_eq!(
            report.file_report("specimen.txt").unwrap().state(),
            ReportState::Invalid
        );
    }

    #[test]
    fn test_refresh_state_derives_validity() {
        let mut report = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("ssm_m.txt", FileType::SsmM),
            ("ssm_p.txt", FileType::SsmP),
        ]));
        report.inherit_state(SubmissionState::Validating, &DataType::ALL);
        report.add_error(
            ErrorRecord::new(ErrorType::MissingValueError, "ssm_p.txt")
                .with_fields(["mutation"])
                .at_line(9),
        );

        report.refresh_state();

        assert_eq!(
            report.file_report("donor.txt").unwrap().state(),
            ReportState::Valid
        );
        assert_eq!(
            report.file_report("ssm_p.txt").unwrap().state(),
            ReportState::Invalid
        );
        assert_eq!(
            report.file_report("ssm_m.txt").unwrap().state(),
            ReportState::Valid
        );
        let ssm = report.data_type_report(DataType::Ssm).unwrap();
        assert_eq!(ssm.state(), ReportState::Invalid);
        assert_eq!(
            ssm.file_type_report(FileType::SsmM).unwrap().state(),
            ReportState::Valid
        );
        assert_eq!(
            report.data_type_report(DataType::Donor).unwrap().state(),
            ReportState::Valid
        );
    }

    #[test]
    fn test_refresh_state_leaves_not_validated_nodes() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.refresh_state();
        assert_eq!(
            report.file_report("donor.txt").unwrap().state(),
            ReportState::NotValidated
        );
    }

    #[test]
    fn test_merge_report_keeps_selected_and_carries_the_rest() {
        let mut original = Report::from_files(&files(&[("specimen.txt", FileType::Specimen)]));
        original.add_summary("specimen.txt", "source", "original");

        let mut fresh = Report::from_files(&files(&[
            ("donor.txt", FileType::Donor),
            ("specimen.txt", FileType::Specimen),
        ]));
        fresh.add_summary("donor.txt", "source", "fresh");
        fresh.add_summary("specimen.txt", "source", "fresh");

        fresh.merge_report(&original, &[DataType::Donor]);

        let donor = fresh.file_report("donor.txt").unwrap();
        assert_eq!(donor.summary_reports()[0].value, "fresh");
        let specimen = fresh.file_report("specimen.txt").unwrap();
        assert_eq!(specimen.summary_reports()[0].value, "original");
    }

    #[test]
    fn test_serialized_shape() {
        let mut report = Report::from_files(&files(&[("donor.txt", FileType::Donor)]));
        report.add_error(
            ErrorRecord::new(ErrorType::OutOfRangeError, "donor.txt")
                .with_fields(["donor_age"])
                .at_line(5)
                .with_value(200)
                .with_params(vec![json!(0), json!(120)]),
        );

        let json = serde_json::to_value(&report).unwrap();
        let data_type = &json["dataTypeReports"][0];
        assert_eq!(data_type["dataType"], json!("DONOR"));
        assert_eq!(data_type["dataTypeState"], json!("NOT_VALIDATED"));
        let file = &data_type["fileTypeReports"][0]["fileReports"][0];
        assert_eq!(file["fileName"], json!("donor.txt"));
        let field = &file["errorReports"][0]["fieldErrorReports"][0];
        assert_eq!(field["parameters"]["MIN"], json!(0));
        assert_eq!(field["parameters"]["MAX"], json!(120));
        assert_eq!(field["count"], json!(1));
    }
}
