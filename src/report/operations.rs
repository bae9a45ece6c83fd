//! Bulk report operations, one visitor each.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::visitor::{ReportVisitor, ReportVisitorMut};
use super::{
    DataTypeReport, ErrorRecord, ErrorReport, FieldReport, FileReport, FileTypeReport, Report,
    ReportState, SummaryReport,
};
use crate::model::{DataType, FileType};

fn selection(data_types: &[DataType]) -> BTreeSet<DataType> {
    data_types.iter().copied().collect()
}

/// Routes an error to the file report matching its file name.
pub struct AddErrorVisitor {
    error: ErrorRecord,
    found: bool,
}

impl AddErrorVisitor {
    pub fn new(error: ErrorRecord) -> Self {
        Self {
            error,
            found: false,
        }
    }
}

impl ReportVisitorMut for AddErrorVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if report.file_name == self.error.file_name {
            report.add_error(&self.error);
            self.found = true;
        }
    }

    fn visit_report(&mut self, _report: &mut Report) {
        if !self.found {
            warn!(
                file = %self.error.file_name,
                error_type = ?self.error.error_type,
                "No file report for error, dropping it"
            );
        }
    }
}

pub struct AddSummaryVisitor {
    file_name: String,
    summary: SummaryReport,
}

impl AddSummaryVisitor {
    pub fn new(file_name: &str, name: &str, value: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            summary: SummaryReport {
                name: name.to_string(),
                value: value.to_string(),
            },
        }
    }
}

impl ReportVisitorMut for AddSummaryVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if report.file_name == self.file_name {
            report.summary_reports.push(self.summary.clone());
        }
    }
}

pub struct AddFieldVisitor {
    file_name: String,
    field_report: FieldReport,
}

impl AddFieldVisitor {
    pub fn new(file_name: &str, field_report: FieldReport) -> Self {
        Self {
            file_name: file_name.to_string(),
            field_report,
        }
    }
}

impl ReportVisitorMut for AddFieldVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if report.file_name == self.file_name {
            report.field_reports.push(self.field_report.clone());
        }
    }
}

/// Creates the file entry, along with missing file-type and data-type parents.
pub struct AddFileVisitor {
    file_type: FileType,
    file_name: String,
}

impl AddFileVisitor {
    pub fn new(file_type: FileType, file_name: &str) -> Self {
        Self {
            file_type,
            file_name: file_name.to_string(),
        }
    }
}

impl ReportVisitorMut for AddFileVisitor {
    fn visit_report(&mut self, report: &mut Report) {
        let data_type = self.file_type.data_type();
        report
            .data_type_reports
            .entry(data_type)
            .or_insert_with(|| DataTypeReport::new(data_type))
            .file_type_reports
            .entry(self.file_type)
            .or_insert_with(|| FileTypeReport::new(self.file_type))
            .file_reports
            .entry(self.file_name.clone())
            .or_insert_with(|| FileReport::new(self.file_type, &self.file_name));
    }
}

/// Removes the file entry and prunes parents left without children.
pub struct RemoveFileVisitor {
    file_type: FileType,
    file_name: String,
}

impl RemoveFileVisitor {
    pub fn new(file_type: FileType, file_name: &str) -> Self {
        Self {
            file_type,
            file_name: file_name.to_string(),
        }
    }
}

impl ReportVisitorMut for RemoveFileVisitor {
    fn visit_file_type(&mut self, report: &mut FileTypeReport) {
        if report.file_type == self.file_type {
            report.file_reports.remove(&self.file_name);
        }
    }

    fn visit_data_type(&mut self, report: &mut DataTypeReport) {
        report
            .file_type_reports
            .retain(|_, file_type_report| !file_type_report.file_reports.is_empty());
    }

    fn visit_report(&mut self, report: &mut Report) {
        report
            .data_type_reports
            .retain(|_, data_type_report| !data_type_report.file_type_reports.is_empty());
    }
}

#[derive(Default)]
pub struct GetFilesVisitor {
    files: BTreeMap<String, FileType>,
}

impl GetFilesVisitor {
    pub fn into_files(self) -> BTreeMap<String, FileType> {
        self.files
    }
}

impl ReportVisitor for GetFilesVisitor {
    fn visit_file(&mut self, report: &FileReport) {
        self.files.insert(report.file_name.clone(), report.file_type);
    }
}

pub struct GetFileReportVisitor {
    file_name: String,
    file_report: Option<FileReport>,
}

impl GetFileReportVisitor {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_report: None,
        }
    }

    pub fn into_file_report(self) -> Option<FileReport> {
        self.file_report
    }
}

impl ReportVisitor for GetFileReportVisitor {
    fn visit_file(&mut self, report: &FileReport) {
        if report.file_name == self.file_name {
            self.file_report = Some(report.clone());
        }
    }
}

#[derive(Default)]
pub struct ErrorCountVisitor {
    count: u64,
}

impl ErrorCountVisitor {
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl ReportVisitor for ErrorCountVisitor {
    fn visit_error(&mut self, report: &ErrorReport) {
        self.count += report.count();
    }
}

pub struct IsValidVisitor {
    valid: bool,
}

impl Default for IsValidVisitor {
    fn default() -> Self {
        Self { valid: true }
    }
}

impl IsValidVisitor {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl ReportVisitor for IsValidVisitor {
    fn visit_error(&mut self, report: &ErrorReport) {
        if report.field_error_reports().any(|field| field.count() > 0) {
            self.valid = false;
        }
    }
}

/// Clears outcomes of the selected data types.
pub struct ResetVisitor {
    data_types: BTreeSet<DataType>,
}

impl ResetVisitor {
    pub fn new(data_types: &[DataType]) -> Self {
        Self {
            data_types: selection(data_types),
        }
    }
}

impl ReportVisitorMut for ResetVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            report.clear();
            report.file_state = ReportState::NotValidated;
        }
    }

    fn visit_file_type(&mut self, report: &mut FileTypeReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            report.file_type_state = ReportState::NotValidated;
        }
    }

    fn visit_data_type(&mut self, report: &mut DataTypeReport) {
        if self.data_types.contains(&report.data_type) {
            report.data_type_state = ReportState::NotValidated;
        }
    }
}

pub struct InheritStateVisitor {
    state: ReportState,
    data_types: BTreeSet<DataType>,
}

impl InheritStateVisitor {
    pub fn new(state: ReportState, data_types: &[DataType]) -> Self {
        Self {
            state,
            data_types: selection(data_types),
        }
    }
}

impl ReportVisitorMut for InheritStateVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            report.file_state = self.state;
        }
    }

    fn visit_file_type(&mut self, report: &mut FileTypeReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            report.file_type_state = self.state;
        }
    }

    fn visit_data_type(&mut self, report: &mut DataTypeReport) {
        if self.data_types.contains(&report.data_type) {
            report.data_type_state = self.state;
        }
    }
}

pub struct AbortVisitor {
    data_types: BTreeSet<DataType>,
}

impl AbortVisitor {
    pub fn new(data_types: &[DataType]) -> Self {
        Self {
            data_types: selection(data_types),
        }
    }
}

fn abort_state(state: &mut ReportState) {
    if matches!(state, ReportState::Queued | ReportState::Validating) {
        *state = ReportState::NotValidated;
    }
}

impl ReportVisitorMut for AbortVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            abort_state(&mut report.file_state);
        }
    }

    fn visit_file_type(&mut self, report: &mut FileTypeReport) {
        if self.data_types.contains(&report.file_type.data_type()) {
            abort_state(&mut report.file_type_state);
        }
    }

    fn visit_data_type(&mut self, report: &mut DataTypeReport) {
        if self.data_types.contains(&report.data_type) {
            abort_state(&mut report.data_type_state);
        }
    }
}

/// Re-derives valid and invalid states from the errors held by each file.
///
/// Files journal whether they are valid or invalid as they are visited; file
/// types and data types then read that journal, which post-order traversal
/// guarantees is complete for their subtree.
#[derive(Default)]
pub struct RefreshStateVisitor {
    valid_data_types: BTreeSet<DataType>,
    valid_file_types: BTreeSet<FileType>,
    invalid_data_types: BTreeSet<DataType>,
    invalid_file_types: BTreeSet<FileType>,
}

impl RefreshStateVisitor {
    fn refresh(
        state: &mut ReportState,
        invalid: bool,
        valid: bool,
    ) -> Option<ReportState> {
        if matches!(state, ReportState::Valid | ReportState::Validating) && invalid {
            *state = ReportState::Invalid;
        } else if matches!(state, ReportState::Invalid | ReportState::Validating) && valid {
            *state = ReportState::Valid;
        }
        Some(*state).filter(|s| matches!(s, ReportState::Valid | ReportState::Invalid))
    }

    fn record(&mut self, file_type: FileType, valid: bool) {
        if valid {
            self.valid_file_types.insert(file_type);
            self.valid_data_types.insert(file_type.data_type());
        } else {
            self.invalid_file_types.insert(file_type);
            self.invalid_data_types.insert(file_type.data_type());
        }
    }
}

impl ReportVisitorMut for RefreshStateVisitor {
    fn visit_file(&mut self, report: &mut FileReport) {
        let has_errors = report.has_errors();
        // Files already VALID or INVALID pass their state upward unchanged.
        if let Some(state) = Self::refresh(&mut report.file_state, has_errors, !has_errors) {
            self.record(report.file_type, state == ReportState::Valid);
        }
    }

    fn visit_file_type(&mut self, report: &mut FileTypeReport) {
        let file_type = report.file_type;
        let invalid = self.invalid_file_types.contains(&file_type);
        let valid = self.valid_file_types.contains(&file_type) && !invalid;
        Self::refresh(&mut report.file_type_state, invalid, valid);
    }

    fn visit_data_type(&mut self, report: &mut DataTypeReport) {
        let data_type = report.data_type;
        let invalid = self.invalid_data_types.contains(&data_type);
        let valid = self.valid_data_types.contains(&data_type) && !invalid;
        Self::refresh(&mut report.data_type_state, invalid, valid);
    }
}
