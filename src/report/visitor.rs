//! Post-order traversal over the report tree.
//!
//! A visitor implements one method per node kind; every method defaults to a
//! no-op so an operation only overrides the levels it cares about. Children
//! are always visited before their parent, which lets an operation journal
//! facts at the leaves and act on them further up.

use super::{DataTypeReport, ErrorReport, FileReport, FileTypeReport, Report};

/// Read-only visitor
pub trait ReportVisitor {
    fn visit_report(&mut self, _report: &Report) {}

    fn visit_data_type(&mut self, _report: &DataTypeReport) {}

    fn visit_file_type(&mut self, _report: &FileTypeReport) {}

    fn visit_file(&mut self, _report: &FileReport) {}

    fn visit_error(&mut self, _report: &ErrorReport) {}
}

/// Mutating visitor
pub trait ReportVisitorMut {
    fn visit_report(&mut self, _report: &mut Report) {}

    fn visit_data_type(&mut self, _report: &mut DataTypeReport) {}

    fn visit_file_type(&mut self, _report: &mut FileTypeReport) {}

    fn visit_file(&mut self, _report: &mut FileReport) {}

    fn visit_error(&mut self, _report: &mut ErrorReport) {}
}

pub fn accept<V: ReportVisitor + ?Sized>(report: &Report, visitor: &mut V) {
    for data_type_report in report.data_type_reports.values() {
        for file_type_report in data_type_report.file_type_reports.values() {
            for file_report in file_type_report.file_reports.values() {
                for error_report in file_report.error_reports.values() {
                    visitor.visit_error(error_report);
                }
                visitor.visit_file(file_report);
            }
            visitor.visit_file_type(file_type_report);
        }
        visitor.visit_data_type(data_type_report);
    }
    visitor.visit_report(report);
}

pub fn accept_mut<V: ReportVisitorMut + ?Sized>(report: &mut Report, visitor: &mut V) {
    for data_type_report in report.data_type_reports.values_mut() {
        for file_type_report in data_type_report.file_type_reports.values_mut() {
            for file_report in file_type_report.file_reports.values_mut() {
                for error_report in file_report.error_reports.values_mut() {
                    visitor.visit_error(error_report);
                }
                visitor.visit_file(file_report);
            }
            visitor.visit_file_type(file_type_report);
        }
        visitor.visit_data_type(data_type_report);
    }
    visitor.visit_report(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileType;
    use crate::report::{ErrorRecord, ErrorType};

    #[derive(Default)]
    struct OrderRecorder {
        visits: Vec<String>,
    }

    impl ReportVisitor for OrderRecorder {
        fn visit_report(&mut self, _report: &Report) {
            self.visits.push("report".to_string());
        }

        fn visit_data_type(&mut self, report: &DataTypeReport) {
            self.visits.push(format!("data_type:{}", report.data_type()));
        }

        fn visit_file_type(&mut self, report: &FileTypeReport) {
            self.visits.push(format!("file_type:{}", report.file_type()));
        }

        fn visit_file(&mut self, report: &FileReport) {
            self.visits.push(format!("file:{}", report.file_name()));
        }

        fn visit_error(&mut self, report: &ErrorReport) {
            self.visits.push(format!("error:{:?}", report.error_type()));
        }
    }

    #[test]
    fn test_traversal_is_post_order() {
        let mut report = Report::new();
        report.add_file(FileType::Donor, "donor.txt");
        report.add_error(ErrorRecord::new(ErrorType::MissingRowsError, "donor.txt"));

        let mut recorder = OrderRecorder::default();
        accept(&report, &mut recorder);

        assert_eq!(
            recorder.visits,
            vec![
                "error:MissingRowsError",
                "file:donor.txt",
                "file_type:donor",
                "data_type:DONOR",
                "report",
            ]
        );
    }
}
