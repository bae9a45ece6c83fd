use std::collections::BTreeMap;

use serde_json::json;

use submission_validator::model::{DataType, FileType};
use submission_validator::release::Release;
use submission_validator::report::{ErrorRecord, ErrorType, Report, ReportState};
use submission_validator::state::SubmissionState;

fn submission_files() -> BTreeMap<String, FileType> {
    BTreeMap::from([
        ("donor.txt".to_string(), FileType::Donor),
        ("specimen.txt".to_string(), FileType::Specimen),
        ("ssm_m.txt".to_string(), FileType::SsmM),
        ("ssm_p.txt".to_string(), FileType::SsmP),
    ])
}

fn validated_report() -> Report {
    let mut report = Report::from_files(&submission_files());
    report.inherit_state(SubmissionState::Validating, &DataType::ALL);
    report.add_summary("donor.txt", "rows", "12");
    report.add_error(
        ErrorRecord::new(ErrorType::CodelistError, "ssm_p.txt")
            .with_fields(["mutation_type"])
            .at_line(7)
            .with_value("indel"),
    );
    report.add_error(
        ErrorRecord::new(ErrorType::CodelistError, "ssm_p.txt")
            .with_fields(["mutation_type"])
            .at_line(9)
            .with_value("snp"),
    );
    report.refresh_state();
    report
}

#[test]
fn test_validity_follows_error_count() {
    let clean = {
        let mut report = Report::from_files(&submission_files());
        report.inherit_state(SubmissionState::Validating, &DataType::ALL);
        report.refresh_state();
        report
    };
    assert_eq!(clean.error_count(), 0);
    assert!(clean.is_valid());

    let report = validated_report();
    assert_eq!(report.error_count(), 2);
    assert!(!report.is_valid());
    assert_eq!(report.is_valid(), report.error_count() == 0);
}

#[test]
fn test_states_roll_up_per_data_type() {
    let report = validated_report();

    assert_eq!(
        report.data_type_report(DataType::Ssm).unwrap().state(),
        ReportState::Invalid
    );
    let ssm = report.data_type_report(DataType::Ssm).unwrap();
    assert_eq!(
        ssm.file_type_report(FileType::SsmM).unwrap().state(),
        ReportState::Valid
    );
    assert_eq!(
        ssm.file_type_report(FileType::SsmP).unwrap().state(),
        ReportState::Invalid
    );
    assert_eq!(
        report.data_type_report(DataType::Donor).unwrap().state(),
        ReportState::Valid
    );
}

#[test]
fn test_report_survives_release_persistence() {
    let mut release = Release::new("release1", "0.6c");
    release.add_submission("PRJ1", "Project 1");
    release.submission_mut("PRJ1").unwrap().report = validated_report();

    let stored = serde_json::to_string(&release).unwrap();
    let restored: Release = serde_json::from_str(&stored).unwrap();
    assert_eq!(restored, release);

    let file_report = restored
        .submission("PRJ1")
        .unwrap()
        .report
        .file_report("ssm_p.txt")
        .unwrap();
    let codelist = file_report
        .error_report(ErrorType::CodelistError, 0)
        .unwrap();
    assert_eq!(codelist.count(), 2);
    let field = codelist.field_error_reports().next().unwrap();
    assert_eq!(field.line_numbers(), &[7, 9]);
    assert_eq!(field.values(), &[json!("indel"), json!("snp")]);
}

#[test]
fn test_merge_replaces_only_selected_data_types() {
    let mut original = Report::from_files(&BTreeMap::from([(
        "specimen.txt".to_string(),
        FileType::Specimen,
    )]));
    original.add_summary("specimen.txt", "rows", "3");

    let mut fresh = Report::from_files(&BTreeMap::from([
        ("donor.txt".to_string(), FileType::Donor),
        ("specimen.txt".to_string(), FileType::Specimen),
    ]));
    fresh.add_summary("specimen.txt", "rows", "99");
    fresh.add_summary("donor.txt", "rows", "5");

    fresh.merge_report(&original, &[DataType::Donor]);

    let specimen = fresh.file_report("specimen.txt").unwrap();
    assert_eq!(specimen.summary_reports()[0].value, "3");
    let donor = fresh.file_report("donor.txt").unwrap();
    assert_eq!(donor.summary_reports()[0].value, "5");
}
