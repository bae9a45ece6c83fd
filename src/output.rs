//! Human-readable rendering of reports and classifications

use atty;

use crate::cli::VerbosityLevel;
use crate::dictionary::Classification;
use crate::report::{ErrorReport, FileReport, Report, ReportState};

pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Output that never emits ANSI escapes
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn format_state(&self, state: ReportState) -> String {
        match state {
            ReportState::Valid => self.colorize("✓ VALID", "32"),
            ReportState::Invalid => self.colorize("✗ INVALID", "31"),
            ReportState::Error => self.colorize("⚠ ERROR", "33"),
            ReportState::Queued => self.colorize("… QUEUED", "36"),
            ReportState::Validating => self.colorize("… VALIDATING", "36"),
            ReportState::NotValidated => self.colorize("- NOT_VALIDATED", "90"),
        }
    }

    pub fn format_report(&self, report: &Report) -> String {
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            output.push_str(&format!(
                "Files: {} Errors: {}\n",
                report.files().len(),
                report.error_count()
            ));
            return output;
        }

        output.push_str("Validation Report:\n");
        for data_type_report in report.data_type_reports() {
            output.push_str(&format!(
                "  {}  {}\n",
                self.format_state(data_type_report.state()),
                data_type_report.data_type()
            ));
            for file_type_report in data_type_report.file_type_reports() {
                for file_report in file_type_report.file_reports() {
                    output.push_str(&format!(
                        "    {}  {} ({})\n",
                        self.format_state(file_report.state()),
                        file_report.file_name(),
                        file_report.file_type()
                    ));
                    if self.verbosity >= VerbosityLevel::Verbose {
                        for error_report in file_report.error_reports() {
                            output.push_str(&self.format_error_report(error_report, "      "));
                        }
                    }
                }
            }
        }

        let error_count = report.error_count();
        output.push_str(&format!(
            "  Total files: {}\n  {} {}\n",
            report.files().len(),
            if error_count == 0 {
                self.colorize("Errors:", "32")
            } else {
                self.colorize("Errors:", "31")
            },
            error_count
        ));
        output
    }

    pub fn format_file_report(&self, file_report: &FileReport) -> String {
        let mut output = format!(
            "{}  {} ({})\n",
            self.format_state(file_report.state()),
            file_report.file_name(),
            file_report.file_type()
        );
        if self.verbosity == VerbosityLevel::Quiet {
            return output;
        }

        for summary in file_report.summary_reports() {
            output.push_str(&format!("  {}: {}\n", summary.name, summary.value));
        }
        if self.verbosity >= VerbosityLevel::Verbose {
            for field in file_report.field_reports() {
                output.push_str(&format!(
                    "  {} populated={} missing={} nulls={}\n",
                    field.name, field.populated, field.missing, field.nulls
                ));
            }
        }
        for error_report in file_report.error_reports() {
            output.push_str(&self.format_error_report(error_report, "  "));
        }
        output
    }

    fn format_error_report(&self, error_report: &ErrorReport, indent: &str) -> String {
        let mut output = format!(
            "{}{} [{}] {} ({} occurrence{})\n",
            indent,
            self.colorize(&format!("{:?}", error_report.error_type()), "31"),
            error_report.number(),
            error_report.description(),
            error_report.count(),
            if error_report.count() == 1 { "" } else { "s" }
        );

        for field in error_report.field_error_reports() {
            let fields = if field.field_names().is_empty() {
                "-".to_string()
            } else {
                field.field_names().join(", ")
            };
            output.push_str(&format!("{}  {}: {}", indent, fields, field.count()));
            if self.verbosity >= VerbosityLevel::Verbose && !field.line_numbers().is_empty() {
                let lines: Vec<String> = field
                    .line_numbers()
                    .iter()
                    .map(|line| line.to_string())
                    .collect();
                output.push_str(&format!(" at lines {}", lines.join(", ")));
            }
            output.push('\n');
        }
        output
    }

    pub fn format_classification(&self, classification: &Classification) -> String {
        let mut output = String::new();

        for (file_name, file_type) in &classification.files {
            output.push_str(&format!(
                "{}  {} -> {}\n",
                self.colorize("✓", "32"),
                file_name,
                file_type
            ));
        }
        for (schema, files) in &classification.conflicts {
            output.push_str(&format!(
                "{}  {} matched by {}\n",
                self.colorize("✗ TOO_MANY_FILES", "31"),
                schema,
                files.join(", ")
            ));
        }
        for schema in &classification.missing {
            output.push_str(&format!(
                "{}  {}\n",
                self.colorize("✗ MISSING", "31"),
                schema
            ));
        }
        if self.verbosity >= VerbosityLevel::Verbose {
            for file_name in &classification.unmatched {
                output.push_str(&format!("{}  {}\n", self.colorize("- UNMATCHED", "90"), file_name));
            }
        }

        output.push_str(&format!(
            "Matched: {} Conflicts: {} Missing: {} Unmatched: {}\n",
            classification.files.len(),
            classification.conflicts.len(),
            classification.missing.len(),
            classification.unmatched.len()
        ));
        output
    }
}
