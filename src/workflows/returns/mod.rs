pub mod filename;
pub mod mailer;
pub mod matcher;
pub mod roster;

use crate::config::{ConventionConfig, MailSettings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use filename::{InvalidSheetNumber, NamingConvention, SheetNumber, SubmissionFile};
use mailer::{MailGateway, MailSendError, SheetMail};
use matcher::{ChoicePicker, TokenResolution};
use roster::{RosterError, RosterIndex, RosterRecord};

/// Fatal setup failures. Everything that goes wrong per token during a run
/// lands in the [`DispatchReport`] instead.
#[derive(Debug)]
pub enum ReturnsError {
    Roster(RosterError),
    SheetNumber(InvalidSheetNumber),
    SheetFolder {
        path: PathBuf,
        source: std::io::Error,
    },
    Smtp(MailSendError),
}

impl std::fmt::Display for ReturnsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnsError::Roster(err) => write!(f, "failed to load roster: {}", err),
            ReturnsError::SheetNumber(err) => write!(f, "{}", err),
            ReturnsError::SheetFolder { path, source } => {
                write!(
                    f,
                    "cannot list sheet folder '{}': {}",
                    path.display(),
                    source
                )
            }
            ReturnsError::Smtp(err) => write!(f, "could not set up mail transport: {}", err),
        }
    }
}

impl std::error::Error for ReturnsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReturnsError::Roster(err) => Some(err),
            ReturnsError::SheetNumber(err) => Some(err),
            ReturnsError::SheetFolder { source, .. } => Some(source),
            ReturnsError::Smtp(err) => Some(err),
        }
    }
}

impl From<RosterError> for ReturnsError {
    fn from(err: RosterError) -> Self {
        Self::Roster(err)
    }
}

impl From<InvalidSheetNumber> for ReturnsError {
    fn from(err: InvalidSheetNumber) -> Self {
        Self::SheetNumber(err)
    }
}

impl From<MailSendError> for ReturnsError {
    fn from(err: MailSendError) -> Self {
        Self::Smtp(err)
    }
}

/// Lists the sheet folder and applies the naming convention.
///
/// A missing or unreadable folder is fatal; a folder with zero matching
/// files is a valid outcome the caller reports.
pub fn scan_sheet_directory(
    sheet: &SheetNumber,
    dir: &Path,
    settings: &ConventionConfig,
) -> Result<Vec<SubmissionFile>, ReturnsError> {
    let listing = filename::list_directory(dir).map_err(|source| ReturnsError::SheetFolder {
        path: dir.to_path_buf(),
        source,
    })?;
    let convention = NamingConvention::for_sheet(sheet, settings);
    Ok(filename::submissions_from_listing(
        listing.iter().map(String::as_str),
        &convention,
    ))
}

/// One successfully matched token, delivered or merely planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryNote {
    pub filename: String,
    pub token: String,
    pub student: String,
    pub username: String,
    /// Present when a mail transport was attached to the run.
    pub address: Option<String>,
}

/// A token whose surname has no roster record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownToken {
    pub filename: String,
    pub token: String,
}

/// A token that was matched (or prompted) but could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub filename: String,
    pub token: String,
    pub reason: String,
}

/// Aggregated result of one batch run. Returned to the caller; the dispatcher
/// keeps no other state.
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub sheet: String,
    pub files: usize,
    pub resolved: Vec<DeliveryNote>,
    pub unknown: Vec<UnknownToken>,
    pub failures: Vec<DeliveryFailure>,
    pub dispatched: bool,
}

impl DispatchReport {
    /// Each unresolved token once, in first-seen order.
    pub fn distinct_unknown_tokens(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for unknown in &self.unknown {
            if !seen.contains(&unknown.token.as_str()) {
                seen.push(unknown.token.as_str());
            }
        }
        seen
    }

    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.failures.is_empty()
    }
}

/// Drives one batch: files in parser order, tokens in filename order, one
/// matcher pass per token, delegation to the mail gateway on a match.
pub struct ReturnDispatcher<'a> {
    roster: &'a RosterIndex,
    picker: &'a mut dyn ChoicePicker,
    mailer: Option<(&'a dyn MailGateway, &'a MailSettings)>,
}

impl<'a> ReturnDispatcher<'a> {
    pub fn new(roster: &'a RosterIndex, picker: &'a mut dyn ChoicePicker) -> Self {
        Self {
            roster,
            picker,
            mailer: None,
        }
    }

    /// Attach a transport; without one the run is a dry plan.
    pub fn with_mailer(
        mut self,
        gateway: &'a dyn MailGateway,
        settings: &'a MailSettings,
    ) -> Self {
        self.mailer = Some((gateway, settings));
        self
    }

    pub fn run(
        &mut self,
        sheet: &SheetNumber,
        sheet_dir: &Path,
        submissions: &[SubmissionFile],
    ) -> DispatchReport {
        let mut report = DispatchReport {
            sheet: sheet.to_string(),
            files: submissions.len(),
            resolved: Vec::new(),
            unknown: Vec::new(),
            failures: Vec::new(),
            dispatched: self.mailer.is_some(),
        };

        for (position, submission) in submissions.iter().enumerate() {
            info!(
                file = %submission.filename,
                number = position + 1,
                of = submissions.len(),
                contributors = submission.tokens.len(),
                "processing corrected sheet"
            );

            for token in &submission.tokens {
                match matcher::resolve_token(self.roster, token, self.picker) {
                    Ok(TokenResolution::Matched(record)) => {
                        self.deliver(sheet, sheet_dir, submission, token, record, &mut report);
                    }
                    Ok(TokenResolution::Unknown) => {
                        warn!(
                            file = %submission.filename,
                            %token,
                            "surname not found in roster; check filename spelling or roster encoding"
                        );
                        report.unknown.push(UnknownToken {
                            filename: submission.filename.clone(),
                            token: token.clone(),
                        });
                    }
                    Err(err) => {
                        warn!(file = %submission.filename, %token, %err, "token aborted");
                        report.failures.push(DeliveryFailure {
                            filename: submission.filename.clone(),
                            token: token.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        report
    }

    fn deliver(
        &self,
        sheet: &SheetNumber,
        sheet_dir: &Path,
        submission: &SubmissionFile,
        token: &str,
        record: &RosterRecord,
        report: &mut DispatchReport,
    ) {
        let student = format!("{}, {}", record.surname, record.firstname);

        let Some((gateway, settings)) = self.mailer else {
            report.resolved.push(DeliveryNote {
                filename: submission.filename.clone(),
                token: token.to_string(),
                student,
                username: record.username.clone(),
                address: None,
            });
            return;
        };

        let mail = compose_mail(sheet, sheet_dir, submission, record, settings);
        match gateway.send(&mail) {
            Ok(()) => {
                info!(to = %mail.to_address, student = %student, "sheet delivered");
                report.resolved.push(DeliveryNote {
                    filename: submission.filename.clone(),
                    token: token.to_string(),
                    student,
                    username: record.username.clone(),
                    address: Some(mail.to_address),
                });
            }
            Err(err) => {
                error!(to = %mail.to_address, %err, "delivery failed; continuing with remaining files");
                report.failures.push(DeliveryFailure {
                    filename: submission.filename.clone(),
                    token: token.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

fn compose_mail(
    sheet: &SheetNumber,
    sheet_dir: &Path,
    submission: &SubmissionFile,
    record: &RosterRecord,
    settings: &MailSettings,
) -> SheetMail {
    SheetMail {
        to_address: format!("{}@{}", record.username, settings.domain),
        display_name: format!("{} {}", record.firstname, record.surname),
        subject: format!("Sheet {} Correction", sheet),
        body: settings.body_template.replace("{firstname}", &record.firstname),
        attachment: sheet_dir.join(&submission.filename),
    }
}
