use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::documents::{DocumentError, DocumentSource};
use super::domain::{
    ApplicationId, ApplicationStatus, MatchResult, NewApplication, ProcessingType,
};
use super::evaluation::{ScoreBand, TriageDecision, TriageThresholds};
use super::notices::{self, NoticeSettings};
use super::repository::{
    ApplicationRecord, ApplicationRepository, MatchResultRepository, RepositoryError, StatusChange,
};
use super::transmission::{
    NewTransmission, RecipientCategory, TransmissionLog, TransmissionLogEntry,
    TransmissionLogError, TransmissionMethod,
};
use super::watermark::{default_caption, watermark_pdf, WatermarkOptions};
use crate::config::{AppConfig, ConfigError};
use crate::workflows::notifications::{
    dispatch_secondary, NotificationAttachment, NotificationDispatcher,
};
use crate::workflows::scoring::{MatchAssessment, ScoreProvider, ScoreReport, ScoringError};

pub const AUTO_REJECTION_REASON: &str = "insufficient match score";
pub const MANUAL_REJECTION_REASON: &str = "rejected after manual review";

/// Collaborators the engine drives; every side effect goes through one of these.
#[derive(Clone)]
pub struct TriagePorts {
    pub applications: Arc<dyn ApplicationRepository>,
    pub match_results: Arc<dyn MatchResultRepository>,
    pub transmissions: Arc<dyn TransmissionLog>,
    pub documents: Arc<dyn DocumentSource>,
    pub notifications: Arc<dyn NotificationDispatcher>,
    pub scorer: Arc<dyn ScoreProvider>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub thresholds: TriageThresholds,
    pub notices: NoticeSettings,
    pub sender_name: String,
    pub watermark: WatermarkOptions,
    pub score_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            thresholds: config.triage.thresholds()?,
            notices: NoticeSettings {
                admin_email: config.notifications.admin_email.clone(),
                frontend_base_url: config.notifications.frontend_base_url.clone(),
            },
            sender_name: config.notifications.sender_name.clone(),
            watermark: WatermarkOptions::default(),
            score_timeout: config.scoring.deadline(),
        })
    }
}

/// Step of a triage operation, attached to fatal errors for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStage {
    Load,
    Score,
    Fetch,
    Watermark,
    Log,
    Commit,
}

impl fmt::Display for TriageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriageStage::Load => "load",
            TriageStage::Score => "score",
            TriageStage::Fetch => "document fetch",
            TriageStage::Watermark => "watermark",
            TriageStage::Log => "transmission log",
            TriageStage::Commit => "status commit",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application {application_id}: cannot {action} while {from}")]
    InvalidTransition {
        application_id: ApplicationId,
        from: ApplicationStatus,
        action: &'static str,
    },
    #[error("application {0} has no usable match score")]
    ScoreUnavailable(ApplicationId),
    #[error("application {0}: client contact email is missing")]
    RecipientUnavailable(ApplicationId),
    #[error("application {application_id} failed during {stage}: {source}")]
    Document {
        application_id: ApplicationId,
        stage: TriageStage,
        #[source]
        source: DocumentError,
    },
    #[error("application {application_id} could not be scored: {source}")]
    Scoring {
        application_id: ApplicationId,
        #[source]
        source: ScoringError,
    },
    #[error("application {application_id} failed during {stage}: {source}")]
    Repository {
        application_id: ApplicationId,
        stage: TriageStage,
        #[source]
        source: RepositoryError,
    },
    #[error("application {application_id}: {source}")]
    TransmissionLog {
        application_id: ApplicationId,
        #[source]
        source: TransmissionLogError,
    },
}

impl TriageError {
    pub fn application_id(&self) -> &ApplicationId {
        match self {
            TriageError::NotFound(id)
            | TriageError::ScoreUnavailable(id)
            | TriageError::RecipientUnavailable(id) => id,
            TriageError::InvalidTransition { application_id, .. }
            | TriageError::Document { application_id, .. }
            | TriageError::Scoring { application_id, .. }
            | TriageError::Repository { application_id, .. }
            | TriageError::TransmissionLog { application_id, .. } => application_id,
        }
    }

    pub fn stage(&self) -> TriageStage {
        match self {
            TriageError::NotFound(_) | TriageError::InvalidTransition { .. } => TriageStage::Load,
            TriageError::ScoreUnavailable(_) | TriageError::Scoring { .. } => TriageStage::Score,
            TriageError::RecipientUnavailable(_) => TriageStage::Fetch,
            TriageError::Document { stage, .. } | TriageError::Repository { stage, .. } => *stage,
            TriageError::TransmissionLog { .. } => TriageStage::Log,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageOutcome {
    pub application_id: ApplicationId,
    pub decision: TriageDecision,
    pub score: f32,
    pub status: ApplicationStatus,
    pub processing_type: ProcessingType,
    pub warnings: Vec<String>,
    pub already_handled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub application_id: ApplicationId,
    pub approved: bool,
    pub status: ApplicationStatus,
    pub warnings: Vec<String>,
    pub already_handled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractOutcome {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub contract_url: String,
    pub already_handled: bool,
}

struct Committed {
    record: ApplicationRecord,
    already_handled: bool,
}

/// Threshold-driven decision engine for candidate applications.
///
/// Holds no mutable state of its own: concurrent callers are serialized by the
/// repository's conditional status write, and the transmission log records each
/// CV delivery to a client address with one check-and-append before any send.
pub struct ApplicationTriageEngine {
    ports: TriagePorts,
    settings: EngineSettings,
}

impl ApplicationTriageEngine {
    pub fn new(ports: TriagePorts, settings: EngineSettings) -> Self {
        Self { ports, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Register an application submitted on the platform; it starts `IN_REVIEW`.
    pub fn register(&self, submission: NewApplication) -> Result<ApplicationRecord, TriageError> {
        let id = submission.application_id.clone();
        let record = ApplicationRecord::from_submission(submission, Utc::now());
        self.ports
            .applications
            .insert(record)
            .map_err(|source| repository_error(&id, TriageStage::Commit, source))
    }

    pub fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, TriageError> {
        self.ports
            .applications
            .fetch(id)
            .map_err(|source| repository_error(id, TriageStage::Load, source))?
            .ok_or_else(|| TriageError::NotFound(id.clone()))
    }

    pub fn list_by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.ports.applications.by_status(status, limit)
    }

    pub fn match_history(&self, id: &ApplicationId) -> Result<Vec<MatchResult>, TriageError> {
        self.get(id)?;
        self.ports
            .match_results
            .history(id)
            .map_err(|source| repository_error(id, TriageStage::Load, source))
    }

    pub fn transmissions(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<TransmissionLogEntry>, TriageError> {
        self.ports
            .transmissions
            .list_for_application(id)
            .map_err(|source| TriageError::TransmissionLog {
                application_id: id.clone(),
                source,
            })
    }

    /// Run the external scorer for an application and make the result current.
    pub async fn score_application(
        &self,
        id: &ApplicationId,
        refresh: bool,
    ) -> Result<MatchResult, TriageError> {
        let record = self.get(id)?;
        require(&record, ApplicationStatus::InReview, "score")?;

        if !refresh {
            if let Some(existing) = self.current_match_result(&record)? {
                debug!(application_id = %id, "reusing current match result");
                return Ok(existing);
            }
        }

        let request = record.job.score_request(&record.candidate);
        let timeout = self.settings.score_timeout;
        let report = match tokio::time::timeout(timeout, self.ports.scorer.score(&request)).await {
            Ok(report) => report,
            Err(_) => Err(ScoringError::Timeout(timeout)),
        };
        let assessment = report.and_then(ScoreReport::validate).map_err(|source| {
            warn!(application_id = %id, error = %source, "scoring failed");
            TriageError::Scoring {
                application_id: id.clone(),
                source,
            }
        })?;

        let result = self
            .ports
            .match_results
            .insert(MatchResult::new(id.clone(), assessment))
            .map_err(|source| repository_error(id, TriageStage::Score, source))?;

        let attached = self
            .ports
            .applications
            .attach_match_result(id, ApplicationStatus::InReview, result.id)
            .map_err(|source| repository_error(id, TriageStage::Score, source))?;

        match attached {
            Some(_) => {
                info!(
                    application_id = %id,
                    score = result.assessment.percentage,
                    "match result recorded"
                );
                Ok(result)
            }
            None => {
                let current = self.get(id)?;
                Err(TriageError::InvalidTransition {
                    application_id: id.clone(),
                    from: current.status,
                    action: "score",
                })
            }
        }
    }

    pub async fn score_and_triage(&self, id: &ApplicationId) -> Result<TriageOutcome, TriageError> {
        self.score_application(id, false).await?;
        self.triage(id).await
    }

    /// Route an `IN_REVIEW` application by its current match score.
    pub async fn triage(&self, id: &ApplicationId) -> Result<TriageOutcome, TriageError> {
        let record = self.get(id)?;
        require(&record, ApplicationStatus::InReview, "triage")?;

        let result = self
            .current_match_result(&record)?
            .ok_or_else(|| TriageError::ScoreUnavailable(id.clone()))?;
        let score = result
            .usable_percentage()
            .ok_or_else(|| TriageError::ScoreUnavailable(id.clone()))?;
        let band = self.settings.thresholds.classify(score);

        info!(application_id = %id, score, band = band.label(), "triaging application");

        let mut warnings = Vec::new();
        let change = match band {
            ScoreBand::High => {
                self.deliver_to_client(&record, &result.assessment, &mut warnings)
                    .await?;
                StatusChange {
                    from: ApplicationStatus::InReview,
                    to: ApplicationStatus::AutoSentToClient,
                    processing_type: ProcessingType::Auto,
                    match_score: Some(score),
                    rejection_reason: None,
                }
            }
            ScoreBand::Middle => StatusChange {
                from: ApplicationStatus::InReview,
                to: ApplicationStatus::PendingReview,
                processing_type: ProcessingType::Auto,
                match_score: Some(score),
                rejection_reason: None,
            },
            ScoreBand::Low => StatusChange {
                from: ApplicationStatus::InReview,
                to: ApplicationStatus::Denied,
                processing_type: ProcessingType::Auto,
                match_score: Some(score),
                rejection_reason: Some(AUTO_REJECTION_REASON.to_string()),
            },
        };

        let committed = self.commit(&record, change)?;
        if !committed.already_handled {
            let settings = &self.settings.notices;
            let notice = match band {
                ScoreBand::High => {
                    notices::admin_high_match(&committed.record, &result.assessment, settings)
                }
                ScoreBand::Middle => {
                    notices::admin_pending_review(&committed.record, &result.assessment, settings)
                }
                ScoreBand::Low => notices::candidate_encouragement(&committed.record, settings),
            };
            dispatch_secondary(self.ports.notifications.as_ref(), &notice).await;
        }

        Ok(TriageOutcome {
            application_id: id.clone(),
            decision: TriageDecision::from(band),
            score,
            status: committed.record.status,
            processing_type: committed
                .record
                .processing_type
                .unwrap_or(ProcessingType::Auto),
            warnings,
            already_handled: committed.already_handled,
        })
    }

    /// Human decision on an application held in `PENDING_REVIEW`.
    pub async fn validate_pending_application(
        &self,
        id: &ApplicationId,
        approved: bool,
        note: Option<String>,
    ) -> Result<ReviewOutcome, TriageError> {
        let record = self.get(id)?;
        let action = if approved { "approve" } else { "reject" };
        require(&record, ApplicationStatus::PendingReview, action)?;

        let mut warnings = Vec::new();
        let settings = &self.settings.notices;

        let committed = if approved {
            let assessment = match self.current_match_result(&record)? {
                Some(result) => result.assessment,
                None => MatchAssessment::bare(record.match_score.unwrap_or_default()),
            };
            self.deliver_to_client(&record, &assessment, &mut warnings)
                .await?;
            let committed = self.commit(
                &record,
                StatusChange {
                    from: ApplicationStatus::PendingReview,
                    to: ApplicationStatus::Validated,
                    processing_type: ProcessingType::Manual,
                    match_score: None,
                    rejection_reason: None,
                },
            )?;
            if !committed.already_handled {
                let copy = notices::admin_validation_copy(&committed.record, settings);
                dispatch_secondary(self.ports.notifications.as_ref(), &copy).await;
            }
            committed
        } else {
            let reason = note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty())
                .unwrap_or_else(|| MANUAL_REJECTION_REASON.to_string());
            let committed = self.commit(
                &record,
                StatusChange {
                    from: ApplicationStatus::PendingReview,
                    to: ApplicationStatus::Denied,
                    processing_type: ProcessingType::Manual,
                    match_score: None,
                    rejection_reason: Some(reason),
                },
            )?;
            if !committed.already_handled {
                let notice = notices::candidate_encouragement(&committed.record, settings);
                dispatch_secondary(self.ports.notifications.as_ref(), &notice).await;
            }
            committed
        };

        info!(
            application_id = %id,
            approved,
            status = %committed.record.status,
            "manual review recorded"
        );

        Ok(ReviewOutcome {
            application_id: id.clone(),
            approved,
            status: committed.record.status,
            warnings,
            already_handled: committed.already_handled,
        })
    }

    /// Move a validated application to `AWAITING_CONTRACT` and send the contract link.
    pub async fn issue_contract(
        &self,
        id: &ApplicationId,
        contract_url: &str,
    ) -> Result<ContractOutcome, TriageError> {
        let record = self.get(id)?;
        require(&record, ApplicationStatus::Validated, "issue a contract")?;

        let committed = self.commit(
            &record,
            StatusChange {
                from: ApplicationStatus::Validated,
                to: ApplicationStatus::AwaitingContract,
                processing_type: ProcessingType::Manual,
                match_score: None,
                rejection_reason: None,
            },
        )?;
        if !committed.already_handled {
            let notice = notices::candidate_contract(&committed.record, contract_url);
            dispatch_secondary(self.ports.notifications.as_ref(), &notice).await;
        }

        Ok(ContractOutcome {
            application_id: id.clone(),
            status: committed.record.status,
            contract_url: contract_url.to_string(),
            already_handled: committed.already_handled,
        })
    }

    fn current_match_result(
        &self,
        record: &ApplicationRecord,
    ) -> Result<Option<MatchResult>, TriageError> {
        match record.match_result {
            Some(result_id) => self
                .ports
                .match_results
                .fetch(&result_id)
                .map_err(|source| repository_error(&record.application_id, TriageStage::Load, source)),
            None => Ok(None),
        }
    }

    /// Watermark the CV and hand it to the client, logging before it leaves.
    ///
    /// Skips the physical delivery when the log shows the CV already reached the
    /// same address. A failed client dispatch becomes a warning.
    async fn deliver_to_client(
        &self,
        record: &ApplicationRecord,
        assessment: &MatchAssessment,
        warnings: &mut Vec<String>,
    ) -> Result<(), TriageError> {
        let id = &record.application_id;
        let recipient = record
            .job
            .company
            .contact_email()
            .ok_or_else(|| TriageError::RecipientUnavailable(id.clone()))?
            .to_string();

        let already_sent = self
            .ports
            .transmissions
            .has_been_sent_to(&record.cv.document_id, &recipient)
            .map_err(|source| TriageError::TransmissionLog {
                application_id: id.clone(),
                source,
            })?;
        if already_sent {
            info!(
                application_id = %id,
                document_id = %record.cv.document_id,
                "CV already transmitted to client, skipping delivery"
            );
            return Ok(());
        }

        let original = self
            .ports
            .documents
            .fetch(&record.cv)
            .await
            .map_err(|source| document_error(id, TriageStage::Fetch, source))?;

        let now = Utc::now();
        let caption = default_caption(&self.settings.sender_name, now.date_naive());
        let options = self.settings.watermark;
        let task_caption = caption.clone();
        let stamped = tokio::task::spawn_blocking(move || {
            watermark_pdf(&original, &task_caption, &options)
        })
        .await
        .unwrap_or_else(|err| {
            Err(DocumentError::UnreadableDocument(format!(
                "watermark task failed: {err}"
            )))
        })
        .map_err(|source| document_error(id, TriageStage::Watermark, source))?;

        let logged = self
            .ports
            .transmissions
            .log_if_absent(NewTransmission {
                application_id: id.clone(),
                document_id: record.cv.document_id.clone(),
                recipient_email: recipient.clone(),
                recipient_category: RecipientCategory::Client,
                method: TransmissionMethod::Email,
                watermarked: true,
                caption: Some(caption),
                metadata: json!({
                    "match_score": assessment.percentage,
                    "job_title": record.job.title,
                    "sent_date": now.format("%d/%m/%Y").to_string(),
                }),
            })
            .map_err(|source| TriageError::TransmissionLog {
                application_id: id.clone(),
                source,
            })?;
        let Some(entry) = logged else {
            info!(
                application_id = %id,
                document_id = %record.cv.document_id,
                "concurrent triage already transmitted the CV, skipping delivery"
            );
            return Ok(());
        };

        let notification = notices::client_candidate(
            record,
            &recipient,
            assessment,
            NotificationAttachment {
                file_name: record.cv.file_name.clone(),
                content_type: "application/pdf".to_string(),
                content: stamped,
            },
        );

        match self.ports.notifications.dispatch(&notification).await {
            Ok(()) => info!(
                application_id = %id,
                log_entry = %entry.id,
                "CV transmitted to client"
            ),
            Err(err) => {
                warn!(
                    application_id = %id,
                    log_entry = %entry.id,
                    error = %err,
                    "client notification not delivered"
                );
                warnings.push(format!("client notification not delivered: {err}"));
            }
        }

        Ok(())
    }

    fn commit(
        &self,
        record: &ApplicationRecord,
        change: StatusChange,
    ) -> Result<Committed, TriageError> {
        let id = &record.application_id;
        let updated = self
            .ports
            .applications
            .transition(id, &change)
            .map_err(|source| repository_error(id, TriageStage::Commit, source))?;

        match updated {
            Some(record) => Ok(Committed {
                record,
                already_handled: false,
            }),
            None => {
                let current = self.get(id)?;
                warn!(
                    application_id = %id,
                    expected = %change.from,
                    found = %current.status,
                    "status changed concurrently, transition skipped"
                );
                Ok(Committed {
                    record: current,
                    already_handled: true,
                })
            }
        }
    }
}

fn require(
    record: &ApplicationRecord,
    expected: ApplicationStatus,
    action: &'static str,
) -> Result<(), TriageError> {
    if record.status == expected {
        Ok(())
    } else {
        Err(TriageError::InvalidTransition {
            application_id: record.application_id.clone(),
            from: record.status,
            action,
        })
    }
}

fn repository_error(id: &ApplicationId, stage: TriageStage, source: RepositoryError) -> TriageError {
    match source {
        RepositoryError::NotFound => TriageError::NotFound(id.clone()),
        source => TriageError::Repository {
            application_id: id.clone(),
            stage,
            source,
        },
    }
}

fn document_error(id: &ApplicationId, stage: TriageStage, source: DocumentError) -> TriageError {
    TriageError::Document {
        application_id: id.clone(),
        stage,
        source,
    }
}
