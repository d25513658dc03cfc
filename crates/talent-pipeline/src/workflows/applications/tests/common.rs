use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::Value;

use crate::workflows::applications::domain::{
    ApplicationId, ApplicationStatus, CandidateSnapshot, CompanySnapshot, DocumentRef,
    JobSnapshot, MatchResult, MatchResultId, NewApplication,
};
use crate::workflows::applications::memory::{
    InMemoryApplications, InMemoryDocuments, InMemoryMatchResults, InMemoryTransmissionLog,
};
use crate::workflows::applications::repository::{
    ApplicationRecord, ApplicationRepository, MatchResultRepository, RepositoryError, StatusChange,
};
use crate::workflows::applications::{
    ApplicationTriageEngine, EngineSettings, NoticeSettings, TriagePorts, TriageThresholds,
    WatermarkOptions,
};
use crate::workflows::notifications::RecordingDispatcher;
use crate::workflows::scoring::{MatchAssessment, ScoreProvider, StaticScoreProvider};

pub(super) const ADMIN_EMAIL: &str = "admin@talent.test";
pub(super) const CLIENT_EMAIL: &str = "hiring@acme.test";
pub(super) const CANDIDATE_EMAIL: &str = "ada@candidates.test";

/// Multi-page PDF with inherited resources and media box, built the lopdf way.
pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for number in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Curriculum page {number}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    document
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).expect("pdf saves");
    bytes
}

pub(super) fn cv_location(id: &str) -> String {
    format!("cvs/{id}.pdf")
}

pub(super) fn submission(id: &str) -> NewApplication {
    NewApplication {
        application_id: ApplicationId(id.to_string()),
        job: JobSnapshot {
            job_id: "job-42".to_string(),
            title: "Backend Engineer".to_string(),
            description: "Own the billing services".to_string(),
            requirements: Some("5 years of Rust".to_string()),
            skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            experience_years: Some(5),
            company: CompanySnapshot {
                company_id: "acme".to_string(),
                name: "Acme Corp".to_string(),
                email: Some(CLIENT_EMAIL.to_string()),
            },
        },
        candidate: CandidateSnapshot {
            candidate_id: "cand-7".to_string(),
            full_name: "Ada Martin".to_string(),
            email: CANDIDATE_EMAIL.to_string(),
            profile_text: "Rust engineer, eight years on payment systems".to_string(),
        },
        cv: DocumentRef {
            document_id: format!("doc-{id}"),
            file_name: "CV_Ada_Martin.pdf".to_string(),
            storage_location: cv_location(id),
        },
    }
}

pub(super) fn settings() -> EngineSettings {
    EngineSettings {
        thresholds: TriageThresholds::new(80, 60).expect("valid thresholds"),
        notices: NoticeSettings {
            admin_email: ADMIN_EMAIL.to_string(),
            frontend_base_url: "https://app.talent.test".to_string(),
        },
        sender_name: "Talent Pipeline".to_string(),
        watermark: WatermarkOptions::default(),
        score_timeout: Duration::from_secs(2),
    }
}

pub(super) struct Harness {
    pub(super) engine: Arc<ApplicationTriageEngine>,
    pub(super) applications: Arc<InMemoryApplications>,
    pub(super) match_results: Arc<InMemoryMatchResults>,
    pub(super) transmissions: Arc<InMemoryTransmissionLog>,
    pub(super) documents: Arc<InMemoryDocuments>,
    pub(super) notifications: Arc<RecordingDispatcher>,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(StaticScoreProvider::new(75.0)), settings())
}

pub(super) fn harness_with(scorer: Arc<dyn ScoreProvider>, settings: EngineSettings) -> Harness {
    let applications = Arc::new(InMemoryApplications::default());
    build(applications.clone(), applications, scorer, settings)
}

/// Engine writes through `repository`; tests inspect state through `applications`.
pub(super) fn build(
    repository: Arc<dyn ApplicationRepository>,
    applications: Arc<InMemoryApplications>,
    scorer: Arc<dyn ScoreProvider>,
    settings: EngineSettings,
) -> Harness {
    let match_results = Arc::new(InMemoryMatchResults::default());
    let transmissions = Arc::new(InMemoryTransmissionLog::default());
    let documents = Arc::new(InMemoryDocuments::default());
    let notifications = Arc::new(RecordingDispatcher::default());

    let engine = ApplicationTriageEngine::new(
        TriagePorts {
            applications: repository,
            match_results: match_results.clone(),
            transmissions: transmissions.clone(),
            documents: documents.clone(),
            notifications: notifications.clone(),
            scorer,
        },
        settings,
    );

    Harness {
        engine: Arc::new(engine),
        applications,
        match_results,
        transmissions,
        documents,
        notifications,
    }
}

impl Harness {
    /// Register an application and store a readable CV for it.
    pub(super) fn seed(&self, id: &str) -> ApplicationId {
        self.seed_submission(submission(id))
    }

    pub(super) fn seed_submission(&self, submission: NewApplication) -> ApplicationId {
        let id = submission.application_id.clone();
        self.documents
            .store(submission.cv.storage_location.clone(), sample_pdf(2))
            .expect("document stored");
        self.engine.register(submission).expect("application registers");
        id
    }

    /// Register an application that already carries a current match result.
    pub(super) fn seed_scored(&self, id: &str, score: f32) -> ApplicationId {
        let application_id = self.seed(id);
        self.attach_score(&application_id, score);
        application_id
    }

    pub(super) fn attach_score(&self, id: &ApplicationId, score: f32) -> MatchResultId {
        let mut assessment = MatchAssessment::bare(score);
        assessment.strengths = vec!["Payment systems".to_string()];
        assessment.gaps = vec!["No Kubernetes".to_string()];
        assessment.recommendation = "Interview".to_string();
        let result = self
            .match_results
            .insert(MatchResult::new(id.clone(), assessment))
            .expect("result stored");
        self.applications
            .attach_match_result(id, ApplicationStatus::InReview, result.id)
            .expect("attach succeeds")
            .expect("application in review");
        result.id
    }

    pub(super) fn record(&self, id: &ApplicationId) -> ApplicationRecord {
        self.applications
            .fetch(id)
            .expect("fetch succeeds")
            .expect("record present")
    }
}

/// Repository where a concurrent caller always commits the same transition first.
pub(super) struct RacingRepository {
    pub(super) inner: Arc<InMemoryApplications>,
}

impl ApplicationRepository for RacingRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn transition(
        &self,
        id: &ApplicationId,
        change: &StatusChange,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.transition(id, change)?;
        self.inner.transition(id, change)
    }

    fn attach_match_result(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        result: MatchResultId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.attach_match_result(id, expected, result)
    }

    fn by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.by_status(status, limit)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _id: &ApplicationId,
        _change: &StatusChange,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn attach_match_result(
        &self,
        _id: &ApplicationId,
        _expected: ApplicationStatus,
        _result: MatchResultId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_status(
        &self,
        _status: ApplicationStatus,
        _limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Text of every content stream on every page of a PDF.
pub(super) fn page_texts(pdf: &[u8]) -> Vec<String> {
    let document = Document::load_mem(pdf).expect("pdf loads");
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let content = document.get_page_content(page_id).expect("page content");
            String::from_utf8_lossy(&content).to_string()
        })
        .collect()
}
