use chrono::{Local, NaiveDate};
use clap::Args;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use talent_pipeline::config::ConfigError;
use talent_pipeline::error::AppError;
use talent_pipeline::workflows::admission::memory::{
    InMemoryAppointments, InMemoryCompanies, InMemoryCompanyMatches, InMemoryProfiles,
};
use talent_pipeline::workflows::admission::{
    AdmissionError, AdmissionNoticeSettings, AppointmentDesk, AppointmentPorts, AppointmentRequest,
    AppointmentStatus, AppointmentUpdate, CompanyId, CompanyListing, CompanyMatcher,
    MatcherPorts, MatchingProfile, ProfileId, ProfileStatus, UserId,
};
use talent_pipeline::workflows::applications::memory::{
    InMemoryApplications, InMemoryDocuments, InMemoryMatchResults, InMemoryTransmissionLog,
};
use talent_pipeline::workflows::applications::watermark::{DEFAULT_FONT_SIZE, DEFAULT_OPACITY};
use talent_pipeline::workflows::applications::{
    default_caption, export_csv, watermark_pdf, ApplicationId, ApplicationStatus, ApplicationTriageEngine,
    CandidateSnapshot, CompanySnapshot, DocumentRef, EngineSettings, JobSnapshot,
    NewApplication, NoticeSettings, TriagePorts, TriageThresholds, WatermarkOptions,
};
use talent_pipeline::workflows::notifications::RecordingDispatcher;
use talent_pipeline::workflows::scoring::StaticScoreProvider;

const DEMO_SENDER: &str = "Talent Pipeline";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// PDF used as every candidate's CV. A generated two-page CV is used otherwise.
    #[arg(long)]
    pub(crate) cv: Option<PathBuf>,
    /// Auto-send threshold (0-100)
    #[arg(long, default_value_t = 80)]
    pub(crate) auto_send: u8,
    /// Manual review threshold (0-100)
    #[arg(long, default_value_t = 60)]
    pub(crate) manual_review: u8,
    /// Skip the company matching and appointment portion of the demo.
    #[arg(long)]
    pub(crate) skip_admission: bool,
}

#[derive(Args, Debug)]
pub(crate) struct WatermarkArgs {
    /// Source PDF
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Destination for the stamped PDF
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Caption to stamp; defaults to the standard transmission caption for today
    #[arg(long)]
    pub(crate) caption: Option<String>,
    /// Caption date (YYYY-MM-DD) for the default caption
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    pub(crate) opacity: f32,
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    pub(crate) font_size: f32,
}

pub(crate) async fn run_watermark(args: WatermarkArgs) -> Result<(), AppError> {
    let source = tokio::fs::read(&args.input).await?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let caption = args
        .caption
        .unwrap_or_else(|| default_caption(DEMO_SENDER, date));
    let options = WatermarkOptions {
        opacity: args.opacity,
        font_size: args.font_size,
    };

    let stamped = watermark_pdf(&source, &caption, &options)?;
    tokio::fs::write(&args.output, &stamped).await?;
    println!(
        "Watermarked {} -> {} ({} bytes) with \"{}\"",
        args.input.display(),
        args.output.display(),
        stamped.len(),
        caption
    );
    Ok(())
}

/// Two-page CV built in memory so the demo runs without fixtures.
fn generated_cv(name: &str) -> Result<Vec<u8>, AppError> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (page, line) in [format!("{name} - Curriculum Vitae"), "Experience".to_string()]
        .into_iter()
        .enumerate()
    {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 760.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| std::io::Error::other(format!("page {}: {err}", page + 1)))?;
        let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(bytes)
}

fn demo_submission(id: &str, title: &str, candidate: &str, company: &str) -> NewApplication {
    let slug = candidate.to_lowercase().replace(' ', ".");
    NewApplication {
        application_id: ApplicationId(id.to_string()),
        job: JobSnapshot {
            job_id: format!("job-{id}"),
            title: title.to_string(),
            description: format!("{title} role at {company}"),
            requirements: None,
            skills: vec!["Rust".to_string(), "SQL".to_string(), "Cloud".to_string()],
            experience_years: Some(3),
            company: CompanySnapshot {
                company_id: company.to_lowercase().replace(' ', "-"),
                name: company.to_string(),
                email: Some(format!(
                    "hiring@{}.example",
                    company.to_lowercase().replace(' ', "")
                )),
            },
        },
        candidate: CandidateSnapshot {
            candidate_id: format!("cand-{id}"),
            full_name: candidate.to_string(),
            email: format!("{slug}@candidates.example"),
            profile_text: format!("{candidate}, engineer with five years of experience"),
        },
        cv: DocumentRef {
            document_id: format!("cv-{id}"),
            file_name: format!("CV_{}.pdf", candidate.replace(' ', "_")),
            storage_location: format!("demo/{id}.pdf"),
        },
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        cv,
        auto_send,
        manual_review,
        skip_admission,
    } = args;

    let thresholds = TriageThresholds::new(auto_send, manual_review).map_err(|_| {
        AppError::Config(ConfigError::ThresholdOrder {
            auto_send,
            manual_review,
        })
    })?;
    let settings = EngineSettings {
        thresholds,
        notices: NoticeSettings {
            admin_email: "admin@talent.example".to_string(),
            frontend_base_url: "https://app.talent.example".to_string(),
        },
        sender_name: DEMO_SENDER.to_string(),
        watermark: WatermarkOptions::default(),
        score_timeout: Duration::from_secs(5),
    };

    let scorer = Arc::new(
        StaticScoreProvider::new(50.0)
            .with_score("Senior Rust Engineer", 85.0)
            .with_score("Data Analyst", 45.0)
            .with_score("Platform Engineer", 70.0),
    );
    let documents = Arc::new(InMemoryDocuments::default());
    let notifications = Arc::new(RecordingDispatcher::default());
    let engine = ApplicationTriageEngine::new(
        TriagePorts {
            applications: Arc::new(InMemoryApplications::default()),
            match_results: Arc::new(InMemoryMatchResults::default()),
            transmissions: Arc::new(InMemoryTransmissionLog::default()),
            documents: documents.clone(),
            notifications: notifications.clone(),
            scorer,
        },
        settings.clone(),
    );

    println!(
        "Application triage demo (auto-send >= {}, manual review >= {})",
        thresholds.auto_send(),
        thresholds.manual_review()
    );

    let submissions = [
        demo_submission("app-001", "Senior Rust Engineer", "Ada Martin", "Acme Corp"),
        demo_submission("app-002", "Data Analyst", "Lin Moreau", "Globex"),
        demo_submission("app-003", "Platform Engineer", "Sam Okafor", "Initech"),
    ];

    let mut pending = Vec::new();
    for submission in submissions {
        let cv_bytes = match &cv {
            Some(path) => tokio::fs::read(path).await?,
            None => generated_cv(&submission.candidate.full_name)?,
        };
        documents.store(submission.cv.storage_location.clone(), cv_bytes)?;

        let record = engine.register(submission)?;
        let outcome = engine.score_and_triage(&record.application_id).await?;
        println!(
            "- {} | {} for {} -> {} (score {:.0}, status {})",
            outcome.application_id,
            record.candidate.full_name,
            record.job.title,
            outcome.decision.summary(),
            outcome.score,
            outcome.status
        );
        for warning in &outcome.warnings {
            println!("  warning: {warning}");
        }
        if outcome.status == ApplicationStatus::PendingReview {
            pending.push(record.application_id.clone());
        }
    }

    for id in &pending {
        let review = engine.validate_pending_application(id, true, None).await?;
        println!("- {} approved by reviewer -> {}", review.application_id, review.status);
    }

    println!("\nTransmission log");
    let mut entries = Vec::new();
    for id in ["app-001", "app-002", "app-003"] {
        entries.extend(engine.transmissions(&ApplicationId(id.to_string()))?);
    }
    for entry in &entries {
        println!(
            "- {} -> {} ({} via {}, watermarked: {})",
            entry.document_id,
            entry.recipient_email,
            entry.recipient_category.label(),
            entry.method.label(),
            entry.watermarked
        );
    }
    match export_csv(&entries) {
        Ok(csv) => println!("CSV export: {} rows", csv.lines().count().saturating_sub(1)),
        Err(err) => println!("CSV export unavailable: {err}"),
    }

    println!("\nNotifications");
    for notification in notifications.attempts() {
        println!(
            "- [{}] {} -> {}",
            notification.template,
            notification.subject,
            notification.recipients.join(", ")
        );
    }

    if skip_admission {
        return Ok(());
    }

    run_admission_demo(notifications, &settings).await
}

async fn run_admission_demo(
    notifications: Arc<RecordingDispatcher>,
    settings: &EngineSettings,
) -> Result<(), AppError> {
    println!("\nCompany matching demo");
    let owner = UserId("user-ada".to_string());
    let profile_id = ProfileId("profile-ada".to_string());

    let profiles = Arc::new(InMemoryProfiles::default());
    profiles.save(MatchingProfile {
        id: profile_id.clone(),
        owner: owner.clone(),
        owner_name: "Ada Martin".to_string(),
        owner_email: "ada.martin@candidates.example".to_string(),
        title: "Senior Rust Engineer".to_string(),
        cv_text: None,
        skills: vec!["Rust".to_string(), "Distributed systems".to_string()],
        interests: vec!["Payments".to_string()],
        target_sectors: vec!["fintech".to_string()],
        status: ProfileStatus::Draft,
    })
    .map_err(AdmissionError::from)?;

    let companies = Arc::new(InMemoryCompanies::default());
    for (id, name, sector) in [
        ("c-ledgerly", "Ledgerly", "FinTech"),
        ("c-payline", "Payline", "Fintech & Payments"),
        ("c-shopco", "ShopCo", "Retail"),
    ] {
        companies.add(CompanyListing {
            id: CompanyId(id.to_string()),
            name: name.to_string(),
            sector: Some(sector.to_string()),
            city: Some("Paris".to_string()),
            description: None,
            contact_email: Some(format!("contact@{id}.example")),
            open_positions: vec!["Backend Engineer".to_string()],
            public: true,
        })
        .map_err(AdmissionError::from)?;
    }

    let scorer = Arc::new(
        StaticScoreProvider::new(55.0)
            .with_score("Ledgerly", 88.0)
            .with_score("Payline", 64.0),
    );
    let matcher = CompanyMatcher::new(
        MatcherPorts {
            profiles: profiles.clone(),
            companies: companies.clone(),
            matches: Arc::new(InMemoryCompanyMatches::default()),
            scorer,
        },
        settings.thresholds,
        settings.score_timeout,
    );

    let run = matcher
        .match_profile_with_companies(&profile_id, &owner, false)
        .await?;
    println!(
        "- {} companies matched, {} failures",
        run.matched,
        run.failures.len()
    );
    for ranked in matcher.ranked_matches(&profile_id, &owner, 10)? {
        println!(
            "  - {}: {:.0}% ({:?})",
            ranked.company_match.company_name, ranked.company_match.percentage, ranked.strength
        );
    }

    let desk = AppointmentDesk::new(
        AppointmentPorts {
            profiles,
            companies,
            appointments: Arc::new(InMemoryAppointments::default()),
            notifications,
        },
        AdmissionNoticeSettings {
            admin_email: settings.notices.admin_email.clone(),
            frontend_base_url: settings.notices.frontend_base_url.clone(),
        },
    );
    let date = Local::now().date_naive() + chrono::Duration::days(7);
    let appointment = desk
        .request_appointment(
            &owner,
            AppointmentRequest {
                profile_id,
                company_id: CompanyId("c-ledgerly".to_string()),
                date,
                time: "10:30".to_string(),
                timezone: None,
                message: Some("Happy to present my payments work".to_string()),
            },
        )
        .await?;
    println!(
        "- Appointment {} with {} on {} at {} ({}) -> {}",
        appointment.id,
        appointment.company_name,
        appointment.date,
        appointment.time.format("%H:%M"),
        appointment.timezone,
        appointment.status
    );

    let confirmed = desk
        .update_status(
            &appointment.id,
            AppointmentUpdate {
                status: AppointmentStatus::Confirmed,
                company_notes: Some("Video call link to follow".to_string()),
                rejection_reason: None,
            },
        )
        .await?;
    println!("  Company answered -> {}", confirmed.status);

    Ok(())
}
