//! In-process adapters backing the demo, local development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::documents::{DocumentError, DocumentSource};
use super::domain::{ApplicationId, ApplicationStatus, DocumentRef, MatchResult, MatchResultId};
use super::repository::{
    ApplicationRecord, ApplicationRepository, MatchResultRepository, RepositoryError, StatusChange,
};
use super::transmission::{
    NewTransmission, TransmissionLog, TransmissionLogEntry, TransmissionLogError,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryApplications {
    records: Mutex<HashMap<ApplicationId, ApplicationRecord>>,
}

impl ApplicationRepository for InMemoryApplications {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn transition(
        &self,
        id: &ApplicationId,
        change: &StatusChange,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.status != change.from {
            return Ok(None);
        }
        record.apply(change, Utc::now());
        Ok(Some(record.clone()))
    }

    fn attach_match_result(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        result: MatchResultId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.status != expected {
            return Ok(None);
        }
        record.match_result = Some(result);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    fn by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut records: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Default)]
pub struct InMemoryMatchResults {
    results: Mutex<Vec<MatchResult>>,
}

impl MatchResultRepository for InMemoryMatchResults {
    fn insert(&self, result: MatchResult) -> Result<MatchResult, RepositoryError> {
        let mut guard = lock(&self.results)?;
        if guard.iter().any(|existing| existing.id == result.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(result.clone());
        Ok(result)
    }

    fn fetch(&self, id: &MatchResultId) -> Result<Option<MatchResult>, RepositoryError> {
        Ok(lock(&self.results)?
            .iter()
            .find(|result| &result.id == id)
            .cloned())
    }

    fn history(&self, application_id: &ApplicationId) -> Result<Vec<MatchResult>, RepositoryError> {
        Ok(lock(&self.results)?
            .iter()
            .rev()
            .filter(|result| &result.application_id == application_id)
            .cloned()
            .collect())
    }
}

/// Append-only log kept in insertion order; listings are returned newest first.
#[derive(Default)]
pub struct InMemoryTransmissionLog {
    entries: Mutex<Vec<TransmissionLogEntry>>,
}

impl InMemoryTransmissionLog {
    fn entries(&self) -> Result<MutexGuard<'_, Vec<TransmissionLogEntry>>, TransmissionLogError> {
        self.entries
            .lock()
            .map_err(|_| TransmissionLogError::Unavailable("log mutex poisoned".to_string()))
    }

    fn newest_first(
        &self,
        predicate: impl Fn(&TransmissionLogEntry) -> bool,
    ) -> Result<Vec<TransmissionLogEntry>, TransmissionLogError> {
        Ok(self
            .entries()?
            .iter()
            .rev()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect())
    }
}

impl TransmissionLog for InMemoryTransmissionLog {
    fn log(&self, entry: NewTransmission) -> Result<TransmissionLogEntry, TransmissionLogError> {
        let entry = entry.into_entry(Utc::now());
        self.entries()?.push(entry.clone());
        Ok(entry)
    }

    fn log_if_absent(
        &self,
        entry: NewTransmission,
    ) -> Result<Option<TransmissionLogEntry>, TransmissionLogError> {
        let mut entries = self.entries()?;
        if entries
            .iter()
            .any(|existing| existing.is_addressed_to(&entry.document_id, &entry.recipient_email))
        {
            return Ok(None);
        }
        let entry = entry.into_entry(Utc::now());
        entries.push(entry.clone());
        Ok(Some(entry))
    }

    fn list_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<TransmissionLogEntry>, TransmissionLogError> {
        self.newest_first(|entry| &entry.application_id == application_id)
    }

    fn list_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<TransmissionLogEntry>, TransmissionLogError> {
        self.newest_first(|entry| entry.document_id == document_id)
    }

    fn has_been_sent_to(
        &self,
        document_id: &str,
        recipient: &str,
    ) -> Result<bool, TransmissionLogError> {
        Ok(self
            .entries()?
            .iter()
            .any(|entry| entry.is_addressed_to(document_id, recipient)))
    }
}

/// Documents held in memory, keyed by storage location.
#[derive(Default)]
pub struct InMemoryDocuments {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryDocuments {
    pub fn store(
        &self,
        location: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), DocumentError> {
        self.documents
            .lock()
            .map_err(|_| DocumentError::SourceUnavailable("document mutex poisoned".to_string()))?
            .insert(location.into(), bytes);
        Ok(())
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocuments {
    async fn fetch(&self, document: &DocumentRef) -> Result<Vec<u8>, DocumentError> {
        let guard = self
            .documents
            .lock()
            .map_err(|_| DocumentError::SourceUnavailable("document mutex poisoned".to_string()))?;
        guard
            .get(&document.storage_location)
            .cloned()
            .ok_or_else(|| {
                DocumentError::SourceUnavailable(format!(
                    "no document stored at '{}'",
                    document.storage_location
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_document_store_reports_unavailable() {
        let documents = Arc::new(InMemoryDocuments::default());
        let poisoner = documents.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.documents.lock();
            panic!("poison the document store");
        })
        .join();

        match documents.store("cvs/app-1.pdf", b"%PDF".to_vec()) {
            Err(DocumentError::SourceUnavailable(_)) => {}
            other => panic!("expected unavailable store, got {other:?}"),
        }
    }
}
