// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! File-backed backend: one JSON document per entity under a data
//! directory. Plain filesystem I/O; durability and layout only, no crypto.
//!
//! ## Layout
//!
//! ```text
//! {data_dir}/
//!   partners/{partner_id}.json
//!   sessions/{session_id}.json
//!   quotes/{quote_reference}.json
//!   kyc/{kyc_session_id}.json
//!   transactions/{transaction_id}.json
//!   webhooks/{event_id}.json
//! ```
//!
//! A single mutex serializes all mutations, giving this backend the same
//! CAS and field-merge guarantees as the in-memory one. Writes go through
//! a temp file plus rename so a crash never leaves a torn document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::{GatewayStore, StorageError, StorageResult};
use crate::models::{
    KycSession, Partner, Quote, QuoteStatus, Session, Transaction, TransactionStatus,
    WebhookDeliveryStatus, WebhookEvent,
};

/// Path layout under the data directory.
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partners_dir(&self) -> PathBuf {
        self.root.join("partners")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn quotes_dir(&self) -> PathBuf {
        self.root.join("quotes")
    }

    pub fn kyc_dir(&self) -> PathBuf {
        self.root.join("kyc")
    }

    pub fn transactions_dir(&self) -> PathBuf {
        self.root.join("transactions")
    }

    pub fn webhooks_dir(&self) -> PathBuf {
        self.root.join("webhooks")
    }

    fn partner(&self, id: &str) -> PathBuf {
        self.partners_dir().join(format!("{id}.json"))
    }

    fn session(&self, id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{id}.json"))
    }

    fn quote(&self, reference: &str) -> PathBuf {
        self.quotes_dir().join(format!("{reference}.json"))
    }

    fn kyc(&self, id: &str) -> PathBuf {
        self.kyc_dir().join(format!("{id}.json"))
    }

    fn transaction(&self, id: &str) -> PathBuf {
        self.transactions_dir().join(format!("{id}.json"))
    }

    fn webhook(&self, id: &str) -> PathBuf {
        self.webhooks_dir().join(format!("{id}.json"))
    }
}

pub struct FileStore {
    paths: StorePaths,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and initialize) a file store rooted at `data_dir`. Idempotent.
    pub fn open(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let paths = StorePaths::new(data_dir);
        let dirs = [
            paths.partners_dir(),
            paths.sessions_dir(),
            paths.quotes_dir(),
            paths.kyc_dir(),
            paths.transactions_dir(),
            paths.webhooks_dir(),
        ];
        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self {
            paths,
            write_lock: Mutex::new(()),
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path, entity: &str) -> StorageResult<T> {
        if !path.exists() {
            return Err(StorageError::NotFound(entity.to_string()));
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn create_json<T: Serialize>(&self, path: &Path, value: &T, entity: &str) -> StorageResult<()> {
        let _guard = self.lock();
        if path.exists() {
            return Err(StorageError::AlreadyExists(entity.to_string()));
        }
        self.write_json(path, value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn list_ids(&self, dir: &Path) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}

impl GatewayStore for FileStore {
    fn insert_partner(&self, partner: Partner) -> StorageResult<()> {
        let path = self.paths.partner(&partner.partner_id);
        self.create_json(&path, &partner, &format!("partner {}", partner.partner_id))
    }

    fn partner(&self, partner_id: &str) -> StorageResult<Partner> {
        self.read_json(
            &self.paths.partner(partner_id),
            &format!("partner {partner_id}"),
        )
    }

    fn partner_by_api_key(&self, api_key: &str) -> StorageResult<Partner> {
        for id in self.list_ids(&self.paths.partners_dir())? {
            if let Ok(partner) = self.partner(&id) {
                if partner.api_key == api_key {
                    return Ok(partner);
                }
            }
        }
        Err(StorageError::NotFound("partner for API key".to_string()))
    }

    fn insert_session(&self, session: Session) -> StorageResult<()> {
        let path = self.paths.session(&session.session_id);
        self.create_json(&path, &session, &format!("session {}", session.session_id))
    }

    fn session(&self, session_id: &str) -> StorageResult<Session> {
        self.read_json(
            &self.paths.session(session_id),
            &format!("session {session_id}"),
        )
    }

    fn insert_quote(&self, quote: Quote) -> StorageResult<()> {
        let path = self.paths.quote(&quote.quote_reference);
        self.create_json(&path, &quote, &format!("quote {}", quote.quote_reference))
    }

    fn quote(&self, quote_reference: &str) -> StorageResult<Quote> {
        self.read_json(
            &self.paths.quote(quote_reference),
            &format!("quote {quote_reference}"),
        )
    }

    fn set_quote_status(
        &self,
        quote_reference: &str,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> StorageResult<Quote> {
        let _guard = self.lock();
        let path = self.paths.quote(quote_reference);
        let mut quote: Quote = self.read_json(&path, &format!("quote {quote_reference}"))?;
        if quote.status != expected {
            return Err(StorageError::Conflict {
                entity: format!("quote {quote_reference}"),
                expected: format!("{expected:?}"),
                actual: format!("{:?}", quote.status),
            });
        }
        quote.status = next;
        self.write_json(&path, &quote)?;
        Ok(quote)
    }

    fn insert_kyc_session(&self, kyc: KycSession) -> StorageResult<()> {
        let path = self.paths.kyc(&kyc.kyc_session_id);
        self.create_json(&path, &kyc, &format!("kyc session {}", kyc.kyc_session_id))
    }

    fn kyc_session(&self, kyc_session_id: &str) -> StorageResult<KycSession> {
        self.read_json(
            &self.paths.kyc(kyc_session_id),
            &format!("kyc session {kyc_session_id}"),
        )
    }

    fn update_kyc_session(
        &self,
        kyc_session_id: &str,
        mutate: &mut dyn FnMut(&mut KycSession),
    ) -> StorageResult<KycSession> {
        let _guard = self.lock();
        let path = self.paths.kyc(kyc_session_id);
        let mut kyc: KycSession =
            self.read_json(&path, &format!("kyc session {kyc_session_id}"))?;
        mutate(&mut kyc);
        self.write_json(&path, &kyc)?;
        Ok(kyc)
    }

    fn insert_transaction(&self, transaction: Transaction) -> StorageResult<()> {
        let path = self.paths.transaction(&transaction.transaction_id);
        self.create_json(
            &path,
            &transaction,
            &format!("transaction {}", transaction.transaction_id),
        )
    }

    fn transaction(&self, transaction_id: &str) -> StorageResult<Transaction> {
        self.read_json(
            &self.paths.transaction(transaction_id),
            &format!("transaction {transaction_id}"),
        )
    }

    fn transition_transaction(
        &self,
        transaction_id: &str,
        expected: TransactionStatus,
        mutate: &mut dyn FnMut(&mut Transaction),
    ) -> StorageResult<Transaction> {
        let _guard = self.lock();
        let path = self.paths.transaction(transaction_id);
        let mut transaction: Transaction =
            self.read_json(&path, &format!("transaction {transaction_id}"))?;
        if transaction.status != expected {
            return Err(StorageError::Conflict {
                entity: format!("transaction {transaction_id}"),
                expected: format!("{expected:?}"),
                actual: format!("{:?}", transaction.status),
            });
        }
        mutate(&mut transaction);
        self.write_json(&path, &transaction)?;
        Ok(transaction)
    }

    fn insert_webhook_event(&self, event: WebhookEvent) -> StorageResult<()> {
        let path = self.paths.webhook(&event.event_id);
        self.create_json(&path, &event, &format!("webhook event {}", event.event_id))
    }

    fn webhook_event(&self, event_id: &str) -> StorageResult<WebhookEvent> {
        self.read_json(
            &self.paths.webhook(event_id),
            &format!("webhook event {event_id}"),
        )
    }

    fn due_webhook_events(&self, now: DateTime<Utc>) -> StorageResult<Vec<WebhookEvent>> {
        let mut due = Vec::new();
        for id in self.list_ids(&self.paths.webhooks_dir())? {
            if let Ok(event) = self.webhook_event(&id) {
                let retryable = matches!(
                    event.status,
                    WebhookDeliveryStatus::Pending | WebhookDeliveryStatus::Retrying
                );
                if retryable && event.next_retry_at.map(|at| at <= now).unwrap_or(false) {
                    due.push(event);
                }
            }
        }
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(due)
    }

    fn update_webhook_event(&self, event: &WebhookEvent) -> StorageResult<()> {
        let _guard = self.lock();
        let path = self.paths.webhook(&event.event_id);
        if !path.exists() {
            return Err(StorageError::NotFound(format!(
                "webhook event {}",
                event.event_id
            )));
        }
        self.write_json(&path, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract_tests;

    #[test]
    fn file_store_satisfies_the_storage_contract() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = FileStore::open(dir.path()).expect("open store");
        contract_tests::run_all(&store);
    }

    #[test]
    fn open_is_idempotent_and_data_survives_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let quote = contract_tests::sample_quote("ses_file");
        let reference = quote.quote_reference.clone();

        {
            let store = FileStore::open(dir.path()).expect("open store");
            store.insert_quote(quote).unwrap();
        }

        let reopened = FileStore::open(dir.path()).expect("reopen store");
        assert_eq!(
            reopened.quote(&reference).unwrap().quote_reference,
            reference
        );
    }

    #[test]
    fn torn_writes_are_impossible_via_tmp_rename() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = FileStore::open(dir.path()).expect("open store");
        let quote = contract_tests::sample_quote("ses_tmp");
        store.insert_quote(quote.clone()).unwrap();

        // No stray temp files remain after a successful write.
        let leftovers: Vec<_> = std::fs::read_dir(store.paths().quotes_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
