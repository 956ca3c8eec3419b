// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! In-memory backend: HashMaps behind one RwLock. The write lock is held
//! across every read-modify-write, which is what makes the CAS and
//! field-merge guarantees hold.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{GatewayStore, StorageError, StorageResult};
use crate::models::{
    KycSession, Partner, Quote, QuoteStatus, Session, Transaction, TransactionStatus,
    WebhookDeliveryStatus, WebhookEvent,
};

#[derive(Default)]
struct Tables {
    partners: HashMap<String, Partner>,
    sessions: HashMap<String, Session>,
    quotes: HashMap<String, Quote>,
    kyc_sessions: HashMap<String, KycSession>,
    transactions: HashMap<String, Transaction>,
    webhook_events: HashMap<String, WebhookEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn insert_unique<T>(
    map: &mut HashMap<String, T>,
    key: String,
    value: T,
    entity: &str,
) -> StorageResult<()> {
    if map.contains_key(&key) {
        return Err(StorageError::AlreadyExists(format!("{entity} {key}")));
    }
    map.insert(key, value);
    Ok(())
}

fn get_cloned<T: Clone>(map: &HashMap<String, T>, key: &str, entity: &str) -> StorageResult<T> {
    map.get(key)
        .cloned()
        .ok_or_else(|| StorageError::NotFound(format!("{entity} {key}")))
}

impl GatewayStore for MemoryStore {
    fn insert_partner(&self, partner: Partner) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.partners,
            partner.partner_id.clone(),
            partner,
            "partner",
        )
    }

    fn partner(&self, partner_id: &str) -> StorageResult<Partner> {
        get_cloned(&self.read().partners, partner_id, "partner")
    }

    fn partner_by_api_key(&self, api_key: &str) -> StorageResult<Partner> {
        self.read()
            .partners
            .values()
            .find(|partner| partner.api_key == api_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("partner for API key".to_string()))
    }

    fn insert_session(&self, session: Session) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.sessions,
            session.session_id.clone(),
            session,
            "session",
        )
    }

    fn session(&self, session_id: &str) -> StorageResult<Session> {
        get_cloned(&self.read().sessions, session_id, "session")
    }

    fn insert_quote(&self, quote: Quote) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.quotes,
            quote.quote_reference.clone(),
            quote,
            "quote",
        )
    }

    fn quote(&self, quote_reference: &str) -> StorageResult<Quote> {
        get_cloned(&self.read().quotes, quote_reference, "quote")
    }

    fn set_quote_status(
        &self,
        quote_reference: &str,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> StorageResult<Quote> {
        let mut tables = self.write();
        let quote = tables
            .quotes
            .get_mut(quote_reference)
            .ok_or_else(|| StorageError::NotFound(format!("quote {quote_reference}")))?;
        if quote.status != expected {
            return Err(StorageError::Conflict {
                entity: format!("quote {quote_reference}"),
                expected: format!("{expected:?}"),
                actual: format!("{:?}", quote.status),
            });
        }
        quote.status = next;
        Ok(quote.clone())
    }

    fn insert_kyc_session(&self, kyc: KycSession) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.kyc_sessions,
            kyc.kyc_session_id.clone(),
            kyc,
            "kyc session",
        )
    }

    fn kyc_session(&self, kyc_session_id: &str) -> StorageResult<KycSession> {
        get_cloned(&self.read().kyc_sessions, kyc_session_id, "kyc session")
    }

    fn update_kyc_session(
        &self,
        kyc_session_id: &str,
        mutate: &mut dyn FnMut(&mut KycSession),
    ) -> StorageResult<KycSession> {
        let mut tables = self.write();
        let kyc = tables
            .kyc_sessions
            .get_mut(kyc_session_id)
            .ok_or_else(|| StorageError::NotFound(format!("kyc session {kyc_session_id}")))?;
        mutate(kyc);
        Ok(kyc.clone())
    }

    fn insert_transaction(&self, transaction: Transaction) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.transactions,
            transaction.transaction_id.clone(),
            transaction,
            "transaction",
        )
    }

    fn transaction(&self, transaction_id: &str) -> StorageResult<Transaction> {
        get_cloned(&self.read().transactions, transaction_id, "transaction")
    }

    fn transition_transaction(
        &self,
        transaction_id: &str,
        expected: TransactionStatus,
        mutate: &mut dyn FnMut(&mut Transaction),
    ) -> StorageResult<Transaction> {
        let mut tables = self.write();
        let transaction = tables
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| StorageError::NotFound(format!("transaction {transaction_id}")))?;
        if transaction.status != expected {
            return Err(StorageError::Conflict {
                entity: format!("transaction {transaction_id}"),
                expected: format!("{expected:?}"),
                actual: format!("{:?}", transaction.status),
            });
        }
        mutate(transaction);
        Ok(transaction.clone())
    }

    fn insert_webhook_event(&self, event: WebhookEvent) -> StorageResult<()> {
        let mut tables = self.write();
        insert_unique(
            &mut tables.webhook_events,
            event.event_id.clone(),
            event,
            "webhook event",
        )
    }

    fn webhook_event(&self, event_id: &str) -> StorageResult<WebhookEvent> {
        get_cloned(&self.read().webhook_events, event_id, "webhook event")
    }

    fn due_webhook_events(&self, now: DateTime<Utc>) -> StorageResult<Vec<WebhookEvent>> {
        let tables = self.read();
        let mut due: Vec<WebhookEvent> = tables
            .webhook_events
            .values()
            .filter(|event| {
                matches!(
                    event.status,
                    WebhookDeliveryStatus::Pending | WebhookDeliveryStatus::Retrying
                ) && event.next_retry_at.map(|at| at <= now).unwrap_or(false)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(due)
    }

    fn update_webhook_event(&self, event: &WebhookEvent) -> StorageResult<()> {
        let mut tables = self.write();
        if !tables.webhook_events.contains_key(&event.event_id) {
            return Err(StorageError::NotFound(format!(
                "webhook event {}",
                event.event_id
            )));
        }
        tables
            .webhook_events
            .insert(event.event_id.clone(), event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract_tests;

    #[test]
    fn memory_store_satisfies_the_storage_contract() {
        let store = MemoryStore::new();
        contract_tests::run_all(&store);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let quote = contract_tests::sample_quote("ses_dup");
        store.insert_quote(quote.clone()).unwrap();
        assert!(matches!(
            store.insert_quote(quote),
            Err(StorageError::AlreadyExists(_))
        ));
    }
}
