//! Report service - wires decoders, the account cache and the store together

use crate::cache::AccountCache;
use crate::decoder::{DecoderChain, Frame};
use crate::error::{ReportError, ReportResult};
use crate::session::ReportSession;
use cleancredit_core::{AccountId, ScoringPolicy};
use cleancredit_ledger::{PendingViolation, ReportDetails, SettlementResult};
use cleancredit_store::LedgerStore;
use std::sync::Arc;
use tracing::info;

/// What the reporter adds to a frame before proposing
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub description: Option<String>,
    pub waste_category: Option<String>,
}

pub struct ReportService {
    store: Arc<dyn LedgerStore>,
    cache: AccountCache,
    decoders: DecoderChain,
    policy: ScoringPolicy,
}

impl ReportService {
    pub async fn new(
        store: Arc<dyn LedgerStore>,
        decoders: DecoderChain,
        policy: ScoringPolicy,
    ) -> ReportResult<Self> {
        let cache = AccountCache::start(Arc::clone(&store)).await?;
        Ok(Self {
            store,
            cache,
            decoders,
            policy,
        })
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn cache(&self) -> &AccountCache {
        &self.cache
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Open a session for a reporter known to the cache
    pub fn session(&self, reporter_id: &AccountId) -> ReportResult<ReportSession> {
        if self.cache.snapshot().account(reporter_id).is_none() {
            return Err(ReportError::UnknownReporter(reporter_id.clone()));
        }
        Ok(ReportSession::new(reporter_id.clone()))
    }

    /// Decode, resolve and validate a frame, leaving the session pending
    pub fn propose(
        &self,
        session: &mut ReportSession,
        frame: &Frame,
        input: &ReportInput,
    ) -> ReportResult<PendingViolation> {
        let decoded = self.decoders.decode(frame)?;
        let details = ReportDetails::new(decoded.value)
            .with_description(input.description.as_deref())
            .with_waste_category(input.waste_category.as_deref());

        let snapshot = self.cache.snapshot();
        session.scan(details, &snapshot.accounts)?;
        let pending = session.propose()?;
        Ok(pending.clone())
    }

    /// Settle the session's pending violation
    pub async fn confirm(&self, session: &mut ReportSession) -> ReportResult<SettlementResult> {
        let result = session.confirm(self.store.as_ref(), &self.policy).await?.clone();
        info!(
            tx = %result.transaction_id(),
            reporter = %result.scan_event.reporter_id,
            reported = %result.scan_event.reported_id,
            "Report settled"
        );
        Ok(result)
    }
}

/// Message shown after a successful settlement
pub fn success_message(reported_label: &str, result: &SettlementResult) -> String {
    format!(
        "Reported {}: +{} PTS, -{} PTS",
        reported_label, result.credit.amount, result.debit.amount
    )
}
