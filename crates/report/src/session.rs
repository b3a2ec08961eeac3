//! Report session - the propose/confirm state machine
//!
//! ```text
//! Idle --scan--> Resolved --propose--> PendingConfirmation --confirm--> Settled
//!   |                |                        |
//!   +--(no match)----+--(self report)--> Rejected      cancel --> Idle
//! ```
//!
//! Nothing is written before `confirm`. Cancelling a resolved or pending
//! report has no side effects. A failed confirm leaves the report pending.

use crate::error::{ReportError, ReportResult};
use cleancredit_core::{Account, AccountId, ScoringPolicy};
use cleancredit_ledger::{
    resolve, validate, PendingViolation, Rejection, ReportDetails, SettlementResult,
};
use cleancredit_store::LedgerStore;

/// Where a report currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolved {
        reported: Account,
        details: ReportDetails,
    },
    PendingConfirmation(PendingViolation),
    Settled(SettlementResult),
    Rejected(Rejection),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Resolved { .. } => "resolved",
            SessionState::PendingConfirmation(_) => "pending confirmation",
            SessionState::Settled(_) => "settled",
            SessionState::Rejected(_) => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Settled(_) | SessionState::Rejected(_))
    }
}

/// One reporter's report in progress
#[derive(Debug, Clone)]
pub struct ReportSession {
    reporter_id: AccountId,
    state: SessionState,
}

impl ReportSession {
    pub fn new(reporter_id: AccountId) -> Self {
        Self {
            reporter_id,
            state: SessionState::Idle,
        }
    }

    pub fn reporter_id(&self) -> &AccountId {
        &self.reporter_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingViolation> {
        match &self.state {
            SessionState::PendingConfirmation(pending) => Some(pending),
            _ => None,
        }
    }

    fn invalid(&self, event: &'static str) -> ReportError {
        ReportError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }

    fn reject(&mut self, rejection: Rejection) -> ReportError {
        self.state = SessionState::Rejected(rejection.clone());
        ReportError::Rejected(rejection)
    }

    /// Resolve a scanned value against `accounts`.
    ///
    /// An unresolvable value moves the session to `Rejected`.
    pub fn scan(&mut self, details: ReportDetails, accounts: &[Account]) -> ReportResult<&Account> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("scan"));
        }

        let Some(resolved) = resolve(&details.raw_scanned_value, accounts) else {
            let rejection = match validate(&self.reporter_id, None, details) {
                Err(rejection) => rejection,
                Ok(_) => return Err(self.invalid("scan")),
            };
            return Err(self.reject(rejection));
        };

        self.state = SessionState::Resolved {
            reported: resolved.account.clone(),
            details,
        };
        match &self.state {
            SessionState::Resolved { reported, .. } => Ok(reported),
            _ => Err(self.invalid("scan")),
        }
    }

    /// Validate the resolved report and hold it for confirmation
    pub fn propose(&mut self) -> ReportResult<&PendingViolation> {
        let (reported, details) = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Resolved { reported, details } => (reported, details),
            other => {
                self.state = other;
                return Err(self.invalid("propose"));
            }
        };

        match validate(&self.reporter_id, Some(&reported), details) {
            Ok(pending) => {
                tracing::debug!(
                    reporter = %pending.reporter_id,
                    reported = %pending.reported_id,
                    "Violation proposed"
                );
                self.state = SessionState::PendingConfirmation(pending);
                self.pending().ok_or(ReportError::InvalidTransition {
                    state: "idle",
                    event: "propose",
                })
            }
            Err(rejection) => Err(self.reject(rejection)),
        }
    }

    /// Settle the pending violation through `store`
    pub async fn confirm<S>(&mut self, store: &S, policy: &ScoringPolicy) -> ReportResult<&SettlementResult>
    where
        S: LedgerStore + ?Sized,
    {
        let Some(pending) = self.pending() else {
            return Err(self.invalid("confirm"));
        };

        let result = store.settle(pending, policy).await?;
        self.state = SessionState::Settled(result);
        match &self.state {
            SessionState::Settled(result) => Ok(result),
            _ => Err(self.invalid("confirm")),
        }
    }

    /// Discard a resolved or pending report
    pub fn cancel(&mut self) -> ReportResult<()> {
        match self.state {
            SessionState::Resolved { .. } | SessionState::PendingConfirmation(_) => {
                tracing::debug!(reporter = %self.reporter_id, "Report cancelled");
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    /// Start over after a settled or rejected report
    pub fn reset(&mut self) -> ReportResult<()> {
        match self.state {
            SessionState::Idle | SessionState::Settled(_) | SessionState::Rejected(_) => {
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(self.invalid("reset")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleancredit_core::{IdentityCode, Points};
    use cleancredit_store::MemoryStore;

    fn pool() -> Vec<Account> {
        ["8472910384", "2948571039"]
            .iter()
            .enumerate()
            .map(|(i, code)| {
                Account::unclaimed(
                    AccountId::generate("TAG", i as u32 + 1),
                    IdentityCode::new(*code).unwrap(),
                    Points::new(1000),
                )
            })
            .collect()
    }

    fn session() -> ReportSession {
        ReportSession::new(AccountId::new("TAG_001").unwrap())
    }

    #[test]
    fn test_scan_then_propose() {
        let accounts = pool();
        let mut session = session();

        let reported = session.scan(ReportDetails::new("2948571039"), &accounts).unwrap();
        assert_eq!(reported.id.as_str(), "TAG_002");
        assert_eq!(session.state().name(), "resolved");

        let pending = session.propose().unwrap();
        assert_eq!(pending.reported_id.as_str(), "TAG_002");
        assert!(session.pending().is_some());
    }

    #[test]
    fn test_unknown_code_rejects() {
        let accounts = pool();
        let mut session = session();

        let err = session.scan(ReportDetails::new("0000000000"), &accounts).unwrap_err();
        assert!(err.is_rejection());
        assert!(matches!(
            session.state(),
            SessionState::Rejected(Rejection::UnknownCode { .. })
        ));
        session.reset().unwrap();
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_self_report_rejected_on_propose() {
        let accounts = pool();
        let mut session = session();

        session.scan(ReportDetails::new("8472910384"), &accounts).unwrap();
        let err = session.propose().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Accountability Paradox: You cannot report your own pre-assigned tag."
        );
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let accounts = pool();
        let mut session = session();

        assert!(matches!(
            session.propose(),
            Err(ReportError::InvalidTransition { state: "idle", event: "propose" })
        ));
        assert!(session.cancel().is_err());

        session.scan(ReportDetails::new("TAG_002"), &accounts).unwrap();
        assert!(session.scan(ReportDetails::new("TAG_002"), &accounts).is_err());
        assert!(session.reset().is_err());
        assert_eq!(session.state().name(), "resolved");
    }

    #[tokio::test]
    async fn test_cancel_writes_nothing() {
        let store = MemoryStore::new();
        store.provision(pool()).await.unwrap();
        let accounts = store.accounts().await.unwrap();
        let mut session = session();

        session.scan(ReportDetails::new("2948571039"), &accounts).unwrap();
        session.propose().unwrap();
        session.cancel().unwrap();

        assert!(session
            .confirm(&store, &ScoringPolicy::default())
            .await
            .is_err());
        assert!(store.ledger_entries().await.unwrap().is_empty());
        assert!(store.scan_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_settles() {
        let store = MemoryStore::new();
        store.provision(pool()).await.unwrap();
        let accounts = store.accounts().await.unwrap();
        let mut session = session();

        session
            .scan(
                ReportDetails::new("2948571039").with_waste_category(Some("Plastic")),
                &accounts,
            )
            .unwrap();
        session.propose().unwrap();
        let result = session
            .confirm(&store, &ScoringPolicy::default())
            .await
            .unwrap();

        assert_eq!(result.credit.amount, Points::new(30));
        assert_eq!(session.state().name(), "settled");
        assert!(session.confirm(&store, &ScoringPolicy::default()).await.is_err());
    }
}
