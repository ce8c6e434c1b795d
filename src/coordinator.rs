//! Commit-reveal coordinator.
//!
//! The commit phase validates a user-signed stablecoin transfer and parks
//! it under a TTL'd identifier; the execute phase redeems that identifier:
//! buy energy, broadcast the user's payment, wait for confirmation, pay out
//! native tokens. A pending commit is consumed atomically on first execute,
//! whatever the outcome, so a failed execute always requires a fresh commit.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::abuse::AbuseTracker;
use crate::config::Config;
use crate::decoder::{self, ExpectedTransfer};
use crate::error::{Error, RejectReason};
use crate::providers::ProviderManager;
use crate::rate_limit::RateLimiter;
use crate::rpc::ChainRpc;
use crate::store::{LedgerStore, PendingStore};
use crate::types::{
    now_ms, CommitReceipt, CommitRequest, ExecuteOutcome, NewTransaction, PendingCommit,
    StatusUpdate, TxStatus, CHAIN_TRON, TX_TYPE_TOPUP,
};

pub struct Coordinator {
    config: Config,
    pending: Arc<dyn PendingStore>,
    ledger: Arc<dyn LedgerStore>,
    abuse: Arc<AbuseTracker>,
    rate_limiter: Arc<RateLimiter>,
    rpc: Arc<dyn ChainRpc>,
    providers: Arc<ProviderManager>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        pending: Arc<dyn PendingStore>,
        ledger: Arc<dyn LedgerStore>,
        abuse: Arc<AbuseTracker>,
        rate_limiter: Arc<RateLimiter>,
        rpc: Arc<dyn ChainRpc>,
        providers: Arc<ProviderManager>,
    ) -> Self {
        Self {
            config,
            pending,
            ledger,
            abuse,
            rate_limiter,
            rpc,
            providers,
        }
    }

    /// Validate a signed payment and reserve it under a fresh commit id.
    ///
    /// Gate order: rate limit, configuration, blacklist, transaction
    /// validation, balance. None of these writes anything durable; only a
    /// request that passes them all is tracked and persisted.
    pub async fn commit(&self, request: CommitRequest) -> Result<CommitReceipt, Error> {
        self.rate_limiter.check(&request.ip_address).await?;

        let service_wallet = self
            .config
            .service_wallet
            .clone()
            .ok_or_else(|| Error::Config("service wallet not configured".into()))?;

        let wallet = request.user_address.to_ascii_lowercase();
        if self.abuse.is_blacklisted(&wallet, &request.ip_address).await? {
            warn!(%wallet, ip = %request.ip_address, "Blacklisted commit attempt");
            return Err(RejectReason::Blacklisted.into());
        }

        let expected = ExpectedTransfer {
            recipient: service_wallet,
            contract: self.config.usdt_contract.clone(),
            amount: self.config.pricing.usdt_to_minor(request.expected_amount),
        };
        let decoded = decoder::validate(&request.signed_tx, &expected, now_ms())?;

        let balance = self
            .rpc
            .token_balance(&self.config.usdt_contract, &decoded.sender)
            .await?;
        if balance < decoded.amount {
            return Err(RejectReason::InsufficientBalance.into());
        }

        // First durable write: every request past validation counts, even
        // ones that never execute.
        self.abuse.track_request(&wallet, &request.ip_address).await?;

        if !self.config.pricing.within_bounds(request.expected_amount) {
            return Err(RejectReason::AmountOutOfRange.into());
        }
        let trx_amount = self.config.pricing.payout_trx(
            request.expected_amount,
            self.config.pricing.fallback_energy_cost_trx,
        );
        if trx_amount <= 0.0 {
            return Err(RejectReason::PayoutNotPositive.into());
        }

        let commit_id = Uuid::new_v4();
        let created_at = now_ms();
        let pending = PendingCommit {
            signed_tx: request.signed_tx,
            quote_id: request.quote_id,
            user_address: wallet.clone(),
            ip_address: request.ip_address,
            usdt_amount: request.expected_amount,
            trx_amount,
            created_at,
        };
        self.pending
            .put(commit_id, &pending, self.config.commit_ttl_secs)
            .await?;

        info!(
            %commit_id,
            %wallet,
            usdt = request.expected_amount,
            trx = trx_amount,
            "Commit accepted"
        );
        Ok(CommitReceipt {
            commit_id,
            expires_at: created_at + self.config.commit_ttl_secs as i64 * 1_000,
        })
    }

    /// Redeem a commit. The pending entry is consumed up front; any
    /// failure past that point lands the ledger row in `failed` and the
    /// caller must start over with a new commit.
    pub async fn execute(&self, commit_id: Uuid) -> Result<ExecuteOutcome, Error> {
        let pending = self
            .pending
            .take(commit_id)
            .await?
            .ok_or(Error::Rejected(RejectReason::CommitNotFound))?;

        let transaction_id = self
            .ledger
            .create(NewTransaction {
                chain: CHAIN_TRON.into(),
                tx_type: TX_TYPE_TOPUP.into(),
                user_address: pending.user_address.clone(),
                recipient_address: self.config.service_wallet.clone(),
                stablecoin_amount: pending.usdt_amount,
                native_amount: Some(pending.trx_amount),
                fee_charged: self.config.pricing.service_fee_usdt,
            })
            .await?;
        self.ledger
            .update_status(transaction_id, StatusUpdate::status(TxStatus::Processing))
            .await?;

        // No funds have moved yet; delegation failure is safely abortable.
        let order = match self
            .providers
            .delegate(&pending.user_address, self.config.energy_per_topup, None)
            .await
        {
            Ok(order) => order,
            Err(e) => return self.fail(transaction_id, e).await,
        };

        let usdt_tx_hash = match self.rpc.broadcast(&pending.signed_tx).await {
            Ok(hash) => hash,
            Err(e) => return self.fail(transaction_id, e).await,
        };
        self.ledger
            .update_status(
                transaction_id,
                StatusUpdate {
                    tx_hash: Some(usdt_tx_hash.clone()),
                    ..StatusUpdate::default()
                },
            )
            .await?;

        if let Err(e) = self.wait_for_confirmation(&usdt_tx_hash).await {
            return self.fail(transaction_id, e).await;
        }

        // The user's payment has landed. A payout failure past this point
        // leaves money on our side; marked failed for manual reconciliation.
        let payout_sun = self.config.pricing.trx_to_sun(pending.trx_amount);
        let trx_tx_hash = match self.rpc.send_native(&pending.user_address, payout_sun).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(
                    %transaction_id,
                    %usdt_tx_hash,
                    "Payout failed after confirmed payment; needs reconciliation"
                );
                return self.fail(transaction_id, e).await;
            }
        };

        self.abuse.track_completion(&pending.user_address).await?;
        self.ledger
            .update_status(
                transaction_id,
                StatusUpdate {
                    status: Some(TxStatus::Completed),
                    native_tx_hash: Some(trx_tx_hash.clone()),
                    fee_cost: Some(order.cost_trx),
                    ..StatusUpdate::default()
                },
            )
            .await?;

        info!(
            %transaction_id,
            %usdt_tx_hash,
            %trx_tx_hash,
            trx = pending.trx_amount,
            provider = %order.provider,
            "Top-up completed"
        );
        Ok(ExecuteOutcome {
            transaction_id,
            usdt_tx_hash,
            trx_tx_hash,
            trx_amount: pending.trx_amount,
        })
    }

    /// Drop a commit that will not be executed and record the abandonment.
    /// Returns whether a pending commit was actually present.
    pub async fn abandon(&self, commit_id: Uuid) -> Result<bool, Error> {
        match self.pending.take(commit_id).await? {
            Some(pending) => {
                info!(%commit_id, wallet = %pending.user_address, "Commit abandoned");
                self.abuse
                    .track_abandonment(&pending.user_address, &pending.ip_address)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Bounded confirmation poll: fixed interval, explicit attempt budget.
    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<(), Error> {
        let interval = Duration::from_millis(self.config.confirm_interval_ms);
        let attempts = self.config.confirm_max_attempts;
        for attempt in 1..=attempts {
            match self.rpc.transaction_info(tx_hash).await? {
                Some(receipt) if receipt.success => {
                    info!(tx_hash, attempt, "Transaction confirmed");
                    return Ok(());
                }
                Some(receipt) => {
                    return Err(Error::ChainFailure {
                        tx_hash: tx_hash.to_string(),
                        reason: receipt.result,
                    });
                }
                None => {}
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(Error::ConfirmationTimeout {
            tx_hash: tx_hash.to_string(),
            attempts,
        })
    }

    async fn fail(&self, transaction_id: Uuid, error: Error) -> Result<ExecuteOutcome, Error> {
        warn!(%transaction_id, error = %error, "Top-up failed");
        if let Err(store_err) = self
            .ledger
            .update_status(transaction_id, StatusUpdate::failed(error.to_string()))
            .await
        {
            warn!(%transaction_id, error = %store_err, "Could not mark transaction failed");
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tests::{make_signed_tx, SERVICE_WALLET, USDT_CONTRACT, USER_ADDRESS};
    use crate::providers::tests::{manager_of, StaticProvider};
    use crate::rpc::{BlockRef, Receipt};
    use crate::store::{AbuseStore, MemoryStore, RateLimitStore};
    use crate::types::TxRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted chain for coordinator tests.
    struct ScriptedChain {
        balance: u128,
        fail_broadcast: bool,
        /// `None` polls returned before a receipt appears.
        confirm_after: u32,
        /// When set, the receipt reports this failure result.
        chain_result: Option<&'static str>,
        fail_payout: bool,
        broadcasts: AtomicU32,
        info_calls: AtomicU32,
        payouts: AtomicU32,
    }

    impl ScriptedChain {
        fn healthy(balance: u128) -> Self {
            Self {
                balance,
                fail_broadcast: false,
                confirm_after: 0,
                chain_result: None,
                fail_payout: false,
                broadcasts: AtomicU32::new(0),
                info_calls: AtomicU32::new(0),
                payouts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainRpc for ScriptedChain {
        async fn broadcast(
            &self,
            tx: &crate::decoder::SignedTransaction,
        ) -> Result<String, Error> {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
            if self.fail_broadcast {
                return Err(Error::Broadcast("bandwidth exhausted".into()));
            }
            Ok(tx.tx_id.clone().unwrap_or_else(|| "usdt-tx-1".into()))
        }

        async fn transaction_info(&self, _tx_hash: &str) -> Result<Option<Receipt>, Error> {
            let call = self.info_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.confirm_after {
                return Ok(None);
            }
            match self.chain_result {
                Some(result) => Ok(Some(Receipt {
                    success: false,
                    result: result.into(),
                    fee_sun: Some(345_000),
                })),
                None => Ok(Some(Receipt {
                    success: true,
                    result: "SUCCESS".into(),
                    fee_sun: Some(0),
                })),
            }
        }

        async fn latest_block(&self) -> Result<BlockRef, Error> {
            Ok(BlockRef {
                number: 1,
                hash: "00".into(),
            })
        }

        async fn token_balance(&self, _contract: &str, _holder: &str) -> Result<u128, Error> {
            Ok(self.balance)
        }

        async fn send_native(&self, _to: &str, _amount_sun: u64) -> Result<String, Error> {
            self.payouts.fetch_add(1, Ordering::SeqCst);
            if self.fail_payout {
                return Err(Error::Rpc("native transfer failed: rejected".into()));
            }
            Ok("trx-tx-1".into())
        }
    }

    struct Harness {
        coordinator: Coordinator,
        store: Arc<MemoryStore>,
        chain: Arc<ScriptedChain>,
    }

    /// Opt-in log output for debugging, e.g. `RUST_LOG=gas_station=debug`.
    /// `try_init` because every test shares one process-global subscriber.
    fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn test_config() -> Config {
        Config {
            service_wallet: Some(SERVICE_WALLET.into()),
            service_private_key: Some("ab".repeat(32)),
            usdt_contract: USDT_CONTRACT.into(),
            confirm_max_attempts: 3,
            confirm_interval_ms: 1,
            ..Config::default()
        }
    }

    fn harness_with(
        config: Config,
        chain: ScriptedChain,
        providers: Vec<StaticProvider>,
    ) -> Harness {
        init_test_logging();
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(chain);
        let abuse = Arc::new(AbuseTracker::new(
            Arc::clone(&store) as Arc<dyn AbuseStore>,
            config.abuse,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            Arc::clone(&store) as Arc<dyn RateLimitStore>,
            config.rate_limit_per_min,
        ));
        let coordinator = Coordinator::new(
            config,
            Arc::clone(&store) as Arc<dyn PendingStore>,
            Arc::clone(&store) as Arc<dyn LedgerStore>,
            abuse,
            rate_limiter,
            Arc::clone(&chain) as Arc<dyn ChainRpc>,
            Arc::new(manager_of(providers)),
        );
        Harness {
            coordinator,
            store,
            chain,
        }
    }

    fn harness() -> Harness {
        harness_with(
            test_config(),
            ScriptedChain::healthy(100_000_000),
            vec![StaticProvider::up("apitrx", 1.2)],
        )
    }

    /// 10 USDT transfer matching a 10.00 expected amount.
    fn commit_request() -> CommitRequest {
        commit_request_for(10_000_000, 10.0)
    }

    fn commit_request_for(transfer_minor: u128, expected_amount: f64) -> CommitRequest {
        CommitRequest {
            signed_tx: make_signed_tx(SERVICE_WALLET, transfer_minor, now_ms() + 60_000),
            quote_id: Uuid::new_v4(),
            expected_amount,
            user_address: USER_ADDRESS.into(),
            ip_address: "10.0.0.1".into(),
        }
    }

    async fn ledger_record(store: &MemoryStore, id: Uuid) -> TxRecord {
        LedgerStore::get(store, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_commit_then_execute_happy_path() {
        let h = harness();
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        assert!(receipt.expires_at > now_ms());

        let outcome = h.coordinator.execute(receipt.commit_id).await.unwrap();
        assert_eq!(outcome.usdt_tx_hash, "c0ffee");
        assert_eq!(outcome.trx_tx_hash, "trx-tx-1");
        // 10 / 0.16 - 2.5 fallback energy cost.
        assert!((outcome.trx_amount - 60.0).abs() < 1e-9);

        let record = ledger_record(&h.store, outcome.transaction_id).await;
        assert_eq!(record.status, TxStatus::Completed);
        assert_eq!(record.tx_hash.as_deref(), Some("c0ffee"));
        assert_eq!(record.native_tx_hash.as_deref(), Some("trx-tx-1"));
        assert!((record.fee_cost.unwrap() - 1.2).abs() < 1e-12);
        assert!(record.completed_at.is_some());

        let stats = AbuseStore::user_stats(&*h.store, USER_ADDRESS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.abandoned_count, 0);
    }

    #[tokio::test]
    async fn test_commit_amount_mismatch_leaves_no_trace() {
        let h = harness();
        // 9.99 transferred against a 10.00 expectation.
        let result = h.coordinator.commit(commit_request_for(9_990_000, 10.0)).await;
        match result {
            Err(Error::Rejected(RejectReason::AmountMismatch)) => {}
            other => panic!("expected amount mismatch, got {other:?}"),
        }
        assert!(PendingStore::list_ids(&*h.store).await.unwrap().is_empty());
        // Validation precedes tracking; a mismatching request is never counted.
        assert!(AbuseStore::user_stats(&*h.store, USER_ADDRESS)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_commit_rejects_blacklisted_wallet() {
        let h = harness();
        AbuseStore::upsert_request(&*h.store, USER_ADDRESS, "10.0.0.1")
            .await
            .unwrap();
        AbuseStore::set_blacklist(&*h.store, USER_ADDRESS, true)
            .await
            .unwrap();
        match h.coordinator.commit(commit_request()).await {
            Err(Error::Rejected(RejectReason::Blacklisted)) => {}
            other => panic!("expected blacklist rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commit_rejects_insufficient_balance() {
        let h = harness_with(
            test_config(),
            ScriptedChain::healthy(9_999_999),
            vec![StaticProvider::up("apitrx", 1.2)],
        );
        match h.coordinator.commit(commit_request()).await {
            Err(Error::Rejected(RejectReason::InsufficientBalance)) => {}
            other => panic!("expected insufficient balance, got {other:?}"),
        }
        assert!(AbuseStore::user_stats(&*h.store, USER_ADDRESS)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_commit_requires_service_wallet() {
        let mut config = test_config();
        config.service_wallet = None;
        let h = harness_with(
            config,
            ScriptedChain::healthy(100_000_000),
            vec![StaticProvider::up("apitrx", 1.2)],
        );
        assert!(matches!(
            h.coordinator.commit(commit_request()).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_rate_limited() {
        let mut config = test_config();
        config.rate_limit_per_min = 2;
        let h = harness_with(
            config,
            ScriptedChain::healthy(1_000_000_000),
            vec![StaticProvider::up("apitrx", 1.2)],
        );
        h.coordinator.commit(commit_request()).await.unwrap();
        h.coordinator.commit(commit_request()).await.unwrap();
        match h.coordinator.commit(commit_request()).await {
            Err(Error::Rejected(RejectReason::RateLimited)) => {}
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_unknown_commit() {
        let h = harness();
        match h.coordinator.execute(Uuid::new_v4()).await {
            Err(Error::Rejected(RejectReason::CommitNotFound)) => {}
            other => panic!("expected commit not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_consumes_commit_exactly_once() {
        let h = harness();
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        h.coordinator.execute(receipt.commit_id).await.unwrap();
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::Rejected(RejectReason::CommitNotFound)) => {}
            other => panic!("expected commit not found, got {other:?}"),
        }
        assert_eq!(h.chain.payouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_delegation_failure_consumes_commit() {
        let h = harness_with(
            test_config(),
            ScriptedChain::healthy(100_000_000),
            vec![StaticProvider::failing("apitrx", 1.2)],
        );
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::ProvidersExhausted(failures)) => assert_eq!(failures.len(), 1),
            other => panic!("expected provider exhaustion, got {other:?}"),
        }
        // No broadcast; the commit is gone regardless.
        assert_eq!(h.chain.broadcasts.load(Ordering::SeqCst), 0);
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::Rejected(RejectReason::CommitNotFound)) => {}
            other => panic!("expected commit not found, got {other:?}"),
        }
        let failed = LedgerStore::list_by_user(&*h.store, USER_ADDRESS, 10)
            .await
            .unwrap();
        assert_eq!(failed[0].status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn test_execute_broadcast_failure_marks_failed() {
        let mut chain = ScriptedChain::healthy(100_000_000);
        chain.fail_broadcast = true;
        let h = harness_with(test_config(), chain, vec![StaticProvider::up("apitrx", 1.2)]);
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        assert!(matches!(
            h.coordinator.execute(receipt.commit_id).await,
            Err(Error::Broadcast(_))
        ));
        assert_eq!(h.chain.payouts.load(Ordering::SeqCst), 0);

        let records = LedgerStore::list_by_user(&*h.store, USER_ADDRESS, 10)
            .await
            .unwrap();
        assert_eq!(records[0].status, TxStatus::Failed);
        assert!(records[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("bandwidth exhausted"));
    }

    #[tokio::test]
    async fn test_execute_confirmation_timeout() {
        let mut chain = ScriptedChain::healthy(100_000_000);
        chain.confirm_after = u32::MAX;
        let h = harness_with(test_config(), chain, vec![StaticProvider::up("apitrx", 1.2)]);
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::ConfirmationTimeout { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected confirmation timeout, got {other:?}"),
        }
        assert_eq!(h.chain.info_calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.chain.payouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_chain_failure_receipt() {
        let mut chain = ScriptedChain::healthy(100_000_000);
        chain.chain_result = Some("OUT_OF_ENERGY");
        let h = harness_with(test_config(), chain, vec![StaticProvider::up("apitrx", 1.2)]);
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::ChainFailure { reason, .. }) => assert_eq!(reason, "OUT_OF_ENERGY"),
            other => panic!("expected chain failure, got {other:?}"),
        }
        assert_eq!(h.chain.payouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_payout_failure_after_confirmed_payment() {
        let mut chain = ScriptedChain::healthy(100_000_000);
        chain.fail_payout = true;
        let h = harness_with(test_config(), chain, vec![StaticProvider::up("apitrx", 1.2)]);
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        assert!(matches!(
            h.coordinator.execute(receipt.commit_id).await,
            Err(Error::Rpc(_))
        ));

        // Payment hash is preserved for reconciliation; no completion tracked.
        let records = LedgerStore::list_by_user(&*h.store, USER_ADDRESS, 10)
            .await
            .unwrap();
        assert_eq!(records[0].status, TxStatus::Failed);
        assert_eq!(records[0].tx_hash.as_deref(), Some("c0ffee"));
        let stats = AbuseStore::user_stats(&*h.store, USER_ADDRESS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.completed_count, 0);
    }

    #[tokio::test]
    async fn test_abandon_records_and_consumes() {
        let h = harness();
        let receipt = h.coordinator.commit(commit_request()).await.unwrap();
        assert!(h.coordinator.abandon(receipt.commit_id).await.unwrap());
        assert!(!h.coordinator.abandon(receipt.commit_id).await.unwrap());

        let stats = AbuseStore::user_stats(&*h.store, USER_ADDRESS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.abandoned_count, 1);
        match h.coordinator.execute(receipt.commit_id).await {
            Err(Error::Rejected(RejectReason::CommitNotFound)) => {}
            other => panic!("expected commit not found, got {other:?}"),
        }
    }
}
