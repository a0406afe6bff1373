//! The core writer: one task owns the ledger and block production.
//!
//! Ingress handlers (RPC, bridge watcher) never touch the ledger directly —
//! they send messages through a bounded mailbox, which reifies ordering and
//! provides backpressure. The sequencer cadence runs inside the same task,
//! so block heights increase monotonically and every block's state root is
//! the root observed right after its transactions applied.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use fontana_bridge::{handle_deposit_received, handle_withdrawal_confirmed, BridgeError};
use fontana_ledger::{Ledger, LedgerError, WithdrawalConfirmation};
use fontana_sequencer::Sequencer;
use fontana_store::{BlockRecord, BlockStore, StoreError, VaultDeposit};
use fontana_transactions::{BlockHeader, SignedTransaction};
use fontana_types::{StateRoot, TiaAmount, Timestamp, WalletAddress};

use crate::{NodeError, ProvisionalReceipt};

/// Work items flowing through the writer mailbox.
pub enum WriterMessage {
    ApplyTransaction {
        tx: Box<SignedTransaction>,
        reply: oneshot::Sender<Result<ProvisionalReceipt, LedgerError>>,
    },
    DepositReceived {
        deposit: Box<VaultDeposit>,
        reply: oneshot::Sender<Result<(), BridgeError>>,
    },
    WithdrawalConfirmed {
        confirmation: WithdrawalConfirmation,
        reply: oneshot::Sender<Result<(), BridgeError>>,
    },
    GetBalance {
        address: WalletAddress,
        reply: oneshot::Sender<Result<TiaAmount, LedgerError>>,
    },
    GetStateRoot {
        reply: oneshot::Sender<StateRoot>,
    },
    GetBlock {
        height: u64,
        reply: oneshot::Sender<Result<Option<BlockRecord>, StoreError>>,
    },
    GetLatestHeader {
        reply: oneshot::Sender<Result<Option<BlockHeader>, StoreError>>,
    },
}

/// Cheap cloneable handle for talking to the writer.
#[derive(Clone)]
pub struct NodeHandle {
    tx: mpsc::Sender<WriterMessage>,
}

impl NodeHandle {
    /// Submit a signed transaction; resolves once it is applied (or
    /// rejected) with a provisional receipt.
    pub async fn submit_transaction(
        &self,
        tx: SignedTransaction,
    ) -> Result<ProvisionalReceipt, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::ApplyTransaction {
                tx: Box::new(tx),
                reply,
            })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }

    /// Forward a vault deposit event.
    pub async fn deposit_received(&self, deposit: VaultDeposit) -> Result<(), NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::DepositReceived {
                deposit: Box::new(deposit),
                reply,
            })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }

    /// Forward an L1 withdrawal confirmation.
    pub async fn withdrawal_confirmed(
        &self,
        confirmation: WithdrawalConfirmation,
    ) -> Result<(), NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::WithdrawalConfirmed {
                confirmation,
                reply,
            })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }

    /// Spendable balance of an address.
    pub async fn get_balance(&self, address: WalletAddress) -> Result<TiaAmount, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::GetBalance { address, reply })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }

    /// The current state root.
    pub async fn get_state_root(&self) -> Result<StateRoot, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::GetStateRoot { reply })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)
    }

    /// A block record by height.
    pub async fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::GetBlock { height, reply })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }

    /// The latest locally committed header.
    pub async fn get_latest_header(&self) -> Result<Option<BlockHeader>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::GetLatestHeader { reply })
            .await
            .map_err(|_| NodeError::WriterGone)?;
        rx.await.map_err(|_| NodeError::WriterGone)?.map_err(Into::into)
    }
}

/// The single-writer event loop.
pub struct CoreWriter {
    ledger: Ledger,
    rx: mpsc::Receiver<WriterMessage>,
    block_interval: Duration,
    max_batch: Option<usize>,
    /// Height the next sealed block will get; receipts cite it.
    next_height: u64,
    /// Transactions applied since the last seal (mints included).
    pending_count: usize,
}

impl CoreWriter {
    /// Build the writer and its handle. The ledger must already have a
    /// genesis block.
    pub fn new(
        ledger: Ledger,
        block_interval: Duration,
        max_batch: Option<usize>,
        mailbox_capacity: usize,
    ) -> Result<(Self, NodeHandle), NodeError> {
        let latest = ledger
            .environment()
            .block_store()
            .get_latest_block()?
            .ok_or(LedgerError::GenesisMissing)
            .map_err(NodeError::Ledger)?;

        let pending_count = ledger.get_unconfirmed_txs()?.len();
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let writer = Self {
            ledger,
            rx,
            block_interval,
            max_batch,
            next_height: latest.header.height + 1,
            pending_count,
        };
        Ok((writer, NodeHandle { tx }))
    }

    /// Run until shutdown. On shutdown the mailbox is drained, a final
    /// block is sealed if work is pending, and the loop exits.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.block_interval.as_secs_f64(),
            max_batch = ?self.max_batch,
            "core writer started"
        );

        let start = tokio::time::Instant::now() + self.block_interval;
        let mut ticker = tokio::time::interval_at(start, self.block_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    while let Ok(msg) = self.rx.try_recv() {
                        self.handle_message(msg);
                    }
                    if self.pending_count > 0 {
                        self.seal_block();
                    }
                    info!("core writer shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.seal_block();
                }
                msg = self.rx.recv() => match msg {
                    Some(msg) => {
                        self.handle_message(msg);
                        if let Some(max) = self.max_batch {
                            if self.pending_count >= max {
                                self.seal_block();
                                ticker.reset();
                            }
                        }
                    }
                    None => {
                        if self.pending_count > 0 {
                            self.seal_block();
                        }
                        info!("all handles dropped, core writer exiting");
                        return;
                    }
                },
            }
        }
    }

    fn handle_message(&mut self, msg: WriterMessage) {
        match msg {
            WriterMessage::ApplyTransaction { tx, reply } => {
                let result = self.apply_and_receipt(&tx);
                let _ = reply.send(result);
            }
            WriterMessage::DepositReceived { deposit, reply } => {
                let result = handle_deposit_received(&deposit, &mut self.ledger);
                if result.is_ok() {
                    // A replayed deposit applies no new mint, so recount
                    // rather than increment.
                    self.pending_count = self.unconfirmed_count();
                }
                let _ = reply.send(result);
            }
            WriterMessage::WithdrawalConfirmed { confirmation, reply } => {
                let result = handle_withdrawal_confirmed(&confirmation, &mut self.ledger);
                let _ = reply.send(result);
            }
            WriterMessage::GetBalance { address, reply } => {
                let _ = reply.send(self.ledger.get_balance(&address));
            }
            WriterMessage::GetStateRoot { reply } => {
                let _ = reply.send(self.ledger.get_current_state_root());
            }
            WriterMessage::GetBlock { height, reply } => {
                let _ = reply.send(self.ledger.environment().block_store().get_block(height));
            }
            WriterMessage::GetLatestHeader { reply } => {
                let result = self
                    .ledger
                    .environment()
                    .block_store()
                    .get_latest_block()
                    .map(|r| r.map(|record| record.header));
                let _ = reply.send(result);
            }
        }
    }

    fn apply_and_receipt(
        &mut self,
        tx: &SignedTransaction,
    ) -> Result<ProvisionalReceipt, LedgerError> {
        self.ledger.apply_transaction(tx)?;
        self.pending_count += 1;
        Ok(ProvisionalReceipt {
            txid: tx.txid,
            payload_hash: tx.payload_hash,
            block_height: self.next_height,
            accepted_at: Timestamp::now(),
        })
    }

    fn unconfirmed_count(&self) -> usize {
        self.ledger
            .get_unconfirmed_txs()
            .map(|txs| txs.len())
            .unwrap_or(0)
    }

    fn seal_block(&mut self) {
        match Sequencer::build_block(&mut self.ledger, Timestamp::now()) {
            Ok(block) => {
                self.next_height = block.header.height + 1;
                self.pending_count = 0;
            }
            Err(e) => {
                // The ledger itself is untouched by a failed seal; pending
                // transactions stay queued for the next tick.
                error!(error = %e, "failed to seal block");
                warn!(pending = self.pending_count, "will retry at next tick");
            }
        }
    }
}
