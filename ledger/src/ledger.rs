//! The ledger engine: validation, atomic apply, bridge events, queries.

use std::sync::Arc;

use tracing::{debug, error, info};

use fontana_merkle::{utxo_key, utxo_leaf, MerkleProof, SparseMerkleTree};
use fontana_store::{
    meta, BlockRecord, BlockStore, MetaStore, StoreError, TransactionStore, TxRecord, UtxoRecord,
    UtxoStatus, UtxoStore, VaultDeposit, VaultStore, VaultWithdrawal, WithdrawalStatus,
};
use fontana_store_lmdb::LmdbEnvironment;
use fontana_transactions::{
    validation::validate_structure, BlockHeader, SignedTransaction, TxKind,
};
use fontana_types::{StateRoot, TiaAmount, TxHash, UtxoRef, WalletAddress};

use crate::genesis::{GenesisState, GenesisUtxo};
use crate::LedgerError;

/// An L1 confirmation that a withdrawal payout happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalConfirmation {
    pub burn_txid: TxHash,
    pub l1_tx_hash: String,
}

/// The core ledger engine.
///
/// Owns the Merkle commitment and coordinates every state mutation through
/// a single storage write batch per transaction. Exactly one writer may
/// hold a `Ledger` — concurrency is handled above, by the node's writer
/// mailbox.
pub struct Ledger {
    env: Arc<LmdbEnvironment>,
    tree: SparseMerkleTree,
    historical_roots_kept: usize,
}

impl Ledger {
    /// Open a ledger over an existing environment, rebuilding the Merkle
    /// commitment from the UTXO table.
    ///
    /// When the ledger is at a block boundary (no unconfirmed transactions)
    /// the rebuilt root is checked against the latest persisted header; a
    /// mismatch means storage corruption, which halts loudly rather than
    /// continuing with divergent state.
    pub fn open(
        env: Arc<LmdbEnvironment>,
        historical_roots_kept: usize,
    ) -> Result<Self, LedgerError> {
        let unspent = env.utxo_store().iter_unspent()?;
        let tree = SparseMerkleTree::from_leaves(
            unspent
                .iter()
                .map(|r| (utxo_key(&r.utxo), utxo_leaf(&r.utxo, &r.recipient, r.amount))),
            historical_roots_kept,
        );

        let mut ledger = Self {
            env,
            tree,
            historical_roots_kept,
        };

        if let Some(latest) = ledger.env.block_store().get_latest_block()? {
            let unconfirmed = ledger.env.transaction_store().fetch_unconfirmed()?;
            if unconfirmed.is_empty() {
                let rebuilt = ledger.tree.root();
                if rebuilt != latest.header.state_root {
                    error!(
                        height = latest.header.height,
                        expected = %latest.header.state_root,
                        rebuilt = %rebuilt,
                        "state root mismatch between storage and Merkle rebuild"
                    );
                    return Err(LedgerError::Storage(StoreError::Corruption(format!(
                        "rebuilt state root {rebuilt} does not match block {} root {}",
                        latest.header.height, latest.header.state_root
                    ))));
                }
                // Re-pin the latest sealed root so proofs against it work
                // immediately after a restart.
                ledger.tree.snapshot(latest.header.height);
            }
        }

        Ok(ledger)
    }

    /// The shared storage environment.
    pub fn environment(&self) -> &Arc<LmdbEnvironment> {
        &self.env
    }

    /// Load the genesis state. Single-shot and failure-atomic: refused once
    /// any block exists, and nothing persists if the commit fails.
    pub fn load_genesis(&mut self, genesis: &GenesisState) -> Result<BlockHeader, LedgerError> {
        if self.env.block_store().block_count()? > 0 {
            return Err(LedgerError::GenesisAlreadyLoaded);
        }

        let mut records = Vec::with_capacity(genesis.utxos.len());
        for (i, credit) in genesis.utxos.iter().enumerate() {
            let utxo = genesis.utxo_ref(i as u32);
            records.push(UtxoRecord {
                utxo,
                recipient: credit.recipient.clone(),
                amount: credit.amount,
                status: UtxoStatus::Unspent,
                created_in_block: 0,
                spent_in_block: None,
            });
        }

        let tree = genesis.build_tree(self.historical_roots_kept);
        let header = genesis.header();

        let mut batch = self.env.write_batch()?;
        for record in &records {
            batch.put_utxo(record)?;
        }
        // Recovery receives the genesis header out of band, so the genesis
        // record is born DA-committed and the poster starts at height 1.
        batch.put_block(&BlockRecord {
            header: header.clone(),
            tx_ids: Vec::new(),
            local_committed: true,
            da_committed: true,
            blob_ref: Some("da:0:genesis".to_string()),
        })?;
        batch.put_meta(meta::CHAIN_ID, genesis.chain_id.as_bytes())?;
        batch.put_watermark(meta::LAST_DA_HEIGHT_POSTED, 0)?;
        batch.commit()?;

        self.tree = tree;
        self.tree.snapshot(0);

        info!(
            chain_id = %genesis.chain_id,
            utxos = genesis.utxos.len(),
            state_root = %header.state_root,
            "genesis loaded"
        );
        Ok(header)
    }

    /// The chain id recorded at genesis.
    pub fn chain_id(&self) -> Result<Option<String>, LedgerError> {
        let bytes = self.env.meta_store().get_meta(meta::CHAIN_ID)?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Validate and atomically apply a signed transaction.
    ///
    /// Validation order (fail fast, deterministic):
    /// 1. structural / canonical form
    /// 2. signature (skipped for mints, which the node synthesizes itself)
    /// 3. inputs exist, are unspent, and belong to the sender
    /// 4. conservation
    ///
    /// On any failure a typed error is returned and no state changes. On
    /// success the storage batch commits first; the Merkle mutations are
    /// infallible and applied immediately after, keeping both in lockstep.
    pub fn apply_transaction(&mut self, tx: &SignedTransaction) -> Result<(), LedgerError> {
        validate_structure(tx)?;

        if !tx.kind.is_mint()
            && !fontana_crypto::verify_signature(
                tx.txid.as_bytes(),
                &tx.signature,
                &tx.sender_pubkey,
            )
        {
            return Err(LedgerError::InvalidSignature);
        }

        if self.env.transaction_store().transaction_exists(&tx.txid)? {
            return Err(LedgerError::DuplicateTransaction(tx.txid.to_string()));
        }

        let inputs = self.check_inputs_spendable(tx)?;
        let withdrawn = self.check_conservation(tx, &inputs)?;

        let latest = self
            .env
            .block_store()
            .get_latest_block()?
            .ok_or(LedgerError::GenesisMissing)?;
        let next_height = latest.header.height + 1;

        let mut batch = self.env.write_batch()?;
        for input in &tx.inputs {
            batch.mark_utxo_spent(input, next_height)?;
        }
        for (utxo, output) in tx.output_refs() {
            batch.put_utxo(&UtxoRecord {
                utxo,
                recipient: output.recipient.clone(),
                amount: output.amount,
                status: UtxoStatus::Unspent,
                created_in_block: next_height,
                spent_in_block: None,
            })?;
        }
        batch.put_transaction(&TxRecord {
            tx: tx.clone(),
            block_height: None,
        })?;

        if let TxKind::Burn { l1_recipient } = &tx.kind {
            let amount = withdrawn.expect("burn conservation always yields an amount");
            batch.put_withdrawal(&VaultWithdrawal {
                burn_txid: tx.txid,
                recipient_l1: l1_recipient.clone(),
                amount,
                // The last sealed root: the burned inputs are still live
                // under it, which is what the L1 bridge verifies against.
                state_root_at_burn: latest.header.state_root,
                proof_bundle: None,
                l1_tx_hash: None,
                status: WithdrawalStatus::Pending,
            })?;
        }

        batch.commit()?;

        for input in &tx.inputs {
            self.tree.delete(utxo_key(input));
        }
        for (utxo, output) in tx.output_refs() {
            self.tree
                .put(utxo_key(&utxo), utxo_leaf(&utxo, &output.recipient, output.amount));
        }

        debug!(txid = %tx.txid, kind = ?tx.kind, "transaction applied");
        Ok(())
    }

    /// Fetch every input and check spendability and ownership.
    fn check_inputs_spendable(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Vec<UtxoRecord>, LedgerError> {
        if tx.kind.is_mint() {
            return Ok(Vec::new());
        }

        let sender = tx.sender_address();
        let store = self.env.utxo_store();
        let mut records = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            match store.get_utxo(input)? {
                None => {
                    return Err(LedgerError::InputNotFound {
                        utxo: input.to_string(),
                    })
                }
                Some(record) if record.is_spent() => {
                    return Err(LedgerError::InputAlreadySpent {
                        utxo: input.to_string(),
                    })
                }
                Some(record) => {
                    if record.recipient != sender {
                        return Err(LedgerError::InputNotOwned {
                            utxo: input.to_string(),
                        });
                    }
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Check value conservation. For burns, returns the withdrawable amount
    /// `sum(inputs) − change − fee`.
    fn check_conservation(
        &self,
        tx: &SignedTransaction,
        inputs: &[UtxoRecord],
    ) -> Result<Option<TiaAmount>, LedgerError> {
        let input_sum = TiaAmount::checked_sum(inputs.iter().map(|r| r.amount))
            .ok_or(LedgerError::AmountOverflow)?;
        let output_sum = TiaAmount::checked_sum(tx.outputs.iter().map(|o| o.amount))
            .ok_or(LedgerError::AmountOverflow)?;
        let required = output_sum
            .checked_add(tx.fee)
            .ok_or(LedgerError::AmountOverflow)?;

        match &tx.kind {
            TxKind::Transfer => {
                if input_sum != required {
                    return Err(LedgerError::ConservationViolation {
                        inputs: input_sum.utia(),
                        outputs_plus_fee: required.utia(),
                    });
                }
                Ok(None)
            }
            TxKind::Mint { .. } => Ok(None),
            TxKind::Burn { .. } => {
                if let Some(change) = tx.outputs.first() {
                    if change.recipient != tx.sender_address() {
                        return Err(LedgerError::BurnChangeNotSender);
                    }
                }
                let withdrawn = input_sum
                    .checked_sub(required)
                    .filter(|w| !w.is_zero())
                    .ok_or(LedgerError::InsufficientFunds {
                        inputs: input_sum.utia(),
                        required: required.utia(),
                    })?;
                Ok(Some(withdrawn))
            }
        }
    }

    /// Process a deposit observed in the L1 vault. Idempotent on
    /// `l1_tx_hash`: re-delivery of the same deposit is a no-op.
    pub fn process_deposit_event(&mut self, deposit: &VaultDeposit) -> Result<(), LedgerError> {
        let vault = self.env.vault_store();

        match vault.get_deposit(&deposit.l1_tx_hash)? {
            Some(existing) if existing.processed => {
                debug!(l1_tx_hash = %deposit.l1_tx_hash, "deposit already processed");
                return Ok(());
            }
            Some(_) => {}
            None => vault.insert_deposit(deposit)?,
        }

        let mint = SignedTransaction::mint(
            deposit.l1_tx_hash.clone(),
            deposit.recipient.clone(),
            deposit.amount,
            deposit.timestamp,
        );

        // A crash after the mint committed but before the processed flag was
        // set leaves the flag behind; the deposit-keyed txid closes the gap.
        if self.env.transaction_store().transaction_exists(&mint.txid)? {
            vault.mark_deposit_processed(&deposit.l1_tx_hash)?;
            return Ok(());
        }

        self.apply_transaction(&mint)?;
        vault.mark_deposit_processed(&deposit.l1_tx_hash)?;

        info!(
            l1_tx_hash = %deposit.l1_tx_hash,
            recipient = %deposit.recipient,
            amount = %deposit.amount,
            "deposit minted"
        );
        Ok(())
    }

    /// Mark the withdrawal signalled by `burn_txid` as finalised on L1.
    ///
    /// Does not touch the UTXO set — the burn already spent the inputs.
    /// A confirmation for an unknown burn is a hard error: it means the L1
    /// processor and this node disagree about history.
    pub fn process_withdrawal_event(
        &mut self,
        confirmation: &WithdrawalConfirmation,
    ) -> Result<(), LedgerError> {
        let vault = self.env.vault_store();
        let mut withdrawal = vault
            .get_withdrawal(&confirmation.burn_txid)?
            .ok_or_else(|| LedgerError::UnknownWithdrawal(confirmation.burn_txid.to_string()))?;

        if withdrawal.status == WithdrawalStatus::Finalised {
            debug!(burn_txid = %confirmation.burn_txid, "withdrawal already finalised");
            return Ok(());
        }

        withdrawal.status = WithdrawalStatus::Finalised;
        withdrawal.l1_tx_hash = Some(confirmation.l1_tx_hash.clone());
        vault.upsert_withdrawal(&withdrawal)?;

        info!(
            burn_txid = %confirmation.burn_txid,
            l1_tx_hash = %confirmation.l1_tx_hash,
            "withdrawal finalised"
        );
        Ok(())
    }

    /// Spendable balance of an address.
    pub fn get_balance(&self, address: &WalletAddress) -> Result<TiaAmount, LedgerError> {
        let unspent = self.env.utxo_store().fetch_unspent_by_address(address)?;
        TiaAmount::checked_sum(unspent.into_iter().map(|r| r.amount))
            .ok_or(LedgerError::AmountOverflow)
    }

    /// Applied transactions not yet included in a block (FIFO order).
    pub fn get_unconfirmed_txs(&self) -> Result<Vec<SignedTransaction>, LedgerError> {
        Ok(self.env.transaction_store().fetch_unconfirmed()?)
    }

    /// The current Merkle root over the unspent UTXO set.
    pub fn get_current_state_root(&self) -> StateRoot {
        self.tree.root()
    }

    /// Generate an inclusion/exclusion proof for a UTXO against a retained
    /// historical root.
    pub fn generate_utxo_proof(
        &self,
        utxo: &UtxoRef,
        at_root: &StateRoot,
    ) -> Result<MerkleProof, LedgerError> {
        Ok(self.tree.prove_at(at_root, &utxo_key(utxo))?)
    }

    /// Record the live root as the commitment for a sealed block.
    pub fn snapshot_block(&mut self, height: u64) {
        self.tree.snapshot(height);
    }

    /// Rebuild the root from the UTXO table alone.
    ///
    /// The result must always equal [`Self::get_current_state_root`]; used
    /// by integrity checks and tests.
    pub fn recompute_root_from_store(&self) -> Result<StateRoot, LedgerError> {
        let unspent = self.env.utxo_store().iter_unspent()?;
        let tree = SparseMerkleTree::from_leaves(
            unspent
                .iter()
                .map(|r| (utxo_key(&r.utxo), utxo_leaf(&r.utxo, &r.recipient, r.amount))),
            1,
        );
        Ok(tree.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontana_crypto::{derive_address, keypair_from_seed};
    use fontana_transactions::TxOutput;
    use fontana_types::{KeyPair, PayloadHash, Timestamp};

    struct TestChain {
        _dir: tempfile::TempDir,
        ledger: Ledger,
        genesis: GenesisState,
        alice: KeyPair,
        bob: KeyPair,
    }

    /// Genesis mints 100 utia to Alice.
    fn test_chain() -> TestChain {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = Arc::new(
            LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env"),
        );
        let alice = keypair_from_seed(&[1u8; 32]);
        let bob = keypair_from_seed(&[2u8; 32]);

        let genesis = GenesisState {
            chain_id: "fontana-test".into(),
            timestamp: Timestamp::new(1_700_000_000),
            utxos: vec![GenesisUtxo {
                recipient: derive_address(&alice.public),
                amount: TiaAmount::new(100),
            }],
            description: None,
        };

        let mut ledger = Ledger::open(env, 4).expect("open ledger");
        ledger.load_genesis(&genesis).expect("load genesis");

        TestChain {
            _dir: dir,
            ledger,
            genesis,
            alice,
            bob,
        }
    }

    fn addr(kp: &KeyPair) -> WalletAddress {
        derive_address(&kp.public)
    }

    /// t1: spend the genesis UTXO, 60 to Bob, 39 change to Alice, fee 1.
    fn spend_genesis(chain: &TestChain) -> SignedTransaction {
        SignedTransaction::transfer(
            vec![chain.genesis.utxo_ref(0)],
            vec![
                TxOutput {
                    recipient: addr(&chain.bob),
                    amount: TiaAmount::new(60),
                },
                TxOutput {
                    recipient: addr(&chain.alice),
                    amount: TiaAmount::new(39),
                },
            ],
            TiaAmount::new(1),
            PayloadHash::new([0x11; 32]),
            Timestamp::new(1_700_000_010),
            chain.alice.public.clone(),
            &chain.alice.private,
        )
    }

    #[test]
    fn fresh_wallet_transfer() {
        let mut chain = test_chain();
        let genesis_root = chain.ledger.get_current_state_root();

        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply t1");

        assert_eq!(
            chain.ledger.get_balance(&addr(&chain.alice)).unwrap(),
            TiaAmount::new(39)
        );
        assert_eq!(
            chain.ledger.get_balance(&addr(&chain.bob)).unwrap(),
            TiaAmount::new(60)
        );

        let store = chain.ledger.environment().utxo_store();
        let g1 = store
            .get_utxo(&chain.genesis.utxo_ref(0))
            .unwrap()
            .unwrap();
        assert!(g1.is_spent());
        assert!(store
            .fetch_unspent(&UtxoRef::new(t1.txid, 0))
            .unwrap()
            .is_some());
        assert!(store
            .fetch_unspent(&UtxoRef::new(t1.txid, 1))
            .unwrap()
            .is_some());

        assert_ne!(chain.ledger.get_current_state_root(), genesis_root);
    }

    #[test]
    fn double_spend_rejected() {
        let mut chain = test_chain();
        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply t1");
        let root_after_t1 = chain.ledger.get_current_state_root();

        // A different transaction reusing the spent genesis input.
        let t1_prime = SignedTransaction::transfer(
            vec![chain.genesis.utxo_ref(0)],
            vec![TxOutput {
                recipient: addr(&chain.bob),
                amount: TiaAmount::new(100),
            }],
            TiaAmount::ZERO,
            PayloadHash::ZERO,
            Timestamp::new(1_700_000_020),
            chain.alice.public.clone(),
            &chain.alice.private,
        );

        let result = chain.ledger.apply_transaction(&t1_prime);
        assert!(matches!(
            result,
            Err(LedgerError::InputAlreadySpent { .. })
        ));
        assert_eq!(chain.ledger.get_current_state_root(), root_after_t1);
    }

    #[test]
    fn conservation_violation_rejected() {
        let mut chain = test_chain();
        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply t1");

        // Alice holds {t1:1 → 39}; try to pay 40 with fee 0.
        let carol = keypair_from_seed(&[3u8; 32]);
        let bad = SignedTransaction::transfer(
            vec![UtxoRef::new(t1.txid, 1)],
            vec![TxOutput {
                recipient: addr(&carol),
                amount: TiaAmount::new(40),
            }],
            TiaAmount::ZERO,
            PayloadHash::ZERO,
            Timestamp::new(1_700_000_030),
            chain.alice.public.clone(),
            &chain.alice.private,
        );

        let result = chain.ledger.apply_transaction(&bad);
        assert!(matches!(
            result,
            Err(LedgerError::ConservationViolation { .. })
        ));
    }

    #[test]
    fn bad_signature_rejected() {
        let mut chain = test_chain();
        let mut t1 = spend_genesis(&chain);
        t1.signature = fontana_types::Signature([7u8; 64]);

        let result = chain.ledger.apply_transaction(&t1);
        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
        assert_eq!(
            chain.ledger.get_balance(&addr(&chain.alice)).unwrap(),
            TiaAmount::new(100)
        );
    }

    #[test]
    fn unknown_input_rejected() {
        let mut chain = test_chain();
        let tx = SignedTransaction::transfer(
            vec![UtxoRef::new(TxHash::new([0xEE; 32]), 0)],
            vec![TxOutput {
                recipient: addr(&chain.bob),
                amount: TiaAmount::new(1),
            }],
            TiaAmount::ZERO,
            PayloadHash::ZERO,
            Timestamp::new(1_700_000_040),
            chain.alice.public.clone(),
            &chain.alice.private,
        );
        let result = chain.ledger.apply_transaction(&tx);
        assert!(matches!(result, Err(LedgerError::InputNotFound { .. })));
    }

    #[test]
    fn spending_someone_elses_utxo_rejected() {
        let mut chain = test_chain();
        // Bob signs a spend of the genesis UTXO that belongs to Alice.
        let theft = SignedTransaction::transfer(
            vec![chain.genesis.utxo_ref(0)],
            vec![TxOutput {
                recipient: addr(&chain.bob),
                amount: TiaAmount::new(100),
            }],
            TiaAmount::ZERO,
            PayloadHash::ZERO,
            Timestamp::new(1_700_000_050),
            chain.bob.public.clone(),
            &chain.bob.private,
        );
        let result = chain.ledger.apply_transaction(&theft);
        assert!(matches!(result, Err(LedgerError::InputNotOwned { .. })));
    }

    #[test]
    fn deposit_is_idempotent() {
        let mut chain = test_chain();
        let deposit = VaultDeposit {
            l1_tx_hash: "0xDEAD".into(),
            recipient: addr(&chain.alice),
            amount: TiaAmount::new(50),
            l1_height: 7,
            timestamp: Timestamp::new(1_700_000_060),
            processed: false,
        };

        chain.ledger.process_deposit_event(&deposit).expect("first");
        chain
            .ledger
            .process_deposit_event(&deposit)
            .expect("second delivery is a no-op");

        assert_eq!(
            chain.ledger.get_balance(&addr(&chain.alice)).unwrap(),
            TiaAmount::new(150)
        );
        // Exactly one mint UTXO exists for the deposit.
        let mint_txid = SignedTransaction::mint(
            "0xDEAD".into(),
            addr(&chain.alice),
            TiaAmount::new(50),
            deposit.timestamp,
        )
        .txid;
        let store = chain.ledger.environment().utxo_store();
        assert!(store
            .fetch_unspent(&UtxoRef::new(mint_txid, 0))
            .unwrap()
            .is_some());
    }

    #[test]
    fn burn_records_withdrawal_and_finalises() {
        let mut chain = test_chain();
        let pre_burn_root = chain.ledger.get_current_state_root();

        // Burn the genesis UTXO: 10 change back to Alice, fee 1, 89 withdrawn.
        let burn = SignedTransaction::burn(
            vec![chain.genesis.utxo_ref(0)],
            Some(TxOutput {
                recipient: addr(&chain.alice),
                amount: TiaAmount::new(10),
            }),
            TiaAmount::new(1),
            "celestia1vault".into(),
            Timestamp::new(1_700_000_070),
            chain.alice.public.clone(),
            &chain.alice.private,
        );
        chain.ledger.apply_transaction(&burn).expect("apply burn");

        let vault = chain.ledger.environment().vault_store();
        let withdrawal = vault.get_withdrawal(&burn.txid).unwrap().unwrap();
        assert_eq!(withdrawal.amount, TiaAmount::new(89));
        assert_eq!(withdrawal.recipient_l1, "celestia1vault");
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.state_root_at_burn, pre_burn_root);

        chain
            .ledger
            .process_withdrawal_event(&WithdrawalConfirmation {
                burn_txid: burn.txid,
                l1_tx_hash: "0xFINAL".into(),
            })
            .expect("finalise");

        let withdrawal = vault.get_withdrawal(&burn.txid).unwrap().unwrap();
        assert_eq!(withdrawal.status, WithdrawalStatus::Finalised);
        assert_eq!(withdrawal.l1_tx_hash.as_deref(), Some("0xFINAL"));
        // The burn spent the inputs; finalisation must not mint anything.
        assert_eq!(
            chain.ledger.get_balance(&addr(&chain.alice)).unwrap(),
            TiaAmount::new(10)
        );
    }

    #[test]
    fn burn_spending_more_than_inputs_rejected() {
        let mut chain = test_chain();
        let burn = SignedTransaction::burn(
            vec![chain.genesis.utxo_ref(0)],
            Some(TxOutput {
                recipient: addr(&chain.alice),
                amount: TiaAmount::new(100),
            }),
            TiaAmount::new(1),
            "celestia1vault".into(),
            Timestamp::new(1_700_000_080),
            chain.alice.public.clone(),
            &chain.alice.private,
        );
        let result = chain.ledger.apply_transaction(&burn);
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    }

    #[test]
    fn burn_change_to_stranger_rejected() {
        let mut chain = test_chain();
        let burn = SignedTransaction::burn(
            vec![chain.genesis.utxo_ref(0)],
            Some(TxOutput {
                recipient: addr(&chain.bob),
                amount: TiaAmount::new(10),
            }),
            TiaAmount::new(1),
            "celestia1vault".into(),
            Timestamp::new(1_700_000_090),
            chain.alice.public.clone(),
            &chain.alice.private,
        );
        let result = chain.ledger.apply_transaction(&burn);
        assert!(matches!(result, Err(LedgerError::BurnChangeNotSender)));
    }

    #[test]
    fn withdrawal_confirmation_for_unknown_burn_is_error() {
        let mut chain = test_chain();
        let result = chain
            .ledger
            .process_withdrawal_event(&WithdrawalConfirmation {
                burn_txid: TxHash::new([0xAB; 32]),
                l1_tx_hash: "0x1".into(),
            });
        assert!(matches!(result, Err(LedgerError::UnknownWithdrawal(_))));
    }

    #[test]
    fn state_root_matches_store_recomputation() {
        let mut chain = test_chain();
        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply");

        assert_eq!(
            chain.ledger.get_current_state_root(),
            chain.ledger.recompute_root_from_store().unwrap()
        );
    }

    #[test]
    fn unconfirmed_txs_drain_in_order() {
        let mut chain = test_chain();
        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply");

        let pending = chain.ledger.get_unconfirmed_txs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].txid, t1.txid);
    }

    #[test]
    fn historical_proof_against_genesis_root() {
        let mut chain = test_chain();
        let genesis_root = chain.ledger.get_current_state_root();
        let g1 = chain.genesis.utxo_ref(0);

        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply");

        // g1 was live under the genesis root even though it is spent now.
        let proof = chain
            .ledger
            .generate_utxo_proof(&g1, &genesis_root)
            .expect("proof");
        assert!(proof.is_inclusion());
        assert!(proof.verify(&genesis_root));

        // Unretained root is refused.
        let bogus = StateRoot::new([0x42; 32]);
        assert!(chain.ledger.generate_utxo_proof(&g1, &bogus).is_err());
    }

    #[test]
    fn genesis_is_single_shot() {
        let mut chain = test_chain();
        let genesis = chain.genesis.clone();
        let result = chain.ledger.load_genesis(&genesis);
        assert!(matches!(result, Err(LedgerError::GenesisAlreadyLoaded)));
    }

    #[test]
    fn reopen_rebuilds_same_root() {
        let chain = test_chain();
        let root = chain.ledger.get_current_state_root();
        let env = Arc::clone(chain.ledger.environment());
        drop(chain.ledger);

        let reopened = Ledger::open(env, 4).expect("reopen");
        assert_eq!(reopened.get_current_state_root(), root);
    }

    #[test]
    fn duplicate_transaction_rejected() {
        let mut chain = test_chain();
        let t1 = spend_genesis(&chain);
        chain.ledger.apply_transaction(&t1).expect("apply");
        let result = chain.ledger.apply_transaction(&t1);
        assert!(matches!(
            result,
            Err(LedgerError::DuplicateTransaction(_))
        ));
    }
}
