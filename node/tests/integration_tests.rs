//! End-to-end tests: the full pipeline from transaction ingress through
//! block production and DA posting, and recovery of a second node from the
//! DA contents alone.

use std::sync::Arc;
use std::time::Duration;

use fontana_crypto::{derive_address, keypair_from_seed};
use fontana_da::{encode_block, DaClient, DaPoster, MockDaClient, Namespace, PosterConfig};
use fontana_ledger::{GenesisState, GenesisUtxo, Ledger};
use fontana_node::{recover_from_da, FontanaNode, NodeConfig, RecoveryError};
use fontana_sequencer::Sequencer;
use fontana_store::{BlockStore, UtxoRecord, UtxoStore, VaultDeposit};
use fontana_store_lmdb::LmdbEnvironment;
use fontana_transactions::{tx_merkle_root, Block, BlockHeader, SignedTransaction, TxOutput};
use fontana_types::{KeyPair, PayloadHash, StateRoot, TiaAmount, Timestamp, UtxoRef};

fn namespace() -> Namespace {
    Namespace::from_hex("666f6e74616e6131").unwrap()
}

fn poster_config() -> PosterConfig {
    PosterConfig {
        namespace: namespace(),
        poll_interval: Duration::from_millis(10),
        initial_backoff: Duration::from_millis(1),
        max_retries: 3,
    }
}

struct Keys {
    alice: KeyPair,
    bob: KeyPair,
}

fn keys() -> Keys {
    Keys {
        alice: keypair_from_seed(&[1u8; 32]),
        bob: keypair_from_seed(&[2u8; 32]),
    }
}

fn genesis(keys: &Keys) -> GenesisState {
    GenesisState {
        chain_id: "fontana-test".into(),
        timestamp: Timestamp::new(1_700_000_000),
        utxos: vec![GenesisUtxo {
            recipient: derive_address(&keys.alice.public),
            amount: TiaAmount::new(100),
        }],
        description: None,
    }
}

fn open_chain(dir: &tempfile::TempDir, genesis: &GenesisState) -> (Arc<LmdbEnvironment>, Ledger) {
    let env = Arc::new(LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env"));
    let mut ledger = Ledger::open(Arc::clone(&env), 16).expect("open ledger");
    ledger.load_genesis(genesis).expect("genesis");
    (env, ledger)
}

fn sorted_unspent(env: &LmdbEnvironment) -> Vec<UtxoRecord> {
    let mut unspent = env.utxo_store().iter_unspent().expect("iter");
    unspent.sort_by_key(|r| r.utxo.key_bytes());
    unspent
}

/// Drive a source node through a mixed history: transfers, empty blocks, a
/// bridge deposit, and a withdrawal burn.
fn build_history(ledger: &mut Ledger, genesis: &GenesisState, keys: &Keys) {
    // Height 1: Alice pays Bob.
    let t1 = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![
            TxOutput {
                recipient: derive_address(&keys.bob.public),
                amount: TiaAmount::new(60),
            },
            TxOutput {
                recipient: derive_address(&keys.alice.public),
                amount: TiaAmount::new(39),
            },
        ],
        TiaAmount::new(1),
        PayloadHash::new([0x11; 32]),
        Timestamp::new(1_700_000_001),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    ledger.apply_transaction(&t1).expect("t1");
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_006)).expect("h1");

    // Height 2: empty cadence block.
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_012)).expect("h2");

    // Height 3: an L1 deposit mints to Bob.
    ledger
        .process_deposit_event(&VaultDeposit {
            l1_tx_hash: "0xDEAD".into(),
            recipient: derive_address(&keys.bob.public),
            amount: TiaAmount::new(50),
            l1_height: 42,
            timestamp: Timestamp::new(1_700_000_013),
            processed: false,
        })
        .expect("deposit");
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_018)).expect("h3");

    // Height 4: Bob burns his transfer output to withdraw.
    let burn = SignedTransaction::burn(
        vec![UtxoRef::new(t1.txid, 0)],
        None,
        TiaAmount::new(1),
        "celestia1recipient".into(),
        Timestamp::new(1_700_000_019),
        keys.bob.public.clone(),
        &keys.bob.private,
    );
    ledger.apply_transaction(&burn).expect("burn");
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_024)).expect("h4");

    // Heights 5–6: more empty cadence.
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_030)).expect("h5");
    Sequencer::build_block(ledger, Timestamp::new(1_700_000_036)).expect("h6");
}

#[tokio::test]
async fn recovery_reproduces_source_chain() {
    let keys = keys();
    let genesis = genesis(&keys);

    // Source node N1.
    let dir1 = tempfile::tempdir().expect("dir1");
    let (env1, mut ledger1) = open_chain(&dir1, &genesis);
    build_history(&mut ledger1, &genesis, &keys);

    let client = Arc::new(MockDaClient::new());
    let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env1), poster_config());
    let posted = poster.post_pending().await.expect("post");
    assert_eq!(posted, 6);

    let trusted_genesis = env1
        .block_store()
        .get_block_header(0)
        .unwrap()
        .expect("genesis header");

    // Fresh node N2, fed only the DA contents.
    let dir2 = tempfile::tempdir().expect("dir2");
    let env2 = Arc::new(LmdbEnvironment::open(dir2.path(), 10 * 1024 * 1024).expect("env2"));
    let report = recover_from_da(
        client.as_ref(),
        Arc::clone(&env2),
        &genesis,
        &trusted_genesis,
        namespace(),
        16,
    )
    .await
    .expect("recovery");

    assert_eq!(report.blocks_replayed, 6);
    assert_eq!(report.final_height, 6);

    // Every header (and so every state root) matches the source chain.
    for height in 0..=6u64 {
        let h1 = env1.block_store().get_block_header(height).unwrap().unwrap();
        let h2 = env2.block_store().get_block_header(height).unwrap().unwrap();
        assert_eq!(h1, h2, "header mismatch at height {height}");
    }

    // And the UTXO sets are identical.
    assert_eq!(sorted_unspent(&env1), sorted_unspent(&env2));

    // Value accounting across the whole history: 100 genesis + 50 minted
    // − 59 withdrawn − 2 in fees (fees are destroyed, not redistributed).
    let total: u64 = sorted_unspent(&env1)
        .iter()
        .map(|r| r.amount.utia())
        .sum();
    assert_eq!(total, 89);

    // Recovery is idempotent: a third node over the same DA agrees.
    let dir3 = tempfile::tempdir().expect("dir3");
    let env3 = Arc::new(LmdbEnvironment::open(dir3.path(), 10 * 1024 * 1024).expect("env3"));
    let report3 = recover_from_da(
        client.as_ref(),
        Arc::clone(&env3),
        &genesis,
        &trusted_genesis,
        namespace(),
        16,
    )
    .await
    .expect("recovery 3");
    assert_eq!(report3.final_root, report.final_root);
}

#[tokio::test]
async fn recovery_halts_on_forged_state_root() {
    let keys = keys();
    let genesis = genesis(&keys);

    let dir1 = tempfile::tempdir().expect("dir1");
    let (env1, mut ledger1) = open_chain(&dir1, &genesis);
    Sequencer::build_block(&mut ledger1, Timestamp::new(1_700_000_006)).expect("h1");

    let client = Arc::new(MockDaClient::new());
    let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env1), poster_config());
    poster.post_pending().await.expect("post");

    // Forge an empty block at height 2 that chains correctly but claims a
    // state root the replay cannot reproduce.
    let h1 = env1.block_store().get_block_header(1).unwrap().unwrap();
    let forged = Block {
        header: BlockHeader {
            height: 2,
            prev_hash: h1.hash(),
            state_root: StateRoot::new([0x99; 32]),
            tx_merkle_root: tx_merkle_root(&[]),
            timestamp: Timestamp::new(1_700_000_012),
            tx_count: 0,
        },
        transactions: vec![],
    };
    client
        .submit_blob(namespace().for_height(2), encode_block(&forged))
        .await
        .expect("submit forged");

    let trusted_genesis = env1.block_store().get_block_header(0).unwrap().unwrap();
    let dir2 = tempfile::tempdir().expect("dir2");
    let env2 = Arc::new(LmdbEnvironment::open(dir2.path(), 10 * 1024 * 1024).expect("env2"));
    let result = recover_from_da(
        client.as_ref(),
        env2,
        &genesis,
        &trusted_genesis,
        namespace(),
        16,
    )
    .await;

    assert!(matches!(
        result,
        Err(RecoveryError::StateRootMismatch { height: 2, .. })
    ));
}

#[tokio::test]
async fn recovery_halts_on_invalid_transaction() {
    let keys = keys();
    let genesis = genesis(&keys);

    let dir1 = tempfile::tempdir().expect("dir1");
    let (env1, mut ledger1) = open_chain(&dir1, &genesis);

    // Height 1 spends the genesis UTXO.
    let t1 = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![TxOutput {
            recipient: derive_address(&keys.bob.public),
            amount: TiaAmount::new(100),
        }],
        TiaAmount::ZERO,
        PayloadHash::ZERO,
        Timestamp::new(1_700_000_001),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    ledger1.apply_transaction(&t1).expect("t1");
    Sequencer::build_block(&mut ledger1, Timestamp::new(1_700_000_006)).expect("h1");

    let client = Arc::new(MockDaClient::new());
    let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env1), poster_config());
    poster.post_pending().await.expect("post");

    // Forge a height-2 block double-spending the genesis UTXO.
    let double_spend = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![TxOutput {
            recipient: derive_address(&keys.alice.public),
            amount: TiaAmount::new(100),
        }],
        TiaAmount::ZERO,
        PayloadHash::ZERO,
        Timestamp::new(1_700_000_007),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    let h1 = env1.block_store().get_block_header(1).unwrap().unwrap();
    let forged = Block {
        header: BlockHeader {
            height: 2,
            prev_hash: h1.hash(),
            state_root: h1.state_root,
            tx_merkle_root: tx_merkle_root(&[double_spend.txid]),
            timestamp: Timestamp::new(1_700_000_012),
            tx_count: 1,
        },
        transactions: vec![double_spend],
    };
    client
        .submit_blob(namespace().for_height(2), encode_block(&forged))
        .await
        .expect("submit forged");

    let trusted_genesis = env1.block_store().get_block_header(0).unwrap().unwrap();
    let dir2 = tempfile::tempdir().expect("dir2");
    let env2 = Arc::new(LmdbEnvironment::open(dir2.path(), 10 * 1024 * 1024).expect("env2"));
    let result = recover_from_da(
        client.as_ref(),
        env2,
        &genesis,
        &trusted_genesis,
        namespace(),
        16,
    )
    .await;

    assert!(matches!(
        result,
        Err(RecoveryError::Divergence { height: 2, .. })
    ));
}

fn write_genesis_file(dir: &tempfile::TempDir, genesis: &GenesisState) -> std::path::PathBuf {
    let path = dir.path().join("genesis.json");
    std::fs::write(&path, serde_json::to_string_pretty(genesis).unwrap()).unwrap();
    path
}

fn node_config(dir: &tempfile::TempDir, genesis_file: std::path::PathBuf) -> NodeConfig {
    NodeConfig {
        db_path: dir.path().join("db"),
        genesis_file: Some(genesis_file),
        block_interval_seconds: 1,
        ..NodeConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn node_pipeline_end_to_end() {
    let keys = keys();
    let genesis = genesis(&keys);
    let dir = tempfile::tempdir().expect("dir");
    let genesis_file = write_genesis_file(&dir, &genesis);

    let client = Arc::new(MockDaClient::new());
    let node = FontanaNode::start(&node_config(&dir, genesis_file), Arc::clone(&client))
        .expect("start node");
    let handle = node.handle();

    let genesis_root = handle.get_state_root().await.expect("root");

    let t1 = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![
            TxOutput {
                recipient: derive_address(&keys.bob.public),
                amount: TiaAmount::new(60),
            },
            TxOutput {
                recipient: derive_address(&keys.alice.public),
                amount: TiaAmount::new(39),
            },
        ],
        TiaAmount::new(1),
        PayloadHash::new([0x11; 32]),
        Timestamp::new(1_700_000_001),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    let receipt = handle.submit_transaction(t1.clone()).await.expect("accept");
    assert_eq!(receipt.txid, t1.txid);
    assert_eq!(receipt.block_height, 1);

    // Rejections surface as typed errors without state change.
    let err = handle.submit_transaction(t1.clone()).await.unwrap_err();
    assert!(matches!(err, fontana_node::NodeError::Ledger(_)));

    // After one cadence interval the block is sealed.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let header = handle
        .get_latest_header()
        .await
        .expect("query")
        .expect("sealed");
    assert!(header.height >= 1);
    assert_ne!(header.state_root, genesis_root);

    let bob_balance = handle
        .get_balance(derive_address(&keys.bob.public))
        .await
        .expect("balance");
    assert_eq!(bob_balance, TiaAmount::new(60));

    // The poster ships it to the DA layer shortly after.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let record = handle.get_block(1).await.expect("query").expect("block 1");
    assert!(record.da_committed);
    assert!(record.blob_ref.is_some());

    node.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn shutdown_seals_pending_transactions() {
    let keys = keys();
    let genesis = genesis(&keys);
    let dir = tempfile::tempdir().expect("dir");
    let genesis_file = write_genesis_file(&dir, &genesis);

    let mut config = node_config(&dir, genesis_file);
    config.block_interval_seconds = 3_600; // no tick fires during the test
    let db_path = config.db_path.clone();

    let client = Arc::new(MockDaClient::new());
    let node = FontanaNode::start(&config, client).expect("start node");
    let handle = node.handle();

    let t1 = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![TxOutput {
            recipient: derive_address(&keys.bob.public),
            amount: TiaAmount::new(100),
        }],
        TiaAmount::ZERO,
        PayloadHash::ZERO,
        Timestamp::new(1_700_000_001),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    handle.submit_transaction(t1.clone()).await.expect("accept");

    // Shutdown drains the mailbox and seals the in-flight block.
    node.stop().await.expect("stop");

    let env = LmdbEnvironment::open(&db_path, 10 * 1024 * 1024).expect("reopen");
    let block = env.block_store().get_block(1).unwrap().expect("final block");
    assert_eq!(block.tx_ids, vec![t1.txid]);
}

#[tokio::test(start_paused = true)]
async fn max_batch_triggers_immediate_block() {
    let keys = keys();
    let genesis = genesis(&keys);
    let dir = tempfile::tempdir().expect("dir");
    let genesis_file = write_genesis_file(&dir, &genesis);

    let mut config = node_config(&dir, genesis_file);
    config.block_interval_seconds = 3_600;
    config.max_batch = Some(1);

    let client = Arc::new(MockDaClient::new());
    let node = FontanaNode::start(&config, client).expect("start node");
    let handle = node.handle();

    let t1 = SignedTransaction::transfer(
        vec![genesis.utxo_ref(0)],
        vec![TxOutput {
            recipient: derive_address(&keys.bob.public),
            amount: TiaAmount::new(100),
        }],
        TiaAmount::ZERO,
        PayloadHash::ZERO,
        Timestamp::new(1_700_000_001),
        keys.alice.public.clone(),
        &keys.alice.private,
    );
    handle.submit_transaction(t1.clone()).await.expect("accept");

    // No cadence tick fired, yet the size trigger sealed the block.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let header = handle
        .get_latest_header()
        .await
        .expect("query")
        .expect("header");
    assert_eq!(header.height, 1);
    assert_eq!(header.tx_count, 1);

    node.stop().await.expect("stop");
}
