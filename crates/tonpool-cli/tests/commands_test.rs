// Command flows driven through the session with a recording node client

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use tonpool_cli::api::{
    Action, Bip39Hints, ConfigInfo, ExportedKey, ExportedUnencryptedKey, FullAccountState, InputKey, Key, MethodId,
    MsgData, QueryInfo, Request, Response, SecureBytes, SmcInfo, SmcRunResult, StackEntry, TransactionId,
    TvmCell, TvmNumber, UnpackedAccountAddress,
};
use tonpool_cli::keys::{KeyDbFile, KeyRegistry};
use tonpool_contracts::{boc, PublicKey, Role, WalletV3};

use common::{deriver, record, signing_record, Harness};

fn public_key(id: &str) -> PublicKey {
    PublicKey::parse(id).unwrap()
}

fn wallet_address(id: &str) -> String {
    deriver().derive(&public_key(id), Role::Wallet, None).unwrap().serialized_address
}

fn query_info(id: i64) -> Response {
    Response::QueryInfo(QueryInfo {
        id,
        valid_until: 0,
        body_hash: vec![0; 32],
    })
}

//-----------------------------------------------------------------------------
// Keys
//-----------------------------------------------------------------------------

#[test]
fn test_genkey_collects_entropy_and_persists_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::with_store(Box::new(KeyDbFile::new(dir.path())));

    assert_eq!(h.line("genkey"), "Enter some entropy\n");
    assert_eq!(h.line("short"), "Enter some entropy\n");
    assert_eq!(h.line("a much longer line of entropy"), "Enter password (could be empty)\n");
    assert_eq!(h.line("secret"), "");

    let (id, request) = h.client.last();
    match request {
        Request::CreateNewKey {
            local_password,
            random_extra_seed,
            ..
        } => {
            assert_eq!(local_password.as_bytes(), b"secret");
            assert_eq!(random_extra_seed.len(), 5 + 29 + 32);
        }
        other => panic!("unexpected request {:?}", other),
    }

    let new_key = record(5);
    h.session.on_reply(
        id,
        Response::Key(Key {
            public_key: new_key.public_key.clone(),
            secret: new_key.secret.clone(),
        }),
    );
    assert_eq!(h.session.keys().len(), 1);
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::ExportKey { .. }));

    h.session.on_reply(
        id,
        Response::ExportedKey(ExportedKey {
            word_list: vec![SecureBytes::from_text("abandon"), SecureBytes::from_text("zoo")],
        }),
    );
    let expected = format!(
        "  #0: Public key: {}     Address: {}\n    abandon\n    zoo\n",
        new_key.public_key,
        wallet_address(&new_key.public_key)
    );
    assert_eq!(h.terminal.take(), expected);

    let reloaded = KeyRegistry::load(Box::new(KeyDbFile::new(dir.path()))).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get(0).unwrap().public_key, new_key.public_key);
    assert_eq!(reloaded.get(0).unwrap().secret, new_key.secret);
}

#[test]
fn test_importkey_asks_for_missing_words() {
    let mut h = Harness::with_keys(vec![]);
    assert_eq!(h.line("importkey w1 w2 w3"), "Enter mnemonic words (got 3 out of 24)\n");

    let more: Vec<String> = (4..=24).map(|i| format!("w{}", i)).collect();
    assert_eq!(h.line(&more.join(" ")), "Enter password (could be empty)\n");
    h.line("");

    match h.client.last().1 {
        Request::ImportKey { exported_key, .. } => {
            assert_eq!(exported_key.word_list.len(), 24);
            assert_eq!(exported_key.word_list[23].to_text().as_str(), "w24");
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn test_deletekeys_requires_exact_phrase() {
    let mut h = Harness::with_keys(vec![record(1), record(2)]);
    assert!(h.line("deletekeys").contains("To confirm enter"));
    assert_eq!(h.line("yes"), "Your keys left intact\n");
    assert_eq!(h.session.keys().len(), 2);
    assert_eq!(h.client.count(), 0);

    h.line("deletekeys");
    h.line("I have written down mnemonic words");
    assert!(h.session.keys().is_empty());
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::DeleteAllKeys));

    h.session.on_reply(id, Response::Acknowledged);
    assert_eq!(h.terminal.take(), "All your keys have been deleted\n");
}

#[test]
fn test_exportkey_prompts_for_key_then_password() {
    let first = record(1);
    let mut h = Harness::with_keys(vec![first.clone()]);

    let out = h.line("exportkey");
    assert!(out.starts_with("Got 1 keys\n"));
    assert!(out.ends_with("Choose public key (hex prefix or #N)\n"));

    assert_eq!(
        h.line("#0"),
        format!("Key #0\npublic key: {}\nEnter password (could be empty)\n", first.public_key)
    );
    h.line("pw");
    match h.client.last().1 {
        Request::ExportKey {
            input_key: InputKey::Regular { key, local_password },
        } => {
            assert_eq!(key.public_key, first.public_key);
            assert_eq!(local_password.as_bytes(), b"pw");
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn test_unknown_key_fails() {
    let mut h = Harness::with_keys(vec![record(1)]);
    let out = h.line("exportkey #7");
    assert!(out.contains("Invalid key id"));
    assert!(!h.session.is_awaiting_input());
}

#[test]
fn test_hint() {
    let mut h = Harness::with_keys(vec![]);
    h.line("hint ab");
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::GetBip39Hints { ref prefix } if prefix == "ab"));
    h.session.on_reply(
        id,
        Response::Bip39Hints(Bip39Hints {
            words: vec!["abandon".into(), "ability".into()],
        }),
    );
    assert_eq!(h.terminal.take(), "abandon ability\n");
}

//-----------------------------------------------------------------------------
// Addresses and Deployment
//-----------------------------------------------------------------------------

#[test]
fn test_address_matches_derivation() {
    let key = record(6);
    let mut h = Harness::with_keys(vec![key.clone()]);
    let owner = deriver().derive(&public_key(&key.public_key), Role::Owner, Some(0)).unwrap();
    assert_eq!(
        h.line("address 0 owner"),
        format!("  #0     Address: {}\n", owner.serialized_address)
    );

    let nominator = deriver().derive(&public_key(&key.public_key), Role::Nominator, Some(3)).unwrap();
    assert_eq!(
        h.line("address 0 nominator 3"),
        format!("  #0     Address: {}\n", nominator.serialized_address)
    );

    assert!(h.line("address 0 validator").contains("FAILED"));
    assert!(h.line("address 0 pool 1").contains("Must be unspecified or zero"));
}

#[test]
fn test_init_pool_builds_and_sends_query() {
    let (key, _) = signing_record(9);
    let mut h = Harness::with_keys(vec![key.clone()]);
    let pool = deriver().derive(&public_key(&key.public_key), Role::Pool, None).unwrap();

    assert!(h.line("init 0 pool").ends_with("Enter password (could be empty)\n"));
    h.line("");
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::ExportUnencryptedKey { .. }));

    h.session.on_reply(
        id,
        Response::ExportedUnencryptedKey(ExportedUnencryptedKey {
            data: SecureBytes::new(vec![9; 32]),
        }),
    );
    assert_eq!(h.terminal.take(), format!("Address : {}\n", pool.serialized_address));
    let (id, request) = h.client.last();
    match request {
        Request::RawCreateQuery {
            destination,
            init_code,
            body,
            ..
        } => {
            assert_eq!(destination.account_address, pool.serialized_address);
            assert!(boc::deserialize(&init_code).is_ok());
            assert!(boc::deserialize(&body).is_ok());
        }
        other => panic!("unexpected request {:?}", other),
    }

    h.session.on_reply(id, query_info(31));
    assert_eq!(h.terminal.take(), "Query was built\n");
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::QuerySend { id: 31 }));
    h.session.on_reply(id, Response::Acknowledged);
    assert_eq!(h.terminal.take(), "Query was sent\n");
}

#[test]
fn test_init_rejects_foreign_private_key() {
    let (key, _) = signing_record(9);
    let mut h = Harness::with_keys(vec![key]);
    h.line("init 0 wallet");
    h.line("");
    let (id, _) = h.client.last();
    h.session.on_reply(
        id,
        Response::ExportedUnencryptedKey(ExportedUnencryptedKey {
            data: SecureBytes::new(vec![8; 32]),
        }),
    );
    assert!(h.terminal.take().contains("does not match the stored public key"));
}

#[test]
fn test_init_nominator_is_refused() {
    let mut h = Harness::with_keys(vec![record(1)]);
    assert!(h.line("init 0 nominator 1").contains("Cannot initialize nominator"));
    assert_eq!(h.client.count(), 0);
}

//-----------------------------------------------------------------------------
// Accounts and Transfers
//-----------------------------------------------------------------------------

#[test]
fn test_getstate_prints_account() {
    let key = record(2);
    let mut h = Harness::with_keys(vec![key.clone()]);
    let address = wallet_address(&key.public_key);
    h.line("getstate 0");
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::GetAccountState { ref account_address } if account_address.account_address == address));

    h.session.on_reply(
        id,
        Response::FullAccountState(FullAccountState {
            address: tonpool_cli::api::AccountAddress::new(address.clone()),
            balance: 1_500_000_000,
            last_transaction_id: TransactionId {
                lt: 77,
                hash: vec![0; 32],
            },
            sync_utime: 1234,
            account_state: json!({"@type": "wallet.v3.accountState", "seqno": 3}),
        }),
    );
    let out = h.terminal.take();
    assert!(out.starts_with(&format!("Address: {}\nBalance: GR$1.5\nSync utime: 1234\n", address)));
    assert!(out.contains("transaction.LT: 77\n"));
    assert!(out.ends_with("Account state: wallet.v3.accountState\n"));
}

#[test]
fn test_transfer_between_stored_keys() {
    let from = record(1);
    let to = record(2);
    let mut h = Harness::with_keys(vec![from.clone(), to.clone()]);
    h.line("transfer 0 1 GR$1.5 hello there");

    let (id, request) = h.client.last();
    match request {
        Request::CreateQuery {
            private_key,
            address,
            timeout,
            action: Action::Msg {
                messages,
                allow_send_to_uninited,
            },
        } => {
            assert!(matches!(private_key, Some(InputKey::Regular { .. })));
            assert_eq!(address.account_address, wallet_address(&from.public_key));
            assert_eq!(timeout, 60);
            assert!(!allow_send_to_uninited);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].destination.account_address, wallet_address(&to.public_key));
            assert_eq!(messages[0].amount, 1_500_000_000);
            assert!(matches!(&messages[0].data, MsgData::Text { text } if text == b"hello there"));
        }
        other => panic!("unexpected request {:?}", other),
    }

    h.session.on_reply(id, query_info(4));
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::QuerySend { id: 4 }));
    h.session.on_reply(id, Response::Acknowledged);
    assert_eq!(h.terminal.take(), "Transfer sent\n");
}

#[test]
fn test_transfer_suffixes() {
    let mut h = Harness::with_keys(vec![record(1)]);
    h.line("transferkf 0 none 100 hi");
    match h.client.last().1 {
        Request::CreateQuery {
            private_key,
            action: Action::Msg {
                messages,
                allow_send_to_uninited,
            },
            ..
        } => {
            assert!(matches!(private_key, Some(InputKey::Fake)));
            assert!(allow_send_to_uninited);
            assert_eq!(messages[0].destination.account_address, "");
            assert_eq!(messages[0].amount, 100);
        }
        other => panic!("unexpected request {:?}", other),
    }

    assert!(h.line("transferx 0 none 1").contains("Unknown suffix 'x'"));
    assert!(h
        .line("transfer EQsomeoneelse none 1")
        .contains("Don't have a private key for this address"));
}

#[test]
fn test_transfer_messages_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.txt");
    std::fs::write(&path, "SEND 1 GR$2 first\n\nSEND none 5 second\n").unwrap();

    let mut h = Harness::with_keys(vec![record(1), record(2)]);
    h.line(&format!("transferF 0 {}", path.display()));
    match h.client.last().1 {
        Request::CreateQuery {
            action: Action::Msg { messages, .. },
            ..
        } => {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].amount, 2_000_000_000);
            assert_eq!(messages[1].amount, 5);
        }
        other => panic!("unexpected request {:?}", other),
    }
}

//-----------------------------------------------------------------------------
// Node Commands
//-----------------------------------------------------------------------------

#[test]
fn test_runmethod_round_trip() {
    let key = record(3);
    let mut h = Harness::with_keys(vec![key.clone()]);
    assert_eq!(
        h.line("runmethod 0 seqno 1 [ 2 ]"),
        "Run method `seqno` With stack:\n1\n[ 2 ]\n"
    );
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::SmcLoad { ref account_address } if account_address.account_address == wallet_address(&key.public_key)));

    h.session.on_reply(id, Response::SmcInfo(SmcInfo { id: 11 }));
    let (id, request) = h.client.last();
    match request {
        Request::SmcRunGetMethod { id, method, stack } => {
            assert_eq!(id, 11);
            assert!(matches!(method, MethodId::Name { ref name } if name == "seqno"));
            assert_eq!(stack.len(), 2);
        }
        other => panic!("unexpected request {:?}", other),
    }

    h.session.on_reply(
        id,
        Response::SmcRunResult(SmcRunResult {
            gas_used: 100,
            stack: vec![StackEntry::Number {
                number: TvmNumber { number: "7".into() },
            }],
            exit_code: 0,
        }),
    );
    assert_eq!(h.terminal.take(), "Got smc result. exit code: 0, gas_used: 100\n7\n");
}

#[test]
fn test_saveaccountdata_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.boc");
    let mut h = Harness::with_keys(vec![record(1)]);

    h.line(&format!("saveaccountdata {} 0", path.display()));
    let (id, _) = h.client.last();
    h.session.on_reply(id, Response::SmcInfo(SmcInfo { id: 2 }));
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::SmcGetData { id: 2 }));

    h.session.on_reply(id, Response::TvmCell(TvmCell { bytes: vec![1, 2, 3] }));
    assert_eq!(
        h.terminal.take(),
        "Data of account 0 was successfully written to the disk(3B)\n"
    );
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_setconfig_updates_default_wallet_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();
    let mut h = Harness::with_keys(vec![]);

    h.line(&format!("setconfig {} testnet true", path.display()));
    let (id, request) = h.client.last();
    match request {
        Request::SetConfig { config } => {
            assert_eq!(config.config, "{}");
            assert_eq!(config.blockchain_name, "testnet");
            assert!(config.use_callbacks_for_network);
            assert!(!config.ignore_cache);
        }
        other => panic!("unexpected request {:?}", other),
    }

    h.session.on_reply(id, Response::ConfigInfo(ConfigInfo { default_wallet_id: 7 }));
    assert_eq!(h.terminal.take(), "Config is set\n");
    assert_eq!(h.session.deriver().default_wallet_id(), 7);
}

#[test]
fn test_setbounceable_treats_any_other_word_as_true() {
    for (word, expected) in [("", true), ("no", true), ("False", true), ("false", false), ("0", false)] {
        let mut h = Harness::with_keys(vec![]);
        h.line(&format!("setbounceable EQabc {}", word));
        let (id, _) = h.client.last();
        h.session.on_reply(
            id,
            Response::UnpackedAccountAddress(UnpackedAccountAddress {
                workchain_id: 0,
                bounceable: !expected,
                testnet: false,
                addr: vec![0; 32],
            }),
        );
        match h.client.last().1 {
            Request::PackAccountAddress { account_address } => {
                assert_eq!(account_address.bounceable, expected, "word `{}`", word);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }
}

//-----------------------------------------------------------------------------
// Pool
//-----------------------------------------------------------------------------

#[test]
fn test_pool_prompts_for_each_missing_argument() {
    let (key, _) = signing_record(4);
    let mut h = Harness::with_keys(vec![key.clone()]);

    assert!(h.line("pool").ends_with("Choose public key (hex prefix or #N)\n"));
    assert_eq!(
        h.line("0"),
        "Choose command sns (set nominator status) / pr (close period)\n"
    );
    assert_eq!(h.line("sns"), "Please set nominator index (1-..)\n");
    assert_eq!(h.line("1"), "Please select status (1-..)\n");
    assert!(h.line("2").ends_with("Enter password (could be empty)\n"));
    assert_eq!(h.client.count(), 0);

    let mut h = Harness::with_keys(vec![key]);
    assert!(h.line("pool 0 pr").contains("not supported"));
    assert!(h.line("pool 0 sns 0 1").contains("Must be specified and greater than zero"));
}

#[test]
fn test_pool_set_nominator_status() {
    let (key, _) = signing_record(4);
    let mut h = Harness::with_keys(vec![key.clone()]);
    let pk = public_key(&key.public_key);
    let owner = deriver().derive(&pk, Role::Owner, None).unwrap();
    let pool = deriver().derive(&pk, Role::Pool, None).unwrap();
    let nominator = deriver().derive(&pk, Role::Nominator, Some(1)).unwrap();

    h.line("pool 0 sns 1 2");
    h.line("");
    let (id, _) = h.client.last();
    h.session.on_reply(
        id,
        Response::ExportedUnencryptedKey(ExportedUnencryptedKey {
            data: SecureBytes::new(vec![4; 32]),
        }),
    );
    assert_eq!(
        h.terminal.take(),
        format!(
            "Owner address : {}\nPool address : {}\nNominator address : {}\n",
            owner.serialized_address, pool.serialized_address, nominator.serialized_address
        )
    );

    let (id, request) = h.client.last();
    assert!(matches!(request, Request::SmcLoad { ref account_address } if account_address.account_address == owner.serialized_address));
    h.session.on_reply(id, Response::SmcInfo(SmcInfo { id: 5 }));
    let (id, request) = h.client.last();
    assert!(matches!(request, Request::SmcGetData { id: 5 }));

    let data = WalletV3::init_data(&pk, 0).unwrap();
    h.session.on_reply(
        id,
        Response::TvmCell(TvmCell {
            bytes: boc::serialize(&data).unwrap(),
        }),
    );
    assert_eq!(h.terminal.take(), "Seqno: 0\n");
    match h.client.last().1 {
        Request::RawCreateQuery {
            destination,
            init_code,
            init_data,
            body,
        } => {
            assert_eq!(destination.account_address, owner.serialized_address);
            assert!(init_code.is_empty() && init_data.is_empty());
            assert!(boc::deserialize(&body).is_ok());
        }
        other => panic!("unexpected request {:?}", other),
    }
}
