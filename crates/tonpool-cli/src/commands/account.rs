// Account commands: derived addresses, deployment, state and transfers

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use tonpool_contracts::{boc, Grams, Role, StakingPool, WalletV3};

use super::{input_key, parse_bool, parse_index, public_key, record, resolve_account, with_signing_key};
use crate::api::{
    AccountAddress, Acknowledged, Action, FullAccountState, InputKey, MsgData, MsgMessage, QueryFees, QueryInfo,
    Request, UnpackedAccountAddress,
};
use crate::dispatch::Args;
use crate::error::{CliError, CliResult};
use crate::session::{CommandToken, Flow, Session};

/// Seconds a transfer query stays valid
pub const QUERY_TIMEOUT: i32 = 60;

/// Highest nominator index announced in a pool's init message
pub const INIT_NOMINATORS: u32 = 9;

//-----------------------------------------------------------------------------
// Addresses
//-----------------------------------------------------------------------------

pub fn address(session: &mut Session, _token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let key = args.word();
    let role: Role = args.word().parse()?;
    let role_index = parse_index(args.word())?;

    let index = session.keys().lookup(key)?;
    let public_key = public_key(session, index)?;
    let derived = session.deriver().derive(&public_key, role, role_index)?;
    session.out(format!("  #{}     Address: {}\n", key, derived.serialized_address));
    Ok(Flow::Done)
}

pub fn init(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let key = args.word();
    let role: Role = args.word().parse()?;
    let role_index = parse_index(args.word())?;

    let index = session.keys().lookup(key)?;
    if role == Role::Nominator {
        return Err(CliError::validation("Cannot initialize nominator"));
    }
    let public_key = public_key(session, index)?;
    // Reject bad indexes before asking for the password.
    session.deriver().derive(&public_key, role, role_index)?;

    let next = token.clone();
    with_signing_key(session, token, index, move |session, signing_key| {
        let derivation = session.deriver().resolve(&public_key, role, role_index)?;
        let message = match role {
            Role::Wallet | Role::Owner => WalletV3::init_message(&signing_key, derivation.address.role_index)?,
            Role::Pool => {
                let nominators = (1..=INIT_NOMINATORS)
                    .map(|i| {
                        session
                            .deriver()
                            .derive(&public_key, Role::Nominator, Some(i))
                            .map(|derived| derived.address)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                StakingPool::init_message(&nominators)?
            }
            Role::Nominator => return Err(CliError::validation("Cannot initialize nominator")),
        };

        let address = derivation.address.serialized_address;
        session.out(format!("Address : {}\n", address));
        let request = Request::RawCreateQuery {
            destination: AccountAddress::new(address),
            init_code: boc::serialize(&derivation.state.code)?,
            init_data: boc::serialize(&derivation.state.data)?,
            body: boc::serialize(&message)?,
        };
        send_built_query(session, &next, request)
    })
}

/// Send a `raw.createQuery` request, then `query.send` the result
pub fn send_built_query(session: &mut Session, token: &CommandToken, request: Request) -> CliResult<Flow> {
    let next = token.clone();
    session.send_query(token, request, move |session, query: QueryInfo| {
        session.out("Query was built\n");
        session.send_query(&next, Request::QuerySend { id: query.id }, |session, _: Acknowledged| {
            session.out("Query was sent\n");
            Ok(Flow::Done)
        })
    })
}

//-----------------------------------------------------------------------------
// Account State
//-----------------------------------------------------------------------------

pub fn getstate(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let account = resolve_account(session, args.word(), false)?;
    let address = account.address.clone();
    let request = Request::GetAccountState {
        account_address: AccountAddress::new(account.address),
    };
    session.send_query(token, request, move |session, state: FullAccountState| {
        let balance = Grams::from_nano(state.balance.max(0) as u64);
        let kind = state
            .account_state
            .get("@type")
            .and_then(|value| value.as_str())
            .unwrap_or("unknown");
        session.out(format!(
            "Address: {}\nBalance: {}\nSync utime: {}\ntransaction.LT: {}\ntransaction.Hash: {}\nAccount state: {}\n",
            address,
            balance,
            state.sync_utime,
            state.last_transaction_id.lt,
            STANDARD.encode(&state.last_transaction_id.hash),
            kind
        ));
        Ok(Flow::Done)
    })
}

//-----------------------------------------------------------------------------
// Transfers
//-----------------------------------------------------------------------------

/// Options selected by the suffix of `transfer`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferFlags {
    pub from_file: bool,
    pub force: bool,
    pub encrypted: bool,
    pub fake_key: bool,
    pub estimate_fees: bool,
}

impl TransferFlags {
    pub fn parse(suffix: &str) -> CliResult<Self> {
        let mut flags = Self::default();
        for c in suffix.chars() {
            match c {
                'F' => flags.from_file = true,
                'f' => flags.force = true,
                'e' => flags.encrypted = true,
                'k' => flags.fake_key = true,
                'c' => flags.estimate_fees = true,
                other => return Err(CliError::validation(format!("Unknown suffix '{}'", other))),
            }
        }
        Ok(flags)
    }
}

pub fn transfer(session: &mut Session, token: &CommandToken, suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let flags = TransferFlags::parse(suffix)?;
    let source = resolve_account(session, args.word(), true)?;

    let mut messages = Vec::new();
    if flags.from_file {
        let path = args.word();
        let text = fs_err::read_to_string(path)?;
        for line in text.lines() {
            let mut line_args = Args::new(line);
            if line_args.is_empty() {
                continue;
            }
            if line_args.word() != "SEND" {
                return Err(CliError::validation("Expected `SEND` in file"));
            }
            messages.push(parse_message(session, &mut line_args, flags.encrypted)?);
        }
    } else {
        while !args.is_empty() {
            messages.push(parse_message(session, &mut args, flags.encrypted)?);
        }
    }
    if messages.is_empty() {
        return Err(CliError::validation("Nothing to transfer"));
    }

    let private_key = if flags.fake_key {
        InputKey::Fake
    } else {
        let index = source
            .key
            .ok_or_else(|| CliError::validation("Don't have a private key for this address"))?;
        input_key(&record(session, index)?, "")
    };
    debug!(from = %source.address, messages = messages.len(), "creating transfer query");

    let request = Request::CreateQuery {
        private_key: Some(private_key),
        address: AccountAddress::new(source.address),
        timeout: QUERY_TIMEOUT,
        action: Action::Msg {
            messages,
            allow_send_to_uninited: flags.force,
        },
    };
    let next = token.clone();
    session.send_query(token, request, move |session, query: QueryInfo| {
        if flags.estimate_fees {
            let request = Request::QueryEstimateFees {
                id: query.id,
                ignore_chksig: true,
            };
            session.send_query(&next, request, |session, fees: QueryFees| {
                session.out(format!("Estimated fees: {}\n", fees.source_fees));
                for (i, fees) in fees.destination_fees.iter().enumerate() {
                    session.out(format!("Destination #{} fees: {}\n", i, fees));
                }
                Ok(Flow::Done)
            })
        } else {
            session.send_query(&next, Request::QuerySend { id: query.id }, |session, _: Acknowledged| {
                session.out("Transfer sent\n");
                Ok(Flow::Done)
            })
        }
    })
}

/// `<to> <amount> <message...>`
fn parse_message(session: &Session, args: &mut Args<'_>, encrypted: bool) -> CliResult<MsgMessage> {
    let destination = resolve_account(session, args.word(), false)?;
    let amount: Grams = args.word().parse()?;
    let amount = i64::try_from(amount.nano).map_err(|_| CliError::validation("Amount is too large"))?;
    let text = args.rest().as_bytes().to_vec();
    let data = if encrypted {
        MsgData::DecryptedText { text }
    } else {
        MsgData::Text { text }
    };
    Ok(MsgMessage {
        destination: AccountAddress::new(destination.address),
        public_key: String::new(),
        amount,
        data,
    })
}

//-----------------------------------------------------------------------------
// Address Utilities
//-----------------------------------------------------------------------------

pub fn unpackaddress(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let request = Request::UnpackAccountAddress {
        account_address: args.word().to_string(),
    };
    session.send_query(token, request, |session, unpacked: UnpackedAccountAddress| {
        session.out(format!(
            "workchain_id: {}\nbounceable: {}\ntestnet: {}\naddr: {}\n",
            unpacked.workchain_id,
            unpacked.bounceable,
            unpacked.testnet,
            hex::encode(&unpacked.addr)
        ));
        Ok(Flow::Done)
    })
}

pub fn setbounceable(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let address = args.word().to_string();
    let bounceable = parse_bool(args.word(), true);
    let next = token.clone();
    session.send_query(
        token,
        Request::UnpackAccountAddress { account_address: address },
        move |session, mut unpacked: UnpackedAccountAddress| {
            unpacked.bounceable = bounceable;
            session.send_query(
                &next,
                Request::PackAccountAddress { account_address: unpacked },
                |session, packed: AccountAddress| {
                    session.out(format!("{}\n", packed.account_address));
                    Ok(Flow::Done)
                },
            )
        },
    )
}
