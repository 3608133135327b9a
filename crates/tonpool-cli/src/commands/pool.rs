// Pool owner commands, sent from the owner wallet to the staking pool

use chrono::Utc;
use tracing::info;

use tonpool_contracts::wallet::public_key_of;
use tonpool_contracts::{boc, Role, SigningKey, StakingPool, Transfer, WalletV3};

use super::account::send_built_query;
use super::{dump_keys, public_key, with_signing_key, CHOOSE_KEY_PROMPT};
use crate::api::{AccountAddress, Request, SmcInfo, TvmCell};
use crate::dispatch::Args;
use crate::error::{CliError, CliResult};
use crate::session::{CommandToken, Flow, Session};

/// Seconds the owner's external message stays valid
pub const MESSAGE_TTL: i64 = 60;

const COMMAND_PROMPT: &str = "Choose command sns (set nominator status) / pr (close period)";

/// Arguments of `pool`, filled in one prompt at a time
#[derive(Debug, Clone, Default)]
struct PoolArgs {
    key: String,
    command: String,
    nominator: String,
    status: String,
}

pub fn pool(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let args = PoolArgs {
        key: args.word().to_string(),
        command: args.word().to_string(),
        nominator: args.word().to_string(),
        status: args.word().to_string(),
    };
    collect(session, token, args)
}

fn collect(session: &mut Session, token: &CommandToken, args: PoolArgs) -> CliResult<Flow> {
    let next = token.clone();
    if args.key.is_empty() {
        dump_keys(session)?;
        return session.suspend(token, CHOOSE_KEY_PROMPT, move |session, line| {
            let args = PoolArgs {
                key: line.trim().to_string(),
                ..args
            };
            collect(session, &next, args)
        });
    }
    if args.command.is_empty() {
        return session.suspend(token, COMMAND_PROMPT, move |session, line| {
            let args = PoolArgs {
                command: line.trim().to_string(),
                ..args
            };
            collect(session, &next, args)
        });
    }
    match args.command.as_str() {
        "sns" => {}
        "pr" => return Err(CliError::validation("Closing a period is not supported yet")),
        other => return Err(CliError::validation(format!("Unknown pool command `{}`", other))),
    }

    let index = session.keys().lookup(&args.key)?;
    if args.nominator.is_empty() {
        return session.suspend(token, "Please set nominator index (1-..)", move |session, line| {
            let args = PoolArgs {
                nominator: line.trim().to_string(),
                ..args
            };
            collect(session, &next, args)
        });
    }
    if args.status.is_empty() {
        return session.suspend(token, "Please select status (1-..)", move |session, line| {
            let args = PoolArgs {
                status: line.trim().to_string(),
                ..args
            };
            collect(session, &next, args)
        });
    }

    let nominator = parse_number(&args.nominator, "nominator index")?;
    let status = parse_number(&args.status, "status")?;
    let public_key = public_key(session, index)?;
    // Nominator 0 is rejected here, before the password prompt.
    session.deriver().derive(&public_key, Role::Nominator, Some(nominator))?;

    with_signing_key(session, token, index, move |session, key| {
        set_nominator_status(session, &next, key, nominator, status)
    })
}

fn parse_number(word: &str, what: &str) -> CliResult<u32> {
    word.parse()
        .map_err(|_| CliError::validation(format!("Incorrect {} `{}`", what, word)))
}

fn set_nominator_status(
    session: &mut Session,
    token: &CommandToken,
    key: SigningKey,
    nominator: u32,
    status: u32,
) -> CliResult<Flow> {
    let public_key = public_key_of(&key);
    let owner = session.deriver().derive(&public_key, Role::Owner, None)?;
    let pool = session.deriver().derive(&public_key, Role::Pool, None)?;
    let nominator_address = session.deriver().derive(&public_key, Role::Nominator, Some(nominator))?;
    session.out(format!(
        "Owner address : {}\nPool address : {}\nNominator address : {}\n",
        owner.serialized_address, pool.serialized_address, nominator_address.serialized_address
    ));

    let request = StakingPool::set_nominator_status_request(&nominator_address.address, status, 0)?.to_arc();
    let amount = session.pool_request_amount().nano;
    let owner_address = owner.serialized_address.clone();

    let next = token.clone();
    let load = Request::SmcLoad {
        account_address: AccountAddress::new(owner.serialized_address),
    };
    session.send_query(token, load, move |session, info: SmcInfo| {
        let then = next.clone();
        session.send_query(&next, Request::SmcGetData { id: info.id }, move |session, data: TvmCell| {
            let cell = boc::deserialize(&data.bytes)?;
            let wallet = WalletV3::parse_data(&cell)?;
            if wallet.public_key != public_key {
                return Err(CliError::validation("Owner wallet belongs to another key"));
            }
            session.out(format!("Seqno: {}\n", wallet.seqno));

            let valid_until = u32::try_from(Utc::now().timestamp() + MESSAGE_TTL)
                .map_err(|_| CliError::validation("System clock is out of range"))?;
            let transfer = Transfer {
                destination: pool.address,
                bounce: true,
                amount,
                body: Some(request),
            };
            let message = WalletV3::transfer_message(&key, wallet.wallet_id, wallet.seqno, valid_until, &transfer)?;
            info!(nominator, status, seqno = wallet.seqno, "sending set nominator status request");

            let request = Request::RawCreateQuery {
                destination: AccountAddress::new(owner_address),
                init_code: Vec::new(),
                init_data: Vec::new(),
                body: boc::serialize(&message)?,
            };
            send_built_query(session, &then, request)
        })
    })
}
