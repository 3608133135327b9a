// Node commands: server info, config, raw messages, account snapshots and
// get-methods

use tracing::debug;

use super::stack::{format_stack, parse_stack};
use super::{parse_bool, resolve_account};
use crate::api::{
    AccountAddress, Acknowledged, Config, ConfigInfo, LiteServerInfo, MethodId, Request, Response,
    SmcInfo, SmcRunResult, TvmCell,
};
use crate::dispatch::Args;
use crate::error::{CliError, CliResult};
use crate::session::{CommandToken, Flow, Session};

//-----------------------------------------------------------------------------
// Server Info
//-----------------------------------------------------------------------------

pub fn time(session: &mut Session, token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    session.send_query(token, Request::LiteServerGetInfo, |session, info: LiteServerInfo| {
        session.out(format!("Lite server time is: {}\n", info.now));
        Ok(Flow::Done)
    })
}

pub fn remote_version(session: &mut Session, token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    session.send_query(token, Request::LiteServerGetInfo, |session, info: LiteServerInfo| {
        session.out(format!(
            "Lite server time is: {}\nLite server version is: {}\nLite server capabilities are: {}\n",
            info.now, info.version, info.capabilities
        ));
        Ok(Flow::Done)
    })
}

/// Any reply counts; `sync` answers with the last block id
struct Synced;

impl TryFrom<Response> for Synced {
    type Error = CliError;

    fn try_from(_: Response) -> CliResult<Self> {
        Ok(Synced)
    }
}

pub fn sync(session: &mut Session, token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    session.send_query(token, Request::Sync, |session, _: Synced| {
        session.out("synchronized\n");
        Ok(Flow::Done)
    })
}

/// `[snd:<size>]` and `[rcv:<size>]`
pub fn netstats(session: &mut Session, _token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    let stats = session.netstats();
    session.out(format!(
        "[snd:{}]\n[rcv:{}]\n",
        format_size(stats.sent),
        format_size(stats.received)
    ));
    Ok(Flow::Done)
}

/// Byte count in the largest unit that still shows at least ten of it
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 4] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10), ("B", 1)];
    for (name, size) in UNITS {
        if bytes >= size * 10 || size == 1 {
            return format!("{}{}", bytes / size, name);
        }
    }
    format!("{}B", bytes)
}

//-----------------------------------------------------------------------------
// Config
//-----------------------------------------------------------------------------

pub fn setconfig(session: &mut Session, token: &CommandToken, _suffix: &str, args: Args<'_>) -> CliResult<Flow> {
    let config = read_config(args)?;
    session.send_query(token, Request::SetConfig { config }, |session, info: ConfigInfo| {
        session.apply_config_info(&info);
        session.out("Config is set\n");
        Ok(Flow::Done)
    })
}

pub fn validateconfig(session: &mut Session, token: &CommandToken, _suffix: &str, args: Args<'_>) -> CliResult<Flow> {
    let config = read_config(args)?;
    session.send_query(token, Request::ValidateConfig { config }, |session, info: ConfigInfo| {
        session.out(format!("Config is valid: default_wallet_id = {}\n", info.default_wallet_id));
        Ok(Flow::Done)
    })
}

/// `<path> [<name>] [<use_callback>] [<force>]`
fn read_config(mut args: Args<'_>) -> CliResult<Config> {
    let path = args.word();
    if path.is_empty() {
        return Err(CliError::validation("Config path is not specified"));
    }
    let name = args.word().to_string();
    let use_callbacks = parse_bool(args.word(), false);
    let ignore_cache = parse_bool(args.word(), false);
    Ok(Config {
        config: fs_err::read_to_string(path)?,
        blockchain_name: name,
        use_callbacks_for_network: use_callbacks,
        ignore_cache,
    })
}

//-----------------------------------------------------------------------------
// Raw Messages and Snapshots
//-----------------------------------------------------------------------------

pub fn sendfile(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let body = fs_err::read(args.word())?;
    session.send_query(token, Request::RawSendMessage { body }, |session, _: Acknowledged| {
        session.out("Query was sent\n");
        Ok(Flow::Done)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    State,
    Code,
    Data,
}

impl Snapshot {
    fn request(self, id: i64) -> Request {
        match self {
            Snapshot::State => Request::SmcGetState { id },
            Snapshot::Code => Request::SmcGetCode { id },
            Snapshot::Data => Request::SmcGetData { id },
        }
    }

    fn describe(self, address: &str) -> String {
        match self {
            Snapshot::State => format!("StateInit of account {}", address),
            Snapshot::Code => format!("Code of account {}", address),
            Snapshot::Data => format!("Data of account {}", address),
        }
    }
}

pub fn saveaccount(session: &mut Session, token: &CommandToken, _suffix: &str, args: Args<'_>) -> CliResult<Flow> {
    save_snapshot(session, token, Snapshot::State, args)
}

pub fn saveaccountcode(session: &mut Session, token: &CommandToken, _suffix: &str, args: Args<'_>) -> CliResult<Flow> {
    save_snapshot(session, token, Snapshot::Code, args)
}

pub fn saveaccountdata(session: &mut Session, token: &CommandToken, _suffix: &str, args: Args<'_>) -> CliResult<Flow> {
    save_snapshot(session, token, Snapshot::Data, args)
}

fn save_snapshot(session: &mut Session, token: &CommandToken, snapshot: Snapshot, mut args: Args<'_>) -> CliResult<Flow> {
    let path = args.word().to_string();
    let word = args.word();
    let account = resolve_account(session, word, false)?;
    let description = snapshot.describe(word);

    let next = token.clone();
    let request = Request::SmcLoad {
        account_address: AccountAddress::new(account.address),
    };
    session.send_query(token, request, move |session, info: SmcInfo| {
        session.send_query(&next, snapshot.request(info.id), move |session, cell: TvmCell| {
            fs_err::write(&path, &cell.bytes)?;
            debug!(path = %path, bytes = cell.bytes.len(), "account snapshot written");
            session.out(format!(
                "{} was successfully written to the disk({})\n",
                description,
                format_size(cell.bytes.len() as u64)
            ));
            Ok(Flow::Done)
        })
    })
}

//-----------------------------------------------------------------------------
// Get-methods
//-----------------------------------------------------------------------------

pub fn runmethod(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let account = resolve_account(session, args.word(), false)?;
    let method = MethodId::parse(args.word())?;
    let stack = parse_stack(&mut args)?;
    session.out(format!("Run {} With stack:\n{}", method, format_stack(&stack)));

    let next = token.clone();
    let request = Request::SmcLoad {
        account_address: AccountAddress::new(account.address),
    };
    session.send_query(token, request, move |session, info: SmcInfo| {
        let request = Request::SmcRunGetMethod {
            id: info.id,
            method,
            stack,
        };
        session.send_query(&next, request, |session, result: SmcRunResult| {
            session.out(format!(
                "Got smc result. exit code: {}, gas_used: {}\n{}",
                result.exit_code,
                result.gas_used,
                format_stack(&result.stack)
            ));
            Ok(Flow::Done)
        })
    })
}
