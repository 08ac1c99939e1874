use std::error::Error;
use std::fs;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tidepool_core::config::Settings;
use tidepool_core::pool::math::{whole, SECONDS_PER_DAY};
use tidepool_core::utils::{current_time, format_amount, format_duration, parse_amount};
use tidepool_core::{Address, Amount, RewardPool, Role, Timestamp, TokenLedger};

#[derive(Parser)]
#[command(name = "tidepool", version, about = "Time-weighted staking pool simulator")]
struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a canned multi-participant day and print the outcome
    Demo {
        /// Extra randomized participants staking alongside the named ones
        #[arg(long, default_value_t = 0)]
        extra: usize,
        /// Seed for the randomized participants
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Replay a script of pool operations under a simulated clock
    Run {
        /// Script path, one operation per line
        script: String,
        /// Simulated clock start, seconds since the epoch
        #[arg(long)]
        start: Option<Timestamp>,
        /// Print the event journals as JSON when the script finishes
        #[arg(long)]
        events_json: bool,
    },
    /// Print the effective settings as TOML
    ShowConfig,
}

/// A ledger, a pool wired to it, and a simulated clock.
struct Session {
    ledger: TokenLedger,
    pool: RewardPool,
    admin: Address,
    now: Timestamp,
}

impl Session {
    fn open(settings: &Settings, start: Timestamp) -> Result<Self, Box<dyn Error>> {
        let admin = settings.admin;
        let mut ledger = TokenLedger::new(&settings.token.name, &settings.token.symbol, admin)?;
        ledger.grant_role(admin, Role::Minter, admin)?;
        ledger.grant_role(admin, Role::Minter, settings.pool_address)?;
        for account in &settings.genesis {
            ledger.mint(admin, account.address, whole(account.balance))?;
        }
        let pool = RewardPool::new(
            settings.token.address,
            settings.pool_address,
            admin,
            whole(settings.daily_reward),
            start,
        )?;
        info!(
            "session opened: {} ({}) with daily reward {}",
            settings.token.name, settings.token.symbol, settings.daily_reward
        );
        Ok(Session {
            ledger,
            pool,
            admin,
            now: start,
        })
    }

    /// Mint, approve and stake in one step, for demo participants.
    fn join(&mut self, account: Address, tokens: u64) -> Result<(), Box<dyn Error>> {
        let amount = whole(tokens);
        self.ledger.mint(self.admin, account, amount)?;
        self.ledger.approve(account, self.pool.pool_address(), amount)?;
        self.pool.stake(&mut self.ledger, account, amount, self.now)?;
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Demo { extra, seed } => run_demo(&settings, extra, seed),
        Command::Run {
            script,
            start,
            events_json,
        } => {
            let start = start.unwrap_or_else(current_time);
            let source = fs::read_to_string(&script)?;
            let mut session = Session::open(&settings, start)?;
            run_script(&mut session, &source)?;
            print_status(&session);
            if events_json {
                print_events_json(&mut session)?;
            }
            Ok(())
        }
        Command::ShowConfig => {
            println!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

// A day in the life of the pool: three named stakers, a mid-day exit,
// an end-of-day exit, and everyone claiming at the close.
fn run_demo(settings: &Settings, extra: usize, seed: u64) -> Result<(), Box<dyn Error>> {
    let start = current_time();
    let mut session = Session::open(settings, start)?;

    let alice = named_address("alice");
    let bob = named_address("bob");
    let carol = named_address("carol");

    session
        .pool
        .set_daily_reward(session.admin, whole(1200), start)?;
    session.join(alice, 100)?;
    session.join(bob, 100)?;
    session.join(carol, 100)?;

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut guests = Vec::with_capacity(extra);
    for _ in 0..extra {
        let guest = Address(rng.gen());
        let tokens = rng.gen_range(1..=100);
        session.join(guest, tokens)?;
        guests.push(guest);
    }

    println!("pool opened with {} participants", 3 + extra);
    print_status(&session);

    session.now = start + SECONDS_PER_DAY / 2;
    session
        .pool
        .unstake(&mut session.ledger, alice, whole(100), session.now)?;
    println!("\nafter {}: alice unstaked", format_duration(SECONDS_PER_DAY / 2, false));

    session.now = start + SECONDS_PER_DAY;
    session
        .pool
        .unstake(&mut session.ledger, bob, whole(100), session.now)?;
    for account in [alice, bob, carol].into_iter().chain(guests) {
        let claimed = session
            .pool
            .claim_rewards(&mut session.ledger, account, session.now)?;
        println!(
            "{} claimed {} {}",
            account,
            format_amount(claimed),
            session.ledger.symbol()
        );
    }

    println!("\nafter {}:", format_duration(SECONDS_PER_DAY, false));
    print_status(&session);
    Ok(())
}

fn run_script(session: &mut Session, source: &str) -> Result<(), Box<dyn Error>> {
    for (index, raw) in source.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        apply_line(session, line).map_err(|err| format!("line {}: {}", index + 1, err))?;
    }
    Ok(())
}

fn apply_line(session: &mut Session, line: &str) -> Result<(), Box<dyn Error>> {
    let mut parts = line.split_whitespace();
    let op = match parts.next() {
        Some(op) => op,
        None => return Ok(()),
    };
    let pool_address = session.pool.pool_address();
    match op {
        "mint" => {
            let who = parse_account(&mut parts)?;
            let amount = parse_tokens(&mut parts)?;
            session.ledger.mint(session.admin, who, amount)?;
        }
        "approve" => {
            let who = parse_account(&mut parts)?;
            let amount = parse_tokens(&mut parts)?;
            session.ledger.approve(who, pool_address, amount)?;
        }
        "stake" => {
            let who = parse_account(&mut parts)?;
            let amount = parse_tokens(&mut parts)?;
            session.pool.stake(&mut session.ledger, who, amount, session.now)?;
        }
        "unstake" => {
            let who = parse_account(&mut parts)?;
            let amount = parse_tokens(&mut parts)?;
            session
                .pool
                .unstake(&mut session.ledger, who, amount, session.now)?;
        }
        "restake" => {
            let who = parse_account(&mut parts)?;
            let amount = session.pool.restake(&mut session.ledger, who, session.now)?;
            println!("{} compounded {}", who, format_amount(amount));
        }
        "claim" => {
            let who = parse_account(&mut parts)?;
            let amount = session
                .pool
                .claim_rewards(&mut session.ledger, who, session.now)?;
            println!("{} claimed {}", who, format_amount(amount));
        }
        "rate" => {
            let amount = parse_tokens(&mut parts)?;
            session
                .pool
                .set_daily_reward(session.admin, amount, session.now)?;
        }
        "advance" => {
            let raw = parts.next().ok_or("advance needs a duration")?;
            let seconds = parse_duration(raw).ok_or("bad duration, use e.g. 90, 30m, 12h, 1d")?;
            session.now += seconds;
        }
        "status" => print_status(session),
        other => return Err(format!("unknown operation '{}'", other).into()),
    }
    Ok(())
}

fn print_status(session: &Session) {
    let pool = &session.pool;
    let symbol = session.ledger.symbol();
    println!(
        "pool: {} staked, {} {}/day, accumulator {}",
        format_amount(pool.total_staked()),
        format_amount(pool.daily_reward()),
        symbol,
        pool.accumulated_reward_per_share(),
    );
    let mut rows: Vec<(Address, Amount, Amount, Amount)> = pool
        .participants()
        .map(|(account, position)| {
            let claimable = pool
                .accumulated_reward_of(account, session.now)
                .unwrap_or(position.pending_reward);
            (
                account,
                position.staked_amount,
                claimable,
                session.ledger.balance_of(account),
            )
        })
        .collect();
    rows.sort_by_key(|row| row.0);
    for (account, staked, claimable, balance) in rows {
        println!(
            "  {}  staked {:>12}  claimable {:>12}  balance {:>12}",
            account,
            format_amount(staked),
            format_amount(claimable),
            format_amount(balance),
        );
    }
}

fn print_events_json(session: &mut Session) -> Result<(), Box<dyn Error>> {
    let pool_events = session.pool.drain_events();
    let token_events = session.ledger.drain_events();
    println!("{}", serde_json::to_string_pretty(&pool_events)?);
    println!("{}", serde_json::to_string_pretty(&token_events)?);
    Ok(())
}

fn parse_account(parts: &mut std::str::SplitWhitespace<'_>) -> Result<Address, Box<dyn Error>> {
    let raw = parts.next().ok_or("missing account")?;
    Ok(resolve_account(raw))
}

fn parse_tokens(parts: &mut std::str::SplitWhitespace<'_>) -> Result<Amount, Box<dyn Error>> {
    let raw = parts.next().ok_or("missing amount")?;
    parse_amount(raw).ok_or_else(|| format!("bad amount '{}'", raw).into())
}

/// Accounts may be given as 0x-hex addresses or as short names, which map
/// to a deterministic address built from the name's bytes.
fn resolve_account(raw: &str) -> Address {
    if let Ok(address) = Address::from_hex(raw) {
        return address;
    }
    named_address(raw)
}

fn named_address(name: &str) -> Address {
    let mut bytes = [0u8; 20];
    for (slot, byte) in bytes.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    Address(bytes)
}

fn parse_duration(raw: &str) -> Option<u64> {
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds);
    }
    for (unit, scale) in [('s', 1), ('m', 60), ('h', 3600), ('d', 86_400)] {
        if let Some(value) = raw.strip_suffix(unit) {
            return value.parse::<u64>().ok()?.checked_mul(scale);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_parse_with_unit_suffixes() {
        assert_eq!(parse_duration("90"), Some(90));
        assert_eq!(parse_duration("45s"), Some(45));
        assert_eq!(parse_duration("30m"), Some(1800));
        assert_eq!(parse_duration("12h"), Some(43_200));
        assert_eq!(parse_duration("1d"), Some(86_400));
    }

    #[test]
    fn test_malformed_durations_are_rejected() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("xyz"), None);
        assert_eq!(parse_duration("d"), None);
        assert_eq!(parse_duration("-5m"), None);
        // A trailing multi-byte character is rejected, never sliced.
        assert_eq!(parse_duration("1é"), None);
        assert_eq!(parse_duration("90分"), None);
        assert_eq!(parse_duration("18446744073709551615d"), None);
    }
}
