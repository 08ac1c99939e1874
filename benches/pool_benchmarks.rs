use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tidepool_core::ledger::{Address, Amount, Role, TokenLedger};
use tidepool_core::pool::math::whole;
use tidepool_core::pool::RewardPool;

const T0: u64 = 1_700_000_000;
const POOL_SIZE: usize = 1_000;

pub fn benchmark_reward_preview(c: &mut Criterion) {
    let (_, pool) = populated_pool();
    let account = participant(0);

    c.bench_function("reward_preview", |b| {
        b.iter(|| {
            pool.accumulated_reward_of(black_box(account), T0 + 3600)
                .unwrap()
        })
    });
}

pub fn benchmark_stake_unstake_round(c: &mut Criterion) {
    let (mut ledger, mut pool) = populated_pool();
    let account = participant(0);

    c.bench_function("stake_unstake_round", |b| {
        b.iter(|| {
            pool.stake(&mut ledger, black_box(account), whole(10), T0)
                .unwrap();
            pool.unstake(&mut ledger, black_box(account), whole(10), T0)
                .unwrap();
            pool.drain_events();
        })
    });
}

pub fn benchmark_claim_with_settlement(c: &mut Criterion) {
    let (mut ledger, mut pool) = populated_pool();
    let account = participant(0);
    let mut now = T0;

    c.bench_function("claim_with_settlement", |b| {
        b.iter(|| {
            now += 1;
            pool.claim_rewards(&mut ledger, black_box(account), now)
                .unwrap();
            pool.drain_events();
            ledger.drain_events();
        })
    });
}

fn participant(index: usize) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(index as u64 + 1).to_be_bytes());
    Address(bytes)
}

// Service addresses live in a different byte range than participants.
fn control(tag: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = tag;
    Address(bytes)
}

// A pool with many settled positions, so every benched operation pays
// the full per-operation cost against a realistic book.
fn populated_pool() -> (TokenLedger, RewardPool) {
    let admin = control(0xAD);
    let custody = control(0xB0);
    let mut ledger = TokenLedger::new("Tide Token", "TIDE", admin).unwrap();
    ledger.grant_role(admin, Role::Minter, admin).unwrap();
    ledger.grant_role(admin, Role::Minter, custody).unwrap();

    let mut pool = RewardPool::new(control(0x01), custody, admin, whole(1_000), T0).unwrap();
    for index in 0..POOL_SIZE {
        let account = participant(index);
        ledger.mint(admin, account, whole(1_000)).unwrap();
        ledger.approve(account, custody, Amount::MAX).unwrap();
        pool.stake(&mut ledger, account, whole(100), T0).unwrap();
    }
    pool.drain_events();
    ledger.drain_events();
    (ledger, pool)
}

criterion_group!(
    benches,
    benchmark_reward_preview,
    benchmark_stake_unstake_round,
    benchmark_claim_with_settlement
);
criterion_main!(benches);
