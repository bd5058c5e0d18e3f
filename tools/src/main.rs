//! turf-runner: headless demo driver for the turf-core economy.
//!
//! Usage:
//!   turf-runner --seed 12345 --db run.db
//!
//! Seeds a small referral chain, plays through a day of duels, heists
//! and market activity, and prints an end-of-run summary.

use anyhow::Result;
use chrono::Duration;
use std::env;
use std::sync::Arc;
use turf_core::{
    account::BuildingId,
    catalog::Catalog,
    clock::FixedClock,
    engine::GameEngine,
    store::LedgerStore,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str());

    println!("turf-runner");
    println!("  seed: {seed}");
    println!("  db:   {db}");
    println!();

    let store = if db == ":memory:" {
        LedgerStore::in_memory()?
    } else {
        LedgerStore::open(db)?
    };
    store.migrate()?;
    log::info!("ledger ready at {db}");

    let catalog = match data_dir {
        Some(dir) => Catalog::load(dir)?,
        None => Catalog::default_test(),
    };

    // A pinned clock we can fast-forward deterministically.
    let clock = Arc::new(FixedClock::at_unix(1_700_000_000));
    let mut engine = GameEngine::new(store, catalog, clock.clone(), seed);

    // Referral chain: boss <- capo <- runner.
    let boss = engine.register(None)?;
    let capo = engine.register(Some(&boss))?;
    let runner = engine.register(Some(&capo))?;

    // A day passes; everyone settles their passive production.
    clock.advance(Duration::hours(24));
    for id in [&boss, &capo, &runner] {
        let settled = engine.settle(id)?;
        println!("settled {id}: balance={}", settled.soft_balance);
    }

    // The runner claims, cascading a share up the chain.
    let claim = engine.claim(&runner)?;
    println!(
        "runner claimed {} (balance {})",
        claim.farmed, claim.soft_balance
    );

    // Some duels and a heist.
    for _ in 0..3 {
        match engine.duel(&capo, &boss, &[]) {
            Ok(duel) => println!(
                "capo duels boss: won={} reward={} ammo={}",
                duel.won, duel.reward, duel.ammo
            ),
            Err(err) => {
                println!("duel refused: {err}");
                break;
            }
        }
    }
    match engine.heist(&runner, "corner-store") {
        Ok(heist) => println!(
            "runner heist: won={} reward={} attempts_left={}",
            heist.won, heist.reward, heist.heists_left
        ),
        Err(err) => println!("heist refused: {err}"),
    }

    // Market round-trip.
    clock.advance(Duration::hours(2));
    engine.buy_stock(&boss, 50)?;
    let sale = engine.sell(&boss, 50)?;
    println!(
        "boss sold 50g: earnings={} raided={} stock={}",
        sale.earnings, sale.raided, sale.stock
    );

    // A deposit, possibly landing in a bonus window.
    let deposit = engine.deposit(&boss, 1_000)?;
    println!(
        "boss deposited 1000: credited={} bonus={:.1}%",
        deposit.credited,
        deposit.bonus_pct * 100.0
    );

    // Progression.
    match engine.upgrade_building(&boss, BuildingId::Safehouse) {
        Ok(level) => println!("boss safehouse now level {level}"),
        Err(err) => println!("upgrade refused: {err}"),
    }

    println!();
    println!("summary:");
    for id in [&boss, &capo, &runner] {
        let settled = engine.settle(id)?;
        println!("  {id}: balance={}", settled.soft_balance);
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
