//! Terminal front end for the relay console
//!
//! Drives the same engine the graphical console uses: login handshake,
//! daily check-in spin, profile and credit history.

use anyhow::Context;
use relay_core::Error;
use relay_engine::{ConsoleContext, IntervalFrames, SpinOutcome, SpinPhase};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_BASE_URL: &str = "https://relay.linux.do";

/// How long the login command waits for the browser flow to finish.
const LOGIN_WAIT: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("RELAY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let data_dir = std::env::var("RELAY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    let ctx = ConsoleContext::init(&data_dir, &base_url)
        .await
        .context("Failed to initialize console")?;

    match ctx.store().user() {
        Some(user) => println!("Restored session for {} ({} credits)", user.username, user.credits),
        None => println!("Not logged in. Type 'login' to start."),
    }
    println!("Commands: login, whoami, status, spin, history, logout, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => {}
            "login" => login(&ctx, &mut lines).await,
            "whoami" => whoami(&ctx),
            "status" => status(&ctx).await,
            "spin" => spin(&ctx).await,
            "history" => history(&ctx).await,
            "logout" => logout(&ctx).await,
            "quit" | "exit" => break,
            other => println!("Unknown command: {}", other),
        }
    }

    ctx.shutdown();
    Ok(())
}

/// Run the browser handshake by hand: open the printed URL, then paste the
/// completion message the finished login page posts to its opener.
async fn login(ctx: &ConsoleContext, lines: &mut Lines<BufReader<Stdin>>) {
    let bridge = ctx.auth_bridge();
    let (url, handshake) = bridge.initiate();
    println!("Open in a browser: {}", url);
    println!("Paste the completion message JSON here:");

    let deliver = async {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    let payload = match serde_json::from_str(&line) {
                        Ok(value) => value,
                        Err(_) => serde_json::Value::String(line),
                    };
                    match bridge.deliver(payload).await {
                        Ok(true) => return,
                        Ok(false) => println!("Not a login message, try again:"),
                        Err(e) => println!("Login failed: {}", e),
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => return,
            }
        }
    };

    tokio::select! {
        _ = deliver => {}
        _ = tokio::time::sleep(LOGIN_WAIT) => {
            println!("Login timed out");
            return;
        }
    }

    match handshake.wait_timeout(Duration::from_secs(5)).await {
        Ok(user) => println!("Logged in as {} ({} credits)", user.username, user.credits),
        Err(Error::LoginTimeout) => println!("Login timed out"),
        Err(e) => println!("Login failed: {}", e),
    }
}

fn whoami(ctx: &ConsoleContext) {
    match ctx.store().user() {
        Some(user) => println!(
            "{} (level {}, {} credits{})",
            user.username,
            user.level,
            user.credits,
            if user.is_admin() { ", admin" } else { "" }
        ),
        None => println!("Not logged in"),
    }
}

async fn status(ctx: &ConsoleContext) {
    let Some(mut engine) = ctx.check_in_engine() else {
        println!("Not logged in");
        return;
    };
    if let Err(e) = engine.load().await {
        println!("Failed to load check-in status: {}", e);
        return;
    }
    let Some(status) = engine.status() else {
        return;
    };
    if status.checked_in_today {
        match status.today_reward {
            Some(reward) => println!("Checked in today: +{} credits", reward),
            None => println!("Checked in today"),
        }
    } else {
        println!("Not checked in today");
    }
    println!("Streak: {} days, balance: {} credits", status.streak, status.credits);
    if let Some(config) = engine.config() {
        if config.current_multiplier < 100 {
            println!("Reward multiplier: {}%", config.current_multiplier);
        }
        for rule in &config.decay_rules {
            println!("  over {} credits: {}%", rule.threshold, rule.multiplier_percent);
        }
    }
}

async fn spin(ctx: &ConsoleContext) {
    let Some(mut engine) = ctx.check_in_engine() else {
        println!("Not logged in");
        return;
    };
    if let Err(e) = engine.load().await {
        println!("Failed to load check-in state: {}", e);
        return;
    }
    if engine.phase() == SpinPhase::AlreadyDone {
        println!("Already checked in today");
        return;
    }

    match engine.spin().await {
        Ok(SpinOutcome::Started) => {}
        Ok(SpinOutcome::AlreadyDone) => {
            println!("Already checked in today");
            return;
        }
        Ok(SpinOutcome::Ignored) => {
            warn!("Spin ignored despite idle phase");
            return;
        }
        Err(e) => {
            println!("Spin failed: {}", e);
            return;
        }
    }

    print!("Spinning");
    let _ = std::io::Write::flush(&mut std::io::stdout());
    let mut frames = IntervalFrames::new(30);
    let mut tick = 0u32;
    let result = engine
        .settle(&mut frames, |_| {
            tick += 1;
            if tick % 15 == 0 {
                print!(".");
                let _ = std::io::Write::flush(&mut std::io::stdout());
            }
        })
        .await;
    println!();

    match result {
        Some(reward) => {
            println!(
                "Landed on '{}': {} credits ({}% of {})",
                reward.label, reward.final_credits, reward.multiplier_percent, reward.base_credits
            );
            if let Some(status) = engine.status() {
                println!("Streak: {} days, balance: {} credits", status.streak, status.credits);
            }
        }
        None => println!("Animation interrupted"),
    }
}

async fn history(ctx: &ConsoleContext) {
    let Some(client) = ctx.client() else {
        println!("Not logged in");
        return;
    };
    match client.get_credit_history(1, 10).await {
        Ok(history) => {
            println!("{} transactions total", history.total);
            for tx in &history.items {
                println!(
                    "  {} {:+} {}",
                    tx.created_at.format("%Y-%m-%d %H:%M"),
                    tx.amount,
                    tx.reason
                );
            }
        }
        Err(e) => println!("Failed to fetch credit history: {}", e),
    }
}

async fn logout(ctx: &ConsoleContext) {
    match ctx.store().clear().await {
        Ok(()) => println!("Logged out"),
        Err(e) => println!("Logout failed: {}", e),
    }
}
