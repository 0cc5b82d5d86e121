use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_core::args;
use relay_core::{DispatcherBuilder, InMemoryScope, RelayConfig, TaskContext, TaskError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Car {
    brand: String,
    year: i32,
}

async fn hello(_ctx: TaskContext, name: String) -> Result<(), TaskError> {
    println!("Hello, {name}!");
    Ok(())
}

async fn inspect(_ctx: TaskContext, car: Car, mileage: u32) -> Result<(), TaskError> {
    if mileage > 200_000 {
        return Err(format!("{} ({}) is worn out: {mileage} km", car.brand, car.year).into());
    }
    println!("{} ({}) looks fine", car.brand, car.year);
    Ok(())
}

/// RELAY_CONFIG があればそのファイル、なければデフォルト + 環境変数
fn load_config() -> anyhow::Result<RelayConfig> {
    match std::env::var("RELAY_CONFIG") {
        Ok(path) => RelayConfig::from_file(&path).with_context(|| format!("loading {path}")),
        Err(_) => Ok(RelayConfig::from_env()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    info!(?config, "loaded config");

    // (A) 最初の 2 回は失敗する "flaky" タスク
    let remaining_failures = Arc::new(AtomicU32::new(2));
    let flaky = {
        let remaining = Arc::clone(&remaining_failures);
        move |_ctx: TaskContext, attempt: u32| {
            let remaining = Arc::clone(&remaining);
            async move {
                let left = remaining.load(Ordering::Relaxed);
                if left > 0 {
                    remaining.fetch_sub(1, Ordering::Relaxed);
                    return Err::<(), TaskError>(
                        format!("intentional failure (attempt={attempt}, left={left})").into(),
                    );
                }
                println!("flaky succeeded on attempt {attempt}");
                Ok(())
            }
        }
    };

    // (B) Dispatcher を構築
    let scope = Arc::new(InMemoryScope::new());
    let dispatcher = DispatcherBuilder::new()
        .register(hello)?
        .register(inspect)?
        .register_as("demo.flaky", flaky)?
        .expect_tasks(&["demo.flaky"])
        .config(config)
        .metrics_scope(scope.clone())
        .build()?;

    // (C) consume loop を起動し、結果を別タスクで受け取る
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut results = dispatcher.start(stop_rx)?;
    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<()>(1);
    let reporter = tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            match result {
                Ok(()) => info!("task succeeded"),
                Err(err) => warn!(error = %err, "task failed"),
            }
            let _ = done_tx.send(()).await;
        }
    });

    // (D) タスク投入
    let ctx = TaskContext::background();
    dispatcher
        .enqueue(&hello, ctx.clone(), args!["relay".to_string()])
        .await?;
    dispatcher
        .enqueue(
            &inspect,
            ctx.clone(),
            args![
                Car {
                    brand: "infinity".into(),
                    year: 2017,
                },
                250_000u32
            ],
        )
        .await?;
    for attempt in 1..=3u32 {
        dispatcher
            .enqueue_named("demo.flaky", ctx.clone(), args![attempt])
            .await?;
    }

    // 引数の型が違う enqueue は publish 前に弾かれる
    if let Err(err) = dispatcher.enqueue(&hello, ctx.clone(), args![42u32]).await {
        warn!(error = %err, "rejected enqueue");
    }

    // (E) 5 件分の結果を待ってから停止
    for _ in 0..5 {
        done_rx.recv().await.context("result reporter exited early")?;
    }
    let _ = stop_tx.send(true);
    reporter.await?;

    let report = scope.snapshot().report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
