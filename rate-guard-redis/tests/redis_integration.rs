//! Exercises the Lua programs against a real Redis instance.
//!
//! Run with: `cargo test -p rate-guard-redis -- --ignored`

use rate_guard_core::{KvArg, KvExecutor, Program};
use rate_guard_redis::{RedisConfig, RedisKvExecutor, RedisPoolBuilder};

async fn connect() -> RedisKvExecutor {
    let config = RedisConfig::from_env().build();
    let pool = RedisPoolBuilder::new(config)
        .build()
        .await
        .expect("redis must be reachable for this test");
    RedisKvExecutor::new(pool)
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn token_bucket_admits_then_denies() {
    let kv = connect().await;
    let args = vec![KvArg::Int(3), KvArg::Real(1.0), KvArg::Int(1), KvArg::Str("0.000000".into())];

    for _ in 0..3 {
        let result = kv.eval(Program::TokenBucket, &["it:tb"], &args).await.unwrap();
        assert_eq!(result[0].as_i64().unwrap(), 1);
    }
    let denied = kv.eval(Program::TokenBucket, &["it:tb"], &args).await.unwrap();
    assert_eq!(denied[0].as_i64().unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn fixed_window_counts_atomically() {
    let kv = connect().await;
    let args = vec![KvArg::Int(60)];

    let r1 = kv.eval(Program::FixedWindow, &["it:fw:0"], &args).await.unwrap();
    let r2 = kv.eval(Program::FixedWindow, &["it:fw:0"], &args).await.unwrap();
    assert_eq!(r1[0].as_i64().unwrap(), 1);
    assert_eq!(r2[0].as_i64().unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn sliding_window_evicts_outside_interval() {
    let kv = connect().await;
    let args = vec![
        KvArg::Str("-10.000000".into()),
        KvArg::Str("0.000000".into()),
        KvArg::Int(1),
        KvArg::Str("req-1".into()),
        KvArg::Int(10),
    ];
    let r1 = kv.eval(Program::SlidingWindow, &["it:sw"], &args).await.unwrap();
    assert_eq!(r1[0].as_i64().unwrap(), 1);

    let args2 = vec![
        KvArg::Str("-10.000000".into()),
        KvArg::Str("1.000000".into()),
        KvArg::Int(1),
        KvArg::Str("req-2".into()),
        KvArg::Int(10),
    ];
    let r2 = kv.eval(Program::SlidingWindow, &["it:sw"], &args2).await.unwrap();
    assert_eq!(r2[0].as_i64().unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn introspection_reads_hash_and_zset() {
    let kv = connect().await;
    let args = vec![KvArg::Int(5), KvArg::Real(1.0), KvArg::Int(1), KvArg::Str("0.000000".into())];
    kv.eval(Program::TokenBucket, &["it:introspect:tb"], &args).await.unwrap();

    let fields = kv.hash_read_all("it:introspect:tb").await.unwrap();
    assert_eq!(fields.get("tokens").unwrap(), "4");
}
