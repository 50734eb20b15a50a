//! Database schema management for `stormsight`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).
//! The record store owns these tables in production; creating them here
//! keeps fresh environments usable.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Safe to call on every startup; no-op if objects already exist.
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Raw meteorological events, read-only to this service
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_events (
            id                 UUID PRIMARY KEY,
            event_type         TEXT        NOT NULL,
            severity           TEXT        NOT NULL,
            occurred_at        TIMESTAMPTZ NOT NULL,
            latitude           DOUBLE PRECISION,
            longitude          DOUBLE PRECISION,
            hail_diameter_in   DOUBLE PRECISION,
            wind_speed_mph     DOUBLE PRECISION,
            affected_customers BIGINT      NOT NULL DEFAULT 0,
            estimated_damage   DOUBLE PRECISION NOT NULL DEFAULT 0,
            city               TEXT,
            county             TEXT,
            state              TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id        UUID PRIMARY KEY,
            full_name TEXT    NOT NULL,
            role      TEXT    NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS push_subscriptions (
            id       UUID PRIMARY KEY,
            user_id  UUID NOT NULL REFERENCES users (id),
            endpoint TEXT NOT NULL,
            p256dh   TEXT NOT NULL,
            auth     TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id        UUID PRIMARY KEY,
            full_name TEXT NOT NULL,
            phone     TEXT,
            city      TEXT,
            state     TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Audit trail for notify dispatches
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storm_activity (
            id              BIGSERIAL PRIMARY KEY,
            created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            severity        TEXT        NOT NULL,
            affected_states TEXT[]      NOT NULL,
            attempted       BIGINT      NOT NULL,
            delivered       BIGINT      NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Basic indexes for the hot query paths
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_events_occurred_at
            ON weather_events (occurred_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_events_state
            ON weather_events (state);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_push_subscriptions_user_id
            ON push_subscriptions (user_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_customers_state
            ON customers (state);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
