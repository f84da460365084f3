use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Accounts. Email is the identity (primary lookup key).
        -- entitlement moves standard -> pending -> pro, or pending -> standard
        -- on manual rejection; mutated only through the reconciliation engine.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            entitlement TEXT NOT NULL DEFAULT 'standard'
                CHECK (entitlement IN ('standard', 'pending', 'pro')),
            entitlement_source_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        -- Purchase attempts. One row per client "signal paid" action.
        -- approved is terminal; the most recent approved order per user is
        -- the invoice source of truth.
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'submitted'
                CHECK (status IN ('submitted', 'approved', 'rejected')),
            claimed_signal_token TEXT NOT NULL,
            gateway_reference TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at DESC);

        -- Replay ledger for gateway webhooks. Processing is idempotent keyed
        -- by the gateway object id: the first insert wins, replays no-op.
        CREATE TABLE IF NOT EXISTS webhook_events (
            provider TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (provider, event_id)
        );

        -- Scam registry. User reports land with a default risk score and the
        -- 'Reported' city tag until reviewed.
        CREATE TABLE IF NOT EXISTS scam_registry (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            identifier TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            risk_score INTEGER NOT NULL,
            city_tag TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scam_identifier ON scam_registry(identifier);

        -- OTP verification sessions. One row per email; expiry is absolute
        -- and enforced at read time (no background sweep).
        CREATE TABLE IF NOT EXISTS otp_sessions (
            email TEXT PRIMARY KEY,
            code_hash TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );
        "#,
    )
}
