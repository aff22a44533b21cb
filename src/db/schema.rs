pub const SCHEMA: &str = r#"
-- subscriptions table
CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    track_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    last_probed_at TEXT,
    UNIQUE(owner_id, url)
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_owner_id ON subscriptions(owner_id);

-- videos table (seen-set, scoped per subscription)
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subscription_id INTEGER NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    description TEXT,
    author TEXT,
    observed_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(subscription_id, url)
);

CREATE INDEX IF NOT EXISTS idx_videos_subscription_id ON videos(subscription_id);
CREATE INDEX IF NOT EXISTS idx_videos_url ON videos(url);
"#;
