//! SQL schema for the procurement SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Seeded from the status enumeration at startup.
CREATE TABLE IF NOT EXISTS statuses (
    status_id   INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS servers (
    server_id INTEGER PRIMARY KEY,
    person_id INTEGER NOT NULL UNIQUE,
    name      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requesters (
    requester_id    INTEGER PRIMARY KEY,
    server_id       INTEGER NOT NULL UNIQUE REFERENCES servers(server_id),
    department_id   INTEGER NOT NULL,
    department_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS catalog_items (
    item_id         INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    active          INTEGER NOT NULL DEFAULT 1,
    reference_price TEXT NOT NULL      -- decimal text
);

-- Never deleted; terminal statuses are kept for the audit trail.
CREATE TABLE IF NOT EXISTS solicitations (
    solicitation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id     TEXT UNIQUE,       -- set in the creating transaction
    created_at      TEXT NOT NULL,     -- RFC 3339 UTC, fixed width
    status_id       INTEGER NOT NULL REFERENCES statuses(status_id),
    requester_id    INTEGER NOT NULL REFERENCES requesters(requester_id),
    variant         TEXT NOT NULL,     -- 'general' | 'patrimonial'
    justification   TEXT,              -- general variant only
    version         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS solicitation_items (
    solicitation_id INTEGER NOT NULL REFERENCES solicitations(solicitation_id),
    item_id         INTEGER NOT NULL REFERENCES catalog_items(item_id),
    position        INTEGER NOT NULL,
    quantity        INTEGER NOT NULL CHECK (quantity > 0),
    unit_value      TEXT NOT NULL,     -- decimal text, captured on insertion
    justification   TEXT,
    PRIMARY KEY (solicitation_id, item_id)
);

-- Strictly append-only.
CREATE TABLE IF NOT EXISTS audit_events (
    event_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    solicitation_id INTEGER NOT NULL REFERENCES solicitations(solicitation_id),
    recorded_at     TEXT NOT NULL,
    actor_id        INTEGER NOT NULL,
    action          TEXT NOT NULL,     -- 'creation' | 'edit' | 'status_change' | 'cancellation'
    details         TEXT NOT NULL,
    observations    TEXT
);

CREATE TRIGGER IF NOT EXISTS audit_events_no_update
BEFORE UPDATE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_events_no_delete
BEFORE DELETE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit events are append-only');
END;

CREATE INDEX IF NOT EXISTS solicitations_requester_idx ON solicitations(requester_id);
CREATE INDEX IF NOT EXISTS solicitations_created_idx   ON solicitations(created_at);
CREATE INDEX IF NOT EXISTS audit_events_subject_idx    ON audit_events(solicitation_id);

PRAGMA user_version = 1;
";
