//! Database schema and migrations for StudyOlle.
//!
//! Migrations are applied in order; `schema_version` records which ones ran.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: accounts and their preference joins
    r#"
CREATE TABLE accounts (
    id                                  INTEGER PRIMARY KEY AUTOINCREMENT,
    email                               TEXT NOT NULL UNIQUE,
    nickname                            TEXT NOT NULL UNIQUE,
    password                            TEXT NOT NULL,           -- Argon2 PHC string
    email_verified                      BOOLEAN NOT NULL DEFAULT 0,
    email_check_token                   TEXT,
    email_check_token_generated_at      TEXT,
    joined_at                           TEXT,
    bio                                 TEXT,
    url                                 TEXT,
    occupation                          TEXT,
    location                            TEXT,
    profile_image                       TEXT,
    study_created_by_email              BOOLEAN NOT NULL DEFAULT 0,
    study_created_by_web                BOOLEAN NOT NULL DEFAULT 1,
    study_enrollment_result_by_email    BOOLEAN NOT NULL DEFAULT 0,
    study_enrollment_result_by_web      BOOLEAN NOT NULL DEFAULT 1,
    study_updated_by_email              BOOLEAN NOT NULL DEFAULT 0,
    study_updated_by_web                BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE tags (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    title   TEXT NOT NULL UNIQUE
);

CREATE TABLE zones (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    city                TEXT NOT NULL,
    local_name_of_city  TEXT NOT NULL,
    province            TEXT NOT NULL,
    UNIQUE(city, province)
);

CREATE TABLE account_tags (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id  INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    tag_id      INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    UNIQUE(account_id, tag_id)
);

CREATE TABLE account_zones (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id  INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    zone_id     INTEGER NOT NULL REFERENCES zones(id) ON DELETE CASCADE,
    UNIQUE(account_id, zone_id)
);

CREATE INDEX idx_account_tags_account_id ON account_tags(account_id);
CREATE INDEX idx_account_zones_account_id ON account_zones(account_id);
"#,
    // v2: studies, events and enrollments
    r#"
CREATE TABLE studies (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    path                TEXT NOT NULL UNIQUE,
    title               TEXT NOT NULL,
    short_description   TEXT NOT NULL,
    full_description    TEXT,
    manager_id          INTEGER NOT NULL REFERENCES accounts(id),
    created_at          TEXT NOT NULL
);

CREATE TABLE events (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id                INTEGER NOT NULL REFERENCES studies(id) ON DELETE CASCADE,
    created_by              INTEGER NOT NULL REFERENCES accounts(id),
    title                   TEXT NOT NULL,
    description             TEXT,
    created_at              TEXT NOT NULL,
    end_enrollment_at       TEXT NOT NULL,
    start_at                TEXT NOT NULL,
    end_at                  TEXT NOT NULL,
    limit_of_enrollments    INTEGER,
    event_type              TEXT NOT NULL DEFAULT 'FCFS'  -- 'FCFS' or 'CONFIRMATIVE'
);

CREATE TABLE enrollments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    account_id  INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    enrolled_at TEXT NOT NULL,
    accepted    BOOLEAN NOT NULL DEFAULT 0,
    attended    BOOLEAN NOT NULL DEFAULT 0,
    UNIQUE(event_id, account_id)
);

CREATE INDEX idx_events_study_id ON events(study_id);
CREATE INDEX idx_enrollments_event_id ON enrollments(event_id);
"#,
];
