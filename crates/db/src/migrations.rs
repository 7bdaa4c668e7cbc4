/// Inline SQL migrations for the rollcall database schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained. One statement per entry.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: members table
    r#"
CREATE TABLE IF NOT EXISTS members (
    id              INTEGER PRIMARY KEY,
    org_id          TEXT NOT NULL,
    member_number   TEXT,
    name            TEXT,
    surname         TEXT,
    national_id     TEXT,
    email           TEXT,
    phone           TEXT,
    birth_date      TEXT,
    hashed_password TEXT,
    other           TEXT NOT NULL DEFAULT '{}',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
"#,
    // Migration 2: one member per identifier within an organization
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_members_org_number ON members(org_id, member_number) WHERE member_number IS NOT NULL;"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_members_org_email ON members(org_id, email) WHERE email IS NOT NULL;"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_members_org_national_id ON members(org_id, national_id) WHERE national_id IS NOT NULL;"#,
    // Migration 3: completed jobs
    r#"
CREATE TABLE IF NOT EXISTS jobs (
    job_id       TEXT PRIMARY KEY,
    job_type     TEXT NOT NULL,
    org_id       TEXT NOT NULL,
    total        INTEGER NOT NULL,
    added        INTEGER NOT NULL,
    errors       TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL,
    completed_at TEXT,
    completed    BOOLEAN NOT NULL DEFAULT 0
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_org_created ON jobs(org_id, created_at DESC);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_org_type ON jobs(org_id, job_type);"#,
];
