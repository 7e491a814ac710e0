use rusqlite::Connection;
use sha2::{Digest, Sha256};

/// SHA-256 hex digest used for the mock credential list. This is not real
/// authentication; the store never leaves process memory.
pub fn password_digest(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Opens the process-local store. Everything lives in memory and is gone at
/// exit; a dashboard session owns exactly one of these.
pub fn open_memory_db() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            class_name TEXT NOT NULL,
            photo TEXT,
            face_descriptor TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute("CREATE INDEX idx_students_class ON students(class_name)", [])?;

    // Student name/roll are denormalized snapshots: records must outlive
    // roster deletions, so no foreign key on student_id.
    conn.execute(
        "CREATE TABLE attendance_records(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            status TEXT NOT NULL,
            method TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_attendance_date ON attendance_records(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_attendance_student_date ON attendance_records(student_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE assignments(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            deadline TEXT NOT NULL,
            marks INTEGER NOT NULL,
            priority TEXT NOT NULL,
            class_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    // Submissions are a placeholder for a future student-facing flow; nothing
    // inserts here yet, but the pending/graded filters count against it.
    conn.execute(
        "CREATE TABLE assignment_submissions(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            graded INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(assignment_id) REFERENCES assignments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_submissions_assignment ON assignment_submissions(assignment_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE classwork(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            class_name TEXT NOT NULL,
            deadline TEXT,
            mandatory INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE classwork_completions(
            id TEXT PRIMARY KEY,
            classwork_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            FOREIGN KEY(classwork_id) REFERENCES classwork(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_completions_classwork ON classwork_completions(classwork_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE activity_log(
            id TEXT PRIMARY KEY,
            message TEXT NOT NULL,
            icon TEXT NOT NULL,
            time TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE users(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            password_digest TEXT NOT NULL,
            role TEXT NOT NULL,
            role_id TEXT NOT NULL
        )",
        [],
    )?;

    seed_demo_users(&conn)?;

    Ok(conn)
}

// Demo accounts the login page advertises. Same pair every session.
fn seed_demo_users(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users(id, name, email, password_digest, role, role_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            uuid::Uuid::new_v4().to_string(),
            "John Doe",
            "student@example.com",
            password_digest("Student123"),
            "student",
            "STU001",
        ),
    )?;
    conn.execute(
        "INSERT INTO users(id, name, email, password_digest, role, role_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            uuid::Uuid::new_v4().to_string(),
            "Jane Smith",
            "admin@example.com",
            password_digest("Admin123"),
            "admin",
            "ADMIN001",
        ),
    )?;
    Ok(())
}
