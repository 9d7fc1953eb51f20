use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const NOTE_COLUMNS: &str = "id, patient_id, author_id, source_type, text, tags, ocr_confidence,
     file_path, file_mime, checksum, created_at";

struct NoteRow {
    id: i64,
    patient_id: String,
    author_id: String,
    source_type: String,
    text: String,
    tags: Option<String>,
    ocr_confidence: Option<f64>,
    file_path: Option<String>,
    file_mime: Option<String>,
    checksum: Option<String>,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        author_id: row.get(2)?,
        source_type: row.get(3)?,
        text: row.get(4)?,
        tags: row.get(5)?,
        ocr_confidence: row.get(6)?,
        file_path: row.get(7)?,
        file_mime: row.get(8)?,
        checksum: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn note_from_row(row: NoteRow) -> Result<Note, DatabaseError> {
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::ConstraintViolation(format!(
                "Invalid created_at for note {}: {e}",
                row.id
            ))
        })?;

    Ok(Note {
        id: row.id,
        patient_id: row.patient_id,
        author_id: row.author_id,
        source_type: SourceType::from_str(&row.source_type)?,
        text: row.text,
        tags: split_tags(row.tags.as_deref()),
        ocr_confidence: row.ocr_confidence,
        file_path: row.file_path,
        file_mime: row.file_mime,
        checksum: row.checksum,
        created_at,
    })
}

/// Fixed-width UTC timestamp so lexical order matches chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Insert a note, assigning its id and creation timestamp.
pub fn insert_note(conn: &Connection, note: &NewNote) -> Result<Note, DatabaseError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO notes (patient_id, author_id, source_type, text, tags, ocr_confidence,
         file_path, file_mime, checksum, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            note.patient_id,
            note.author_id,
            note.source_type.as_str(),
            note.text,
            join_tags(&note.tags),
            note.ocr_confidence,
            note.file_path,
            note.file_mime,
            note.checksum,
            format_timestamp(&created_at),
        ],
    )?;
    let id = conn.last_insert_rowid();

    get_note(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Note".into(),
        id: id.to_string(),
    })
}

pub fn get_note(conn: &Connection, id: i64) -> Result<Option<Note>, DatabaseError> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], read_row)
        .optional()?;
    row.map(note_from_row).transpose()
}

/// List notes newest first. `limit` is clamped to 1..=100.
pub fn list_notes(conn: &Connection, filter: &NoteFilter) -> Result<Vec<Note>, DatabaseError> {
    let sql = format!(
        "SELECT {NOTE_COLUMNS} FROM notes
         WHERE (?1 IS NULL OR patient_id = ?1)
           AND (?2 IS NULL OR source_type = ?2)
           AND (?3 IS NULL OR text LIKE ?3 ESCAPE '\\' OR tags LIKE ?3 ESCAPE '\\')
         ORDER BY created_at DESC, id DESC
         LIMIT ?4 OFFSET ?5"
    );

    let pattern = filter
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));
    let limit = filter.limit.clamp(1, MAX_LIST_LIMIT);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            filter.patient_id.as_deref().filter(|p| !p.is_empty()),
            filter.source_type.map(|s| s.as_str()),
            pattern,
            limit,
            filter.offset,
        ],
        read_row,
    )?;

    let mut notes = Vec::new();
    for row in rows {
        notes.push(note_from_row(row?)?);
    }
    Ok(notes)
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
