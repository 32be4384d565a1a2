use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::model::{Reading, TestType};

/// Column order of the persisted reading log. Downstream consumers key on
/// this exact header.
pub const CSV_HEADER: &str =
    "timestamp,predicted_level,confidence,unit,test_type,explanation,image_name";

#[derive(Default)]
struct Sequences {
    ammonia: Vec<Reading>,
    nitrite: Vec<Reading>,
    ph: Vec<Reading>,
}

impl Sequences {
    fn for_type(&self, test_type: TestType) -> &Vec<Reading> {
        match test_type {
            TestType::Ammonia => &self.ammonia,
            TestType::Nitrite => &self.nitrite,
            TestType::Ph => &self.ph,
        }
    }

    fn for_type_mut(&mut self, test_type: TestType) -> &mut Vec<Reading> {
        match test_type {
            TestType::Ammonia => &mut self.ammonia,
            TestType::Nitrite => &mut self.nitrite,
            TestType::Ph => &mut self.ph,
        }
    }

    /// All readings in the fixed persistence order: ammonia, nitrite, pH.
    fn combined(&self) -> impl Iterator<Item = &Reading> {
        self.ammonia
            .iter()
            .chain(self.nitrite.iter())
            .chain(self.ph.iter())
    }
}

/// Append-only reading log, one ordered in-memory sequence per test type,
/// persisted as a single CSV file rewritten in full on every save.
///
/// Cheap to clone; clones share the same sequences and file.
#[derive(Clone)]
pub struct ReadingStore {
    inner: Arc<Mutex<Sequences>>,
    path: PathBuf,
}

impl ReadingStore {
    /// Open a store backed by `path`. Rows already persisted there are
    /// loaded back in so later saves keep them.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mut seqs = Sequences::default();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read reading log {}", path.display()))?;
            for reading in parse_csv(&raw) {
                seqs.for_type_mut(reading.test_type).push(reading);
            }
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(seqs)),
            path,
        })
    }

    /// Append `reading` to its test type's sequence, then rewrite the log
    /// file from the full in-memory state. The append survives a failed
    /// save; saving again (with the next record) retries it.
    pub fn record(&self, reading: Reading) -> anyhow::Result<()> {
        let mut seqs = self.inner.lock().unwrap();
        seqs.for_type_mut(reading.test_type).push(reading);
        self.persist(&seqs)
    }

    /// Snapshot of one test type's in-memory sequence, oldest first.
    pub fn readings(&self, test_type: TestType) -> Vec<Reading> {
        self.inner.lock().unwrap().for_type(test_type).clone()
    }

    pub fn len(&self, test_type: TestType) -> usize {
        self.inner.lock().unwrap().for_type(test_type).len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, seqs: &Sequences) -> anyhow::Result<()> {
        let csv = render_csv(seqs.combined());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to stage reading log in {}", dir.display()))?;
        staged
            .write_all(csv.as_bytes())
            .context("failed to write reading log")?;
        staged.persist(&self.path).map_err(|e| {
            anyhow::anyhow!(
                "failed to replace reading log {}: {}",
                self.path.display(),
                e.error
            )
        })?;
        Ok(())
    }
}

/// Render readings as the flat tabular surface, header included.
pub fn render_csv<'a>(readings: impl IntoIterator<Item = &'a Reading>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for reading in readings {
        out.push_str(&render_row(reading));
        out.push('\n');
    }
    out
}

fn render_row(r: &Reading) -> String {
    [
        escape(&r.timestamp),
        r.predicted_level.to_string(),
        r.confidence.to_string(),
        escape(&r.unit),
        r.test_type.as_str().to_string(),
        escape(&r.explanation),
        escape(&r.image_name),
    ]
    .join(",")
}

/// Minimal CSV quoting: only fields holding a separator, quote or line
/// break get wrapped.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse the persisted surface back into readings. Rows that no longer
/// fit the contract are skipped with a warning rather than failing the
/// open.
fn parse_csv(raw: &str) -> Vec<Reading> {
    let mut out = Vec::new();
    for (idx, record) in split_records(raw).into_iter().enumerate() {
        if idx == 0 && record.first().map(String::as_str) == Some("timestamp") {
            continue;
        }
        match reading_from_record(&record) {
            Some(reading) => out.push(reading),
            None => tracing::warn!(row = idx + 1, "skipping malformed reading log row"),
        }
    }
    out
}

fn reading_from_record(fields: &[String]) -> Option<Reading> {
    if fields.len() != 7 {
        return None;
    }
    Some(Reading {
        timestamp: fields[0].clone(),
        predicted_level: fields[1].parse().ok()?,
        confidence: fields[2].parse().ok()?,
        unit: fields[3].clone(),
        test_type: TestType::parse(&fields[4])?,
        explanation: fields[5].clone(),
        image_name: fields[6].clone(),
    })
}

/// Split the raw file into records of unquoted field values. Quoted
/// fields may span lines.
fn split_records(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    fields.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut fields));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(test_type: TestType, level: f64, confidence: f64, unit: &str) -> Reading {
        Reading {
            timestamp: "2026-08-07 10:00:00".into(),
            predicted_level: level,
            confidence,
            unit: unit.into(),
            test_type,
            explanation: "clear match".into(),
            image_name: "tube.jpg".into(),
        }
    }

    #[test]
    fn record_appends_and_rewrites_the_file() {
        let dir = tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();

        store
            .record(sample(TestType::Ph, 7.2, 90.0, "pH"))
            .unwrap();
        store
            .record(sample(TestType::Ammonia, 0.5, 80.0, "mg/L"))
            .unwrap();

        assert_eq!(store.len(TestType::Ph), 1);
        assert_eq!(store.len(TestType::Ammonia), 1);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        // Persistence order is fixed: ammonia rows precede pH rows even
        // though the pH reading arrived first.
        assert!(lines[1].contains(",ammonia,"));
        assert!(lines[2].contains(",ph,"));
        assert!(lines[2].contains(",pH,"));
    }

    #[test]
    fn ph_rows_keep_the_fixed_unit() {
        let dir = tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("readings.csv")).unwrap();
        store
            .record(sample(TestType::Ph, 7.2, 90.0, "pH"))
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let last = raw.lines().last().unwrap();
        assert_eq!(last, "2026-08-07 10:00:00,7.2,90,pH,ph,clear match,tube.jpg");
    }

    #[test]
    fn quoted_fields_round_trip_through_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");

        let mut tricky = sample(TestType::Nitrite, 1.0, 60.0, "mg/L");
        tricky.explanation = "pink, almost \"magenta\"\nhard to tell".into();
        let store = ReadingStore::open(&path).unwrap();
        store.record(tricky.clone()).unwrap();
        store
            .record(sample(TestType::Ammonia, 3.0, 70.0, "mg/L"))
            .unwrap();

        let reopened = ReadingStore::open(&path).unwrap();
        assert_eq!(reopened.readings(TestType::Nitrite), vec![tricky]);
        assert_eq!(reopened.len(TestType::Ammonia), 1);
    }

    #[test]
    fn reload_survives_a_second_process_appending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");

        let first = ReadingStore::open(&path).unwrap();
        first
            .record(sample(TestType::Ammonia, 0.5, 80.0, "mg/L"))
            .unwrap();

        let second = ReadingStore::open(&path).unwrap();
        second
            .record(sample(TestType::Ammonia, 1.0, 75.0, "mg/L"))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 3);
    }

    #[test]
    fn failed_save_keeps_the_in_memory_append() {
        let dir = tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("missing/readings.csv")).unwrap();

        let err = store.record(sample(TestType::Nitrite, 1.0, 60.0, "mg/L"));
        assert!(err.is_err());
        assert_eq!(store.len(TestType::Nitrite), 1);
    }

    #[test]
    fn malformed_rows_are_skipped_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        std::fs::write(
            &path,
            format!("{CSV_HEADER}\nnot,a,reading\n2026-08-07 10:00:00,0.5,80,mg/L,ammonia,ok,a.jpg\n"),
        )
        .unwrap();

        let store = ReadingStore::open(&path).unwrap();
        assert_eq!(store.len(TestType::Ammonia), 1);
        assert_eq!(store.len(TestType::Nitrite), 0);
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
