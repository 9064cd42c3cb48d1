// Persistence boundary: the engine hands a full snapshot of its state to a sink
// after every mutation. The sink decides how (and whether) it is stored.

use crate::catalog::{CatalogError, Category, Unit};
use crate::guest::Guest;
use crate::reservation::{nights, Reservation, ReservationStatus};
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const ROOMS_FILE: &str = "rooms.txt";
pub const BOOKINGS_FILE: &str = "bookings.txt";
pub const CUSTOMERS_FILE: &str = "customers.txt";
pub const SNAPSHOT_JSON_FILE: &str = "snapshot.json";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Reservation references unknown unit {0}")]
    UnknownUnit(u32),

    #[error("Snapshot write rejected: {0}")]
    Rejected(String),
}

// Full copy of the engine state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub units: Vec<Unit>,
    pub reservations: Vec<Reservation>,
    pub guests: Vec<Guest>,
}

impl Snapshot {
    // Contents of rooms.txt
    pub fn units_text(&self) -> Result<String, PersistenceError> {
        encode_records(self.units.iter().map(unit_record))
    }

    // Contents of bookings.txt
    pub fn reservations_text(&self) -> Result<String, PersistenceError> {
        encode_records(self.reservations.iter().map(reservation_record))
    }

    // Contents of customers.txt
    pub fn guests_text(&self) -> Result<String, PersistenceError> {
        encode_records(self.guests.iter().map(guest_record))
    }

    // Rebuild a snapshot from the three pipe-delimited record sets.
    // Guests and units are parsed first since reservation records refer to them.
    pub fn from_texts(
        units_text: &str,
        reservations_text: &str,
        guests_text: &str,
    ) -> Result<Self, PersistenceError> {
        let units = decode_records(units_text)?
            .iter()
            .map(parse_unit_record)
            .collect::<Result<Vec<_>, _>>()?;
        let guests = decode_records(guests_text)?
            .iter()
            .map(parse_guest_record)
            .collect::<Result<Vec<_>, _>>()?;
        let reservations = decode_records(reservations_text)?
            .iter()
            .map(|record| parse_reservation_record(record, &units, &guests))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            units,
            reservations,
            guests,
        })
    }
}

// Fields are only quoted when they contain the delimiter, a quote or a line
// break, so ordinary records read exactly `a|b|c`
fn encode_records(
    records: impl IntoIterator<Item = Vec<String>>,
) -> Result<String, PersistenceError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for record in records {
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| {
        PersistenceError::IoError(std::io::Error::new(e.error().kind(), e.to_string()))
    })?;
    String::from_utf8(bytes).map_err(|e| PersistenceError::MalformedRecord(e.to_string()))
}

fn decode_records(text: &str) -> Result<Vec<StringRecord>, PersistenceError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok(records)
}

// id|category_name|bookable
pub fn unit_record(unit: &Unit) -> Vec<String> {
    vec![
        unit.id.to_string(),
        unit.category.name().to_string(),
        unit.bookable.to_string(),
    ]
}

// id|guest_phone|unit_id|check_in|check_out|status
pub fn reservation_record(reservation: &Reservation) -> Vec<String> {
    vec![
        reservation.id.to_string(),
        reservation.guest.phone.clone(),
        reservation.unit_id.to_string(),
        reservation.check_in.format(DATE_FORMAT).to_string(),
        reservation.check_out.format(DATE_FORMAT).to_string(),
        reservation.status.name().to_string(),
    ]
}

// name|phone|email
pub fn guest_record(guest: &Guest) -> Vec<String> {
    vec![guest.name.clone(), guest.phone.clone(), guest.email.clone()]
}

fn fields<const N: usize>(record: &StringRecord) -> Result<[&str; N], PersistenceError> {
    let parts: Vec<&str> = record.iter().collect();
    <[&str; N]>::try_from(parts).map_err(|parts| {
        PersistenceError::MalformedRecord(format!(
            "expected {} fields, found {} in {:?}",
            N,
            parts.len(),
            record
        ))
    })
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    record: &StringRecord,
) -> Result<T, PersistenceError> {
    value.trim().parse().map_err(|_| {
        PersistenceError::MalformedRecord(format!("bad number {:?} in {:?}", value, record))
    })
}

fn parse_date(value: &str, record: &StringRecord) -> Result<NaiveDate, PersistenceError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        PersistenceError::MalformedRecord(format!("bad date {:?} in {:?}: {}", value, record, e))
    })
}

pub fn parse_unit_record(record: &StringRecord) -> Result<Unit, PersistenceError> {
    let [id, category, bookable] = fields::<3>(record)?;
    let bookable = match bookable.trim() {
        "true" => true,
        "false" => false,
        other => {
            return Err(PersistenceError::MalformedRecord(format!(
                "bad bookable flag {:?} in {:?}",
                other, record
            )))
        }
    };

    Ok(Unit {
        id: parse_number(id, record)?,
        category: category.parse::<Category>()?,
        bookable,
    })
}

pub fn parse_guest_record(record: &StringRecord) -> Result<Guest, PersistenceError> {
    let [name, phone, email] = fields::<3>(record)?;
    Ok(Guest::new(name, phone, email))
}

// The charge is not persisted; it is derived again from the unit's category rate.
// The first registered guest with the matching phone is attached. Booking does
// not register guests, so an unmatched phone gets a guest carrying only the phone.
pub fn parse_reservation_record(
    record: &StringRecord,
    units: &[Unit],
    guests: &[Guest],
) -> Result<Reservation, PersistenceError> {
    let [id, phone, unit_id, check_in, check_out, status] = fields::<6>(record)?;

    let unit_id: u32 = parse_number(unit_id, record)?;
    let unit = units
        .iter()
        .find(|u| u.id == unit_id)
        .ok_or(PersistenceError::UnknownUnit(unit_id))?;
    let guest = guests
        .iter()
        .find(|g| g.phone == phone)
        .cloned()
        .unwrap_or_else(|| Guest::new("", phone, ""));
    let status = ReservationStatus::from_name(status).ok_or_else(|| {
        PersistenceError::MalformedRecord(format!("bad status {:?} in {:?}", status, record))
    })?;
    let check_in = parse_date(check_in, record)?;
    let check_out = parse_date(check_out, record)?;

    Ok(Reservation {
        id: parse_number(id, record)?,
        guest,
        unit_id,
        check_in,
        check_out,
        total_charge: nights(check_in, check_out) * unit.rate(),
        status,
    })
}

// Port the engine writes snapshots to
pub trait SnapshotSink: Send {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

// Keeps the latest snapshot in memory. Clones share the same state, so a test
// can hand one clone to the engine and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    state: Arc<Mutex<MemoryState>>,
    fail_writes: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last: Option<Snapshot>,
    writes: usize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.state.lock().last.clone()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    // Makes subsequent writes fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SnapshotSink for MemorySnapshotStore {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected(
                "memory store is failing writes".to_string(),
            ));
        }

        let mut state = self.state.lock();
        state.last = Some(snapshot.clone());
        state.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFormat {
    // rooms.txt, bookings.txt and customers.txt, one record per line
    #[default]
    Pipe,
    // a single snapshot.json
    Json,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub directory: PathBuf,
    pub format: StoreFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: StoreFormat::Pipe,
        }
    }
}

// Writes snapshots to files in a directory, overwriting the previous snapshot
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    config: StoreConfig,
}

impl FileSnapshotStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    // Load the last written snapshot. Missing files read as empty, so a fresh
    // directory yields an empty snapshot.
    pub fn load(&self) -> Result<Snapshot, PersistenceError> {
        match self.config.format {
            StoreFormat::Pipe => {
                let units = self.read_optional(ROOMS_FILE)?;
                let reservations = self.read_optional(BOOKINGS_FILE)?;
                let guests = self.read_optional(CUSTOMERS_FILE)?;
                Snapshot::from_texts(&units, &reservations, &guests)
            }
            StoreFormat::Json => {
                let content = self.read_optional(SNAPSHOT_JSON_FILE)?;
                if content.trim().is_empty() {
                    return Ok(Snapshot::default());
                }
                Ok(serde_json::from_str(&content)?)
            }
        }
    }

    fn read_optional(&self, file: &str) -> Result<String, PersistenceError> {
        match std::fs::read_to_string(self.config.directory.join(file)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(PersistenceError::IoError(e)),
        }
    }

    fn write_text(&self, file: &str, content: String) -> Result<(), PersistenceError> {
        std::fs::write(self.config.directory.join(file), content)?;
        Ok(())
    }
}

impl SnapshotSink for FileSnapshotStore {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.config.directory)?;

        match self.config.format {
            StoreFormat::Pipe => {
                self.write_text(ROOMS_FILE, snapshot.units_text()?)?;
                self.write_text(BOOKINGS_FILE, snapshot.reservations_text()?)?;
                self.write_text(CUSTOMERS_FILE, snapshot.guests_text()?)?;
            }
            StoreFormat::Json => {
                let json = serde_json::to_string_pretty(snapshot)?;
                std::fs::write(self.config.directory.join(SNAPSHOT_JSON_FILE), json)?;
            }
        }

        tracing::debug!(
            directory = %self.config.directory.display(),
            units = snapshot.units.len(),
            reservations = snapshot.reservations.len(),
            guests = snapshot.guests.len(),
            "snapshot written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        let guest = Guest::new("Asha Rao", "555-0101", "asha@example.com");
        let mut suite = Unit::new(5, Category::Suite);
        suite.bookable = false;

        Snapshot {
            units: vec![Unit::new(1, Category::Standard), suite],
            reservations: vec![Reservation {
                id: 1,
                guest: guest.clone(),
                unit_id: 5,
                check_in: date("2024-01-10"),
                check_out: date("2024-01-12"),
                total_charge: 10000,
                status: ReservationStatus::Confirmed,
            }],
            guests: vec![guest],
        }
    }

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "reservation-engine-{}-{}",
            label,
            rand::random::<u64>()
        ))
    }

    fn record(line: &str) -> StringRecord {
        StringRecord::from(line.split('|').collect::<Vec<_>>())
    }

    #[test]
    fn test_record_shapes() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.units_text().unwrap(), "1|STANDARD|true\n5|SUITE|false\n");
        assert_eq!(
            snapshot.reservations_text().unwrap(),
            "1|555-0101|5|2024-01-10|2024-01-12|CONFIRMED\n"
        );
        assert_eq!(
            snapshot.guests_text().unwrap(),
            "Asha Rao|555-0101|asha@example.com\n"
        );
        assert_eq!(Snapshot::default().units_text().unwrap(), "");
    }

    #[test]
    fn test_from_texts_rebuilds_charge() {
        let snapshot = Snapshot::from_texts(
            "1|STANDARD|true\n5|SUITE|false\n\n",
            "1|555-0101|5|2024-01-10|2024-01-12|CONFIRMED\n",
            "Asha Rao|555-0101|asha@example.com\n",
        )
        .unwrap();

        assert_eq!(snapshot, sample_snapshot());
    }

    #[test]
    fn test_delimiter_inside_fields_is_quoted() {
        let guest = Guest::new("Rao | Asha", "555|0101", "say \"hi\"@example.com");
        let snapshot = Snapshot {
            guests: vec![guest.clone()],
            ..Snapshot::default()
        };

        let text = snapshot.guests_text().unwrap();
        assert_eq!(text, "\"Rao | Asha\"|\"555|0101\"|\"say \"\"hi\"\"@example.com\"\n");

        let restored = Snapshot::from_texts("", "", &text).unwrap();
        assert_eq!(restored.guests, vec![guest]);
    }

    #[test_case("1|STANDARD"; "#1 missing field")]
    #[test_case("x|STANDARD|true"; "#2 bad id")]
    #[test_case("1|STANDARD|maybe"; "#3 bad flag")]
    #[test_case("1|PENTHOUSE|true"; "#4 unknown category")]
    fn test_bad_unit_records(line: &str) {
        assert!(
            parse_unit_record(&record(line)).is_err(),
            "expected {:?} to be rejected",
            line
        );
        assert!(Snapshot::from_texts(line, "", "").is_err());
    }

    #[test]
    fn test_reservation_record_unit_and_guest_lookup() {
        let snapshot = sample_snapshot();

        let err = parse_reservation_record(
            &record("2|555-0101|9|2024-01-10|2024-01-12|CONFIRMED"),
            &snapshot.units,
            &snapshot.guests,
        )
        .unwrap_err();
        assert!(matches!(err, PersistenceError::UnknownUnit(9)));

        // No registered guest for this phone: a guest carrying only the phone is attached
        let reservation = parse_reservation_record(
            &record("2|555-9999|1|2024-01-10|2024-01-12|CANCELLED"),
            &snapshot.units,
            &snapshot.guests,
        )
        .unwrap();
        assert_eq!(reservation.guest, Guest::new("", "555-9999", ""));
        assert_eq!(reservation.total_charge, 2000);

        let err = parse_reservation_record(
            &record("2|555-0101|1|10/01/2024|2024-01-12|CONFIRMED"),
            &snapshot.units,
            &snapshot.guests,
        )
        .unwrap_err();
        assert!(matches!(err, PersistenceError::MalformedRecord(_)));
    }

    #[test]
    fn test_duplicate_phone_attaches_first_guest() {
        let snapshot = Snapshot::from_texts(
            "1|STANDARD|false\n",
            "1|555-0101|1|2024-01-10|2024-01-12|CONFIRMED\n",
            "Asha Rao|555-0101|asha@example.com\nA. Rao|555-0101|rao@example.com\n",
        )
        .unwrap();

        assert_eq!(snapshot.guests.len(), 2);
        assert_eq!(snapshot.reservations[0].guest.name, "Asha Rao");
        assert_eq!(snapshot.reservations[0].guest.email, "asha@example.com");
    }

    #[test]
    fn test_memory_store_tracks_writes_and_failures() {
        let store = MemorySnapshotStore::new();
        let mut sink = store.clone();

        sink.persist(&sample_snapshot()).unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(store.last(), Some(sample_snapshot()));

        store.set_fail_writes(true);
        assert!(sink.persist(&Snapshot::default()).is_err());
        assert_eq!(store.writes(), 1);
        assert_eq!(store.last(), Some(sample_snapshot()));
    }

    #[test_case(StoreFormat::Pipe; "pipe files")]
    #[test_case(StoreFormat::Json; "json file")]
    fn test_file_store_write_then_load(format: StoreFormat) {
        let directory = temp_dir("store");
        let mut store = FileSnapshotStore::new(StoreConfig {
            directory: directory.clone(),
            format,
        });

        store.persist(&sample_snapshot()).unwrap();
        assert_eq!(store.load().unwrap(), sample_snapshot());

        if format == StoreFormat::Pipe {
            let rooms = std::fs::read_to_string(directory.join(ROOMS_FILE)).unwrap();
            assert_eq!(rooms, "1|STANDARD|true\n5|SUITE|false\n");
        }

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn test_file_store_missing_directory_loads_empty() {
        let store = FileSnapshotStore::new(StoreConfig {
            directory: temp_dir("missing"),
            format: StoreFormat::Pipe,
        });
        assert_eq!(store.load().unwrap(), Snapshot::default());
    }
}
