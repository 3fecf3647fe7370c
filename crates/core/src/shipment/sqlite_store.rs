//! SQLite-backed shipment store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    status_keys, CreateShipmentRequest, Shipment, ShipmentCarrier, ShipmentStatus, ShipmentStore,
    StoreError,
};

/// Status catalog seeded on first open: (key, label, is_final).
const SEED_STATUSES: &[(&str, &str, bool)] = &[
    (status_keys::UNCHECKED, "Unchecked", false),
    (status_keys::PENDING, "Label Created", false),
    (status_keys::ACCEPTED, "Picked Up", false),
    (status_keys::IN_TRANSIT, "In Transit", false),
    (status_keys::OUT_FOR_DELIVERY, "Out for Delivery", false),
    (status_keys::DELAYED, "Delayed", false),
    (status_keys::EXCEPTION, "Exception", false),
    (status_keys::ATTEMPTED_DELIVERY, "Delivery Attempted", false),
    (status_keys::RETURNED, "Returned to Sender", true),
    (status_keys::DELIVERED, "Delivered", true),
    (status_keys::CANCELLED, "Cancelled", true),
    (status_keys::UNKNOWN, "Unknown", false),
    (status_keys::UNSUPPORTED, "Unsupported Carrier", false),
];

/// Carriers seeded on first open: (key, label).
const SEED_CARRIERS: &[(&str, &str)] = &[("ups", "UPS"), ("uds", "UDS")];

const SHIPMENT_COLUMNS: &str = "s.id, s.label, s.tracking_number, s.tracking_url, \
    s.delivery_window_start, s.delivery_window_end, s.last_location, s.last_checked_at, \
    s.thumbnail_url, st.id, st.key, st.label, st.is_final, c.id, c.key, c.label, c.icon";

const SHIPMENT_JOINS: &str = "FROM shipments s \
    JOIN shipment_statuses st ON st.id = s.status_id \
    JOIN shipment_carriers c ON c.id = s.carrier_id";

/// SQLite-backed shipment store.
pub struct SqliteShipmentStore {
    conn: Mutex<Connection>,
}

impl SqliteShipmentStore {
    /// Open (or create) the database file and initialize the schema.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS shipment_statuses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL UNIQUE,
                is_final INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS shipment_carriers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL UNIQUE,
                icon TEXT
            );

            CREATE TABLE IF NOT EXISTS shipments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL,
                tracking_number TEXT NOT NULL UNIQUE,
                tracking_url TEXT,
                delivery_window_start TEXT,
                delivery_window_end TEXT,
                last_location TEXT,
                last_checked_at TEXT,
                thumbnail_url TEXT,
                status_id INTEGER NOT NULL REFERENCES shipment_statuses(id),
                carrier_id INTEGER NOT NULL REFERENCES shipment_carriers(id)
            );

            CREATE INDEX IF NOT EXISTS idx_shipments_status ON shipments(status_id);
            "#,
        )?;

        for (key, label, is_final) in SEED_STATUSES {
            conn.execute(
                "INSERT OR IGNORE INTO shipment_statuses (key, label, is_final) VALUES (?, ?, ?)",
                params![key, label, is_final],
            )?;
        }

        for (key, label) in SEED_CARRIERS {
            conn.execute(
                "INSERT OR IGNORE INTO shipment_carriers (key, label) VALUES (?, ?)",
                params![key, label],
            )?;
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn query_shipments(
        conn: &Connection,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Shipment>, StoreError> {
        let sql = format!("SELECT {} {} {}", SHIPMENT_COLUMNS, SHIPMENT_JOINS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params, Self::row_to_shipment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shipments)
    }

    fn find_shipment(conn: &Connection, id: i64) -> Result<Option<Shipment>, StoreError> {
        let sql = format!("SELECT {} {} WHERE s.id = ?", SHIPMENT_COLUMNS, SHIPMENT_JOINS);
        let shipment = conn
            .query_row(&sql, params![id], Self::row_to_shipment)
            .optional()?;
        Ok(shipment)
    }

    fn row_to_shipment(row: &rusqlite::Row) -> rusqlite::Result<Shipment> {
        Ok(Shipment {
            id: row.get(0)?,
            label: row.get(1)?,
            tracking_number: row.get(2)?,
            tracking_url: row.get(3)?,
            delivery_window_start: parse_timestamp(row, 4)?,
            delivery_window_end: parse_timestamp(row, 5)?,
            last_location: row.get(6)?,
            last_checked_at: parse_timestamp(row, 7)?,
            thumbnail_url: row.get(8)?,
            status: ShipmentStatus {
                id: row.get(9)?,
                key: row.get(10)?,
                label: row.get(11)?,
                is_final: row.get(12)?,
            },
            carrier: ShipmentCarrier {
                id: row.get(13)?,
                key: row.get(14)?,
                label: row.get(15)?,
                icon: row.get(16)?,
            },
        })
    }
}

/// Read an optional RFC 3339 column as a UTC timestamp.
fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

impl ShipmentStore for SqliteShipmentStore {
    fn open_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        let conn = self.lock()?;
        Self::query_shipments(&conn, "WHERE st.is_final = 0 ORDER BY s.id", [])
    }

    fn get_status(&self, key: &str) -> Result<ShipmentStatus, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, key, label, is_final FROM shipment_statuses WHERE key = ?",
            params![key],
            |row| {
                Ok(ShipmentStatus {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    label: row.get(2)?,
                    is_final: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("status '{}'", key)))
    }

    fn save_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO shipments (
                id, label, tracking_number, tracking_url, delivery_window_start,
                delivery_window_end, last_location, last_checked_at, thumbnail_url,
                status_id, carrier_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                tracking_number = excluded.tracking_number,
                tracking_url = excluded.tracking_url,
                delivery_window_start = excluded.delivery_window_start,
                delivery_window_end = excluded.delivery_window_end,
                last_location = excluded.last_location,
                last_checked_at = excluded.last_checked_at,
                thumbnail_url = excluded.thumbnail_url,
                status_id = excluded.status_id,
                carrier_id = excluded.carrier_id
            "#,
            params![
                shipment.id,
                shipment.label,
                shipment.tracking_number,
                shipment.tracking_url,
                format_timestamp(shipment.delivery_window_start),
                format_timestamp(shipment.delivery_window_end),
                shipment.last_location,
                format_timestamp(shipment.last_checked_at),
                shipment.thumbnail_url,
                shipment.status.id,
                shipment.carrier.id,
            ],
        )?;
        Ok(())
    }

    fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        let conn = self.lock()?;
        Self::query_shipments(&conn, "ORDER BY s.id DESC", [])
    }

    fn get_shipment(&self, id: i64) -> Result<Option<Shipment>, StoreError> {
        let conn = self.lock()?;
        Self::find_shipment(&conn, id)
    }

    fn list_carriers(&self) -> Result<Vec<ShipmentCarrier>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, key, label, icon FROM shipment_carriers ORDER BY key")?;
        let carriers = stmt
            .query_map([], |row| {
                Ok(ShipmentCarrier {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    label: row.get(2)?,
                    icon: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(carriers)
    }

    fn create_shipment(&self, request: CreateShipmentRequest) -> Result<Shipment, StoreError> {
        let conn = self.lock()?;

        let carrier_id: i64 = conn
            .query_row(
                "SELECT id FROM shipment_carriers WHERE key = ?",
                params![request.carrier],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("carrier '{}'", request.carrier)))?;

        let status_id: i64 = conn
            .query_row(
                "SELECT id FROM shipment_statuses WHERE key = ?",
                params![status_keys::UNCHECKED],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("status '{}'", status_keys::UNCHECKED)))?;

        conn.execute(
            "INSERT INTO shipments (label, tracking_number, tracking_url, thumbnail_url, status_id, carrier_id) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                request.label,
                request.tracking_number,
                request.tracking_url,
                request.thumbnail_url,
                status_id,
                carrier_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::find_shipment(&conn, id)?
            .ok_or_else(|| StoreError::Database(format!("shipment {} vanished after insert", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_request(tracking_number: &str, carrier: &str) -> CreateShipmentRequest {
        CreateShipmentRequest {
            label: format!("Parcel {}", tracking_number),
            tracking_number: tracking_number.to_string(),
            carrier: carrier.to_string(),
            tracking_url: None,
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_seeds_status_catalog() {
        let store = SqliteShipmentStore::in_memory().unwrap();

        let delivered = store.get_status(status_keys::DELIVERED).unwrap();
        assert!(delivered.is_final);

        let in_transit = store.get_status(status_keys::IN_TRANSIT).unwrap();
        assert!(!in_transit.is_final);

        let carriers = store.list_carriers().unwrap();
        let keys: Vec<_> = carriers.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["uds", "ups"]);
    }

    #[test]
    fn test_get_status_unknown_key_is_not_found() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let result = store.get_status("teleported");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_create_shipment_starts_unchecked() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let shipment = store.create_shipment(create_request("1Z999", "ups")).unwrap();

        assert_eq!(shipment.tracking_number, "1Z999");
        assert_eq!(shipment.status.key, status_keys::UNCHECKED);
        assert_eq!(shipment.carrier.key, "ups");
        assert!(shipment.last_checked_at.is_none());
    }

    #[test]
    fn test_create_shipment_unknown_carrier_fails() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let result = store.create_shipment(create_request("X1", "pigeon"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_tracking_number_is_database_error() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        store.create_shipment(create_request("DUP", "ups")).unwrap();
        let result = store.create_shipment(create_request("DUP", "uds"));
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_open_shipments_excludes_final() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let open = store.create_shipment(create_request("OPEN", "ups")).unwrap();
        let mut done = store.create_shipment(create_request("DONE", "ups")).unwrap();

        done.status = store.get_status(status_keys::DELIVERED).unwrap();
        store.save_shipment(&done).unwrap();

        let shipments = store.open_shipments().unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].id, open.id);
        assert_eq!(store.list_shipments().unwrap().len(), 2);
    }

    #[test]
    fn test_save_shipment_persists_tracking_fields() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let mut shipment = store.create_shipment(create_request("1Z123", "ups")).unwrap();

        let checked = Utc.with_ymd_and_hms(2025, 6, 9, 14, 30, 0).unwrap();
        shipment.status = store.get_status(status_keys::OUT_FOR_DELIVERY).unwrap();
        shipment.last_location = Some("Louisville, KY".to_string());
        shipment.last_checked_at = Some(checked);
        shipment.delivery_window_start = Some(checked + Duration::hours(1));
        shipment.delivery_window_end = Some(checked + Duration::hours(4));
        store.save_shipment(&shipment).unwrap();

        let reloaded = store.get_shipment(shipment.id).unwrap().unwrap();
        assert_eq!(reloaded, shipment);
    }

    #[test]
    fn test_save_with_unknown_status_id_fails() {
        let store = SqliteShipmentStore::in_memory().unwrap();
        let mut shipment = store.create_shipment(create_request("FK", "ups")).unwrap();
        shipment.status.id = 9_999;

        let result = store.save_shipment(&shipment);
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_reopen_file_does_not_duplicate_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shipments.db");

        {
            let store = SqliteShipmentStore::new(&path).unwrap();
            store.create_shipment(create_request("PERSIST", "uds")).unwrap();
        }

        let store = SqliteShipmentStore::new(&path).unwrap();
        assert_eq!(store.list_carriers().unwrap().len(), 2);
        assert_eq!(store.list_shipments().unwrap().len(), 1);
    }
}
