use parkwatch_core::SlotId;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::info;

/// Sample occupants written on first start when demo seeding is enabled.
pub const DEMO_BOOKINGS: [(&str, &str, &str); 4] = [
    ("A-1", "UP32 12345", "1234567890"),
    ("A-2", "UP32 67890", "1234567891"),
    ("B-2", "UP32 54321", "1234567892"),
    ("C-2", "UP32 98765", "1234567893"),
];

#[derive(Clone)]
pub struct DbClient {
    pub pool: SqlitePool,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let mut options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(3));

        // Every in-memory connection is its own database, so keep exactly one alive.
        options = if connection_string.contains(":memory:") {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(max_connections)
        };

        let pool = options.connect(connection_string).await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Creates the fixed slot set when the table is empty. Existing rows are
    /// never touched, so restarts keep their bookings.
    pub async fn seed_slots(&self, slot_ids: &[SlotId], demo_bookings: bool) -> Result<u64, sqlx::Error> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parking_slots")
            .fetch_one(&self.pool)
            .await?;

        if existing > 0 {
            info!("Slot table already holds {} slots, skipping seed", existing);
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for slot_id in slot_ids {
            sqlx::query("INSERT INTO parking_slots (slot_id, status) VALUES (?, 'vacant')")
                .bind(slot_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        if demo_bookings {
            for (slot_id, reg_number, mob) in DEMO_BOOKINGS {
                sqlx::query(
                    "UPDATE parking_slots SET status = 'occupied', reg_number = ?, mob = ? WHERE slot_id = ?",
                )
                .bind(reg_number)
                .bind(mob)
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        info!("Seeded {} parking slots (demo bookings: {})", slot_ids.len(), demo_bookings);
        Ok(slot_ids.len() as u64)
    }
}
