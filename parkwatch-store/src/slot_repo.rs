use async_trait::async_trait;
use parkwatch_core::repository::SlotRepository;
use parkwatch_core::{CoreError, CoreResult, Occupant, ParkingSlot, SlotId};
use sqlx::SqlitePool;

pub struct SqlSlotRepository {
    pool: SqlitePool,
}

impl SqlSlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    slot_id: String,
    status: String,
    reg_number: Option<String>,
    mob: Option<String>,
}

impl TryFrom<SlotRow> for ParkingSlot {
    type Error = CoreError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        ParkingSlot::from_columns(&row.slot_id, &row.status, row.reg_number, row.mob)
    }
}

fn storage(err: sqlx::Error) -> CoreError {
    CoreError::StorageError(err.to_string())
}

#[async_trait]
impl SlotRepository for SqlSlotRepository {
    async fn list_slots(&self) -> CoreResult<Vec<ParkingSlot>> {
        let rows = sqlx::query_as::<_, SlotRow>(
            "SELECT slot_id, status, reg_number, mob FROM parking_slots ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter().map(ParkingSlot::try_from).collect()
    }

    async fn get_slot(&self, slot_id: &SlotId) -> CoreResult<Option<ParkingSlot>> {
        let row = sqlx::query_as::<_, SlotRow>(
            "SELECT slot_id, status, reg_number, mob FROM parking_slots WHERE slot_id = ?",
        )
        .bind(slot_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(ParkingSlot::try_from).transpose()
    }

    async fn occupy(&self, slot_id: &SlotId, occupant: &Occupant) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE parking_slots
            SET status = 'occupied', reg_number = ?, mob = ?
            WHERE slot_id = ? AND status = 'vacant'
            "#,
        )
        .bind(&occupant.registration)
        .bind(occupant.phone.expose())
        .bind(slot_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, slot_id: &SlotId) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE parking_slots
            SET status = 'vacant', reg_number = NULL, mob = NULL
            WHERE slot_id = ? AND status = 'occupied'
            "#,
        )
        .bind(slot_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_registration(&self, registration: &str) -> CoreResult<Option<ParkingSlot>> {
        let row = sqlx::query_as::<_, SlotRow>(
            "SELECT slot_id, status, reg_number, mob FROM parking_slots WHERE reg_number = ? ORDER BY id LIMIT 1",
        )
        .bind(registration)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(ParkingSlot::try_from).transpose()
    }
}
