use edu_core::model::{Account, AccountId, Role, normalize_email};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{account_id_from_i64, id_to_i64, read_err, ser, write_err};
use crate::repository::{AccountRecord, AccountRepository, NewAccountRecord, StorageError};

fn map_account_row(row: &SqliteRow) -> Result<Account, StorageError> {
    let role: Role = row
        .try_get::<String, _>("role")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    Account::new(
        account_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        role,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl AccountRepository for SqliteRepository {
    async fn insert_new_account(&self, record: NewAccountRecord) -> Result<AccountId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO accounts (email, name, role, password_hash)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(normalize_email(&record.email))
        .bind(record.name.trim())
        .bind(record.role.as_str())
        .bind(record.password_hash)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        account_id_from_i64(res.last_insert_rowid())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query("SELECT id, email, name, role FROM accounts WHERE id = ?1")
            .bind(id_to_i64("account_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;

        row.as_ref().map(map_account_row).transpose()
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT id, email, name, role, password_hash FROM accounts WHERE email = ?1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;

        match row {
            Some(row) => Ok(Some(AccountRecord {
                account: map_account_row(&row)?,
                password_hash: row.try_get("password_hash").map_err(ser)?,
            })),
            None => Ok(None),
        }
    }

    async fn set_active_session(&self, account: Option<AccountId>) -> Result<(), StorageError> {
        match account {
            Some(id) => {
                sqlx::query(
                    r"
                    INSERT INTO active_session (slot, account_id) VALUES (0, ?1)
                    ON CONFLICT(slot) DO UPDATE SET account_id = excluded.account_id
                    ",
                )
                .bind(id_to_i64("account_id", id.value())?)
                .execute(&self.pool)
                .await
                .map_err(write_err)?;
            }
            None => {
                sqlx::query("DELETE FROM active_session")
                    .execute(&self.pool)
                    .await
                    .map_err(write_err)?;
            }
        }
        Ok(())
    }

    async fn active_session(&self) -> Result<Option<AccountId>, StorageError> {
        let id: Option<i64> =
            sqlx::query_scalar("SELECT account_id FROM active_session WHERE slot = 0")
                .fetch_optional(&self.pool)
                .await
                .map_err(read_err)?;
        id.map(account_id_from_i64).transpose()
    }
}
