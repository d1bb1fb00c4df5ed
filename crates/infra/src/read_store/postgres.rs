//! Postgres-backed company directory.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tokio::runtime::Handle;
use uuid::Uuid;

use freightbook_company::{CompanyType, Contact, Location};
use freightbook_core::CompanyId;

use super::store::{CompanyRecord, FieldPatch, Page, ReadStore, ReadStoreError};

fn company_type_to_text(ct: CompanyType) -> &'static str {
    match ct {
        CompanyType::Carrier => "carrier",
        CompanyType::Broker => "broker",
        CompanyType::Shipper => "shipper",
    }
}

fn company_type_from_text(text: &str) -> Result<CompanyType, ReadStoreError> {
    match text {
        "carrier" => Ok(CompanyType::Carrier),
        "broker" => Ok(CompanyType::Broker),
        "shipper" => Ok(CompanyType::Shipper),
        other => Err(ReadStoreError::Serialization(format!(
            "unknown company_type '{other}'"
        ))),
    }
}

/// Company directory stored in a `companies` table.
///
/// The store is synchronous at the trait boundary; every call blocks on the
/// supplied tokio runtime handle, which lets the projector drive it from
/// plain worker threads.
pub struct PostgresReadStore {
    pool: Arc<PgPool>,
    handle: Handle,
}

impl PostgresReadStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool: Arc::new(pool),
            handle,
        }
    }

    fn db(&self, err: sqlx::Error) -> ReadStoreError {
        ReadStoreError::Unavailable(err.to_string())
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<CompanyRecord, ReadStoreError> {
        let company_id: Uuid = row
            .try_get("company_id")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let tax_id: Option<String> = row
            .try_get("tax_id")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let mc: Option<String> = row
            .try_get("mc")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let company_type: Option<String> = row
            .try_get("company_type")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let contacts: JsonValue = row
            .try_get("contacts")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let locations: JsonValue = row
            .try_get("locations")
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;

        let contacts: Vec<Contact> = serde_json::from_value(contacts)
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;
        let locations: Vec<Location> = serde_json::from_value(locations)
            .map_err(|e| ReadStoreError::Serialization(e.to_string()))?;

        Ok(CompanyRecord {
            company_id: CompanyId::from_uuid(company_id),
            name,
            tax_id,
            mc,
            company_type: company_type
                .as_deref()
                .map(company_type_from_text)
                .transpose()?,
            contacts,
            locations,
        })
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue, ReadStoreError> {
        serde_json::to_value(value).map_err(|e| ReadStoreError::Serialization(e.to_string()))
    }
}

impl ReadStore for PostgresReadStore {
    fn ensure_indexes(&self) -> Result<(), ReadStoreError> {
        let pool = self.pool.clone();
        self.handle.block_on(async move {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS companies (
                    company_id   UUID PRIMARY KEY,
                    name         TEXT NOT NULL,
                    tax_id       TEXT,
                    mc           TEXT,
                    company_type TEXT,
                    contacts     JSONB NOT NULL DEFAULT '[]'::jsonb,
                    locations    JSONB NOT NULL DEFAULT '[]'::jsonb
                )
                "#,
            )
            .execute(&*pool)
            .await?;

            sqlx::query("CREATE INDEX IF NOT EXISTS companies_name_idx ON companies (name)")
                .execute(&*pool)
                .await?;

            Ok::<_, sqlx::Error>(())
        })
        .map_err(|e| self.db(e))
    }

    fn get(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, ReadStoreError> {
        let pool = self.pool.clone();
        let row = self
            .handle
            .block_on(async move {
                sqlx::query(
                    r#"
                    SELECT company_id, name, tax_id, mc, company_type, contacts, locations
                    FROM companies
                    WHERE company_id = $1
                    "#,
                )
                .bind(company_id.as_uuid())
                .fetch_optional(&*pool)
                .await
            })
            .map_err(|e| self.db(e))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    fn upsert(&self, record: CompanyRecord) -> Result<(), ReadStoreError> {
        let contacts = Self::to_json(&record.contacts)?;
        let locations = Self::to_json(&record.locations)?;
        let pool = self.pool.clone();

        self.handle
            .block_on(async move {
                sqlx::query(
                    r#"
                    INSERT INTO companies (
                        company_id, name, tax_id, mc, company_type, contacts, locations
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (company_id)
                    DO UPDATE SET
                        name = EXCLUDED.name,
                        tax_id = EXCLUDED.tax_id,
                        mc = EXCLUDED.mc,
                        company_type = EXCLUDED.company_type,
                        contacts = EXCLUDED.contacts,
                        locations = EXCLUDED.locations
                    "#,
                )
                .bind(record.company_id.as_uuid())
                .bind(&record.name)
                .bind(&record.tax_id)
                .bind(&record.mc)
                .bind(record.company_type.map(company_type_to_text))
                .bind(contacts)
                .bind(locations)
                .execute(&*pool)
                .await
            })
            .map_err(|e| self.db(e))?;

        Ok(())
    }

    fn update_fields(
        &self,
        company_id: CompanyId,
        patches: &[FieldPatch],
    ) -> Result<(), ReadStoreError> {
        if patches.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE companies SET ");
        let mut fields = builder.separated(", ");
        for patch in patches {
            match patch {
                FieldPatch::Name(name) => {
                    fields.push("name = ").push_bind_unseparated(name.clone());
                }
                FieldPatch::TaxId(tax_id) => {
                    fields
                        .push("tax_id = ")
                        .push_bind_unseparated(tax_id.clone());
                }
                FieldPatch::Mc(mc) => {
                    fields.push("mc = ").push_bind_unseparated(mc.clone());
                }
                FieldPatch::CompanyType(ct) => {
                    fields
                        .push("company_type = ")
                        .push_bind_unseparated((*ct).map(company_type_to_text));
                }
                FieldPatch::Contacts(contacts) => {
                    fields
                        .push("contacts = ")
                        .push_bind_unseparated(Self::to_json(contacts)?);
                }
                FieldPatch::Locations(locations) => {
                    fields
                        .push("locations = ")
                        .push_bind_unseparated(Self::to_json(locations)?);
                }
            }
        }
        builder.push(" WHERE company_id = ");
        builder.push_bind(company_id.as_uuid());

        let pool = self.pool.clone();
        self.handle
            .block_on(async move { builder.build().execute(&*pool).await })
            .map_err(|e| self.db(e))?;

        Ok(())
    }

    fn delete(&self, company_id: CompanyId) -> Result<(), ReadStoreError> {
        let pool = self.pool.clone();
        self.handle
            .block_on(async move {
                sqlx::query("DELETE FROM companies WHERE company_id = $1")
                    .bind(company_id.as_uuid())
                    .execute(&*pool)
                    .await
            })
            .map_err(|e| self.db(e))?;

        Ok(())
    }

    fn list(&self, page_number: u32, page_size: u32) -> Result<Page<CompanyRecord>, ReadStoreError> {
        let pool = self.pool.clone();
        let offset = i64::from(page_number.saturating_sub(1)) * i64::from(page_size);
        let limit = i64::from(page_size);

        let (total, rows) = self
            .handle
            .block_on(async move {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
                    .fetch_one(&*pool)
                    .await?;

                let rows = sqlx::query(
                    r#"
                    SELECT company_id, name, tax_id, mc, company_type, contacts, locations
                    FROM companies
                    ORDER BY company_id
                    OFFSET $1 LIMIT $2
                    "#,
                )
                .bind(offset)
                .bind(limit)
                .fetch_all(&*pool)
                .await?;

                Ok::<_, sqlx::Error>((total, rows))
            })
            .map_err(|e| self.db(e))?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            records,
            page_number,
            page_size,
            total: total as u64,
        })
    }
}
