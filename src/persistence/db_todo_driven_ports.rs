use crate::domain;
use crate::domain::todo::driven_ports::UpdateOutcome;
use crate::domain::todo::{NewTodoItem, TodoItem, TodoViewer};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use sqlx::{Connection, query, query_as};

/// SQLSTATE PostgreSQL reports when a write loses a race with a concurrent transaction
const SERIALIZATION_FAILURE: &str = "40001";

pub struct DbTodoReader;

#[derive(sqlx::FromRow)]
struct TodoItemRow {
    id: i32,
    title: String,
    assigned_to: String,
    assigned_by: String,
    tenant_id: String,
}

impl From<TodoItemRow> for TodoItem {
    fn from(value: TodoItemRow) -> Self {
        TodoItem {
            id: value.id,
            title: value.title,
            assigned_to: value.assigned_to,
            assigned_by: value.assigned_by,
            tenant_id: value.tenant_id,
        }
    }
}

impl domain::todo::driven_ports::TodoReader for DbTodoReader {
    async fn items_for_viewer(
        &self,
        viewer: TodoViewer<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TodoItem>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let items: Vec<TodoItem> = query_as::<_, TodoItemRow>(
            "SELECT ti.id, ti.title, ti.assigned_to, ti.assigned_by, ti.tenant_id FROM todo_item ti \
             WHERE ti.tenant_id = $1 AND (ti.assigned_to = $2 OR ti.assigned_by = $2) \
             ORDER BY ti.id",
        )
        .bind(viewer.tenant_id)
        .bind(viewer.identity)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch the to-do items visible to a user")?
        .into_iter()
        .map(TodoItem::from)
        .collect();

        Ok(items)
    }

    async fn item_by_id(
        &self,
        tenant_id: &str,
        item_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TodoItem>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let item = query_as::<_, TodoItemRow>(
            "SELECT ti.id, ti.title, ti.assigned_to, ti.assigned_by, ti.tenant_id FROM todo_item ti \
             WHERE ti.tenant_id = $1 AND ti.id = $2",
        )
        .bind(tenant_id)
        .bind(item_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a to-do item by ID")?
        .map(TodoItem::from);

        Ok(item)
    }
}

pub struct DbTodoWriter;

impl domain::todo::driven_ports::TodoWriter for DbTodoWriter {
    async fn create_item(
        &self,
        new_item: &NewTodoItem,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id = query_as::<_, super::NewId>(
            "INSERT INTO todo_item(title, assigned_to, assigned_by, tenant_id) \
             VALUES ($1, $2, $3, $4) RETURNING todo_item.id",
        )
        .bind(&new_item.title)
        .bind(&new_item.assigned_to)
        .bind(&new_item.assigned_by)
        .bind(&new_item.tenant_id)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new to-do item into the database")?;

        Ok(new_id.id)
    }

    async fn update_item(
        &self,
        tenant_id: &str,
        item: &TodoItem,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<UpdateOutcome, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;
        // Under repeatable read a row changed by a transaction that commits while this update
        // waits on it fails with a serialization error instead of being overwritten
        let mut transaction = cxn
            .borrow_connection()
            .begin()
            .await
            .context("starting a to-do item update")?;
        query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *transaction)
            .await
            .context("setting the update isolation level")?;

        let update_result = query(
            "UPDATE todo_item SET title = $1, assigned_to = $2, assigned_by = $3, tenant_id = $4 \
             WHERE id = $5 AND tenant_id = $6",
        )
        .bind(&item.title)
        .bind(&item.assigned_to)
        .bind(&item.assigned_by)
        .bind(&item.tenant_id)
        .bind(item.id)
        .bind(tenant_id)
        .execute(&mut *transaction)
        .await;

        let outcome = match update_result {
            Ok(done) if done.rows_affected() == 0 => UpdateOutcome::NoMatchingItem,
            Ok(_) => UpdateOutcome::Updated,
            Err(err) if is_serialization_failure(&err) => return Ok(UpdateOutcome::Conflicted),
            Err(err) => return Err(err).context("trying to update a to-do item in the database"),
        };

        match transaction.commit().await {
            Ok(()) => Ok(outcome),
            Err(err) if is_serialization_failure(&err) => Ok(UpdateOutcome::Conflicted),
            Err(err) => Err(err).context("committing a to-do item update"),
        }
    }

    async fn delete_item(
        &self,
        tenant_id: &str,
        item_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let delete_result = query("DELETE FROM todo_item WHERE id = $1 AND tenant_id = $2")
            .bind(item_id)
            .bind(tenant_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a to-do item from the database")?;

        Ok(delete_result.rows_affected() > 0)
    }
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(SERIALIZATION_FAILURE))
}
