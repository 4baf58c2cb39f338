use crate::domain::todo::driven_ports::{TodoReader, TodoWriter, UpdateOutcome};
use crate::domain::todo::driving_ports::TodoError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use tracing::{info, warn};

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TodoItem {
    pub id: i32,
    pub title: String,
    pub assigned_to: String,
    pub assigned_by: String,
    pub tenant_id: String,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewTodoItem {
    pub title: String,
    pub assigned_to: String,
    pub assigned_by: String,
    pub tenant_id: String,
}

impl NewTodoItem {
    pub fn with_id(self, id: i32) -> TodoItem {
        TodoItem {
            id,
            title: self.title,
            assigned_to: self.assigned_to,
            assigned_by: self.assigned_by,
            tenant_id: self.tenant_id,
        }
    }
}

/// The signed-in user a to-do list is being read for. Only items in the viewer's tenant which
/// were assigned to or by the viewer are visible to them.
#[derive(Debug, Clone, Copy)]
pub struct TodoViewer<'ident> {
    pub tenant_id: &'ident str,
    pub identity: &'ident str,
}

impl TodoViewer<'_> {
    pub fn can_see(&self, item: &TodoItem) -> bool {
        item.tenant_id == self.tenant_id
            && (item.assigned_to == self.identity || item.assigned_by == self.identity)
    }
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    /// What happened when a full replace of an item was attempted
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub enum UpdateOutcome {
        Updated,
        NoMatchingItem,
        Conflicted,
    }

    pub trait TodoReader {
        async fn items_for_viewer(
            &self,
            viewer: TodoViewer<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TodoItem>, anyhow::Error>;
        async fn item_by_id(
            &self,
            tenant_id: &str,
            item_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TodoItem>, anyhow::Error>;
    }

    pub trait TodoWriter {
        async fn create_item(
            &self,
            new_item: &NewTodoItem,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        async fn update_item(
            &self,
            tenant_id: &str,
            item: &TodoItem,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<UpdateOutcome, anyhow::Error>;

        /// Returns false if nothing was deleted
        async fn delete_item(
            &self,
            tenant_id: &str,
            item_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TodoError {
        #[error("to-do item {0} does not exist")]
        NotFound(i32),
        #[error("the item ID {body_id} does not match the requested ID {path_id}")]
        IdMismatch { path_id: i32, body_id: i32 },
        #[error("to-do item {0} was modified by someone else")]
        Conflict(i32),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait TodoPort {
        async fn items_for_viewer(
            &self,
            viewer: TodoViewer<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl driven_ports::TodoReader,
        ) -> Result<Vec<TodoItem>, TodoError>;
        async fn item_by_id(
            &self,
            tenant_id: &str,
            item_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl driven_ports::TodoReader,
        ) -> Result<TodoItem, TodoError>;
        async fn add_item(
            &self,
            new_item: &NewTodoItem,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<TodoItem, TodoError>;
        async fn update_item(
            &self,
            tenant_id: &str,
            item_id: i32,
            item: &TodoItem,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl driven_ports::TodoReader,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<TodoItem, TodoError>;
        async fn delete_item(
            &self,
            tenant_id: &str,
            item_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl driven_ports::TodoReader,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<TodoItem, TodoError>;
    }
}

pub struct TodoService;

impl driving_ports::TodoPort for TodoService {
    async fn items_for_viewer(
        &self,
        viewer: TodoViewer<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
    ) -> Result<Vec<TodoItem>, TodoError> {
        let items = todo_read
            .items_for_viewer(viewer, &mut *ext_cxn)
            .await
            .context("listing to-do items")?;

        Ok(items)
    }

    async fn item_by_id(
        &self,
        tenant_id: &str,
        item_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
    ) -> Result<TodoItem, TodoError> {
        todo_read
            .item_by_id(tenant_id, item_id, &mut *ext_cxn)
            .await
            .context("fetching a to-do item")?
            .ok_or(TodoError::NotFound(item_id))
    }

    async fn add_item(
        &self,
        new_item: &NewTodoItem,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<TodoItem, TodoError> {
        let new_id = todo_write
            .create_item(new_item, &mut *ext_cxn)
            .await
            .context("creating a to-do item")?;
        info!("Created to-do item {new_id}");

        Ok(new_item.clone().with_id(new_id))
    }

    async fn update_item(
        &self,
        tenant_id: &str,
        item_id: i32,
        item: &TodoItem,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
        todo_write: &impl TodoWriter,
    ) -> Result<TodoItem, TodoError> {
        if item.id != item_id {
            return Err(TodoError::IdMismatch {
                path_id: item_id,
                body_id: item.id,
            });
        }

        let outcome = todo_write
            .update_item(tenant_id, item, &mut *ext_cxn)
            .await
            .context("updating a to-do item")?;

        match outcome {
            UpdateOutcome::Updated => Ok(item.clone()),
            UpdateOutcome::Conflicted => Err(TodoError::Conflict(item_id)),
            UpdateOutcome::NoMatchingItem => {
                // Nothing was written, so either the item is gone or someone else holds it
                let still_exists = todo_read
                    .item_by_id(tenant_id, item_id, &mut *ext_cxn)
                    .await
                    .context("checking whether an unchanged to-do item exists")?
                    .is_some();

                if still_exists {
                    warn!("Update of to-do item {item_id} affected no rows although it exists");
                    Err(TodoError::Conflict(item_id))
                } else {
                    Err(TodoError::NotFound(item_id))
                }
            }
        }
    }

    async fn delete_item(
        &self,
        tenant_id: &str,
        item_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
        todo_write: &impl TodoWriter,
    ) -> Result<TodoItem, TodoError> {
        let existing_item = todo_read
            .item_by_id(tenant_id, item_id, &mut *ext_cxn)
            .await
            .context("looking up a to-do item before deleting it")?
            .ok_or(TodoError::NotFound(item_id))?;

        let deleted = todo_write
            .delete_item(tenant_id, item_id, &mut *ext_cxn)
            .await
            .context("deleting a to-do item")?;
        if !deleted {
            return Err(TodoError::NotFound(item_id));
        }

        Ok(existing_item)
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::domain::test_util::StoreAvailability;
    use crate::domain::todo::driving_ports::TodoPort;
    use crate::external_connections;
    use speculoos::prelude::*;
    use std::sync::RwLock;

    fn seeded_persistence() -> RwLock<InMemoryTodoPersistence> {
        RwLock::new(InMemoryTodoPersistence::new_with_items(&[
            new_item("Write report", "alice@contoso.com", "bob@contoso.com", "contoso"),
            new_item("Book flights", "carol@contoso.com", "alice@contoso.com", "contoso"),
            new_item("Water plants", "carol@contoso.com", "dave@contoso.com", "contoso"),
            new_item("Audit", "alice@contoso.com", "alice@contoso.com", "fabrikam"),
        ]))
    }

    mod items_for_viewer {
        use super::*;

        #[tokio::test]
        async fn only_returns_items_in_tenant_related_to_viewer() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let viewer = TodoViewer {
                tenant_id: "contoso",
                identity: "alice@contoso.com",
            };

            let items = TodoService
                .items_for_viewer(viewer, &mut ext_cxn, &persistence)
                .await;
            assert_that!(items).is_ok().matches(|items| {
                matches!(items.as_slice(), [
                    TodoItem { id: 1, title: first, .. },
                    TodoItem { id: 2, title: second, .. },
                ] if first == "Write report" && second == "Book flights")
            });
        }

        #[tokio::test]
        async fn returns_nothing_for_unrelated_viewer() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let viewer = TodoViewer {
                tenant_id: "fabrikam",
                identity: "bob@contoso.com",
            };

            let items = TodoService
                .items_for_viewer(viewer, &mut ext_cxn, &persistence)
                .await;
            assert_that!(items).is_ok().is_empty();
        }

        #[tokio::test]
        async fn propagates_port_error() {
            let mut raw_persistence = InMemoryTodoPersistence::new();
            raw_persistence.availability = StoreAvailability::Unreachable;
            let persistence = RwLock::new(raw_persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let viewer = TodoViewer {
                tenant_id: "contoso",
                identity: "alice@contoso.com",
            };

            let items = TodoService
                .items_for_viewer(viewer, &mut ext_cxn, &persistence)
                .await;
            assert_that!(items)
                .is_err()
                .matches(|err| matches!(err, TodoError::PortError(_)));
        }
    }

    mod item_by_id {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let item = TodoService
                .item_by_id("contoso", 3, &mut ext_cxn, &persistence)
                .await;
            assert_that!(item)
                .is_ok()
                .matches(|item| item.id == 3 && item.title == "Water plants");
        }

        #[tokio::test]
        async fn item_from_other_tenant_is_not_found() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let item = TodoService
                .item_by_id("contoso", 4, &mut ext_cxn, &persistence)
                .await;
            assert_that!(item)
                .is_err()
                .matches(|err| matches!(err, TodoError::NotFound(4)));
        }
    }

    mod add_item {
        use super::*;

        #[tokio::test]
        async fn added_item_can_be_read_back() {
            let persistence = InMemoryTodoPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let to_add = new_item("Ship it", "erin@contoso.com", "frank@contoso.com", "contoso");

            let added = TodoService
                .add_item(&to_add, &mut ext_cxn, &persistence)
                .await;
            let Ok(added) = added else {
                panic!("Adding an item failed: {:#?}", added);
            };

            let fetched = TodoService
                .item_by_id("contoso", added.id, &mut ext_cxn, &persistence)
                .await;
            assert_that!(fetched)
                .is_ok()
                .is_equal_to(to_add.with_id(added.id));
        }

        #[tokio::test]
        async fn assigns_distinct_ids() {
            let persistence = InMemoryTodoPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let to_add = new_item("Ship it", "erin@contoso.com", "frank@contoso.com", "contoso");

            let first = TodoService.add_item(&to_add, &mut ext_cxn, &persistence).await;
            let second = TodoService.add_item(&to_add, &mut ext_cxn, &persistence).await;
            let (Ok(first), Ok(second)) = (first, second) else {
                panic!("Adding items failed");
            };

            assert_ne!(first.id, second.id);
        }
    }

    mod update_item {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let replacement = TodoItem {
                id: 2,
                title: "Book trains".to_owned(),
                assigned_to: "dave@contoso.com".to_owned(),
                assigned_by: "alice@contoso.com".to_owned(),
                tenant_id: "contoso".to_owned(),
            };

            let updated = TodoService
                .update_item("contoso", 2, &replacement, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(updated).is_ok().is_equal_to(replacement.clone());

            let locked_persistence = persistence.read().expect("todo rw lock poisoned");
            assert_eq!(replacement, locked_persistence.items[1]);
        }

        #[tokio::test]
        async fn missing_item_is_not_found_and_not_created() {
            let persistence = InMemoryTodoPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let replacement = new_item("Ghost", "a@contoso.com", "b@contoso.com", "contoso").with_id(7);

            let updated = TodoService
                .update_item("contoso", 7, &replacement, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(updated)
                .is_err()
                .matches(|err| matches!(err, TodoError::NotFound(7)));

            let locked_persistence = persistence.read().expect("todo rw lock poisoned");
            assert_that!(locked_persistence.items).is_empty();
        }

        #[tokio::test]
        async fn rejects_mismatched_ids() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let replacement = new_item("Wrong", "a@contoso.com", "b@contoso.com", "contoso").with_id(3);

            let updated = TodoService
                .update_item("contoso", 2, &replacement, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(updated).is_err().matches(|err| {
                matches!(
                    err,
                    TodoError::IdMismatch {
                        path_id: 2,
                        body_id: 3
                    }
                )
            });
        }

        #[tokio::test]
        async fn surfaces_concurrent_modification_as_conflict() {
            let mut raw_persistence = InMemoryTodoPersistence::new_with_items(&[new_item(
                "Contended",
                "a@contoso.com",
                "b@contoso.com",
                "contoso",
            )]);
            raw_persistence.update_outcome_override = Some(UpdateOutcome::NoMatchingItem);
            let persistence = RwLock::new(raw_persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let replacement = new_item("Mine", "a@contoso.com", "b@contoso.com", "contoso").with_id(1);

            let updated = TodoService
                .update_item("contoso", 1, &replacement, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(updated)
                .is_err()
                .matches(|err| matches!(err, TodoError::Conflict(1)));
        }

        #[tokio::test]
        async fn passes_through_store_reported_conflict() {
            let mut raw_persistence = InMemoryTodoPersistence::new();
            raw_persistence.update_outcome_override = Some(UpdateOutcome::Conflicted);
            let persistence = RwLock::new(raw_persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let replacement = new_item("Mine", "a@contoso.com", "b@contoso.com", "contoso").with_id(9);

            let updated = TodoService
                .update_item("contoso", 9, &replacement, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(updated)
                .is_err()
                .matches(|err| matches!(err, TodoError::Conflict(9)));
        }
    }

    mod delete_item {
        use super::*;

        #[tokio::test]
        async fn returns_deleted_item() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let deleted = TodoService
                .delete_item("contoso", 1, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(deleted)
                .is_ok()
                .matches(|item| item.id == 1 && item.title == "Write report");

            let locked_persistence = persistence.read().expect("todo rw lock poisoned");
            assert_eq!(3, locked_persistence.items.len());
        }

        #[tokio::test]
        async fn second_delete_is_not_found() {
            let persistence = seeded_persistence();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let first = TodoService
                .delete_item("contoso", 2, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(first).is_ok();

            let second = TodoService
                .delete_item("contoso", 2, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(second)
                .is_err()
                .matches(|err| matches!(err, TodoError::NotFound(2)));
        }

        #[tokio::test]
        async fn returns_port_err() {
            let mut raw_persistence = InMemoryTodoPersistence::new();
            raw_persistence.availability = StoreAvailability::Unreachable;
            let persistence = RwLock::new(raw_persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let deleted = TodoService
                .delete_item("contoso", 1, &mut ext_cxn, &persistence, &persistence)
                .await;
            assert_that!(deleted)
                .is_err()
                .matches(|err| matches!(err, TodoError::PortError(_)));
        }
    }
}
