//! Repository Integration Tests
//!
//! Typed collections over an in-memory SQLite store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use crate::domain::{
        Category, DomainError, NewCategory, NewItem, NewList, ShoppingItem, ShoppingList,
    };
    use crate::repository::{Collection, Query, RemoteStore, SqliteStore};

    fn setup_store() -> Arc<dyn RemoteStore> {
        Arc::new(SqliteStore::in_memory().expect("Failed to open in-memory store"))
    }

    fn new_list(user_id: Uuid, name: &str) -> NewList {
        NewList {
            user_id,
            name: name.to_string(),
            month: 0,
            year: 2025,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_list() {
        let lists: Collection<ShoppingList> = Collection::new(setup_store());
        let user = Uuid::new_v4();

        let created = lists.create(&new_list(user, "Churrasco")).await.expect("Failed to create");

        assert_eq!(created.name, "Churrasco");
        assert_eq!(created.user_id, user);
        assert!(created.is_active);
        assert!(created.created_at.is_some());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let lists: Collection<ShoppingList> = Collection::new(setup_store());
        let created = lists.create(&new_list(Uuid::new_v4(), "Find me")).await.unwrap();

        let found = lists.find_by_id(created.id).await.expect("Find failed");
        assert_eq!(found.map(|list| list.name), Some("Find me".to_string()));
        assert!(lists.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_many_keeps_order() {
        let store = setup_store();
        let categories: Collection<Category> = Collection::new(store.clone());
        let list_id = Uuid::new_v4();

        let drafts: Vec<NewCategory> = ["Mercearia", "Hortifruti", "Padaria"]
            .iter()
            .enumerate()
            .map(|(i, name)| NewCategory {
                list_id,
                name: name.to_string(),
                is_custom: false,
                sort_order: i as i32,
            })
            .collect();
        let created = categories.create_many(&drafts).await.unwrap();

        let names: Vec<_> = created.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Mercearia", "Hortifruti", "Padaria"]);
        assert!(categories.create_many::<NewCategory>(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_by_id() {
        let items: Collection<ShoppingItem> = Collection::new(setup_store());
        let created = items
            .create(&NewItem {
                category_id: Uuid::new_v4(),
                name: "Leite".to_string(),
                quantity: 1,
                sort_order: 0,
            })
            .await
            .unwrap();

        let updated = items
            .update_by_id(created.id, json!({ "quantity": 6, "unit_price": 4.99 }))
            .await
            .expect("Update failed");
        assert_eq!(updated.quantity, 6);
        assert_eq!(updated.unit_price, Some(4.99));
        assert_eq!(updated.name, "Leite");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let items: Collection<ShoppingItem> = Collection::new(setup_store());
        let result = items.update_by_id(Uuid::new_v4(), json!({ "quantity": 2 })).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_where() {
        let items: Collection<ShoppingItem> = Collection::new(setup_store());
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        for category_id in [keep, drop, drop] {
            items
                .create(&NewItem {
                    category_id,
                    name: "Pão".to_string(),
                    quantity: 1,
                    sort_order: 0,
                })
                .await
                .unwrap();
        }

        items
            .delete_where(&Query::new().eq("category_id", drop))
            .await
            .expect("Delete failed");

        let left = items.find(&Query::new()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].category_id, keep);
    }

    #[tokio::test]
    async fn test_empty_in_filter_touches_nothing() {
        let items: Collection<ShoppingItem> = Collection::new(setup_store());
        items
            .create(&NewItem {
                category_id: Uuid::new_v4(),
                name: "Café".to_string(),
                quantity: 1,
                sort_order: 0,
            })
            .await
            .unwrap();

        let none = Query::new().is_in("category_id", Vec::<Uuid>::new());
        assert!(items.find(&none).await.unwrap().is_empty());
        items.delete_where(&none).await.unwrap();
        assert_eq!(items.find(&Query::new()).await.unwrap().len(), 1);
    }
}
