//! Collection operations on top of the redb tables
//!
//! Each function runs exactly one transaction. Documents are stored as
//! JSON strings; the category index is kept in the same write transaction
//! as the item it points to.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{de::DeserializeOwned, Serialize};
use std::cmp::Reverse;
use tracing::warn;

use crate::database::{
    StoreResult, TABLE_ADMIN_USERS, TABLE_CATALOGUE, TABLE_ITEMS, TABLE_ITEM_CATEGORY_INDEX,
    TABLE_SESSIONS,
};
use crate::model::{
    AdminUser, Category, CategoryFields, DocumentId, Item, ItemFields, Session,
};

fn encode<T: Serialize>(doc: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(doc)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> StoreResult<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Builds the index key of an item, or `None` when it references no category.
fn category_index_key(item: &Item) -> Option<String> {
    let category_id = item.category_id.as_deref()?;
    let micros = item.created_at.timestamp_micros().max(0);
    Some(format!("{}:{:020}:{}", category_id, micros, item.id))
}

/// Newest first; the id breaks ties between documents created in the same instant.
fn sort_newest_first<T>(docs: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, DocumentId)) {
    docs.sort_by_key(|doc| Reverse(key(doc)));
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Returns every category, newest first. Undecodable documents are skipped.
pub fn list_categories(db: &Database) -> StoreResult<Vec<Category>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_CATALOGUE)?;

    let mut categories = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        match decode::<Category>(value.value()) {
            Ok(category) => categories.push(category),
            Err(err) => warn!(id = key.value(), error = %err, "skipping unreadable category"),
        }
    }

    sort_newest_first(&mut categories, |c| (c.created_at, c.id));
    Ok(categories)
}

pub fn get_category(db: &Database, id: &DocumentId) -> StoreResult<Option<Category>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_CATALOGUE)?;
    let key = id.to_string();

    let value = table.get(key.as_str())?;
    let doc = value.map(|v| decode(v.value())).transpose()?;
    Ok(doc)
}

pub fn insert_category(db: &Database, category: &Category) -> StoreResult<()> {
    let key = category.id.to_string();
    let record_json = encode(category)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_CATALOGUE)?;
        table.insert(key.as_str(), record_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Replaces the mutable fields of a category. `None` when the id is unknown.
pub fn replace_category(
    db: &Database,
    id: &DocumentId,
    fields: CategoryFields,
    now: DateTime<Utc>,
) -> StoreResult<Option<Category>> {
    let key = id.to_string();

    let write_txn = db.begin_write()?;
    let replaced = {
        let mut table = write_txn.open_table(TABLE_CATALOGUE)?;
        let existing = table.get(key.as_str())?.map(|v| v.value().to_owned());

        match existing {
            Some(raw) => {
                let mut category: Category = decode(&raw)?;
                category.replace(fields, now);
                table.insert(key.as_str(), encode(&category)?.as_str())?;
                Some(category)
            }
            None => None,
        }
    };
    write_txn.commit()?;

    Ok(replaced)
}

/// Removes a category. Items referencing it are left untouched.
pub fn delete_category(db: &Database, id: &DocumentId) -> StoreResult<bool> {
    let key = id.to_string();

    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_CATALOGUE)?;
        let removed = table.remove(key.as_str())?.is_some();
        removed
    };
    write_txn.commit()?;

    Ok(removed)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Lists items, newest first, optionally restricted to one category reference.
///
/// With a category the index table is range-scanned in reverse; the stored
/// item is re-checked for an exact match because category ids are free text
/// and may themselves contain `:`.
pub fn list_items(db: &Database, category_id: Option<&str>) -> StoreResult<Vec<Item>> {
    let read_txn = db.begin_read()?;
    let items_table = read_txn.open_table(TABLE_ITEMS)?;

    let Some(category_id) = category_id else {
        let mut items = Vec::new();
        for entry in items_table.iter()? {
            let (key, value) = entry?;
            match decode::<Item>(value.value()) {
                Ok(item) => items.push(item),
                Err(err) => warn!(id = key.value(), error = %err, "skipping unreadable item"),
            }
        }
        sort_newest_first(&mut items, |i| (i.created_at, i.id));
        return Ok(items);
    };

    let index = read_txn.open_table(TABLE_ITEM_CATEGORY_INDEX)?;
    // "{" sorts right after ":", so this covers every key with the prefix.
    let start_key = format!("{}:", category_id);
    let end_key = format!("{}:{{", category_id);

    let mut items = Vec::new();
    for entry in index.range(start_key.as_str()..end_key.as_str())?.rev() {
        let (_, item_id) = entry?;
        let Some(value) = items_table.get(item_id.value())? else {
            warn!(id = item_id.value(), "category index points at a missing item");
            continue;
        };
        match decode::<Item>(value.value()) {
            Ok(item) if item.category_id.as_deref() == Some(category_id) => items.push(item),
            Ok(_) => {}
            Err(err) => warn!(id = item_id.value(), error = %err, "skipping unreadable item"),
        }
    }

    Ok(items)
}

pub fn get_item(db: &Database, id: &DocumentId) -> StoreResult<Option<Item>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_ITEMS)?;
    let key = id.to_string();

    let value = table.get(key.as_str())?;
    let doc = value.map(|v| decode(v.value())).transpose()?;
    Ok(doc)
}

/// Stores a new item and its category index entry in one transaction.
pub fn insert_item(db: &Database, item: &Item) -> StoreResult<()> {
    let key = item.id.to_string();
    let record_json = encode(item)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_ITEMS)?;
        table.insert(key.as_str(), record_json.as_str())?;

        if let Some(index_key) = category_index_key(item) {
            let mut index = write_txn.open_table(TABLE_ITEM_CATEGORY_INDEX)?;
            index.insert(index_key.as_str(), key.as_str())?;
        }
    }
    write_txn.commit()?;
    Ok(())
}

/// Replaces the mutable fields of an item, moving its index entry when the
/// category reference changes. `None` when the id is unknown.
pub fn replace_item(
    db: &Database,
    id: &DocumentId,
    fields: ItemFields,
    now: DateTime<Utc>,
) -> StoreResult<Option<Item>> {
    let key = id.to_string();

    let write_txn = db.begin_write()?;
    let replaced = {
        let mut table = write_txn.open_table(TABLE_ITEMS)?;
        let existing = table.get(key.as_str())?.map(|v| v.value().to_owned());

        match existing {
            Some(raw) => {
                let mut item: Item = decode(&raw)?;
                let old_index_key = category_index_key(&item);
                item.replace(fields, now);
                let new_index_key = category_index_key(&item);

                table.insert(key.as_str(), encode(&item)?.as_str())?;

                if old_index_key != new_index_key {
                    let mut index = write_txn.open_table(TABLE_ITEM_CATEGORY_INDEX)?;
                    if let Some(old) = old_index_key {
                        index.remove(old.as_str())?;
                    }
                    if let Some(new) = new_index_key {
                        index.insert(new.as_str(), key.as_str())?;
                    }
                }
                Some(item)
            }
            None => None,
        }
    };
    write_txn.commit()?;

    Ok(replaced)
}

/// Removes an item and its index entry. Returns the removed document.
pub fn delete_item(db: &Database, id: &DocumentId) -> StoreResult<Option<Item>> {
    let key = id.to_string();

    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_ITEMS)?;
        let existing = table.remove(key.as_str())?.map(|v| v.value().to_owned());

        match existing {
            Some(raw) => {
                let item: Item = decode(&raw)?;
                if let Some(index_key) = category_index_key(&item) {
                    let mut index = write_txn.open_table(TABLE_ITEM_CATEGORY_INDEX)?;
                    index.remove(index_key.as_str())?;
                }
                Some(item)
            }
            None => None,
        }
    };
    write_txn.commit()?;

    Ok(removed)
}

// ---------------------------------------------------------------------------
// Admin users and sessions
// ---------------------------------------------------------------------------

pub fn get_admin(db: &Database, username: &str) -> StoreResult<Option<AdminUser>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_ADMIN_USERS)?;

    let value = table.get(username)?;
    let user = value.map(|v| decode(v.value())).transpose()?;
    Ok(user)
}

/// Inserts the admin user or overwrites the existing one with the same name.
pub fn upsert_admin(db: &Database, user: &AdminUser) -> StoreResult<()> {
    let record_json = encode(user)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_ADMIN_USERS)?;
        table.insert(user.username.as_str(), record_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn insert_session(db: &Database, session: &Session) -> StoreResult<()> {
    let record_json = encode(session)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        table.insert(session.token.as_str(), record_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Looks up a live session. Expired sessions are removed and reported as absent.
pub fn find_session(db: &Database, token: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
    let session: Session = {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(TABLE_SESSIONS)?;
        let value = table.get(token)?;
        let Some(raw) = value.map(|v| v.value().to_owned()) else {
            return Ok(None);
        };
        decode(&raw)?
    };

    if session.is_expired(now) {
        delete_session(db, token)?;
        return Ok(None);
    }
    Ok(Some(session))
}

/// Removes every session that has expired (or can no longer be read).
/// Returns how many were removed.
pub fn purge_expired_sessions(db: &Database, now: DateTime<Utc>) -> StoreResult<usize> {
    let write_txn = db.begin_write()?;
    let purged = {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;

        let mut expired = Vec::new();
        for entry in table.iter()? {
            let (token, value) = entry?;
            let live = decode::<Session>(value.value())
                .map(|session| !session.is_expired(now))
                .unwrap_or(false);
            if !live {
                expired.push(token.value().to_owned());
            }
        }

        for token in &expired {
            table.remove(token.as_str())?;
        }
        expired.len()
    };
    write_txn.commit()?;

    Ok(purged)
}

pub fn delete_session(db: &Database, token: &str) -> StoreResult<bool> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        let removed = table.remove(token)?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}
