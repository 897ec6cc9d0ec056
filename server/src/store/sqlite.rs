//! SQLite implementation of the user and message stores.
//!
//! rusqlite is synchronous: every call takes the shared connection lock
//! inside `spawn_blocking`, never on the async executor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::models::{Message, NewMessage, NewUser, User};
use crate::db::{self, DbPool};
use crate::store::{MessageStore, StoreError, UserStore};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name,
    profile_picture, is_online, last_seen, is_deleted, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, message_type,
    attachment_url, is_read, read_at, is_deleted, created_at";

/// SQLite `LIMIT -1` means no limit.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        profile_picture: row.get(6)?,
        is_online: row.get(7)?,
        last_seen: row.get::<_, Option<i64>>(8)?.map(db::from_micros),
        contacts: Vec::new(),
        blocked_users: Vec::new(),
        is_deleted: row.get(9)?,
        created_at: db::from_micros(row.get(10)?),
        updated_at: db::from_micros(row.get(11)?),
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        message_type: row.get(4)?,
        attachment_url: row.get(5)?,
        is_read: row.get(6)?,
        read_at: row.get::<_, Option<i64>>(7)?.map(db::from_micros),
        is_deleted: row.get(8)?,
        created_at: db::from_micros(row.get(9)?),
    })
}

/// Fill in the contact and block lists for a loaded user row.
fn load_relations(conn: &Connection, user: &mut User) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "SELECT contact_id FROM user_contacts WHERE user_id = ?1 ORDER BY position ASC",
    )?;
    user.contacts = stmt
        .query_map([&user.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut stmt = conn.prepare("SELECT blocked_id FROM user_blocks WHERE user_id = ?1")?;
    user.blocked_users = stmt
        .query_map([&user.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(())
}

fn query_user(conn: &Connection, filter: &str, param: &str) -> rusqlite::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    let user = conn.query_row(&sql, [param], user_from_row).optional()?;
    match user {
        Some(mut user) => {
            load_relations(conn, &mut user)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn query_message(conn: &Connection, id: &str) -> rusqlite::Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1 AND is_deleted = 0");
    conn.query_row(&sql, [id], message_from_row).optional()
}

/// Shared handle to the SQLite database implementing both store traits.
#[derive(Clone)]
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Run a closure against the locked connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&*conn)
        })
        .await?
    }

    // --- Accounts ---

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.run(move |conn| {
            let username_taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1",
                    [&new_user.username],
                    |row| row.get(0),
                )
                .optional()?;
            if username_taken.is_some() {
                return Err(StoreError::Conflict("username"));
            }

            let email_taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    [&new_user.email],
                    |row| row.get(0),
                )
                .optional()?;
            if email_taken.is_some() {
                return Err(StoreError::Conflict("email"));
            }

            let id = uuid::Uuid::now_v7().to_string();
            let now = db::to_micros(db::now());
            conn.execute(
                "INSERT INTO users (id, username, email, password_hash, first_name, last_name,
                                    profile_picture, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    id,
                    new_user.username,
                    new_user.email,
                    new_user.password_hash,
                    new_user.first_name,
                    new_user.last_name,
                    new_user.profile_picture,
                    now,
                ],
            )?;

            let user = query_user(conn, "id = ?1", &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(user)
        })
        .await
    }

    /// Non-deleted user by username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        self.run(move |conn| Ok(query_user(conn, "username = ?1 AND is_deleted = 0", &username)?))
            .await
    }

    /// All non-deleted users other than `user_id`, ordered by username.
    pub async fn list_users_except(&self, user_id: &str) -> Result<Vec<User>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id != ?1 AND is_deleted = 0
                 ORDER BY username ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut users = stmt
                .query_map([&user_id], user_from_row)?
                .collect::<rusqlite::Result<Vec<User>>>()?;
            for user in users.iter_mut() {
                load_relations(conn, user)?;
            }
            Ok(users)
        })
        .await
    }

    /// Update name fields; the profile picture is only replaced when provided.
    pub async fn update_profile(
        &self,
        user_id: &str,
        first_name: String,
        last_name: String,
        profile_picture: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET first_name = ?2, last_name = ?3,
                     profile_picture = COALESCE(?4, profile_picture), updated_at = ?5
                 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![
                    user_id,
                    first_name,
                    last_name,
                    profile_picture,
                    db::to_micros(db::now())
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            Ok(query_user(conn, "id = ?1", &user_id)?)
        })
        .await
    }

    pub async fn set_profile_picture(&self, user_id: &str, url: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let url = url.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET profile_picture = ?2, updated_at = ?3
                 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![user_id, url, db::to_micros(db::now())],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Soft-delete an account. Returns false if it was missing or already deleted.
    pub async fn soft_delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET is_deleted = 1, is_online = 0, updated_at = ?2
                 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![user_id, db::to_micros(db::now())],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    // --- Contacts and blocking ---

    /// Append a contact. Returns false if it was already present.
    pub async fn add_contact(&self, user_id: &str, contact_id: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let contact_id = contact_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO user_contacts (user_id, contact_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1
                                  FROM user_contacts WHERE user_id = ?1))",
                rusqlite::params![user_id, contact_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn remove_contact(&self, user_id: &str, contact_id: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let contact_id = contact_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM user_contacts WHERE user_id = ?1 AND contact_id = ?2",
                rusqlite::params![user_id, contact_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Non-deleted contacts of a user, in the order they were added.
    pub async fn list_contacts(&self, user_id: &str) -> Result<Vec<User>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 JOIN user_contacts c ON c.contact_id = users.id
                 WHERE c.user_id = ?1 AND users.is_deleted = 0
                 ORDER BY c.position ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut users = stmt
                .query_map([&user_id], user_from_row)?
                .collect::<rusqlite::Result<Vec<User>>>()?;
            for user in users.iter_mut() {
                load_relations(conn, user)?;
            }
            Ok(users)
        })
        .await
    }

    pub async fn block_user(&self, user_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let blocked_id = blocked_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO user_blocks (user_id, blocked_id) VALUES (?1, ?2)",
                rusqlite::params![user_id, blocked_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn unblock_user(&self, user_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let blocked_id = blocked_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM user_blocks WHERE user_id = ?1 AND blocked_id = ?2",
                rusqlite::params![user_id, blocked_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| Ok(query_user(conn, "id = ?1", &id)?)).await
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE id = ?1 AND is_deleted = 0",
                    [&id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn set_online(
        &self,
        id: &str,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.execute(
                "UPDATE users SET is_online = ?2, last_seen = ?3 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![id, online, db::to_micros(at)],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.run(move |conn| {
            let id = uuid::Uuid::now_v7().to_string();
            let created_at = db::now();
            let micros = db::to_micros(created_at);
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, message_type,
                                       attachment_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    id,
                    message.sender_id,
                    message.receiver_id,
                    message.content,
                    message.message_type,
                    message.attachment_url,
                    micros,
                ],
            )?;

            Ok(Message {
                id,
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                content: message.content,
                message_type: message.message_type,
                attachment_url: message.attachment_url,
                is_read: false,
                read_at: None,
                created_at,
                is_deleted: false,
            })
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| Ok(query_message(conn, &id)?)).await
    }

    async fn mark_read(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            let micros = db::to_micros(at);
            conn.execute(
                "UPDATE messages
                 SET is_read = 1, read_at = COALESCE(read_at, ?2), updated_at = ?2
                 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![id, micros],
            )?;
            Ok(query_message(conn, &id)?)
        })
        .await
    }

    async fn mark_all_read(
        &self,
        sender_id: &str,
        receiver_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let sender_id = sender_id.to_string();
        let receiver_id = receiver_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM messages
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0 AND is_deleted = 0
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let ids = stmt
                .query_map(rusqlite::params![sender_id, receiver_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;

            let micros = db::to_micros(at);
            conn.execute(
                "UPDATE messages SET is_read = 1, read_at = ?3, updated_at = ?3
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0 AND is_deleted = 0",
                rusqlite::params![sender_id, receiver_id, micros],
            )?;
            Ok(ids)
        })
        .await
    }

    async fn find_by_participants(
        &self,
        user_a: &str,
        user_b: &str,
        skip: usize,
        take: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        let user_a = user_a.to_string();
        let user_b = user_b.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE ((sender_id = ?1 AND receiver_id = ?2)
                     OR (sender_id = ?2 AND receiver_id = ?1))
                   AND is_deleted = 0
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let messages = stmt
                .query_map(
                    rusqlite::params![user_a, user_b, sql_limit(take), skip as i64],
                    message_from_row,
                )?
                .collect::<rusqlite::Result<Vec<Message>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn count_unread_from(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<u64, StoreError> {
        let sender_id = sender_id.to_string();
        let receiver_id = receiver_id.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0 AND is_deleted = 0",
                rusqlite::params![sender_id, receiver_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn count_unread(&self, receiver_id: &str) -> Result<u64, StoreError> {
        let receiver_id = receiver_id.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE receiver_id = ?1 AND is_read = 0 AND is_deleted = 0",
                [&receiver_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn find_unread(&self, receiver_id: &str) -> Result<Vec<Message>, StoreError> {
        let receiver_id = receiver_id.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE receiver_id = ?1 AND is_read = 0 AND is_deleted = 0
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let messages = stmt
                .query_map([&receiver_id], message_from_row)?
                .collect::<rusqlite::Result<Vec<Message>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn find_recent_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE (sender_id = ?1 OR receiver_id = ?1) AND is_deleted = 0
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let messages = stmt
                .query_map(rusqlite::params![user_id, sql_limit(limit)], message_from_row)?
                .collect::<rusqlite::Result<Vec<Message>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_deleted = 1, updated_at = ?2
                 WHERE id = ?1 AND is_deleted = 0",
                rusqlite::params![id, db::to_micros(db::now())],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MessageType;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            first_name: name.to_string(),
            last_name: "Test".to_string(),
            profile_picture: None,
        }
    }

    fn text(sender: &str, receiver: &str, content: &str) -> NewMessage {
        NewMessage {
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            content: content.to_string(),
            message_type: MessageType::Text,
            attachment_url: None,
        }
    }

    fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let db = db::init_db(tmp.path().to_str().unwrap()).unwrap();
        (SqliteStore::new(db), tmp)
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_username_and_email() {
        let (store, _tmp) = test_store();
        store.create_user(new_user("alice")).await.unwrap();

        let dup_name = store.create_user(new_user("alice")).await;
        assert!(matches!(dup_name, Err(StoreError::Conflict("username"))));

        let mut other = new_user("alice2");
        other.email = "alice@example.com".to_string();
        let dup_email = store.create_user(other).await;
        assert!(matches!(dup_email, Err(StoreError::Conflict("email"))));
    }

    #[tokio::test]
    async fn contacts_keep_insertion_order_without_duplicates() {
        let (store, _tmp) = test_store();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let carol = store.create_user(new_user("carol")).await.unwrap();

        assert!(store.add_contact(&alice.id, &carol.id).await.unwrap());
        assert!(store.add_contact(&alice.id, &bob.id).await.unwrap());
        assert!(!store.add_contact(&alice.id, &carol.id).await.unwrap());

        let loaded = UserStore::find_by_id(&store, &alice.id).await.unwrap().unwrap();
        assert_eq!(loaded.contacts, vec![carol.id.clone(), bob.id.clone()]);

        let contacts = store.list_contacts(&alice.id).await.unwrap();
        let names: Vec<_> = contacts.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob"]);

        assert!(store.remove_contact(&alice.id, &carol.id).await.unwrap());
        assert!(!store.remove_contact(&alice.id, &carol.id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_read_keeps_first_timestamp() {
        let (store, _tmp) = test_store();
        let msg = store.insert(text("a", "b", "hi")).await.unwrap();

        let first = db::now();
        let read = store.mark_read(&msg.id, first).await.unwrap().unwrap();
        assert!(read.is_read);
        assert_eq!(read.read_at, Some(first));

        let later = first + chrono::Duration::seconds(30);
        let again = store.mark_read(&msg.id, later).await.unwrap().unwrap();
        assert_eq!(again.read_at, Some(first));
    }

    #[tokio::test]
    async fn soft_deleted_messages_are_hidden() {
        let (store, _tmp) = test_store();
        let keep = store.insert(text("a", "b", "keep")).await.unwrap();
        let gone = store.insert(text("b", "a", "gone")).await.unwrap();

        assert!(store.soft_delete(&gone.id).await.unwrap());
        assert!(!store.soft_delete(&gone.id).await.unwrap());

        assert!(MessageStore::find_by_id(&store, &gone.id).await.unwrap().is_none());
        let history = store.find_by_participants("a", "b", 0, None).await.unwrap();
        assert_eq!(history, vec![keep]);
        assert_eq!(store.count_unread("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recent_for_user_is_newest_first_and_limited() {
        let (store, _tmp) = test_store();
        let first = store.insert(text("a", "b", "1")).await.unwrap();
        let second = store.insert(text("c", "a", "2")).await.unwrap();
        let third = store.insert(text("a", "c", "3")).await.unwrap();
        store.insert(text("b", "c", "unrelated")).await.unwrap();

        let all = store.find_recent_for_user("a", None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![third.id.clone(), second.id.clone(), first.id]);

        let limited = store.find_recent_for_user("a", Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, third.id);
    }

    #[tokio::test]
    async fn deleted_user_cannot_come_online() {
        let (store, _tmp) = test_store();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        assert!(store.soft_delete_user(&alice.id).await.unwrap());

        store.set_online(&alice.id, true, db::now()).await.unwrap();
        let loaded = UserStore::find_by_id(&store, &alice.id).await.unwrap().unwrap();
        assert!(!loaded.is_online);
        assert!(!store.exists(&alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_all_read_only_touches_one_direction() {
        let (store, _tmp) = test_store();
        let m1 = store.insert(text("a", "b", "1")).await.unwrap();
        let m2 = store.insert(text("a", "b", "2")).await.unwrap();
        store.insert(text("b", "a", "reply")).await.unwrap();

        let ids = store.mark_all_read("a", "b", db::now()).await.unwrap();
        assert_eq!(ids, vec![m1.id, m2.id]);
        assert_eq!(store.count_unread_from("a", "b").await.unwrap(), 0);
        assert_eq!(store.count_unread_from("b", "a").await.unwrap(), 1);
    }
}
