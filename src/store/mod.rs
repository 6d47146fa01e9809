pub mod models;

use std::fmt;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use self::models::{FileRecord, Task, User};

/// Uniqueness violations reported by [`Store::insert_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    EmailTaken,
    UsernameTaken,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::EmailTaken => write!(f, "email is already registered"),
            StoreError::UsernameTaken => write!(f, "username is already taken"),
        }
    }
}

impl std::error::Error for StoreError {}

/// In-memory record store: primary-key maps with owner-id filtering.
/// Cheap to clone; clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct Store {
    users: Arc<DashMap<String, User>>,
    tasks: Arc<DashMap<String, Task>>,
    files: Arc<DashMap<String, FileRecord>>,
    // serializes the uniqueness scan + insert in `insert_user`
    user_write_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user. Fails when the username or email is already taken.
    pub fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let _guard = self.user_write_lock.lock().expect("user write lock poisoned");

        if self.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UsernameTaken);
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    pub fn user_by_id(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone())
    }

    pub fn insert_task(&self, task: Task) -> Task {
        self.tasks.insert(task.id.clone(), task.clone());
        task
    }

    /// Fetch a task by id, visible only to its owner.
    pub fn task_for_owner(&self, id: &str, owner_id: &str) -> Option<Task> {
        self.tasks
            .get(id)
            .filter(|t| t.owner_id == owner_id)
            .map(|t| t.value().clone())
    }

    /// All tasks owned by `owner_id`, oldest first.
    pub fn tasks_for_owner(&self, owner_id: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Remove an owner's task and cascade its file records. Returns the
    /// removed task together with the orphaned records so the caller can
    /// clean up the stored copies.
    pub fn remove_task(&self, id: &str, owner_id: &str) -> Option<(Task, Vec<FileRecord>)> {
        let (_, task) = self.tasks.remove_if(id, |_, t| t.owner_id == owner_id)?;

        let mut orphaned = Vec::new();
        self.files.retain(|_, file| {
            if file.task_id == id {
                orphaned.push(file.clone());
                false
            } else {
                true
            }
        });

        Some((task, orphaned))
    }

    pub fn insert_file(&self, record: FileRecord) -> FileRecord {
        self.files.insert(record.id.clone(), record.clone());
        record
    }

    /// Fetch a file record by id, visible only to its owner.
    pub fn file_for_owner(&self, id: &str, owner_id: &str) -> Option<FileRecord> {
        self.files
            .get(id)
            .filter(|f| f.owner_id == owner_id)
            .map(|f| f.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::models::TaskStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(username: &str, email: &str) -> User {
        User {
            id: Uuid::now_v7().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            created_at: Utc::now(),
        }
    }

    fn task(owner_id: &str, title: &str) -> Task {
        Task {
            id: Uuid::now_v7().to_string(),
            title: title.to_string(),
            description: None,
            status: TaskStatus::New,
            deadline: None,
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_email_and_username_are_rejected() {
        let store = Store::new();
        store.insert_user(user("ann", "ann@x.com")).unwrap();

        assert_eq!(
            store.insert_user(user("other", "ann@x.com")),
            Err(StoreError::EmailTaken)
        );
        assert_eq!(
            store.insert_user(user("ann", "ann2@x.com")),
            Err(StoreError::UsernameTaken)
        );
    }

    #[test]
    fn tasks_are_scoped_to_their_owner() {
        let store = Store::new();
        let ann = store.insert_user(user("ann", "ann@x.com")).unwrap();
        let bob = store.insert_user(user("bob", "bob@x.com")).unwrap();

        let t = store.insert_task(task(&ann.id, "write report"));
        store.insert_task(task(&bob.id, "read report"));

        assert!(store.user_by_id(&ann.id).is_some());
        assert_eq!(store.user_by_email("bob@x.com").unwrap().id, bob.id);
        assert_eq!(store.tasks_for_owner(&ann.id).len(), 1);
        assert!(store.task_for_owner(&t.id, &ann.id).is_some());
        assert!(store.task_for_owner(&t.id, &bob.id).is_none());
        assert!(store.remove_task(&t.id, &bob.id).is_none());
    }

    #[test]
    fn removing_a_task_cascades_its_files() {
        let store = Store::new();
        let ann = store.insert_user(user("ann", "ann@x.com")).unwrap();
        let t = store.insert_task(task(&ann.id, "with attachment"));
        let keep = store.insert_task(task(&ann.id, "without attachment"));

        let record = store.insert_file(FileRecord {
            id: Uuid::now_v7().to_string(),
            filename: "notes.txt".to_string(),
            path: "/tmp/notes.txt".to_string(),
            task_id: t.id.clone(),
            owner_id: ann.id.clone(),
            created_at: Utc::now(),
        });

        let (_, orphaned) = store.remove_task(&t.id, &ann.id).unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].id, record.id);
        assert!(store.file_for_owner(&record.id, &ann.id).is_none());
        assert!(store.task_for_owner(&keep.id, &ann.id).is_some());
    }
}
