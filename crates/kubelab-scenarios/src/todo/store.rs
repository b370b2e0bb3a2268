//! Todo persistence.

use std::time::Duration;

use async_trait::async_trait;
use kubelab_common::error::KubelabError;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

const COUNTER_KEY: &str = "todo_counter";
const LIST_KEY: &str = "todos";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A single todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Identifier, the decimal counter value.
    pub id: String,
    /// What needs doing.
    pub text: String,
    /// Whether it has been done.
    pub completed: bool,
    /// Creation time, `%Y-%m-%d %H:%M:%S`.
    pub created_at: String,
}

impl Todo {
    /// Creates an open todo stamped with the current local time.
    #[must_use]
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            text: text.into(),
            completed: false,
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Storage backend for todos.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Checks the backend is reachable.
    async fn ping(&self) -> Result<(), ScenarioError>;

    /// All todos in insertion order.
    async fn list(&self) -> Result<Vec<Todo>, ScenarioError>;

    /// Adds a todo and returns its id.
    async fn add(&self, text: &str) -> Result<u64, ScenarioError>;

    /// Marks a todo as completed. Unknown ids are ignored.
    async fn complete(&self, id: &str) -> Result<(), ScenarioError>;

    /// Removes a todo. Unknown ids are ignored.
    async fn delete(&self, id: &str) -> Result<(), ScenarioError>;
}

fn item_key(id: &str) -> String {
    format!("todo:{id}")
}

/// Redis-backed store.
///
/// Each todo is a JSON string under `todo:<id>`; the `todos` list keeps
/// the ids in insertion order and `todo_counter` hands out new ids.
#[derive(Clone)]
pub struct RedisTodoStore {
    conn: MultiplexedConnection,
}

impl RedisTodoStore {
    /// Connects to Redis at `host:port` and verifies the connection with PING.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or does not answer.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ScenarioError> {
        let client = redis::Client::open(format!("redis://{host}:{port}/"))?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| ScenarioError::Unavailable(format!("timed out connecting to {host}:{port}")))??;
        let store = Self { conn };
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl TodoStore for RedisTodoStore {
    async fn ping(&self) -> Result<(), ScenarioError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Todo>, ScenarioError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.lrange(LIST_KEY, 0, -1).await?;
        let mut todos = Vec::with_capacity(ids.len());
        for id in ids {
            let data: Option<String> = conn.get(item_key(&id)).await?;
            if let Some(data) = data {
                todos.push(serde_json::from_str(&data).map_err(KubelabError::from)?);
            }
        }
        Ok(todos)
    }

    async fn add(&self, text: &str) -> Result<u64, ScenarioError> {
        let mut conn = self.conn.clone();
        let id: u64 = conn.incr(COUNTER_KEY, 1_u64).await?;
        let todo = Todo::new(id, text);
        let json = serde_json::to_string(&todo).map_err(KubelabError::from)?;
        conn.set::<_, _, ()>(item_key(&todo.id), json).await?;
        conn.rpush::<_, _, ()>(LIST_KEY, &todo.id).await?;
        Ok(id)
    }

    async fn complete(&self, id: &str) -> Result<(), ScenarioError> {
        let mut conn = self.conn.clone();
        let key = item_key(id);
        let data: Option<String> = conn.get(&key).await?;
        if let Some(data) = data {
            let mut todo: Todo = serde_json::from_str(&data).map_err(KubelabError::from)?;
            todo.completed = true;
            let json = serde_json::to_string(&todo).map_err(KubelabError::from)?;
            conn.set::<_, _, ()>(&key, json).await?;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ScenarioError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(item_key(id)).await?;
        conn.lrem::<_, _, ()>(LIST_KEY, 0, id).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_todo_is_open_with_formatted_timestamp() {
        let todo = Todo::new(7, "write docs");
        assert_eq!(todo.id, "7");
        assert!(!todo.completed);
        assert_eq!(todo.created_at.len(), "2026-01-01 00:00:00".len());
    }

    #[test]
    fn todo_json_uses_plain_field_names() {
        let todo = Todo {
            id: "1".into(),
            text: "a".into(),
            completed: true,
            created_at: "2026-01-01 00:00:00".into(),
        };
        let value = serde_json::to_value(&todo).unwrap();
        assert_eq!(value["completed"], true);
        assert_eq!(value["created_at"], "2026-01-01 00:00:00");
    }

    #[tokio::test]
    async fn redis_store_round_trip_when_available() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            return;
        };
        let url = url.trim_start_matches("redis://").trim_end_matches('/');
        let (host, port) = url.rsplit_once(':').unwrap_or((url, "6379"));
        let store = RedisTodoStore::connect(host, port.parse().unwrap()).await.unwrap();

        let id = store.add("from test").await.unwrap();
        store.complete(&id.to_string()).await.unwrap();
        let todos = store.list().await.unwrap();
        assert!(todos.iter().any(|t| t.id == id.to_string() && t.completed));

        store.delete(&id.to_string()).await.unwrap();
        let todos = store.list().await.unwrap();
        assert!(!todos.iter().any(|t| t.id == id.to_string()));
    }
}
