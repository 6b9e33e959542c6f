//! In-memory backend and helpers for controller and router tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::repository::{
    Persistable, QueryOptions, Repository, RepositoryError, RepositoryResult, ValidationError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub rank: i64,
}

/// Error a fake call should fail with
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    PermissionDenied,
    Validation,
    Other,
}

impl Failure {
    fn error(self) -> RepositoryError {
        match self {
            Self::PermissionDenied => RepositoryError::PermissionDenied,
            Self::Validation => {
                RepositoryError::from(ValidationError::new().with_field("field1", "not_valid"))
            }
            Self::Other => RepositoryError::other("unknown error"),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    things: BTreeMap<String, Thing>,
    next_id: u64,
    fail: Option<Failure>,
    fail_count: Option<Failure>,
    calls: Vec<&'static str>,
    last_options: Option<QueryOptions>,
    last_update: Option<(String, Vec<String>)>,
    deleted: Vec<String>,
}

/// Shared-state fake; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct FakeRepository {
    state: Arc<Mutex<State>>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Things with ids "1", "2", ... and rank equal to the id
    pub fn with_things(titles: &[&str]) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.state();
            for (index, title) in titles.iter().enumerate() {
                let id = (index + 1).to_string();
                state.things.insert(
                    id.clone(),
                    Thing {
                        id,
                        title: title.to_string(),
                        rank: index as i64 + 1,
                    },
                );
            }
            state.next_id = titles.len() as u64;
        }
        fake
    }

    pub fn fail_with(&self, failure: Failure) {
        self.state().fail = Some(failure);
    }

    pub fn fail_count_with(&self, failure: Failure) {
        self.state().fail_count = Some(failure);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn last_options(&self) -> Option<QueryOptions> {
        self.state().last_options.clone()
    }

    pub fn last_update(&self) -> Option<(String, Vec<String>)> {
        self.state().last_update.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn thing(&self, id: &str) -> Option<Thing> {
        self.state().things.get(id).cloned()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn enter(&self, call: &'static str) -> RepositoryResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call);
        let fail = state.fail;
        match fail {
            Some(failure) => Err(failure.error()),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl Repository<Thing> for FakeRepository {
    async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64> {
        let mut state = self.state();
        state.calls.push("count");
        if let Some(failure) = state.fail_count {
            return Err(failure.error());
        }
        state.last_options = Some(options.clone());
        Ok(state.things.len() as u64)
    }

    async fn read(&self, id: &str) -> RepositoryResult<Thing> {
        let state = self.enter("read")?;
        state.things.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<Thing>> {
        let mut state = self.enter("read_all")?;
        state.last_options = Some(options.clone());
        let matching = state.things.values().filter(|thing| {
            options
                .filter("title")
                .map_or(true, |filter| filter.matches(&thing.title))
        });
        let window = matching.skip(options.offset as usize);
        let things = if options.is_windowed() {
            window.take(options.max as usize).cloned().collect()
        } else {
            window.cloned().collect()
        };
        Ok(things)
    }
}

#[async_trait]
impl Persistable<Thing> for FakeRepository {
    async fn save(&self, mut entity: Thing) -> RepositoryResult<String> {
        let mut state = self.enter("save")?;
        state.next_id += 1;
        let id = state.next_id.to_string();
        entity.id = id.clone();
        state.things.insert(id.clone(), entity);
        Ok(id)
    }

    async fn update(&self, id: &str, entity: Thing, fields: &[String]) -> RepositoryResult<()> {
        let mut state = self.enter("update")?;
        state.last_update = Some((id.to_string(), fields.to_vec()));
        let stored = state.things.get_mut(id).ok_or(RepositoryError::NotFound)?;
        for field in fields {
            match field.as_str() {
                "title" => stored.title = entity.title.clone(),
                "rank" => stored.rank = entity.rank,
                _ => {}
            }
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> RepositoryResult<()> {
        let mut state = self.enter("delete")?;
        if ids.iter().any(|id| !state.things.contains_key(id)) {
            return Err(RepositoryError::NotFound);
        }
        for id in ids {
            state.things.remove(id);
            state.deleted.push(id.clone());
        }
        Ok(())
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
