//! In-memory job and user storage
//!
//! Nothing survives a restart. DashMap entry locks make each update atomic.

use dashmap::DashMap;
use std::path::PathBuf;
use uuid::Uuid;

use super::{JobStore, UserStore};
use crate::error::Result;
use crate::types::{JobArtifacts, JobPatch, NewJob, NewUser, ProcessingJob, User};

#[derive(Debug, Clone)]
struct JobEntry {
    job: ProcessingJob,
    artifacts: JobArtifacts,
}

/// DashMap-backed store for jobs and users
#[derive(Debug, Default)]
pub struct InMemoryStore {
    jobs: DashMap<Uuid, JobEntry>,
    users: DashMap<Uuid, User>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryStore {
    fn get(&self, id: &Uuid) -> Option<ProcessingJob> {
        self.jobs.get(id).map(|entry| entry.job.clone())
    }

    fn list(&self, user_id: Option<&Uuid>) -> Vec<ProcessingJob> {
        let mut jobs: Vec<ProcessingJob> = self
            .jobs
            .iter()
            .filter(|entry| user_id.map_or(true, |uid| entry.job.user_id.as_ref() == Some(uid)))
            .map(|entry| entry.job.clone())
            .collect();

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        jobs
    }

    fn create(&self, input: NewJob) -> ProcessingJob {
        let artifacts = JobArtifacts {
            input_path: input.input_path.clone(),
            output_path: None,
        };
        let job = ProcessingJob::new(input);
        self.jobs.insert(
            job.id,
            JobEntry {
                job: job.clone(),
                artifacts,
            },
        );
        job
    }

    fn update(&self, id: &Uuid, patch: JobPatch) -> Result<Option<ProcessingJob>> {
        let Some(mut entry) = self.jobs.get_mut(id) else {
            return Ok(None);
        };
        entry.job.apply(patch)?;
        Ok(Some(entry.job.clone()))
    }

    fn delete(&self, id: &Uuid) -> bool {
        self.jobs.remove(id).is_some()
    }

    fn artifacts(&self, id: &Uuid) -> Option<JobArtifacts> {
        self.jobs.get(id).map(|entry| entry.artifacts.clone())
    }

    fn set_output_path(&self, id: &Uuid, path: PathBuf) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut entry) => {
                entry.artifacts.output_path = Some(path);
                true
            }
            None => false,
        }
    }
}

impl UserStore for InMemoryStore {
    fn get_user(&self, id: &Uuid) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone())
    }

    fn create_user(&self, input: NewUser) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            password: input.password,
        };
        self.users.insert(user.id, user.clone());
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{JobStatus, ToolType};

    fn new_job(name: &str) -> NewJob {
        NewJob {
            file_name: name.to_string(),
            file_size: "1.00 KB".to_string(),
            tool_type: ToolType::MergePdf,
            metadata: Some(serde_json::json!({ "quality": "high" })),
            input_path: Some(PathBuf::from(format!("uploads/{}", name))),
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = InMemoryStore::new();
        let job = store.create(new_job("a.pdf"));

        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched, job);
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.metadata.unwrap()["quality"], "high");

        let artifacts = store.artifacts(&job.id).unwrap();
        assert_eq!(artifacts.input_path, Some(PathBuf::from("uploads/a.pdf")));
        assert!(artifacts.output_path.is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let store = InMemoryStore::new();
        let first = store.create(new_job("first.pdf"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create(new_job("second.pdf"));

        let jobs = store.list(None);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }

    #[test]
    fn test_list_filters_by_user() {
        let store = InMemoryStore::new();
        store.create(new_job("a.pdf"));

        assert_eq!(store.list(None).len(), 1);
        assert!(store.list(Some(&Uuid::new_v4())).is_empty());
    }

    #[test]
    fn test_update_missing_is_none() {
        let store = InMemoryStore::new();
        let result = store
            .update(&Uuid::new_v4(), JobPatch::status(JobStatus::Processing))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_update_rejects_illegal_transition() {
        let store = InMemoryStore::new();
        let job = store.create(new_job("a.pdf"));
        store.update(&job.id, JobPatch::status(JobStatus::Completed)).unwrap();

        let err = store
            .update(&job.id, JobPatch::status(JobStatus::Pending))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert_eq!(store.get(&job.id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_delete() {
        let store = InMemoryStore::new();
        let job = store.create(new_job("a.pdf"));

        assert!(store.delete(&job.id));
        assert!(!store.delete(&job.id));
        assert!(store.get(&job.id).is_none());
        assert!(!store.set_output_path(&job.id, PathBuf::from("outputs/x.pdf")));
    }

    #[test]
    fn test_users() {
        let store = InMemoryStore::new();
        let user = store.create_user(NewUser {
            username: "ada".to_string(),
            password: "secret".to_string(),
        });

        assert_eq!(store.get_user(&user.id), Some(user.clone()));
        assert_eq!(store.get_user_by_username("ada"), Some(user));
        assert!(store.get_user_by_username("bob").is_none());
    }
}
