use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::entity::{
    EnvironmentService, EnvironmentServiceReset, Project, ProjectService, Reservation,
};
use crate::domain::repository::{
    EnvironmentServiceRepository, ProjectServiceRepository, ReservationRepository,
};

#[derive(Debug, Clone)]
struct ProjectRecord {
    name: String,
    status: String,
    services: BTreeMap<String, ProjectService>,
}

#[derive(Debug, Default)]
struct State {
    projects: BTreeMap<String, ProjectRecord>,
    /// environment_id -> project_id
    environments: BTreeMap<String, String>,
    bindings: HashMap<(String, String), EnvironmentService>,
    reservations: HashMap<String, Reservation>,
}

fn key(environment_id: &str, service_id: &str) -> (String, String) {
    (environment_id.to_string(), service_id.to_string())
}

/// InMemoryQuotaStore はデータベース未設定時とテストで使うインメモリストア。
///
/// 全状態を 1 つの Mutex で保護するため、各操作はそれだけで不可分になる。
/// 3 つのリポジトリトレイトをすべて実装する。
pub struct InMemoryQuotaStore {
    state: Mutex<State>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// プロジェクトを登録する。同じ ID が既にあれば何もしない。
    pub async fn add_project(&self, id: &str, name: &str) {
        let mut state = self.state.lock().await;
        state
            .projects
            .entry(id.to_string())
            .or_insert_with(|| ProjectRecord {
                name: name.to_string(),
                status: "active".to_string(),
                services: BTreeMap::new(),
            });
    }

    pub async fn assign_service(&self, project_id: &str, service: ProjectService) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        let project = state
            .projects
            .get_mut(project_id)
            .ok_or_else(|| anyhow::anyhow!("project not found: {}", project_id))?;
        project
            .services
            .insert(service.service_id.clone(), service);
        Ok(())
    }

    pub async fn add_environment(&self, environment_id: &str, project_id: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if !state.projects.contains_key(project_id) {
            anyhow::bail!("project not found: {}", project_id);
        }
        state
            .environments
            .insert(environment_id.to_string(), project_id.to_string());
        Ok(())
    }

    /// Environment にサービスを紐づける。既存の紐づけは上書きする。
    pub async fn bind_service(&self, binding: EnvironmentService) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if !state.environments.contains_key(&binding.environment_id) {
            anyhow::bail!("environment not found: {}", binding.environment_id);
        }
        state.bindings.insert(
            key(&binding.environment_id, &binding.service_id),
            binding,
        );
        Ok(())
    }

    pub async fn project_service(&self, project_id: &str, service_id: &str) -> Option<ProjectService> {
        let state = self.state.lock().await;
        state
            .projects
            .get(project_id)
            .and_then(|p| p.services.get(service_id).cloned())
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

impl Default for InMemoryQuotaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnvironmentServiceRepository for InMemoryQuotaStore {
    async fn find(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<Option<EnvironmentService>> {
        let state = self.state.lock().await;
        Ok(state.bindings.get(&key(environment_id, service_id)).cloned())
    }

    async fn decrement_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state
            .bindings
            .get_mut(&key(environment_id, service_id))
            .is_some_and(EnvironmentService::try_consume))
    }

    async fn increase_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(binding) = state.bindings.get_mut(&key(environment_id, service_id)) {
            binding.release();
        }
        Ok(())
    }

    async fn reset_available_requests(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(binding) = state.bindings.get_mut(&key(environment_id, service_id)) {
            binding.refill();
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryQuotaStore {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Reservation>> {
        let state = self.state.lock().await;
        Ok(state.reservations.get(id).cloned())
    }

    async fn create(&self, reservation: &Reservation) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.reservations.contains_key(&reservation.id) {
            anyhow::bail!("reservation already exists: {}", reservation.id);
        }
        state
            .reservations
            .insert(reservation.id.clone(), reservation.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.reservations.remove(id).is_some())
    }

    async fn reserve(&self, reservation: &Reservation) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.reservations.contains_key(&reservation.id) {
            anyhow::bail!("reservation already exists: {}", reservation.id);
        }
        let consumed = state
            .bindings
            .get_mut(&key(&reservation.environment_id, &reservation.service_id))
            .is_some_and(EnvironmentService::try_consume);
        if consumed {
            state
                .reservations
                .insert(reservation.id.clone(), reservation.clone());
        }
        Ok(consumed)
    }

    async fn rollback(&self, reservation: &Reservation) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.reservations.remove(&reservation.id) else {
            return Ok(false);
        };
        if let Some(binding) = state
            .bindings
            .get_mut(&key(&stored.environment_id, &stored.service_id))
        {
            binding.release();
        }
        Ok(true)
    }
}

#[async_trait]
impl ProjectServiceRepository for InMemoryQuotaStore {
    async fn list_project_service_due_for_reset(
        &self,
        today: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Project>> {
        let state = self.state.lock().await;
        let projects = state
            .projects
            .iter()
            .filter_map(|(id, record)| {
                let services: Vec<ProjectService> = record
                    .services
                    .values()
                    .filter(|s| !s.is_unlimited() && s.is_due(today))
                    .cloned()
                    .collect();
                (!services.is_empty()).then(|| Project {
                    id: id.clone(),
                    name: record.name.clone(),
                    status: record.status.clone(),
                    services,
                })
            })
            .collect();
        Ok(projects)
    }

    async fn reset_project_service_usage(
        &self,
        project_id: &str,
        service_id: &str,
        next_reset: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EnvironmentServiceReset>> {
        let mut state = self.state.lock().await;
        let State {
            projects,
            environments,
            bindings,
            ..
        } = &mut *state;

        let service = projects
            .get_mut(project_id)
            .and_then(|p| p.services.get_mut(service_id))
            .ok_or_else(|| {
                anyhow::anyhow!("project service not found: {}/{}", project_id, service_id)
            })?;
        service.next_reset = Some(next_reset);

        let mut resets = Vec::new();
        for (environment_id, owner) in environments.iter() {
            if owner != project_id {
                continue;
            }
            if let Some(binding) = bindings.get_mut(&key(environment_id, service_id)) {
                binding.refill();
                resets.push(EnvironmentServiceReset {
                    environment_id: binding.environment_id.clone(),
                    service_id: binding.service_id.clone(),
                    max_request: binding.max_request,
                    available_request: binding.available_request,
                    next_reset,
                });
            }
        }
        Ok(resets)
    }
}
