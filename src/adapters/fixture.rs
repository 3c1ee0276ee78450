//! Recorded CRM data served from memory.
//!
//! A fixture directory holds `deals.json`, `organizations.json`,
//! `persons.json` and `users.json`, each either a bare array of records or a
//! recorded API envelope (`{"success": true, "data": [...]}`). Missing files
//! are empty collections. Owner updates are applied to the in-memory copy,
//! so a later listing observes them the way the live API would.

use crate::domain::model::{
    Deal, EntityKind, ListResponse, Organization, OrganizationId, OwnerRef, OwnerUpdate,
    PageRequest, Person, PersonId, UpdateAck, User, UserId,
};
use crate::domain::ports::CrmSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Recorded<T> {
    Records(Vec<T>),
    Envelope(ListResponse<T>),
}

impl FixtureData {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            deals: read_collection(dir, "deals.json")?,
            organizations: read_collection(dir, "organizations.json")?,
            persons: read_collection(dir, "persons.json")?,
            users: read_collection(dir, "users.json")?,
        })
    }
}

fn read_collection<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::debug!("Fixture {} not found, using an empty collection", path.display());
        return Ok(Vec::new());
    }

    let content = std::fs::read(&path)?;
    let records = match serde_json::from_slice::<Recorded<T>>(&content)? {
        Recorded::Records(records) => records,
        Recorded::Envelope(envelope) => envelope.data.unwrap_or_default(),
    };
    tracing::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[derive(Debug, Default)]
struct FixtureState {
    data: FixtureData,
    updates: Vec<OwnerUpdate>,
    person_listings: usize,
}

#[derive(Debug, Default)]
pub struct FixtureSource {
    state: Mutex<FixtureState>,
}

impl FixtureSource {
    pub fn new(data: FixtureData) -> Self {
        Self {
            state: Mutex::new(FixtureState {
                data,
                ..FixtureState::default()
            }),
        }
    }

    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(FixtureData::from_dir(dir)?))
    }

    /// Every update call received, in order.
    pub fn recorded_updates(&self) -> Vec<OwnerUpdate> {
        self.lock().updates.clone()
    }

    /// Number of person page requests served.
    pub fn person_listings(&self) -> usize {
        self.lock().person_listings
    }

    /// Current state, including applied updates.
    pub fn snapshot(&self) -> FixtureData {
        self.lock().data.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn page_of<T: Clone>(records: &[T], request: &PageRequest) -> ListResponse<T> {
    let start = (request.start as usize).min(records.len());
    let end = start
        .saturating_add(request.limit.max(1) as usize)
        .min(records.len());
    ListResponse::page(
        records[start..end].to_vec(),
        request.start,
        u64::from(request.limit),
        end < records.len(),
    )
}

fn owner_ref(users: &[User], id: UserId) -> OwnerRef {
    OwnerRef {
        id,
        name: users.iter().find(|u| u.id == id).map(|u| u.name.clone()),
    }
}

#[async_trait]
impl CrmSource for FixtureSource {
    async fn list_deals(&self, request: &PageRequest) -> Result<ListResponse<Deal>> {
        Ok(page_of(&self.lock().data.deals, request))
    }

    async fn list_organizations(
        &self,
        request: &PageRequest,
    ) -> Result<ListResponse<Organization>> {
        Ok(page_of(&self.lock().data.organizations, request))
    }

    async fn list_organization_persons(
        &self,
        organization: OrganizationId,
        request: &PageRequest,
    ) -> Result<ListResponse<Person>> {
        let mut state = self.lock();
        state.person_listings += 1;
        let members: Vec<Person> = state
            .data
            .persons
            .iter()
            .filter(|p| p.organization_id() == Some(organization))
            .cloned()
            .collect();
        Ok(page_of(&members, request))
    }

    async fn list_users(&self) -> Result<ListResponse<User>> {
        Ok(ListResponse::complete(self.lock().data.users.clone()))
    }

    async fn update_organization_owner(
        &self,
        organization: OrganizationId,
        owner: UserId,
    ) -> Result<UpdateAck> {
        let mut state = self.lock();
        state.updates.push(OwnerUpdate {
            entity: EntityKind::Organization,
            id: organization,
            owner_id: owner,
        });

        let reference = owner_ref(&state.data.users, owner);
        let data = &mut state.data;
        if let Some(org) = data.organizations.iter_mut().find(|o| o.id == organization) {
            org.owner_id = Some(reference);
        }
        // deals embed their organization's owner
        for deal in data.deals.iter_mut() {
            if let Some(org) = deal.org_id.as_mut().filter(|o| o.value == organization) {
                org.owner_id = Some(owner);
            }
        }

        Ok(UpdateAck::ok())
    }

    async fn update_person_owner(&self, person: PersonId, owner: UserId) -> Result<UpdateAck> {
        let mut state = self.lock();
        state.updates.push(OwnerUpdate {
            entity: EntityKind::Person,
            id: person,
            owner_id: owner,
        });

        let reference = owner_ref(&state.data.users, owner);
        if let Some(p) = state.data.persons.iter_mut().find(|p| p.id == person) {
            p.owner_id = Some(reference);
        }

        Ok(UpdateAck::ok())
    }
}
