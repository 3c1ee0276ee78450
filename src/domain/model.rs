//! CRM records as the Pipedrive v1 API returns them, plus the small value
//! types the fetcher and reconciler pass around.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type DealId = i64;
pub type OrganizationId = i64;
pub type PersonId = i64;
pub type UserId = i64;

/// Extra query parameters attached to every page request of one listing.
pub type QueryParams = BTreeMap<String, String>;

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Open,
    Won,
    Lost,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// Owner reference embedded in deals, organizations and persons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    #[serde(rename = "value")]
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

impl OwnerRef {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// Organization relation embedded in a deal. `owner_id` is a bare user id here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealOrganization {
    pub value: OrganizationId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    #[serde(default)]
    pub title: String,
    pub status: DealStatus,
    #[serde(default)]
    pub org_id: Option<DealOrganization>,
    #[serde(default)]
    pub user_id: Option<OwnerRef>,
}

impl Deal {
    pub fn is_open(&self) -> bool {
        self.status == DealStatus::Open
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.user_id.as_ref()
    }

    pub fn organization(&self) -> Option<&DealOrganization> {
        self.org_id.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<OwnerRef>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub people_count: u32,
}

impl Organization {
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner_id.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonOrganization {
    pub value: OrganizationId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<OwnerRef>,
    #[serde(default)]
    pub org_id: Option<PersonOrganization>,
}

impl Person {
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner_id.as_ref()
    }

    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.org_id.as_ref().map(|org| org.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub active_flag: bool,
}

/// Id → display name lookup built from the user listing.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    names: HashMap<UserId, String>,
}

impl UserDirectory {
    pub fn from_users(users: &[User]) -> Self {
        Self {
            names: users.iter().map(|u| (u.id, u.name.clone())).collect(),
        }
    }

    pub fn name_of(&self, id: UserId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Best available label for a user: the embedded name, then the
    /// directory, then the bare id.
    pub fn describe(&self, id: UserId, embedded: Option<&str>) -> String {
        embedded
            .filter(|name| !name.is_empty())
            .or_else(|| self.name_of(id))
            .map(str::to_string)
            .unwrap_or_else(|| format!("user #{}", id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub more_items_in_collection: bool,
    #[serde(default)]
    pub next_start: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalData {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Envelope of every listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<Vec<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<AdditionalData>,
}

impl<T> ListResponse<T> {
    /// A successful page; `next_start` is only meaningful when `more` is set.
    pub fn page(data: Vec<T>, start: u64, limit: u64, more: bool) -> Self {
        let next_start = more.then(|| start + data.len() as u64);
        Self {
            success: true,
            data: Some(data),
            error: None,
            additional_data: Some(AdditionalData {
                pagination: Some(Pagination {
                    start,
                    limit,
                    more_items_in_collection: more,
                    next_start,
                }),
            }),
        }
    }

    /// A successful response without pagination metadata.
    pub fn complete(data: Vec<T>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            additional_data: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            additional_data: None,
        }
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.additional_data
            .as_ref()
            .and_then(|extra| extra.pagination.as_ref())
    }
}

/// Response of the update endpoints; only the success flag matters here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Parameters of one page call. A fresh value is built for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub start: u64,
    pub limit: u32,
    pub params: QueryParams,
}

impl PageRequest {
    pub fn new(start: u64, limit: u32, params: &QueryParams) -> Self {
        Self {
            start,
            limit,
            params: params.clone(),
        }
    }

    /// Query pairs with `start`/`limit` taking precedence over same-named params.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(key, _)| key.as_str() != "start" && key.as_str() != "limit")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        pairs.push(("start".to_string(), self.start.to_string()));
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Person,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Organization => write!(f, "organization"),
            EntityKind::Person => write!(f, "person"),
        }
    }
}

/// One owner change, issued or (in a dry run) planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerUpdate {
    pub entity: EntityKind,
    pub id: i64,
    pub owner_id: UserId,
}
