use crate::domain::model::{
    Deal, ListResponse, Organization, OrganizationId, PageRequest, Person, PersonId, UpdateAck,
    User, UserId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The CRM operations a sync run needs. `Err` means the call itself could
/// not be completed; an API-level refusal comes back as `success: false`.
#[async_trait]
pub trait CrmSource: Send + Sync {
    async fn list_deals(&self, request: &PageRequest) -> Result<ListResponse<Deal>>;

    async fn list_organizations(&self, request: &PageRequest)
        -> Result<ListResponse<Organization>>;

    async fn list_organization_persons(
        &self,
        organization: OrganizationId,
        request: &PageRequest,
    ) -> Result<ListResponse<Person>>;

    async fn list_users(&self) -> Result<ListResponse<User>>;

    async fn update_organization_owner(
        &self,
        organization: OrganizationId,
        owner: UserId,
    ) -> Result<UpdateAck>;

    async fn update_person_owner(&self, person: PersonId, owner: UserId) -> Result<UpdateAck>;
}

