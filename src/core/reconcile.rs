use crate::core::pagination::PaginatedFetcher;
use crate::domain::model::{
    Deal, DealId, EntityKind, Organization, OrganizationId, OwnerRef, OwnerUpdate, Person,
    QueryParams, UserDirectory, UserId,
};
use crate::domain::ports::CrmSource;
use crate::utils::error::{Result, SyncError};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Log planned updates instead of sending them.
    pub dry_run: bool,
}

/// Why an entity was left alone. These are expected gaps in CRM data, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoOrganization,
    NoDealOwner,
    /// Another open deal of the same organization, earlier in the listing, has a different owner.
    ConflictingDealOwner,
    NoOrganizationOwner,
    NoContactPeople,
    NoPersonOwner,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoOrganization => "deal has no organization",
            SkipReason::NoDealOwner => "deal has no owner",
            SkipReason::ConflictingDealOwner => {
                "organization already follows another open deal's owner"
            }
            SkipReason::NoOrganizationOwner => "organization has no owner",
            SkipReason::NoContactPeople => "organization has no contact people",
            SkipReason::NoPersonOwner => "contact person has no owner",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub reason: SkipReason,
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct PassReport {
    /// Top-level entities walked (deals, or organizations).
    pub examined: usize,
    /// Owner comparisons made.
    pub compared: usize,
    pub unchanged: usize,
    pub skipped: Vec<Skipped>,
    /// Updates sent successfully, or planned in a dry run.
    pub updates: Vec<OwnerUpdate>,
    /// Only `SyncError::Update` values end up here.
    pub failures: Vec<SyncError>,
}

impl PassReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn skip(&mut self, reason: SkipReason, id: i64, name: &str) {
        self.skipped.push(Skipped {
            reason,
            id,
            name: name.to_string(),
        });
    }
}

/// Propagates owners from deals to organizations and from organizations to
/// their contact people.
pub struct Reconciler<'a, S: CrmSource + ?Sized> {
    source: &'a S,
    fetcher: PaginatedFetcher,
    options: ReconcileOptions,
    users: UserDirectory,
}

impl<'a, S: CrmSource + ?Sized> Reconciler<'a, S> {
    pub fn new(source: &'a S, fetcher: PaginatedFetcher, options: ReconcileOptions) -> Self {
        Self {
            source,
            fetcher,
            options,
            users: UserDirectory::default(),
        }
    }

    pub fn with_users(mut self, users: UserDirectory) -> Self {
        self.users = users;
        self
    }

    /// Make every open deal's owner the owner of the deal's organization.
    ///
    /// When several open deals share an organization, the first one in the
    /// listing decides its owner and later deals with another owner are
    /// skipped. Update failures are recorded in the report and do not stop
    /// the pass.
    pub async fn propagate_deal_owners(&self, deals: &[Deal]) -> PassReport {
        let mut report = PassReport::default();
        let mut claims: HashMap<OrganizationId, (DealId, UserId)> = HashMap::new();

        for deal in deals {
            report.examined += 1;
            self.reconcile_deal(deal, &mut claims, &mut report).await;
            tracing::info!("Finished processing deal: {}", deal.title);
        }

        report
    }

    async fn reconcile_deal(
        &self,
        deal: &Deal,
        claims: &mut HashMap<OrganizationId, (DealId, UserId)>,
        report: &mut PassReport,
    ) {
        let Some(organization) = deal.organization() else {
            tracing::warn!("No organization found related to open deal {}", deal.title);
            report.skip(SkipReason::NoOrganization, deal.id, &deal.title);
            return;
        };
        let Some(owner) = deal.owner() else {
            tracing::warn!("Open deal has no owner: {}", deal.title);
            report.skip(SkipReason::NoDealOwner, deal.id, &deal.title);
            return;
        };

        if let Some(&(first_deal, claimed)) = claims.get(&organization.value) {
            if claimed == owner.id {
                report.compared += 1;
                report.unchanged += 1;
            } else {
                tracing::warn!(
                    "Open deals {} and {} of organization {} have different owners; keeping the owner of deal {}",
                    first_deal,
                    deal.id,
                    organization.value,
                    first_deal
                );
                report.skip(SkipReason::ConflictingDealOwner, deal.id, &deal.title);
            }
            return;
        }
        claims.insert(organization.value, (deal.id, owner.id));

        report.compared += 1;
        if organization.owner_id == Some(owner.id) {
            report.unchanged += 1;
            return;
        }

        let action = format!(
            "Made deal owner ({}) the owner also of organization: {}",
            self.owner_label(owner),
            organization.name.as_deref().unwrap_or("(unnamed)")
        );
        let update = OwnerUpdate {
            entity: EntityKind::Organization,
            id: organization.value,
            owner_id: owner.id,
        };
        self.apply(update, &action, report).await;
    }

    /// Make each organization's owner the owner of all its contact people.
    ///
    /// A failed person listing aborts the pass; update failures do not.
    pub async fn propagate_organization_owners(
        &self,
        organizations: &[Organization],
    ) -> Result<PassReport> {
        let mut report = PassReport::default();

        for organization in organizations {
            report.examined += 1;
            self.reconcile_organization(organization, &mut report)
                .await?;
            tracing::info!("Finished processing organization: {}", organization.name);
        }

        Ok(report)
    }

    async fn reconcile_organization(
        &self,
        organization: &Organization,
        report: &mut PassReport,
    ) -> Result<()> {
        let Some(owner) = organization.owner() else {
            tracing::warn!("Organization has no owner: {}", organization.name);
            report.skip(
                SkipReason::NoOrganizationOwner,
                organization.id,
                &organization.name,
            );
            return Ok(());
        };
        if organization.people_count < 1 {
            tracing::info!(
                "Organization has no contact people: {}",
                organization.name
            );
            report.skip(
                SkipReason::NoContactPeople,
                organization.id,
                &organization.name,
            );
            return Ok(());
        }

        let people = self.persons_of(organization.id).await?;
        for person in &people {
            self.reconcile_person(organization, owner, person, report)
                .await;
            tracing::info!("Finished processing contact person: {}", person.name);
        }

        Ok(())
    }

    async fn reconcile_person(
        &self,
        organization: &Organization,
        owner: &OwnerRef,
        person: &Person,
        report: &mut PassReport,
    ) {
        let Some(person_owner) = person.owner() else {
            tracing::warn!("Contact person has no owner: {}", person.name);
            report.skip(SkipReason::NoPersonOwner, person.id, &person.name);
            return;
        };

        report.compared += 1;
        if person_owner.id == owner.id {
            report.unchanged += 1;
            return;
        }

        let action = format!(
            "Made [{}] the owner of contact person: {}, {}",
            self.owner_label(owner),
            person.name,
            organization.name
        );
        let update = OwnerUpdate {
            entity: EntityKind::Person,
            id: person.id,
            owner_id: owner.id,
        };
        self.apply(update, &action, report).await;
    }

    /// All contact people of one organization.
    pub async fn persons_of(&self, organization: OrganizationId) -> Result<Vec<Person>> {
        let source = self.source;
        let endpoint = format!("organizations/{}/persons", organization);

        self.fetcher
            .deplete(&endpoint, &QueryParams::new(), move |request| async move {
                source
                    .list_organization_persons(organization, &request)
                    .await
            })
            .await
    }

    async fn apply(&self, update: OwnerUpdate, action: &str, report: &mut PassReport) {
        if self.options.dry_run {
            tracing::info!("[dry run] {}", action);
            report.updates.push(update);
            return;
        }

        let sent = match update.entity {
            EntityKind::Organization => {
                self.source
                    .update_organization_owner(update.id, update.owner_id)
                    .await
            }
            EntityKind::Person => {
                self.source
                    .update_person_owner(update.id, update.owner_id)
                    .await
            }
        };

        let failure = match sent {
            Ok(ack) if ack.success => {
                tracing::info!("{}", action);
                report.updates.push(update);
                return;
            }
            Ok(ack) => ack
                .error
                .unwrap_or_else(|| "API call not successful".to_string()),
            Err(e) => e.to_string(),
        };

        let error = SyncError::update(update.entity, update.id, failure);
        tracing::error!("{}", error);
        report.failures.push(error);
    }

    fn owner_label(&self, owner: &OwnerRef) -> String {
        self.users.describe(owner.id, owner.name.as_deref())
    }
}
