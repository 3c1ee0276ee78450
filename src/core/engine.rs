use crate::config::toml_config::SyncConfig;
use crate::core::pagination::PaginatedFetcher;
use crate::core::reconcile::{PassReport, ReconcileOptions, Reconciler};
use crate::domain::model::{
    Deal, EntityKind, Organization, OwnerRef, OwnerUpdate, User, UserDirectory,
};
use crate::domain::ports::CrmSource;
use crate::utils::error::{Result, SyncError};

/// Outcome of one full sync run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub users: usize,
    pub open_deals: usize,
    pub organizations: usize,
    pub deal_pass: PassReport,
    pub organization_pass: PassReport,
    pub dry_run: bool,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.deal_pass.has_failures() || self.organization_pass.has_failures()
    }

    pub fn total_updates(&self) -> usize {
        self.deal_pass.updates.len() + self.organization_pass.updates.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncError> {
        self.deal_pass
            .failures
            .iter()
            .chain(self.organization_pass.failures.iter())
    }

    /// 0 when every update went through, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Keep only deals that are still open; won, lost and deleted deals are never reconciled.
pub fn open_deals(deals: Vec<Deal>) -> Vec<Deal> {
    deals.into_iter().filter(Deal::is_open).collect()
}

/// Give organizations the owners a dry-run deal pass planned for them, as a
/// real run would have stored them before the organizations are listed.
fn apply_planned_owners(
    organizations: &mut [Organization],
    planned: &[OwnerUpdate],
    users: &UserDirectory,
) {
    for update in planned
        .iter()
        .filter(|u| u.entity == EntityKind::Organization)
    {
        for organization in organizations.iter_mut().filter(|o| o.id == update.id) {
            organization.owner_id = Some(OwnerRef {
                id: update.owner_id,
                name: users.name_of(update.owner_id).map(str::to_string),
            });
        }
    }
}

pub struct SyncEngine<S: CrmSource> {
    source: S,
    config: SyncConfig,
}

impl<S: CrmSource> SyncEngine<S> {
    pub fn new(source: S, config: SyncConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn fetcher(&self) -> PaginatedFetcher {
        PaginatedFetcher::new(self.config.fetch.page_size)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let source = &self.source;
        self.fetcher()
            .fetch_all("users", || source.list_users())
            .await
    }

    pub async fn fetch_open_deals(&self) -> Result<Vec<Deal>> {
        let source = &self.source;
        let deals = self
            .fetcher()
            .deplete(
                "deals",
                &self.config.fetch.deal_params,
                move |request| async move { source.list_deals(&request).await },
            )
            .await?;
        let total = deals.len();
        let open = open_deals(deals);
        tracing::debug!("{} of {} deals are open", open.len(), total);
        Ok(open)
    }

    pub async fn fetch_organizations(&self) -> Result<Vec<Organization>> {
        let source = &self.source;
        self.fetcher()
            .deplete(
                "organizations",
                &self.config.fetch.organization_params,
                move |request| async move { source.list_organizations(&request).await },
            )
            .await
    }

    /// Deal owners → organizations, then organization owners → contact people.
    ///
    /// Organizations are listed only after the deal pass has finished, so the
    /// second pass sees the owners the first one just set; a dry run overlays
    /// its planned owners instead. A failed user listing only costs names in
    /// the log. Any other failed listing ends the run.
    pub async fn run(&self) -> Result<RunReport> {
        let options = ReconcileOptions {
            dry_run: self.config.reconcile.dry_run,
        };
        if options.dry_run {
            tracing::info!("Dry run: no owner will be changed");
        }

        let users = match self.fetch_users().await {
            Ok(users) => {
                tracing::info!("All users downloaded ({})", users.len());
                users
            }
            Err(e) => {
                tracing::warn!("Continuing without user names: {}", e);
                Vec::new()
            }
        };
        let directory = UserDirectory::from_users(&users);

        let reconciler =
            Reconciler::new(&self.source, self.fetcher(), options).with_users(directory.clone());

        let deals = self.fetch_open_deals().await?;
        tracing::info!("All open deals downloaded ({})", deals.len());
        let deal_pass = reconciler.propagate_deal_owners(&deals).await;

        let mut organizations = self.fetch_organizations().await?;
        tracing::info!("All organizations downloaded ({})", organizations.len());
        if options.dry_run {
            apply_planned_owners(&mut organizations, &deal_pass.updates, &directory);
        }
        let organization_pass = reconciler
            .propagate_organization_owners(&organizations)
            .await?;

        Ok(RunReport {
            users: users.len(),
            open_deals: deals.len(),
            organizations: organizations.len(),
            deal_pass,
            organization_pass,
            dry_run: options.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixtureData, FixtureSource};
    use crate::domain::model::{DealOrganization, DealStatus, OwnerRef, Person, PersonOrganization};

    fn fixture() -> FixtureData {
        let org = |id: i64, owner: i64| Organization {
            id,
            name: format!("Org {}", id),
            owner_id: Some(OwnerRef::new(owner, format!("User {}", owner))),
            people_count: 1,
        };
        let deal = |id: i64, status: DealStatus, owner: i64, org: i64, org_owner: i64| Deal {
            id,
            title: format!("Deal {}", id),
            status,
            org_id: Some(DealOrganization {
                value: org,
                name: Some(format!("Org {}", org)),
                owner_id: Some(org_owner),
            }),
            user_id: Some(OwnerRef::new(owner, format!("User {}", owner))),
        };

        FixtureData {
            deals: vec![
                deal(1, DealStatus::Open, 1, 10, 2),
                deal(2, DealStatus::Won, 3, 20, 2),
            ],
            organizations: vec![org(10, 2), org(20, 2)],
            persons: vec![
                Person {
                    id: 100,
                    name: "P100".to_string(),
                    owner_id: Some(OwnerRef::new(2, "User 2")),
                    org_id: Some(PersonOrganization {
                        value: 10,
                        name: None,
                    }),
                },
                Person {
                    id: 200,
                    name: "P200".to_string(),
                    owner_id: Some(OwnerRef::new(2, "User 2")),
                    org_id: Some(PersonOrganization {
                        value: 20,
                        name: None,
                    }),
                },
            ],
            users: Vec::new(),
        }
    }

    #[test]
    fn test_open_deals_filter() {
        let open = open_deals(fixture().deals);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, 1);
    }

    #[tokio::test]
    async fn test_run_second_pass_sees_first_pass_updates() {
        let engine = SyncEngine::new(FixtureSource::new(fixture()), SyncConfig::default());

        let report = engine.run().await.unwrap();

        assert_eq!(report.open_deals, 1);
        assert_eq!(report.organizations, 2);
        assert_eq!(report.deal_pass.updates.len(), 1);
        // org 10 now belongs to user 1, so its person follows
        assert_eq!(report.organization_pass.updates.len(), 1);
        assert_eq!(report.organization_pass.updates[0].id, 100);
        assert_eq!(report.organization_pass.updates[0].owner_id, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_plans_what_a_real_run_does() {
        let mut config = SyncConfig::default();
        config.reconcile.dry_run = true;
        let dry = SyncEngine::new(FixtureSource::new(fixture()), config);
        let real = SyncEngine::new(FixtureSource::new(fixture()), SyncConfig::default());

        let planned = dry.run().await.unwrap();
        real.run().await.unwrap();

        let mut plan = planned.deal_pass.updates.clone();
        plan.extend(planned.organization_pass.updates.iter().cloned());
        assert_eq!(plan, real.source().recorded_updates());
        assert!(dry.source().recorded_updates().is_empty());
    }

    #[test]
    fn test_apply_planned_owners_touches_only_planned_organizations() {
        let mut organizations = fixture().organizations;
        let users = UserDirectory::from_users(&[User {
            id: 1,
            name: "Ada".to_string(),
            email: None,
            active_flag: true,
        }]);
        let planned = vec![
            OwnerUpdate {
                entity: EntityKind::Organization,
                id: 10,
                owner_id: 1,
            },
            OwnerUpdate {
                entity: EntityKind::Person,
                id: 20,
                owner_id: 1,
            },
        ];

        apply_planned_owners(&mut organizations, &planned, &users);

        assert_eq!(organizations[0].owner(), Some(&OwnerRef::new(1, "Ada")));
        assert_eq!(organizations[1].owner().map(|o| o.id), Some(2));
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let engine = SyncEngine::new(FixtureSource::new(fixture()), SyncConfig::default());

        engine.run().await.unwrap();
        let again = engine.run().await.unwrap();

        assert_eq!(again.total_updates(), 0);
        assert_eq!(engine.source().recorded_updates().len(), 2);
    }
}
