//! Contribution-pool ledger: setup, contributions, admin approval with
//! optional amount correction.

use tracing::info;

use huddle_shared::{ContributionId, GroupId, UserId};
use huddle_store::{Contribution, Database, Pool, StoreError};

use crate::membership::require_admin;
use crate::{DomainError, Result};

/// Outcome of [`setup_pool`].  `Replaced` means a previous pool and all of
/// its contributions were discarded; the transport layer is expected to
/// warn the admin before invoking the destructive overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSetup {
    Created,
    Replaced,
}

/// The pool together with its ledger, as shown on the group screen.
#[derive(Debug)]
pub struct PoolView {
    pub pool: Pool,
    pub contributions: Vec<Contribution>,
}

/// Install (or destructively replace) the group's pool.  Admin-only; the
/// target must be non-negative.
pub fn setup_pool(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    name: &str,
    target: f64,
) -> Result<PoolSetup> {
    require_admin(db, group, actor)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("pool name must not be empty"));
    }
    if !target.is_finite() || target < 0.0 {
        return Err(DomainError::InvalidInput("pool target must be non-negative"));
    }

    let replaced = db.replace_pool(&Pool {
        group_id: group,
        name: name.to_string(),
        target,
    })?;

    info!(group_id = %group, target, replaced, "pool set up");
    Ok(if replaced {
        PoolSetup::Replaced
    } else {
        PoolSetup::Created
    })
}

/// Record an unapproved contribution.  Fails if the group has no pool or
/// the amount is not strictly positive.
pub fn contribute(
    db: &mut Database,
    group: GroupId,
    contributor: UserId,
    amount: f64,
) -> Result<Contribution> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::InvalidAmount);
    }
    match db.get_pool(group) {
        Ok(_) => {}
        Err(StoreError::NotFound) => return Err(DomainError::NoPool),
        Err(e) => return Err(e.into()),
    }

    let entry = db.add_contribution(&Contribution {
        id: ContributionId::new(),
        group_id: group,
        contributor,
        amount,
        approved: false,
        seq: 0,
    })?;

    info!(group_id = %group, contributor = %contributor, amount, "contribution recorded");
    Ok(entry)
}

/// Approve the contribution at a storage-order index, optionally correcting
/// its amount in the same step.  Admin-only; re-approval is idempotent on
/// the approved flag.
pub fn approve_contribution(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    index: u64,
    corrected_amount: Option<f64>,
) -> Result<Contribution> {
    require_admin(db, group, actor)?;

    let entry = match db.get_contribution_by_index(group, index) {
        Ok(entry) => entry,
        Err(StoreError::NotFound) => return Err(DomainError::InvalidIndex),
        Err(e) => return Err(e.into()),
    };

    let amount = corrected_amount.unwrap_or(entry.amount);
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::InvalidAmount);
    }

    // Amount correction and approval are one atomic UPDATE.
    db.approve_contribution(entry.id, amount)?;

    info!(group_id = %group, contribution_id = %entry.id, amount, "contribution approved");
    Ok(Contribution {
        amount,
        approved: true,
        ..entry
    })
}

/// Read-only view of the group's pool and ledger, if a pool exists.
pub fn pool_view(db: &Database, group: GroupId) -> Result<Option<PoolView>> {
    match db.get_pool(group) {
        Ok(pool) => Ok(Some(PoolView {
            contributions: db.list_contributions(group)?,
            pool,
        })),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{self, NewGroup};
    use crate::test_util::{register, test_db};

    fn setup_group(db: &mut Database) -> (UserId, GroupId) {
        let alice = register(db, "alice");
        let (camp, _code) = membership::create_group(
            db,
            alice.id,
            NewGroup {
                name: "Camp".into(),
                description: "camping trip".into(),
                image_ref: String::new(),
            },
        )
        .unwrap();
        (alice.id, camp.id)
    }

    #[test]
    fn setup_is_admin_only_and_validates_target() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);
        let bob = register(&mut db, "bob");

        assert!(matches!(
            setup_pool(&mut db, camp, bob.id, "Trip", 100.0),
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            setup_pool(&mut db, camp, alice, "Trip", -1.0),
            Err(DomainError::InvalidInput(_))
        ));

        assert_eq!(
            setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap(),
            PoolSetup::Created
        );
    }

    #[test]
    fn replacing_a_pool_discards_the_ledger() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);

        setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap();
        contribute(&mut db, camp, alice, 20.0).unwrap();

        assert_eq!(
            setup_pool(&mut db, camp, alice, "New trip", 50.0).unwrap(),
            PoolSetup::Replaced
        );
        let view = pool_view(&db, camp).unwrap().unwrap();
        assert_eq!(view.pool.name, "New trip");
        assert!(view.contributions.is_empty());
    }

    #[test]
    fn contribute_requires_pool_and_positive_amount() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);

        assert!(matches!(
            contribute(&mut db, camp, alice, 20.0),
            Err(DomainError::NoPool)
        ));

        setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap();
        assert!(matches!(
            contribute(&mut db, camp, alice, 0.0),
            Err(DomainError::InvalidAmount)
        ));
        assert!(matches!(
            contribute(&mut db, camp, alice, -5.0),
            Err(DomainError::InvalidAmount)
        ));

        let entry = contribute(&mut db, camp, alice, 20.0).unwrap();
        assert!(!entry.approved);
    }

    #[test]
    fn approval_with_correction_scenario() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);
        let bob = register(&mut db, "bob");

        setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap();
        contribute(&mut db, camp, bob.id, 20.0).unwrap();

        let approved = approve_contribution(&mut db, camp, alice, 0, Some(25.0)).unwrap();
        assert!(approved.approved);
        assert_eq!(approved.amount, 25.0);

        let view = pool_view(&db, camp).unwrap().unwrap();
        assert_eq!(view.contributions.len(), 1);
        assert_eq!(view.contributions[0].amount, 25.0);
        assert!(view.contributions[0].approved);
    }

    #[test]
    fn reapproval_is_idempotent() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);

        setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap();
        contribute(&mut db, camp, alice, 10.0).unwrap();

        approve_contribution(&mut db, camp, alice, 0, None).unwrap();
        approve_contribution(&mut db, camp, alice, 0, None).unwrap();

        let view = pool_view(&db, camp).unwrap().unwrap();
        assert_eq!(view.contributions.len(), 1);
        assert!(view.contributions[0].approved);
        assert_eq!(view.contributions[0].amount, 10.0);
    }

    #[test]
    fn stale_contribution_index_is_rejected() {
        let (_dir, mut db) = test_db();
        let (alice, camp) = setup_group(&mut db);

        setup_pool(&mut db, camp, alice, "Trip", 100.0).unwrap();
        assert!(matches!(
            approve_contribution(&mut db, camp, alice, 0, None),
            Err(DomainError::InvalidIndex)
        ));

        // A huge index must not wrap around onto an existing entry.
        let entry = contribute(&mut db, camp, alice, 20.0).unwrap();
        assert!(matches!(
            approve_contribution(&mut db, camp, alice, 1 << 63, Some(999.0)),
            Err(DomainError::InvalidIndex)
        ));
        let view = pool_view(&db, camp).unwrap().unwrap();
        assert_eq!(view.contributions[0].amount, entry.amount);
        assert!(!view.contributions[0].approved);
    }
}
