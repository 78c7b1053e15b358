//! Group membership lifecycle: creation, invites, join requests,
//! approve/deny, leave/kick, and credential-gated deletion.
//!
//! The rules enforced here keep two invariants alive for every group:
//! the admin is always a member, and no user is ever in the member list
//! and the request queue at the same time.

use chrono::Utc;
use tracing::info;

use huddle_shared::{credential, GroupId, InviteCode, UserId};
use huddle_store::{Database, Group, StoreError};

use crate::{DomainError, Result};

/// Code-collision retries before giving up.  With 32 bits of entropy per
/// code this bound is never reached in practice.
const INVITE_RETRIES: usize = 8;

/// Input for [`create_group`].
#[derive(Debug)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub image_ref: String,
}

/// Everything a member sees on the group screen.  The request queue and
/// invite codes are admin-only and come back empty for other viewers.
#[derive(Debug)]
pub struct GroupView {
    pub group: Group,
    pub members: Vec<UserId>,
    pub requests: Vec<UserId>,
    pub invite_codes: Vec<String>,
}

/// Create a group with the actor as admin and sole member, and one invite
/// code issued immediately.
pub fn create_group(
    db: &mut Database,
    actor: UserId,
    input: NewGroup,
) -> Result<(Group, InviteCode)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("group name must not be empty"));
    }

    let group = Group {
        id: GroupId::new(),
        name: name.to_string(),
        description: input.description.trim().to_string(),
        image_ref: input.image_ref,
        admin: actor,
        created_at: Utc::now(),
    };

    // Invite codes are globally unique; retry on the (vanishingly rare)
    // collision.
    for _ in 0..INVITE_RETRIES {
        let code = InviteCode::generate();
        match db.create_group(&group, &code) {
            Ok(()) => {
                info!(group_id = %group.id, admin = %actor, "group created");
                return Ok((group, code));
            }
            Err(StoreError::AlreadyExists) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(DomainError::Store(StoreError::AlreadyExists))
}

/// Issue a fresh invite code for the group.  Admin-only; prior codes remain
/// valid, so several invites can circulate at once.
pub fn generate_invite(db: &mut Database, group: GroupId, actor: UserId) -> Result<InviteCode> {
    require_admin(db, group, actor)?;

    for _ in 0..INVITE_RETRIES {
        let code = InviteCode::generate();
        match db.add_invite_code(group, &code) {
            Ok(()) => {
                info!(group_id = %group, "invite code issued");
                return Ok(code);
            }
            Err(StoreError::AlreadyExists) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(DomainError::Store(StoreError::AlreadyExists))
}

/// Ask to join the group behind an invite code.  The request lands in the
/// admin's queue; membership starts only on approval.
pub fn request_join(db: &mut Database, raw_code: &str, actor: UserId) -> Result<Group> {
    let code = InviteCode::parse(raw_code).ok_or(DomainError::InvalidCode)?;
    let group = match db.find_group_by_invite(&code) {
        Ok(group) => group,
        Err(StoreError::NotFound) => return Err(DomainError::InvalidCode),
        Err(e) => return Err(e.into()),
    };

    if db.is_member(group.id, actor)? {
        return Err(DomainError::AlreadyMember);
    }
    if db.is_requested(group.id, actor)? {
        return Err(DomainError::AlreadyRequested);
    }

    db.add_request(group.id, actor)?;
    info!(group_id = %group.id, user = %actor, "join requested");
    Ok(group)
}

/// Move a pending requester into the member list.  Admin-only.
pub fn approve_request(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    target: UserId,
) -> Result<()> {
    require_admin(db, group, actor)?;

    match db.approve_request(group, target) {
        Ok(()) => {
            info!(group_id = %group, user = %target, "join request approved");
            Ok(())
        }
        Err(StoreError::NotFound) => Err(DomainError::NotPending),
        Err(e) => Err(e.into()),
    }
}

/// Drop a pending request without granting membership.  Admin-only.
pub fn deny_request(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    target: UserId,
) -> Result<()> {
    require_admin(db, group, actor)?;

    if !db.remove_request(group, target)? {
        return Err(DomainError::NotPending);
    }
    info!(group_id = %group, user = %target, "join request denied");
    Ok(())
}

/// Leave the group.  The admin can never leave this way; the group must be
/// deleted instead.
pub fn leave_group(db: &mut Database, group: GroupId, actor: UserId) -> Result<()> {
    let record = get_group(db, group)?;
    if record.admin == actor {
        return Err(DomainError::AdminCannotLeave);
    }
    if !db.remove_member(group, actor)? {
        return Err(DomainError::NotMember);
    }
    info!(group_id = %group, user = %actor, "member left");
    Ok(())
}

/// Remove another member.  Admin-only; self-removal must go through group
/// deletion.
pub fn kick_member(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    target: UserId,
) -> Result<()> {
    require_admin(db, group, actor)?;
    if target == actor {
        return Err(DomainError::SelfKick);
    }
    if !db.remove_member(group, target)? {
        return Err(DomainError::NotMember);
    }
    info!(group_id = %group, user = %target, "member kicked");
    Ok(())
}

/// Permanently delete the group and everything it owns.  Admin-only, and
/// the admin must re-confirm their own credential so a hijacked session or
/// a stray click cannot destroy a group.
pub fn delete_group(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    supplied_credential: &str,
) -> Result<()> {
    require_admin(db, group, actor)?;

    let admin = db.get_user(actor)?;
    if !credential::verify(&admin.credential_hash, supplied_credential)? {
        return Err(DomainError::BadCredential);
    }

    db.delete_group(group)?;
    info!(group_id = %group, "group deleted");
    Ok(())
}

/// Read-only view of a group for one member.  Non-members get `NotMember`;
/// the request queue and invite codes are only populated for the admin.
pub fn group_view(db: &Database, group: GroupId, viewer: UserId) -> Result<GroupView> {
    let record = get_group(db, group)?;
    if !db.is_member(group, viewer)? {
        return Err(DomainError::NotMember);
    }

    let is_admin = record.admin == viewer;
    Ok(GroupView {
        members: db.list_members(group)?,
        requests: if is_admin {
            db.list_requests(group)?
        } else {
            Vec::new()
        },
        invite_codes: if is_admin {
            db.list_invite_codes(group)?
        } else {
            Vec::new()
        },
        group: record,
    })
}

/// The groups the user currently belongs to.
pub fn my_groups(db: &Database, user: UserId) -> Result<Vec<Group>> {
    Ok(db.list_groups_for_user(user)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn get_group(db: &Database, group: GroupId) -> Result<Group> {
    match db.get_group(group) {
        Ok(record) => Ok(record),
        Err(StoreError::NotFound) => Err(DomainError::NotFound),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn require_admin(db: &Database, group: GroupId, actor: UserId) -> Result<Group> {
    let record = get_group(db, group)?;
    if record.admin != actor {
        return Err(DomainError::Unauthorized);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{register, test_db};

    fn new_group(name: &str) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            description: format!("{name} description"),
            image_ref: String::new(),
        }
    }

    #[test]
    fn invite_scenario_end_to_end() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, _initial) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        let code = generate_invite(&mut db, camp.id, alice.id).unwrap();

        let joined = request_join(&mut db, code.as_str(), bob.id).unwrap();
        assert_eq!(joined.id, camp.id);

        approve_request(&mut db, camp.id, alice.id, bob.id).unwrap();

        let view = group_view(&db, camp.id, alice.id).unwrap();
        assert_eq!(view.members, vec![alice.id, bob.id]);
        assert!(view.requests.is_empty());
    }

    #[test]
    fn admin_is_always_a_member() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        request_join(&mut db, code.as_str(), bob.id).unwrap();
        approve_request(&mut db, camp.id, alice.id, bob.id).unwrap();
        leave_group(&mut db, camp.id, bob.id).unwrap();

        // After this whole sequence the admin is still in the member list,
        // and neither leave nor kick can take them out.
        assert!(db.is_member(camp.id, alice.id).unwrap());
        assert!(matches!(
            leave_group(&mut db, camp.id, alice.id),
            Err(DomainError::AdminCannotLeave)
        ));
        assert!(matches!(
            kick_member(&mut db, camp.id, alice.id, alice.id),
            Err(DomainError::SelfKick)
        ));
    }

    #[test]
    fn members_and_requests_are_disjoint() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        request_join(&mut db, code.as_str(), bob.id).unwrap();

        assert!(matches!(
            request_join(&mut db, code.as_str(), bob.id),
            Err(DomainError::AlreadyRequested)
        ));

        approve_request(&mut db, camp.id, alice.id, bob.id).unwrap();
        assert!(matches!(
            request_join(&mut db, code.as_str(), bob.id),
            Err(DomainError::AlreadyMember)
        ));
        assert!(!db.is_requested(camp.id, bob.id).unwrap());
    }

    #[test]
    fn approve_requires_pending_request() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let carol = register(&mut db, "carol");

        let (camp, _code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();

        assert!(matches!(
            approve_request(&mut db, camp.id, alice.id, carol.id),
            Err(DomainError::NotPending)
        ));
        // State unchanged: carol is neither member nor requester.
        assert!(!db.is_member(camp.id, carol.id).unwrap());
        assert!(!db.is_requested(camp.id, carol.id).unwrap());
    }

    #[test]
    fn non_admin_cannot_moderate() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");
        let carol = register(&mut db, "carol");

        let (camp, code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        request_join(&mut db, code.as_str(), bob.id).unwrap();
        approve_request(&mut db, camp.id, alice.id, bob.id).unwrap();
        request_join(&mut db, code.as_str(), carol.id).unwrap();

        assert!(matches!(
            approve_request(&mut db, camp.id, bob.id, carol.id),
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            deny_request(&mut db, camp.id, bob.id, carol.id),
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            generate_invite(&mut db, camp.id, bob.id),
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            kick_member(&mut db, camp.id, bob.id, alice.id),
            Err(DomainError::Unauthorized)
        ));
    }

    #[test]
    fn deny_clears_request_without_membership() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        request_join(&mut db, code.as_str(), bob.id).unwrap();
        deny_request(&mut db, camp.id, alice.id, bob.id).unwrap();

        assert!(!db.is_member(camp.id, bob.id).unwrap());
        assert!(!db.is_requested(camp.id, bob.id).unwrap());
        // A denied user may request again.
        request_join(&mut db, code.as_str(), bob.id).unwrap();
    }

    #[test]
    fn stale_invite_code_is_invalid() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");
        create_group(&mut db, alice.id, new_group("Camp")).unwrap();

        assert!(matches!(
            request_join(&mut db, "00000000", bob.id),
            Err(DomainError::InvalidCode)
        ));
        assert!(matches!(
            request_join(&mut db, "   ", bob.id),
            Err(DomainError::InvalidCode)
        ));
    }

    #[test]
    fn old_invites_stay_valid_after_new_ones() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, first) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        let _second = generate_invite(&mut db, camp.id, alice.id).unwrap();

        // The original code still works after a fresh one is issued.
        request_join(&mut db, first.as_str(), bob.id).unwrap();
    }

    #[test]
    fn delete_group_needs_credential_reconfirmation() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, _code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();

        assert!(matches!(
            delete_group(&mut db, camp.id, bob.id, "correct horse"),
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            delete_group(&mut db, camp.id, alice.id, "wrong"),
            Err(DomainError::BadCredential)
        ));

        delete_group(&mut db, camp.id, alice.id, "correct horse").unwrap();
        assert!(matches!(
            group_view(&db, camp.id, alice.id),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn kick_removes_only_current_members() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");
        let carol = register(&mut db, "carol");

        let (camp, code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        request_join(&mut db, code.as_str(), bob.id).unwrap();
        approve_request(&mut db, camp.id, alice.id, bob.id).unwrap();

        kick_member(&mut db, camp.id, alice.id, bob.id).unwrap();
        assert!(!db.is_member(camp.id, bob.id).unwrap());

        assert!(matches!(
            kick_member(&mut db, camp.id, alice.id, carol.id),
            Err(DomainError::NotMember)
        ));
    }

    #[test]
    fn non_member_sees_no_group_view() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice");
        let bob = register(&mut db, "bob");

        let (camp, _code) = create_group(&mut db, alice.id, new_group("Camp")).unwrap();
        assert!(matches!(
            group_view(&db, camp.id, bob.id),
            Err(DomainError::NotMember)
        ));
    }
}
