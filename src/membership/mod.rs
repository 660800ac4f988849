//! Room membership: roster mutation, role/permission resolution, and
//! capacity/password/type gating.
//!
//! Everything here is synchronous and free of I/O — operations take the room
//! aggregate by reference and mutate it in place. Persisting the result (and
//! retrying on write conflicts) is the service layer's job, so the whole
//! check-then-mutate sequence commits atomically per document.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::{AppError, Result};
use crate::models::{
    AccessType, CallSession, Invitation, Participant, Permission, PermissionSet, Role, Room,
    RoomSettings, SettingsPatch,
};
use crate::security;

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ROOM_CAPACITY: u32 = 1000;

#[derive(Debug, Clone)]
pub struct CreateRoomParams {
    pub name: String,
    pub description: String,
    pub access: AccessType,
    pub password: Option<String>,
    pub max_participants: u32,
    pub settings: RoomSettings,
}

/// Build a new room aggregate with `owner_id` as its sole active participant.
/// The caller supplies a room code it has already checked for uniqueness.
pub fn create_room(
    owner_id: &str,
    code: String,
    params: CreateRoomParams,
    now: DateTime<Utc>,
) -> Result<Room> {
    let name = params.name.trim().to_string();
    let name_len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name_len) {
        return Err(AppError::InvalidConfiguration(format!(
            "room name must be {}-{} characters",
            MIN_NAME_LEN, MAX_NAME_LEN
        )));
    }
    if !(1..=MAX_ROOM_CAPACITY).contains(&params.max_participants) {
        return Err(AppError::InvalidConfiguration(format!(
            "max participants must be within 1-{}",
            MAX_ROOM_CAPACITY
        )));
    }

    // Password hash exists iff the room is password-protected.
    let password_hash = match params.access {
        AccessType::PasswordProtected => match params.password.as_deref() {
            Some(password) if !password.is_empty() => Some(security::hash_password(password)?),
            _ => {
                return Err(AppError::InvalidConfiguration(
                    "password-protected rooms require a password".to_string(),
                ))
            }
        },
        _ => None,
    };

    let mut owner = Participant::new(owner_id, Role::Owner, now);
    owner.permissions = PermissionSet {
        can_mute: true,
        can_unmute: true,
        can_share_screen: true,
        can_chat: true,
        can_record: true,
        can_kick: true,
    };

    let mut participants = IndexMap::new();
    participants.insert(owner_id.to_string(), owner);

    let mut session = CallSession::begin(now);
    session.record_join(owner_id, now);

    Ok(Room {
        id: None,
        code,
        name,
        description: params.description,
        access: params.access,
        password_hash,
        max_participants: params.max_participants,
        is_active: true,
        settings: params.settings,
        participants,
        invitations: Vec::new(),
        sessions: vec![session],
        version: 0,
        created_at: now,
        last_activity_at: now,
    })
}

/// Admit `user_id` into the room, or reactivate their earlier roster entry.
///
/// Gates are evaluated in order and short-circuit: inactive room, capacity,
/// missing password, wrong password. A failed join leaves the roster
/// untouched.
pub fn join(
    room: &mut Room,
    user_id: &str,
    password: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    if !room.is_active {
        return Err(AppError::RoomInactive);
    }

    let already_active = room
        .participants
        .get(user_id)
        .is_some_and(|p| p.is_active);

    // An already-active member re-issuing a join must not trip the capacity
    // gate: they hold one of the occupied slots.
    if !already_active && room.active_participant_count() >= room.max_participants as usize {
        return Err(AppError::RoomFull);
    }

    if room.access == AccessType::PasswordProtected {
        let supplied = match password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AppError::PasswordRequired),
        };
        let matches = room
            .password_hash
            .as_deref()
            .is_some_and(|hash| security::verify_password(hash, supplied));
        if !matches {
            return Err(AppError::InvalidPassword);
        }
    }

    let was_empty = room.active_participant_count() == 0;

    let newly_active = match room.participants.get_mut(user_id) {
        Some(p) if p.is_active => {
            p.last_seen = now;
            false
        }
        Some(p) => {
            // Rejoin: role and joined_at are sticky, presence resets.
            p.is_active = true;
            p.left_at = None;
            p.last_seen = now;
            true
        }
        None => {
            room.participants
                .insert(user_id.to_string(), Participant::new(user_id, Role::Participant, now));
            true
        }
    };

    if newly_active {
        if was_empty {
            room.sessions.push(CallSession::begin(now));
        }
        if let Some(session) = room.open_session_mut() {
            session.record_join(user_id, now);
        }
    }

    room.touch(now);
    Ok(())
}

/// Mark `user_id` as no longer active. Idempotent: a second leave (or a
/// leave by a non-participant) is a no-op, not an error.
pub fn leave(room: &mut Room, user_id: &str, now: DateTime<Utc>) {
    if deactivate(room, user_id, now) {
        room.touch(now);
    }
}

fn deactivate(room: &mut Room, user_id: &str, now: DateTime<Utc>) -> bool {
    let Some(participant) = room.participants.get_mut(user_id) else {
        return false;
    };
    if !participant.is_active {
        return false;
    }

    participant.is_active = false;
    participant.left_at = Some(now);
    participant.total_time_secs += (now - participant.last_seen).num_seconds().max(0);

    if let Some(session) = room.open_session_mut() {
        session.record_leave(user_id, now);
    }
    if room.active_participant_count() == 0 {
        if let Some(session) = room.open_session_mut() {
            session.close(now);
        }
    }
    true
}

pub fn is_participant(room: &Room, user_id: &str) -> bool {
    room.participants
        .get(user_id)
        .is_some_and(|p| p.is_active)
}

/// Role of the *active* participant record, if any.
pub fn effective_role(room: &Room, user_id: &str) -> Option<Role> {
    room.participants
        .get(user_id)
        .filter(|p| p.is_active)
        .map(|p| p.role)
}

/// The owner is always allowed; everyone else is checked against their
/// stored flags. Absent or inactive participants are denied.
pub fn has_permission(room: &Room, user_id: &str, permission: Permission) -> bool {
    match effective_role(room, user_id) {
        Some(Role::Owner) => true,
        Some(_) => room
            .participants
            .get(user_id)
            .map(|p| p.permissions.get(permission))
            .unwrap_or(false),
        None => false,
    }
}

/// Shallow-merge `patch` into the room settings. Authorization (owner or
/// admin) is the caller's responsibility via [`effective_role`].
pub fn update_settings(room: &mut Room, patch: &SettingsPatch, now: DateTime<Utc>) {
    room.settings.apply(patch);
    room.touch(now);
}

/// Explicit role change, separate from join/leave. Owner/admin only; the
/// owner record itself is untouchable and the owner role cannot be granted.
pub fn change_role(
    room: &mut Room,
    caller_id: &str,
    target_id: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<()> {
    if !effective_role(room, caller_id).is_some_and(Role::can_manage) {
        return Err(AppError::InsufficientPermission);
    }
    if role == Role::Owner {
        return Err(AppError::BadRequest(
            "the owner role cannot be granted".to_string(),
        ));
    }
    let Some(target) = room.participants.get_mut(target_id) else {
        return Err(AppError::NotParticipant);
    };
    if target.role == Role::Owner {
        return Err(AppError::InsufficientPermission);
    }
    target.role = role;
    room.touch(now);
    Ok(())
}

/// Flip a single stored permission flag on the target's roster entry.
pub fn set_permission(
    room: &mut Room,
    caller_id: &str,
    target_id: &str,
    permission: Permission,
    allow: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    if !effective_role(room, caller_id).is_some_and(Role::can_manage) {
        return Err(AppError::InsufficientPermission);
    }
    let Some(target) = room.participants.get_mut(target_id) else {
        return Err(AppError::NotParticipant);
    };
    target.permissions.set(permission, allow);
    room.touch(now);
    Ok(())
}

/// Force-remove an active participant. Requires the kick permission (the
/// owner holds it implicitly); the owner cannot be kicked.
pub fn kick(room: &mut Room, caller_id: &str, target_id: &str, now: DateTime<Utc>) -> Result<()> {
    if !has_permission(room, caller_id, Permission::Kick) {
        return Err(AppError::InsufficientPermission);
    }
    match room.participants.get(target_id) {
        Some(p) if p.role == Role::Owner => return Err(AppError::InsufficientPermission),
        Some(p) if p.is_active => {}
        _ => return Err(AppError::NotParticipant),
    }
    deactivate(room, target_id, now);
    room.touch(now);
    Ok(())
}

/// Record an invitation for `target_id`. Moderators and above may invite.
pub fn invite(
    room: &mut Room,
    caller_id: &str,
    target_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    match effective_role(room, caller_id) {
        Some(Role::Owner | Role::Admin | Role::Moderator) => {}
        _ => return Err(AppError::InsufficientPermission),
    }
    if is_participant(room, target_id) {
        return Err(AppError::BadRequest(
            "user is already an active participant".to_string(),
        ));
    }
    if room
        .invitations
        .iter()
        .any(|inv| inv.user_id == target_id && inv.is_pending(now))
    {
        return Err(AppError::BadRequest(
            "user already has a pending invitation".to_string(),
        ));
    }
    room.invitations
        .push(Invitation::new(target_id, caller_id, now));
    room.touch(now);
    Ok(())
}

/// Accept or decline the caller's pending invitation. Expired invitations
/// are treated as absent. Accepting records intent only; entering the room
/// still goes through [`join`] and its gates.
pub fn respond_to_invitation(
    room: &mut Room,
    user_id: &str,
    accept: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(invitation) = room
        .invitations
        .iter_mut()
        .find(|inv| inv.user_id == user_id && inv.is_pending(now))
    else {
        return Err(AppError::NotFound("no pending invitation".to_string()));
    };
    invitation.status = if accept {
        crate::models::InvitationStatus::Accepted
    } else {
        crate::models::InvitationStatus::Declined
    };
    room.touch(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvitationStatus, QualityDefault, RoomStatus};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn params(name: &str) -> CreateRoomParams {
        CreateRoomParams {
            name: name.to_string(),
            description: String::new(),
            access: AccessType::Public,
            password: None,
            max_participants: 10,
            settings: RoomSettings::default(),
        }
    }

    fn public_room(max: u32) -> Room {
        let mut p = params("Standup");
        p.max_participants = max;
        create_room("owner", "ABCD1234".into(), p, Utc::now()).unwrap()
    }

    fn protected_room(password: &str) -> Room {
        let mut p = params("War room");
        p.access = AccessType::PasswordProtected;
        p.password = Some(password.to_string());
        create_room("owner", "ABCD1234".into(), p, Utc::now()).unwrap()
    }

    #[test]
    fn create_inserts_owner_as_sole_active_participant() {
        let room = public_room(10);
        assert_eq!(room.active_participant_count(), 1);
        assert_eq!(effective_role(&room, "owner"), Some(Role::Owner));
        assert_eq!(room.status(), RoomStatus::Active);
        // Owner auto-join opens the first call session.
        assert_eq!(room.sessions.len(), 1);
        assert!(room.sessions[0].is_open());
    }

    #[test]
    fn create_rejects_bad_name_length() {
        let err = create_room("owner", "C0DE0001".into(), params("ab"), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));

        let long = "x".repeat(101);
        let err = create_room("owner", "C0DE0002".into(), params(&long), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }

    #[test]
    fn create_rejects_bad_capacity() {
        for cap in [0u32, 1001] {
            let mut p = params("Standup");
            p.max_participants = cap;
            let err = create_room("owner", "C0DE0003".into(), p, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn create_requires_password_for_protected_rooms() {
        let mut p = params("Secret");
        p.access = AccessType::PasswordProtected;
        let err = create_room("owner", "C0DE0004".into(), p, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }

    #[test]
    fn password_hash_present_iff_protected() {
        assert!(public_room(10).password_hash.is_none());
        assert!(protected_room("abcd").password_hash.is_some());
    }

    #[test]
    fn join_gates_in_order() {
        // Inactive room wins over everything else.
        let mut room = protected_room("abcd");
        room.is_active = false;
        assert!(matches!(
            join(&mut room, "bob", None, Utc::now()),
            Err(AppError::RoomInactive)
        ));

        // Full wins over missing password.
        let mut room = protected_room("abcd");
        room.max_participants = 1; // owner occupies the only slot
        assert!(matches!(
            join(&mut room, "bob", None, Utc::now()),
            Err(AppError::RoomFull)
        ));

        // Missing password before wrong password.
        let mut room = protected_room("abcd");
        assert!(matches!(
            join(&mut room, "bob", None, Utc::now()),
            Err(AppError::PasswordRequired)
        ));
        assert!(matches!(
            join(&mut room, "bob", Some("wrong"), Utc::now()),
            Err(AppError::InvalidPassword)
        ));
    }

    #[test]
    fn failed_password_join_leaves_roster_untouched() {
        let mut room = protected_room("abcd");
        let before = room.participants.clone();

        let err = join(&mut room, "bob", Some("wrong"), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidPassword));
        assert_eq!(room.participants, before);

        join(&mut room, "bob", Some("abcd"), Utc::now()).unwrap();
        assert_eq!(room.active_participant_count(), 2);
    }

    #[test]
    fn capacity_scenario_one_slot() {
        let mut room = public_room(1);
        assert_eq!(room.active_participant_count(), 1);

        assert!(matches!(
            join(&mut room, "bob", None, Utc::now()),
            Err(AppError::RoomFull)
        ));

        leave(&mut room, "owner", Utc::now());
        assert_eq!(room.active_participant_count(), 0);

        join(&mut room, "bob", None, Utc::now()).unwrap();
        assert_eq!(room.active_participant_count(), 1);
        assert_eq!(effective_role(&room, "bob"), Some(Role::Participant));
    }

    #[test]
    fn rejoin_of_active_member_does_not_trip_capacity() {
        let mut room = public_room(1);
        // Owner is the only slot holder; their own re-join must succeed.
        join(&mut room, "owner", None, Utc::now()).unwrap();
        assert_eq!(room.active_participant_count(), 1);
    }

    #[test]
    fn leave_is_idempotent() {
        let mut room = public_room(10);
        join(&mut room, "bob", None, Utc::now()).unwrap();

        leave(&mut room, "bob", Utc::now());
        let snapshot = room.participants.clone();
        leave(&mut room, "bob", Utc::now());
        assert_eq!(room.participants, snapshot);

        // Leaving without ever joining is also a no-op.
        leave(&mut room, "carol", Utc::now());
        assert!(!room.participants.contains_key("carol"));
    }

    #[test]
    fn role_is_sticky_across_rejoin() {
        let now = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, now).unwrap();
        change_role(&mut room, "owner", "bob", Role::Moderator, now).unwrap();

        leave(&mut room, "bob", now);
        assert_eq!(effective_role(&room, "bob"), None);
        assert!(room.participants["bob"].left_at.is_some());

        join(&mut room, "bob", None, now + Duration::minutes(5)).unwrap();
        assert_eq!(effective_role(&room, "bob"), Some(Role::Moderator));
        assert!(room.participants["bob"].left_at.is_none());
    }

    #[test]
    fn owner_leave_keeps_role() {
        let mut room = public_room(10);
        leave(&mut room, "owner", Utc::now());

        let owner = &room.participants["owner"];
        assert!(!owner.is_active);
        assert_eq!(owner.role, Role::Owner);
    }

    #[test]
    fn owner_has_every_permission_regardless_of_flags() {
        let mut room = public_room(10);
        room.participants["owner"].permissions = PermissionSet {
            can_mute: false,
            can_unmute: false,
            can_share_screen: false,
            can_chat: false,
            can_record: false,
            can_kick: false,
        };

        for p in [
            Permission::Mute,
            Permission::Unmute,
            Permission::ShareScreen,
            Permission::Chat,
            Permission::Record,
            Permission::Kick,
        ] {
            assert!(has_permission(&room, "owner", p));
        }
    }

    #[test]
    fn permissions_default_false_for_absent_or_inactive() {
        let mut room = public_room(10);
        assert!(!has_permission(&room, "ghost", Permission::Chat));

        join(&mut room, "bob", None, Utc::now()).unwrap();
        assert!(has_permission(&room, "bob", Permission::Chat));
        assert!(!has_permission(&room, "bob", Permission::Kick));

        leave(&mut room, "bob", Utc::now());
        assert!(!has_permission(&room, "bob", Permission::Chat));
    }

    #[test]
    fn settings_patch_is_shallow() {
        let mut room = public_room(10);
        let patch = SettingsPatch {
            recording_enabled: Some(true),
            mute_on_entry: Some(true),
            ..Default::default()
        };
        update_settings(&mut room, &patch, Utc::now());

        assert!(room.settings.recording_enabled);
        assert!(room.settings.mute_on_entry);
        // Unspecified keys retain prior values.
        assert!(room.settings.video_enabled);
        assert_eq!(room.settings.quality, QualityDefault::Auto);
    }

    #[test]
    fn change_role_requires_owner_or_admin() {
        let now = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, now).unwrap();
        join(&mut room, "carol", None, now).unwrap();

        assert!(matches!(
            change_role(&mut room, "bob", "carol", Role::Moderator, now),
            Err(AppError::InsufficientPermission)
        ));

        change_role(&mut room, "owner", "bob", Role::Admin, now).unwrap();
        change_role(&mut room, "bob", "carol", Role::Moderator, now).unwrap();
        assert_eq!(effective_role(&room, "carol"), Some(Role::Moderator));
    }

    #[test]
    fn owner_role_cannot_be_granted_or_taken() {
        let now = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, now).unwrap();

        assert!(matches!(
            change_role(&mut room, "owner", "bob", Role::Owner, now),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            change_role(&mut room, "owner", "owner", Role::Participant, now),
            Err(AppError::InsufficientPermission)
        ));
    }

    #[test]
    fn kick_requires_permission_and_spares_owner() {
        let now = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, now).unwrap();
        join(&mut room, "carol", None, now).unwrap();

        assert!(matches!(
            kick(&mut room, "bob", "carol", now),
            Err(AppError::InsufficientPermission)
        ));

        set_permission(&mut room, "owner", "bob", Permission::Kick, true, now).unwrap();
        kick(&mut room, "bob", "carol", now).unwrap();
        assert!(!is_participant(&room, "carol"));

        assert!(matches!(
            kick(&mut room, "bob", "owner", now),
            Err(AppError::InsufficientPermission)
        ));
        // Kicking someone already gone is NotParticipant, not a silent no-op.
        assert!(matches!(
            kick(&mut room, "owner", "carol", now),
            Err(AppError::NotParticipant)
        ));
    }

    #[test]
    fn invitations_lifecycle() {
        let now = Utc::now();
        let mut room = public_room(10);

        invite(&mut room, "owner", "dave", now).unwrap();
        assert!(matches!(
            invite(&mut room, "owner", "dave", now),
            Err(AppError::BadRequest(_))
        ));

        respond_to_invitation(&mut room, "dave", true, now).unwrap();
        assert_eq!(room.invitations[0].status, InvitationStatus::Accepted);

        // Expired invitations read as absent.
        invite(&mut room, "owner", "erin", now).unwrap();
        let later = now + Duration::days(8);
        assert!(matches!(
            respond_to_invitation(&mut room, "erin", true, later),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn participants_may_not_invite() {
        let now = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, now).unwrap();
        assert!(matches!(
            invite(&mut room, "bob", "dave", now),
            Err(AppError::InsufficientPermission)
        ));
    }

    #[test]
    fn status_derivation() {
        let mut room = public_room(10);
        assert_eq!(room.status(), RoomStatus::Active);

        leave(&mut room, "owner", Utc::now());
        assert_eq!(room.status(), RoomStatus::Empty);

        room.is_active = false;
        assert_eq!(room.status(), RoomStatus::Inactive);
    }

    #[test]
    fn sessions_track_call_boundaries() {
        let t0 = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, t0).unwrap();

        // Everyone leaves: the session closes.
        leave(&mut room, "bob", t0 + Duration::minutes(10));
        leave(&mut room, "owner", t0 + Duration::minutes(11));
        assert_eq!(room.sessions.len(), 1);
        assert!(!room.sessions[0].is_open());

        // Next join opens a second session.
        join(&mut room, "bob", None, t0 + Duration::minutes(30)).unwrap();
        assert_eq!(room.sessions.len(), 2);
        assert!(room.sessions[1].is_open());
        assert_eq!(room.sessions[1].participants.len(), 1);
    }

    #[test]
    fn leave_accumulates_time() {
        let t0 = Utc::now();
        let mut room = public_room(10);
        join(&mut room, "bob", None, t0).unwrap();
        leave(&mut room, "bob", t0 + Duration::seconds(90));
        assert_eq!(room.participants["bob"].total_time_secs, 90);

        join(&mut room, "bob", None, t0 + Duration::seconds(200)).unwrap();
        leave(&mut room, "bob", t0 + Duration::seconds(260));
        assert_eq!(room.participants["bob"].total_time_secs, 150);
    }

    #[test]
    fn roster_preserves_join_order() {
        let now = Utc::now();
        let mut room = public_room(10);
        for user in ["bob", "carol", "dave"] {
            join(&mut room, user, None, now).unwrap();
        }
        let order: Vec<&str> = room.participants.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["owner", "bob", "carol", "dave"]);
    }
}
