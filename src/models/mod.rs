pub mod invitation;
pub mod participant;
pub mod room;
pub mod session;
pub mod user;

pub use invitation::{Invitation, InvitationStatus};
pub use participant::{Participant, Permission, PermissionSet, Role};
pub use room::{AccessType, QualityDefault, Room, RoomSettings, RoomStatus, SettingsPatch};
pub use session::{CallSession, RecordingInfo, SessionParticipant};
pub use user::{Claims, User, UserProfile};
