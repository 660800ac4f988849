pub mod accounts;
pub mod rooms;

pub use accounts::AccountService;
pub use rooms::RoomService;
