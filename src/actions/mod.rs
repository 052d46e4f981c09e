mod get_profile;
mod login;
mod register;
mod update_profile;

pub use get_profile::GetProfileAction;
pub use login::{LoginAction, LoginOutcome, LoginSuccess};
pub use register::{RegisterAction, RegisterInput};
pub use update_profile::{UpdateProfileAction, UpdateProfileInput};
