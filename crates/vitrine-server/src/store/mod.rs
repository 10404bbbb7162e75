pub mod branding;
pub mod users;
