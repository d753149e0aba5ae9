pub mod inhouse;
pub mod login;
pub mod stats;
pub mod testing;
pub mod users;
