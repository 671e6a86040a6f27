pub mod checker;
pub mod history;
pub mod listing;
pub mod member;
pub mod notify;
pub mod store;
pub mod tier;
