#![allow(async_fn_in_trait)]

pub mod baserow;
pub mod commands;
pub mod config;
pub mod context;
pub mod logs;
pub mod ranks;
pub mod schedule;
pub mod time;
pub mod wom;
