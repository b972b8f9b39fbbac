#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod aggregation;
pub mod db;
pub mod events;
pub mod messages;
pub mod models;
pub mod schema;
pub mod token;
pub mod validators;
