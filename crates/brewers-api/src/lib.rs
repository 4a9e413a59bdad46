pub mod accounts;
pub mod actions;
pub mod auth;
pub mod batches;
pub mod containers;
pub mod convert;
pub mod error;
pub mod friends;
pub mod mailer;
pub mod middleware;
pub mod notes;
pub mod ratings;
pub mod recipes;
pub mod routes;

#[cfg(test)]
mod test_support;
