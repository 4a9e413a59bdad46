mod actions;
mod batches;
mod containers;
mod friends;
mod notes;
mod ratings;
mod recipes;
mod users;
