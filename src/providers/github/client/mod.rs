mod core;
mod graphql;
mod rest;

pub use self::core::GitHubClient;
