mod cache;
mod client;
mod provider;
mod run_url;
#[cfg(test)]
mod tests;

pub use provider::GitHubProvider;
pub use run_url::RunUrl;
