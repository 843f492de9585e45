// DSC Runner Infrastructure - Upstream Profile Sources
// Implements: ProfileSource (GitHub contents API, local directory)

pub mod directory;
pub mod github;

pub use directory::DirectoryProfileSource;
pub use github::{GitHubProfileSource, GitHubSourceConfig};
