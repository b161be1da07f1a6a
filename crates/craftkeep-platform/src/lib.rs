mod paths;

pub use paths::{AppPaths, AppPathsError, expand_home};
