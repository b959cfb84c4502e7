//! Site directory layout

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Where the server finds its `.env` file, the served output directory and
/// the placeholder page
#[derive(Debug, Clone)]
pub struct SiteLayout {
    /// Base directory for all site files
    pub root: PathBuf,

    /// Placeholder page override; defaults to `templates/deploying.html`
    pub placeholder: Option<PathBuf>,
}

impl SiteLayout {
    /// Create a new site layout
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            placeholder: None,
        }
    }

    /// Override the placeholder page
    pub fn with_placeholder(mut self, placeholder: impl Into<PathBuf>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key-value configuration file holding `DEPLOY_KEY`
    pub fn env_file(&self) -> File {
        File::new(self.root.join(".env"))
    }

    /// The served web root, replaced on every deployment
    pub fn public_dir(&self) -> Dir {
        Dir::new(self.root.join("public"))
    }

    /// Page shown while a deployment is being extracted
    pub fn placeholder_file(&self) -> File {
        match &self.placeholder {
            Some(path) => File::new(path.clone()),
            None => File::new(self.root.join("templates").join("deploying.html")),
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
