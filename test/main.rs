// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod repository;

use anyhow::Result;
use ft2_installer::{InquirePrompter, Manifest, RunConfig, SystemRunner};
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use std::path::Path;

pub(crate) struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    pub(crate) fn with_origin(self, url: &str) -> Result<Self> {
        self.repo.remote("origin", url)?;
        Ok(self)
    }

    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename
                .as_ref()
                .as_os_str()
                .to_string_lossy()
                .into_owned()
                .into_bytes(),
        };

        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let signature = self.repo.signature()?;
        let parent = match self.repo.head() {
            Ok(head) => head.target().map(|oid| self.repo.find_commit(oid)).transpose()?,
            Err(_) => None,
        };
        let parents = parent.iter().collect::<Vec<_>>();

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            format!("chore: add {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

/// Real capabilities plus a run configuration rooted at target directory.
pub(crate) struct Host {
    pub(crate) config: RunConfig,
    pub(crate) manifest: Manifest,
    pub(crate) runner: SystemRunner,
    pub(crate) prompter: InquirePrompter,
}

impl Host {
    pub(crate) fn new(install_dir: impl AsRef<Path>) -> Result<Self> {
        let manifest = Manifest::embedded()?;
        let mut config = RunConfig::from_manifest(&manifest);
        config.install_dir = install_dir.as_ref().to_path_buf();

        Ok(Self {
            config,
            manifest,
            runner: SystemRunner::new(),
            prompter: InquirePrompter::new(),
        })
    }

    pub(crate) fn context(&self) -> ft2_installer::Context<'_> {
        ft2_installer::Context::new(&self.config, &self.manifest, &self.runner, &self.prompter)
    }
}
