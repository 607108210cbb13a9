// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{Host, RepoFixture};

use anyhow::Result;
use ft2_installer::{
    phase::repository::{rewrite_submodule_urls, run, verify_working_copy},
    PhaseError,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use simple_test_case::test_case;
use std::fs::{read_to_string, write};

#[test]
fn plain_directory_is_refused_untouched() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path().join("notes.txt"), "keep me")?;
    let host = Host::new(dir.path())?;

    let result = run(&host.context());
    assert!(matches!(result, Err(PhaseError::NotAWorkingCopy { .. })));
    assert_eq!(read_to_string(dir.path().join("notes.txt"))?, "keep me");
    assert!(!dir.path().join(".git").exists());

    Ok(())
}

#[test]
fn working_copy_of_other_project_is_refused() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = RepoFixture::new(dir.path())?.with_origin("https://github.com/someone/dotfiles.git")?;
    fixture.stage_and_commit("README.md", "dotfiles")?;
    let host = Host::new(dir.path())?;

    let result = run(&host.context());
    match result {
        Err(PhaseError::RemoteMismatch { remote, expected, .. }) => {
            assert_eq!(remote, "https://github.com/someone/dotfiles.git");
            assert_eq!(expected, "fermentrack-2");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    Ok(())
}

#[test]
fn working_copy_without_origin_is_refused() -> Result<()> {
    let dir = tempfile::tempdir()?;
    RepoFixture::new(dir.path())?.stage_and_commit("README.md", "local only")?;
    let host = Host::new(dir.path())?;

    let result = verify_working_copy(&host.context(), dir.path());
    assert!(matches!(result, Err(PhaseError::RemoteMismatch { .. })));

    Ok(())
}

#[test_case("https://github.com/thorrak/fermentrack-2.git"; "https")]
#[test_case("git@github.com:thorrak/fermentrack-2.git"; "ssh")]
#[test]
fn working_copy_of_project_is_accepted(url: &str) {
    let dir = tempfile::tempdir().unwrap();
    RepoFixture::new(dir.path()).unwrap().with_origin(url).unwrap();
    let host = Host::new(dir.path()).unwrap();

    verify_working_copy(&host.context(), dir.path()).unwrap();
}

#[test]
fn ssh_submodule_urls_are_rewritten_to_https() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let gitmodules = dir.path().join(".gitmodules");
    write(
        &gitmodules,
        indoc! {r#"
            [submodule "fermentrack-ui"]
            	path = fermentrack-ui
            	url = git@github.com:thorrak/fermentrack-ui.git
            [submodule "docs"]
            	path = docs
            	url = https://github.com/thorrak/fermentrack-docs.git
        "#},
    )?;

    assert_eq!(rewrite_submodule_urls(&gitmodules)?, 1);

    let config = git2::Config::open(&gitmodules)?;
    assert_eq!(
        config.get_string("submodule.fermentrack-ui.url")?,
        "https://github.com/thorrak/fermentrack-ui.git"
    );
    assert_eq!(
        config.get_string("submodule.docs.url")?,
        "https://github.com/thorrak/fermentrack-docs.git"
    );

    Ok(())
}
