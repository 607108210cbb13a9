// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Production environment configuration.
//!
//! The repository ships a sample environment directory. A fresh installation
//! copies it into place as the production environment, then fills in freshly
//! generated secrets. The existence of the production directory is the only
//! thing deciding whether that already happened: once it exists it is never
//! regenerated, so secrets, and the data encrypted with them, survive re-runs.

use crate::{
    envfile::EnvFileDrafter,
    phase::{Context, Outcome, PhaseError, Result},
    secrets::Secrets,
};

use std::{
    fs::{copy, create_dir_all, read_dir, rename},
    path::Path,
};
use tracing::{debug, info, instrument};

pub const SIGNING_KEY: &str = "DJANGO_SECRET_KEY";
pub const ENCRYPTION_KEY: &str = "DJANGO_FIELD_ENCRYPTION_KEY";
pub const DATABASE_USER: &str = "POSTGRES_USER";
pub const DATABASE_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const MULTI_TENANT: &str = "DJANGO_MULTI_TENANT";

/// Generate production environment configuration unless it exists.
///
/// # Errors
///
/// - Return [`PhaseError::MissingSample`] if the sample directory is missing.
/// - Return [`PhaseError::Io`] if the sample directory cannot be staged or
///   moved into place.
/// - Return [`PhaseError::EnvFile`] if an environment file cannot be edited.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let layout = &ctx.manifest.layout;
    let settings = &ctx.manifest.environment;
    let production = ctx.install_path(&layout.production_env_dir);
    let django = EnvFileDrafter::new(production.join(&settings.django_file));

    let mut message = if production.exists() {
        info!("preserve existing configuration at {}", production.display());
        format!(
            "Preserved existing configuration in {}",
            layout.production_env_dir.display()
        )
    } else {
        let sample = ctx.install_path(&layout.sample_env_dir);
        if !sample.is_dir() {
            return Err(PhaseError::MissingSample { path: sample });
        }

        generate(ctx, &sample, &production)?;
        format!(
            "Generated configuration with fresh secrets in {}",
            layout.production_env_dir.display()
        )
    };

    // INVARIANT: Never touch existing assignments, only add a missing one.
    if ctx.config.multi_tenant {
        if django.get(MULTI_TENANT)?.is_none() {
            django.edit(|edit| edit.set_if_missing(MULTI_TENANT, "True"))?;
            message.push_str(", multi-tenant mode enabled");
        } else {
            debug!("{MULTI_TENANT} already set");
        }
    }

    Ok(Outcome::Success(message))
}

/// Stage configuration next to production directory, then move it into place.
///
/// The production directory is the only marker of a finished generation, so it
/// must never exist half-written.
fn generate(ctx: &Context<'_>, sample: &Path, production: &Path) -> Result<()> {
    let settings = &ctx.manifest.environment;
    let parent = production.parent().unwrap_or(Path::new("."));
    create_dir_all(parent).map_err(|err| PhaseError::Io {
        source: err,
        action: "create",
        path: parent.to_path_buf(),
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".staging")
        .tempdir_in(parent)
        .map_err(|err| PhaseError::Io {
            source: err,
            action: "stage configuration in",
            path: parent.to_path_buf(),
        })?;
    debug!("stage configuration in {}", staging.path().display());

    copy_dir(sample, staging.path())?;
    let secrets = Secrets::generate(settings.database_user.as_str());
    debug!("generated {secrets:?}");

    EnvFileDrafter::new(staging.path().join(&settings.django_file)).edit(|edit| {
        edit.set(SIGNING_KEY, &secrets.signing_key);
        edit.set(ENCRYPTION_KEY, &secrets.encryption_key);
    })?;
    EnvFileDrafter::new(staging.path().join(&settings.postgres_file)).edit(|edit| {
        edit.set(DATABASE_USER, &secrets.database_user);
        edit.set(DATABASE_PASSWORD, &secrets.database_password);
    })?;

    rename(staging.path(), production).map_err(|err| PhaseError::Io {
        source: err,
        action: "move configuration into",
        path: production.to_path_buf(),
    })?;

    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    create_dir_all(to).map_err(|err| PhaseError::Io {
        source: err,
        action: "create",
        path: to.to_path_buf(),
    })?;

    let entries = read_dir(from).map_err(|err| PhaseError::Io {
        source: err,
        action: "read",
        path: from.to_path_buf(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|err| PhaseError::Io {
            source: err,
            action: "read",
            path: from.to_path_buf(),
        })?;
        let source = entry.path();
        let target = to.join(entry.file_name());

        if source.is_dir() {
            copy_dir(&source, &target)?;
        } else {
            copy(&source, &target).map_err(|err| PhaseError::Io {
                source: err,
                action: "copy",
                path: source.clone(),
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{envfile::EnvFileEdit, phase::testing::Harness, runner::fake::FakeRunner};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::fs::{read_to_string, write};

    const DJANGO: &str = indoc! {r#"
        USE_DOCKER=yes
        DJANGO_SECRET_KEY=!!!SET DJANGO_SECRET_KEY!!!
        # DJANGO_FIELD_ENCRYPTION_KEY=
    "#};

    const POSTGRES: &str = indoc! {r#"
        POSTGRES_HOST=postgres
        POSTGRES_PORT=5432
        POSTGRES_DB=fermentrack
        POSTGRES_USER=!!!SET POSTGRES_USER!!!
        POSTGRES_PASSWORD=!!!SET POSTGRES_PASSWORD!!!
    "#};

    fn harness(dir: &Path) -> Harness {
        let sample = dir.join(".envs/.production.sample");
        create_dir_all(&sample).unwrap();
        write(sample.join(".django"), DJANGO).unwrap();
        write(sample.join(".postgres"), POSTGRES).unwrap();

        let mut harness = Harness::new(FakeRunner::new());
        harness.config.install_dir = dir.to_path_buf();
        harness
    }

    fn read(dir: &Path, file: &str) -> EnvFileEdit {
        EnvFileEdit::from(
            read_to_string(dir.join(".envs/.production").join(file))
                .unwrap()
                .as_str(),
        )
    }

    #[test]
    fn fresh_install_generates_secrets() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let harness = harness(dir.path());

        run(&harness.context())?;

        let django = read(dir.path(), ".django");
        let postgres = read(dir.path(), ".postgres");
        assert_eq!(django.get("USE_DOCKER"), Some("yes"));
        assert_eq!(django.get(SIGNING_KEY).map(str::len), Some(64));
        assert!(django.get(ENCRYPTION_KEY).is_some_and(|key| !key.is_empty()));
        assert_eq!(postgres.get(DATABASE_USER), Some("fermentrack"));
        assert_eq!(postgres.get(DATABASE_PASSWORD).map(str::len), Some(32));
        assert_eq!(postgres.get("POSTGRES_DB"), Some("fermentrack"));
        assert!(!django.contains(MULTI_TENANT));

        Ok(())
    }

    #[test]
    fn fresh_installs_get_distinct_secrets() -> anyhow::Result<()> {
        let first = tempfile::tempdir()?;
        let second = tempfile::tempdir()?;
        run(&harness(first.path()).context())?;
        run(&harness(second.path()).context())?;

        for (file, key) in [
            (".django", SIGNING_KEY),
            (".django", ENCRYPTION_KEY),
            (".postgres", DATABASE_PASSWORD),
        ] {
            let a = read(first.path(), file).get(key).map(str::to_owned);
            let b = read(second.path(), file).get(key).map(str::to_owned);
            assert!(a.is_some());
            assert_ne!(a, b, "{key} repeated across installs");
        }

        Ok(())
    }

    #[test]
    fn existing_configuration_is_preserved() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let harness = harness(dir.path());
        run(&harness.context())?;

        let production = dir.path().join(".envs/.production");
        let django = read_to_string(production.join(".django"))?;
        let postgres = read_to_string(production.join(".postgres"))?;

        let outcome = run(&harness.context())?;
        assert!(matches!(outcome, Outcome::Success(message) if message.starts_with("Preserved")));
        assert_eq!(read_to_string(production.join(".django"))?, django);
        assert_eq!(read_to_string(production.join(".postgres"))?, postgres);

        Ok(())
    }

    #[test]
    fn multi_tenant_is_appended_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut harness = harness(dir.path());
        harness.config.multi_tenant = true;

        run(&harness.context())?;
        run(&harness.context())?;

        let django = read_to_string(dir.path().join(".envs/.production/.django"))?;
        assert_eq!(django.matches("DJANGO_MULTI_TENANT=True").count(), 1);

        Ok(())
    }

    #[test]
    fn multi_tenant_respects_existing_setting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut harness = harness(dir.path());
        run(&harness.context())?;

        let path = dir.path().join(".envs/.production/.django");
        let mut content = read_to_string(&path)?;
        content.push_str("DJANGO_MULTI_TENANT=False\n");
        write(&path, &content)?;

        harness.config.multi_tenant = true;
        run(&harness.context())?;
        assert_eq!(read_to_string(&path)?, content);

        Ok(())
    }

    #[test]
    fn missing_sample_is_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut harness = Harness::new(FakeRunner::new());
        harness.config.install_dir = dir.path().to_path_buf();

        let result = run(&harness.context());
        assert!(matches!(result, Err(PhaseError::MissingSample { .. })));
        assert!(!dir.path().join(".envs/.production").exists());

        Ok(())
    }

    #[test]
    fn failed_generation_leaves_no_production_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sample = dir.path().join(".envs/.production.sample");
        create_dir_all(&sample)?;
        write(sample.join(".postgres"), POSTGRES)?;
        let mut harness = Harness::new(FakeRunner::new());
        harness.config.install_dir = dir.path().to_path_buf();

        let result = run(&harness.context());
        assert!(matches!(result, Err(PhaseError::EnvFile(_))));
        assert!(!dir.path().join(".envs/.production").exists());
        let leftovers = read_dir(dir.path().join(".envs"))?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<std::io::Result<Vec<_>>>()?;
        assert_eq!(leftovers, vec![std::ffi::OsString::from(".production.sample")]);

        // Re-running must retry generation instead of preserving a partial result.
        let result = run(&harness.context());
        assert!(matches!(result, Err(PhaseError::EnvFile(_))));

        write(sample.join(".django"), DJANGO)?;
        run(&harness.context())?;
        let postgres = read(dir.path(), ".postgres");
        assert_eq!(postgres.get(DATABASE_PASSWORD).map(str::len), Some(32));

        Ok(())
    }
}
