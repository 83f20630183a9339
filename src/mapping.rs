//! Folder mapping resolver
//!
//! A personal repository is placed by its description: the first declared
//! folder whose name equals the description wins. Repositories without a
//! description go to the first declared folder. Organization repositories all
//! go to the folder named after the organization.

use crate::config::{FolderSpec, RootConfig};
use crate::discovery::{Owner, RepositoryDescriptor};
use crate::error::ResolutionError;

/// Resolve a personal repository to one declared folder
pub fn resolve<'a>(
    repository: &RepositoryDescriptor,
    folders: &'a [FolderSpec],
) -> Result<&'a FolderSpec, ResolutionError> {
    let first = folders.first().ok_or_else(|| ResolutionError::NoFolders {
        repository: repository.name.clone(),
    })?;

    let Some(key) = repository.mapping_key() else {
        return Ok(first);
    };

    folders
        .iter()
        .find(|folder| folder.name == key)
        .ok_or_else(|| ResolutionError::NoMatch {
            repository: repository.name.clone(),
            key: key.to_string(),
        })
}

/// Folder for an organization: the declared folder of the same name, else
/// `<OrganizationsPath>/<org>`
pub fn organization_folder(organization: &str, config: &RootConfig) -> FolderSpec {
    config
        .folders
        .iter()
        .find(|folder| folder.name == organization)
        .cloned()
        .unwrap_or_else(|| {
            FolderSpec::new(
                organization,
                format!("{}/{}", config.organizations_path, organization),
            )
        })
}

/// Resolve any repository by its owner
pub fn resolve_for_owner(
    owner: &Owner,
    repository: &RepositoryDescriptor,
    config: &RootConfig,
) -> Result<FolderSpec, ResolutionError> {
    match owner {
        Owner::Personal(_) => resolve(repository, &config.folders).cloned(),
        Owner::Organization(org) => Ok(organization_folder(org, config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitConfig;
    use crate::discovery::Visibility;
    use assert_matches::assert_matches;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use std::collections::HashSet;

    fn folders() -> Vec<FolderSpec> {
        vec![FolderSpec::new("A", "p/a"), FolderSpec::new("B", "p/b")]
    }

    fn repo(description: Option<&str>) -> RepositoryDescriptor {
        RepositoryDescriptor::new("repo", description, Visibility::Private)
    }

    fn config(folders: Vec<FolderSpec>) -> RootConfig {
        RootConfig {
            git_config: GitConfig {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                account: "ada".into(),
            },
            folders,
            organizations_path: "Develop/CustomerProjects".into(),
            documents_root: None,
        }
    }

    #[test]
    fn test_description_selects_folder() {
        let folders = folders();
        let resolved = resolve(&repo(Some("B")), &folders).expect("should resolve");
        assert_eq!(resolved.name, "B");
        assert_eq!(resolved.path, "p/b");
    }

    #[test]
    fn test_blank_description_takes_first_folder() {
        let folders = folders();
        assert_eq!(resolve(&repo(Some("")), &folders).map(|f| &f.name), Ok(&"A".to_string()));
        assert_eq!(resolve(&repo(None), &folders).map(|f| &f.name), Ok(&"A".to_string()));
        assert_eq!(resolve(&repo(Some("  ")), &folders).map(|f| &f.name), Ok(&"A".to_string()));
    }

    #[test]
    fn test_unknown_description_is_resolution_error() {
        let folders = vec![FolderSpec::new("A", "p/a")];
        let result = resolve(&repo(Some("Z")), &folders);
        assert_eq!(
            result,
            Err(ResolutionError::NoMatch {
                repository: "repo".to_string(),
                key: "Z".to_string()
            })
        );
    }

    #[test]
    fn test_no_folders_is_resolution_error() {
        assert_matches!(resolve(&repo(None), &[]), Err(ResolutionError::NoFolders { .. }));
    }

    #[test]
    fn test_duplicate_names_pick_first_declared() {
        let folders = vec![
            FolderSpec::new("A", "first"),
            FolderSpec::new("A", "second"),
        ];
        let resolved = resolve(&repo(Some("A")), &folders).expect("should resolve");
        assert_eq!(resolved.path, "first");
    }

    #[test]
    fn test_description_match_is_case_sensitive() {
        let folders = folders();
        assert_matches!(resolve(&repo(Some("b")), &folders), Err(ResolutionError::NoMatch { .. }));
    }

    #[test]
    fn test_declared_organization_folder() {
        let config = config(vec![
            FolderSpec::new("Personal", "Develop/Personal"),
            FolderSpec::new("acme", "Clients/Acme"),
        ]);
        assert_eq!(organization_folder("acme", &config).path, "Clients/Acme");
    }

    #[test]
    fn test_undeclared_organization_falls_back() {
        let config = config(folders());
        let folder = organization_folder("globex", &config);
        assert_eq!(folder.name, "globex");
        assert_eq!(folder.path, "Develop/CustomerProjects/globex");
    }

    #[test]
    fn test_organization_repositories_ignore_description() {
        let config = config(folders());
        let owner = Owner::Organization("acme".into());
        let folder = resolve_for_owner(&owner, &repo(Some("B")), &config).expect("should resolve");
        assert_eq!(folder.name, "acme");

        let owner = Owner::Personal("ada".into());
        let folder = resolve_for_owner(&owner, &repo(Some("B")), &config).expect("should resolve");
        assert_eq!(folder.name, "B");
    }

    #[quickcheck]
    fn prop_declared_description_resolves_to_its_folder(names: Vec<String>, pick: usize) -> TestResult {
        let unique: Vec<String> = names
            .into_iter()
            .filter(|n| !n.trim().is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return TestResult::discard();
        }

        let folders: Vec<FolderSpec> = unique
            .iter()
            .map(|name| FolderSpec::new(name.clone(), format!("root/{}", name.len())))
            .collect();
        let wanted = &unique[pick % unique.len()];

        match resolve(&repo(Some(wanted)), &folders) {
            Ok(folder) => TestResult::from_bool(&folder.name == wanted),
            Err(_) => TestResult::failed(),
        }
    }
}
