//! Unit tests for mirror selection

use super::*;

fn repo(id: &str, url: &str) -> ArtifactRepository {
    ArtifactRepository::new(id, url)
}

#[test]
fn test_wildcard_matches_everything() {
    assert!(match_pattern(&repo("central", "https://repo1.example.com"), "*"));
    assert!(match_pattern(&repo("local", "file:///srv/repo"), "*"));
}

#[test]
fn test_id_list_and_exclusions() {
    let central = repo("central", "https://repo1.example.com");
    assert!(match_pattern(&central, "central"));
    assert!(match_pattern(&central, "snapshots,central"));
    assert!(!match_pattern(&central, "snapshots,releases"));
    assert!(!match_pattern(&central, "*,!central"));
    assert!(match_pattern(&repo("other", "https://x.example.com"), "*,!central"));
}

#[test]
fn test_external_wildcard() {
    assert!(match_pattern(&repo("a", "https://repo.example.com"), "external:*"));
    assert!(!match_pattern(&repo("b", "http://localhost/repo"), "external:*"));
    assert!(!match_pattern(&repo("c", "http://127.0.0.1/repo"), "external:*"));
    assert!(!match_pattern(&repo("d", "file:///srv/repo"), "external:*"));
    assert!(!match_pattern(&repo("e", "https://repo.example.com"), "external:*,!e"));
}

#[test]
fn test_external_http_wildcard() {
    assert!(match_pattern(&repo("a", "http://repo.example.com"), "external:http:*"));
    assert!(!match_pattern(&repo("b", "https://repo.example.com"), "external:http:*"));
}

#[test]
fn test_exact_id_beats_pattern() {
    let mirrors = vec![
        Mirror::new("everything", "https://all.example.com", "*"),
        Mirror::new("central-mirror", "https://central.example.com", "central"),
    ];
    let selected = select_mirror(&repo("central", "https://repo1.example.com"), &mirrors).unwrap();
    assert_eq!(selected.id, "central-mirror");

    let selected = select_mirror(&repo("other", "https://other.example.com"), &mirrors).unwrap();
    assert_eq!(selected.id, "everything");
}

#[test]
fn test_layout_filter() {
    let mut mirror = Mirror::new("m", "https://m.example.com", "*");
    mirror.mirror_of_layouts = Some("legacy".to_string());
    assert!(select_mirror(&repo("central", "https://repo1.example.com"), &[mirror.clone()]).is_none());

    mirror.mirror_of_layouts = Some("*,!legacy".to_string());
    assert!(select_mirror(&repo("central", "https://repo1.example.com"), &[mirror]).is_some());
}

#[test]
fn test_apply_mirrors_merges_replaced_repositories() {
    let repositories = vec![
        repo("central", "https://repo1.example.com"),
        repo("jboss", "https://jboss.example.com"),
        repo("internal", "http://localhost:8081/repo"),
    ];
    let mirrors = vec![Mirror::new("corp", "https://nexus.example.com/", "external:*")];

    let effective = apply_mirrors(&repositories, &mirrors);
    assert_eq!(effective.len(), 2);
    assert_eq!(effective[0].id, "corp");
    assert_eq!(effective[0].url, "https://nexus.example.com");
    assert_eq!(effective[0].mirrored_ids(), vec!["central", "jboss"]);
    assert_eq!(effective[1].id, "internal");
    assert_eq!(effective[1].mirrored_ids(), vec!["internal"]);
}

#[test]
fn test_apply_without_mirrors_is_identity() {
    let repositories = vec![repo("central", "https://repo1.example.com")];
    assert_eq!(apply_mirrors(&repositories, &[]), repositories);
}

proptest::proptest! {
    #[test]
    fn prop_exclusion_always_wins(id in "[a-z][a-z0-9-]{0,12}") {
        let repository = repo(&id, "https://repo.example.com");
        let excluded = format!("*,!{id}");
        proptest::prop_assert!(!match_pattern(&repository, &excluded));
        let excluded_external = format!("external:*,!{id}");
        proptest::prop_assert!(!match_pattern(&repository, &excluded_external));
    }
}
