//! Linking, demotion and removal of file records.

mod common;

use common::TestEnv;
use spool_lifecycle::LifecycleError;
use std::path::Path;
use time::Duration;

#[tokio::test]
async fn relinking_demotes_omitted_files() {
    let env = TestEnv::new().await;
    let a = env.seed_file("20240115-a.png", b"aaaa", true, "", Duration::ZERO).await;
    env.seed_file("20240115-b.png", b"bb", true, "", Duration::ZERO).await;

    let adopted = env
        .manager
        .use_files(&["20240115-a.png", "20240115-b.png"], "L1")
        .await
        .unwrap();
    assert_eq!(adopted, 2);

    env.manager.use_file("20240115-b.png", "L1").await.unwrap();

    let b = env.row("20240115-b.png").await.unwrap();
    assert!(!b.is_temp);
    assert_eq!(b.link_id, "L1");

    let a_after = env.row("20240115-a.png").await.unwrap();
    assert!(a_after.is_temp);
    assert_eq!(a_after.link_id, "L1");
    assert!(Path::new(&a.path).is_file());
}

#[tokio::test]
async fn relinking_leaves_other_owners_alone() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-x.png", b"x", false, "L2", Duration::ZERO).await;
    env.seed_file("20240115-y.png", b"y", true, "", Duration::ZERO).await;

    env.manager.use_file("20240115-y.png", "L1").await.unwrap();

    let x = env.row("20240115-x.png").await.unwrap();
    assert!(!x.is_temp);
    assert_eq!(x.link_id, "L2");
}

#[tokio::test]
async fn use_files_skips_blank_names_and_rejects_empty_link() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-a.png", b"a", true, "", Duration::ZERO).await;

    let adopted = env
        .manager
        .use_files(&["", "  ", "20240115-a.png"], "L1")
        .await
        .unwrap();
    assert_eq!(adopted, 1);

    let err = env.manager.use_file("20240115-a.png", " ").await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Core(spool_core::Error::EmptyLinkId)
    ));
}

#[tokio::test]
async fn empty_set_detaches_everything_for_link() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-a.png", b"a", false, "L1", Duration::ZERO).await;
    env.seed_file("20240115-b.png", b"b", false, "L1", Duration::ZERO).await;

    let adopted = env.manager.use_files::<&str>(&[], "L1").await.unwrap();
    assert_eq!(adopted, 0);

    for name in ["20240115-a.png", "20240115-b.png"] {
        assert!(env.row(name).await.unwrap().is_temp);
    }
}

#[tokio::test]
async fn use_content_links_referenced_images() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-p.png", b"p", true, "", Duration::ZERO).await;
    env.seed_file("20240115-q.png", b"q", true, "", Duration::ZERO).await;

    let content = "intro ![one](https://cdn.example.com/2024/01/20240115-p.png?w=200) \
                   and ![two](/files/20240115-q.png)";
    let names = env.manager.use_content(content, "markdown", "post-9").await.unwrap();
    assert_eq!(names, vec!["20240115-p.png", "20240115-q.png"]);

    for name in names {
        let row = env.row(&name).await.unwrap();
        assert!(!row.is_temp);
        assert_eq!(row.link_id, "post-9");
    }
}

#[test]
fn extract_references_preserves_order() {
    let registry = spool_core::ExtractorRegistry::with_defaults();
    let names = registry
        .extract("![a](http://x/2024/01/p.png) ![b](./q.jpg)", "markdown")
        .unwrap();
    assert_eq!(names, vec!["p.png", "q.jpg"]);
}

#[tokio::test]
async fn extract_references_rejects_unknown_syntax() {
    let env = TestEnv::new().await;
    assert!(env.manager.extract_references("text", "rst").is_err());

    let html = r#"<p><IMG class="x" src="/a/b/one.gif"><img src='two.png'></p>"#;
    let names = env.manager.extract_references(html, "html").unwrap();
    assert_eq!(names, vec!["one.gif", "two.png"]);
}

#[tokio::test]
async fn remove_file_ignores_unlinked_files() {
    let env = TestEnv::new().await;
    let row = env.seed_file("20240115-t.png", b"tmp", true, "", Duration::ZERO).await;

    assert!(!env.manager.remove_file("20240115-t.png").await.unwrap());
    assert!(env.row("20240115-t.png").await.is_some());
    assert!(Path::new(&row.path).is_file());

    assert!(!env.manager.remove_file("20240115-missing.png").await.unwrap());
}

#[tokio::test]
async fn remove_file_deletes_linked_file_and_record() {
    let env = TestEnv::new().await;
    let row = env.seed_file("20240115-l.png", b"lnk", false, "L1", Duration::ZERO).await;

    assert!(env.manager.remove_file("20240115-l.png").await.unwrap());
    assert!(env.row("20240115-l.png").await.is_none());
    assert!(!Path::new(&row.path).exists());
}

#[tokio::test]
async fn remove_file_tolerates_missing_disk_file() {
    let env = TestEnv::new().await;
    let row = env.seed_file("20240115-g.png", b"gone", false, "L1", Duration::ZERO).await;
    std::fs::remove_file(&row.path).unwrap();

    assert!(env.manager.remove_file("20240115-g.png").await.unwrap());
    assert!(env.row("20240115-g.png").await.is_none());
}

#[tokio::test]
async fn remove_owned_file_checks_owner() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-o.png", b"own", false, "owner", Duration::ZERO).await;

    let err = env
        .manager
        .remove_owned_file("20240115-o.png", "intruder")
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Unauthorized));
    assert!(env.row("20240115-o.png").await.is_some());

    assert!(
        env.manager
            .remove_owned_file("20240115-o.png", "owner")
            .await
            .unwrap()
    );
    assert!(env.row("20240115-o.png").await.is_none());
}

#[tokio::test]
async fn remove_files_deletes_everything_for_link() {
    let env = TestEnv::new().await;
    let a = env.seed_file("20240115-a.png", b"aaa", false, "L1", Duration::ZERO).await;
    let b = env.seed_file("20240115-b.png", b"bb", true, "L1", Duration::ZERO).await;
    let c = env.seed_file("20240115-c.png", b"c", false, "L2", Duration::ZERO).await;

    let stats = env.manager.remove_files("L1").await.unwrap();
    assert_eq!(stats.items_processed, 2);
    assert_eq!(stats.items_deleted, 2);
    assert_eq!(stats.bytes_reclaimed, 5);
    assert_eq!(stats.errors, 0);

    assert!(env.row("20240115-a.png").await.is_none());
    assert!(env.row("20240115-b.png").await.is_none());
    assert!(!Path::new(&a.path).exists());
    assert!(!Path::new(&b.path).exists());
    assert!(Path::new(&c.path).is_file());
    assert!(env.row("20240115-c.png").await.is_some());
}

#[tokio::test]
async fn remove_files_with_empty_or_unknown_link_is_noop() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-u.png", b"u", true, "", Duration::ZERO).await;

    assert_eq!(env.manager.remove_files("").await.unwrap().items_processed, 0);
    assert_eq!(
        env.manager.remove_files("nobody").await.unwrap().items_processed,
        0
    );
    assert!(env.row("20240115-u.png").await.is_some());
}

#[tokio::test]
async fn remove_temp_files_deletes_only_expired_temp_records() {
    let env = TestEnv::new().await;
    let old_temp = env
        .seed_file("20240115-old.png", b"old", true, "", Duration::hours(13))
        .await;
    let fresh_temp = env
        .seed_file("20240115-fresh.png", b"fresh", true, "", Duration::hours(1))
        .await;
    let old_linked = env
        .seed_file("20240115-kept.png", b"kept", false, "L1", Duration::hours(48))
        .await;
    let demoted = env
        .seed_file("20240115-demoted.png", b"dem", true, "L1", Duration::hours(20))
        .await;

    let stats = env.manager.remove_temp_files().await.unwrap();
    assert_eq!(stats.items_deleted, 2);
    assert_eq!(stats.bytes_reclaimed, 6);

    assert!(env.row("20240115-old.png").await.is_none());
    assert!(env.row("20240115-demoted.png").await.is_none());
    assert!(!Path::new(&old_temp.path).exists());
    assert!(!Path::new(&demoted.path).exists());

    assert!(env.row("20240115-fresh.png").await.is_some());
    assert!(env.row("20240115-kept.png").await.is_some());
    assert!(Path::new(&fresh_temp.path).is_file());
    assert!(Path::new(&old_linked.path).is_file());

    // Nothing left to do.
    let again = env.manager.remove_temp_files().await.unwrap();
    assert_eq!(again.items_processed, 0);
    assert_eq!(again.errors, 0);
}

#[tokio::test]
async fn temp_sweep_skips_files_it_cannot_delete() {
    let env = TestEnv::new().await;
    let first = env
        .seed_file("20240115-first.png", b"one", true, "", Duration::hours(13))
        .await;
    let stuck = env
        .seed_undeletable("20240115-stuck.png", true, "", Duration::hours(14))
        .await;
    let last = env
        .seed_file("20240115-last.png", b"three", true, "", Duration::hours(15))
        .await;

    let stats = env.manager.remove_temp_files().await.unwrap();
    assert_eq!(stats.items_processed, 3);
    assert_eq!(stats.items_deleted, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.bytes_reclaimed, 8);

    assert!(env.row("20240115-first.png").await.is_none());
    assert!(env.row("20240115-last.png").await.is_none());
    assert!(!Path::new(&first.path).exists());
    assert!(!Path::new(&last.path).exists());

    // The record stays so the next sweep retries it.
    assert!(env.row("20240115-stuck.png").await.is_some());
    assert!(Path::new(&stuck.path).is_dir());
}

#[tokio::test]
async fn remove_files_skips_files_it_cannot_delete() {
    let env = TestEnv::new().await;
    env.seed_undeletable("20240115-stuck.png", false, "L1", Duration::ZERO)
        .await;
    env.seed_file("20240115-ok.png", b"ok", false, "L1", Duration::ZERO)
        .await;

    let stats = env.manager.remove_files("L1").await.unwrap();
    assert_eq!(stats.items_processed, 2);
    assert_eq!(stats.items_deleted, 1);
    assert_eq!(stats.errors, 1);
    assert!(env.row("20240115-ok.png").await.is_none());
    assert!(env.row("20240115-stuck.png").await.is_some());
}

#[tokio::test]
async fn adopted_file_survives_temp_sweep() {
    let env = TestEnv::new().await;
    env.seed_file("20240115-a.png", b"a", true, "", Duration::hours(30))
        .await;
    env.manager.use_file("20240115-a.png", "L1").await.unwrap();

    let stats = env.manager.remove_temp_files().await.unwrap();
    assert_eq!(stats.items_deleted, 0);
    assert!(env.row("20240115-a.png").await.is_some());
}

#[tokio::test]
async fn lookup_by_path_finds_record() {
    let env = TestEnv::new().await;
    let row = env.seed_file("20240115-p.png", b"p", true, "", Duration::ZERO).await;

    let found = env.manager.lookup_by_path(&row.path).await.unwrap().unwrap();
    assert_eq!(found.uri_name, "20240115-p.png");
    assert!(
        env.manager
            .lookup_by_path(env.root.join("nope.png"))
            .await
            .unwrap()
            .is_none()
    );
}
