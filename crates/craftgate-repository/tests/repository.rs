//! Integration tests for the flat-file repository.

use std::sync::Arc;

use craftgate_protocol::{ConfigurationVersion, LaunchConfiguration, User};
use craftgate_repository::{Repository, RepositoryError};
use tempfile::TempDir;

const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

async fn open() -> (TempDir, Repository) {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = Repository::open(dir.path()).await.expect("open");
    (dir, repo)
}

fn png(body: &[u8]) -> Vec<u8> {
    let mut data = PNG.to_vec();
    data.extend_from_slice(body);
    data
}

// =========================================================================
// Users
// =========================================================================

#[tokio::test]
async fn test_open_lays_out_directories() {
    let (dir, _repo) = open().await;
    assert!(dir.path().join("Users").is_dir());
    assert!(dir.path().join("Skins").is_dir());
}

#[tokio::test]
async fn test_upsert_then_get_returns_same_record() {
    let (dir, repo) = open().await;
    let user = User::new("Alice", "pw", 100);

    repo.upsert_user(&user).await.expect("upsert");
    assert!(dir.path().join("Users").join("Alice.xml").is_file());
    assert_eq!(repo.get_user("Alice").await.expect("get"), user);
    assert!(repo.user_exists("Alice").await);
}

#[tokio::test]
async fn test_alice_balance_scenario() {
    let (_dir, repo) = open().await;

    repo.upsert_user(&User::new("Alice", "pw", 100)).await.expect("first");
    repo.upsert_user(&User::new("Alice", "pw", 150)).await.expect("second");

    assert_eq!(repo.get_user("Alice").await.expect("get").balance, 150);
    let nicknames = repo.list_nicknames().await.expect("list");
    assert_eq!(nicknames.iter().filter(|n| *n == "Alice").count(), 1);
    assert_eq!(nicknames.len(), 1);
}

#[tokio::test]
async fn test_get_missing_user_is_not_found() {
    let (_dir, repo) = open().await;
    let err = repo.get_user("nobody").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
    assert!(!repo.user_exists("nobody").await);
}

#[tokio::test]
async fn test_invalid_nickname_never_touches_disk() {
    let (_dir, repo) = open().await;
    assert!(!repo.user_exists("../secret").await);
    assert!(matches!(
        repo.get_user("../secret").await,
        Err(RepositoryError::InvalidInput(_))
    ));
    let bad = User::new("a/b", "pw", 0);
    assert!(matches!(
        repo.upsert_user(&bad).await,
        Err(RepositoryError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_list_nicknames_skips_strays() {
    let (dir, repo) = open().await;
    repo.upsert_user(&User::new("Alice", "pw", 1)).await.unwrap();
    repo.upsert_user(&User::new("Bob", "pw", 2)).await.unwrap();

    let users = dir.path().join("Users");
    std::fs::write(users.join("notes.txt"), b"x").unwrap();
    std::fs::write(users.join(".Carol.xml.0123456789abcdef.tmp"), b"x").unwrap();

    let names: Vec<String> = repo.list_nicknames().await.unwrap().into_iter().collect();
    assert_eq!(names, vec!["Alice".to_string(), "Bob".to_string()]);
}

#[tokio::test]
async fn test_record_for_other_user_is_corrupt() {
    let (dir, repo) = open().await;
    repo.upsert_user(&User::new("Alice", "pw", 1)).await.unwrap();
    std::fs::copy(
        dir.path().join("Users/Alice.xml"),
        dir.path().join("Users/Mallory.xml"),
    )
    .unwrap();

    assert!(matches!(
        repo.get_user("Mallory").await,
        Err(RepositoryError::CorruptData { .. })
    ));
}

#[tokio::test]
async fn test_remove_user() {
    let (_dir, repo) = open().await;
    repo.upsert_user(&User::new("Alice", "pw", 1)).await.unwrap();
    repo.remove_user("Alice").await.expect("remove");
    assert!(!repo.user_exists("Alice").await);
    assert!(repo.remove_user("Alice").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rename_is_delete_then_create() {
    let (_dir, repo) = open().await;
    let old = User::new("Alice", "pw", 70);
    repo.upsert_user(&old).await.unwrap();

    let renamed = User::new("Alicia", "pw", old.balance);
    repo.upsert_user(&renamed).await.unwrap();
    repo.remove_user("Alice").await.unwrap();

    let names: Vec<String> = repo.list_nicknames().await.unwrap().into_iter().collect();
    assert_eq!(names, vec!["Alicia".to_string()]);
    assert_eq!(repo.get_user("Alicia").await.unwrap().balance, 70);
}

// =========================================================================
// Skins
// =========================================================================

#[tokio::test]
async fn test_skin_lifecycle() {
    let (dir, repo) = open().await;
    let data = png(&[7u8; 300]);

    let path = repo.save_skin("bob", &data).await.expect("save");
    assert_eq!(path, dir.path().join("Skins").join("bob.png"));
    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk.len(), data.len());
    assert_eq!(on_disk, data);

    repo.remove_skin("bob.png").await.expect("remove");
    assert!(!path.exists());

    let err = repo.remove_skin("bob.png").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn test_save_skin_overwrites_fully() {
    let (_dir, repo) = open().await;
    repo.save_skin("bob", &png(&[1u8; 1000])).await.unwrap();
    let short = png(&[2u8; 10]);
    repo.save_skin("bob", &short).await.unwrap();

    assert_eq!(repo.load_skin("bob").await.unwrap(), short);
    let entries = std::fs::read_dir(repo.root().join("Skins")).unwrap().count();
    assert_eq!(entries, 1, "one skin file per nickname");
}

#[tokio::test]
async fn test_save_skin_rejects_non_png() {
    let (_dir, repo) = open().await;
    let err = repo.save_skin("bob", b"GIF89a...").await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidInput(_)));
}

#[tokio::test]
async fn test_remove_skin_rejects_traversal() {
    let (_dir, repo) = open().await;
    for path in ["../Users/Alice.xml", "/etc/passwd", "a/b.png"] {
        assert!(
            matches!(
                repo.remove_skin(path).await,
                Err(RepositoryError::InvalidInput(_))
            ),
            "{path}"
        );
    }
}

#[tokio::test]
async fn test_load_missing_skin_is_not_found() {
    let (_dir, repo) = open().await;
    assert!(repo.load_skin("ghost").await.unwrap_err().is_not_found());
}

// =========================================================================
// Singletons
// =========================================================================

#[tokio::test]
async fn test_missing_singletons_are_not_found() {
    let (_dir, repo) = open().await;
    assert!(repo.get_launch_config().await.unwrap_err().is_not_found());
    assert!(repo.get_config_version().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_singletons_round_trip() {
    let (dir, repo) = open().await;
    let config = LaunchConfiguration {
        required_balance: 100,
        dedicated_ram_mb: 6144,
        fullscreen: true,
    };
    repo.store_launch_config(&config).await.unwrap();
    repo.store_config_version(&ConfigurationVersion { stamp: 4 })
        .await
        .unwrap();

    assert!(dir.path().join("LaunchConfiguration.xml").is_file());
    assert!(dir.path().join("Version.xml").is_file());
    assert_eq!(repo.get_launch_config().await.unwrap(), config);
    assert_eq!(repo.get_config_version().await.unwrap().stamp, 4);
}

#[tokio::test]
async fn test_hand_written_singleton_files_parse() {
    let (dir, repo) = open().await;
    std::fs::write(
        dir.path().join("LaunchConfiguration.xml"),
        "<LaunchConfiguration>\n  <RequiredBalance>50</RequiredBalance>\n  \
         <DedicatedRamMb>2048</DedicatedRamMb>\n  <Fullscreen>false</Fullscreen>\n\
         </LaunchConfiguration>\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Version.xml"),
        "<ConfigurationVersion><Stamp>9</Stamp></ConfigurationVersion>",
    )
    .unwrap();

    let config = repo.get_launch_config().await.unwrap();
    assert_eq!(config.required_balance, 50);
    assert_eq!(config.dedicated_ram_mb, 2048);
    assert!(!config.fullscreen);
    assert_eq!(repo.get_config_version().await.unwrap().stamp, 9);
}

#[tokio::test]
async fn test_corrupt_singleton() {
    let (dir, repo) = open().await;
    std::fs::write(dir.path().join("Version.xml"), "not xml at all <<<").unwrap();
    assert!(matches!(
        repo.get_config_version().await,
        Err(RepositoryError::CorruptData { .. })
    ));
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_and_reads_never_see_partial_records() {
    let (_dir, repo) = open().await;
    let repo = Arc::new(repo);
    repo.upsert_user(&User::new("Alice", "pw", 0)).await.unwrap();

    let mut tasks = Vec::new();
    for balance in 1..=40u64 {
        let repo = Arc::clone(&repo);
        tasks.push(tokio::spawn(async move {
            repo.upsert_user(&User::new("Alice", "pw", balance)).await
        }));
    }
    for _ in 0..40 {
        let repo = Arc::clone(&repo);
        tasks.push(tokio::spawn(async move {
            // Every read must see some complete record.
            repo.get_user("Alice").await.map(|_| ())
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("operation");
    }

    let user = repo.get_user("Alice").await.unwrap();
    assert!((1..=40).contains(&user.balance));
    assert_eq!(repo.list_nicknames().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_to_different_users() {
    let (_dir, repo) = open().await;
    let repo = Arc::new(repo);

    let mut tasks = Vec::new();
    for i in 0..25u64 {
        let repo = Arc::clone(&repo);
        tasks.push(tokio::spawn(async move {
            repo.upsert_user(&User::new(format!("player{i}"), "pw", i)).await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("upsert");
    }

    assert_eq!(repo.list_nicknames().await.unwrap().len(), 25);
    assert_eq!(repo.get_user("player7").await.unwrap().balance, 7);
}
