//! Scale tests: large and deep stores, repeated and concurrent searches.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use passafari::{
    DirectoryRoot, EntryPath, ImportSummary, KeyInfo, KeyRing, PassError, Passphrase, Status,
    Store,
};
use zeroize::Zeroizing;

/// Key ring that returns the ciphertext as plaintext.
struct EchoKeyRing;

impl KeyRing for EchoKeyRing {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        _passphrase: Option<&Passphrase>,
    ) -> passafari::Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(ciphertext.to_vec()))
    }

    fn import_keys(&mut self, _path: &Path) -> passafari::Result<ImportSummary> {
        Err(PassError::KeyImportFailed("not supported".into()))
    }

    fn keys(&self) -> passafari::Result<Vec<KeyInfo>> {
        Ok(Vec::new())
    }
}

fn populate(root: &Path, dirs: usize, per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("site-{d:03}"));
        std::fs::create_dir_all(&dir).unwrap();
        for e in 0..per_dir {
            std::fs::write(
                dir.join(format!("account-{e:03}.gpg")),
                format!("pw-{d}-{e}\nlogin: user{e}"),
            )
            .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();
    }
}

#[test]
fn stress_5000_entry_store_search() {
    let tmp = tempfile::tempdir().unwrap();
    populate(tmp.path(), 100, 50);
    let store = Store::new(DirectoryRoot::new(tmp.path()), EchoKeyRing);

    let all = store.search(".gpg");
    assert_eq!(all.status, Status::Found);
    assert_eq!(all.entries.len(), 5_000);
    assert!(all.entries.iter().all(|e| e.as_str().ends_with(".gpg")));

    let one_site = store.search("SITE-042/");
    assert_eq!(one_site.entries.len(), 50);

    let one_account = store.search("site-042/account-007");
    assert_eq!(
        one_account.entries,
        vec![EntryPath::parse("site-042/account-007.gpg").unwrap()]
    );
}

#[test]
fn stress_repeated_searches_are_identical() {
    let tmp = tempfile::tempdir().unwrap();
    populate(tmp.path(), 20, 20);
    let store = Store::new(DirectoryRoot::new(tmp.path()), EchoKeyRing);

    let first = store.search("account-01");
    for _ in 0..50 {
        assert_eq!(store.search("account-01"), first);
    }
}

#[test]
fn stress_deeply_nested_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let mut dir = tmp.path().to_path_buf();
    let mut relative = Vec::new();
    for depth in 0..40 {
        let name = format!("level{depth}");
        dir = dir.join(&name);
        relative.push(name);
    }
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("deep.gpg"), b"deep-pw").unwrap();
    relative.push("deep.gpg".to_string());

    let store = Store::new(DirectoryRoot::new(tmp.path()), EchoKeyRing);
    let result = store.search("deep");
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].as_str(), relative.join("/"));

    let revealed = store.reveal(result.entries[0].as_str(), &mut |_: &EntryPath| {
        None::<Passphrase>
    });
    assert_eq!(revealed.password, "deep-pw");
}

#[test]
fn stress_concurrent_callers_share_one_store() {
    let tmp = tempfile::tempdir().unwrap();
    populate(tmp.path(), 10, 10);
    let store = Arc::new(Mutex::new(Store::new(
        DirectoryRoot::new(tmp.path()),
        EchoKeyRing,
    )));

    let mut handles = Vec::new();
    for thread_id in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let site = (thread_id + i) % 10;
                let store = store.lock().unwrap();
                let found = store.search(&format!("site-{site:03}"));
                assert_eq!(found.entries.len(), 10);

                let entry = format!("site-{site:03}/account-003.gpg");
                let revealed = store.reveal(&entry, &mut |_: &EntryPath| None::<Passphrase>);
                assert_eq!(revealed.status, Status::Found);
                assert_eq!(revealed.login, "user3");
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
}
