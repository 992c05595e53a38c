//! Integration test: full store workflow.
//!
//! Tests the complete lifecycle:
//! 1. Open a store over a directory tree
//! 2. Import keys
//! 3. Search entries
//! 4. Reveal with unlocked keys, a cached passphrase and a prompted one
//! 5. Render rows and fill requests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use passafari::presenter::{FillRequest, FillTarget, NO_MATCH_MESSAGE};
use passafari::{
    DirectoryRoot, EntryPath, ImportSummary, KeyInfo, KeyRing, MemoryPassphraseCache, PassError,
    Passphrase, Presenter, RevealStep, RootAccess, Status, Store,
};
use zeroize::Zeroizing;

// ── Test doubles ──────────────────────────────────────────────────────────────

/// Key ring that can only decrypt after a key file has been imported.
///
/// Ciphertext is `plain:<text>` (no passphrase) or `pp:<passphrase>:<text>`.
#[derive(Default)]
struct ScriptedKeyRing {
    keys: Vec<KeyInfo>,
}

impl KeyRing for ScriptedKeyRing {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: Option<&Passphrase>,
    ) -> passafari::Result<Zeroizing<Vec<u8>>> {
        if self.keys.is_empty() {
            return Err(PassError::DecryptFailed("no secret key".into()));
        }
        let text = std::str::from_utf8(ciphertext)
            .map_err(|_| PassError::DecryptFailed("not a message".into()))?;
        if let Some(plain) = text.strip_prefix("plain:") {
            return Ok(Zeroizing::new(plain.as_bytes().to_vec()));
        }
        if let Some((required, plain)) = text.strip_prefix("pp:").and_then(|t| t.split_once(':'))
        {
            if passphrase.map(Passphrase::expose) == Some(required) {
                return Ok(Zeroizing::new(plain.as_bytes().to_vec()));
            }
            return Err(PassError::DecryptFailed("bad passphrase".into()));
        }
        Err(PassError::DecryptFailed("not a message".into()))
    }

    fn import_keys(&mut self, path: &Path) -> passafari::Result<ImportSummary> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| PassError::KeyImportFailed(e.to_string()))?;
        let fingerprints: Vec<String> = data
            .lines()
            .filter_map(|line| line.strip_prefix("KEY "))
            .map(str::to_string)
            .collect();
        if fingerprints.is_empty() {
            return Err(PassError::KeyImportFailed("no keys found".into()));
        }
        for fingerprint in &fingerprints {
            self.keys.push(KeyInfo {
                fingerprint: fingerprint.clone(),
                user_id: Some("Test <test@example.com>".into()),
                has_secret: true,
            });
        }
        Ok(ImportSummary {
            processed: fingerprints.len() as u32,
            imported: fingerprints.len() as u32,
            fingerprints,
            ..ImportSummary::default()
        })
    }

    fn keys(&self) -> passafari::Result<Vec<KeyInfo>> {
        Ok(self.keys.clone())
    }
}

/// Directory root that counts acquire and release calls.
struct CountingRoot {
    inner: DirectoryRoot,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl RootAccess for CountingRoot {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn begin_access(&self) -> passafari::Result<()> {
        self.inner.begin_access()?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn end_access(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingPage {
    messages: Mutex<Vec<String>>,
}

impl FillTarget for RecordingPage {
    fn dispatch_message(&self, name: &str, request: &FillRequest) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{name}:{}", request.login));
    }
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

// ── Workflow ──────────────────────────────────────────────────────────────────

#[test]
fn full_workflow_import_search_reveal_fill() {
    // ── Step 1: Open a store ────────────────────────────────────────────
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    write(&root, "personal/email.gpg", "plain:mail-pw\nlogin: alice@example.com");
    write(&root, "work/aws.gpg", "pp:B:aws-pw\nuser: admin");
    write(&root, "work/vpn.gpg", "pp:C:vpn-pw");
    write(&root, ".git/config", "[core]");
    write(&root, ".git/secret.gpg", "plain:leaked");
    write(&root, ".gpg-id", "ABCDEF");

    let acquired = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let counting = CountingRoot {
        inner: DirectoryRoot::new(&root),
        acquired: Arc::clone(&acquired),
        released: Arc::clone(&released),
    };
    let cache = Arc::new(MemoryPassphraseCache::new());
    let mut store = Store::new(counting, ScriptedKeyRing::default())
        .with_passphrase_cache(Arc::clone(&cache));

    // Nothing decrypts before a key is imported.
    let early = store.reveal("personal/email.gpg", &mut |_: &EntryPath| None::<Passphrase>);
    assert_eq!(early.status, Status::DecryptFailed);

    // ── Step 2: Import keys ─────────────────────────────────────────────
    let key_file = dir.path().join("keys.asc");
    std::fs::write(&key_file, "KEY 0123456789ABCDEF\n").unwrap();
    let summary = store.import_keys(&key_file).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.fingerprints, vec!["0123456789ABCDEF".to_string()]);
    assert_eq!(store.keys().unwrap().len(), 1);

    let bad_key_file = dir.path().join("garbage.asc");
    std::fs::write(&bad_key_file, "not a key").unwrap();
    assert!(matches!(
        store.import_keys(&bad_key_file),
        Err(PassError::KeyImportFailed(_))
    ));

    // ── Step 3: Search ──────────────────────────────────────────────────
    let work = store.search("WORK");
    assert_eq!(work.status, Status::Found);
    let names: Vec<&str> = work.entries.iter().map(EntryPath::as_str).collect();
    assert_eq!(names, vec!["work/aws.gpg", "work/vpn.gpg"]);

    let git = store.search("git");
    assert_eq!(git.status, Status::NotFound);

    // ── Step 4: Reveal ──────────────────────────────────────────────────
    let email = store.reveal("personal/email.gpg", &mut |_: &EntryPath| -> Option<Passphrase> {
        panic!("unlocked key must not prompt")
    });
    assert_eq!(email.status, Status::Found);
    assert_eq!(email.password, "mail-pw");
    assert_eq!(email.login, "alice@example.com");

    // Non-blocking host: pending state, then resume with what the user typed.
    let pending = match store.begin_reveal("work/aws.gpg") {
        RevealStep::NeedsPassphrase(pending) => pending,
        RevealStep::Done(result) => panic!("expected a passphrase request, got {result:?}"),
    };
    let aws = pending.resume(&store, Some(Passphrase::new("B")));
    assert_eq!(aws.status, Status::Found);
    assert_eq!(aws.password, "aws-pw");
    assert_eq!(aws.login, "admin");

    // Cached passphrase is used without prompting.
    cache.set(Passphrase::new("C"));
    let vpn = store.reveal("work/vpn.gpg", &mut |_: &EntryPath| -> Option<Passphrase> {
        panic!("cached passphrase must not prompt")
    });
    assert_eq!(vpn.status, Status::Found);
    assert_eq!(vpn.login, "");
    cache.clear();

    // ── Step 5: Present ─────────────────────────────────────────────────
    let presenter = Presenter::new();
    let rows = presenter.rows(&work);
    assert_eq!(rows.len(), 2);
    assert!(presenter.should_focus_first(&rows, false));

    let empty_rows = presenter.rows(&store.search("nothing-matches-this"));
    assert_eq!(empty_rows[0].label, NO_MATCH_MESSAGE);
    assert!(!empty_rows[0].is_selectable());

    let page = RecordingPage::default();
    let request = presenter.fill_request(&aws, true);
    assert!(presenter.dispatch(Some(&page), &request));
    assert!(!presenter.dispatch(None, &request));
    assert_eq!(
        page.messages.lock().unwrap().as_slice(),
        &["credentials:admin".to_string()]
    );

    // Every acquire was released exactly once.
    let acquired = acquired.load(Ordering::SeqCst);
    assert!(acquired > 0);
    assert_eq!(acquired, released.load(Ordering::SeqCst));
}

#[test]
fn search_is_idempotent_and_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["Foo/bar.gpg", "foo.gpg", "baz/FOO.gpg", "qux.gpg"] {
        write(dir.path(), name, "plain:x");
    }
    let store = Store::new(DirectoryRoot::new(dir.path()), ScriptedKeyRing::default());

    let upper = store.search("Foo");
    let lower = store.search("foo");
    assert_eq!(upper, lower);
    assert_eq!(upper.entries.len(), 3);

    for _ in 0..5 {
        assert_eq!(store.search("foo"), lower);
    }
}

#[test]
fn access_denied_is_distinct_from_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(
        DirectoryRoot::new(dir.path().join("missing")),
        ScriptedKeyRing::default(),
    );

    let result = store.search("anything");
    assert_eq!(result.status, Status::AccessDenied);
    assert!(result.entries.is_empty());

    let reveal = store.reveal("a.gpg", &mut |_: &EntryPath| None::<Passphrase>);
    assert_eq!(reveal.status, Status::AccessDenied);
}

#[test]
fn results_serialize_for_hosts() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "site.gpg", "plain:pw\nlogin: eve");
    let mut store = Store::new(DirectoryRoot::new(dir.path()), ScriptedKeyRing::default());
    let key_file = dir.path().join("k.asc");
    std::fs::write(&key_file, "KEY FEED\n").unwrap();
    store.import_keys(&key_file).unwrap();

    let search = serde_json::to_value(store.search("site")).unwrap();
    assert_eq!(search["status"], "found");
    assert_eq!(search["entries"][0], "site.gpg");

    let reveal = store.begin_reveal("site.gpg").into_result();
    let json = serde_json::to_value(&reveal).unwrap();
    assert_eq!(json["status"], "found");
    assert_eq!(json["login"], "eve");
}
