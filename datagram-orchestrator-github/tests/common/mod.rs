//! Shared helpers for live GitHub tests

#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use datagram_orchestrator_github::{ClientOptions, GithubApi, RepoRef, create_client};

/// Skip the test when a required environment variable is missing.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: missing environment variable {}", $var);
                return;
            }
        )+
    };
}

/// Assert an `Option` is `Some` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Secret name that cannot exist on the test repository.
pub fn generate_missing_secret_name() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("DATAGRAM_TEST_{}", uuid[..12].to_ascii_uppercase())
}

/// Test context: a client for `GITHUB_TEST_TOKEN` and the repository named by
/// `GITHUB_TEST_REPO` (`owner/name`).
pub struct TestContext {
    pub client: Arc<dyn GithubApi>,
    pub repo: Option<RepoRef>,
}

impl TestContext {
    pub fn from_env() -> Option<Self> {
        let token = env::var("GITHUB_TEST_TOKEN").ok()?;
        let client = create_client(token, &ClientOptions::default()).ok()?;
        let repo = env::var("GITHUB_TEST_REPO").ok().and_then(|full| {
            let (owner, name) = full.split_once('/')?;
            Some(RepoRef::new(owner, name))
        });
        Some(Self { client, repo })
    }
}
