mod common;

use common::{START, add_user, login, setup};
use tokengate::{
    cleanup::{REFRESH_RETENTION_SECS, run_cleanup},
    clock::DAY_SECS,
    db::UserRole,
};

#[tokio::test]
async fn test_cleanup_keeps_only_recent_sessions() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;

    // Sessions opened 9, 8, 7 and 0 days before "now".
    let now = START + 9 * DAY_SECS;
    let mut tokens = Vec::new();
    for age in [9, 8, 7, 0] {
        t.clock.set(now - age * DAY_SECS);
        let (_, refresh) = login(&t.app, "alice").await;
        tokens.push((age, refresh));
    }
    t.clock.set(now);

    run_cleanup(&t.db, t.clock.as_ref(), REFRESH_RETENTION_SECS).await;

    let store = t.db.refresh_tokens();
    for (age, token) in &tokens {
        let kept = store.exists(token).await.unwrap();
        assert_eq!(kept, *age < 8, "session aged {age} days");
    }
    assert_eq!(store.count().await.unwrap(), 2);
}
