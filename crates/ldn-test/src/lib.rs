//! Test helpers shared by the LDN crates.

/// Await `$s`, panicking if it takes longer than 500ms.
///
/// A hung test then points at the exact await that hung.
#[macro_export]
macro_rules! await_timeout {
    ($s:expr) => {
        match tokio::time::timeout(std::time::Duration::from_millis(500), $s).await {
            Ok(v) => v,
            Err(_) => panic!("await took too long"),
        }
    };
}

/// Assert that the time since `$start` is `$dur`, give or take `$slack`.
#[macro_export]
macro_rules! assert_elapsed {
    ($start:expr, $dur:expr, $slack:expr) => {{
        let elapsed = $start.elapsed();
        let expected: std::time::Duration = $dur;
        let slack: std::time::Duration = $slack;

        assert!(
            elapsed + slack >= expected && elapsed <= expected + slack,
            "elapsed {:?}, expected {:?} +/- {:?}",
            elapsed,
            expected,
            slack,
        );
    }};
}
