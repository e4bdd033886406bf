use std::time::Duration;

use achievement_notifier::{error::DeliveryError, models::retry::RetryConfig};

fn config(jitter: bool) -> RetryConfig {
    RetryConfig {
        max_retries: 5,
        initial_delay_ms: 100,
        max_delay_ms: 1000,
        backoff_multiplier: 2,
        jitter,
        max_retry_after_ms: 5000,
    }
}

/// Test: Retry delays follow exponential backoff
#[test]
fn test_exponential_backoff() {
    let config = config(false);

    let delays: Vec<u128> = (1..=4)
        .map(|retry| config.delay_for_retry(retry).as_millis())
        .collect();

    assert_eq!(delays, vec![100, 200, 400, 800]);
}

/// Test: Max delay cap is respected
#[test]
fn test_max_delay_cap_respected() {
    let config = RetryConfig {
        max_delay_ms: 300,
        ..config(false)
    };

    for retry in 3..=40 {
        assert_eq!(config.delay_for_retry(retry), Duration::from_millis(300));
    }
}

/// Test: Jitter stays within ten percent and actually varies
#[test]
fn test_jitter_applied_to_delays() {
    let config = RetryConfig {
        initial_delay_ms: 2000,
        max_delay_ms: 60_000,
        ..config(true)
    };

    let delays: Vec<u128> = (0..50)
        .map(|_| config.delay_for_retry(1).as_millis())
        .collect();

    for delay in &delays {
        assert!(
            (1800..=2200).contains(delay),
            "Delay {} outside the jitter window",
            delay
        );
    }

    let min_delay = delays.iter().min().unwrap();
    let max_delay = delays.iter().max().unwrap();
    assert!(
        max_delay > min_delay,
        "Delays should vary due to jitter (min: {}, max: {})",
        min_delay,
        max_delay
    );
}

/// Test: A server hint wins when it is longer than the backoff
#[test]
fn test_retry_after_hint_takes_the_larger_delay() {
    let config = config(false);

    assert_eq!(
        config.next_delay(1, Some(Duration::from_millis(750))),
        Duration::from_millis(750)
    );
    assert_eq!(
        config.next_delay(3, Some(Duration::from_millis(10))),
        Duration::from_millis(400)
    );
    assert_eq!(config.next_delay(2, None), Duration::from_millis(200));
}

/// Test: An oversized server hint is capped
#[test]
fn test_retry_after_hint_is_capped() {
    let config = config(false);

    assert_eq!(
        config.next_delay(1, Some(Duration::from_secs(10_000_000_000_000_000_000))),
        Duration::from_millis(5000)
    );
    assert_eq!(
        config.next_delay(1, Some(Duration::MAX)),
        Duration::from_millis(5000)
    );
}

#[test]
fn test_error_classification() {
    let transient = [
        DeliveryError::Timeout,
        DeliveryError::Connection("refused".into()),
        DeliveryError::Server {
            status: 503,
            body: String::new(),
        },
        DeliveryError::RateLimited { retry_after: None },
    ];
    let permanent = [
        DeliveryError::Rejected {
            status: 400,
            body: String::new(),
        },
        DeliveryError::InvalidEndpoint("no host".into()),
        DeliveryError::Encoding("bad".into()),
        DeliveryError::Cancelled,
    ];

    assert!(transient.iter().all(DeliveryError::is_transient));
    assert!(!permanent.iter().any(DeliveryError::is_transient));
    assert_eq!(
        DeliveryError::RateLimited {
            retry_after: Some(Duration::from_secs(2))
        }
        .retry_after(),
        Some(Duration::from_secs(2))
    );
}
