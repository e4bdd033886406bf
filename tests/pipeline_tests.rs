use std::{collections::BTreeSet, time::Duration};

use achievement_notifier::{
    api::router,
    builder::NotificationBuilder,
    classifier::Classifier,
    clients::{dispatcher::Dispatcher, health::HealthChecker},
    models::{
        achievement::AchievementKind,
        endpoint::Endpoint,
        event::{GameContext, GameEvent, HostMessage},
        health::{HealthCheckResponse, HealthStatus},
        report::DeliveryReport,
        status::DeliveryState,
        template::Templates,
        world::{WorldAttributes, WorldType},
    },
    notifier::{Notifier, Outcome, Thresholds},
};
use anyhow::Result;
use tokio::{net::TcpListener, sync::mpsc::UnboundedReceiver};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

use crate::common::{PLAYER, collect_reports, fast_dispatcher_config, slayer_payload};

const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

async fn webhook() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    server
}

fn start(
    server: &MockServer,
    enabled_kinds: impl IntoIterator<Item = AchievementKind>,
    thresholds: Thresholds,
) -> Result<(Notifier, UnboundedReceiver<DeliveryReport>)> {
    let (dispatcher, reports) = Dispatcher::start(
        fast_dispatcher_config(),
        vec![Endpoint::new("main", format!("{}/hook", server.uri()))],
    )?;
    let notifier = Notifier::new(
        Classifier::compile()?,
        NotificationBuilder::default(),
        enabled_kinds.into_iter().collect(),
        thresholds,
        dispatcher,
    )?;

    Ok((notifier, reports))
}

fn context(world: WorldAttributes) -> GameContext {
    GameContext::new(PLAYER, world)
}

/// Test: A game message travels from host JSON to the webhook
#[tokio::test]
async fn test_host_message_is_delivered() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "content": "dank has completed a slayer task: 125 Kalphite",
            "type": "SLAYER",
            "playerName": "dank",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (notifier, mut reports) = start(&server, AchievementKind::ALL, Thresholds::default())?;

    let line = serde_json::to_string(&HostMessage::new(
        context(WorldAttributes::from([WorldType::Members])),
        GameEvent::game_message(
            "You have completed your task! You killed 125 Kalphite. You gained 11,150 xp.",
        ),
    ))?;

    let outcome = notifier.process_message(&line).await?;
    assert!(matches!(outcome, Outcome::Enqueued(ref ids) if ids.len() == 1));

    let reports = collect_reports(&mut reports, 1, REPORT_TIMEOUT).await?;
    assert_eq!(reports[0].status, DeliveryState::Delivered);

    notifier.dispatcher().shutdown().await;
    server.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_ignored_world_suppresses_notification() -> Result<()> {
    let server = webhook().await;
    let (notifier, _reports) = start(&server, AchievementKind::ALL, Thresholds::default())?;

    let outcome = notifier.handle_event(
        &GameEvent::game_message("Your Zulrah kill count is: 10."),
        &context(WorldAttributes::from([WorldType::Members, WorldType::TournamentWorld])),
        None,
    )?;

    assert_eq!(outcome, Outcome::IgnoredWorld);
    assert_eq!(notifier.dispatcher().in_flight(), 0);

    notifier.dispatcher().shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_disabled_kind_and_no_match() -> Result<()> {
    let server = webhook().await;
    let (notifier, _reports) = start(&server, [AchievementKind::Loot], Thresholds::default())?;
    let context = context(WorldAttributes::empty());

    assert_eq!(
        notifier.handle_event(&GameEvent::PlayerDied { killer: None }, &context, None)?,
        Outcome::KindDisabled(AchievementKind::Death)
    );
    assert_eq!(
        notifier.handle_event(&GameEvent::game_message("Forsen: forsen"), &context, None)?,
        Outcome::NoMatch
    );

    notifier.dispatcher().shutdown().await;
    Ok(())
}

/// Test: Level and kill count intervals filter noisy notifications
#[tokio::test]
async fn test_thresholds() -> Result<()> {
    let server = webhook().await;
    let thresholds = Thresholds {
        level_interval: 10,
        kill_count_interval: 50,
    };
    let (notifier, mut reports) = start(&server, AchievementKind::ALL, thresholds)?;
    let context = context(WorldAttributes::empty());

    let level = |previous_level, level| GameEvent::LevelChanged {
        skill: "Agility".into(),
        previous_level,
        level,
    };

    assert_eq!(
        notifier.handle_event(&level(42, 43), &context, None)?,
        Outcome::BelowThreshold(AchievementKind::Level)
    );
    assert!(matches!(notifier.handle_event(&level(49, 50), &context, None)?, Outcome::Enqueued(_)));
    assert!(matches!(notifier.handle_event(&level(98, 99), &context, None)?, Outcome::Enqueued(_)));

    let kc = |count: u32| GameEvent::game_message(format!("Your Vorkath kill count is: {}.", count));
    assert!(matches!(notifier.handle_event(&kc(1), &context, None)?, Outcome::Enqueued(_)));
    assert_eq!(
        notifier.handle_event(&kc(2), &context, None)?,
        Outcome::BelowThreshold(AchievementKind::KillCount)
    );
    assert!(matches!(notifier.handle_event(&kc(100), &context, None)?, Outcome::Enqueued(_)));

    collect_reports(&mut reports, 4, REPORT_TIMEOUT).await?;

    notifier.dispatcher().shutdown().await;
    Ok(())
}

#[test]
fn test_threshold_rules() {
    let thresholds = Thresholds {
        level_interval: 5,
        kill_count_interval: 25,
    };

    assert!(thresholds.level_passes(10));
    assert!(!thresholds.level_passes(11));
    assert!(thresholds.level_passes(99));
    assert!(thresholds.kill_count_passes(1));
    assert!(thresholds.kill_count_passes(75));
    assert!(!thresholds.kill_count_passes(74));
    assert!(Thresholds::default().level_passes(37));
}

/// Test: Enabling a kind without a template is a configuration error
#[tokio::test]
async fn test_enabled_kind_requires_template() -> Result<()> {
    let (dispatcher, _reports) = Dispatcher::start(
        fast_dispatcher_config(),
        vec![Endpoint::new("main", "https://example.com/hook")],
    )?;

    let result = Notifier::new(
        Classifier::compile()?,
        NotificationBuilder::new(Templates::default().without(AchievementKind::Clue)),
        BTreeSet::from([AchievementKind::Clue]),
        Thresholds::default(),
        dispatcher.clone(),
    );
    assert!(result.is_err());

    dispatcher.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_host_message_is_an_error() -> Result<()> {
    let server = webhook().await;
    let (notifier, _reports) = start(&server, AchievementKind::ALL, Thresholds::default())?;

    assert!(notifier.process_message("{not json").await.is_err());
    assert!(
        notifier
            .process_message(r#"{"context": {"player_name": "dank"}, "event": {"type": "teleported"}}"#)
            .await
            .is_err()
    );

    notifier.dispatcher().shutdown().await;
    Ok(())
}

/// Test: Health endpoint reports per-endpoint counters
#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let (dispatcher, mut reports) = Dispatcher::start(
        fast_dispatcher_config(),
        vec![Endpoint::new("rejecting", format!("{}/hook", server.uri()))],
    )?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let app = router(HealthChecker::new(dispatcher.clone()));
    tokio::spawn(async move { axum::serve(listener, app).await });

    let url = format!("http://{}/health", address);
    let health: HealthCheckResponse = reqwest::get(&url).await?.json().await?;
    assert_eq!(health.status, HealthStatus::Healthy);

    dispatcher.enqueue(slayer_payload(1, "Imps")?)?;
    collect_reports(&mut reports, 1, REPORT_TIMEOUT).await?;

    let health: HealthCheckResponse = reqwest::get(&url).await?.json().await?;
    let check = &health.checks["rejecting"];
    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(check.counters.failed, 1);
    assert_eq!(check.counters.consecutive_failures, 1);
    assert!(check.last_error.as_deref().unwrap_or_default().contains("400"));

    dispatcher.shutdown().await;

    let response = reqwest::get(&url).await?;
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    Ok(())
}
