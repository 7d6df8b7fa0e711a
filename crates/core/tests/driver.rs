//! Polling-loop behavior against a scripted session, on paused time.

use std::sync::Arc;
use std::time::Duration;

use offsign::testing::{MockCall, MockUploadSession};
use offsign::{
	ContentId, DriverConfig, Opcode, Report, SessionDriver, SessionHandle, SessionId,
	SessionOutcome, Stage, UnsignedPayload,
};
use tokio_stream::StreamExt;

fn session() -> SessionId {
	SessionId::new("sess-1")
}

fn content() -> ContentId {
	ContentId::new("QmContent")
}

fn start(remote: &Arc<MockUploadSession>) -> SessionHandle {
	SessionDriver::new(remote.clone()).start(session(), content())
}

fn start_with(remote: &Arc<MockUploadSession>, config: DriverConfig) -> SessionHandle {
	SessionDriver::new(remote.clone())
		.with_config(config)
		.start(session(), content())
}

async fn drain(handle: &mut SessionHandle) -> Vec<Report> {
	let mut reports = Vec::new();
	while let Some(report) = handle.next_report().await {
		reports.push(report);
	}
	reports
}

fn payload(opcode: Opcode, unsigned: &str, price: i64) -> UnsignedPayload {
	UnsignedPayload {
		opcode,
		unsigned: unsigned.to_string(),
		price,
	}
}

#[tokio::test(start_paused = true)]
async fn test_full_session_signs_each_stage_once() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::Uninitialized,
		Stage::Init,
		Stage::InitSignReadyForEscrow,
		Stage::BalanceSignReady,
		Stage::Complete,
	]));
	remote.set_payload(
		Stage::BalanceSignReady,
		payload(Opcode::Balance, "YmFsYW5jZQ==", 0),
	);

	let started = tokio::time::Instant::now();
	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(
		reports,
		vec![
			Report::Stage(Stage::Uninitialized),
			Report::Stage(Stage::Init),
			Report::Stage(Stage::InitSignReadyForEscrow),
			Report::Stage(Stage::BalanceSignReady),
			Report::Stage(Stage::Complete),
		]
	);
	assert_eq!(
		remote.calls(),
		vec![
			MockCall::Status,
			MockCall::Status,
			MockCall::Status,
			MockCall::ContractBatch {
				stage: Stage::InitSignReadyForEscrow
			},
			MockCall::SignBatch {
				stage: Stage::InitSignReadyForEscrow,
				contracts: 1
			},
			MockCall::Status,
			MockCall::UnsignedPayload {
				stage: Stage::BalanceSignReady
			},
			MockCall::SignBalance {
				stage: Stage::BalanceSignReady
			},
			MockCall::Status,
		]
	);
	assert_eq!(handle.outcome().await.unwrap(), SessionOutcome::Completed);
	assert!(started.elapsed() >= Duration::from_secs(50));
}

#[tokio::test(start_paused = true)]
async fn test_error_stage_fails_session() {
	let remote = Arc::new(MockUploadSession::with_stages([Stage::Init, Stage::Error]));

	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(
		reports,
		vec![Report::Stage(Stage::Init), Report::Stage(Stage::Error)]
	);
	let outcome = handle.outcome().await.unwrap();
	assert_eq!(outcome, SessionOutcome::Failed);
	assert!(outcome.into_result(&session()).unwrap_err().is_session_failed());
	assert_eq!(remote.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_stage_is_reported_and_skipped() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::Init,
		Stage::from("archived"),
		Stage::Complete,
	]));

	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(
		reports,
		vec![
			Report::Stage(Stage::Init),
			Report::Stage(Stage::Unrecognized("archived".into())),
			Report::Stage(Stage::Complete),
		]
	);
	assert_eq!(remote.calls().len(), 3);
	assert_eq!(handle.outcome().await.unwrap(), SessionOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_pay_channel_price_is_passed_through() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::PayChannelSignReady,
		Stage::Complete,
	]));
	remote.set_payload(
		Stage::PayChannelSignReady,
		payload(Opcode::PayChannel, "Y2hhbm5lbA==", 12_345),
	);

	let mut handle = start(&remote);
	drain(&mut handle).await;

	assert!(remote.calls().contains(&MockCall::SignPayChannel {
		stage: Stage::PayChannelSignReady,
		price: 12_345,
	}));
}

#[tokio::test(start_paused = true)]
async fn test_every_signing_stage_dispatches() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::InitSignReadyForGuard,
		Stage::RetrySignReady,
		Stage::PayRequestSignReady,
		Stage::GuardSignReady,
		Stage::RetrySignProcess,
		Stage::Complete,
	]));
	remote.set_payload(
		Stage::PayRequestSignReady,
		payload(Opcode::PayRequest, "", 0),
	);

	let mut handle = start(&remote);
	drain(&mut handle).await;

	let calls = remote.calls();
	assert!(calls.contains(&MockCall::SignBatch {
		stage: Stage::InitSignReadyForGuard,
		contracts: 1
	}));
	assert!(calls.contains(&MockCall::SignBatch {
		stage: Stage::RetrySignReady,
		contracts: 1
	}));
	assert!(calls.contains(&MockCall::SignPayRequest {
		stage: Stage::PayRequestSignReady
	}));
	assert!(calls.contains(&MockCall::SignGeneric {
		stage: Stage::GuardSignReady
	}));
	assert_eq!(remote.polls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_each_action_is_followed_by_one_poll() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::InitSignReadyForEscrow,
		Stage::BalanceSignReady,
		Stage::PayChannelSignReady,
		Stage::Complete,
	]));

	let mut handle = start(&remote);
	drain(&mut handle).await;

	let calls = remote.calls();
	for (i, call) in calls.iter().enumerate() {
		let submitted = matches!(
			call,
			MockCall::SignBatch { .. }
				| MockCall::SignBalance { .. }
				| MockCall::SignPayChannel { .. }
				| MockCall::SignPayRequest { .. }
				| MockCall::SignGeneric { .. }
		);
		if submitted {
			assert_eq!(calls.get(i + 1), Some(&MockCall::Status), "after {call:?}");
		}
	}
	assert_eq!(calls.last(), Some(&MockCall::Status));
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_driving() {
	let remote = Arc::new(MockUploadSession::new());
	remote.push_poll_error("node restarting");
	remote.push_stage(Stage::Init);
	remote.push_stage(Stage::Complete);

	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(reports.len(), 3);
	assert!(matches!(&reports[0], Report::PollFailed { error } if error.contains("node restarting")));
	assert!(!reports[0].is_terminal());
	assert_eq!(reports[1], Report::Stage(Stage::Init));
	assert!(reports[2].is_terminal());
	assert_eq!(handle.outcome().await.unwrap(), SessionOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_action_failure_is_retried_by_polling() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::BalanceSignReady,
		Stage::BalanceSignReady,
		Stage::Complete,
	]));
	remote.set_payload(
		Stage::BalanceSignReady,
		payload(Opcode::Balance, "YmFsYW5jZQ==", 0),
	);
	remote.fail_next_actions(1);

	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(reports.len(), 4);
	assert_eq!(reports[0], Report::Stage(Stage::BalanceSignReady));
	assert!(matches!(
		&reports[1],
		Report::ActionFailed { stage: Stage::BalanceSignReady, error } if error.contains("submission rejected")
	));
	assert_eq!(reports[2], Report::Stage(Stage::BalanceSignReady));
	assert_eq!(reports[3], Report::Stage(Stage::Complete));

	let balance_signatures = remote
		.calls()
		.into_iter()
		.filter(|call| matches!(call, MockCall::SignBalance { .. }))
		.count();
	assert_eq!(balance_signatures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_opcode_signs_nothing() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::BalanceSignReady,
		Stage::Complete,
	]));
	remote.set_payload(
		Stage::BalanceSignReady,
		payload(Opcode::from("refund"), "", 0),
	);

	let mut handle = start(&remote);
	let reports = drain(&mut handle).await;

	assert_eq!(
		reports,
		vec![
			Report::Stage(Stage::BalanceSignReady),
			Report::UnrecognizedOpcode {
				stage: Stage::BalanceSignReady,
				opcode: "refund".into(),
			},
			Report::Stage(Stage::Complete),
		]
	);
	assert_eq!(
		remote.calls(),
		vec![
			MockCall::Status,
			MockCall::UnsignedPayload {
				stage: Stage::BalanceSignReady
			},
			MockCall::Status,
		]
	);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_poll() {
	let remote = Arc::new(MockUploadSession::with_stages([Stage::Init]));

	let handle = start(&remote);
	handle.cancel();

	assert_eq!(handle.outcome().await.unwrap(), SessionOutcome::Cancelled);
	assert_eq!(remote.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_sleep() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::Init,
		Stage::Init,
		Stage::Complete,
	]));

	let mut handle = start(&remote);
	assert_eq!(handle.next_report().await, Some(Report::Stage(Stage::Init)));
	handle.cancel();

	let outcome = handle.outcome().await.unwrap();
	assert_eq!(outcome, SessionOutcome::Cancelled);
	assert_eq!(remote.polls(), 1);
	assert!(outcome.into_result(&session()).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_failure_ceiling_abandons_session() {
	let remote = Arc::new(MockUploadSession::new());
	let config = DriverConfig {
		max_consecutive_failures: Some(3),
		..DriverConfig::default()
	};

	let mut handle = start_with(&remote, config);
	let reports = drain(&mut handle).await;

	assert_eq!(reports.len(), 3);
	assert!(
		reports
			.iter()
			.all(|r| matches!(r, Report::PollFailed { .. }))
	);
	assert_eq!(
		handle.outcome().await.unwrap(),
		SessionOutcome::Abandoned {
			consecutive_failures: 3
		}
	);
}

#[tokio::test(start_paused = true)]
async fn test_recognized_stage_resets_failure_count() {
	let remote = Arc::new(MockUploadSession::new());
	remote.push_poll_error("timeout");
	remote.push_stage(Stage::from("archived"));
	remote.push_stage(Stage::Init);
	remote.push_poll_error("timeout");
	remote.push_poll_error("timeout");
	remote.push_stage(Stage::Complete);
	let config = DriverConfig {
		poll_interval: Duration::from_secs(1),
		max_consecutive_failures: Some(3),
	};

	let mut handle = start_with(&remote, config);
	drain(&mut handle).await;

	assert_eq!(handle.outcome().await.unwrap(), SessionOutcome::Completed);
	assert_eq!(remote.polls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_does_not_stop_driver() {
	let remote = Arc::new(MockUploadSession::with_stages([
		Stage::Init,
		Stage::GuardSignReady,
		Stage::Complete,
	]));

	let (stream, control) = start(&remote).into_stream();
	drop(stream);

	assert_eq!(control.outcome().await.unwrap(), SessionOutcome::Completed);
	assert!(remote.calls().contains(&MockCall::SignGeneric {
		stage: Stage::GuardSignReady
	}));
}

#[tokio::test(start_paused = true)]
async fn test_report_stream_ends_after_terminal_stage() {
	let remote = Arc::new(MockUploadSession::with_stages([Stage::Init, Stage::Complete]));

	let (stream, control) = start(&remote).into_stream();
	let reports: Vec<Report> = stream.collect().await;

	assert_eq!(
		reports,
		vec![Report::Stage(Stage::Init), Report::Stage(Stage::Complete)]
	);
	assert!(control.outcome().await.unwrap().is_success());
	assert_eq!(remote.polls(), 2);
}
