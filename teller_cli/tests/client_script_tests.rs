//! Scripted client sessions against a server on the simulated network

use teller_cli::ExitCode;
use teller_cli::client::run_script;
use teller_core::RetryPolicy;
use teller_test_utils::TestBed;

#[tokio::test(start_paused = true)]
async fn test_script_runs_until_stop() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut session = bed.client(RetryPolicy::default());
    let input: &[u8] = b"2 100\n\n3 30\nbogus\n1\n-1\n2 999\n";
    let mut out = Vec::new();

    let summary = run_script(&mut session, input, &mut out).await.unwrap();

    assert_eq!(summary.executed, 3);
    assert_eq!(summary.rejected_lines, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Deposited 100. Your balance is now:100\n\
         Withdrew 30. Your balance is now:70\n\
         Your current balance is:70\n"
    );

    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    let state = server.shutdown().await;
    assert_eq!(state.balance(), 70, "nothing after Stop is executed");
}

#[tokio::test(start_paused = true)]
async fn test_script_ends_at_end_of_input() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut session = bed.client(RetryPolicy::default());
    let mut out = Vec::new();

    let summary = run_script(&mut session, &b"2 5"[..], &mut out).await.unwrap();

    assert_eq!(summary.executed, 1);
    server.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_script_stops_on_unresponsive_server() {
    let bed = TestBed::default();
    bed.network.set_down(bed.server_addr, true);
    let mut session = bed.client(RetryPolicy::from_millis(100, 200));
    let mut out = Vec::new();

    let err = run_script(&mut session, &b"1\n1\n"[..], &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::NetworkError);
    assert!(out.is_empty());
    assert!(!session.is_active());
}
