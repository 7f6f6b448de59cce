//! Exchanges between a client session and the server over the simulated
//! network, with paused time so every timeout fires deterministically.

use std::time::Duration;
use teller_core::server::RequestDisposition;
use teller_core::{Error, Operation, RequestId, RetryPolicy, SessionState};
use teller_test_utils::builders::malformed_datagrams;
use teller_test_utils::{Fault, FaultConfig, MessageBuilder, SimulatedNetwork, TestBed};

/// Let every task drain its inbox
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_deposit_on_fresh_account() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());

    let reply = client.execute(Operation::Deposit(100)).await.unwrap();

    assert_eq!(reply.request_id, RequestId::new(0));
    assert_eq!(reply.text, "Deposited 100. Your balance is now:100");
    settle().await;
    let session = server.shutdown().await;
    assert_eq!(session.balance(), 100);
    assert_eq!(session.last_processed(), Some(RequestId::new(0)));
    assert_eq!(session.last_acknowledged(), Some(RequestId::new(0)));
    assert!(session.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lost_reply_is_replayed_not_reexecuted() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    let client_addr = client.local_addr().unwrap();
    bed.network.script(bed.server_addr, client_addr, [Fault::Drop]);

    let reply = client.execute(Operation::Deposit(100)).await.unwrap();

    assert_eq!(reply.text, "Deposited 100. Your balance is now:100");
    assert_eq!(client.stats().retransmissions, 1);
    settle().await;
    let session = server.shutdown().await;
    assert_eq!(session.balance(), 100);
    assert_eq!(session.stats().executed, 1);
    assert_eq!(session.stats().replayed, 1);

    let replies = bed.network.messages_between(bed.server_addr, client_addr);
    let replies: Vec<_> = replies.iter().filter(|m| m.is_reply()).collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], replies[1]);
}

#[tokio::test(start_paused = true)]
async fn test_lost_request_is_retransmitted() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    let client_addr = client.local_addr().unwrap();
    bed.network.script(client_addr, bed.server_addr, [Fault::Drop]);

    let start = tokio::time::Instant::now();
    let reply = client.execute(Operation::Deposit(100)).await.unwrap();

    assert_eq!(reply.text, "Deposited 100. Your balance is now:100");
    let timeout = RetryPolicy::default().response_timeout();
    assert!(start.elapsed() >= timeout);
    assert!(start.elapsed() < timeout * 2);
    settle().await;
    let session = server.shutdown().await;
    assert_eq!(session.stats().executed, 1);
    assert_eq!(session.stats().replayed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_duplicate_after_ack_is_dropped() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    let client_addr = client.local_addr().unwrap();
    // The first copy of the request arrives a second after its retransmission was
    // answered and acknowledged.
    bed.network
        .script(client_addr, bed.server_addr, [Fault::Delay(Duration::from_secs(6))]);

    client.execute(Operation::Deposit(100)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let session = server.shutdown().await;
    assert_eq!(session.balance(), 100);
    assert_eq!(session.last_acknowledged(), Some(RequestId::new(0)));
    assert!(session.cache().is_empty());
    assert_eq!(session.stats().duplicates_dropped, 1);

    let to_client = bed.network.messages_between(bed.server_addr, client_addr);
    assert_eq!(to_client.len(), 1, "no reply to the late duplicate");
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_server_aborts_session() {
    let bed = TestBed::default();
    let _server = bed.spawn_server();
    bed.network.set_down(bed.server_addr, true);
    let policy = RetryPolicy::default();
    let mut client = bed.client(policy);
    let client_addr = client.local_addr().unwrap();

    let start = tokio::time::Instant::now();
    let err = client.execute(Operation::Deposit(100)).await.unwrap_err();

    match err {
        Error::ServerUnresponsive {
            request_id,
            waited,
            attempts,
        } => {
            assert_eq!(request_id, RequestId::new(0));
            assert_eq!(waited, Duration::from_secs(30));
            assert_eq!(attempts, policy.max_retransmissions() + 1);
        }
        other => panic!("expected ServerUnresponsive, got {other:?}"),
    }
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(start.elapsed() < Duration::from_secs(31));
    assert_eq!(client.state(), SessionState::Aborted);

    let sent_before = bed.network.messages_between(client_addr, bed.server_addr).len();
    assert_eq!(sent_before, 6);

    let err = client.execute(Operation::ViewBalance).await.unwrap_err();
    assert!(matches!(err, Error::SessionAborted));
    let sent_after = bed.network.messages_between(client_addr, bed.server_addr).len();
    assert_eq!(sent_after, sent_before, "aborted session must not send");
}

#[tokio::test(start_paused = true)]
async fn test_sequence_of_operations() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());

    client.execute(Operation::Deposit(100)).await.unwrap();
    let withdraw = client.execute(Operation::Withdraw(30)).await.unwrap();
    let view = client.execute(Operation::ViewBalance).await.unwrap();

    assert_eq!(withdraw.request_id, RequestId::new(1));
    assert_eq!(withdraw.text, "Withdrew 30. Your balance is now:70");
    assert_eq!(view.request_id, RequestId::new(2));
    assert_eq!(view.text, "Your current balance is:70");
    assert_eq!(client.sequencer().last_acknowledged(), Some(RequestId::new(2)));
    assert_eq!(client.stats().acknowledgements_sent, 3);

    settle().await;
    let session = server.shutdown().await;
    assert_eq!(session.balance(), 70);
    assert_eq!(session.stats().acknowledgements, 3);
    assert!(session.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lost_ack_is_recovered_by_next_ack() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    let client_addr = client.local_addr().unwrap();
    // Request 0 goes through, its ack is lost; request 1 and its ack go through.
    bed.network
        .script(client_addr, bed.server_addr, [Fault::Deliver, Fault::Drop]);

    client.execute(Operation::Deposit(10)).await.unwrap();
    settle().await;
    client.execute(Operation::Deposit(20)).await.unwrap();
    settle().await;

    let session = server.shutdown().await;
    assert_eq!(session.balance(), 30);
    assert_eq!(session.last_acknowledged(), Some(RequestId::new(1)));
    assert!(session.cache().is_empty(), "ack of 1 also evicts reply 0");
}

#[tokio::test(start_paused = true)]
async fn test_duplicated_request_executes_once() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    let client_addr = client.local_addr().unwrap();
    bed.network
        .script(client_addr, bed.server_addr, [Fault::Duplicate]);

    let reply = client.execute(Operation::Deposit(100)).await.unwrap();
    assert_eq!(reply.text, "Deposited 100. Your balance is now:100");

    settle().await;
    let session = server.shutdown().await;
    assert_eq!(session.balance(), 100);
    assert_eq!(session.stats().executed, 1);
    assert_eq!(session.stats().replayed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_converges_after_lossy_network() {
    for seed in 0..8u64 {
        let network = SimulatedNetwork::with_faults(FaultConfig::lossy(0.3), seed);
        let bed = TestBed::new(network);
        let server = bed.spawn_server();
        let mut client = bed.client(RetryPolicy::default());

        let mut expected = 0i64;
        let mut completed = 0;
        for amount in 1..=5i64 {
            match client.execute(Operation::Deposit(amount)).await {
                Ok(reply) => {
                    expected += amount;
                    completed += 1;
                    assert!(reply.text.starts_with(&format!("Deposited {amount}.")));
                    assert!(client.stats().retransmissions <= 5 * completed);
                }
                Err(Error::ServerUnresponsive { .. }) => break,
                Err(other) => panic!("seed {seed}: unexpected error {other}"),
            }
        }

        settle().await;
        let session = server.shutdown().await;
        // A request that gave up may still have been executed once
        let executed = session.stats().executed as i64;
        assert!(executed >= completed as i64, "seed {seed}");
        assert!(executed <= completed as i64 + 1, "seed {seed}");
        if executed == completed as i64 {
            assert_eq!(session.balance(), expected, "seed {seed}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_stray_datagrams_at_server_are_dropped() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let stranger = bed.network.bind_local(0);

    let reply = MessageBuilder::reply(0).payload("hi").encode();
    bed.network.inject(stranger.addr(), bed.server_addr, reply);
    for bytes in malformed_datagrams() {
        bed.network.inject(stranger.addr(), bed.server_addr, bytes);
    }
    settle().await;

    let session = server.shutdown().await;
    assert_eq!(session.stats().stray_dropped, 1);
    assert_eq!(session.stats().malformed_dropped, 6);
    assert_eq!(session.last_processed(), None);
}

#[tokio::test(start_paused = true)]
async fn test_server_session_after_restart_treats_ids_as_new() {
    let bed = TestBed::default();
    let mut client = bed.client(RetryPolicy::default());

    let first = bed.spawn_server();
    client.execute(Operation::Deposit(5)).await.unwrap();
    settle().await;
    let old = first.shutdown().await;
    assert_eq!(old.balance(), 5);

    // State does not survive a restart
    let second = bed.spawn_server();
    let reply = client.execute(Operation::ViewBalance).await.unwrap();
    assert_eq!(reply.text, "Your current balance is:0");
    settle().await;
    let session = second.shutdown().await;
    assert_eq!(session.last_processed(), Some(RequestId::new(1)));
    assert_eq!(
        session.classify(RequestId::new(0)),
        RequestDisposition::AlreadyAcknowledged
    );
}

#[tokio::test(start_paused = true)]
async fn test_server_replies_to_most_recent_sender() {
    let bed = TestBed::default();
    let server = bed.spawn_server();
    let mut client = bed.client(RetryPolicy::default());
    client.execute(Operation::Deposit(5)).await.unwrap();

    let other = bed.network.bind_local(0);
    let request = MessageBuilder::request(1).deposit(1).encode();
    bed.network.inject(other.addr(), bed.server_addr, request);
    settle().await;

    let replies = bed.network.messages_between(bed.server_addr, other.addr());
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].request_id, RequestId::new(1));
    assert_eq!(replies[0].payload, "Deposited 1. Your balance is now:6");

    let session = server.shutdown().await;
    assert_eq!(session.balance(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_second_client_session_is_not_served() {
    // Ids restart at 0 in a new session, and the server has already
    // acknowledged 0.
    let bed = TestBed::default();
    let server = bed.spawn_server();

    let mut first = bed.client(RetryPolicy::default());
    let reply = first.execute(Operation::Deposit(5)).await.unwrap();
    assert_eq!(reply.text, "Deposited 5. Your balance is now:5");
    drop(first);

    let mut second = bed.client(RetryPolicy::default());
    let result = second.execute(Operation::Deposit(5)).await;
    assert!(matches!(
        result,
        Err(Error::ServerUnresponsive { request_id, attempts: 6, .. })
            if request_id == RequestId::new(0)
    ));
    assert_eq!(second.state(), SessionState::Aborted);

    let session = server.shutdown().await;
    assert_eq!(session.balance(), 5);
    assert_eq!(session.stats().executed, 1);
    assert_eq!(session.stats().duplicates_dropped, 6);
}
